// test_utils.rs

#[cfg(test)]
pub mod test_utils {
    use std::env;
    use std::path::{Path, PathBuf};
    use tempfile;

    /// Two fixedStep chromosomes: chrI on lines 2-11, chrII on lines 12-20.
    pub const TWO_CHROM_WIG: &str = "\
track type=wiggle_0 name=\"test\" description=\"two chromosomes\"
fixedStep chrom=chrI start=1 step=1 span=1
0
3
4
9
0
6
44
3
5
fixedStep chrom=chrII start=1 step=1 span=1
1
2
3
4
5
6
7
8
";

    pub struct TestDir {
        dir: PathBuf,
        #[allow(dead_code)]
        temp_dir: Option<tempfile::TempDir>,
    }

    impl TestDir {
        pub fn new(prefix: &str) -> std::io::Result<Self> {
            let keep_output = env::var("KEEP_TEST_OUTPUT").is_ok();
            if keep_output {
                let output_dir = env::current_dir()?.join("test_output").join(prefix);
                std::fs::create_dir_all(&output_dir)?;
                Ok(TestDir {
                    dir: output_dir,
                    temp_dir: None,
                })
            } else {
                let temp_dir = tempfile::tempdir()?;
                let dir = temp_dir.path().to_path_buf();
                Ok(TestDir {
                    dir,
                    temp_dir: Some(temp_dir),
                })
            }
        }

        pub fn path(&self) -> &Path {
            &self.dir
        }

        /// Write `contents` to `name` inside the directory.
        pub fn write_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
            let path = self.dir.join(name);
            std::fs::write(&path, contents)?;
            Ok(path)
        }
    }
}
