pub mod downloader;
pub mod importer;
pub mod metadata;
pub mod output;
pub mod player;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::{Path, PathBuf};

    /// 테스트마다 따로 쓰는 임시 디렉토리. drop 시 삭제된다.
    pub struct TestDir(PathBuf);

    impl TestDir {
        pub fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "songdeck-{}-{}",
                name,
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).unwrap();
            TestDir(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }

        pub fn touch(&self, name: &str) -> PathBuf {
            self.write(name, b"")
        }

        pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.0.join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}
