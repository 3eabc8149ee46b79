use crate::domain::ports::{InputReader, InputSource};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 本機檔案輸入，每次 `open` 都從頭讀取
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InputSource for LocalFileSource {
    async fn open(&self) -> Result<InputReader> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_local_file_can_be_opened_twice() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("movies.csv");
        std::fs::write(&path, "id,title\n1,Alien\n").unwrap();
        let source = LocalFileSource::new(&path);

        for _ in 0..2 {
            let mut content = String::new();
            source.open().await.unwrap().read_to_string(&mut content).await.unwrap();
            assert_eq!(content, "id,title\n1,Alien\n");
        }
        assert!(source.describe().ends_with("movies.csv"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = LocalFileSource::new("/definitely/not/here.csv");
        let err = source.open().await.err().unwrap();
        assert!(matches!(err, crate::utils::error::ImportError::IoError(_)));
    }
}
