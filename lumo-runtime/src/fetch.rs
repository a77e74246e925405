use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::host::Fetcher;

/// Reads `file://` documents from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if url.scheme() != "file" {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::Transport(format!("not a local path: {}", url)))?;
        debug!(path = %path.display(), "reading document");

        tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound,
            _ => FetchError::Transport(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_remote_schemes() {
        let url = Url::parse("https://site.test/index.ztmf").unwrap();
        assert_eq!(
            FileFetcher.fetch(&url).await,
            Err(FetchError::UnsupportedScheme("https".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reads_local_file() {
        let dir = std::env::temp_dir().join(format!("lumo-fetch-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("page.ztmf");
        tokio::fs::write(&path, "<body>hi</body>").await.unwrap();

        let url = Url::from_file_path(&path).unwrap();
        assert_eq!(FileFetcher.fetch(&url).await.unwrap(), "<body>hi</body>");

        let missing = Url::from_file_path(dir.join("missing.ztmf")).unwrap();
        assert_eq!(FileFetcher.fetch(&missing).await, Err(FetchError::NotFound));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
