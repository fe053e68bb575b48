//! Directory provisioning and startup size probe

use std::io;
use std::path::{Path, PathBuf};

/// Creates the log directory once and remembers that it exists
///
/// `invalidate` forces the next `ensure` to check again, used when an
/// open fails because the directory was removed underneath us.
#[derive(Debug)]
pub struct DirectoryProvisioner {
    dir: PathBuf,
    ready: bool,
}

impl DirectoryProvisioner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ready: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the directory is known to exist
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Create the directory (and parents) if needed
    pub async fn ensure(&mut self) -> io::Result<()> {
        if self.ready {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        self.ready = true;
        tracing::debug!(path = %self.dir.display(), "log directory ready");
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.ready = false;
    }
}

/// Size of an existing file, 0 when it does not exist
///
/// Other errors are reported and also treated as 0; rotation accounting
/// then starts fresh rather than blocking the sink.
pub async fn probe_file_size(path: &Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read log file size");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_creates_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        let mut provisioner = DirectoryProvisioner::new(&dir);

        assert!(!provisioner.is_ready());
        provisioner.ensure().await.unwrap();
        assert!(provisioner.is_ready());
        assert!(dir.is_dir());

        // idempotent
        provisioner.ensure().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_recreates() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("logs");
        let mut provisioner = DirectoryProvisioner::new(&dir);
        provisioner.ensure().await.unwrap();

        std::fs::remove_dir(&dir).unwrap();
        provisioner.invalidate();
        provisioner.ensure().await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_fails_under_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let mut provisioner = DirectoryProvisioner::new(blocker.join("logs"));
        assert!(provisioner.ensure().await.is_err());
        assert!(!provisioner.is_ready());
    }

    #[tokio::test]
    async fn test_probe_file_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("api_2024-03-10.log");
        assert_eq!(probe_file_size(&path).await, 0);

        std::fs::write(&path, vec![b'x'; 1234]).unwrap();
        assert_eq!(probe_file_size(&path).await, 1234);
    }
}
