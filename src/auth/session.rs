use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::Result;
use crate::domain::StorageState;

/// The single saved browser session on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Option<StorageState>> {
        if !self.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Overwrite the saved session.
    pub fn save(&self, state: &StorageState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        debug!(path = %self.path.display(), cookies = state.cookies.len(), "Session written");
        Ok(())
    }

    /// Delete the saved session. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        if !self.exists() {
            info!("No saved session found");
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        info!("Session cleared successfully!");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoredCookie;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().unwrap().is_none());

        let state = StorageState {
            cookies: vec![StoredCookie {
                name: "sid".into(),
                value: "1".into(),
                domain: "example.com".into(),
                path: "/".into(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: None,
            }],
            origins: Vec::new(),
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));

        assert!(store.clear().unwrap());
        assert!(!store.exists());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(SessionStore::new(path).load().is_err());
    }
}
