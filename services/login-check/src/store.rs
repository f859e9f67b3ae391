//! File-backed key-value store
//!
//! Stands in for the browser's shared storage area when the coordinator
//! runs on a workstation. All writes go through atomic temp-file + rename
//! so a crash cannot corrupt the state file, and the file is 0600 since it
//! may hold redirect state. A tokio Mutex serializes writers.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::{Error, KeyValueStore, Result};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Key-value store persisted as a JSON object in a single file.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Load the store from the given file, creating an empty one when the
    /// file does not exist.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Storage(format!("parsing state file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded state file");
            entries
        } else {
            info!(path = %path.display(), "state file not found, starting empty");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.insert(key.to_owned(), value.to_owned());
            write_atomic(&self.path, &state).await
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.remove(key).is_some() {
                write_atomic(&self.path, &state).await?;
            }
            Ok(())
        })
    }
}

/// Write the state to disk atomically (temp file + rename, 0600).
async fn write_atomic(path: &Path, entries: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Storage(format!("serializing state: {e}")))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let tmp_path = dir.join(format!(".state.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes()).await?;

    // 0600: the file can carry login state (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms).await?;
    }

    tokio::fs::rename(&tmp_path, path).await?;

    debug!(path = %path.display(), "persisted state");
    Ok(())
}
