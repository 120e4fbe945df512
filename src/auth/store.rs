use std::path::{Path, PathBuf};

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, error};

/// Logical key the session blob lives under.
pub const SESSION_KEY: &str = "odoo_session";

/// Scoped storage for the single serialized session blob.
///
/// Implementations are expected to keep the blob encrypted at rest; the core
/// never inspects how. Failures are reported as `false` / `None` rather than
/// raised, since a lost session only means logging in again.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, blob: &str) -> bool;
    async fn load(&self) -> Option<String>;
    async fn clear(&self) -> bool;
}

/// In-process store backed by a moka cache. Nothing survives a restart.
pub struct MemorySessionStore {
    cache: Cache<String, String>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self {
            cache: Cache::builder().initial_capacity(1).build(),
        }
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, blob: &str) -> bool {
        self.cache
            .insert(SESSION_KEY.to_string(), blob.to_string())
            .await;
        true
    }

    async fn load(&self) -> Option<String> {
        self.cache.get(SESSION_KEY).await
    }

    async fn clear(&self) -> bool {
        self.cache.invalidate(SESSION_KEY).await;
        true
    }
}

/// One file per key inside `dir`, readable by the owner only on unix.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", SESSION_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_private(&self, blob: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, blob).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, blob: &str) -> bool {
        match self.write_private(blob).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "session saved");
                true
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Error saving session");
                false
            }
        }
    }

    async fn load(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Some(blob),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Error reading session");
                None
            }
        }
    }

    async fn clear(&self) -> bool {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Error clearing session");
                false
            }
        }
    }
}
