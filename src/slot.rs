use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

pub const DEFAULT_HISTORY_KEY: &str = "academic-insight-predictions";

/// A named key holding one serialized value, in the manner of browser local storage.
#[async_trait]
pub trait Slot: Send + Sync {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform data dir>/academic-insight`, falling back to the working directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("academic-insight")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl Slot for FileSlot {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(key);
        tokio::fs::write(&path, value)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
pub use memory::MemorySlot;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::Slot;

    /// Shared in-memory slot; clones see the same contents.
    #[derive(Clone, Default)]
    pub struct MemorySlot {
        values: Arc<Mutex<HashMap<String, String>>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    impl MemorySlot {
        pub fn with_value(key: &str, value: &str) -> Self {
            let slot = Self::default();
            slot.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            slot
        }

        pub fn read_only() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub fn unreadable() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        pub fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl Slot for MemorySlot {
        async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_reads {
                anyhow::bail!("slot is unreadable");
            }
            Ok(self.get(key))
        }

        async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("slot is read-only");
            }
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
