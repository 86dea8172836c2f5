use hashbrown::HashMap;

use super::{BlobStore, PersistResult};

/// Process-local medium for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    /// Empty medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Medium pre-seeded with one blob.
    pub fn with_blob(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(name.into(), value.into());
        Self { blobs }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, name: &str) -> PersistResult<Option<String>> {
        Ok(self.blobs.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> PersistResult<()> {
        self.blobs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> PersistResult<()> {
        self.blobs.remove(name);
        Ok(())
    }
}
