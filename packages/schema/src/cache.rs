use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use fleurmod_common::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const BUNDLED_KEY: &str = "<bundled>";

/// Schemas loaded once per path and shared read-only
///
/// Cloning the cache shares the underlying map.
#[derive(Clone, Default)]
pub struct SchemaCache {
    schemas: Arc<RwLock<HashMap<PathBuf, Arc<Schema>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the schema at `path`, or return the cached copy
    pub fn load(&self, fs: &dyn FileSystem, path: &Path) -> SchemaResult<Arc<Schema>> {
        if let Some(schema) = self.get(path)? {
            return Ok(schema);
        }

        let schema = Schema::load(fs, path)?;
        self.insert(path, schema)
    }

    /// The bundled Fleur input schema
    pub fn bundled(&self) -> SchemaResult<Arc<Schema>> {
        let key = Path::new(BUNDLED_KEY);
        if let Some(schema) = self.get(key)? {
            return Ok(schema);
        }
        self.insert(key, Schema::bundled()?)
    }

    pub fn insert(&self, path: &Path, schema: Schema) -> SchemaResult<Arc<Schema>> {
        let mut schemas = self.schemas.write().map_err(|_| SchemaError::CachePoisoned)?;
        // Another thread may have loaded it meanwhile; keep the first one
        let entry = schemas
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(schema));
        Ok(Arc::clone(entry))
    }

    fn get(&self, path: &Path) -> SchemaResult<Option<Arc<Schema>>> {
        let schemas = self.schemas.read().map_err(|_| SchemaError::CachePoisoned)?;
        Ok(schemas.get(path).cloned())
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_common::MockFileSystem;

    #[test]
    fn test_schema_loaded_once() {
        let fs = MockFileSystem::new().with_file(
            "/s.json",
            r#"{"version": "1", "root": "a", "elements": {"a": {}}}"#,
        );
        let cache = SchemaCache::new();

        let first = cache.load(&fs, Path::new("/s.json")).unwrap();
        let second = cache.load(&fs, Path::new("/s.json")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = SchemaCache::new();
        let shared = cache.clone();

        let bundled = cache.bundled().unwrap();
        assert!(Arc::ptr_eq(&bundled, &shared.bundled().unwrap()));
        assert_eq!(shared.len(), 1);
    }
}
