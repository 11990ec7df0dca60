use crate::applier::ApplyOptions;
use crate::errors::ModifierResult;
use crate::fleurinp::FleurinpData;
use crate::registry::OperationRegistry;
use fleurmod_common::{FileSystem, RealFileSystem};
use fleurmod_schema::{Schema, SchemaCache};
use std::sync::Arc;

/// Everything a modification session needs from its surroundings
///
/// Built once and cloned into sessions; clones share the registry, the
/// file system and the schema cache.
#[derive(Clone)]
pub struct ModifierContext {
    pub registry: Arc<OperationRegistry>,
    pub fs: Arc<dyn FileSystem>,
    pub schemas: SchemaCache,
    /// Defaults for replays; `options.schema` is used for inputs that do
    /// not name a schema file
    pub options: ApplyOptions,
}

impl ModifierContext {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            registry: Arc::new(OperationRegistry::builtin()),
            fs,
            schemas: SchemaCache::new(),
            options: ApplyOptions::default(),
        }
    }

    /// Context on the real file system
    pub fn local() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }

    pub fn with_registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.options.schema = Some(schema);
        self
    }

    /// Fall back to the bundled Fleur input schema
    pub fn with_bundled_schema(self) -> ModifierResult<Self> {
        let schema = self.schemas.bundled()?;
        Ok(self.with_schema(schema))
    }

    /// Schema for `data`: its own schema file if it names one, else the
    /// context default
    pub fn schema_for(&self, data: &FleurinpData) -> ModifierResult<Option<Arc<Schema>>> {
        match data.schema_path() {
            Some(path) => Ok(Some(self.schemas.load(self.fs.as_ref(), path)?)),
            None => Ok(self.options.schema.clone()),
        }
    }
}

impl std::fmt::Debug for ModifierContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierContext")
            .field("registry", &self.registry)
            .field("schemas", &self.schemas)
            .field("options", &self.options)
            .finish()
    }
}
