use crate::error::CommonError;
use crate::result::CommonResult;
use fleurmod_xml::Document;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// File system abstraction for loading inputs, schemas and included files
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> CommonResult<String>;

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()>;

    /// Canonicalize a path (resolve symlinks, make absolute)
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error>;

    /// Read and parse an XML file
    fn read_document(&self, path: &Path) -> CommonResult<Document> {
        let source = self.read_to_string(path)?;
        Ok(fleurmod_xml::parse(&source)?)
    }
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        if !path.exists() {
            return Err(CommonError::NotFound(path.display().to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        Ok(std::fs::write(path, contents)?)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::canonicalize(path)
    }
}

/// In-memory file system for testing
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.add_file(path, contents);
        self
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        let files = self
            .files
            .read()
            .map_err(|_| CommonError::Generic("mock file system poisoned".to_string()))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| CommonError::NotFound(path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| CommonError::Generic("mock file system poisoned".to_string()))?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        // For mock, just return the path as-is
        Ok(path.to_path_buf())
    }
}
