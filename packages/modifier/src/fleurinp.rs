//! # Fleur Input Data
//!
//! A set of named input files (`inp.xml` plus the files it includes) with
//! an optional schema path. Once stored, a `FleurinpData` is immutable;
//! edits go through [`FleurinpData::clone_unstored`].

use crate::errors::{ModifierError, ModifierResult};
use crate::store::StoreError;
use fleurmod_common::{CommonError, CommonResult, FileSystem};
use fleurmod_schema::include_targets;
use fleurmod_xml::{parse, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Name of the main input file
pub const INPUT_FILE: &str = "inp.xml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FleurinpData {
    files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_path: Option<PathBuf>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
}

impl FleurinpData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input consisting of `inp.xml` only
    pub fn from_input(contents: impl Into<String>) -> Self {
        let mut data = Self::new();
        data.files.insert(INPUT_FILE.to_string(), contents.into());
        data
    }

    /// Read `inp.xml` from `dir` together with every file it includes
    /// that exists next to it
    pub fn from_dir(fs: &dyn FileSystem, dir: &Path) -> ModifierResult<Self> {
        let input = fs.read_to_string(&dir.join(INPUT_FILE))?;
        let doc = parse(&input)?;

        let mut data = Self::from_input(input);
        for href in include_targets(&doc) {
            let path = dir.join(&href);
            if fs.exists(&path) {
                tracing::debug!(file = %href, "Reading included file");
                data.files.insert(href, fs.read_to_string(&path)?);
            }
        }
        Ok(data)
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        contents: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.ensure_mutable()?;
        self.files.insert(name.into(), contents.into());
        Ok(())
    }

    pub fn del_file(&mut self, name: &str) -> Result<Option<String>, StoreError> {
        self.ensure_mutable()?;
        Ok(self.files.remove(name))
    }

    pub fn schema_path(&self) -> Option<&Path> {
        self.schema_path.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<(), StoreError> {
        self.ensure_mutable()?;
        self.label = label.into();
        Ok(())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), StoreError> {
        self.ensure_mutable()?;
        self.description = description.into();
        Ok(())
    }

    /// Identifier assigned when stored
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn is_stored(&self) -> bool {
        self.uuid.is_some()
    }

    /// Editable copy: same files and schema, no identity
    pub fn clone_unstored(&self) -> Self {
        Self {
            files: self.files.clone(),
            schema_path: self.schema_path.clone(),
            label: String::new(),
            description: String::new(),
            uuid: None,
        }
    }

    pub(crate) fn mark_stored(&mut self, uuid: String) {
        self.uuid = Some(uuid);
    }

    fn ensure_mutable(&self) -> Result<(), StoreError> {
        match &self.uuid {
            Some(uuid) => Err(StoreError::Immutable(uuid.clone())),
            None => Ok(()),
        }
    }

    /// Parsed `inp.xml`
    pub fn input_document(&self) -> ModifierResult<Document> {
        let source = self
            .file(INPUT_FILE)
            .ok_or_else(|| ModifierError::File(CommonError::NotFound(INPUT_FILE.to_string())))?;
        Ok(parse(source)?)
    }

    /// Read-only file system view over the inner files, for include
    /// resolution
    pub fn inner_files(&self) -> InnerFiles<'_> {
        InnerFiles { files: &self.files }
    }
}

/// [`FileSystem`] over the files of one [`FleurinpData`]
pub struct InnerFiles<'a> {
    files: &'a BTreeMap<String, String>,
}

impl InnerFiles<'_> {
    fn key(path: &Path) -> String {
        path.components()
            .filter(|c| !matches!(c, Component::CurDir | Component::RootDir))
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl FileSystem for InnerFiles<'_> {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&Self::key(path))
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        self.files
            .get(&Self::key(path))
            .cloned()
            .ok_or_else(|| CommonError::NotFound(path.display().to_string()))
    }

    fn write(&self, path: &Path, _contents: &str) -> CommonResult<()> {
        Err(CommonError::Generic(format!(
            "cannot write {}: inner files are read-only",
            path.display()
        )))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        Ok(PathBuf::from(Self::key(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_common::MockFileSystem;

    const INPUT: &str = r#"<fleurInput><cell><xi:include xmlns:xi="http://www.w3.org/2001/XInclude" href="sym.xml"/></cell><xi:include xmlns:xi="http://www.w3.org/2001/XInclude" href="relax.xml"/></fleurInput>"#;

    #[test]
    fn test_from_dir_collects_existing_includes() {
        let fs = MockFileSystem::new()
            .with_file("/calc/inp.xml", INPUT)
            .with_file("/calc/sym.xml", "<symmetryOperations/>");

        let data = FleurinpData::from_dir(&fs, Path::new("/calc")).unwrap();
        assert_eq!(data.file_names().collect::<Vec<_>>(), vec!["inp.xml", "sym.xml"]);
    }

    #[test]
    fn test_missing_input_file() {
        let data = FleurinpData::new().with_file("sym.xml", "<s/>");
        assert!(matches!(data.input_document(), Err(ModifierError::File(_))));
    }

    #[test]
    fn test_stored_data_is_immutable() {
        let mut data = FleurinpData::from_input("<fleurInput/>");
        data.mark_stored("abc-1".into());

        assert_eq!(data.add_file("x.xml", "<x/>"), Err(StoreError::Immutable("abc-1".into())));
        assert!(data.set_label("changed").is_err());

        let mut copy = data.clone_unstored();
        assert!(!copy.is_stored());
        copy.add_file("x.xml", "<x/>").unwrap();
        assert!(!data.has_file("x.xml"));
    }

    #[test]
    fn test_inner_files_view() {
        let data = FleurinpData::from_input("<a/>").with_file("sym.xml", "<s/>");
        let fs = data.inner_files();
        assert!(fs.exists(Path::new("./sym.xml")));
        assert!(fs.exists(&Path::new("").join("sym.xml")));
        assert!(fs.read_to_string(Path::new("missing.xml")).is_err());
        assert!(fs.write(Path::new("sym.xml"), "<t/>").is_err());
    }
}
