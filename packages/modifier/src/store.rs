//! # Provenance Store
//!
//! In-memory persistence for frozen inputs: data nodes, immutable
//! parameter records and the process nodes linking them.
//!
//! ```text
//!   FleurinpData ──original──┐
//!                            ├──> process "fleurinp modifier" ──result──> FleurinpData
//!   Dict {tasks} ──modifications┘
//! ```
//!
//! Node ids are random v4 uuids, unique across stores.

use crate::fleurinp::{FleurinpData, INPUT_FILE};
use chrono::{DateTime, Utc};
use fleurmod_xml::checksum;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node is already stored: {0}")]
    AlreadyStored(String),

    #[error("Stored node {0} is immutable")]
    Immutable(String),

    #[error("Missing file: {0}")]
    MissingFile(String),
}

/// Immutable structured record (the task list of a freeze)
#[derive(Debug, Clone, Serialize)]
pub struct DictRecord {
    pub uuid: String,
    pub label: String,
    pub description: String,
    pub content: Value,
    /// Checksum of the compact JSON content
    pub checksum: String,
    pub ctime: DateTime<Utc>,
}

/// Labelled edge between a process and a stored node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: String,
    pub uuid: String,
}

impl Link {
    pub fn new(label: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            uuid: uuid.into(),
        }
    }
}

/// A recorded transformation
#[derive(Debug, Clone, Serialize)]
pub struct ProcessNode {
    pub uuid: String,
    pub label: String,
    pub ctime: DateTime<Utc>,
    pub inputs: Vec<Link>,
    pub outputs: Vec<Link>,
}

#[derive(Serialize)]
struct DataEntry<'a> {
    uuid: &'a str,
    label: &'a str,
    description: &'a str,
    files: Vec<&'a str>,
    input_checksum: Option<String>,
}

#[derive(Serialize)]
struct GraphExport<'a> {
    data: Vec<DataEntry<'a>>,
    records: Vec<&'a DictRecord>,
    processes: &'a [ProcessNode],
}

/// Local, in-memory provenance graph
#[derive(Debug, Default)]
pub struct LocalProvenanceStore {
    data: BTreeMap<String, FleurinpData>,
    records: BTreeMap<String, DictRecord>,
    processes: Vec<ProcessNode>,
    /// `(baseline uuid, compact record JSON)` → result uuid
    cache: HashMap<(String, String), String>,
    caching: bool,
}

impl LocalProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse results of identical freezes instead of storing new ones
    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn caching(&self) -> bool {
        self.caching
    }

    /// Store `data`, assigning its id; the caller's value is marked
    /// stored as well
    pub fn store_fleurinp(&mut self, data: &mut FleurinpData) -> Result<String, StoreError> {
        if let Some(uuid) = data.uuid() {
            return Err(StoreError::AlreadyStored(uuid.to_string()));
        }
        if !data.has_file(INPUT_FILE) {
            return Err(StoreError::MissingFile(INPUT_FILE.to_string()));
        }

        let uuid = new_id();
        data.mark_stored(uuid.clone());
        self.data.insert(uuid.clone(), data.clone());
        tracing::debug!(uuid = %uuid, label = %data.label(), "Stored input data");
        Ok(uuid)
    }

    pub fn store_dict(
        &mut self,
        content: Value,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<DictRecord, StoreError> {
        let record = DictRecord {
            uuid: new_id(),
            label: label.into(),
            description: description.into(),
            checksum: record_checksum(&content),
            content,
            ctime: Utc::now(),
        };
        self.records.insert(record.uuid.clone(), record.clone());
        Ok(record)
    }

    pub fn record_process(
        &mut self,
        label: impl Into<String>,
        inputs: Vec<Link>,
        outputs: Vec<Link>,
    ) -> Result<String, StoreError> {
        for link in inputs.iter().chain(&outputs) {
            if !self.contains(&link.uuid) {
                return Err(StoreError::NodeNotFound(link.uuid.clone()));
            }
        }

        let uuid = new_id();
        self.processes.push(ProcessNode {
            uuid: uuid.clone(),
            label: label.into(),
            ctime: Utc::now(),
            inputs,
            outputs,
        });
        Ok(uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.data.contains_key(uuid)
            || self.records.contains_key(uuid)
            || self.processes.iter().any(|p| p.uuid == uuid)
    }

    pub fn load_fleurinp(&self, uuid: &str) -> Result<&FleurinpData, StoreError> {
        self.data
            .get(uuid)
            .ok_or_else(|| StoreError::NodeNotFound(uuid.to_string()))
    }

    pub fn record(&self, uuid: &str) -> Result<&DictRecord, StoreError> {
        self.records
            .get(uuid)
            .ok_or_else(|| StoreError::NodeNotFound(uuid.to_string()))
    }

    /// Process whose outputs include `uuid`
    pub fn creator(&self, uuid: &str) -> Option<&ProcessNode> {
        self.processes
            .iter()
            .find(|p| p.outputs.iter().any(|l| l.uuid == uuid))
    }

    pub fn processes(&self) -> &[ProcessNode] {
        &self.processes
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    /// Result of an earlier freeze of `baseline` with the same record
    pub fn cached_result(&self, baseline: &str, content: &Value) -> Option<&FleurinpData> {
        if !self.caching {
            return None;
        }
        self.cache
            .get(&(baseline.to_string(), content.to_string()))
            .and_then(|uuid| self.data.get(uuid))
    }

    pub fn cache_result(&mut self, baseline: &str, content: &Value, result: &str) {
        if self.caching {
            self.cache
                .insert((baseline.to_string(), content.to_string()), result.to_string());
        }
    }

    /// The whole graph as pretty JSON
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        let data = self
            .data
            .values()
            .filter_map(|d| {
                Some(DataEntry {
                    uuid: d.uuid()?,
                    label: d.label(),
                    description: d.description(),
                    files: d.file_names().collect(),
                    input_checksum: d.file(INPUT_FILE).map(|s| checksum(s.as_bytes())),
                })
            })
            .collect();

        serde_json::to_string_pretty(&GraphExport {
            data,
            records: self.records.values().collect(),
            processes: &self.processes,
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Checksum of a record's compact JSON form
pub fn record_checksum(content: &Value) -> String {
    checksum(content.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_assigns_ids() {
        let mut store = LocalProvenanceStore::new();
        let mut first = FleurinpData::from_input("<fleurInput/>");
        let mut second = FleurinpData::from_input("<fleurInput/>");

        let a = store.store_fleurinp(&mut first).unwrap();
        let b = store.store_fleurinp(&mut second).unwrap();

        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(first.uuid(), Some(a.as_str()));
        assert_eq!(store.data_count(), 2);
    }

    #[test]
    fn test_ids_unique_across_stores() {
        let mut a = LocalProvenanceStore::new();
        let mut b = LocalProvenanceStore::new();
        let mut x = FleurinpData::from_input(r#"<fleurInput tag="X"/>"#);
        let mut y = FleurinpData::from_input(r#"<fleurInput tag="Y"/>"#);

        let x_id = a.store_fleurinp(&mut x).unwrap();
        let y_id = b.store_fleurinp(&mut y).unwrap();

        assert_ne!(x_id, y_id);
        assert!(b.load_fleurinp(&x_id).is_err());
        assert!(!a.contains(&y_id));
    }

    #[test]
    fn test_store_twice_rejected() {
        let mut store = LocalProvenanceStore::default();
        let mut data = FleurinpData::from_input("<fleurInput/>");
        let uuid = store.store_fleurinp(&mut data).unwrap();
        assert_eq!(store.store_fleurinp(&mut data), Err(StoreError::AlreadyStored(uuid)));
    }

    #[test]
    fn test_store_requires_input_file() {
        let mut store = LocalProvenanceStore::default();
        let mut data = FleurinpData::new();
        assert_eq!(
            store.store_fleurinp(&mut data),
            Err(StoreError::MissingFile(INPUT_FILE.to_string()))
        );
    }

    #[test]
    fn test_process_links_must_exist() {
        let mut store = LocalProvenanceStore::default();
        let record = store.store_dict(json!({"tasks": []}), "r", "").unwrap();

        assert!(store
            .record_process("p", vec![Link::new("modifications", &record.uuid)], vec![])
            .is_ok());
        assert_eq!(
            store.record_process("p", vec![Link::new("original", "nope")], vec![]),
            Err(StoreError::NodeNotFound("nope".into()))
        );
    }

    #[test]
    fn test_cache_only_when_enabled() {
        let mut store = LocalProvenanceStore::default();
        let mut data = FleurinpData::from_input("<fleurInput/>");
        let uuid = store.store_fleurinp(&mut data).unwrap();

        let record = json!({"tasks": [["create_tag", "/fleurInput", "plumless"]]});
        store.cache_result("base", &record, &uuid);
        assert!(store.cached_result("base", &record).is_none());

        let mut store = store.with_caching(true);
        store.cache_result("base", &record, &uuid);
        assert_eq!(
            store.cached_result("base", &record).and_then(|d| d.uuid()),
            Some(uuid.as_str())
        );
        assert!(store.cached_result("other", &record).is_none());
    }

    #[test]
    fn test_cache_keyed_on_full_record() {
        let mut store = LocalProvenanceStore::new().with_caching(true);
        let mut data = FleurinpData::from_input("<fleurInput><plumless/></fleurInput>");
        let uuid = store.store_fleurinp(&mut data).unwrap();

        let plumless = json!({"tasks": [["create_tag", "/fleurInput", "plumless"]]});
        let buckeroo = json!({"tasks": [["create_tag", "/fleurInput", "buckeroo"]]});
        assert_eq!(record_checksum(&plumless), record_checksum(&buckeroo));

        store.cache_result("base", &plumless, &uuid);
        assert!(store.cached_result("base", &plumless).is_some());
        assert!(store.cached_result("base", &buckeroo).is_none());
    }

    #[test]
    fn test_export_json() {
        let mut store = LocalProvenanceStore::default();
        let mut data = FleurinpData::from_input("<fleurInput/>");
        store.store_fleurinp(&mut data).unwrap();
        store.store_dict(json!({"tasks": []}), "mods", "").unwrap();

        let exported: Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported["data"][0]["files"], json!(["inp.xml"]));
        assert_eq!(exported["records"][0]["label"], "mods");
        assert_eq!(exported["processes"], json!([]));
    }
}
