//! # Modification Session
//!
//! A [`FleurinpModifier`] collects edits for one baseline input and turns
//! them into a preview, a validation result, or a new stored input.
//!
//! Recording checks each task against the registry immediately, so a bad
//! argument fails where it was written rather than at freeze time. Nothing
//! touches the baseline: every replay starts from a fresh copy.

use crate::applier::{validate_document, Applier, ApplyOptions, ApplyOutcome, ValidationStatus};
use crate::context::ModifierContext;
use crate::errors::{ModifierError, ModifierResult, TaskError};
use crate::fleurinp::{FleurinpData, INPUT_FILE};
use crate::raw::RawTask;
use crate::store::{Link, LocalProvenanceStore};
use crate::task_list::TaskList;
use fleurmod_xml::{Document, Serializer};
use serde_json::{json, Map, Value};

pub const MODIFICATIONS_LABEL: &str = "Fleurinpdata modifications";
pub const MODIFICATIONS_DESCRIPTION: &str = "Fleurinpmodifier Tasks and inputs of these.";
pub const RESULT_LABEL: &str = "mod_fleurinp";
pub const RESULT_DESCRIPTION: &str =
    "Fleurinpdata with modifications (see inputs of modify_fleurinpdata)";
pub const PROCESS_LABEL: &str = "fleurinp modifier";

/// Modification session bound to one baseline input
pub struct FleurinpModifier {
    context: ModifierContext,
    original: FleurinpData,
    tasks: TaskList,
    frozen: bool,
}

impl std::fmt::Debug for FleurinpModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleurinpModifier")
            .field("original", &self.original)
            .field("tasks", &self.tasks)
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}

impl FleurinpModifier {
    pub fn new(context: ModifierContext, original: FleurinpData) -> Self {
        Self {
            context,
            original,
            tasks: TaskList::new(),
            frozen: false,
        }
    }

    pub fn original(&self) -> &FleurinpData {
        &self.original
    }

    pub fn context(&self) -> &ModifierContext {
        &self.context
    }

    /// Operation names understood by this session
    pub fn available_operations(&self) -> Vec<&'static str> {
        self.context.registry.names()
    }

    /// Recorded tasks in order
    pub fn changes(&self) -> &[RawTask] {
        self.tasks.list_tasks()
    }

    pub fn list_tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop the most recent task
    pub fn undo_last(&mut self) -> Option<RawTask> {
        if self.frozen {
            tracing::warn!("Ignoring undo on frozen modifications");
            return None;
        }
        self.tasks.undo_last()
    }

    pub fn clear(&mut self) {
        if self.frozen {
            tracing::warn!("Ignoring clear on frozen modifications");
            return;
        }
        self.tasks.clear();
    }

    fn ensure_open(&self) -> Result<(), TaskError> {
        if self.frozen {
            Err(TaskError::malformed("modifications are already frozen"))
        } else {
            Ok(())
        }
    }

    /// Validate `raw` and append it in canonical form
    pub fn record(&mut self, raw: RawTask) -> Result<&mut Self, TaskError> {
        self.ensure_open()?;
        let task = self.context.registry.bind(&raw)?;
        tracing::trace!(operation = %task.name(), "Recorded task");
        self.tasks.push(task.to_raw());
        Ok(self)
    }

    /// Record a change given as `(operation name, keyword arguments)`
    pub fn record_change(
        &mut self,
        name: &str,
        kwargs: &Map<String, Value>,
    ) -> Result<&mut Self, TaskError> {
        self.ensure_open()?;
        let task = self.context.registry.bind_kwargs(name, kwargs)?;
        self.tasks.push(task.to_raw());
        Ok(self)
    }

    /// Record several changes; stops at the first one that fails
    pub fn record_changes<'c, I>(&mut self, changes: I) -> Result<&mut Self, TaskError>
    where
        I: IntoIterator<Item = (&'c str, &'c Map<String, Value>)>,
    {
        for (name, kwargs) in changes {
            self.record_change(name, kwargs)?;
        }
        Ok(self)
    }

    /// Append stored tasks as they are, without checking them
    ///
    /// Operations unknown to this build are only reported when applied.
    pub fn load_tasks(&mut self, tasks: TaskList) -> Result<&mut Self, TaskError> {
        self.ensure_open()?;
        self.tasks = self.tasks.concat(&tasks);
        Ok(self)
    }

    pub fn xml_set_attribv_occ(
        &mut self,
        xpathn: &str,
        attributename: &str,
        attribv: impl Into<Value>,
        occ: &[i64],
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_attribv_occ",
            vec![json!(xpathn), json!(attributename), attribv.into(), json!(occ), json!(create)],
        ))
    }

    pub fn xml_set_first_attribv(
        &mut self,
        xpathn: &str,
        attributename: &str,
        attribv: impl Into<Value>,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_first_attribv",
            vec![json!(xpathn), json!(attributename), attribv.into(), json!(create)],
        ))
    }

    /// `attribv` may be a list with one value per match
    pub fn xml_set_all_attribv(
        &mut self,
        xpathn: &str,
        attributename: &str,
        attribv: impl Into<Value>,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_all_attribv",
            vec![json!(xpathn), json!(attributename), attribv.into(), json!(create)],
        ))
    }

    pub fn xml_set_text(
        &mut self,
        xpathn: &str,
        text: impl Into<Value>,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_text",
            vec![json!(xpathn), text.into(), json!(create)],
        ))
    }

    pub fn xml_set_text_occ(
        &mut self,
        xpathn: &str,
        text: impl Into<Value>,
        create: bool,
        occ: i64,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_text_occ",
            vec![json!(xpathn), text.into(), json!(create), json!(occ)],
        ))
    }

    pub fn xml_set_all_text(
        &mut self,
        xpathn: &str,
        text: impl Into<Value>,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "xml_set_all_text",
            vec![json!(xpathn), text.into(), json!(create)],
        ))
    }

    /// `newelement` is a tag name or an XML snippet
    pub fn create_tag(
        &mut self,
        xpath: &str,
        newelement: &str,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "create_tag",
            vec![json!(xpath), json!(newelement), json!(create)],
        ))
    }

    pub fn replace_tag(&mut self, xpath: &str, newelement: &str) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new("replace_tag", vec![json!(xpath), json!(newelement)]))
    }

    pub fn delete_tag(&mut self, xpath: &str) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new("delete_tag", vec![json!(xpath)]))
    }

    pub fn delete_att(&mut self, xpath: &str, attrib: &str) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new("delete_att", vec![json!(xpath), json!(attrib)]))
    }

    pub fn set_species(
        &mut self,
        species_name: &str,
        attributedict: Value,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "set_species",
            vec![json!(species_name), attributedict, json!(create)],
        ))
    }

    pub fn set_species_label(
        &mut self,
        at_label: &str,
        attributedict: Value,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "set_species_label",
            vec![json!(at_label), attributedict, json!(create)],
        ))
    }

    /// Exactly one of `position` (1-based) and `species` must be given
    pub fn set_atomgr_att(
        &mut self,
        attributedict: Value,
        position: Option<usize>,
        species: Option<&str>,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "set_atomgr_att",
            vec![attributedict, json!(position), json!(species), json!(create)],
        ))
    }

    pub fn set_atomgr_att_label(
        &mut self,
        attributedict: Value,
        atom_label: &str,
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "set_atomgr_att_label",
            vec![attributedict, json!(atom_label), json!(create)],
        ))
    }

    pub fn set_inpchanges(&mut self, change_dict: Value) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new("set_inpchanges", vec![change_dict]))
    }

    pub fn set_nkpts(&mut self, count: u64, gamma: bool) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new("set_nkpts", vec![json!(count), json!(gamma)]))
    }

    pub fn add_num_to_att(
        &mut self,
        xpathn: &str,
        attributename: &str,
        set_val: f64,
        mode: &str,
        occ: &[i64],
        create: bool,
    ) -> Result<&mut Self, TaskError> {
        self.record(RawTask::new(
            "add_num_to_att",
            vec![
                json!(xpathn),
                json!(attributename),
                json!(set_val),
                json!(mode),
                json!(occ),
                json!(create),
            ],
        ))
    }

    /// Replay the recorded tasks on a copy of the baseline
    pub fn apply(&self, options: &ApplyOptions) -> ModifierResult<ApplyOutcome> {
        let baseline = self.original.input_document()?;
        Applier::new(&self.context.registry).apply(
            &baseline,
            self.tasks.list_tasks(),
            &self.original.inner_files(),
            options,
        )
    }

    /// Candidate document, strictly validated; fails when no schema is
    /// available
    pub fn validate(&self) -> ModifierResult<Document> {
        let schema = self
            .context
            .schema_for(&self.original)?
            .ok_or(ModifierError::SchemaUnavailable)?;
        let outcome = self.apply(&ApplyOptions {
            schema: Some(schema),
            strict: true,
        })?;
        Ok(outcome.document)
    }

    /// Candidate document for inspection, optionally validated
    pub fn show(&self, validate: bool) -> ModifierResult<Document> {
        let schema = if validate {
            let schema = self.context.schema_for(&self.original)?;
            if schema.is_none() {
                tracing::warn!("No schema available, showing unvalidated document");
            }
            schema
        } else {
            None
        };

        let outcome = self.apply(&ApplyOptions {
            schema,
            strict: self.context.options.strict,
        })?;
        Ok(outcome.document)
    }

    /// [`show`](Self::show) as pretty-printed XML
    pub fn show_string(&self, validate: bool) -> ModifierResult<String> {
        Ok(Serializer::new().serialize(&self.show(validate)?))
    }

    /// Commit the recorded tasks into a new stored input
    ///
    /// The baseline must pass schema validation before any task runs. On
    /// success the store holds the baseline, the task record, the result
    /// and a process node linking them.
    pub fn freeze(&mut self, store: &mut LocalProvenanceStore) -> ModifierResult<FleurinpData> {
        tracing::info!(tasks = self.tasks.len(), "Freezing modifications");

        let content = json!({ "tasks": serde_json::to_value(&self.tasks)? });

        if let Some(baseline) = self.original.uuid() {
            if let Some(cached) = store.cached_result(baseline, &content) {
                tracing::info!(uuid = ?cached.uuid(), "Reusing cached modification result");
                self.frozen = true;
                return Ok(cached.clone());
            }
        }

        let baseline = self.original.input_document()?;
        let schema = self.context.schema_for(&self.original)?;
        match &schema {
            Some(schema) => {
                let files = self.original.inner_files();
                let status = validate_document(schema, &baseline, &files)?;
                if let ValidationStatus::Invalid(error) = status {
                    return Err(ModifierError::SchemaValidation(error));
                }
            }
            None => tracing::warn!("No schema available, baseline not validated"),
        }

        let outcome = Applier::new(&self.context.registry).apply(
            &baseline,
            self.tasks.list_tasks(),
            &self.original.inner_files(),
            &ApplyOptions {
                schema,
                strict: self.context.options.strict,
            },
        )?;

        let mut result = self.original.clone_unstored();
        result.del_file(INPUT_FILE)?;
        result.add_file(INPUT_FILE, Serializer::new().serialize(&outcome.document))?;
        result.set_label(RESULT_LABEL)?;
        result.set_description(RESULT_DESCRIPTION)?;

        let baseline_uuid = self.link_baseline(store)?;

        let record =
            store.store_dict(content.clone(), MODIFICATIONS_LABEL, MODIFICATIONS_DESCRIPTION)?;
        let result_uuid = store.store_fleurinp(&mut result)?;
        store.record_process(
            PROCESS_LABEL,
            vec![
                Link::new("original", &baseline_uuid),
                Link::new("modifications", &record.uuid),
            ],
            vec![Link::new("result", &result_uuid)],
        )?;
        store.cache_result(&baseline_uuid, &content, &result_uuid);

        tracing::info!(uuid = %result_uuid, "Stored modified input");
        self.frozen = true;
        Ok(result)
    }

    /// Id of the baseline in `store`, storing it first when unstored
    ///
    /// A baseline stored elsewhere is linked through a copy stored here.
    fn link_baseline(&mut self, store: &mut LocalProvenanceStore) -> ModifierResult<String> {
        let Some(uuid) = self.original.uuid() else {
            return Ok(store.store_fleurinp(&mut self.original)?);
        };
        if store.load_fleurinp(uuid).is_ok_and(|stored| *stored == self.original) {
            return Ok(uuid.to_string());
        }

        tracing::debug!(uuid, "Baseline not in this store, storing a copy");
        let mut copy = self.original.clone_unstored();
        copy.set_label(self.original.label())?;
        copy.set_description(self.original.description())?;
        Ok(store.store_fleurinp(&mut copy)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_common::MockFileSystem;
    use std::sync::Arc;

    fn modifier(input: &str) -> FleurinpModifier {
        let context = ModifierContext::new(Arc::new(MockFileSystem::new()));
        FleurinpModifier::new(context, FleurinpData::from_input(input))
    }

    fn compact(doc: &Document) -> String {
        Serializer::compact().serialize(doc)
    }

    #[test]
    fn test_fluent_recording() {
        let mut m = modifier(r#"<a x="1"/>"#);
        m.xml_set_first_attribv("/a", "x", "2", false)
            .unwrap()
            .add_num_to_att("/a", "x", 5.0, "abs", &[0], false)
            .unwrap();

        assert_eq!(m.changes().len(), 2);
        assert_eq!(compact(&m.show(false).unwrap()), r#"<a x="7"/>"#);
    }

    #[test]
    fn test_record_fails_fast() {
        let mut m = modifier("<a/>");
        assert!(matches!(
            m.add_num_to_att("/a", "x", 1.0, "sideways", &[0], false),
            Err(TaskError::MalformedTask(_))
        ));
        assert!(m.changes().is_empty());
    }

    #[test]
    fn test_record_change_by_name() {
        let mut m = modifier("<a/>");
        let mut kwargs = Map::new();
        kwargs.insert("xpath".into(), json!("/a"));
        kwargs.insert("newelement".into(), json!("b"));

        m.record_change("create_tag", &kwargs).unwrap();
        assert_eq!(
            m.record_change("make_tag", &kwargs).unwrap_err(),
            TaskError::UnknownOperation("make_tag".into())
        );
        assert_eq!(compact(&m.show(false).unwrap()), "<a><b/></a>");
    }

    #[test]
    fn test_validate_without_schema() {
        let m = modifier("<a/>");
        assert!(matches!(m.validate(), Err(ModifierError::SchemaUnavailable)));
    }

    #[test]
    fn test_recording_closed_after_freeze() {
        let mut m = modifier("<fleurInput/>");
        m.create_tag("/fleurInput", "comment", false).unwrap();
        let mut store = LocalProvenanceStore::default();
        m.freeze(&mut store).unwrap();

        assert!(m.is_frozen());
        assert!(m.delete_tag("/fleurInput/comment").is_err());
        assert_eq!(m.undo_last(), None);
        assert_eq!(m.changes().len(), 1);
    }
}
