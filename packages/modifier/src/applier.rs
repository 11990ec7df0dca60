//! # Modification Applier
//!
//! Replays a task list against a copy of a baseline document:
//!
//! 1. Bind every task (unknown operations and bad arguments fail here,
//!    before anything is edited)
//! 2. Clone the baseline and apply the tasks in order
//! 3. Optionally validate an include-resolved copy of the result
//!
//! The returned document keeps its include directives.

use crate::errors::{ModifierError, ModifierResult, TaskError};
use crate::raw::RawTask;
use crate::registry::OperationRegistry;
use crate::task::Task;
use fleurmod_common::FileSystem;
use fleurmod_schema::{validate, IncludeResolver, Schema, SchemaValidationError};
use fleurmod_xml::Document;
use std::path::Path;
use std::sync::Arc;

/// Validation settings for one replay
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Schema to check the result against, `None` to skip the check
    pub schema: Option<Arc<Schema>>,
    /// Turn a failed check into an error instead of reporting it
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationStatus {
    NotChecked,
    Valid,
    Invalid(SchemaValidationError),
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }
}

/// Result of a replay
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub document: Document,
    pub validation: ValidationStatus,
}

/// Replays task lists using one registry
pub struct Applier<'a> {
    registry: &'a OperationRegistry,
}

impl<'a> Applier<'a> {
    pub fn new(registry: &'a OperationRegistry) -> Self {
        Self { registry }
    }

    /// Bind every task, failing on the first one that does not bind
    pub fn bind_all(&self, tasks: &[RawTask]) -> Result<Vec<Task>, TaskError> {
        tasks
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                self.registry.bind(raw).inspect_err(|e| {
                    tracing::debug!(operation = %raw.name, index, error = %e, "Task rejected");
                })
            })
            .collect()
    }

    /// Apply `tasks` to a copy of `baseline`
    pub fn replay(&self, baseline: &Document, tasks: &[RawTask]) -> Result<Document, TaskError> {
        let bound = self.bind_all(tasks)?;

        let mut working = baseline.clone();
        for (index, task) in bound.iter().enumerate() {
            tracing::debug!(operation = %task.name(), index, "Applying task");
            task.apply(&mut working)?;
        }
        Ok(working)
    }

    /// Replay and validate; `files` supplies the targets of include
    /// directives
    pub fn apply(
        &self,
        baseline: &Document,
        tasks: &[RawTask],
        files: &dyn FileSystem,
        options: &ApplyOptions,
    ) -> ModifierResult<ApplyOutcome> {
        let document = self.replay(baseline, tasks)?;

        let validation = match &options.schema {
            Some(schema) => validate_document(schema, &document, files)?,
            None => ValidationStatus::NotChecked,
        };

        if let ValidationStatus::Invalid(error) = &validation {
            if options.strict {
                return Err(ModifierError::SchemaValidation(error.clone()));
            }
            tracing::warn!(
                violations = error.violations.len(),
                "Modified document failed schema validation"
            );
        }

        Ok(ApplyOutcome {
            document,
            validation,
        })
    }
}

/// Validate an include-resolved copy of `doc`
pub fn validate_document(
    schema: &Schema,
    doc: &Document,
    files: &dyn FileSystem,
) -> ModifierResult<ValidationStatus> {
    let resolved = IncludeResolver::new(files, Path::new(""))
        .resolve(doc)
        .inspect_err(|e| tracing::warn!(error = %e, "Could not resolve includes"))?;

    Ok(match validate(schema, &resolved) {
        Ok(()) => ValidationStatus::Valid,
        Err(error) => ValidationStatus::Invalid(error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_common::MockFileSystem;
    use fleurmod_xml::{parse, Serializer};
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawTask {
        serde_json::from_value(value).unwrap()
    }

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::from_json(
                r#"{"version": "t", "root": "a", "elements": {
                    "a": {"attributes": {"x": {"type": "integer", "required": true}}}
                }}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_replay_in_order() {
        let registry = OperationRegistry::builtin();
        let baseline = parse(r#"<a x="1"/>"#).unwrap();
        let tasks = vec![
            raw(json!(["xml_set_first_attribv", "/a", "x", "2"])),
            raw(json!(["add_num_to_att", "/a", "x", 3])),
        ];

        let result = Applier::new(&registry).replay(&baseline, &tasks).unwrap();
        assert_eq!(Serializer::compact().serialize(&result), r#"<a x="5"/>"#);
        assert_eq!(Serializer::compact().serialize(&baseline), r#"<a x="1"/>"#);
    }

    #[test]
    fn test_unknown_operation_fails_before_any_edit() {
        let registry = OperationRegistry::builtin();
        let tasks = vec![
            raw(json!(["xml_set_first_attribv", "/a", "x", "2"])),
            raw(json!(["frobnicate", "/a"])),
        ];
        let result = Applier::new(&registry).bind_all(&tasks);
        assert_eq!(result, Err(TaskError::UnknownOperation("frobnicate".into())));
    }

    #[test]
    fn test_invalid_result_reported_or_rejected() {
        let registry = OperationRegistry::builtin();
        let baseline = parse(r#"<a x="1"/>"#).unwrap();
        let tasks = vec![raw(json!(["xml_set_first_attribv", "/a", "x", "one"]))];
        let fs = MockFileSystem::new();

        let lenient = ApplyOptions {
            schema: Some(schema()),
            strict: false,
        };
        let outcome = Applier::new(&registry)
            .apply(&baseline, &tasks, &fs, &lenient)
            .unwrap();
        assert!(matches!(outcome.validation, ValidationStatus::Invalid(_)));

        let strict = ApplyOptions {
            strict: true,
            ..lenient
        };
        assert!(matches!(
            Applier::new(&registry).apply(&baseline, &tasks, &fs, &strict),
            Err(ModifierError::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_without_schema_nothing_is_checked() {
        let registry = OperationRegistry::builtin();
        let baseline = parse(r#"<a x="1"/>"#).unwrap();
        let outcome = Applier::new(&registry)
            .apply(&baseline, &[], &MockFileSystem::new(), &ApplyOptions::default())
            .unwrap();
        assert_eq!(outcome.validation, ValidationStatus::NotChecked);
        assert_eq!(outcome.document, baseline);
    }
}
