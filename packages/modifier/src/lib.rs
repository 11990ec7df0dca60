//! # Fleur Input Modifier
//!
//! Records edits to a Fleur `inp.xml` as a replayable task list, previews
//! and validates the result, and commits it as a new stored input with
//! provenance.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: FleurinpModifier                   │
//! │  - Typed record methods, undo, clear        │
//! │  - show / validate / freeze                 │
//! └─────────────────────────────────────────────┘
//!                     ↓ RawTask list
//! ┌─────────────────────────────────────────────┐
//! │ registry: name → OperationSpec → Task       │
//! │  - Positional or keyword binding            │
//! │  - Argument checks at record time           │
//! └─────────────────────────────────────────────┘
//!                     ↓ Task
//! ┌─────────────────────────────────────────────┐
//! │ applier: replay on a copy of the baseline   │
//! │  - Optional schema check of the result      │
//! └─────────────────────────────────────────────┘
//!                     ↓ Document
//! ┌─────────────────────────────────────────────┐
//! │ store: data, task records, process links    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleurmod_modifier::{FleurinpData, FleurinpModifier, LocalProvenanceStore, ModifierContext};
//! use serde_json::json;
//!
//! let context = ModifierContext::local().with_bundled_schema()?;
//! let input = FleurinpData::from_dir(context.fs.as_ref(), "calc".as_ref())?;
//!
//! let mut modifier = FleurinpModifier::new(context, input);
//! modifier
//!     .set_inpchanges(json!({"itmax": 30}))?
//!     .set_species("all-Fe", json!({"mtSphere": {"radius": 2.2}}), false)?;
//!
//! println!("{}", modifier.show_string(true)?);
//!
//! let mut store = LocalProvenanceStore::default();
//! let modified = modifier.freeze(&mut store)?;
//! ```

pub mod applier;
mod args;
pub mod context;
pub mod errors;
pub mod fleurinp;
pub mod inpchanges;
mod navigate;
pub mod raw;
pub mod registry;
pub mod session;
pub mod species;
pub mod store;
pub mod task;
pub mod task_list;

pub use applier::{validate_document, Applier, ApplyOptions, ApplyOutcome, ValidationStatus};
pub use context::ModifierContext;
pub use errors::{ModifierError, ModifierResult, TaskError};
pub use fleurinp::{FleurinpData, InnerFiles, INPUT_FILE};
pub use raw::RawTask;
pub use registry::{OperationRegistry, OperationSpec};
pub use session::FleurinpModifier;
pub use species::AtomGroupFilter;
pub use store::{DictRecord, Link, LocalProvenanceStore, ProcessNode, StoreError};
pub use task::{NodeValues, NumMode, Task};
pub use task_list::TaskList;
