//! # Operation Registry
//!
//! The fixed vocabulary of the modifier. Each entry knows its parameter
//! names and how to bind wire arguments into a [`Task`]; applying is
//! delegated to [`Task::apply`].
//!
//! The registry is built once and shared read-only (`Arc<OperationRegistry>`).

use crate::args::{integer, Args};
use crate::errors::TaskError;
use crate::inpchanges;
use crate::raw::RawTask;
use crate::species::{check_atom_group_changes, check_species_changes, AtomGroupFilter};
use crate::task::{NodeValues, NumMode, Task};
use fleurmod_xml::Document;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type Builder = fn(&Args<'_>) -> Result<Task, TaskError>;

/// Signature of one operation
pub struct OperationSpec {
    pub name: &'static str,
    /// Parameter names in positional order
    pub params: &'static [&'static str],
    /// Number of leading parameters without a default
    pub required: usize,
    build: Builder,
}

impl OperationSpec {
    /// Bind a wire task (positional and/or keyword arguments)
    pub fn bind(&self, raw: &RawTask) -> Result<Task, TaskError> {
        let args = Args::from_raw(self, raw)?;
        (self.build)(&args)
    }

    /// Bind keyword arguments only; unknown keys are rejected
    pub fn bind_kwargs(&self, kwargs: &Map<String, Value>) -> Result<Task, TaskError> {
        let args = Args::bind(self, &[], Some(kwargs))?;
        (self.build)(&args)
    }
}

impl std::fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("required", &self.required)
            .finish()
    }
}

/// Registry of every known operation
pub struct OperationRegistry {
    operations: Vec<OperationSpec>,
}

impl OperationRegistry {
    /// The built-in Fleur input operations
    pub fn builtin() -> Self {
        Self {
            operations: vec![
                spec(
                    "xml_set_attribv_occ",
                    &["xpathn", "attributename", "attribv", "occ", "create"],
                    3,
                    set_attribv_occ,
                ),
                spec(
                    "xml_set_first_attribv",
                    &["xpathn", "attributename", "attribv", "create"],
                    3,
                    set_first_attribv,
                ),
                spec(
                    "xml_set_all_attribv",
                    &["xpathn", "attributename", "attribv", "create"],
                    3,
                    set_all_attribv,
                ),
                spec("xml_set_text", &["xpathn", "text", "create"], 2, set_text),
                spec("xml_set_text_occ", &["xpathn", "text", "create", "occ"], 2, set_text_occ),
                spec("xml_set_all_text", &["xpathn", "text", "create"], 2, set_all_text),
                spec("create_tag", &["xpath", "newelement", "create"], 2, create_tag),
                spec("replace_tag", &["xpath", "newelement"], 2, replace_tag),
                spec("delete_tag", &["xpath"], 1, delete_tag),
                spec("delete_att", &["xpath", "attrib"], 2, delete_att),
                spec("set_species", &["species_name", "attributedict", "create"], 2, set_species),
                spec(
                    "set_species_label",
                    &["at_label", "attributedict", "create"],
                    2,
                    set_species_label,
                ),
                spec(
                    "set_atomgr_att",
                    &["attributedict", "position", "species", "create"],
                    1,
                    set_atomgr_att,
                ),
                spec(
                    "set_atomgr_att_label",
                    &["attributedict", "atom_label", "create"],
                    2,
                    set_atomgr_att_label,
                ),
                spec("set_inpchanges", &["change_dict"], 1, set_inpchanges),
                spec("set_nkpts", &["count", "gamma"], 1, set_nkpts),
                spec(
                    "add_num_to_att",
                    &["xpathn", "attributename", "set_val", "mode", "occ", "create"],
                    3,
                    add_num_to_att,
                ),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Result<&OperationSpec, TaskError> {
        self.operations
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| TaskError::UnknownOperation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.iter().any(|op| op.name == name)
    }

    /// Operation names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|op| op.name).collect()
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    /// Recorder half: validate a wire task into a [`Task`]
    pub fn bind(&self, raw: &RawTask) -> Result<Task, TaskError> {
        self.get(&raw.name)?.bind(raw)
    }

    pub fn bind_kwargs(&self, name: &str, kwargs: &Map<String, Value>) -> Result<Task, TaskError> {
        self.get(name)?.bind_kwargs(kwargs)
    }

    /// Applier half: bind and apply in one step
    pub fn apply(&self, raw: &RawTask, doc: &mut Document) -> Result<(), TaskError> {
        self.bind(raw)?.apply(doc)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &format!("{} operations", self.operations.len()))
            .finish()
    }
}

fn spec(
    name: &'static str,
    params: &'static [&'static str],
    required: usize,
    build: Builder,
) -> OperationSpec {
    OperationSpec {
        name,
        params,
        required,
        build,
    }
}

fn node_values(args: &Args<'_>, param: &str) -> Result<NodeValues, TaskError> {
    if args.is_list(param) {
        Ok(NodeValues::PerNode(args.scalars(param)?))
    } else {
        Ok(NodeValues::Single(args.string(param)?))
    }
}

fn set_attribv_occ(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetAttribOcc {
        xpath: args.xpath("xpathn")?,
        attribute: args.attribute_name("attributename")?,
        value: args.string("attribv")?,
        occurrences: args.occurrences("occ")?,
        create: args.bool_or("create", false)?,
    })
}

fn set_first_attribv(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetFirstAttrib {
        xpath: args.xpath("xpathn")?,
        attribute: args.attribute_name("attributename")?,
        value: args.string("attribv")?,
        create: args.bool_or("create", false)?,
    })
}

fn set_all_attribv(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetAllAttrib {
        xpath: args.xpath("xpathn")?,
        attribute: args.attribute_name("attributename")?,
        values: node_values(args, "attribv")?,
        create: args.bool_or("create", false)?,
    })
}

fn set_text(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetText {
        xpath: args.xpath("xpathn")?,
        text: args.string("text")?,
        create: args.bool_or("create", false)?,
    })
}

fn set_text_occ(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetTextOcc {
        xpath: args.xpath("xpathn")?,
        text: args.string("text")?,
        create: args.bool_or("create", false)?,
        occurrence: args.integer_or("occ", 0)?,
    })
}

fn set_all_text(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetAllText {
        xpath: args.xpath("xpathn")?,
        text: node_values(args, "text")?,
        create: args.bool_or("create", false)?,
    })
}

fn create_tag(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::CreateTag {
        xpath: args.xpath("xpath")?,
        element: args.fragment("newelement")?,
        create: args.bool_or("create", false)?,
    })
}

fn replace_tag(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::ReplaceTag {
        xpath: args.xpath("xpath")?,
        element: args.fragment("newelement")?,
    })
}

fn delete_tag(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::DeleteTag {
        xpath: args.xpath("xpath")?,
    })
}

fn delete_att(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::DeleteAtt {
        xpath: args.xpath("xpath")?,
        attribute: args.attribute_name("attrib")?,
    })
}

fn species_changes(args: &Args<'_>) -> Result<Map<String, Value>, TaskError> {
    let changes = args.object("attributedict")?;
    check_species_changes(&changes)?;
    Ok(changes)
}

fn atom_group_changes(args: &Args<'_>) -> Result<Map<String, Value>, TaskError> {
    let changes = args.object("attributedict")?;
    check_atom_group_changes(&changes)?;
    Ok(changes)
}

fn set_species(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetSpecies {
        species: args.string("species_name")?,
        changes: species_changes(args)?,
        create: args.bool_or("create", false)?,
    })
}

fn set_species_label(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetSpeciesLabel {
        label: args.string("at_label")?,
        changes: species_changes(args)?,
        create: args.bool_or("create", false)?,
    })
}

fn set_atomgr_att(args: &Args<'_>) -> Result<Task, TaskError> {
    let position = match args.get("position") {
        None => None,
        Some(Value::String(s)) if s == "all" => Some(AtomGroupFilter::All),
        Some(value) => match integer(value) {
            Some(p) if p >= 1 => Some(AtomGroupFilter::Position(p as usize)),
            _ => {
                return Err(TaskError::malformed(
                    "set_atomgr_att: position must be 'all' or a 1-based index",
                ))
            }
        },
    };
    let species = args.optional_string("species")?.map(|s| {
        if s == "all" {
            AtomGroupFilter::All
        } else {
            AtomGroupFilter::Species(s)
        }
    });

    let filter = match (position, species) {
        (Some(filter), None) | (None, Some(filter)) => filter,
        (Some(_), Some(_)) => {
            return Err(TaskError::malformed(
                "set_atomgr_att: give either position or species, not both",
            ))
        }
        (None, None) => {
            return Err(TaskError::malformed(
                "set_atomgr_att: one of position or species is required",
            ))
        }
    };

    Ok(Task::SetAtomGroupAtt {
        changes: atom_group_changes(args)?,
        filter,
        create: args.bool_or("create", false)?,
    })
}

fn set_atomgr_att_label(args: &Args<'_>) -> Result<Task, TaskError> {
    Ok(Task::SetAtomGroupAttLabel {
        changes: atom_group_changes(args)?,
        label: args.string("atom_label")?,
        create: args.bool_or("create", false)?,
    })
}

fn set_inpchanges(args: &Args<'_>) -> Result<Task, TaskError> {
    let mut changes = BTreeMap::new();
    for (key, value) in args.object("change_dict")? {
        inpchanges::lookup(&key)?.normalize(&value)?;
        changes.insert(key, value);
    }
    Ok(Task::SetInpChanges { changes })
}

fn set_nkpts(args: &Args<'_>) -> Result<Task, TaskError> {
    let count = args.integer_or("count", 0)?;
    if count < 1 {
        return Err(TaskError::malformed("set_nkpts: count must be a positive integer"));
    }
    Ok(Task::SetNkpts {
        count: count as u64,
        gamma: args.bool_or("gamma", false)?,
    })
}

fn add_num_to_att(args: &Args<'_>) -> Result<Task, TaskError> {
    let mode = match args.optional_string("mode")? {
        None => NumMode::Abs,
        Some(mode) => NumMode::parse(&mode).ok_or_else(|| {
            TaskError::malformed(format!(
                "add_num_to_att: mode must be 'abs', 'rel' or 'mul', got '{}'",
                mode
            ))
        })?,
    };

    Ok(Task::AddNumToAtt {
        xpath: args.xpath("xpathn")?,
        attribute: args.attribute_name("attributename")?,
        value: args.number("set_val")?,
        mode,
        occurrences: args.occurrences("occ")?,
        create: args.bool_or("create", false)?,
    })
}
