//! Logical setting names for bulk changes
//!
//! `set_inpchanges` takes `{"itmax": 30, "Kmax": 4.2, ...}`; each key is
//! looked up here to find the element and attribute it lives on and how
//! its value is written.

use crate::args::{fleur_bool, integer, number, scalar_string, switch};
use crate::errors::TaskError;
use serde_json::Value;

const SCF_LOOP: &str = "/fleurInput/calculationSetup/scfLoop";
const CUTOFFS: &str = "/fleurInput/calculationSetup/cutoffParameters";
const MAGNETISM: &str = "/fleurInput/calculationSetup/magnetism";
const SOC: &str = "/fleurInput/calculationSetup/soc";
const CORE_ELECTRONS: &str = "/fleurInput/calculationSetup/coreElectrons";
const BZ_INTEGRATION: &str = "/fleurInput/calculationSetup/bzIntegration";
const OUTPUT: &str = "/fleurInput/output";
const DENSITY_OF_STATES: &str = "/fleurInput/output/densityOfStates";
const FILM_LATTICE: &str = "/fleurInput/cell/filmLattice";
const BULK_LATTICE: &str = "/fleurInput/cell/bulkLattice";
const XC_FUNCTIONAL: &str = "/fleurInput/xcFunctional";

/// How a setting's value is written into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Fleur logical, `T` or `F`
    Switch,
    Int,
    /// Fixed ten decimals
    Float,
    Str,
    /// Element text rather than an attribute
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct Setting {
    pub key: &'static str,
    pub path: &'static str,
    /// `None` for text settings
    pub attribute: Option<&'static str>,
    pub kind: ValueKind,
}

const fn attr(key: &'static str, path: &'static str, kind: ValueKind) -> Setting {
    Setting {
        key,
        path,
        attribute: Some(key),
        kind,
    }
}

pub const SETTINGS: &[Setting] = &[
    attr("itmax", SCF_LOOP, ValueKind::Int),
    attr("minDistance", SCF_LOOP, ValueKind::Float),
    attr("maxIterBroyd", SCF_LOOP, ValueKind::Int),
    attr("imix", SCF_LOOP, ValueKind::Str),
    attr("alpha", SCF_LOOP, ValueKind::Float),
    attr("spinf", SCF_LOOP, ValueKind::Float),
    attr("Kmax", CUTOFFS, ValueKind::Float),
    attr("Gmax", CUTOFFS, ValueKind::Float),
    attr("GmaxXC", CUTOFFS, ValueKind::Float),
    attr("numbands", CUTOFFS, ValueKind::Int),
    attr("jspins", MAGNETISM, ValueKind::Int),
    attr("l_noco", MAGNETISM, ValueKind::Switch),
    attr("swsp", MAGNETISM, ValueKind::Switch),
    attr("lflip", MAGNETISM, ValueKind::Switch),
    attr("theta", SOC, ValueKind::Float),
    attr("phi", SOC, ValueKind::Float),
    attr("l_soc", SOC, ValueKind::Switch),
    attr("spav", SOC, ValueKind::Switch),
    attr("ctail", CORE_ELECTRONS, ValueKind::Switch),
    attr("frcor", CORE_ELECTRONS, ValueKind::Switch),
    attr("kcrel", CORE_ELECTRONS, ValueKind::Int),
    attr("valenceElectrons", BZ_INTEGRATION, ValueKind::Float),
    attr("mode", BZ_INTEGRATION, ValueKind::Str),
    attr("fermiSmearingEnergy", BZ_INTEGRATION, ValueKind::Float),
    attr("dos", OUTPUT, ValueKind::Switch),
    attr("band", OUTPUT, ValueKind::Switch),
    attr("vacdos", OUTPUT, ValueKind::Switch),
    attr("slice", OUTPUT, ValueKind::Switch),
    attr("mcd", OUTPUT, ValueKind::Switch),
    attr("minEnergy", DENSITY_OF_STATES, ValueKind::Float),
    attr("maxEnergy", DENSITY_OF_STATES, ValueKind::Float),
    attr("sigma", DENSITY_OF_STATES, ValueKind::Float),
    attr("dVac", FILM_LATTICE, ValueKind::Float),
    attr("dTilda", FILM_LATTICE, ValueKind::Float),
    attr("scale", BULK_LATTICE, ValueKind::Float),
    Setting {
        key: "comment",
        path: "/fleurInput/comment",
        attribute: None,
        kind: ValueKind::Text,
    },
    Setting {
        key: "xcFunctional",
        path: XC_FUNCTIONAL,
        attribute: Some("name"),
        kind: ValueKind::Str,
    },
    attr("relativisticCorrections", XC_FUNCTIONAL, ValueKind::Switch),
];

pub fn lookup(key: &str) -> Result<&'static Setting, TaskError> {
    SETTINGS
        .iter()
        .find(|s| s.key == key)
        .ok_or_else(|| TaskError::malformed(format!("unknown inpchanges key '{}'", key)))
}

impl Setting {
    /// Text written into the document for `value`
    pub fn normalize(&self, value: &Value) -> Result<String, TaskError> {
        let invalid = |expected: &str| {
            TaskError::malformed(format!(
                "inpchanges '{}' expects {}, got {}",
                self.key, expected, value
            ))
        };

        match self.kind {
            ValueKind::Switch => fleur_bool(value)
                .map(|b| switch(b).to_string())
                .ok_or_else(|| invalid("a boolean")),
            ValueKind::Int => integer(value)
                .map(|i| i.to_string())
                .ok_or_else(|| invalid("an integer")),
            ValueKind::Float => number(value)
                .filter(|f| f.is_finite())
                .map(|f| format!("{:.10}", f))
                .ok_or_else(|| invalid("a number")),
            ValueKind::Str | ValueKind::Text => {
                scalar_string(value).ok_or_else(|| invalid("a string"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_unique() {
        for (i, setting) in SETTINGS.iter().enumerate() {
            assert!(
                SETTINGS[i + 1..].iter().all(|s| s.key != setting.key),
                "duplicate key {}",
                setting.key
            );
        }
    }

    #[test]
    fn test_normalization_by_kind() {
        assert_eq!(lookup("itmax").unwrap().normalize(&json!(30)).unwrap(), "30");
        assert_eq!(lookup("itmax").unwrap().normalize(&json!(30.0)).unwrap(), "30");
        assert_eq!(lookup("Kmax").unwrap().normalize(&json!(4.2)).unwrap(), "4.2000000000");
        assert_eq!(lookup("l_soc").unwrap().normalize(&json!(true)).unwrap(), "T");
        assert_eq!(lookup("l_soc").unwrap().normalize(&json!("F")).unwrap(), "F");
        assert_eq!(lookup("mode").unwrap().normalize(&json!("gauss")).unwrap(), "gauss");
    }

    #[test]
    fn test_invalid_values() {
        assert!(lookup("itmax").unwrap().normalize(&json!(1.5)).is_err());
        assert!(lookup("l_soc").unwrap().normalize(&json!(1)).is_err());
        assert!(lookup("Kmax").unwrap().normalize(&json!("abc")).is_err());
        assert!(lookup("comment").unwrap().normalize(&json!(null)).is_err());
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(lookup("bogus"), Err(TaskError::MalformedTask(_))));
    }

    #[test]
    fn test_xc_functional_sets_name() {
        let setting = lookup("xcFunctional").unwrap();
        assert_eq!(setting.attribute, Some("name"));
        assert_eq!(setting.path, "/fleurInput/xcFunctional");
    }
}
