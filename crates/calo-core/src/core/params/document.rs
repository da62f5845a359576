//! The structured JSON document used to exchange parameter sets between the
//! optimizer and an isolated trial process.
//!
//! Each top-level key is a parameter name; its value is an object with
//! `current_value` and optionally `min_value`, `max_value`, `discrete_values`,
//! `cost`, `probabilities` and `optimizable`. Key order in the document is the
//! dictionary's insertion order.

use super::dictionary::ParameterDictionary;
use super::error::ParameterError;
use super::spec::{Categorical, Continuous, FixedValue, ParameterSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl RawValue {
    fn label(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Flag(b) => b.to_string(),
            RawValue::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCost {
    Scalar(f64),
    PerChoice(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameter {
    current_value: RawValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discrete_values: Option<Vec<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cost: Option<RawCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    probabilities: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    optimizable: Option<bool>,
}

impl RawParameter {
    fn into_spec(self, name: &str) -> Result<ParameterSpec, ParameterError> {
        let invalid = |reason: &str| ParameterError::Document {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let malformed = |source| ParameterError::Malformed {
            name: name.to_string(),
            source,
        };

        if let Some(discrete_values) = self.discrete_values {
            let choices: Vec<String> = discrete_values.iter().map(RawValue::label).collect();
            let costs = match self.cost {
                Some(RawCost::PerChoice(costs)) => costs,
                Some(RawCost::Scalar(_)) => {
                    return Err(invalid("a categorical parameter needs one cost per choice"));
                }
                None => vec![0.0; choices.len()],
            };
            let current = self.current_value.label();
            let categorical = match self.probabilities {
                Some(probabilities) => Categorical::new(choices, costs, probabilities, &current),
                None => Categorical::uniform(choices, costs, &current),
            }
            .map_err(malformed)?;
            return Ok(if self.optimizable.unwrap_or(true) {
                categorical.into()
            } else {
                categorical.fixed().into()
            });
        }

        if self.probabilities.is_some() {
            return Err(invalid("probabilities require discrete_values"));
        }

        if !matches!(self.current_value, RawValue::Number(_)) {
            self.check_fixed(name)?;
        }

        match self.current_value {
            RawValue::Number(value) => {
                let cost = match self.cost {
                    Some(RawCost::Scalar(c)) => Some(c),
                    Some(RawCost::PerChoice(_)) => {
                        return Err(invalid("a continuous parameter takes a single cost"));
                    }
                    None => None,
                };
                Ok(ParameterSpec::Continuous(Continuous {
                    value,
                    min: self.min_value.unwrap_or(f64::NEG_INFINITY),
                    max: self.max_value,
                    cost,
                    optimizable: self.optimizable.unwrap_or(true),
                }))
            }
            RawValue::Flag(b) => Ok(ParameterSpec::Fixed(FixedValue::Flag(b))),
            RawValue::Text(t) => Ok(ParameterSpec::Fixed(FixedValue::Text(t))),
        }
    }

    fn check_fixed(&self, name: &str) -> Result<(), ParameterError> {
        let reason = if self.optimizable == Some(true) {
            "a non-numeric value without discrete_values cannot be optimizable"
        } else if self.min_value.is_some() || self.max_value.is_some() || self.cost.is_some() {
            "bounds and costs only apply to numeric values"
        } else {
            return Ok(());
        };
        Err(ParameterError::Document {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    }

    fn from_spec(spec: &ParameterSpec) -> Self {
        let empty = Self {
            current_value: RawValue::Flag(false),
            min_value: None,
            max_value: None,
            discrete_values: None,
            cost: None,
            probabilities: None,
            optimizable: None,
        };
        match spec {
            ParameterSpec::Continuous(c) => Self {
                current_value: RawValue::Number(c.value),
                min_value: c.min.is_finite().then_some(c.min),
                max_value: c.max,
                cost: c.cost.map(RawCost::Scalar),
                optimizable: Some(c.optimizable),
                ..empty
            },
            ParameterSpec::Categorical(c) => Self {
                current_value: RawValue::Text(c.current().to_string()),
                discrete_values: Some(
                    c.choices()
                        .iter()
                        .map(|choice| RawValue::Text(choice.clone()))
                        .collect(),
                ),
                cost: Some(RawCost::PerChoice(c.costs().to_vec())),
                probabilities: Some(c.probabilities().to_vec()),
                optimizable: Some(c.optimizable()),
                ..empty
            },
            ParameterSpec::Fixed(value) => Self {
                current_value: match value {
                    FixedValue::Text(t) => RawValue::Text(t.clone()),
                    FixedValue::Flag(b) => RawValue::Flag(*b),
                },
                optimizable: Some(false),
                ..empty
            },
        }
    }
}

impl ParameterDictionary {
    /// Parses a parameter document, preserving key order.
    pub fn from_json_str(content: &str) -> Result<Self, ParameterError> {
        let raw: IndexMap<String, RawParameter> = serde_json::from_str(content)?;
        let mut dict = ParameterDictionary::new();
        for (name, parameter) in raw {
            let spec = parameter.into_spec(&name)?;
            dict.insert(name, spec)?;
        }
        debug!(parameters = dict.len(), "Parsed parameter document.");
        Ok(dict)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ParameterError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParameterError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// Serializes the dictionary back into the document format.
    ///
    /// Categorical choices are always written as text labels.
    pub fn to_json_string(&self) -> Result<String, ParameterError> {
        let raw: IndexMap<&str, RawParameter> = self
            .iter()
            .map(|(name, spec)| (name, RawParameter::from_spec(spec)))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const DOCUMENT: &str = r#"{
        "thickness_absorber_0": {"current_value": 9.0, "min_value": 0.0},
        "thickness_scintillator_0": {"current_value": 37.0, "min_value": 0.0},
        "material_absorber_0": {
            "current_value": "G4_Fe",
            "discrete_values": ["G4_Pb", "G4_Fe"],
            "cost": [25, 4.166],
            "probabilities": [0.10, 0.90]
        },
        "num_events": {"current_value": 800, "optimizable": false},
        "max_length": {"current_value": 150, "optimizable": false},
        "absorber_material": {"current_value": "G4_W"},
        "full_calorimeter": {"current_value": true, "optimizable": false}
    }"#;

    #[test]
    fn from_json_str_preserves_document_order() {
        let dict = ParameterDictionary::from_json_str(DOCUMENT).unwrap();
        let names: Vec<_> = dict.names().collect();
        assert_eq!(
            names,
            vec![
                "thickness_absorber_0",
                "thickness_scintillator_0",
                "material_absorber_0",
                "num_events",
                "max_length",
                "absorber_material",
                "full_calorimeter"
            ]
        );
    }

    #[test]
    fn from_json_str_builds_tagged_specs() {
        let dict = ParameterDictionary::from_json_str(DOCUMENT).unwrap();

        let thickness = dict.continuous("thickness_absorber_0").unwrap();
        assert_eq!(thickness.value, 9.0);
        assert_eq!(thickness.min, 0.0);
        assert!(thickness.optimizable);

        let material = dict.categorical("material_absorber_0").unwrap();
        assert_eq!(material.costs(), &[25.0, 4.166]);
        assert_eq!(material.current(), "G4_Fe");

        assert_eq!(dict.count("num_events").unwrap(), 800);
        assert!(!dict.continuous("num_events").unwrap().optimizable);
        assert_eq!(dict.text("absorber_material").unwrap(), "G4_W");
        assert!(dict.flag("full_calorimeter").unwrap());
    }

    #[test]
    fn missing_probabilities_default_to_uniform() {
        let dict = ParameterDictionary::from_json_str(
            r#"{"m": {"current_value": "B", "discrete_values": ["A", "B"], "cost": [1, 2]}}"#,
        )
        .unwrap();
        assert_eq!(dict.categorical("m").unwrap().probabilities(), &[0.5, 0.5]);
    }

    #[test]
    fn numeric_discrete_values_become_labels() {
        let dict = ParameterDictionary::from_json_str(
            r#"{"num_blocks": {"current_value": 3, "discrete_values": [2, 3, 4]}}"#,
        )
        .unwrap();
        assert_eq!(dict.text("num_blocks").unwrap(), "3");
    }

    #[test]
    fn mismatched_categorical_vectors_are_rejected() {
        let result = ParameterDictionary::from_json_str(
            r#"{"m": {"current_value": "A", "discrete_values": ["A", "B"], "cost": [1], "probabilities": [0.5, 0.5]}}"#,
        );
        assert!(matches!(result, Err(ParameterError::Malformed { name, .. }) if name == "m"));
    }

    #[test]
    fn optimizable_text_without_choices_is_rejected() {
        let result = ParameterDictionary::from_json_str(
            r#"{"absorber_material": {"current_value": "G4_Pb", "optimizable": true}}"#,
        );
        assert!(matches!(result, Err(ParameterError::Document { .. })));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = ParameterDictionary::from_json_str(
            r#"{"x": {"current_value": 1.0, "sigma": 2.0}}"#,
        );
        assert!(matches!(result, Err(ParameterError::Json(_))));
    }

    #[test]
    fn document_round_trips_through_json() {
        let dict = ParameterDictionary::from_json_str(DOCUMENT).unwrap();
        let json = dict.to_json_string().unwrap();
        let reloaded = ParameterDictionary::from_json_str(&json).unwrap();
        assert_eq!(dict, reloaded);
    }

    #[test]
    fn from_json_file_reports_missing_files() {
        let dir = tempdir().unwrap();
        let result = ParameterDictionary::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ParameterError::Io { .. })));
    }

    #[test]
    fn from_json_file_reads_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parameters.json");
        fs::write(&path, DOCUMENT).unwrap();
        let dict = ParameterDictionary::from_json_file(&path).unwrap();
        assert_eq!(dict.len(), 7);
    }
}
