use super::error::ConstraintError;
use super::penalty::{MAX_COST, MAX_LENGTH};
use crate::core::params::ParameterDictionary;
use std::fmt;

/// Layer slots of the default three-block sampling calorimeter.
pub const DEFAULT_NUM_LAYERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Absorber,
    Scintillator,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Absorber, LayerKind::Scintillator];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Absorber => "absorber",
            LayerKind::Scintillator => "scintillator",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared set of `(index, kind)` layer slots a device is defined over.
///
/// Slot `(i, kind)` owns the parameters `thickness_{kind}_{i}` (continuous) and
/// `material_{kind}_{i}` (categorical).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTopology {
    num_layers: usize,
    kinds: Vec<LayerKind>,
}

impl Default for LayerTopology {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_LAYERS)
    }
}

impl LayerTopology {
    /// A topology with `num_layers` indices, each holding an absorber and a scintillator.
    pub fn new(num_layers: usize) -> Self {
        Self {
            num_layers,
            kinds: LayerKind::ALL.to_vec(),
        }
    }

    pub fn with_kinds(num_layers: usize, kinds: Vec<LayerKind>) -> Self {
        Self { num_layers, kinds }
    }

    /// Infers the number of complete layer indices from the parameter names.
    ///
    /// Index `i` counts if every kind has both its thickness and material entry; counting
    /// stops at the first incomplete index. Returns `None` when index 0 is incomplete.
    pub fn infer(params: &ParameterDictionary) -> Option<Self> {
        let kinds = LayerKind::ALL.to_vec();
        let num_layers = (0..)
            .take_while(|&index| {
                kinds.iter().all(|&kind| {
                    params.contains(&thickness_name(index, kind))
                        && params.contains(&material_name(index, kind))
                })
            })
            .count();
        (num_layers > 0).then_some(Self { num_layers, kinds })
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn kinds(&self) -> &[LayerKind] {
        &self.kinds
    }

    /// All slots, index-major: `(0, absorber), (0, scintillator), (1, absorber), ...`.
    pub fn slots(&self) -> impl Iterator<Item = (usize, LayerKind)> + '_ {
        (0..self.num_layers)
            .flat_map(move |index| self.kinds.iter().map(move |&kind| (index, kind)))
    }

    pub fn len(&self) -> usize {
        self.num_layers * self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that the dictionary provides every parameter the topology requires.
    ///
    /// Every thickness must be continuous, every material categorical, and both budgets
    /// present as positive numbers.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::Parameter`] for missing or mistyped entries and
    /// [`ConstraintError::InvalidBudget`] for a non-positive budget.
    pub fn validate(&self, params: &ParameterDictionary) -> Result<(), ConstraintError> {
        if self.is_empty() {
            return Err(ConstraintError::EmptyTopology);
        }
        for (index, kind) in self.slots() {
            params.continuous(&thickness_name(index, kind))?;
            params.categorical(&material_name(index, kind))?;
        }
        budget(params, MAX_LENGTH)?;
        budget(params, MAX_COST)?;
        Ok(())
    }
}

pub fn thickness_name(index: usize, kind: LayerKind) -> String {
    format!("thickness_{}_{}", kind, index)
}

pub fn material_name(index: usize, kind: LayerKind) -> String {
    format!("material_{}_{}", kind, index)
}

pub(crate) fn budget(params: &ParameterDictionary, name: &str) -> Result<f64, ConstraintError> {
    let value = params.value(name)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConstraintError::InvalidBudget {
            name: name.to_string(),
            value,
        })
    }
}
