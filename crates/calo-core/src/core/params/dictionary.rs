use super::error::{ParameterError, SpecError};
use super::spec::{Categorical, Continuous, FixedValue, ParameterSpec};
use indexmap::IndexMap;
use indexmap::map::Entry;

/// Ordered mapping from unique parameter name to [`ParameterSpec`].
///
/// Iteration order is insertion order. Every typed accessor fails with a
/// [`ParameterError`] rather than falling back to a default, so a mismatch between
/// the declared parameters and what a consumer requires surfaces immediately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDictionary {
    entries: IndexMap<String, ParameterSpec>,
}

impl ParameterDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::Duplicate`] if the name is taken and
    /// [`ParameterError::Malformed`] if the parameter violates its own invariants.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        spec: impl Into<ParameterSpec>,
    ) -> Result<(), ParameterError> {
        let name = name.into();
        let spec = spec.into();
        spec.validate().map_err(|source| ParameterError::Malformed {
            name: name.clone(),
            source,
        })?;
        match self.entries.entry(name) {
            Entry::Occupied(e) => Err(ParameterError::Duplicate(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(spec);
                Ok(())
            }
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(
        mut self,
        name: impl Into<String>,
        spec: impl Into<ParameterSpec>,
    ) -> Result<Self, ParameterError> {
        self.insert(name, spec)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a parameter that must exist.
    pub fn require(&self, name: &str) -> Result<&ParameterSpec, ParameterError> {
        self.entries
            .get(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }

    pub fn continuous(&self, name: &str) -> Result<&Continuous, ParameterError> {
        match self.require(name)? {
            ParameterSpec::Continuous(c) => Ok(c),
            other => Err(wrong_kind(name, "continuous", other)),
        }
    }

    pub fn categorical(&self, name: &str) -> Result<&Categorical, ParameterError> {
        match self.require(name)? {
            ParameterSpec::Categorical(c) => Ok(c),
            other => Err(wrong_kind(name, "categorical", other)),
        }
    }

    /// Current value of a continuous parameter.
    pub fn value(&self, name: &str) -> Result<f64, ParameterError> {
        self.continuous(name).map(|c| c.value)
    }

    /// Current value of a continuous parameter that must be a non-negative integer.
    pub fn count(&self, name: &str) -> Result<usize, ParameterError> {
        let value = self.value(name)?;
        if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ParameterError::NotACount {
                name: name.to_string(),
                value,
            });
        }
        Ok(value as usize)
    }

    /// Text of a fixed text parameter, or the realized choice of a categorical one.
    pub fn text(&self, name: &str) -> Result<&str, ParameterError> {
        match self.require(name)? {
            ParameterSpec::Fixed(FixedValue::Text(t)) => Ok(t),
            ParameterSpec::Categorical(c) => Ok(c.current()),
            other => Err(wrong_kind(name, "text or categorical", other)),
        }
    }

    /// Like [`text`](Self::text), but an absent name yields `None`.
    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, ParameterError> {
        if self.contains(name) {
            self.text(name).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParameterError> {
        match self.require(name)? {
            ParameterSpec::Fixed(FixedValue::Flag(b)) => Ok(*b),
            other => Err(wrong_kind(name, "fixed flag", other)),
        }
    }

    /// Names of the parameters the optimizer may change, in dictionary order.
    pub fn optimizable_names(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, spec)| spec.is_optimizable())
            .map(|(name, _)| name)
    }

    /// Writes an optimizer proposal into a continuous parameter, clamped to its bounds.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        match self.require_mut(name)? {
            ParameterSpec::Continuous(c) => {
                if !value.is_finite() {
                    return Err(ParameterError::Malformed {
                        name: name.to_string(),
                        source: SpecError::NonFinite,
                    });
                }
                c.value = c.clamp(value);
                Ok(())
            }
            other => Err(wrong_kind(name, "continuous", other)),
        }
    }

    /// Writes an optimizer proposal into a categorical parameter's probabilities.
    pub fn set_probabilities(
        &mut self,
        name: &str,
        probabilities: &[f64],
    ) -> Result<(), ParameterError> {
        match self.require_mut(name)? {
            ParameterSpec::Categorical(c) => {
                c.set_probabilities(probabilities)
                    .map_err(|source| ParameterError::Malformed {
                        name: name.to_string(),
                        source,
                    })
            }
            other => Err(wrong_kind(name, "categorical", other)),
        }
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut ParameterSpec, ParameterError> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }
}

fn wrong_kind(name: &str, expected: &'static str, found: &ParameterSpec) -> ParameterError {
    ParameterError::WrongKind {
        name: name.to_string(),
        expected,
        found: found.kind_name(),
    }
}
