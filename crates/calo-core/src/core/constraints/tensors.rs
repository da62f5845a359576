use super::error::ConstraintError;
use crate::core::params::{ParameterDictionary, ParameterSpec};
use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Tensor, Var};
use indexmap::IndexMap;
use tracing::debug;

/// Ordered mapping from parameter name to its tensor surrogate.
///
/// Continuous parameters map to scalar tensors, categorical parameters to their
/// per-choice probability vectors.
#[derive(Debug, Clone, Default)]
pub struct TensorView {
    tensors: IndexMap<String, Tensor>,
}

impl TensorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant (gradient-free) tensors for every numeric parameter's current value.
    pub fn from_dictionary(
        params: &ParameterDictionary,
        device: &Device,
    ) -> Result<Self, ConstraintError> {
        let mut view = Self::new();
        for (name, spec) in params.iter() {
            if let Some(tensor) = constant(spec, device)? {
                view.insert(name, tensor);
            }
        }
        Ok(view)
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Tensor, ConstraintError> {
        self.get(name)
            .ok_or_else(|| ConstraintError::MissingTensor(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

#[derive(Debug)]
enum Slot {
    Trainable(Var),
    Frozen(Tensor),
}

impl Slot {
    fn tensor(&self) -> &Tensor {
        match self {
            Slot::Trainable(var) => var.as_tensor(),
            Slot::Frozen(tensor) => tensor,
        }
    }
}

/// The optimizer-side copy of a parameter dictionary.
///
/// Optimizable parameters become [`Var`]s that record gradients; every other numeric
/// parameter is carried as a constant so the [`view`](Self::view) is complete.
#[derive(Debug)]
pub struct TrainableParameters {
    slots: IndexMap<String, Slot>,
}

impl TrainableParameters {
    pub fn from_dictionary(
        params: &ParameterDictionary,
        device: &Device,
    ) -> Result<Self, ConstraintError> {
        let mut slots = IndexMap::new();
        for (name, spec) in params.iter() {
            let Some(tensor) = constant(spec, device)? else {
                continue;
            };
            let slot = if spec.is_optimizable() {
                Slot::Trainable(Var::from_tensor(&tensor)?)
            } else {
                Slot::Frozen(tensor)
            };
            slots.insert(name.to_string(), slot);
        }
        debug!(
            parameters = slots.len(),
            trainable = slots.values().filter(|s| matches!(s, Slot::Trainable(_))).count(),
            "Trainable parameters created."
        );
        Ok(Self { slots })
    }

    pub fn view(&self) -> TensorView {
        let mut view = TensorView::new();
        for (name, slot) in &self.slots {
            view.insert(name.clone(), slot.tensor().clone());
        }
        view
    }

    /// The trainable variables in dictionary order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &Var)> {
        self.slots.iter().filter_map(|(name, slot)| match slot {
            Slot::Trainable(var) => Some((name.as_str(), var)),
            Slot::Frozen(_) => None,
        })
    }

    /// Concatenates all trainable values into one vector, in dictionary order.
    pub fn flatten(&self) -> Result<Tensor, ConstraintError> {
        let parts = self
            .vars()
            .map(|(_, var)| var.as_tensor().flatten_all())
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            let device = self
                .slots
                .values()
                .next()
                .map(|s| s.tensor().device().clone())
                .unwrap_or(Device::Cpu);
            return Ok(Tensor::zeros(0, DType::F64, &device)?);
        }
        Ok(Tensor::cat(&parts, 0)?)
    }

    /// Per-variable gradients after a backward pass. Variables the loss does not
    /// depend on get a zero gradient.
    pub fn gradients(&self, grads: &GradStore) -> Result<Vec<(String, Vec<f64>)>, ConstraintError> {
        self.vars()
            .map(|(name, var)| {
                let values = match grads.get(var.as_tensor()) {
                    Some(grad) => to_values(grad)?,
                    None => vec![0.0; var.as_tensor().elem_count()],
                };
                Ok((name.to_string(), values))
            })
            .collect()
    }

    /// Copies the current variable values back into `params`.
    pub fn write_back(&self, params: &mut ParameterDictionary) -> Result<(), ConstraintError> {
        params.update_from_tensors(&self.view())
    }
}

impl ParameterDictionary {
    /// Writes optimizer tensors back into the dictionary.
    ///
    /// Continuous values are clamped into their bounds; categorical probabilities are
    /// clipped at zero and renormalized, and the realized choice becomes the argmax.
    /// Tensors for non-optimizable parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::Parameter`] if a tensor names an unknown or
    /// non-numeric parameter, and [`ConstraintError::ShapeMismatch`] if its element
    /// count does not match the parameter.
    pub fn update_from_tensors(&mut self, view: &TensorView) -> Result<(), ConstraintError> {
        for (name, tensor) in view.iter() {
            let spec = self.require(name)?;
            if !spec.is_optimizable() {
                continue;
            }
            let values = to_values(tensor)?;
            match spec {
                ParameterSpec::Continuous(_) => {
                    if values.len() != 1 {
                        return Err(ConstraintError::ShapeMismatch {
                            name: name.to_string(),
                            expected: 1,
                            found: values.len(),
                        });
                    }
                    self.set_value(name, values[0])?;
                }
                ParameterSpec::Categorical(c) => {
                    if values.len() != c.len() {
                        return Err(ConstraintError::ShapeMismatch {
                            name: name.to_string(),
                            expected: c.len(),
                            found: values.len(),
                        });
                    }
                    self.set_probabilities(name, &values)?;
                }
                ParameterSpec::Fixed(_) => {}
            }
        }
        Ok(())
    }
}

fn constant(spec: &ParameterSpec, device: &Device) -> Result<Option<Tensor>, ConstraintError> {
    let tensor = match spec {
        ParameterSpec::Continuous(c) => Tensor::new(c.value, device)?,
        ParameterSpec::Categorical(c) => Tensor::new(c.probabilities(), device)?,
        ParameterSpec::Fixed(_) => return Ok(None),
    };
    Ok(Some(tensor))
}

pub(crate) fn to_values(tensor: &Tensor) -> Result<Vec<f64>, ConstraintError> {
    Ok(tensor.flatten_all()?.to_dtype(DType::F64)?.to_vec1::<f64>()?)
}
