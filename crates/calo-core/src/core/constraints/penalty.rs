use super::error::ConstraintError;
use super::tensors::TensorView;
use super::topology::{LayerTopology, budget, material_name, thickness_name};
use crate::core::params::ParameterDictionary;
use candle_core::Tensor;
use tracing::debug;

pub const MAX_LENGTH: &str = "max_length";
pub const MAX_COST: &str = "max_cost";

/// A penalty value together with the quantities it was computed from.
#[derive(Debug, Clone)]
pub struct PenaltyBreakdown {
    /// Differentiable scalar; call `backward()` on it to reach the view's variables.
    pub total: Tensor,
    pub length_term: f64,
    pub cost_term: f64,
    pub total_length: f64,
    pub total_cost: f64,
}

impl PenaltyBreakdown {
    pub fn value(&self) -> Result<f64, ConstraintError> {
        scalar_value(&self.total)
    }
}

#[derive(Debug, Clone)]
struct SlotTerm {
    thickness: String,
    material: String,
    costs: Vec<f64>,
}

/// Scores parameter tensors against the length and cost budgets.
///
/// Built once per dictionary: construction validates the topology and captures the
/// per-choice cost vectors and both budgets, so evaluation only touches tensors.
#[derive(Debug, Clone)]
pub struct PenaltyEvaluator {
    terms: Vec<SlotTerm>,
    max_length: f64,
    max_cost: f64,
}

impl PenaltyEvaluator {
    pub fn new(
        topology: &LayerTopology,
        params: &ParameterDictionary,
    ) -> Result<Self, ConstraintError> {
        topology.validate(params)?;
        let terms = topology
            .slots()
            .map(|(index, kind)| {
                let material = material_name(index, kind);
                let costs = params.categorical(&material)?.costs().to_vec();
                Ok(SlotTerm {
                    thickness: thickness_name(index, kind),
                    material,
                    costs,
                })
            })
            .collect::<Result<Vec<_>, ConstraintError>>()?;

        Ok(Self {
            terms,
            max_length: budget(params, MAX_LENGTH)?,
            max_cost: budget(params, MAX_COST)?,
        })
    }

    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    pub fn max_cost(&self) -> f64 {
        self.max_cost
    }

    /// Computes the budget penalty for `view`.
    ///
    /// For every slot the material cost is marginalized over the selection
    /// probabilities and weighted by the slot's thickness. The penalty is
    /// `relu((L - Lmax) / Lmax)^2 + relu((C - Cmax) / Cmax)^2`, zero inside both budgets.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::MissingTensor`] if the view lacks a slot's thickness or
    /// material tensor, and [`ConstraintError::ShapeMismatch`] if a probability vector
    /// does not match its cost vector or a thickness is not a scalar.
    pub fn evaluate(&self, view: &TensorView) -> Result<PenaltyBreakdown, ConstraintError> {
        let mut lengths = Vec::with_capacity(self.terms.len());
        let mut costs = Vec::with_capacity(self.terms.len());

        for term in &self.terms {
            let probabilities = view.require(&term.material)?;
            let thickness = scalar(&term.thickness, view.require(&term.thickness)?)?;
            let weighted = expected_cost_named(&term.material, probabilities, &term.costs)?;

            costs.push(thickness.broadcast_mul(&weighted.to_dtype(thickness.dtype())?)?);
            lengths.push(thickness);
        }

        let total_length = Tensor::stack(&lengths, 0)?.sum_all()?;
        let total_cost = Tensor::stack(&costs, 0)?.sum_all()?;

        let length_term = budget_term(&total_length, self.max_length)?;
        let cost_term = budget_term(&total_cost, self.max_cost)?;
        let total = length_term.add(&cost_term)?;

        let breakdown = PenaltyBreakdown {
            length_term: scalar_value(&length_term)?,
            cost_term: scalar_value(&cost_term)?,
            total_length: scalar_value(&total_length)?,
            total_cost: scalar_value(&total_cost)?,
            total,
        };
        debug!(
            total_length = breakdown.total_length,
            total_cost = breakdown.total_cost,
            length_term = breakdown.length_term,
            cost_term = breakdown.cost_term,
            "Budget penalty evaluated."
        );
        Ok(breakdown)
    }
}

/// Penalty of `view` under the default three-slot topology.
pub fn penalty(params: &ParameterDictionary, view: &TensorView) -> Result<Tensor, ConstraintError> {
    let evaluator = PenaltyEvaluator::new(&LayerTopology::default(), params)?;
    Ok(evaluator.evaluate(view)?.total)
}

/// Dot product of a probability tensor with a plain cost vector.
///
/// The cost vector is placed on the probability tensor's device and dtype and does
/// not require gradients.
pub fn expected_cost(probabilities: &Tensor, costs: &[f64]) -> Result<Tensor, ConstraintError> {
    expected_cost_named("probabilities", probabilities, costs)
}

fn expected_cost_named(
    name: &str,
    probabilities: &Tensor,
    costs: &[f64],
) -> Result<Tensor, ConstraintError> {
    let probabilities = probabilities.flatten_all()?;
    if probabilities.elem_count() != costs.len() {
        return Err(ConstraintError::ShapeMismatch {
            name: name.to_string(),
            expected: costs.len(),
            found: probabilities.elem_count(),
        });
    }
    let costs = Tensor::from_slice(costs, costs.len(), probabilities.device())?
        .to_dtype(probabilities.dtype())?;
    Ok(probabilities.mul(&costs)?.sum_all()?)
}

fn budget_term(total: &Tensor, limit: f64) -> Result<Tensor, ConstraintError> {
    Ok(total.affine(1.0 / limit, -1.0)?.relu()?.sqr()?.mean_all()?)
}

fn scalar(name: &str, tensor: &Tensor) -> Result<Tensor, ConstraintError> {
    if tensor.elem_count() != 1 {
        return Err(ConstraintError::ShapeMismatch {
            name: name.to_string(),
            expected: 1,
            found: tensor.elem_count(),
        });
    }
    Ok(tensor.reshape(())?)
}

fn scalar_value(tensor: &Tensor) -> Result<f64, ConstraintError> {
    Ok(tensor.to_dtype(candle_core::DType::F64)?.to_scalar::<f64>()?)
}
