use super::error::SpecError;

/// Tolerance used when checking that categorical probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A real-valued parameter such as a layer thickness or a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuous {
    /// The current value proposed by the optimizer.
    pub value: f64,
    /// Inclusive lower bound. `f64::NEG_INFINITY` when unbounded.
    pub min: f64,
    /// Inclusive upper bound, if any.
    pub max: Option<f64>,
    /// Cost per unit, used for length/cost accounting by other consumers.
    pub cost: Option<f64>,
    /// Whether the optimizer is allowed to change this parameter.
    pub optimizable: bool,
}

impl Continuous {
    /// Creates an unbounded, optimizable parameter without a cost.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: f64::NEG_INFINITY,
            max: None,
            cost: None,
            optimizable: true,
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = min;
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Marks the parameter as a constant of the trial (e.g. `max_length`).
    pub fn fixed(mut self) -> Self {
        self.optimizable = false;
        self
    }

    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    /// Clamps `value` into the inclusive bounds of this parameter.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.upper_bound())
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if !self.value.is_finite() {
            return Err(SpecError::NonFinite);
        }
        if self.min > self.upper_bound() {
            return Err(SpecError::InvertedBounds {
                min: self.min,
                max: self.upper_bound(),
            });
        }
        if self.value < self.min || self.value > self.upper_bound() {
            return Err(SpecError::OutOfBounds {
                value: self.value,
                min: self.min,
                max: self.upper_bound(),
            });
        }
        Ok(())
    }
}

/// A discrete design decision represented as a probability distribution over choices.
///
/// The three vectors are parallel: `costs[i]` and `probabilities[i]` belong to
/// `choices[i]`. The fields are private so that the parallel-length and normalization
/// invariants can only be established through the validating constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    choices: Vec<String>,
    costs: Vec<f64>,
    probabilities: Vec<f64>,
    current: usize,
    optimizable: bool,
}

impl Categorical {
    /// Creates a categorical parameter, validating all invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] if the vectors differ in length, are empty, the
    /// probabilities are not a distribution, or `current` is not a known choice.
    pub fn new(
        choices: Vec<String>,
        costs: Vec<f64>,
        probabilities: Vec<f64>,
        current: &str,
    ) -> Result<Self, SpecError> {
        if choices.is_empty() {
            return Err(SpecError::NoChoices);
        }
        if choices.len() != costs.len() || choices.len() != probabilities.len() {
            return Err(SpecError::LengthMismatch {
                choices: choices.len(),
                costs: costs.len(),
                probabilities: probabilities.len(),
            });
        }
        check_distribution(&probabilities)?;
        let current = choices
            .iter()
            .position(|c| c == current)
            .ok_or_else(|| SpecError::UnknownChoice(current.to_string()))?;

        Ok(Self {
            choices,
            costs,
            probabilities,
            current,
            optimizable: true,
        })
    }

    /// Creates a categorical parameter with equal probability for every choice.
    pub fn uniform(
        choices: Vec<String>,
        costs: Vec<f64>,
        current: &str,
    ) -> Result<Self, SpecError> {
        let n = choices.len().max(1);
        let probabilities = vec![1.0 / n as f64; choices.len()];
        Self::new(choices, costs, probabilities, current)
    }

    pub fn fixed(mut self) -> Self {
        self.optimizable = false;
        self
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn optimizable(&self) -> bool {
        self.optimizable
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// The currently realized choice label.
    pub fn current(&self) -> &str {
        &self.choices[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Cost of the current choice marginalized over the selection probabilities.
    pub fn expected_cost(&self) -> f64 {
        self.probabilities
            .iter()
            .zip(&self.costs)
            .map(|(p, c)| p * c)
            .sum()
    }

    /// Replaces the selection probabilities with an optimizer proposal.
    ///
    /// Negative entries are clipped to zero and the vector is renormalized; the
    /// realized choice becomes the most probable one (first wins on ties).
    pub fn set_probabilities(&mut self, proposal: &[f64]) -> Result<(), SpecError> {
        if proposal.len() != self.choices.len() {
            return Err(SpecError::LengthMismatch {
                choices: self.choices.len(),
                costs: self.costs.len(),
                probabilities: proposal.len(),
            });
        }
        if proposal.iter().any(|p| !p.is_finite()) {
            return Err(SpecError::NonFinite);
        }
        let clipped: Vec<f64> = proposal.iter().map(|p| p.max(0.0)).collect();
        let sum: f64 = clipped.iter().sum();
        if sum <= f64::EPSILON {
            return Err(SpecError::InvalidProbabilities { sum });
        }
        self.probabilities = clipped.into_iter().map(|p| p / sum).collect();
        self.current = argmax(&self.probabilities);
        Ok(())
    }
}

fn check_distribution(probabilities: &[f64]) -> Result<(), SpecError> {
    let sum: f64 = probabilities.iter().sum();
    let valid = probabilities.iter().all(|p| p.is_finite() && *p >= 0.0)
        && (sum - 1.0).abs() <= PROBABILITY_TOLERANCE;
    if valid {
        Ok(())
    } else {
        Err(SpecError::InvalidProbabilities { sum })
    }
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_val), (i, &v)| {
            if v > best_val { (i, v) } else { (best, best_val) }
        })
        .0
}

/// A non-numeric value that is carried through a trial unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedValue {
    Text(String),
    Flag(bool),
}

/// One entry of the parameter dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSpec {
    Continuous(Continuous),
    Categorical(Categorical),
    Fixed(FixedValue),
}

impl ParameterSpec {
    /// Human-readable kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Continuous(_) => "continuous",
            Self::Categorical(_) => "categorical",
            Self::Fixed(FixedValue::Text(_)) => "fixed text",
            Self::Fixed(FixedValue::Flag(_)) => "fixed flag",
        }
    }

    pub fn is_optimizable(&self) -> bool {
        match self {
            Self::Continuous(c) => c.optimizable,
            Self::Categorical(c) => c.optimizable,
            Self::Fixed(_) => false,
        }
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        match self {
            Self::Continuous(c) => c.validate(),
            // Categorical invariants are enforced by its constructors.
            Self::Categorical(_) | Self::Fixed(_) => Ok(()),
        }
    }
}

impl From<Continuous> for ParameterSpec {
    fn from(value: Continuous) -> Self {
        Self::Continuous(value)
    }
}

impl From<Categorical> for ParameterSpec {
    fn from(value: Categorical) -> Self {
        Self::Categorical(value)
    }
}

impl From<FixedValue> for ParameterSpec {
    fn from(value: FixedValue) -> Self {
        Self::Fixed(value)
    }
}
