use crate::cli::PenaltyArgs;
use crate::commands::load_parameters;
use crate::error::Result;
use calodesign::core::constraints::{
    ConstraintError, LayerTopology, PenaltyEvaluator, TrainableParameters,
};
use candle_core::Device;
use tracing::{info, warn};

pub async fn run(args: PenaltyArgs) -> Result<()> {
    let parameters = load_parameters(&args.parameters)?;

    let topology = match args.layers {
        Some(layers) => LayerTopology::new(layers),
        None => LayerTopology::infer(&parameters).unwrap_or_else(|| {
            warn!("No complete layer slot found in the parameters; using the default topology.");
            LayerTopology::default()
        }),
    };
    info!(layers = topology.num_layers(), "Scoring budgets.");

    let evaluator = PenaltyEvaluator::new(&topology, &parameters)?;
    let trainable = TrainableParameters::from_dictionary(&parameters, &Device::Cpu)?;
    let breakdown = evaluator.evaluate(&trainable.view())?;
    let grads = breakdown.total.backward().map_err(ConstraintError::from)?;

    println!("Penalty: {:.6}", breakdown.value()?);
    println!(
        "  Length: {:.3} / {:.3} (term {:.6})",
        breakdown.total_length,
        evaluator.max_length(),
        breakdown.length_term
    );
    println!(
        "  Cost:   {:.3} / {:.3} (term {:.6})",
        breakdown.total_cost,
        evaluator.max_cost(),
        breakdown.cost_term
    );

    println!("Gradient:");
    for (name, gradient) in trainable.gradients(&grads)? {
        let formatted: Vec<String> = gradient.iter().map(|g| format!("{:.6e}", g)).collect();
        println!("  {:<28} [{}]", name, formatted.join(", "));
    }
    Ok(())
}
