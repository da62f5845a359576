use crate::cli::GeometryArgs;
use crate::commands::load_parameters;
use crate::error::Result;
use calodesign::core::geometry::{GeometryPolicy, build_geometry};
use tracing::info;

pub async fn run(args: GeometryArgs) -> Result<()> {
    let parameters = load_parameters(&args.parameters)?;

    let policy = GeometryPolicy::select(&parameters);
    info!(?policy, "Realizing geometry.");
    let geometry = build_geometry(&parameters)?;

    if geometry.is_empty() {
        println!("Warning: the parameters realize an empty layer stack.");
        return Ok(());
    }

    println!("{}", geometry);
    println!(
        "     {} absorber, {} sensitive",
        geometry.absorber_count(),
        geometry.sensitive_count()
    );
    Ok(())
}
