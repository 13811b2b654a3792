use anyhow::Context;
use clap::Parser;
use freight_etl::core::evaluate::{Evaluator, DEFAULT_MAX_MISMATCHES};
use freight_etl::utils::logger;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Score shipment output against ground truth")]
struct Args {
    /// Pipeline output (JSON array of shipment records)
    #[arg(long, default_value = "output/shipments.json")]
    predictions: String,

    /// Hand-labelled records keyed by id
    #[arg(long, default_value = "data/ground_truth.json")]
    ground_truth: String,

    #[arg(long, default_value_t = DEFAULT_MAX_MISMATCHES)]
    max_mismatches: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_records(path: &str) -> anyhow::Result<Vec<Value>> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read '{}'", path))?;
    serde_json::from_slice(&data).with_context(|| format!("'{}' is not a JSON array of records", path))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let predictions = load_records(&args.predictions)?;
    let ground_truth = load_records(&args.ground_truth)?;

    tracing::info!(
        "Comparing {} predictions against {} ground truth records",
        predictions.len(),
        ground_truth.len()
    );

    let report = Evaluator::new(args.max_mismatches).evaluate(&predictions, &ground_truth);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}
