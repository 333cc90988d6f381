use anyhow::Result;
use bioevolve_core::config::EngineConfig;
use bioevolve_core::{
    init_logging, FitnessEvaluator, FlatEvaluator, PopulationManager, TraitOptimumEvaluator,
};
use bioevolve_data::{Conditions, EnvironmentSnapshot};
use bioevolve_io::{load_checkpoint, read_json_file, EventLog};
use bioevolve_lib::runner::{run_batch, temperature_gradient, RunOptions};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the evolutionary engine headless", long_about = None)]
struct Args {
    /// Engine config file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Generations to run
    #[arg(short, long, default_value_t = 100)]
    generations: u64,

    /// Resume from this checkpoint
    #[arg(short, long)]
    resume: Option<String>,

    /// Checkpoint destination (`.rkyv` for binary, otherwise gzip JSON)
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Checkpoint every N generations (0: only at the end)
    #[arg(long, default_value_t = 0)]
    checkpoint_every: u64,

    /// Lineage event log (JSONL)
    #[arg(short, long, default_value = "logs/events.jsonl")]
    events: PathBuf,

    /// Environment snapshot file (JSON); uniform default conditions when omitted
    #[arg(long)]
    environment: Option<String>,

    /// Spread temperature linearly across subpopulations, from LOW to HIGH
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], conflicts_with = "environment")]
    gradient: Option<Vec<f64>>,

    /// Fitness evaluator
    #[arg(long, value_enum, default_value = "trait-optimum")]
    evaluator: Evaluator,

    /// Generations between summary log lines
    #[arg(long, default_value_t = 10)]
    log_interval: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Evaluator {
    /// Constant fitness: drift only
    Flat,
    /// Trait optima tracking the environment
    TraitOptimum,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    config.log_interval = args.log_interval;

    let environment: EnvironmentSnapshot = match (&args.environment, &args.gradient) {
        (Some(path), _) => read_json_file(path)?,
        (None, Some(range)) if range.len() == 2 => temperature_gradient(
            config.population.subpopulations,
            Conditions::default(),
            range[0],
            range[1],
        ),
        _ => EnvironmentSnapshot::uniform(Conditions::default()),
    };

    let (mut manager, mut log) = match &args.resume {
        Some(path) => {
            let manager = PopulationManager::restore(config, load_checkpoint(path)?)?;
            // Events past the checkpoint belong to a run that is being replaced.
            let mut log = EventLog::create(&args.events)?;
            log.append(manager.events())?;
            (manager, log)
        }
        None => (PopulationManager::new(config)?, EventLog::create(&args.events)?),
    };

    let flat = FlatEvaluator::default();
    let optimum = TraitOptimumEvaluator::default();
    let evaluator: &dyn FitnessEvaluator = match args.evaluator {
        Evaluator::Flat => &flat,
        Evaluator::TraitOptimum => &optimum,
    };

    let options = RunOptions {
        generations: args.generations,
        checkpoint: args.checkpoint.clone(),
        checkpoint_every: args.checkpoint_every,
    };
    let summary = run_batch(&mut manager, &environment, evaluator, &mut log, &options)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
