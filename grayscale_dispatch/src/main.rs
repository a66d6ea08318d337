// CLI entry for grayscale_dispatch
use anyhow::Result;
use clap::{Parser, ValueHint};
use grayscale_dispatch::{default_config, process, Config, Params, TailPolicy, DEFAULT_INPUT, DEFAULT_OUTPUT};

#[derive(Parser, Debug)]
#[command(name = "grayscale_dispatch", version, about = "Time static partitioning against channel dispatch on a grayscale pass")]
struct Cli {
    /// Number of worker threads for both strategies
    #[arg(long = "workers")]
    workers: Option<usize>,
    /// Task channel capacity for the channel strategy (0 = rendezvous)
    #[arg(long = "capacity")]
    capacity: Option<usize>,
    /// What the barrier strategy does with leftover pixels: skip or last-worker
    #[arg(long = "tail")]
    tail: Option<TailPolicy>,

    /// Input JPEG path
    #[arg(value_hint = ValueHint::FilePath, default_value = DEFAULT_INPUT)]
    input: String,
    /// Output JPEG path
    #[arg(value_hint = ValueHint::FilePath, default_value = DEFAULT_OUTPUT)]
    output: String,
}

fn build_config(cli: &Cli) -> Config {
    let mut cfg = default_config();
    if let Some(v) = cli.workers { cfg.num_workers = v.max(1); }
    if let Some(v) = cli.capacity { cfg.channel_capacity = v; }
    if let Some(v) = cli.tail { cfg.tail_policy = v; }
    cfg
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = build_config(&cli);
    let params = Params { in_image_name: cli.input, out_image_name: cli.output, config };
    process(params)?;
    Ok(())
}
