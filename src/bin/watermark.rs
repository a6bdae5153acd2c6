use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use downstream_watermark::{OverlaySettings, Point, WatermarkConfig, simulate};

#[derive(Parser, Debug)]
#[command(name = "watermark", version)]
struct Cli {
    /// Log at debug level unless WATERMARK_LOG or RUST_LOG say otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a configuration file and print it with defaults filled in.
    Validate(ValidateArgs),
    /// Report an image's size and where it would be drawn.
    Probe(ProbeArgs),
    /// Run a step script against the in-memory host and print a JSON report.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Watermark configuration JSON.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Image file (png, jpg, jpeg).
    #[arg(long)]
    file: PathBuf,

    /// Left edge in output pixels.
    #[arg(long, default_value_t = 0.0)]
    x: f64,

    /// Top edge in output pixels.
    #[arg(long, default_value_t = 0.0)]
    y: f64,

    /// Uniform scale.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Watermark configuration JSON, including the simulated catalog and routes.
    #[arg(long)]
    config: PathBuf,

    /// Step script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Pretty-print the report.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Probe(args) => cmd_probe(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WATERMARK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let config = WatermarkConfig::from_path(&args.config)?;
    config
        .validate()
        .with_context(|| format!("validate '{}'", args.config.display()))?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    eprintln!("{} is valid", args.config.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let settings = OverlaySettings {
        file: args.file.clone(),
        position: Point::new(args.x, args.y),
        scale: args.scale,
        ..OverlaySettings::default()
    };
    settings.validate()?;

    let size = downstream_watermark::probe_image_size(&settings.file)?;
    let rect = settings.placement().draw_rect(size);
    let report = serde_json::json!({
        "file": settings.file,
        "width": size.width,
        "height": size.height,
        "draw_rect": rect.map(|r| serde_json::json!({
            "x0": r.x0,
            "y0": r.y0,
            "x1": r.x1,
            "y1": r.y1,
        })),
    });
    println!("{report}");
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let config = WatermarkConfig::from_path(&args.config)?;
    let steps = simulate::script_from_path(&args.script)?;
    let report = simulate::run_script(&config, &steps)
        .with_context(|| format!("simulate '{}'", args.script.display()))?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    eprintln!(
        "ran {} steps, {} over-releases",
        report.steps.len(),
        report.teardown.over_releases
    );
    Ok(())
}
