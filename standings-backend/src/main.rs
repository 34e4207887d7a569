use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use standings_backend::config::{self, DEFAULT_CONFIG_PATH};
use standings_backend::module::controller::{StandingsController, TracingNotifier};
use standings_backend::module::standings::parse_standings_file;
use standings_common::LayoutVariant;

#[derive(Parser)]
#[command(
    name = "standings-card",
    version,
    about = "Turn a tournament standings CSV into a shareable image"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a standings card and save it as JPEG
    Render(RenderArgs),
    /// Print the parsed records as JSON
    Inspect {
        /// Standings CSV (header row + positional columns)
        csv: PathBuf,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Standings CSV (header row + positional columns)
    #[arg(long)]
    csv: PathBuf,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    subtitle: Option<String>,

    /// Period label, e.g. "DAY 2"
    #[arg(long)]
    label: Option<String>,

    /// single | two-column
    #[arg(long)]
    layout: Option<LayoutVariant>,

    /// Directory the image is written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also write the SVG layout to this path
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Skip rasterization (useful with --svg)
    #[arg(long)]
    no_image: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::read_config(&cli.config)?.clone();

    let _logging_guard = standings_backend::logging::init_logging(
        &config.log_dir,
        "standings-card",
        &config.log_level,
    )?;

    match cli.command {
        Command::Inspect { csv } => {
            let records = parse_standings_file(&csv)
                .await
                .with_context(|| format!("Failed to load {:?}", csv))?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Render(args) => {
            if let Some(dir) = &args.output_dir {
                config.export.output_dir = dir.to_string_lossy().to_string();
            }
            render(&config, args).await?;
        }
    }

    Ok(())
}

async fn render(config: &config::StandingsConfig, args: RenderArgs) -> Result<()> {
    let mut controller = StandingsController::from_config(config, Arc::new(TracingNotifier));

    if let Some(title) = args.title {
        controller.set_title(title);
    }
    if let Some(subtitle) = args.subtitle {
        controller.set_subtitle(subtitle);
    }
    if let Some(label) = args.label {
        controller.set_label(label);
    }
    if let Some(layout) = args.layout {
        controller.set_variant(layout);
    }

    let count = controller
        .load_csv_file(Some(&args.csv))
        .await
        .with_context(|| format!("Failed to load {:?}", args.csv))?
        .unwrap_or(0);
    tracing::info!("Loaded {} teams from {:?}", count, args.csv);

    if let Some(svg_path) = &args.svg {
        let card = controller.render();
        tokio::fs::write(svg_path, &card.svg)
            .await
            .with_context(|| format!("Failed to write SVG to {:?}", svg_path))?;
        println!("{}", svg_path.display());
    }

    if args.no_image {
        return Ok(());
    }

    match controller.request_export().await? {
        Some(image) => {
            if let Some(path) = image.path {
                println!("{}", path.display());
            }
        }
        None => tracing::warn!("No team records in {:?}, nothing to export", args.csv),
    }

    Ok(())
}
