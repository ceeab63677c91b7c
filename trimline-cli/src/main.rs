use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use trimline::load_proposals;
use trimline_core::{
    BoundaryProposer, CancellationToken, CleaningConfig, CleaningPipeline, LineTextOps,
    NoProposer, NoRewriter, PipelineEvent, SectionType,
};

#[derive(Parser)]
#[command(name = "trimline")]
#[command(about = "Strip non-body sections from book text without trusting unverified boundaries")]
struct Args {
    /// Path to the plain-text document to clean
    #[arg(short, long)]
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON file of recorded boundary proposals, keyed by section
    #[arg(short, long)]
    proposals: Option<String>,

    /// Resolve a single section and print the decision trace instead of cleaning
    #[arg(short, long)]
    section: Option<SectionType>,

    /// Where to write the cleaned text (stdout if not specified)
    #[arg(short, long)]
    output: Option<String>,

    /// Where to write the JSON run report
    #[arg(short, long)]
    report: Option<String>,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = CleaningConfig::load_with_fallback(args.config.as_deref());
    match &args.config {
        Some(path) => info!(path = %path, "loaded config"),
        None => info!("using default config"),
    }

    if args.show_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .context("--input is required unless --show-config is given")?;
    let text = fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?;

    let pipeline = CleaningPipeline::new(
        create_proposer(&args, &config)?,
        Box::new(NoRewriter),
        Arc::new(LineTextOps::new()),
        config,
    )?;

    if let Some(section) = args.section {
        let resolution = pipeline.resolve_section(section, &text);
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    info!(input = %input, "cleaning document");
    let mut observer = |event: &PipelineEvent| debug!(?event, "pipeline event");
    let report = pipeline.run(&text, &CancellationToken::new(), &mut observer)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &report.text).with_context(|| format!("failed to write {path}"))?;
            info!(path = %path, lines = report.output_lines, "cleaned text saved");
        }
        None => print!("{}", report.text),
    }

    if let Some(path) = &args.report {
        save_report(&report.to_json()?, path)?;
    }

    info!(
        removed_lines = report.removed_lines(),
        pipeline_confidence = ?report.pipeline_confidence,
        "done"
    );
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the cleaned text, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn create_proposer(args: &Args, config: &CleaningConfig) -> Result<Box<dyn BoundaryProposer>> {
    match &args.proposals {
        Some(path) if config.proposal.enabled => Ok(Box::new(load_proposals(path)?)),
        Some(path) => {
            info!(path = %path, "proposals disabled in config, ignoring file");
            Ok(Box::new(NoProposer))
        }
        None => Ok(Box::new(NoProposer)),
    }
}

fn save_report(json: &str, path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json).with_context(|| format!("failed to write report {path}"))?;
    info!(path = %path, "report saved");
    Ok(())
}
