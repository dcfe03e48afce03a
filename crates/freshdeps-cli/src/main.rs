use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use freshdeps_core::ProjectManifest;
use freshdeps_registry::{HttpRegistry, MetadataCache, Throttler};
use freshdeps_resolver::{dedupe, Report, Resolver, DEFAULT_DISPLAY_LENGTH};

mod config;
mod logger;
mod render;

use config::Config;
use render::{render_report, render_summary_line, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "freshdeps")]
#[command(
    about = "Show the most recently published packages in a project's dependency tree",
    long_about = None
)]
struct Cli {
    /// Manifest to read dependencies from
    #[arg(default_value = "package.json")]
    manifest: PathBuf,
    /// Number of packages to list
    #[arg(short = 'l', long = "length", default_value_t = DEFAULT_DISPLAY_LENGTH, value_parser = parse_length)]
    length: usize,
    /// Also resolve the manifest's devDependencies
    #[arg(long)]
    dev: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli, |key| std::env::var(key).ok())?;
    let renderer = TerminalRenderer::from_style(config.output_style);

    let manifest = ProjectManifest::load(&config.manifest_path)?;
    let ranges = manifest.root_ranges(config.include_dev);
    if ranges.is_empty() {
        println!("Dependencies not found");
        return Ok(());
    }

    let registry =
        HttpRegistry::new(&config.registry_url).context("failed to build registry HTTP client")?;
    let throttler = Throttler::new(config.concurrency)?;
    let cache = Arc::new(MetadataCache::new(Arc::new(registry), Arc::new(throttler)));
    let resolver = Resolver::new(cache);

    let started_at = Instant::now();
    let spinner = renderer.start_spinner("resolving");
    let resolution = resolver.resolve_detailed(&ranges).await;
    spinner.finish();

    if let Some(line) = render_summary_line(
        renderer.style(),
        resolution.packages.len(),
        resolver.cache().requested(),
        resolution.skipped.len(),
        started_at.elapsed(),
    ) {
        println!("{line}");
    }

    let report = Report::new(dedupe(resolution.packages), config.display_length);
    renderer.print_lines(&render_report(&report, Utc::now(), renderer.style()));
    Ok(())
}

fn parse_length(value: &str) -> Result<usize, String> {
    let length: usize = value
        .parse()
        .map_err(|_| format!("invalid display length '{value}'"))?;
    if length == 0 {
        return Err("display length must be at least 1".to_string());
    }
    Ok(length)
}
