use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use freshdeps_registry::{DEFAULT_CONCURRENCY, DEFAULT_REGISTRY_URL};

use crate::render::{output_style_for, OutputStyle};
use crate::Cli;

pub(crate) const REGISTRY_ENV: &str = "FRESHDEPS_REGISTRY";
pub(crate) const CONCURRENCY_ENV: &str = "FRESHDEPS_CONCURRENCY";
pub(crate) const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub manifest_path: PathBuf,
    pub display_length: usize,
    pub include_dev: bool,
    pub registry_url: String,
    pub concurrency: usize,
    pub output_style: OutputStyle,
}

impl Config {
    pub fn from_cli<F>(cli: &Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_url = match env(REGISTRY_ENV) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => DEFAULT_REGISTRY_URL.to_string(),
        };
        let concurrency = match env(CONCURRENCY_ENV) {
            Some(raw) => parse_concurrency(&raw)
                .with_context(|| format!("invalid {CONCURRENCY_ENV} value '{raw}'"))?,
            None => DEFAULT_CONCURRENCY,
        };
        let no_color = env(NO_COLOR_ENV).is_some_and(|value| !value.is_empty());

        Ok(Self {
            manifest_path: cli.manifest.clone(),
            display_length: cli.length,
            include_dev: cli.dev,
            registry_url,
            concurrency,
            output_style: output_style_for(no_color),
        })
    }
}

fn parse_concurrency(raw: &str) -> Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("expected a positive integer"))?;
    if value == 0 {
        return Err(anyhow!("concurrency must be at least 1"));
    }
    Ok(value)
}
