use crate::ui::{icons, Spinner};
use anyhow::{Context, Result};
use circuitlib_catalog::{build_catalog, write_catalog, CatalogConfig, Source};
use circuitlib_eda::ClassifierStrategy;
use circuitlib_fetch::{CancelToken, HttpFetcher};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "circuitlib.toml";

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Build the component catalog from symbol, footprint and 3D model libraries")]
pub struct BuildArgs {
    /// TOML config file (default: ./circuitlib.toml if present)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Local directory of symbol libraries (.kicad_sym, .lib)
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub symbols: Option<PathBuf>,

    /// Local directory of footprint libraries (.pretty folders)
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub footprints: Option<PathBuf>,

    /// Local directory of 3D models (.step, .stp, .wrl, .vrml)
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub models: Option<PathBuf>,

    /// Fetch the default KiCad libraries over HTTP
    #[arg(long, conflicts_with = "mirror")]
    pub remote: bool,

    /// Clone the KiCad library repositories into the cache and read them locally
    #[arg(long)]
    pub mirror: bool,

    /// Name classification strategy
    #[arg(long, value_name = "STRATEGY")]
    pub classifier: Option<ClassifierStrategy>,

    /// Per-request timeout for remote fetches, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Where to write the catalog JSON
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the catalog JSON to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let config = resolve_config(&args, Path::new(DEFAULT_CONFIG))?;
    log::debug!("Resolved config: {config:?}");

    let fetcher =
        HttpFetcher::new(config.fetch_timeout()).context("Failed to create HTTP client")?;
    let cancel = CancelToken::new();

    let spinner = Spinner::start("Building component catalog");
    let catalog = match build_catalog(&config, &fetcher, &cancel) {
        Ok(catalog) => catalog,
        Err(e) => {
            spinner.error("Catalog build failed");
            return Err(e.into());
        }
    };
    spinner.success(catalog.summary.to_string());

    if catalog.components.is_empty() {
        eprintln!(
            "{} No components were produced; check the library sources",
            icons::warning()
        );
    }

    if args.stdout {
        println!("{}", catalog.to_json()?);
    } else {
        write_catalog(&catalog, &config.output)?;
        eprintln!(
            "{} {} {}",
            icons::success(),
            format!("{} components", catalog.components.len()).green().bold(),
            format!("{} {}", icons::arrow(), config.output.display()).dimmed()
        );
    }
    Ok(())
}

/// Config file (explicit, or the default one if it exists), then flag overrides.
pub fn resolve_config(args: &BuildArgs, default_config: &Path) -> Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None if default_config.is_file() => CatalogConfig::from_file(default_config)?,
        None => CatalogConfig::default(),
    };

    if args.remote {
        config.symbols = Source::default_symbols();
        config.footprints = Source::default_footprints();
    }
    if args.mirror {
        config.symbols = Source::symbols_mirror();
        config.footprints = Source::footprints_mirror();
    }
    if let Some(path) = &args.symbols {
        config.symbols = Source::Local { path: path.clone() };
    }
    if let Some(path) = &args.footprints {
        config.footprints = Source::Local { path: path.clone() };
    }
    if let Some(path) = &args.models {
        config.models = Some(path.clone());
    }
    if let Some(classifier) = args.classifier {
        config.classifier = classifier;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.fetch_timeout_ms = timeout_ms;
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    Ok(config)
}
