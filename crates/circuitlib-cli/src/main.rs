use clap::{Parser, Subcommand};

mod build;
mod classify;
mod clean;
mod ui;

#[derive(Parser)]
#[command(name = "circuitlib")]
#[command(about = "Build component catalogs from KiCad symbol, footprint and 3D model libraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the component catalog
    #[command(alias = "b")]
    Build(build::BuildArgs),

    /// Show how symbol names are classified
    #[command(alias = "c")]
    Classify(classify::ClassifyArgs),

    /// Remove mirrored library repositories
    Clean(clean::CleanArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build::execute(args),
        Commands::Classify(args) => classify::execute(args),
        Commands::Clean(args) => clean::execute(args),
    }
}
