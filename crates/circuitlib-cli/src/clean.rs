use anyhow::Result;
use circuitlib_fetch::cache_dir;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(about = "Remove mirrored library repositories and, optionally, a built catalog")]
pub struct CleanArgs {
    /// Also remove this catalog file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn execute(args: CleanArgs) -> Result<()> {
    if let Some(output) = &args.output {
        if output.is_file() {
            println!("Removing {}", output.display());
            std::fs::remove_file(output)?;
        }
    }

    let cache_dir = cache_dir()?;
    if cache_dir.exists() {
        println!("Removing cache directory {}", cache_dir.display());
        std::fs::remove_dir_all(&cache_dir)?;
    }

    println!("Clean complete");
    Ok(())
}
