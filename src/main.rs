mod apply;
mod inspect;
mod util;

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bpspatch", about = "BPS patch applier and inspector", version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a BPS patch to a source file
    Apply {
        /// Path to the unmodified source file
        #[arg(long, short)]
        source: PathBuf,
        /// Path to the .bps patch file
        #[arg(long, short)]
        patch: PathBuf,
        /// Output path for the patched file
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Show the header, checksums and metadata of a patch
    Info {
        /// Path to the .bps patch file
        #[arg(long, short)]
        patch: PathBuf,
    },
    /// Check one or more patches for corruption
    Verify {
        /// Patch files to check
        #[arg(required = true)]
        patches: Vec<PathBuf>,
        /// Also check that each patch was made against this source file
        #[arg(long, short)]
        source: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Apply {
            source,
            patch,
            output,
        } => {
            println!("Applying patch...");
            println!("  Source: {}", source.display());
            println!("  Patch: {}", patch.display());
            println!("  Output: {}", output.display());

            let start = Instant::now();
            let summary = apply::apply_patch(&source, &patch, &output).await?;
            let elapsed = start.elapsed();

            println!("\nPatch applied successfully!");
            println!("  Source size: {}", summary.source_size);
            println!("  Target size: {}", summary.target_size);
            if !summary.metadata.is_empty() {
                println!("  Metadata: {}", summary.metadata);
            }
            println!("  Source reads: {}", summary.stats.source_reads);
            println!("  Target reads: {}", summary.stats.target_reads);
            println!("  Source copies: {}", summary.stats.source_copies);
            println!("  Target copies: {}", summary.stats.target_copies);
            println!("  Time elapsed: {:.3}s", elapsed.as_secs_f64());
        }
        Commands::Info { patch } => {
            let info = inspect::patch_info(&patch)?;

            println!("Patch: {}", patch.display());
            println!("  Source size: {}", info.source_size);
            println!("  Target size: {}", info.target_size);
            println!("  Source CRC32: {:#010X}", info.source_checksum);
            println!("  Target CRC32: {:#010X}", info.target_checksum);
            println!("  Patch CRC32: {:#010X}", info.patch_checksum);
            println!("  Action stream: {} bytes, {} actions", info.action_bytes, info.stats.actions());
            println!("    Source reads: {}", info.stats.source_reads);
            println!("    Target reads: {}", info.stats.target_reads);
            println!("    Source copies: {}", info.stats.source_copies);
            println!("    Target copies: {}", info.stats.target_copies);
            if info.metadata.is_empty() {
                println!("  Metadata: (none)");
            } else {
                println!("  Metadata:\n{}", info.metadata);
            }
        }
        Commands::Verify { patches, source } => {
            let outcomes = inspect::verify_patches(&patches, source.as_deref())?;

            let mut failed = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(info) => println!(
                        "OK    {} ({} -> {} bytes)",
                        outcome.path.display(),
                        info.source_size,
                        info.target_size
                    ),
                    Err(e) => {
                        failed += 1;
                        println!("FAIL  {}: {:#}", outcome.path.display(), e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} patches failed verification", failed, outcomes.len());
            }
        }
    }

    Ok(())
}
