mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Relink — label CSV path repair toolkit
#[derive(Parser)]
#[command(name = "relink", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair the image-path column of a label CSV
    Correct {
        /// Input CSV file
        input: PathBuf,
        /// Directory tree to search for moved files (repeatable)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
        /// Output file (default: <stem>_corrected.csv next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Base directory for relative references (default: current directory)
        #[arg(long)]
        base: Option<PathBuf>,
        /// The input has no header row
        #[arg(long)]
        no_header: bool,
        /// Drop rows whose path matched nothing
        #[arg(long)]
        drop_unmatched: bool,
        /// Write one row per match instead of keeping the first
        #[arg(long)]
        expand_matches: bool,
        /// Walk the roots for every row instead of indexing them up front
        #[arg(long)]
        no_index: bool,
        /// Disable parallel directory walking
        #[arg(long)]
        serial: bool,
    },
    /// Merge two label CSVs; on duplicate paths the incoming row wins
    Merge {
        /// Base CSV file
        base: Option<PathBuf>,
        /// Incoming CSV file
        incoming: Option<PathBuf>,
        /// Pick the newest CSV in this directory as the base
        #[arg(long, conflicts_with = "base")]
        base_dir: Option<PathBuf>,
        /// Pick the newest CSV in this directory as the incoming file
        #[arg(long, conflicts_with = "incoming")]
        incoming_dir: Option<PathBuf>,
        /// Output file
        #[arg(long)]
        output: PathBuf,
        /// Record each row's origin in a source_file column
        #[arg(long)]
        tag_source: bool,
    },
    /// Replace a literal substring in every field of a CSV
    Rewrite {
        /// Input CSV file
        input: PathBuf,
        /// Substring to replace
        #[arg(long)]
        from: String,
        /// Replacement text
        #[arg(long)]
        to: String,
        /// Output file (default: overwrite the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert tagger TXT output into a CSV table
    Convert {
        /// Tagger log file, or a directory (newest .txt wins)
        input: PathBuf,
        /// Base directory for relativizing image paths
        #[arg(long)]
        base: Option<PathBuf>,
        /// Output file (default: <input stem>.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Move the file named by the newest tagger log out of the way
    Relocate {
        /// Directory holding the tagger logs
        log_dir: PathBuf,
        /// Directory the referenced file is moved into
        target_dir: PathBuf,
        /// Base directory for relative references (default: current directory)
        #[arg(long)]
        base: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Correct {
            input,
            roots,
            output,
            base,
            no_header,
            drop_unmatched,
            expand_matches,
            no_index,
            serial,
        } => commands::correct::run(commands::correct::Args {
            input,
            roots,
            output,
            base,
            no_header,
            drop_unmatched,
            expand_matches,
            no_index,
            serial,
        })?,
        Commands::Merge {
            base,
            incoming,
            base_dir,
            incoming_dir,
            output,
            tag_source,
        } => commands::merge::run(base, incoming, base_dir, incoming_dir, output, tag_source)?,
        Commands::Rewrite {
            input,
            from,
            to,
            output,
        } => commands::rewrite::run(input, &from, &to, output)?,
        Commands::Convert {
            input,
            base,
            output,
        } => commands::convert::run(input, base, output)?,
        Commands::Relocate {
            log_dir,
            target_dir,
            base,
        } => commands::relocate::run(log_dir, target_dir, base)?,
    }

    Ok(())
}
