//! CLI module for unitgraph.
//!
//! Commands:
//! - Graph: uses, cycles
//! - Scanner: tokenize
//! - Setup: search-path

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{abs_path_list, split_path_list, temp_dir, UnitGraphConfig, CONFIG_FILE};
use crate::error::UnitGraphError;
use crate::export::{write_report, OutputFormat};
use crate::graph::{
    build_index, format_path, scan_stats, search_path_from_root, unit_name_of, DependencyIndex,
    UsesGraph,
};
use crate::scanner::{tokenize_files, Mode};

#[derive(Parser)]
#[command(name = "unitgraph")]
#[command(about = "Unit dependency analysis for Pascal sources", long_about = None)]
pub struct Cli {
    /// Log resolution details (missing units, failed includes, scan errors)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./unitgraph.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to look for units.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Project files (.dpr/.pas) to start from
    #[arg(required = true)]
    pub roots: Vec<String>,

    /// `;`-separated search path (default: config, then DELPHI_SEARCH)
    #[arg(short, long)]
    pub search: Option<String>,

    /// Search path root, every folder below it is searched
    #[arg(short, long)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    // ─── Graph ────────────────────────────────────────────────────
    /// Write the unit uses graph
    Uses {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output file; the extension picks the format: txt, dot, tgf, glay
        /// (default: <first root>.txt)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print why a unit is included instead of writing the graph
        #[arg(short, long)]
        why: Option<String>,

        /// Only analyse interface sections
        #[arg(long)]
        interface: bool,
    },

    /// Print units that use each other through their interfaces
    Cycles {
        #[command(flatten)]
        sources: SourceArgs,
    },

    // ─── Scanner ──────────────────────────────────────────────────
    /// Print the token stream of source files
    Tokenize {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Include comments
        #[arg(short, long)]
        comments: bool,

        /// Emit JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    // ─── Setup ────────────────────────────────────────────────────
    /// Print a search path covering every source folder below a root
    SearchPath {
        root: PathBuf,
    },
}

/// Runs a parsed command, writing results to `out`.
pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = match &cli.config {
        // An explicitly named config has to load.
        Some(path) => UnitGraphConfig::try_load(path)?,
        None => UnitGraphConfig::load(&config_path),
    };

    match cli.command {
        Commands::Uses {
            sources,
            out: output,
            why,
            interface,
        } => {
            config.interface_only |= interface;
            let index = load_index(&config, &sources)?;

            if let Some(target) = why {
                return print_why(&index, &target, out);
            }

            let output = output.unwrap_or_else(|| default_output(&sources.roots[0]));
            write_output(&index, &output)?;
            info!(path = %output.display(), units = index.uses().len(), "report written");
            writeln!(out, "{}", output.display())?;
        }

        Commands::Cycles { sources } => {
            let index = load_index(&config, &sources)?;
            let cycles = UsesGraph::from_index(&index).find_cycles();
            if cycles.is_empty() {
                writeln!(out, "No circular interface uses")?;
            } else {
                writeln!(out, "Circular interface uses:")?;
                for cycle in cycles {
                    writeln!(out, "\t{}", cycle.join(", "))?;
                }
            }
        }

        Commands::Tokenize {
            files,
            comments,
            json,
        } => {
            let mode = if comments {
                Mode::SCAN_COMMENTS
            } else {
                Mode::empty()
            };
            print_tokens(&files, mode, json, out)?;
        }

        Commands::SearchPath { root } => {
            info!("{}", scan_stats(&config, &root));
            let dirs: Vec<String> = search_path_from_root(&root)
                .iter()
                .map(|d| d.to_string_lossy().into_owned())
                .collect();
            writeln!(out, "{}", abs_path_list(&dirs.join(";")))?;
        }
    }

    Ok(())
}

fn load_index(config: &UnitGraphConfig, sources: &SourceArgs) -> Result<DependencyIndex> {
    let search = match &sources.search {
        Some(list) => split_path_list(list),
        None => config.search_dirs(),
    };
    let index = build_index(config, &sources.roots, sources.root.as_deref(), &search)
        .context("failed to build dependency index")?;
    Ok(index)
}

/// `<dir>/Project.dpr` -> `Project.txt`, in the working directory.
fn default_output(root: &str) -> PathBuf {
    PathBuf::from(format!("{}.txt", unit_name_of(root)))
}

/// Scratch file the report is written to before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    temp_dir().join(format!("unitgraph-{}-{}", std::process::id(), name))
}

/// Writes the report to a staging file first, so a failed write leaves any
/// previous report at `path` untouched.
fn write_output(index: &DependencyIndex, path: &Path) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    let staged = staging_path(path);
    debug!(staged = %staged.display(), "staging report");

    let file = File::create(&staged).map_err(|e| UnitGraphError::io(&staged, e))?;
    let mut w = BufWriter::new(file);
    let written = write_report(format, &mut w, index).and_then(|()| w.flush());
    drop(w);
    if let Err(e) = written {
        let _ = fs::remove_file(&staged);
        return Err(UnitGraphError::io(&staged, e).into());
    }

    let copied = fs::copy(&staged, path);
    let _ = fs::remove_file(&staged);
    copied.map_err(|e| UnitGraphError::io(path, e))?;
    Ok(())
}

fn print_why<W: Write>(index: &DependencyIndex, target: &str, out: &mut W) -> Result<()> {
    let target = unit_name_of(target);
    let graph = UsesGraph::from_index(index);
    if !graph.contains(&target) {
        return Err(UnitGraphError::UnitNotFound(target).into());
    }

    writeln!(out, "{}", index.normal_name(&target).unwrap_or(&target))?;
    for path in graph.why(&target) {
        writeln!(out, "{}", format_path(&path))?;
    }
    Ok(())
}

fn print_tokens<W: Write>(files: &[PathBuf], mode: Mode, json: bool, out: &mut W) -> Result<()> {
    let mut scanned = Vec::with_capacity(files.len());
    for result in tokenize_files(files, mode) {
        match result {
            Ok(tokens) => scanned.push(tokens),
            Err(e) => warn!(error = %e, "skipping file"),
        }
    }

    if json {
        serde_json::to_writer_pretty(&mut *out, &scanned)?;
        writeln!(out)?;
        return Ok(());
    }

    for file in &scanned {
        for tok in &file.tokens {
            writeln!(out, "{}\t{}\t{:?}", tok.position, tok.token, tok.literal)?;
        }
        for err in &file.errors {
            writeln!(out, "{}\tERROR\t{}", err.position, err.message)?;
        }
        if file.truncated {
            warn!(path = %file.path.display(), "too many errors, output truncated");
        }
    }
    Ok(())
}
