use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use waveregions::annotation::AnnotationSet;
use waveregions::conflict::{find_boundary_conflicts, find_label_conflicts, has_conflict_marker};
use waveregions::merge::merge_all;
use waveregions::region::{Region, RegionIds};
use waveregions::rows::{parse_rows, write_commit_rows, write_rows, ParseReport};
use waveregions::{logging, rttm, words, EditorConfig};

#[derive(Parser, Debug)]
#[command(
    name = "waveregions",
    version,
    about = "Inspect, normalize and convert speaker region files"
)]
struct Cli {
    /// Editor config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a region file and report malformed rows
    Check { csv: PathBuf },
    /// Merge every same-label overlap
    Merge {
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List boundary and label conflicts between two versions
    Conflicts { primary: PathBuf, secondary: PathBuf },
    /// Convert a region file to RTTM
    #[command(name = "to-rttm")]
    ToRttm {
        csv: PathBuf,
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Convert RTTM to a region file
    #[command(name = "from-rttm")]
    FromRttm { rttm: PathBuf },
    /// Write the six-column commit form
    Export { csv: PathBuf },
    /// List transcript word regions
    Words { json: PathBuf },
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn load_regions(path: &Path, ids: &mut RegionIds) -> Result<(AnnotationSet, ParseReport)> {
    let report = parse_rows(&read_text(path)?)?;
    for err in &report.errors {
        eprintln!("{}: {err}", path.display());
    }
    let set = AnnotationSet::from_rows(&report.rows, ids);
    Ok((set, report))
}

fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn describe(r: &Region) -> String {
    format!("{} [{:.2}, {:.2}]", r.label, r.start, r.end)
}

fn run(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let machine_labels = cfg.machine_label_regex()?;
    let mut ids = RegionIds::new();

    match cli.command {
        Command::Check { csv } => {
            let (set, report) = load_regions(&csv, &mut ids)?;
            println!("regions: {}", set.len());
            println!("skipped rows: {}", report.errors.len());
            println!("speakers: {}", set.known_labels().len());
            println!("longest: {:.2}s", set.longest_duration());
            if has_conflict_marker(set.working()) {
                println!("conflict markers present");
            }
            if !report.is_clean() {
                anyhow::bail!("{} malformed row(s) in {}", report.errors.len(), csv.display());
            }
        }
        Command::Merge { csv, out } => {
            let (mut set, _) = load_regions(&csv, &mut ids)?;
            let removed = merge_all(set.begin_edit())?;
            set.sort_by_start();
            tracing::info!(merged = removed.len(), remaining = set.len(), "overlaps merged");
            emit(&write_rows(set.working())?, out.as_deref())?;
        }
        Command::Conflicts { primary, secondary } => {
            let (a, _) = load_regions(&primary, &mut ids)?;
            let (b, _) = load_regions(&secondary, &mut ids)?;
            let boundary = find_boundary_conflicts(a.working(), b.working());
            let label = find_label_conflicts(a.working(), b.working());
            for pair in &boundary {
                if let (Some(l), Some(r)) = (a.get(pair.primary), b.get(pair.secondary)) {
                    let kind = if l.label == r.label { "boundary" } else { "label" };
                    println!("{kind}\t{}\t{}", describe(l), describe(r));
                }
            }
            println!("{} boundary, {} label conflict(s)", boundary.len(), label.len());
        }
        Command::ToRttm { csv, file_id } => {
            let (set, _) = load_regions(&csv, &mut ids)?;
            let file_id = file_id.unwrap_or_else(|| cfg.rttm_file_id.clone());
            print!("{}", rttm::to_rttm(set.working(), &file_id, &machine_labels));
        }
        Command::FromRttm { rttm: path } => {
            let report = rttm::parse_rttm(&read_text(&path)?);
            for err in &report.errors {
                eprintln!("{}: {err}", path.display());
            }
            let set = AnnotationSet::from_rows(&report.rows, &mut ids);
            print!("{}", write_rows(set.working())?);
        }
        Command::Export { csv } => {
            let (set, _) = load_regions(&csv, &mut ids)?;
            print!("{}", write_commit_rows(set.working(), &machine_labels)?);
        }
        Command::Words { json } => {
            for w in words::parse_words(&read_text(&json)?)? {
                println!("{}\t{:.2}\t{:.2}\t{}", w.index, w.start, w.end, w.text);
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
