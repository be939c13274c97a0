use std::path::Path;

use anyhow::Context;
use bnk_bank::{
    BankConfig, BankMutator, BatchReport, EditAction, SaveOutcome, SkippedEdit, WemId,
};
use colored::Colorize;
use serde::Serialize;

use crate::cli::*;
use crate::names::{expand_names, parse_id};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => BankConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BankConfig::default(),
    };
    let ctx = RunContext {
        verbose: cli.verbose,
        format: cli.format,
        config,
    };

    match cli.command {
        Command::List(args) => cmd_list(&ctx, &args.bank),
        Command::Info(args) => cmd_info(&ctx, &args.bank),
        Command::Extract(args) => cmd_extract(&ctx, args),
        Command::Update(args) => cmd_edit(&ctx, args, EditKind::Update).map(drop),
        Command::Empty(args) => cmd_edit(&ctx, args, EditKind::Empty).map(drop),
        Command::Delete(args) => cmd_edit(&ctx, args, EditKind::Delete).map(drop),
    }
}

struct RunContext {
    verbose: bool,
    format: OutputFormat,
    config: BankConfig,
}

impl RunContext {
    fn open(&self, bank: &Path) -> anyhow::Result<BankMutator> {
        BankMutator::load_with_config(bank, self.config.clone())
            .with_context(|| format!("loading bank {}", bank.display()))
    }
}

#[derive(Clone, Copy)]
enum EditKind {
    Update,
    Empty,
    Delete,
}

#[derive(Serialize)]
struct ListEntry {
    id: WemId,
    size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc32: Option<u32>,
}

fn cmd_list(ctx: &RunContext, bank: &Path) -> anyhow::Result<()> {
    let m = ctx.open(bank)?;
    let entries = m
        .list()
        .map(|(id, size)| -> anyhow::Result<ListEntry> {
            let crc32 = if ctx.verbose {
                Some(crc32fast::hash(m.extract(id)?))
            } else {
                None
            };
            Ok(ListEntry { id, size, crc32 })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if ctx.verbose {
                let header = m.header();
                println!("Bank {} (version {})", header.bank_id.to_string().bold(), header.version);
                println!("{} audio objects", entries.len().to_string().bold());
            }
            for entry in &entries {
                match entry.crc32 {
                    Some(crc) => println!(
                        "{}.wem : {} bytes  crc32 {}",
                        entry.id.to_string().yellow(),
                        entry.size,
                        format!("{crc:08x}").dimmed()
                    ),
                    None => println!("{}.wem", entry.id.to_string().yellow()),
                }
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ChunkEntry {
    tag: String,
    offset: u64,
    length: u32,
}

fn cmd_info(ctx: &RunContext, bank: &Path) -> anyhow::Result<()> {
    let m = ctx.open(bank)?;
    let chunks: Vec<_> = m
        .bank()
        .chunks()
        .iter()
        .map(|c| ChunkEntry {
            tag: c.tag().to_string(),
            offset: c.offset(),
            length: c.len(),
        })
        .collect();

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chunks)?),
        OutputFormat::Text => {
            let header = m.header();
            println!("Bank {} (version {})", header.bank_id.to_string().bold(), header.version);
            for c in &chunks {
                println!("  {}  @{:<10} {} bytes", c.tag.cyan(), c.offset, c.length);
            }
            println!("{} objects, {} data bytes", m.bank().index().len(), m.bank().store().len());
        }
    }
    Ok(())
}

fn cmd_extract(ctx: &RunContext, args: ExtractArgs) -> anyhow::Result<()> {
    let m = ctx.open(&args.bank)?;
    let ids: Vec<WemId> = if args.names.is_empty() {
        m.list().map(|(id, _)| id).collect()
    } else {
        ids_from_names(&expand_names(&args.names)?)
    };

    let mut missing = 0;
    for id in ids {
        match m.extract_to_dir(id, &args.output) {
            Ok(path) => println!(".. extracting {}", path.display().to_string().green()),
            Err(bnk_bank::BankError::UnknownObjectId(id)) => {
                tracing::warn!(id = %id, "object not in bank, skipping");
                missing += 1;
            }
            Err(e) => return Err(e).context("extracting object"),
        }
    }
    if missing > 0 {
        println!("{} {missing} requested objects not found", "!".yellow().bold());
    }
    Ok(())
}

fn cmd_edit(ctx: &RunContext, args: EditArgs, kind: EditKind) -> anyhow::Result<BatchReport> {
    let mut m = ctx.open(&args.bank)?;
    let names = expand_names(&args.names)?;

    let (edits, rejected) = collect_edits(&m, &names, kind);
    let mut report = m.stage_batch(edits)?;
    report.skipped.extend(rejected);
    print_report(&report, kind);

    let outcome = match &args.output {
        Some(path) => m.save(path),
        None => m.save_in_place(),
    }
    .context("saving bank")?;

    match outcome {
        SaveOutcome::Unchanged => println!("No changes; bank left untouched."),
        SaveOutcome::Written { path, backup, bytes } => {
            if let Some(backup) = backup {
                println!("  backup: {}", backup.display().to_string().dimmed());
            }
            println!(
                "{} Wrote {} ({bytes} bytes)",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
        }
    }
    Ok(report)
}

/// Turn names into edits. Names that are not object ids, ids missing from
/// the bank, and unreadable replacement files are skipped, not fatal.
fn collect_edits(
    m: &BankMutator,
    names: &[String],
    kind: EditKind,
) -> (Vec<(WemId, EditAction)>, Vec<SkippedEdit>) {
    let mut edits = Vec::with_capacity(names.len());
    let mut skipped = Vec::new();
    for name in names {
        let Some(id) = parse_id(name) else {
            tracing::warn!(name = %name, "not an object name, skipping");
            skipped.push(SkippedEdit::for_name(name.as_str(), "not an object name"));
            continue;
        };
        let action = match kind {
            EditKind::Update => {
                if !m.bank().index().contains(id) {
                    tracing::warn!(id = %id, "object not in bank, skipping");
                    skipped.push(SkippedEdit::for_id(id, "unknown object id"));
                    continue;
                }
                match std::fs::read(name) {
                    Ok(bytes) => EditAction::Replace(bytes),
                    Err(e) => {
                        tracing::warn!(
                            name = %name,
                            error = %e,
                            "cannot read replacement, skipping"
                        );
                        skipped.push(SkippedEdit {
                            name: name.clone(),
                            id: Some(id),
                            reason: format!("cannot read replacement: {e}"),
                        });
                        continue;
                    }
                }
            }
            EditKind::Empty => EditAction::Empty,
            EditKind::Delete => EditAction::Delete,
        };
        edits.push((id, action));
    }
    (edits, skipped)
}

fn print_report(report: &BatchReport, kind: EditKind) {
    let verb = match kind {
        EditKind::Update => "updating",
        EditKind::Empty => "emptying",
        EditKind::Delete => "deleting",
    };
    for id in &report.staged {
        println!(".. {verb} {}.wem", id.to_string().yellow());
    }
    for skipped in &report.skipped {
        println!("{} skipped {}: {}", "!".yellow().bold(), skipped.name, skipped.reason);
    }
    if !report.is_clean() {
        println!("{} {} warnings", "!".yellow().bold(), report.warning_count());
    }
}

fn ids_from_names(names: &[String]) -> Vec<WemId> {
    names
        .iter()
        .filter_map(|name| {
            let id = parse_id(name);
            if id.is_none() {
                tracing::warn!(name = %name, "not an object name, skipping");
            }
            id
        })
        .collect()
}
