//! Rateio commands - split a generator's output among subscribers.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use uuid::Uuid;

use crate::allocation::{RateioDraft, ShareField, ValidationReport, validate_rateio};
use crate::local::Workspace;
use crate::types::{AllocationKind, Participant, Rateio, ReferenceMonth};

use super::output::{OutputFormat, emit, fit, kwh, pct, short_id};

#[derive(Args)]
pub struct RateioCmd {
    #[command(subcommand)]
    pub command: RateioSubCmd,
}

#[derive(Subcommand)]
pub enum RateioSubCmd {
    /// Compute a distribution without saving it
    Preview(PreviewCmd),

    /// Validate and save a rateio as pending
    Create(CreateCmd),

    /// List saved rateios, newest period first
    List(ListRateiosCmd),

    /// Show a saved rateio
    Show(ShowRateioCmd),

    /// Mark a pending rateio completed and carry credits forward
    Complete(CompleteCmd),
}

#[derive(Args)]
pub struct DraftArgs {
    /// Generator id, UC or nickname
    pub generator: String,

    /// Participant as KEY or KEY=VALUE, where KEY is a subscriber id or UC
    /// and VALUE a percentage or priority rank. Repeat for each participant.
    #[arg(long = "subscriber", short = 's', required = true)]
    pub subscribers: Vec<String>,

    #[arg(long, short = 'k', value_enum, default_value_t = AllocationKind::Percentage)]
    pub kind: AllocationKind,

    /// Reference date: DD/MM/YYYY, YYYY-MM-DD or YYYY-MM (default: this month)
    #[arg(long, short = 'p')]
    pub period: Option<String>,

    /// Override the generator's projected generation, in kWh
    #[arg(long)]
    pub generation: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct PreviewCmd {
    #[command(flatten)]
    pub draft: DraftArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CreateCmd {
    #[command(flatten)]
    pub draft: DraftArgs,

    /// Spreadsheet or document to keep with the rateio
    #[arg(long)]
    pub attach: Option<PathBuf>,

    /// Review and adjust the draft before saving
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(Args)]
pub struct ListRateiosCmd {
    /// Only rateios of this generator
    #[arg(long, short = 'g')]
    pub generator: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ShowRateioCmd {
    /// Rateio id or id prefix
    pub rateio: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CompleteCmd {
    /// Rateio id or id prefix
    pub rateio: String,
}

#[derive(Serialize)]
struct Preview<'a> {
    rateio: &'a RateioDraft,
    report: &'a ValidationReport,
}

impl RateioCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;

        match &self.command {
            RateioSubCmd::Preview(cmd) => cmd.run(&workspace).await,
            RateioSubCmd::Create(cmd) => cmd.run(&workspace).await,
            RateioSubCmd::List(cmd) => cmd.run(&workspace).await,
            RateioSubCmd::Show(cmd) => cmd.run(&workspace).await,
            RateioSubCmd::Complete(cmd) => {
                let id = resolve_rateio(&workspace, &cmd.rateio).await?;
                let rateio = workspace.complete_rateio(id).await?;
                println!("Completed rateio {}", short_id(&rateio.id));
                for p in &rateio.participants {
                    println!("  {:<28} credit used {}", fit(&p.name, 28), kwh(p.credit_used_kwh));
                }
                Ok(())
            }
        }
    }
}

impl DraftArgs {
    async fn build(&self, workspace: &Workspace) -> Result<RateioDraft> {
        let period = match &self.period {
            Some(raw) => parse_period(raw)?,
            None => ReferenceMonth::of(Local::now().date_naive()).first_day(),
        };

        let mut draft = workspace.start_rateio(&self.generator, self.kind, period).await?;
        if let Some(generation) = self.generation {
            draft.set_expected_generation(generation);
        }
        draft.notes = self.notes.clone();

        let mut values = Vec::new();
        for entry in &self.subscribers {
            let (key, value) = match entry.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (entry.trim(), None),
            };
            let subscriber = workspace.subscriber(key).await?;
            let index = draft.add_participant(&subscriber)?;
            if let Some(value) = value {
                let value: f64 = value
                    .replace(',', ".")
                    .parse()
                    .with_context(|| format!("Invalid share for {}: {}", key, value))?;
                values.push((index, value));
            }
        }

        let field = match self.kind {
            AllocationKind::Percentage => ShareField::Percentage,
            AllocationKind::Priority => ShareField::Priority,
        };
        for (index, value) in values {
            draft.update_subscriber_value(index, field, value)?;
        }
        // Show the same allocations `create` will store
        draft.auto_distribute();

        Ok(draft)
    }
}

impl PreviewCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let draft = self.draft.build(workspace).await?;
        let report = draft.validate();

        if emit(
            self.format,
            &Preview {
                rateio: &draft,
                report: &report,
            },
        )? {
            return Ok(());
        }

        println!(
            "{} - {} - {} rateio",
            draft.generator_name,
            draft.period.format("%d/%m/%Y"),
            draft.kind
        );
        println!();
        print_participants(&draft.participants, draft.kind);
        print_totals(
            draft.expected_generation_kwh,
            draft.participants.iter().map(|p| p.allocated_kwh).sum(),
            draft.unallocated_kwh,
        );
        print_report(&report);

        if report.is_valid() {
            println!();
            println!("Valid. Run `rateio rateio create` with the same arguments to save it.");
        }
        Ok(())
    }
}

impl CreateCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let mut draft = self.draft.build(workspace).await?;
        if self.interactive && !edit_draft(&mut draft)? {
            println!("Draft discarded.");
            return Ok(());
        }
        let report = draft.validate();
        for warning in &report.warnings {
            println!("warning: {}", warning);
        }

        let rateio = workspace.save_rateio(&draft, self.attach.as_deref()).await?;

        println!("Saved rateio {} ({})", rateio.id, rateio.status);
        println!(
            "  {} participants, {} allocated, {} unallocated",
            rateio.participants.len(),
            kwh(rateio.total_allocated_kwh()),
            kwh(rateio.unallocated_kwh)
        );
        if let Some(key) = &rateio.attachment {
            println!("  attachment: {}", workspace.attachments().path_of(key).display());
        }
        Ok(())
    }
}

impl ListRateiosCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let generator = match &self.generator {
            Some(key) => Some(workspace.generator(key).await?),
            None => None,
        };
        let rateios = workspace
            .db()
            .list_rateios(generator.as_ref().map(|g| g.id))
            .await?;

        if emit(self.format, &rateios)? {
            return Ok(());
        }

        if rateios.is_empty() {
            println!("No rateios saved yet.");
            return Ok(());
        }

        let generators = workspace.db().list_generators().await?;
        println!(
            "{:<8}  {:<10}  {:<22} {:<10} {:>5} {:>12}  {}",
            "ID", "PERIOD", "GENERATOR", "KIND", "SUBS", "ALLOCATED", "STATUS"
        );
        for r in &rateios {
            let name = generators
                .iter()
                .find(|g| g.id == r.generator_id)
                .map(|g| g.nickname.as_str())
                .unwrap_or("?");
            println!(
                "{:<8}  {:<10}  {:<22} {:<10} {:>5} {:>12}  {}",
                short_id(&r.id),
                r.period.format("%d/%m/%Y"),
                fit(name, 22),
                r.kind,
                r.participants.len(),
                kwh(r.total_allocated_kwh()),
                r.status
            );
        }
        Ok(())
    }
}

impl ShowRateioCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let id = resolve_rateio(workspace, &self.rateio).await?;
        let rateio = workspace.rateio(id).await?;

        if emit(self.format, &rateio)? {
            return Ok(());
        }

        let generator = workspace.db().get_generator(rateio.generator_id).await?;
        print_rateio(&rateio, generator.as_ref().map(|g| g.nickname.as_str()));

        // Saved rateios already passed validation; only warnings remain useful
        let report = validate_rateio(&rateio.participants, rateio.kind);
        print_report(&ValidationReport {
            errors: Vec::new(),
            ..report
        });
        if let Some(key) = &rateio.attachment {
            let store = workspace.attachments();
            let missing = if store.exists(key).await { "" } else { " (missing)" };
            println!("Attachment: {}{}", store.path_of(key).display(), missing);
        }
        Ok(())
    }
}

/// Accept a full id or a unique prefix of one.
async fn resolve_rateio(workspace: &Workspace, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }
    let prefix = key.trim().to_lowercase();
    if prefix.len() < 4 {
        bail!("Rateio id prefix must have at least 4 characters");
    }
    let matches: Vec<Uuid> = workspace
        .db()
        .list_rateios(None)
        .await?
        .into_iter()
        .map(|r| r.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches[..] {
        [id] => Ok(id),
        [] => bail!("No rateio matches '{}'", key),
        _ => bail!("{} rateios match '{}'; use more characters", matches.len(), key),
    }
}

/// One operator command in the interactive draft editor.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DraftEdit {
    Kind(AllocationKind),
    /// 1-based participant position and the new percentage or rank.
    Share(usize, f64),
    Remove(usize),
    Generation(f64),
    Show,
    Save,
    Quit,
}

const EDIT_HELP: &str = "commands: set <n> <value> | remove <n> | kind percentage|priority | generation <kwh> | show | save | quit";

fn parse_edit(line: &str) -> Result<DraftEdit> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let number = |raw: &str| -> Result<f64> {
        raw.replace(',', ".")
            .parse::<f64>()
            .with_context(|| format!("Not a number: {}", raw))
    };
    let position = |raw: &str| -> Result<usize> {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => bail!("Participant position must be 1 or more, got {}", raw),
        }
    };

    let edit = match words.as_slice() {
        ["set", n, value] => DraftEdit::Share(position(n)?, number(value)?),
        ["remove" | "rm", n] => DraftEdit::Remove(position(n)?),
        ["kind", kind] => DraftEdit::Kind(
            <AllocationKind as ValueEnum>::from_str(kind, true).map_err(anyhow::Error::msg)?,
        ),
        ["generation", kwh] => DraftEdit::Generation(number(kwh)?),
        ["show"] | [] => DraftEdit::Show,
        ["save"] => DraftEdit::Save,
        ["quit" | "q"] => DraftEdit::Quit,
        _ => bail!("Unknown command. {}", EDIT_HELP),
    };
    Ok(edit)
}

/// Let the operator adjust a draft from stdin. Returns whether to save it.
///
/// Edits that fail leave the draft unchanged and are reported inline.
fn edit_draft(draft: &mut RateioDraft) -> Result<bool> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    println!("{}", EDIT_HELP);

    loop {
        println!();
        print_participants(&draft.participants, draft.kind);
        print_totals(
            draft.expected_generation_kwh,
            draft.participants.iter().map(|p| p.allocated_kwh).sum(),
            draft.unallocated_kwh,
        );
        print_report(&draft.validate());

        print!("rateio> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(false);
        };

        let applied = parse_edit(&line?).and_then(|edit| {
            match edit {
                DraftEdit::Kind(kind) => draft.set_kind(kind),
                DraftEdit::Share(n, value) => {
                    let field = match draft.kind {
                        AllocationKind::Percentage => ShareField::Percentage,
                        AllocationKind::Priority => ShareField::Priority,
                    };
                    draft.update_subscriber_value(n - 1, field, value)?;
                }
                DraftEdit::Remove(n) => {
                    let removed = draft.remove_participant(n - 1)?;
                    println!("Removed {}", removed.name);
                }
                DraftEdit::Generation(kwh) => draft.set_expected_generation(kwh),
                DraftEdit::Show | DraftEdit::Save | DraftEdit::Quit => {}
            }
            Ok(edit)
        });

        match applied {
            Ok(DraftEdit::Save) => return Ok(true),
            Ok(DraftEdit::Quit) => return Ok(false),
            Ok(_) => {}
            Err(e) => println!("  ! {}", e),
        }
    }
}

/// Parse `DD/MM/YYYY`, `YYYY-MM-DD` or a bare month.
fn parse_period(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split('/').collect();
    if let [day, month, year] = parts[..] {
        let (day, month, year) = (day.parse()?, month.parse()?, year.parse()?);
        return Ok(RateioDraft::period_from_parts(day, month, year)?);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    let month: ReferenceMonth = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid period '{}': {}", raw, e))?;
    Ok(month.first_day())
}

fn print_participants(participants: &[Participant], kind: AllocationKind) {
    let share_header = match kind {
        AllocationKind::Percentage => "SHARE",
        AllocationKind::Priority => "RANK",
    };
    println!(
        "{:<24} {:<15} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "NAME", "UC", share_header, "CONSUMPTION", "CREDIT", "ALLOCATED", "CREDIT USED", "REMAINING"
    );
    for p in participants {
        let share = match kind {
            AllocationKind::Percentage => pct(p.percentage),
            AllocationKind::Priority => p
                .priority
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
        };
        println!(
            "{:<24} {:<15} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12}",
            fit(&p.name, 24),
            p.uc,
            share,
            kwh(p.consumption_kwh),
            kwh(p.accumulated_credit_kwh),
            kwh(p.allocated_kwh),
            kwh(p.credit_used_kwh),
            kwh(p.remaining_credit_kwh)
        );
    }
}

fn print_totals(generation: f64, allocated: f64, unallocated: f64) {
    println!();
    println!("Generation:   {}", kwh(generation));
    println!("Allocated:    {}", kwh(allocated));
    if unallocated > 0.0 {
        println!("Unallocated:  {}", kwh(unallocated));
    }
}

fn print_report(report: &ValidationReport) {
    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
}

fn print_rateio(r: &Rateio, generator: Option<&str>) {
    println!("Rateio {}", r.id);
    println!("  generator:  {}", generator.unwrap_or("(removed)"));
    println!(
        "  period:     {} ({}/{})",
        r.period.format("%d/%m/%Y"),
        r.period.month(),
        r.period.year()
    );
    println!("  kind:       {}", r.kind);
    println!("  status:     {}", r.status);
    if let Some(notes) = &r.notes {
        println!("  notes:      {}", notes);
    }
    println!();
    print_participants(&r.participants, r.kind);
    print_totals(r.expected_generation_kwh, r.total_allocated_kwh(), r.unallocated_kwh);
}
