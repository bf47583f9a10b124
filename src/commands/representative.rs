//! Representative commands - sales representatives and their commissions.

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::forms::is_plausible_email;
use crate::local::Workspace;
use crate::types::{Document, Phone, ReferenceMonth, Representative, format_brl};

use super::invoice::parse_month;
use super::output::{OutputFormat, emit, fit};

#[derive(Args)]
pub struct RepresentativeCmd {
    #[command(subcommand)]
    pub command: RepresentativeSubCmd,
}

#[derive(Subcommand)]
pub enum RepresentativeSubCmd {
    /// Register a representative
    Add(AddRepresentativeCmd),

    /// List representatives
    List(ListRepresentativesCmd),

    /// Commission owed for a month, from paid invoices
    Commission(CommissionCmd),
}

#[derive(Args)]
pub struct AddRepresentativeCmd {
    pub name: String,

    /// CPF or CNPJ
    pub document: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Commission in percent (default: from config)
    #[arg(long)]
    pub commission: Option<f64>,
}

#[derive(Args)]
pub struct ListRepresentativesCmd {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CommissionCmd {
    /// Reference month, YYYY-MM or MM/YYYY (default: this month)
    #[arg(long, short = 'm')]
    pub month: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl RepresentativeCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;

        match &self.command {
            RepresentativeSubCmd::Add(cmd) => cmd.run(&workspace).await,
            RepresentativeSubCmd::List(cmd) => cmd.run(&workspace).await,
            RepresentativeSubCmd::Commission(cmd) => cmd.run(&workspace).await,
        }
    }
}

impl AddRepresentativeCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let document: Document = self.document.parse().context("Invalid document")?;
        let phone: Option<Phone> = self
            .phone
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("Invalid phone")?;
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                bail!("Invalid e-mail address: {}", email);
            }
        }

        let representative = Representative {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            document,
            email: self.email.as_ref().map(|e| e.trim().to_lowercase()),
            phone,
            commission_pct: self
                .commission
                .unwrap_or(workspace.config().default_commission_pct),
            created_at: Utc::now(),
        };
        workspace.register_representative(&representative).await?;

        println!("Registered {} ({}% commission)", representative.name, representative.commission_pct);
        println!("  id: {}", representative.id);
        Ok(())
    }
}

impl ListRepresentativesCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let representatives = workspace.db().list_representatives().await?;

        if emit(self.format, &representatives)? {
            return Ok(());
        }

        if representatives.is_empty() {
            println!("No representatives yet.");
            return Ok(());
        }

        println!("{:<36}  {:<28} {:<20} {:>6}  {}", "ID", "NAME", "DOCUMENT", "COMM", "SUBSCRIBERS");
        for r in &representatives {
            let subscribers = workspace.db().list_subscribers_by_representative(r.id).await?;
            println!(
                "{:<36}  {:<28} {:<20} {:>5}%  {}",
                r.id,
                fit(&r.name, 28),
                r.document,
                r.commission_pct,
                subscribers.len()
            );
        }
        Ok(())
    }
}

impl CommissionCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let reference = match &self.month {
            Some(raw) => parse_month(raw)?,
            None => ReferenceMonth::of(Local::now().date_naive()),
        };
        let lines = workspace.commission_report(reference).await?;

        if emit(self.format, &lines)? {
            return Ok(());
        }

        if lines.is_empty() {
            println!("No representatives yet.");
            return Ok(());
        }

        println!("Commissions for {}", reference);
        println!();
        println!("{:<28} {:>6} {:>16} {:>16}", "REPRESENTATIVE", "PAID", "BILLED", "COMMISSION");
        let mut total = 0;
        for line in &lines {
            total += line.commission_cents;
            println!(
                "{:<28} {:>6} {:>16} {:>16}",
                fit(&line.representative_name, 28),
                line.paid_invoices,
                format_brl(line.billed_cents),
                format_brl(line.commission_cents)
            );
        }
        println!();
        println!("Total: {}", format_brl(total));
        Ok(())
    }
}
