//! Invoice commands - bill subscribers for compensated energy.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::billing::{InvoiceInput, compensated_from_rateios};
use crate::local::Workspace;
use crate::types::{Invoice, InvoiceStatus, ReferenceMonth, format_brl};

use super::output::{OutputFormat, emit, fit, kwh, short_id};

#[derive(Args)]
pub struct InvoiceCmd {
    #[command(subcommand)]
    pub command: InvoiceSubCmd,
}

#[derive(Subcommand)]
pub enum InvoiceSubCmd {
    /// Create a draft invoice for a subscriber and month
    Create(CreateInvoiceCmd),

    /// List invoices
    List(ListInvoicesCmd),

    /// Show one invoice
    Show(InvoiceRef),

    /// Mark a draft invoice as issued
    Issue(InvoiceRef),

    /// Mark an issued invoice as paid
    Pay(InvoiceRef),

    /// Cancel a draft or issued invoice
    Cancel(InvoiceRef),
}

#[derive(Args)]
pub struct CreateInvoiceCmd {
    /// Subscriber id or UC
    pub subscriber: String,

    /// Reference month, YYYY-MM or MM/YYYY (default: this month)
    #[arg(long, short = 'm')]
    pub month: Option<String>,

    /// Consumption in kWh (default: the subscriber's average)
    #[arg(long)]
    pub consumption: Option<f64>,

    /// Compensated kWh (default: what the month's rateios delivered)
    #[arg(long)]
    pub compensated: Option<f64>,

    /// Tariff in BRL/kWh (default: from config)
    #[arg(long)]
    pub tariff: Option<f64>,

    /// Discount in percent (default: the subscriber's plan)
    #[arg(long)]
    pub discount: Option<f64>,

    /// Due date, DD/MM/YYYY or YYYY-MM-DD (default: the 10th of next month)
    #[arg(long)]
    pub due: Option<String>,

    /// Utility bill or other document to keep with the invoice
    #[arg(long)]
    pub attach: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListInvoicesCmd {
    /// Only invoices of this subscriber (id or UC)
    #[arg(long, short = 's')]
    pub subscriber: Option<String>,

    /// Only this reference month
    #[arg(long, short = 'm')]
    pub month: Option<String>,

    /// Only this status (draft, issued, paid, cancelled)
    #[arg(long)]
    pub status: Option<InvoiceStatus>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct InvoiceRef {
    /// Invoice id or id prefix
    pub invoice: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl InvoiceCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;

        match &self.command {
            InvoiceSubCmd::Create(cmd) => cmd.run(&workspace).await,
            InvoiceSubCmd::List(cmd) => cmd.run(&workspace).await,
            InvoiceSubCmd::Show(cmd) => {
                let invoice = workspace.invoice(resolve_invoice(&workspace, &cmd.invoice).await?).await?;
                if !emit(cmd.format, &invoice)? {
                    print_invoice(&workspace, &invoice).await?;
                }
                Ok(())
            }
            InvoiceSubCmd::Issue(cmd) => {
                let id = resolve_invoice(&workspace, &cmd.invoice).await?;
                let invoice = workspace.issue_invoice(id).await?;
                println!("Issued invoice {} ({})", short_id(&invoice.id), format_brl(invoice.amount_cents));
                Ok(())
            }
            InvoiceSubCmd::Pay(cmd) => {
                let id = resolve_invoice(&workspace, &cmd.invoice).await?;
                let invoice = workspace.pay_invoice(id).await?;
                println!("Invoice {} paid", short_id(&invoice.id));
                Ok(())
            }
            InvoiceSubCmd::Cancel(cmd) => {
                let id = resolve_invoice(&workspace, &cmd.invoice).await?;
                let invoice = workspace.cancel_invoice(id).await?;
                println!("Invoice {} cancelled", short_id(&invoice.id));
                Ok(())
            }
        }
    }
}

impl CreateInvoiceCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let subscriber = workspace.subscriber(&self.subscriber).await?;
        let reference = match &self.month {
            Some(raw) => parse_month(raw)?,
            None => ReferenceMonth::of(Local::now().date_naive()),
        };
        let due_date = match &self.due {
            Some(raw) => parse_date(raw)?,
            None => default_due_date(reference),
        };

        let tariff = self.tariff.unwrap_or(workspace.config().default_tariff);
        let mut input = InvoiceInput::for_subscriber(&subscriber, reference, tariff, due_date);
        if let Some(consumption) = self.consumption {
            input.consumption_kwh = consumption;
        }
        if let Some(discount) = self.discount {
            input.discount_pct = discount;
        }
        input.compensated_kwh = match self.compensated {
            Some(compensated) => compensated,
            None => {
                let rateios = workspace.db().list_rateios(None).await?;
                compensated_from_rateios(&rateios, subscriber.id, reference, input.consumption_kwh)
            }
        };

        let invoice = workspace
            .create_invoice(input, self.attach.as_deref())
            .await?;

        println!("Created invoice {} for {} ({})", invoice.id, subscriber.name, reference);
        println!(
            "  {} compensated x R$ {:.4} - {}% = {}",
            kwh(invoice.compensated_kwh),
            invoice.tariff,
            invoice.discount_pct,
            format_brl(invoice.amount_cents)
        );
        println!("  due {}", invoice.due_date.format("%d/%m/%Y"));
        Ok(())
    }
}

impl ListInvoicesCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let subscriber = match &self.subscriber {
            Some(key) => Some(workspace.subscriber(key).await?),
            None => None,
        };
        let reference = self.month.as_deref().map(parse_month).transpose()?;

        let invoices: Vec<Invoice> = workspace
            .db()
            .list_invoices(subscriber.as_ref().map(|s| s.id), reference)
            .await?
            .into_iter()
            .filter(|i| self.status.is_none_or(|s| i.status == s))
            .collect();

        if emit(self.format, &invoices)? {
            return Ok(());
        }

        if invoices.is_empty() {
            println!("No invoices found.");
            return Ok(());
        }

        let subscribers = workspace.db().list_subscribers(None).await?;
        println!(
            "{:<8}  {:<7}  {:<24} {:>12} {:>14}  {:<10}  {}",
            "ID", "MONTH", "SUBSCRIBER", "COMPENSATED", "AMOUNT", "DUE", "STATUS"
        );
        let mut total = 0;
        for i in &invoices {
            let name = subscribers
                .iter()
                .find(|s| s.id == i.subscriber_id)
                .map(|s| s.name.as_str())
                .unwrap_or("?");
            if i.status != InvoiceStatus::Cancelled {
                total += i.amount_cents;
            }
            println!(
                "{:<8}  {:<7}  {:<24} {:>12} {:>14}  {:<10}  {}",
                short_id(&i.id),
                i.reference,
                fit(name, 24),
                kwh(i.compensated_kwh),
                format_brl(i.amount_cents),
                i.due_date.format("%d/%m/%Y"),
                i.status
            );
        }
        println!();
        println!("Total (excluding cancelled): {}", format_brl(total));
        Ok(())
    }
}

async fn print_invoice(workspace: &Workspace, invoice: &Invoice) -> Result<()> {
    let subscriber = workspace.db().get_subscriber(invoice.subscriber_id).await?;

    println!("Invoice {}", invoice.id);
    println!(
        "  subscriber:   {}",
        subscriber.as_ref().map(|s| s.name.as_str()).unwrap_or("(removed)")
    );
    println!("  month:        {}", invoice.reference);
    println!("  consumption:  {}", kwh(invoice.consumption_kwh));
    println!("  compensated:  {}", kwh(invoice.compensated_kwh));
    println!("  tariff:       R$ {:.4}/kWh", invoice.tariff);
    println!("  discount:     {}%", invoice.discount_pct);
    println!("  amount:       {}", format_brl(invoice.amount_cents));
    println!("  due:          {}", invoice.due_date.format("%d/%m/%Y"));
    println!("  status:       {}", invoice.status);
    if let Some(issued_at) = invoice.issued_at {
        println!("  issued:       {}", issued_at.format("%d/%m/%Y %H:%M"));
    }
    if let Some(key) = &invoice.attachment {
        let store = workspace.attachments();
        let missing = if store.exists(key).await { "" } else { " (missing)" };
        println!("  attachment:   {}{}", store.path_of(key).display(), missing);
    }
    Ok(())
}

/// Accept a full id or a unique prefix of one.
async fn resolve_invoice(workspace: &Workspace, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }
    let prefix = key.trim().to_lowercase();
    if prefix.len() < 4 {
        bail!("Invoice id prefix must have at least 4 characters");
    }
    let matches: Vec<Uuid> = workspace
        .db()
        .list_invoices(None, None)
        .await?
        .into_iter()
        .map(|i| i.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches[..] {
        [id] => Ok(id),
        [] => bail!("No invoice matches '{}'", key),
        _ => bail!("{} invoices match '{}'; use more characters", matches.len(), key),
    }
}

pub(crate) fn parse_month(raw: &str) -> Result<ReferenceMonth> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid month '{}': {}", raw, e))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .with_context(|| format!("Invalid date '{}'", raw))
}

/// The 10th of the month after `reference`.
fn default_due_date(reference: ReferenceMonth) -> NaiveDate {
    let (year, month) = if reference.month == 12 {
        (reference.year + 1, 1)
    } else {
        (reference.year, reference.month + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 10).unwrap_or_else(|| reference.first_day())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_due_date() {
        let dec = ReferenceMonth::new(2024, 12).unwrap();
        assert_eq!(default_due_date(dec), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());

        let mar = ReferenceMonth::new(2024, 3).unwrap();
        assert_eq!(default_due_date(mar), NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        assert_eq!(parse_date("10/04/2024").unwrap(), expected);
        assert_eq!(parse_date("2024-04-10").unwrap(), expected);
        assert!(parse_date("10-04-2024").is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("03/2024").unwrap(), ReferenceMonth::new(2024, 3).unwrap());
        assert!(parse_month("2024-13").is_err());
    }
}
