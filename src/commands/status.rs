//! Status command - summarize the workspace.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::local::Workspace;
use crate::types::{EntityStatus, InvoiceStatus, RateioStatus, format_brl};

#[derive(Args)]
pub struct StatusCmd;

impl StatusCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;
        let db = workspace.db();

        let subscribers = db.list_subscribers(None).await?;
        let generators = db.list_generators().await?;
        let rateios = db.list_rateios(None).await?;
        let invoices = db.list_invoices(None, None).await?;
        let representatives = db.list_representatives().await?;

        let active_subscribers = subscribers
            .iter()
            .filter(|s| s.status == EntityStatus::Active)
            .count();
        let active_generators = generators.iter().filter(|g| g.is_active()).count();
        let pending = rateios
            .iter()
            .filter(|r| r.status == RateioStatus::Pending)
            .count();
        let open_cents: i64 = invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Issued)
            .map(|i| i.amount_cents)
            .sum();

        let dir = workspace.dir();
        let db_size = get_file_size(&dir.join("db.sqlite"));
        let attachments_size = get_dir_size(&dir.join("attachments"));

        println!("Workspace: {}", dir.display());
        println!();
        println!("Subscribers:      {} ({} active)", subscribers.len(), active_subscribers);
        println!("Generators:       {} ({} active)", generators.len(), active_generators);
        println!("Representatives:  {}", representatives.len());
        println!();
        println!("Rateios:          {} ({} pending)", rateios.len(), pending);
        println!("Invoices:         {}", invoices.len());
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Issued,
            InvoiceStatus::Paid,
            InvoiceStatus::Cancelled,
        ] {
            let count = invoices.iter().filter(|i| i.status == status).count();
            if count > 0 {
                println!("  {:<15} {}", format!("{}:", status), count);
            }
        }
        if open_cents > 0 {
            println!("  open amount:    {}", format_brl(open_cents));
        }
        println!();
        println!("Storage:");
        println!("  Database:     {}", format_size(db_size));
        println!("  Attachments:  {}", format_size(attachments_size));

        Ok(())
    }
}

fn get_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn get_dir_size(path: &Path) -> u64 {
    let mut size = 0;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                size += get_file_size(&path);
            } else if path.is_dir() {
                size += get_dir_size(&path);
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dir_size_recurses() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("invoice/abc")).unwrap();
        std::fs::write(dir.path().join("a"), [0u8; 10]).unwrap();
        std::fs::write(dir.path().join("invoice/abc/b"), [0u8; 5]).unwrap();
        assert_eq!(get_dir_size(dir.path()), 15);
        assert_eq!(get_dir_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
    }
}
