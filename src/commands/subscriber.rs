//! Subscriber commands - register and inspect energy subscribers.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::warn;

use crate::forms::{FormState, SubscriberForm, Wizard};
use crate::local::Workspace;
use crate::lookup::LookupClients;
use crate::types::{EntityStatus, Subscriber, format_brl};

use super::output::{OutputFormat, emit, fit, kwh};
use super::prompt::run_wizard;

#[derive(Args)]
pub struct SubscriberCmd {
    #[command(subcommand)]
    pub command: SubscriberSubCmd,
}

#[derive(Subcommand)]
pub enum SubscriberSubCmd {
    /// Register a subscriber
    Add(AddSubscriberCmd),

    /// List subscribers
    List(ListSubscribersCmd),

    /// Show one subscriber
    Show(ShowSubscriberCmd),

    /// Activate or deactivate a subscriber
    SetStatus(SetSubscriberStatusCmd),

    /// Delete a subscriber with no rateio or invoice history
    Remove(RemoveSubscriberCmd),
}

#[derive(Args)]
pub struct AddSubscriberCmd {
    /// Walk through the registration steps interactively
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Fill the address from the CEP
    #[arg(long)]
    pub lookup: bool,

    #[arg(long)]
    pub name: Option<String>,

    /// CPF or CNPJ
    #[arg(long)]
    pub document: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub cep: Option<String>,

    #[arg(long)]
    pub street: Option<String>,

    #[arg(long)]
    pub number: Option<String>,

    #[arg(long)]
    pub complement: Option<String>,

    #[arg(long)]
    pub neighborhood: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// Two-letter UF
    #[arg(long)]
    pub state: Option<String>,

    /// Consumer unit (UC) number on the utility bill
    #[arg(long)]
    pub uc: Option<String>,

    /// Utility company, e.g. CEMIG
    #[arg(long)]
    pub concessionaria: Option<String>,

    /// Account holder (defaults to the subscriber)
    #[arg(long)]
    pub holder_name: Option<String>,

    #[arg(long)]
    pub holder_document: Option<String>,

    /// Average monthly consumption in kWh
    #[arg(long)]
    pub consumption: Option<String>,

    /// Credit already accumulated with the utility, in kWh
    #[arg(long)]
    pub credit: Option<String>,

    /// none, one_year or two_years
    #[arg(long)]
    pub fidelidade: Option<String>,

    /// Discount in percent (defaults to the fidelidade tier)
    #[arg(long)]
    pub discount: Option<String>,

    /// Representative id or document
    #[arg(long)]
    pub representative: Option<String>,
}

#[derive(Args)]
pub struct ListSubscribersCmd {
    /// Filter by status
    #[arg(long, short = 's', value_enum)]
    pub status: Option<EntityStatus>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ShowSubscriberCmd {
    /// Subscriber id or UC
    pub subscriber: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct SetSubscriberStatusCmd {
    /// Subscriber id or UC
    pub subscriber: String,

    #[arg(value_enum)]
    pub status: EntityStatus,
}

#[derive(Args)]
pub struct RemoveSubscriberCmd {
    /// Subscriber id or UC
    pub subscriber: String,
}

impl SubscriberCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;

        match &self.command {
            SubscriberSubCmd::Add(cmd) => cmd.run(&workspace).await,
            SubscriberSubCmd::List(cmd) => cmd.run(&workspace).await,
            SubscriberSubCmd::Show(cmd) => cmd.run(&workspace).await,
            SubscriberSubCmd::SetStatus(cmd) => {
                let subscriber = workspace.subscriber(&cmd.subscriber).await?;
                workspace
                    .db()
                    .set_subscriber_status(subscriber.id, cmd.status)
                    .await?;
                println!("{} is now {}", subscriber.name, cmd.status);
                Ok(())
            }
            SubscriberSubCmd::Remove(cmd) => {
                let removed = workspace.remove_subscriber(&cmd.subscriber).await?;
                println!("Removed {} (UC {})", removed.name, removed.account.uc);
                Ok(())
            }
        }
    }
}

impl AddSubscriberCmd {
    fn form(&self) -> Result<SubscriberForm> {
        let mut form = SubscriberForm::default();
        let values = [
            ("name", &self.name),
            ("document", &self.document),
            ("email", &self.email),
            ("phone", &self.phone),
            ("cep", &self.cep),
            ("street", &self.street),
            ("number", &self.number),
            ("complement", &self.complement),
            ("neighborhood", &self.neighborhood),
            ("city", &self.city),
            ("state", &self.state),
            ("uc", &self.uc),
            ("concessionaria", &self.concessionaria),
            ("holder_name", &self.holder_name),
            ("holder_document", &self.holder_document),
            ("consumption_kwh", &self.consumption),
            ("accumulated_credit_kwh", &self.credit),
            ("fidelidade", &self.fidelidade),
            ("discount_pct", &self.discount),
        ];
        for (field, value) in values {
            if let Some(value) = value {
                form.update(field, value)?;
            }
        }
        Ok(form)
    }

    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let mut form = self.form()?;

        if let Some(key) = &self.representative {
            let rep = workspace.representative(key).await?;
            form.update("representative_id", &rep.id.to_string())?;
        }

        if self.lookup || self.interactive {
            let clients = LookupClients::from_config(workspace.config());
            match form.fill_address(&clients.address).await {
                Ok(true) => println!("Address filled from CEP {}", form.address.cep),
                Ok(false) if !form.address.cep.is_empty() => {
                    println!("CEP {} not found, enter the address manually", form.address.cep)
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "cep lookup failed"),
            }
        }

        let form = if self.interactive {
            let mut wizard = Wizard::new(form);
            run_wizard(&mut wizard)?;
            wizard.finish()?
        } else {
            form
        };

        let subscriber = form.build()?;
        workspace.register_subscriber(&subscriber).await?;

        println!("Registered {} (UC {})", subscriber.name, subscriber.account.uc);
        println!("  id:       {}", subscriber.id);
        println!(
            "  plan:     {} ({}% discount)",
            subscriber.fidelidade, subscriber.discount_pct
        );
        Ok(())
    }
}

impl ListSubscribersCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let subscribers = workspace.db().list_subscribers(self.status).await?;

        if emit(self.format, &subscribers)? {
            return Ok(());
        }

        if subscribers.is_empty() {
            println!("No subscribers yet. Run `rateio subscriber add` to register one.");
            return Ok(());
        }

        println!(
            "{:<15} {:<28} {:>12} {:>12} {:>6}  {}",
            "UC", "NAME", "CONSUMPTION", "CREDIT", "DISC", "STATUS"
        );
        for s in &subscribers {
            println!(
                "{:<15} {:<28} {:>12} {:>12} {:>5}%  {}",
                s.account.uc,
                fit(&s.name, 28),
                kwh(s.consumption_kwh),
                kwh(s.accumulated_credit_kwh),
                s.discount_pct,
                s.status
            );
        }
        Ok(())
    }
}

impl ShowSubscriberCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let subscriber = workspace.subscriber(&self.subscriber).await?;

        if emit(self.format, &subscriber)? {
            return Ok(());
        }

        print_subscriber(&subscriber);

        let invoices = workspace
            .db()
            .list_invoices(Some(subscriber.id), None)
            .await?;
        if !invoices.is_empty() {
            println!();
            println!("Invoices:");
            for invoice in invoices.iter().take(6) {
                println!(
                    "  {}  {:>14}  {}",
                    invoice.reference,
                    format_brl(invoice.amount_cents),
                    invoice.status
                );
            }
        }
        Ok(())
    }
}

fn print_subscriber(s: &Subscriber) {
    println!("{}", s.name);
    println!("  id:           {}", s.id);
    println!("  document:     {} {}", s.document.kind().to_uppercase(), s.document);
    if let Some(email) = &s.email {
        println!("  e-mail:       {}", email);
    }
    if let Some(phone) = &s.phone {
        println!("  phone:        {}", phone);
    }
    println!("  address:      {}", s.address.one_line());
    println!(
        "  account:      UC {} at {} ({})",
        s.account.uc, s.account.concessionaria, s.account.holder_name
    );
    println!("  consumption:  {}", kwh(s.consumption_kwh));
    println!("  credit:       {}", kwh(s.accumulated_credit_kwh));
    println!("  plan:         {} ({}% discount)", s.fidelidade, s.discount_pct);
    if let Some(rep) = s.representative_id {
        println!("  representative: {}", rep);
    }
    println!("  status:       {}", s.status);
}
