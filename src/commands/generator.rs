//! Generator commands - register and maintain solar plants.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use tracing::warn;

use crate::forms::{FormState, GeneratorForm, Wizard};
use crate::local::Workspace;
use crate::lookup::LookupClients;
use crate::types::{EntityStatus, Generator};

use super::output::{OutputFormat, emit, fit, kwh, short_id};
use super::prompt::run_wizard;

#[derive(Args)]
pub struct GeneratorCmd {
    #[command(subcommand)]
    pub command: GeneratorSubCmd,
}

#[derive(Subcommand)]
pub enum GeneratorSubCmd {
    /// Register a generator
    Add(AddGeneratorCmd),

    /// List generators
    List(ListGeneratorsCmd),

    /// Show one generator and its recent rateios
    Show(ShowGeneratorCmd),

    /// Update the projected monthly generation
    SetGeneration(SetGenerationCmd),

    /// Activate or deactivate a generator
    SetStatus(SetGeneratorStatusCmd),
}

#[derive(Args)]
pub struct AddGeneratorCmd {
    /// Walk through the registration steps interactively
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Fill owner and address from the CNPJ and CEP registries
    #[arg(long)]
    pub lookup: bool,

    #[arg(long)]
    pub nickname: Option<String>,

    #[arg(long)]
    pub owner_name: Option<String>,

    /// Owner CPF or CNPJ
    #[arg(long)]
    pub owner_document: Option<String>,

    /// Installed capacity in kWp
    #[arg(long)]
    pub capacity: Option<String>,

    /// Projected monthly generation in kWh
    #[arg(long)]
    pub generation: Option<String>,

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

    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub admin_name: Option<String>,

    #[arg(long)]
    pub admin_document: Option<String>,

    #[arg(long)]
    pub admin_email: Option<String>,

    #[arg(long)]
    pub admin_phone: Option<String>,

    /// Consumer unit (UC) number of the plant
    #[arg(long)]
    pub uc: Option<String>,

    #[arg(long)]
    pub concessionaria: Option<String>,

    #[arg(long)]
    pub holder_name: Option<String>,

    #[arg(long)]
    pub holder_document: Option<String>,
}

#[derive(Args)]
pub struct ListGeneratorsCmd {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ShowGeneratorCmd {
    /// Generator id, UC or nickname
    pub generator: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct SetGenerationCmd {
    /// Generator id, UC or nickname
    pub generator: String,

    /// Projected monthly generation in kWh
    pub kwh: f64,
}

#[derive(Args)]
pub struct SetGeneratorStatusCmd {
    /// Generator id, UC or nickname
    pub generator: String,

    #[arg(value_enum)]
    pub status: EntityStatus,
}

impl GeneratorCmd {
    pub async fn run(&self) -> Result<()> {
        let workspace = Workspace::open_current().await?;

        match &self.command {
            GeneratorSubCmd::Add(cmd) => cmd.run(&workspace).await,
            GeneratorSubCmd::List(cmd) => cmd.run(&workspace).await,
            GeneratorSubCmd::Show(cmd) => cmd.run(&workspace).await,
            GeneratorSubCmd::SetGeneration(cmd) => {
                if !(cmd.kwh >= 0.0 && cmd.kwh.is_finite()) {
                    bail!("Generation must be a non-negative number of kWh");
                }
                let generator = workspace.generator(&cmd.generator).await?;
                workspace
                    .db()
                    .update_expected_generation(generator.id, cmd.kwh)
                    .await?;
                println!(
                    "{}: {} -> {}",
                    generator.nickname,
                    kwh(generator.expected_generation_kwh),
                    kwh(cmd.kwh)
                );
                Ok(())
            }
            GeneratorSubCmd::SetStatus(cmd) => {
                let generator = workspace.generator(&cmd.generator).await?;
                workspace
                    .db()
                    .set_generator_status(generator.id, cmd.status)
                    .await?;
                println!("{} is now {}", generator.nickname, cmd.status);
                Ok(())
            }
        }
    }
}

impl AddGeneratorCmd {
    fn form(&self) -> Result<GeneratorForm> {
        let mut form = GeneratorForm::default();
        let values = [
            ("nickname", &self.nickname),
            ("owner_name", &self.owner_name),
            ("owner_document", &self.owner_document),
            ("capacity_kwp", &self.capacity),
            ("expected_generation_kwh", &self.generation),
            ("cep", &self.cep),
            ("street", &self.street),
            ("number", &self.number),
            ("complement", &self.complement),
            ("neighborhood", &self.neighborhood),
            ("city", &self.city),
            ("state", &self.state),
            ("admin_name", &self.admin_name),
            ("admin_document", &self.admin_document),
            ("admin_email", &self.admin_email),
            ("admin_phone", &self.admin_phone),
            ("uc", &self.uc),
            ("concessionaria", &self.concessionaria),
            ("holder_name", &self.holder_name),
            ("holder_document", &self.holder_document),
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

        if self.lookup || self.interactive {
            let clients = LookupClients::from_config(workspace.config());
            match form.fill_owner_from_cnpj(&clients.company).await {
                Ok(true) => println!("Owner filled from CNPJ: {}", form.owner_name),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "cnpj lookup failed"),
            }
            match form.fill_address(&clients.address).await {
                Ok(true) => println!("Address filled from CEP {}", form.address.cep),
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

        let generator = form.build()?;
        workspace.register_generator(&generator).await?;

        println!("Registered {} (UC {})", generator.nickname, generator.account.uc);
        println!("  id:         {}", generator.id);
        println!("  generation: {}/month", kwh(generator.expected_generation_kwh));
        Ok(())
    }
}

impl ListGeneratorsCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let generators = workspace.db().list_generators().await?;

        if emit(self.format, &generators)? {
            return Ok(());
        }

        if generators.is_empty() {
            println!("No generators yet. Run `rateio generator add` to register one.");
            return Ok(());
        }

        println!(
            "{:<15} {:<24} {:<24} {:>12} {:>10}  {}",
            "UC", "NICKNAME", "OWNER", "GENERATION", "CAPACITY", "STATUS"
        );
        for g in &generators {
            println!(
                "{:<15} {:<24} {:<24} {:>12} {:>10}  {}",
                g.account.uc,
                fit(&g.nickname, 24),
                fit(&g.owner_name, 24),
                kwh(g.expected_generation_kwh),
                g.capacity_kwp
                    .map(|c| format!("{} kWp", c))
                    .unwrap_or_else(|| "-".to_string()),
                g.status
            );
        }
        Ok(())
    }
}

impl ShowGeneratorCmd {
    async fn run(&self, workspace: &Workspace) -> Result<()> {
        let generator = workspace.generator(&self.generator).await?;

        if emit(self.format, &generator)? {
            return Ok(());
        }

        print_generator(&generator);

        let rateios = workspace.db().list_rateios(Some(generator.id)).await?;
        if !rateios.is_empty() {
            println!();
            println!("Rateios:");
            for r in rateios.iter().take(6) {
                println!(
                    "  {}  {}  {:<10}  {} participants  {}",
                    short_id(&r.id),
                    r.period.format("%d/%m/%Y"),
                    r.kind,
                    r.participants.len(),
                    r.status
                );
            }
        }
        Ok(())
    }
}

fn print_generator(g: &Generator) {
    println!("{}", g.nickname);
    println!("  id:          {}", g.id);
    println!("  owner:       {} ({})", g.owner_name, g.owner_document);
    println!("  address:     {}", g.address.one_line());
    println!(
        "  account:     UC {} at {} ({})",
        g.account.uc, g.account.concessionaria, g.account.holder_name
    );
    if let Some(capacity) = g.capacity_kwp {
        println!("  capacity:    {} kWp", capacity);
    }
    println!("  generation:  {}/month", kwh(g.expected_generation_kwh));
    if let Some(admin) = &g.administrator {
        println!("  admin:       {} ({})", admin.name, admin.document);
        if let Some(email) = &admin.email {
            println!("               {}", email);
        }
    }
    println!("  status:      {}", g.status);
}
