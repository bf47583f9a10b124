//! Init command - create a workspace in the current project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::local::{self, LocalConfig, Workspace};

#[derive(Args)]
pub struct InitCmd {
    /// Directory to create the workspace in (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

impl InitCmd {
    pub async fn run(&self) -> Result<()> {
        let dir = self.path.join(local::WORKSPACE_DIR_NAME);

        if let Some(existing) = local::find_workspace_root(&self.path) {
            if existing != dir {
                println!("Note: a parent workspace exists at {}", existing.display());
            }
        }

        if dir.exists() {
            println!("Workspace already initialized: {}", dir.display());
        } else {
            std::fs::create_dir_all(&dir).context("Failed to create .rateio directory")?;
            println!("Created {}", dir.display());
        }

        let config = LocalConfig::load()?;
        let workspace = Workspace::open(&dir, config).await?;

        let subscribers = workspace.db().list_subscribers(None).await?.len();
        let generators = workspace.db().list_generators().await?.len();
        println!("Subscribers: {}", subscribers);
        println!("Generators:  {}", generators);

        if generators == 0 {
            println!();
            println!("Next steps:");
            println!("  rateio generator add --interactive");
            println!("  rateio subscriber add --interactive");
            println!("  rateio rateio preview <generator> --subscriber <uc> ...");
        }

        Ok(())
    }
}
