//! Local workspace - self-contained record keeping without a server.
//!
//! Stores everything in a `.rateio/` directory within the project:
//! - `db.sqlite` - subscribers, generators, rateios, invoices, representatives
//! - `attachments/` - rateio spreadsheets and utility bills (content-addressed)

mod config;
mod db;
mod models;
mod storage;
mod workspace;

pub use config::LocalConfig;
pub use workspace::Workspace;

use std::path::{Path, PathBuf};

/// The name of the workspace directory.
pub const WORKSPACE_DIR_NAME: &str = ".rateio";

/// Find the `.rateio/` directory by walking up from the given path.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let dir = current.join(WORKSPACE_DIR_NAME);
        if dir.is_dir() {
            return Some(dir);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Get the workspace directory for the current working directory.
pub fn get_workspace_dir() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| find_workspace_root(&cwd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_workspace_root_walks_up() {
        let dir = tempdir().unwrap();
        let ws = dir.path().join(WORKSPACE_DIR_NAME);
        let nested = dir.path().join("clientes").join("2024");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_workspace_root(&nested), Some(ws));
    }

    #[test]
    fn test_find_workspace_root_none() {
        let dir = tempdir().unwrap();
        assert_eq!(find_workspace_root(dir.path()), None);
    }
}
