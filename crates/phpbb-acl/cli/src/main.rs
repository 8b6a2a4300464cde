// phpbb-acl
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! phpBB3 ACL CLI Tool
//!
//! Command-line interface for decoding packed phpBB3 permissions and checking
//! user privileges against a board data file.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use phpbb_acl_core::{UserAcl, decode_permissions};
use phpbb_acl_store::{AclService, Driver, StoreConfig, StoreError};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "phpbb-acl")]
#[command(about = "phpBB3 ACL - permission decoder CLI")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file (TOML); defaults to PHPBB3_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the decoded bit row of every forum in a permission blob
    Decode {
        /// File holding the raw `user_permissions` value
        permissions: PathBuf,
    },
    /// Print the global and local option index tables as JSON
    Catalog {
        /// Board data file (JSON with `acl_options` and `users`)
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Check privileges of a user or of a raw permission blob
    Check {
        /// Board data file (JSON with `acl_options` and `users`)
        #[arg(long)]
        data: Option<PathBuf>,
        /// User id to load from the board data
        #[arg(long, conflicts_with = "permissions")]
        user: Option<u32>,
        /// File holding a raw `user_permissions` value
        #[arg(long)]
        permissions: Option<PathBuf>,
        /// Forum id; 0 checks global permissions only
        #[arg(long, default_value_t = 0)]
        forum: u32,
        /// Option names, prefix with `!` to negate
        #[arg(required = true)]
        options: Vec<String>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!(kind = error_kind(&e), "Command failed: {:#}", e);
        process::exit(1);
    }
}

/// Identifier of the storage failure behind `e`, if any
fn error_kind(e: &anyhow::Error) -> &'static str {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .map_or("other", StoreError::error_type)
}

fn run(cli: Cli) -> Result<()> {
    let output = match cli.command {
        Commands::Decode { permissions } => handle_decode(&permissions)?,
        Commands::Catalog { data } => {
            let service = open_service(cli.config.as_deref(), data)?;
            handle_catalog(&service)?
        }
        Commands::Check {
            data,
            user,
            permissions,
            forum,
            options,
        } => {
            let service = open_service(cli.config.as_deref(), data)?;
            handle_check(&service, user, permissions.as_deref(), forum, &options)?
        }
    };

    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::load_from_file(path).with_context(|| format!("reading config {}", path.display())),
        None => Ok(StoreConfig::from_env()?),
    }
}

/// Build the service; `--data` selects the JSON driver over whatever the config says
fn open_service(config_path: Option<&Path>, data: Option<PathBuf>) -> Result<AclService> {
    let mut config = load_config(config_path)?;
    if let Some(data) = data {
        config = config.with_driver(Driver::Json).with_data_file(data);
    }
    Ok(AclService::from_config(config)?)
}

fn read_permissions(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading permissions {}", path.display()))
}

fn handle_decode(path: &Path) -> Result<String> {
    let permissions = decode_permissions(&read_permissions(path)?)?;
    info!("Decoded {} forum rows from {}", permissions.len(), path.display());

    Ok(permissions
        .iter()
        .map(|(forum_id, bits)| format!("{forum_id}\t{bits}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn handle_catalog(service: &AclService) -> Result<String> {
    let table = service.option_index()?;
    Ok(serde_json::to_string_pretty(&table)?)
}

fn handle_check(service: &AclService, user: Option<u32>, permissions: Option<&Path>, forum_id: u32, options: &[String]) -> Result<String> {
    let raw = match (user, permissions) {
        (Some(user_id), _) => service.get_user(user_id)?.with_context(|| format!("user {user_id} not found"))?.user_permissions,
        (None, Some(path)) => read_permissions(path)?,
        (None, None) => bail!("either --user or --permissions is required"),
    };

    let mut acl: UserAcl = service.get_user_acl(&raw)?;
    let mut lines: Vec<String> = options
        .iter()
        .map(|option| format!("{option}\t{}", acl.has_privilege(option, forum_id)))
        .collect();
    lines.push(format!("any\t{}", acl.has_privileges(options, forum_id)));

    info!("Checked {} options in forum {}", options.len(), forum_id);
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BOARD: &str = r#"{
        "acl_options": [
            {"auth_option_id": 1, "auth_option": "m_edit", "is_global": 1, "is_local": 0, "founder_only": 0},
            {"auth_option_id": 2, "auth_option": "m_delete", "is_global": 1, "is_local": 0, "founder_only": 0},
            {"auth_option_id": 3, "auth_option": "f_read", "is_global": 0, "is_local": 1, "founder_only": 0}
        ],
        "users": [{"user_id": 2, "username": "test", "user_permissions": "hra0hs\nhra0hs"}]
    }"#;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    fn service(board: &tempfile::NamedTempFile) -> AclService {
        let config = StoreConfig::default().with_driver(Driver::Json).with_data_file(board.path());
        AclService::from_config(config).unwrap()
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["phpbb-acl", "check", "--data", "board.json", "--user", "2", "--forum", "3", "m_edit", "!f_read"]).unwrap();
        match cli.command {
            Commands::Check { user, forum, options, .. } => {
                assert_eq!(user, Some(2));
                assert_eq!(forum, 3);
                assert_eq!(options, vec!["m_edit", "!f_read"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_user_with_permissions() {
        assert!(Cli::try_parse_from(["phpbb-acl", "check", "--user", "2", "--permissions", "p.txt", "m_edit"]).is_err());
    }

    #[test]
    fn test_decode_output() {
        let file = write_temp("hra0hs\n\n000001");
        let output = handle_decode(file.path()).unwrap();
        assert_eq!(output, format!("0\t1{}\n2\t{}1", "0".repeat(30), "0".repeat(30)));
    }

    #[test]
    fn test_decode_rejects_malformed_blob() {
        let file = write_temp("hra0h$");
        assert!(handle_decode(file.path()).is_err());
    }

    #[test]
    fn test_check_user() {
        let board = write_temp(BOARD);
        let output = handle_check(&service(&board), Some(2), None, 1, &["m_delete".to_string(), "f_read".to_string()]).unwrap();
        assert_eq!(output, "m_delete\tfalse\nf_read\ttrue\nany\ttrue");
    }

    #[test]
    fn test_check_raw_permissions() {
        let board = write_temp(BOARD);
        let permissions = write_temp("000000");
        let output = handle_check(&service(&board), None, Some(permissions.path()), 0, &["!m_edit".to_string()]).unwrap();
        assert_eq!(output, "!m_edit\ttrue\nany\ttrue");
    }

    #[test]
    fn test_check_unknown_user() {
        let board = write_temp(BOARD);
        assert!(handle_check(&service(&board), Some(9), None, 0, &["m_edit".to_string()]).is_err());
        assert!(handle_check(&service(&board), None, None, 0, &["m_edit".to_string()]).is_err());
    }

    #[test]
    fn test_error_kind_sees_through_context() {
        let missing = StoreConfig::default().with_driver(Driver::Json);
        let err = AclService::from_config(missing).context("Failed to open board").unwrap_err();
        assert_eq!(error_kind(&err), "missing_config");

        assert_eq!(error_kind(&anyhow::anyhow!("plain")), "other");
    }

    #[test]
    fn test_catalog_output() {
        let board = write_temp(BOARD);
        let output: serde_json::Value = serde_json::from_str(&handle_catalog(&service(&board)).unwrap()).unwrap();
        assert_eq!(output["global"]["m_delete"], 1);
        assert_eq!(output["local"]["f_read"], 0);
    }
}
