use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// CLI surface for inspecting and maintaining a chanstore directory.
#[derive(Parser, Debug)]
#[command(
    name = "chanstore",
    about = "Inspect and manage channel settings and auth tokens on disk",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Storage directory; overrides `data_dir` from the config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Config file; defaults to `chanstore/config.toml` in the platform config dir.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Subscribe and unsubscribe a probe channel to check the storage directory.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Store or look up auth tokens.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Manage reference-counted channel settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AuthCommand {
    /// Store tokens under a credentials key, replacing any previous tokens.
    Put {
        credentials_key: String,
        /// Tokens as a JSON document.
        #[arg(value_parser = parse_json)]
        tokens: Value,
    },
    /// Print tokens by credentials key or by the channel referencing them.
    Get {
        #[arg(long, conflicts_with = "channel", required_unless_present = "channel")]
        key: Option<String>,
        #[arg(long)]
        channel: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommand {
    /// Add a subscriber to a channel, creating its settings on first use.
    Subscribe {
        channel_label: String,
        credentials_key: String,
        /// Settings as a JSON document; ignored if the channel already exists.
        #[arg(value_parser = parse_json)]
        settings: Value,
    },
    /// Drop a subscriber; the settings are deleted with the last one.
    Unsubscribe { channel_label: String },
    /// Print a channel's settings joined with its tokens.
    Show { channel_label: String },
    /// Print every channel's settings.
    List,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_health_subcommand() {
        let cli = Cli::try_parse_from(["chanstore", "health"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Health);
        assert_eq!(cli.data_dir, None);
    }

    #[test]
    fn parses_global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["chanstore", "settings", "list", "--data-dir", "/tmp/cs"])
            .expect("parse should succeed");
        assert_eq!(cli.command, Command::Settings(SettingsCommand::List));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/cs")));
    }

    #[test]
    fn parses_config_file_flag() {
        let cli = Cli::try_parse_from(["chanstore", "--config", "/etc/cs.toml", "config", "init"])
            .expect("parse should succeed");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/cs.toml")));
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["chanstore", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn parses_json_arguments() {
        let cli = Cli::try_parse_from([
            "chanstore",
            "settings",
            "subscribe",
            "ch1",
            "cred1",
            r#"{"theme":"dark"}"#,
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Settings(SettingsCommand::Subscribe {
                channel_label: "ch1".into(),
                credentials_key: "cred1".into(),
                settings: json!({"theme": "dark"}),
            })
        );
    }

    #[test]
    fn rejects_malformed_json_argument() {
        let result = Cli::try_parse_from(["chanstore", "auth", "put", "cred1", "{oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn auth_get_needs_exactly_one_selector() {
        assert!(Cli::try_parse_from(["chanstore", "auth", "get"]).is_err());
        assert!(
            Cli::try_parse_from(["chanstore", "auth", "get", "--key", "a", "--channel", "b"])
                .is_err()
        );

        let cli = Cli::try_parse_from(["chanstore", "auth", "get", "--channel", "ch1"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Auth(AuthCommand::Get {
                key: None,
                channel: Some("ch1".into()),
            })
        );
    }
}
