use std::io::Write;

use chanstore_core::storage::{StorageError, StorageProvider};
use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;

use crate::cli::{AuthCommand, SettingsCommand};

const PROBE_CHANNEL: &str = "chanstore-health-probe";

/// Execute an auth subcommand against the given store.
pub async fn handle_auth<S: StorageProvider>(
    cmd: AuthCommand,
    store: &S,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        AuthCommand::Put {
            credentials_key,
            tokens,
        } => {
            store.store_auth_tokens(&credentials_key, &tokens).await?;
            writeln!(out, "Stored tokens for {credentials_key}")?;
        }
        AuthCommand::Get { key, channel } => {
            let tokens = match (key, channel) {
                (Some(key), _) => store.get_auth_tokens_by_credentials_key(&key).await?,
                (None, Some(channel)) => store.get_auth_tokens_by_channel_label(&channel).await?,
                (None, None) => color_eyre::eyre::bail!("pass --key or --channel"),
            };
            match tokens {
                Some(tokens) => print_json(out, &tokens)?,
                None => writeln!(out, "No tokens found.")?,
            }
        }
    }
    Ok(())
}

/// Execute a settings subcommand against the given store.
pub async fn handle_settings<S: StorageProvider>(
    cmd: SettingsCommand,
    store: &S,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        SettingsCommand::Subscribe {
            channel_label,
            credentials_key,
            settings,
        } => {
            let count = store
                .store_user_settings(&channel_label, &settings, &credentials_key)
                .await?;
            writeln!(out, "{channel_label}: {count} subscriber(s)")?;
        }
        SettingsCommand::Unsubscribe { channel_label } => {
            match store.remove_user_settings(&channel_label).await? {
                None => writeln!(out, "{channel_label}: no settings stored")?,
                Some(0) => writeln!(out, "{channel_label}: last subscriber gone, settings removed")?,
                Some(count) => writeln!(out, "{channel_label}: {count} subscriber(s)")?,
            }
        }
        SettingsCommand::Show { channel_label } => {
            let view = store.get_user_settings(&channel_label).await?;
            print_json(out, &view)?;
        }
        SettingsCommand::List => {
            let views = store.get_all_user_settings().await?;
            if views.is_empty() {
                writeln!(out, "No channel settings stored.")?;
                return Ok(());
            }
            print_json(out, &views)?;
        }
    }
    Ok(())
}

/// Subscribe and unsubscribe a probe channel, checking the count comes back down.
pub async fn run_store_health<S: StorageProvider>(store: &S) -> Result<()> {
    let subscribed = store
        .store_user_settings(PROBE_CHANNEL, &Value::Null, PROBE_CHANNEL)
        .await?;
    let view = store.get_user_settings(PROBE_CHANNEL).await?;
    let remaining = store.remove_user_settings(PROBE_CHANNEL).await?;

    if view.channel_label != PROBE_CHANNEL || remaining != Some(subscribed - 1) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    if remaining == Some(0) {
        match store.get_user_settings(PROBE_CHANNEL).await {
            Err(StorageError::NotFound { .. }) => {}
            Ok(_) => color_eyre::eyre::bail!("probe settings survived the last unsubscribe"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    writeln!(out, "{body}")?;
    Ok(())
}
