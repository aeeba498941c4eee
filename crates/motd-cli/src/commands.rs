use std::fs;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use motd_core::{open_store, ErrorKind, MessageStore, StoreSettings};
use motd_events::ChangeNotifier;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = StoreSettings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    let notifier = ChangeNotifier::new();
    let store = open_store(&settings, &notifier).context("opening message store")?;
    let json = matches!(cli.format, OutputFormat::Json);

    match cli.command {
        Command::Show(_) => cmd_show(store.as_ref(), json),
        Command::Active(args) => cmd_active(store.as_ref(), args, json),
        Command::Set(args) => cmd_set(store.as_ref(), args, json),
        Command::Log(args) => cmd_log(store.as_ref(), args, json),
    }
}

fn cmd_show(store: &dyn MessageStore, json: bool) -> anyhow::Result<()> {
    let snapshot = store.read();
    if json {
        let value = json!({
            "config": snapshot.config,
            "content": snapshot.content,
            "base_version": snapshot.base_version.map(|id| id.to_hex()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("No message configured.");
        return Ok(());
    }
    if let Some(base) = snapshot.base_version {
        println!("Version: {}", base.short_hex().yellow());
    }
    println!("{}", "Configuration:".bold());
    print!("{}", snapshot.config);
    match &snapshot.content {
        Some(content) => {
            println!("{}", "Message:".bold());
            println!("{content}");
        }
        None => println!("{}", "No message content stored.".dimmed()),
    }
    Ok(())
}

fn cmd_active(store: &dyn MessageStore, args: ActiveArgs, json: bool) -> anyhow::Result<()> {
    let now = args.at.unwrap_or_else(|| Local::now().naive_local());
    let active = store.active_message(now);
    if json {
        println!("{}", serde_json::to_string_pretty(&active)?);
        return Ok(());
    }
    match active {
        Some(message) => {
            println!(
                "{} {} (until {})",
                "●".green().bold(),
                message.id.bold(),
                motd_config::format_timestamp(message.expires_at)
            );
            println!("{}", message.html);
        }
        None => println!("No message is active."),
    }
    Ok(())
}

fn cmd_set(store: &dyn MessageStore, args: SetArgs, json: bool) -> anyhow::Result<()> {
    let content = match (&args.message, &args.file) {
        (Some(message), _) => message.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading message from {}", path.display()))?,
        (None, None) => anyhow::bail!("a message or --file is required"),
    };

    let receipt = match store.write(&content, args.expires_at) {
        Ok(receipt) => receipt,
        Err(e) if e.kind() == ErrorKind::Concurrency => {
            return Err(anyhow::Error::new(e)
                .context("the message was changed concurrently; run the command again"));
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        let value = json!({
            "commit": receipt.commit.map(|id| id.to_hex()),
            "parent": receipt.parent.map(|id| id.to_hex()),
            "message_id": receipt.message_id,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("{} Message {} updated", "✓".green().bold(), receipt.message_id.bold());
    if let Some(commit) = receipt.commit {
        match receipt.parent {
            Some(parent) => println!("  {}..{}", parent.short_hex().dimmed(), commit.short_hex().yellow()),
            None => println!("  {} (root)", commit.short_hex().yellow()),
        }
    }
    Ok(())
}

fn cmd_log(store: &dyn MessageStore, args: LogArgs, json: bool) -> anyhow::Result<()> {
    let entries = store.history(args.limit)?;
    if json {
        let value: Vec<_> = entries
            .iter()
            .map(|e| {
                json!({
                    "commit": e.commit.to_hex(),
                    "parent": e.parent.map(|id| id.to_hex()),
                    "author": e.author.to_string(),
                    "message": e.message,
                    "timestamp_ms": e.timestamp_ms,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No history.");
        return Ok(());
    }
    for entry in &entries {
        if args.oneline {
            println!("{} {}", entry.commit.short_hex().yellow(), entry.message);
            continue;
        }
        let when = DateTime::<Utc>::from_timestamp_millis(entry.timestamp_ms)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".into());
        println!("{} {}", "commit".yellow(), entry.commit.to_hex().yellow());
        println!("Author: {}", entry.author);
        println!("Date:   {}", when.dimmed());
        println!("\n    {}\n", entry.message);
    }
    Ok(())
}
