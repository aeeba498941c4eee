use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "motd",
    about = "Message of the day: show, schedule and audit the banner message",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store settings file (TOML). Defaults apply if it does not exist.
    #[arg(short, long, global = true, default_value = "motd.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the stored configuration and message
    Show(ShowArgs),
    /// Show the message that is currently displayed, if any
    Active(ActiveArgs),
    /// Replace the message
    Set(SetArgs),
    /// Show the update history
    Log(LogArgs),
}

#[derive(Args)]
pub struct ShowArgs {}

#[derive(Args)]
pub struct ActiveArgs {
    /// Evaluate at this time (yyyyMMdd:HHmm) instead of now
    #[arg(long, value_parser = parse_when)]
    pub at: Option<NaiveDateTime>,
}

#[derive(Args)]
pub struct SetArgs {
    /// Message body (HTML)
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub message: Option<String>,
    /// Read the message body from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Expiry (yyyyMMdd:HHmm); required unless already configured
    #[arg(short, long, value_parser = parse_when)]
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

fn parse_when(value: &str) -> Result<NaiveDateTime, String> {
    motd_config::parse_timestamp(value).map_err(|e| e.to_string())
}
