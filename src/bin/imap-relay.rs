#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for relaying messages out of an IMAP mailbox
//!
//! Two subcommands over the same transfer pipeline: `ews` moves
//! unseen messages into an Exchange mailbox and marks them seen;
//! `smtp` forwards flagged messages to a fixed address and clears the
//! flag.

use clap::{Args as ClapArgs, Parser, Subcommand};
use imap_relay::{
    EwsConfig, EwsSink, Folder, Relay, SelectionPolicy, SmtpRelayConfig, SmtpSink, SourceConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "imap-relay")]
#[command(about = "Relay messages from an IMAP mailbox to EWS or an SMTP forwarder")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Be very verbose
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// No logging except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Append log output to this file in addition to stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Transfer unseen messages into an Exchange mailbox via EWS,
    /// marking them seen
    Ews {
        #[command(flatten)]
        source: SourceArgs,

        /// EWS server name, or a full service endpoint URL
        #[arg(long)]
        ews_server: String,

        /// EWS username
        #[arg(long)]
        ews_username: String,

        /// EWS password (or EWS_PASSWORD in the environment / .env)
        #[arg(long)]
        ews_password: Option<String>,

        /// Primary SMTP address of the destination mailbox
        #[arg(long)]
        mailbox_address: String,

        /// Show the destination library's own wire-level logging
        #[arg(long)]
        echo_destination: bool,
    },

    /// Forward flagged messages to a fixed address via an SMTP relay,
    /// clearing the flag
    Smtp {
        #[command(flatten)]
        source: SourceArgs,

        /// SMTP relay host (defaults to the IMAP host)
        #[arg(long)]
        smtp_host: Option<String>,

        /// SMTP relay port
        #[arg(long, default_value_t = 587)]
        smtp_port: u16,

        /// SMTP username (defaults to the IMAP username)
        #[arg(long)]
        smtp_username: Option<String>,

        /// SMTP password (or SMTP_PASSWORD; defaults to the IMAP
        /// password)
        #[arg(long)]
        smtp_password: Option<String>,

        /// Email address to forward to
        #[arg(long)]
        forward_to: String,

        /// Literal inserted into the Subject header of every
        /// forwarded message
        #[arg(long, default_value = "[NOT FOUND]")]
        subject_prefix: String,

        /// Skip certificate verification on the relay's STARTTLS
        #[arg(long)]
        danger_accept_invalid_certs: bool,
    },
}

/// Source mailbox flags shared by both subcommands.
#[derive(ClapArgs)]
struct SourceArgs {
    /// IMAP server name
    #[arg(long)]
    imap_host: String,

    /// IMAP server port
    #[arg(long, default_value_t = 143)]
    imap_port: u16,

    /// IMAP username
    #[arg(long)]
    imap_username: String,

    /// IMAP password (or IMAP_PASSWORD in the environment / .env)
    #[arg(long)]
    imap_password: Option<String>,

    /// Folder to scan, e.g. "INBOX.folder A.sub folder B"; repeat
    /// for multiple folders
    #[arg(long = "folder", default_value = "INBOX")]
    folders: Vec<String>,

    /// Timeout for the initial connection, in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Process every message in the folder, not just the pending
    /// ones
    #[arg(long)]
    all: bool,
}

impl SourceArgs {
    fn into_config(self) -> anyhow::Result<(SourceConfig, Vec<Folder>, bool)> {
        let password = resolve_secret(self.imap_password, "IMAP_PASSWORD")?;
        let config = SourceConfig {
            host: self.imap_host,
            port: self.imap_port,
            username: self.imap_username,
            password,
            timeout: Duration::from_secs(self.timeout),
        };
        let folders = self.folders.into_iter().map(Folder::from).collect();
        Ok((config, folders, self.all))
    }
}

/// A secret comes from its flag, or from the named environment
/// variable (a `.env` file is honored).
fn resolve_secret(flag: Option<String>, env_var: &str) -> anyhow::Result<String> {
    if let Some(value) = flag {
        return Ok(value);
    }
    std::env::var(env_var)
        .map_err(|_| anyhow::anyhow!("missing password: pass the flag or set {env_var}"))
}

/// Build the log filter from the verbosity flags.
///
/// `RUST_LOG` wins when set. Unless destination echo is requested,
/// the destination libraries' own chatter is capped at warn.
fn log_filter(verbose: bool, quiet: bool, echo_destination: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let directives = if echo_destination {
        level.to_string()
    } else {
        format!("{level},reqwest=warn,hyper=warn,hyper_util=warn,lettre=warn")
    };
    EnvFilter::new(directives)
}

fn init_logging(cli: &Cli, echo_destination: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = log_filter(cli.verbose, cli.quiet, echo_destination);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &cli.log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().map_or_else(
                || std::ffi::OsString::from("imap-relay.log"),
                std::ffi::OsStr::to_os_string,
            );
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let echo_destination = matches!(
        &cli.command,
        Command::Ews {
            echo_destination: true,
            ..
        }
    );
    let _log_guard = init_logging(&cli, echo_destination);

    match cli.command {
        Command::Ews {
            source,
            ews_server,
            ews_username,
            ews_password,
            mailbox_address,
            echo_destination: _,
        } => {
            let (source_config, folders, all) = source.into_config()?;
            let policy = SelectionPolicy::MarkSeen { only_unseen: !all };
            let relay = Relay::new(source_config, folders, policy)
                .with_folder_listing(cli.verbose);

            let mut sink = EwsSink::new(EwsConfig {
                server: ews_server,
                username: ews_username,
                password: resolve_secret(ews_password, "EWS_PASSWORD")?,
                mailbox_address,
            });
            relay.run(&mut sink).await?;
        }
        Command::Smtp {
            source,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            forward_to,
            subject_prefix,
            danger_accept_invalid_certs,
        } => {
            let (source_config, folders, all) = source.into_config()?;
            let policy = SelectionPolicy::ClearFlagged { only_flagged: !all };
            let relay = Relay::new(source_config.clone(), folders, policy)
                .with_folder_listing(cli.verbose);

            let mut sink = SmtpSink::new(SmtpRelayConfig {
                host: smtp_host.unwrap_or_else(|| source_config.host.clone()),
                port: smtp_port,
                username: smtp_username.unwrap_or_else(|| source_config.username.clone()),
                password: match smtp_password {
                    Some(value) => value,
                    None => resolve_secret(None, "SMTP_PASSWORD")
                        .unwrap_or_else(|_| source_config.password.clone()),
                },
                forward_to,
                subject_prefix: Some(subject_prefix),
                accept_invalid_certs: danger_accept_invalid_certs,
            });
            relay.run(&mut sink).await?;
        }
    }

    Ok(())
}
