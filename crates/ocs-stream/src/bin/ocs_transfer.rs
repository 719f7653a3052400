//! ocs-transfer: copy files to and from an ownCloud-style WebDAV server.
//!
//! # Usage
//!
//! ```bash
//! # Download a remote file
//! ocs-transfer --config ocs.toml get Documents/report.pdf report.pdf
//!
//! # Upload from stdin
//! cat notes.txt | OCS_PASSWORD=secret ocs-transfer --config ocs.toml --user alice put - notes.txt
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use ocs_stream::{ClientConfig, Credentials, RemoteFiles, StaticCredentials, StreamSynchronizer};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

const PASSWORD_ENV: &str = "OCS_PASSWORD";

/// Stream files between the local machine and a remote WebDAV store.
#[derive(Parser, Debug)]
#[command(name = "ocs-transfer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Acting user (default: the configured username)
    #[arg(short, long)]
    user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download REMOTE to LOCAL (stdout when omitted or "-")
    Get {
        remote: String,
        local: Option<String>,
    },
    /// Upload LOCAL ("-" for stdin) to REMOTE
    Put {
        local: String,
        remote: String,
        /// Content-Type sent with the upload
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn credentials(config: &ClientConfig, user: Option<&str>) -> anyhow::Result<Credentials> {
    let section = config.credentials.as_ref();
    let username = match (user, section) {
        (Some(user), _) => user.to_string(),
        (None, Some(section)) => section.username.clone(),
        (None, None) => bail!("no user given and no [credentials] section configured"),
    };
    let configured = section
        .filter(|section| section.username == username)
        .and_then(|section| section.password.clone());
    let password = match configured {
        Some(password) => password,
        None => std::env::var(PASSWORD_ENV)
            .with_context(|| format!("no password for '{}'; set {}", username, PASSWORD_ENV))?,
    };
    Ok(Credentials::new(username, password))
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ClientConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let credentials = credentials(&config, args.user.as_deref())?;
    let principal = credentials.username().to_string();

    let synchronizer = StreamSynchronizer::from_config(&config)?;
    let files = RemoteFiles::new(
        synchronizer,
        config,
        StaticCredentials::new().with(credentials),
    );

    match args.command {
        Command::Get { remote, local } => {
            let local = local.unwrap_or_else(|| "-".to_string());
            let bytes = if local == "-" {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                let bytes = files.download_to(&principal, &remote, &mut out)?;
                out.flush()?;
                bytes
            } else {
                let file = File::create(&local).with_context(|| format!("creating {}", local))?;
                let mut out = BufWriter::new(file);
                let bytes = files.download_to(&principal, &remote, &mut out)?;
                out.flush()?;
                bytes
            };
            info!("{} -> {} ({} bytes)", remote, local, bytes);
        }
        Command::Put {
            local,
            remote,
            content_type,
        } => {
            let content_type = content_type.as_deref();
            let bytes = if local == "-" {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                files.upload_from(&principal, &remote, &mut input, content_type)?
            } else {
                let mut input = File::open(&local).with_context(|| format!("opening {}", local))?;
                files.upload_from(&principal, &remote, &mut input, content_type)?
            };
            info!("{} -> {} ({} bytes)", local, remote, bytes);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}
