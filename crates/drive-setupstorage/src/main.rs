//! drive-setupstorage - authorize Google Drive storage for a server
//!
//! Walks the operator through the OAuth2 consent screen, exchanges the
//! authorization code for a token, and writes the store configuration to
//! `<where>/<domain>/storeconfig`. Deploying the server is the next step.

mod error;
mod setup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::error::{Result, SetupError};

const OAUTH_STATE: &str = "state-token";

/// Set up Google Drive storage: add the storage application to your Drive
/// account and record the resulting OAuth2 token for the server.
#[derive(Parser, Debug)]
#[command(name = "drive-setupstorage", version)]
struct Cli {
    /// Directory to store private configuration files [default: $HOME/upspin/deploy]
    #[arg(long = "where", value_name = "DIR")]
    where_dir: Option<PathBuf>,

    /// Domain name for this installation
    #[arg(long, value_name = "NAME")]
    domain: String,

    /// OAuth2 client ID [default: $DRIVE_CLIENT_ID]
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth2 client secret [default: $DRIVE_CLIENT_SECRET]
    #[arg(long)]
    client_secret: Option<String>,

    /// Redirect URL registered for the OAuth2 client [default: http://127.0.0.1]
    #[arg(long, value_name = "URL")]
    redirect_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("drive-setupstorage: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("drive-setupstorage: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() -> Result<()> {
    let env_filter =
        EnvFilter::from_default_env().add_directive("drive_setupstorage=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut oauth = setup::oauth_config(cli.client_id, cli.client_secret, |key| {
        std::env::var(key).ok()
    })?;
    if let Some(redirect_url) = cli.redirect_url {
        oauth = oauth.with_redirect_url(redirect_url);
    }
    let where_dir = match cli.where_dir {
        Some(dir) => dir,
        None => setup::default_where(std::env::var("HOME").ok())?,
    };

    println!(
        "Open this URL in your browser to obtain an authorization code:\n\t{}",
        oauth.auth_code_url(OAUTH_STATE)
    );
    let code = setup::parse_auth_code(&read_code().await?)?;

    let http = reqwest::Client::builder().build()?;
    let token = oauth.exchange(&http, &code).await?;
    info!(expiry = %token.expiry, "obtained Drive token");

    let path = setup::write_store_config(&where_dir, &cli.domain, &token)?;
    info!(path = %path.display(), "wrote store configuration");

    eprintln!("You should now deploy the server binary and run its setup.");
    Ok(())
}

async fn read_code() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Auth code: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        return Err(SetupError::Config(
            "unable to read authorization code: end of input".to_string(),
        ));
    }
    Ok(line)
}
