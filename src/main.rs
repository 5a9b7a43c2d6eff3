use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use ytdetox::config::Config;
use ytdetox::output::terminal;
use ytdetox::pipeline::{ModerationCoordinator, ModerationError};
use ytdetox::session::{storage, Credential, Session};
use ytdetox::toxicity::ToxicityClassifier;
use ytdetox::youtube::oauth::{new_state, Callback, OAuthClient};
use ytdetox::youtube::{ApiError, Entity, YouTubeApi, YouTubeClient};

/// ytdetox: Toxic comment moderation for your own YouTube videos.
///
/// Pulls every comment on a video, classifies each one against six toxicity
/// labels with a local BERT model, and can reject the flagged ones in bulk.
#[derive(Parser)]
#[command(name = "ytdetox", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize ytdetox against your YouTube account
    Login {
        /// Authorization code (or the full redirect URL) from the consent page
        #[arg(long)]
        code: Option<String>,
    },

    /// Forget the stored credential
    Logout,

    /// Revoke the stored token at Google, then forget it
    Revoke,

    /// Show your channel
    Channel,

    /// List your most recent uploads
    Videos {
        /// How many uploads to show, 1 to 50 (default: 3)
        #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=50))]
        limit: u32,
    },

    /// Classify every comment on a video
    Analyze {
        /// The video id (e.g. dQw4w9WgXcQ)
        video_id: String,

        /// Reject the flagged comments after analysis
        #[arg(long)]
        reject: bool,
    },

    /// Download the tokenizer and the toxicity model
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ytdetox=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Login { code } => {
            config.require_oauth()?;
            let oauth = oauth_client(&config)?;

            let (input, expected_state) = match code {
                Some(code) => (code, None),
                None => {
                    let state = new_state();
                    let url = oauth.authorization_url(&state)?;
                    println!("Open this URL in your browser and grant access:\n");
                    println!("  {}\n", url.cyan());
                    let input = prompt("Paste the code (or the whole redirect URL): ")?;
                    (input, Some(state))
                }
            };
            let callback = Callback::parse(&input)?;
            callback.verify_state(expected_state.as_deref())?;

            let credential = match oauth.exchange_code(&callback.code).await {
                Ok(c) => c,
                Err(e) => return Err(api_failure(e)),
            };
            storage::save(&config.credentials_path, &credential)?;
            println!(
                "{} Signed in. Credential saved to {}",
                "ok".green().bold(),
                config.credentials_path.display()
            );
            if credential.refresh_token.is_none() {
                println!(
                    "{}",
                    "No refresh token was issued; you will need to log in again when it expires."
                        .yellow()
                );
            }
        }

        Commands::Logout => {
            storage::remove(&config.credentials_path)?;
            println!("Signed out.");
        }

        Commands::Revoke => {
            config.require_oauth()?;
            let credential = load_credential(&config.credentials_path)?;
            let oauth = oauth_client(&config)?;
            // Revoking the refresh token also kills the access tokens minted from it
            let token = credential
                .refresh_token
                .as_deref()
                .unwrap_or(&credential.access_token);
            match oauth.revoke(token).await {
                Ok(()) => {
                    storage::remove(&config.credentials_path)?;
                    println!("Access revoked and credential removed.");
                }
                Err(e) => {
                    warn!(error = %e, "Revocation failed, keeping local credential");
                    return Err(api_failure(e));
                }
            }
        }

        Commands::Channel => {
            let (session, before) = open_session(&config)?;
            let api = youtube_client(&config)?;

            let result = session
                .call(|credential| {
                    let api = &api;
                    async move { api.fetch_channel(&credential).await }
                })
                .await;
            persist_if_refreshed(&config, &session, &before).await?;

            match result {
                Ok(channel) => terminal::display_channel(&channel),
                Err(e) if e.is_not_found(Entity::Channel) => {
                    println!("This account has no YouTube channel yet.");
                }
                Err(e) => return Err(api_failure(e)),
            }
        }

        Commands::Videos { limit } => {
            let (session, before) = open_session(&config)?;
            let api = youtube_client(&config)?;

            let result = session
                .call(|credential| {
                    let api = &api;
                    async move { api.fetch_recent_videos(&credential, limit).await }
                })
                .await;
            persist_if_refreshed(&config, &session, &before).await?;

            match result {
                Ok(videos) => terminal::display_videos(&videos),
                Err(e) if e.is_not_found(Entity::Video) => {
                    println!("No uploads on this channel yet.");
                }
                Err(e) => return Err(api_failure(e)),
            }
        }

        Commands::Analyze { video_id, reject } => {
            config.require_model()?;
            let (session, before) = open_session(&config)?;
            let api = youtube_client(&config)?;
            let classifier = ToxicityClassifier::onnx(&config.model_dir);
            let coordinator = ModerationCoordinator::new(&api, &classifier);

            println!("Fetching and classifying comments on {video_id}...");
            let analysis = coordinator.ingest_and_classify(&session, &video_id).await;
            persist_if_refreshed(&config, &session, &before).await?;

            let report = match analysis {
                Ok(report) => report,
                Err(ModerationError::Api(e)) => return Err(api_failure(e)),
                Err(ModerationError::Classification(e)) => {
                    return Err(e.context("Toxicity classification failed"))
                }
            };
            terminal::display_report(&report);

            let Some(batch) = report.moderation_batch() else {
                return Ok(());
            };
            if !reject {
                println!(
                    "{}",
                    format!(
                        "Re-run with --reject to reject these {} comments.",
                        batch.len()
                    )
                    .dimmed()
                );
                return Ok(());
            }

            let before = session.current().await.ok();
            let result = coordinator.reject_comments(&session, &batch).await;
            if let Some(before) = before {
                persist_if_refreshed(&config, &session, &before).await?;
            }
            match result {
                Ok(()) => println!(
                    "{} Rejected {} comments on {}.",
                    "ok".green().bold(),
                    batch.len(),
                    batch.video_id()
                ),
                Err(e) => return Err(api_failure(e)),
            }
        }

        Commands::DownloadModel => {
            let model_dir = &config.model_dir;

            println!("Downloading toxicity model...");
            println!("  Destination: {}", model_dir.display());

            ytdetox::toxicity::download::download_model(model_dir, config.model_url.as_deref())
                .await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `ytdetox analyze <VIDEO_ID>`.");
        }
    }

    Ok(())
}

fn oauth_client(config: &Config) -> Result<OAuthClient> {
    OAuthClient::new(
        &config.client_id,
        &config.client_secret,
        &config.redirect_uri,
        config.http_timeout,
    )
}

fn youtube_client(config: &Config) -> Result<YouTubeClient> {
    YouTubeClient::new(&config.api_url, config.api_key.clone(), config.http_timeout)
}

fn load_credential(path: &Path) -> Result<Credential> {
    storage::load(path)?.context("Not signed in. Run `ytdetox login` first.")
}

/// Session over the stored credential, plus a snapshot of that credential so
/// the caller can tell whether a refresh happened.
fn open_session(config: &Config) -> Result<(Session, Credential)> {
    config.require_oauth()?;
    let credential = load_credential(&config.credentials_path)?;
    let refresher = Arc::new(oauth_client(config)?);
    Ok((Session::new(credential.clone(), refresher), credential))
}

/// Rewrite the credential file when the session refreshed the token.
async fn persist_if_refreshed(config: &Config, session: &Session, before: &Credential) -> Result<()> {
    if let Ok(current) = session.current().await {
        if &current != before {
            storage::save(&config.credentials_path, &current)?;
            info!("Stored refreshed credential");
        }
    }
    Ok(())
}

/// Turn a classified API failure into the message the user acts on.
fn api_failure(e: ApiError) -> anyhow::Error {
    match e {
        ApiError::QuotaExceeded => anyhow::anyhow!(
            "YouTube API quota exceeded or service unavailable. Try again later."
        ),
        ApiError::AccessTokenExpired => anyhow::anyhow!(
            "Your YouTube authorization has expired. Run `ytdetox login` again."
        ),
        ApiError::EntityNotFound { entity, message } => {
            anyhow::anyhow!("No {entity} found: {message}")
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}
