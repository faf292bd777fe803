//! Smile Segments — visitor segmentation for the practice website.
//!
//! Command-line front end over a file-backed store: records visitor
//! activity and consent, and prints the chosen segment as JSON.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use smile_analytics::AnalyticsLogger;
use smile_core::config::AppConfig;
use smile_core::event_bus::{noop_sink, EventSink};
use smile_personalization::{Personalizer, ProfileTracker};
use smile_segmentation::{default_segments, load_segments, Segment, SegmentScorer};
use smile_store::{ConsentRepository, ConsentUpdate, FileStore, ProfileRepository};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "smile-segments")]
#[command(about = "Visitor segmentation for the practice website")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "SMILE_SEGMENTS_CONFIG")]
    config: Option<String>,

    /// Storage directory (overrides config)
    #[arg(long, env = "SMILE_SEGMENTS__STORAGE__DIR")]
    store_dir: Option<String>,

    /// Evaluation instant, RFC 3339 (defaults to now)
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured segments
    Segments,
    /// Print a fresh session id
    NewSession,
    /// Score a serialized profile file
    Evaluate {
        #[arg(long)]
        profile: String,
    },
    /// Record visitor activity
    Track {
        #[command(subcommand)]
        event: TrackCommand,
    },
    /// Show or change cookie consent
    Consent {
        #[command(subcommand)]
        action: ConsentCommand,
    },
    /// Choose the segment and copy for a stored session
    Personalize {
        #[arg(long)]
        session: String,
    },
}

#[derive(Subcommand, Debug)]
enum TrackCommand {
    PageView {
        #[arg(long)]
        session: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        referrer: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
    },
    Behavior {
        #[arg(long)]
        session: String,
        #[arg(long)]
        tag: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConsentCommand {
    Show,
    AcceptAll,
    RejectAll,
    Set {
        #[arg(long)]
        analytics: Option<bool>,
        #[arg(long)]
        marketing: Option<bool>,
        #[arg(long)]
        personalization: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smile=info,smile_segments=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(dir) = cli.store_dir {
        config.storage.dir = dir;
    }
    let now = cli.now.unwrap_or_else(Utc::now);

    info!(
        store_dir = %config.storage.dir,
        time_basis = ?config.personalization.time_basis,
        tie_break = ?config.personalization.tie_break,
        "Configuration loaded"
    );

    let store = Arc::new(
        FileStore::open(&config.storage.dir)
            .with_context(|| format!("opening store at {}", config.storage.dir))?,
    );
    let profiles = Arc::new(ProfileRepository::new(
        store.clone(),
        config.storage.profile_key_prefix.clone(),
    ));
    let consent = Arc::new(ConsentRepository::new(
        store,
        config.storage.consent_key.clone(),
        config.storage.consent_version,
    ));

    match cli.command {
        Command::Segments => print_json(&segments(&config)?)?,
        Command::NewSession => print_json(&serde_json::json!({
            "session_id": uuid::Uuid::new_v4().to_string()
        }))?,
        Command::Evaluate { profile } => {
            let raw = std::fs::read_to_string(&profile)
                .with_context(|| format!("reading profile {profile}"))?;
            let personalizer = Personalizer::new(
                scorer(&config)?,
                profiles,
                consent,
                noop_sink(),
                config.personalization.clone(),
            );
            match personalizer.evaluate_stored(&raw, now) {
                Some(segment) => print_json(&segment)?,
                None => print_json(&serde_json::json!({ "personalized": false }))?,
            }
        }
        Command::Track { event } => {
            let tracker = ProfileTracker::new(profiles, consent, &config.personalization);
            let recorded = match event {
                TrackCommand::PageView {
                    session,
                    path,
                    referrer,
                    user_agent,
                } => tracker.record_page_view(
                    &session,
                    &path,
                    referrer.as_deref(),
                    user_agent.as_deref(),
                    now,
                )?,
                TrackCommand::Behavior { session, tag } => {
                    tracker.record_behavior(&session, &tag, now)?
                }
            };
            print_json(&serde_json::json!({ "recorded": recorded }))?;
        }
        Command::Consent { action } => {
            let prefs = match action {
                ConsentCommand::Show => {
                    let prefs = consent.load()?;
                    print_json(&serde_json::json!({
                        "preferences": prefs,
                        "needs_prompt": consent.needs_prompt(),
                    }))?;
                    return Ok(());
                }
                ConsentCommand::AcceptAll => consent.accept_all(now)?,
                ConsentCommand::RejectAll => consent.reject_all(now)?,
                ConsentCommand::Set {
                    analytics,
                    marketing,
                    personalization,
                } => consent.update(
                    &ConsentUpdate {
                        analytics,
                        marketing,
                        personalization,
                    },
                    now,
                )?,
            };
            print_json(&prefs)?;
        }
        Command::Personalize { session } => {
            let analytics = if config.personalization.analytics_enabled {
                Some(Arc::new(AnalyticsLogger::new(&config.analytics)?))
            } else {
                None
            };
            let sink: Arc<dyn EventSink> = match &analytics {
                Some(logger) => logger.clone() as Arc<dyn EventSink>,
                None => noop_sink(),
            };

            let personalizer = Personalizer::new(
                scorer(&config)?,
                profiles,
                consent,
                sink,
                config.personalization.clone(),
            );
            let result = personalizer.personalize(&session, now);
            drop(personalizer);

            match result {
                Some(result) => print_json(&result)?,
                None => print_json(&serde_json::json!({
                    "session_id": session,
                    "personalized": false,
                }))?,
            }

            if let Some(logger) = analytics.and_then(Arc::into_inner) {
                logger.shutdown().await;
            }
        }
    }

    Ok(())
}

fn segments(config: &AppConfig) -> anyhow::Result<Vec<Segment>> {
    match &config.personalization.segments_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading segment definitions {path}"))?;
            Ok(load_segments(&json)?)
        }
        None => Ok(default_segments()),
    }
}

fn scorer(config: &AppConfig) -> anyhow::Result<SegmentScorer> {
    Ok(SegmentScorer::new(segments(config)?, &config.personalization))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
