//! Remote Radar Server
//!
//! Crawls a remote-job listing site on a schedule, classifies the new
//! postings, stores the accepted ones and announces them to subscribers.
//!
//! Architecture:
//! - Configuration: TOML file plus environment overrides
//! - Repositories: SQLite access for raw jobs, jobs and subscriptions
//! - Services: Paged listing and subscription validation
//! - API: axum router for listing, refresh, metadata and subscriptions
//! - Scheduler: periodic pipeline cycles, supervised next to the HTTP server

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use radar_client::CompletionClient;
use radar_pipeline::crawl::ListingCrawler;
use radar_pipeline::notify::{
    EmailNotifier, LogNotifier, MailSender, Notifier, SmtpMailer, SubscriptionNotifier,
};
use radar_pipeline::processor::Classifier;
use radar_pipeline::scheduler::Scheduler;
use radar_pipeline::store::SubscriptionSource;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod store;

use crate::api::AppState;
use crate::config::{Config, NotifierDriver};
use crate::service::subscription_service::SubscriptionPolicy;
use crate::store::SqliteStore;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "radar-server")]
#[command(about = "Remote job radar: crawl, classify, notify and serve", long_about = None)]
struct Cli {
    /// Run one pipeline cycle, print the number of created jobs and exit
    #[arg(long)]
    once: bool,

    /// Configuration file (TOML)
    #[arg(long, env = "RADAR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "radar_server=info,radar_pipeline=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    info!("Connecting to database...");

    let pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let scheduler = Arc::new(build_scheduler(&config, store)?);

    if cli.once {
        let created = scheduler.run_once().await.context("Run once failed")?;
        println!("run once finished: created={}", created);
        return Ok(());
    }

    serve(&config, pool, scheduler).await
}

/// Wires the crawler, classifier, stores and notifier into a scheduler
fn build_scheduler(config: &Config, store: Arc<SqliteStore>) -> Result<Scheduler> {
    let crawler = ListingCrawler::new(&config.crawl).context("Failed to build crawler")?;
    let completion =
        CompletionClient::new(config.completion.clone()).context("Failed to build completion client")?;
    let classifier = Classifier::new(config.processor.clone(), Arc::new(completion));

    let scheduler = Scheduler::new(
        Arc::new(crawler),
        store.clone(),
        store.clone(),
        Arc::new(classifier),
        &config.scheduler,
        config.processor.batch_size(),
    );

    info!("Scheduler cadence: {:?}", scheduler.cadence());

    Ok(match build_notifier(config, store)? {
        Some(notifier) => scheduler.with_notifier(notifier),
        None => scheduler,
    })
}

/// Picks the notifier for the configured driver
///
/// Returns `None` when notifications are disabled.
fn build_notifier(
    config: &Config,
    subscriptions: Arc<dyn SubscriptionSource>,
) -> Result<Option<Arc<dyn Notifier>>> {
    let driver = config.notifier_driver().map_err(anyhow::Error::msg)?;

    let by_subscription = || -> Result<SubscriptionNotifier> {
        let mailer = SmtpMailer::new(&config.email).context("Failed to build SMTP mailer")?;
        Ok(subscription_notifier(
            config,
            driver,
            subscriptions.clone(),
            Arc::new(mailer),
        ))
    };

    let notifier: Arc<dyn Notifier> = match driver {
        NotifierDriver::None => {
            info!("Notifications disabled");
            return Ok(None);
        }
        NotifierDriver::Email if !config.email.is_complete() => {
            warn!("Email host or sender not configured, notifications disabled");
            return Ok(None);
        }
        NotifierDriver::Email => Arc::new(by_subscription()?),
        NotifierDriver::Log if config.email.is_complete() => Arc::new(by_subscription()?),
        NotifierDriver::Log => Arc::new(LogNotifier),
    };

    info!("Notifications enabled ({:?})", driver);
    Ok(Some(notifier))
}

/// Mails subscribers through `sender`
///
/// With no subscriptions stored, jobs go to the default `email.to`
/// recipients, or to the log when none are set and the driver is `log`.
fn subscription_notifier(
    config: &Config,
    driver: NotifierDriver,
    subscriptions: Arc<dyn SubscriptionSource>,
    sender: Arc<dyn MailSender>,
) -> SubscriptionNotifier {
    let email = EmailNotifier::new(&config.email, sender);
    let notifier = SubscriptionNotifier::new(subscriptions, email.clone());

    if !config.email.recipients().is_empty() {
        notifier.with_fallback(Arc::new(email))
    } else if driver == NotifierDriver::Log {
        notifier.with_fallback(Arc::new(LogNotifier))
    } else {
        notifier
    }
}

/// Runs the scheduler loop and the HTTP server until a signal arrives or
/// either of them stops
async fn serve(config: &Config, pool: SqlitePool, scheduler: Arc<Scheduler>) -> Result<()> {
    let policy = SubscriptionPolicy::new(
        &config.subscription.allowed_channels,
        &config.processor.tag_candidates,
    );
    let state = AppState {
        pool,
        scheduler: scheduler.clone(),
        meta: Arc::new(config.meta(policy.channels())),
        policy: Arc::new(policy),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    info!("Listening on {}", config.server.bind_addr);

    let cancel = CancellationToken::new();

    let scheduler_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let result = scheduler.run(cancel.clone()).await;
            cancel.cancel();
            result
        }
    });

    let http_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let shutdown = cancel.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            cancel.cancel();
            result
        }
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, http_task).await {
        Ok(joined) => joined
            .context("HTTP server task panicked")?
            .context("HTTP server failed")?,
        Err(_) => warn!("HTTP server did not stop within {:?}", SHUTDOWN_GRACE),
    }

    scheduler_task
        .await
        .context("Scheduler task panicked")?
        .context("Scheduler stopped")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
