//! Storefront API client
//!
//! Command-line client for the storefront REST API:
//! 1. Signs in and keeps the session in a local store
//! 2. Sends API calls through the refresh gate, which attaches the bearer
//!    token and refreshes it once when it expires
//! 3. Answers back-office permission checks for the stored user

mod cli;
mod client;
mod config;
mod error;
mod metrics;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use common::Secret;
use refresh_gate::RefreshGate;
use session_auth::{AuthApi, SessionStore, StorageKey};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Call, Cli, Command};
use crate::client::ApiClient;
use crate::config::Config;
use crate::sink::CliSession;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for API output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let prometheus = if cli.metrics {
        Some(metrics::install_recorder().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        base_url = %config.api.base_url,
        storage = %config.session.storage_path.display(),
        "configuration loaded"
    );

    let outcome = run(&config, cli.route.as_deref(), cli.command).await;

    if let Some(handle) = prometheus {
        eprint!("{}", handle.render());
    }
    outcome
}

async fn run(config: &Config, route: Option<&str>, command: Command) -> Result<()> {
    let timeout = Duration::from_secs(config.api.timeout_secs);
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    let store = Arc::new(
        SessionStore::load(config.session.storage_path.clone())
            .await
            .context("failed to open session store")?,
    );
    let auth = Arc::new(AuthApi::new(http.clone(), config.auth_base_url()));

    match command {
        Command::Login {
            email,
            remember,
            password,
        } => login(&auth, &store, &email, password.into(), remember).await,
        Command::Logout => logout(&auth, &store).await,
        Command::Whoami => whoami(&store).await,
        Command::Can { key, actions } => {
            let tree = config
                .permission_tree()
                .context("failed to load permission tree")?;
            let granted = match store.user_data().await {
                Some(user) => user.permissions().to_vec(),
                None => {
                    warn!("no stored user, every action is denied");
                    Vec::new()
                }
            };
            let access = acl::evaluate(&tree, &key, &actions, &granted);
            for action in actions {
                let verdict = if access.allows(action) { "allowed" } else { "denied" };
                println!("{key} {action}: {verdict}");
            }
            Ok(())
        }
        call => {
            let Some(Call {
                method,
                path,
                body,
                public,
            }) = call.into_call()
            else {
                bail!("command makes no API call");
            };
            let current = route.unwrap_or(&config.session.current_route);
            if !current.starts_with('/') {
                bail!("--route must start with '/', got: {current}");
            }
            let sink = Arc::new(CliSession::new(current));
            let gate = Arc::new(RefreshGate::new(store, auth, sink.clone(), config.routes()));
            let client = ApiClient::new(http, &config.api.base_url, gate, timeout)?;

            let result = client.send(method, &path, body.as_ref(), public).await;
            if let Some(redirect) = sink.take_redirect() {
                eprintln!(
                    "session ended, sign in again: {}",
                    sink::location(&redirect)
                );
            }

            let response = result?;
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            if !response.status.is_success() {
                bail!("API returned {}", response.status);
            }
            Ok(())
        }
    }
}

async fn login(
    auth: &AuthApi,
    store: &SessionStore,
    email: &str,
    password: Secret<String>,
    remember: bool,
) -> Result<()> {
    let response = auth.login(email, &password).await.context("login failed")?;
    store
        .establish(&response, remember)
        .await
        .context("failed to store session")?;
    println!("signed in as {}", response.user.email);
    Ok(())
}

async fn logout(auth: &AuthApi, store: &SessionStore) -> Result<()> {
    if let Some(active) = store.credentials().await.active() {
        // the local session goes regardless of what the server says
        if let Err(e) = auth.logout(&active.token).await {
            warn!(error = %e, "server-side logout failed");
        }
    }
    store.clear_session().await.context("failed to clear session")?;
    store
        .clear(StorageKey::RememberAuth)
        .await
        .context("failed to clear session")?;
    println!("signed out");
    Ok(())
}

async fn whoami(store: &SessionStore) -> Result<()> {
    match store.user_data().await {
        Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
        None if store.credentials().await.active().is_some() => {
            println!("signed in, no stored profile")
        }
        None => println!("not signed in"),
    }
    Ok(())
}
