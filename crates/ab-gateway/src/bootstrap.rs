//! Wires every piece together: restores sessions, builds the runtime and
//! launcher, assembles the axum router with its CORS/rate-limit/concurrency
//! layers, and drives the background ticks (policy watchdog, daemon-state
//! heartbeat) for the lifetime of the process. Startup order follows
//! launcher → registry → bridge: the repository is restored before the
//! launcher or any socket can be registered against it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use ab_domain::config::{Config, ConfigSeverity, CorsConfig, StorageBackend};
use ab_runtime::{DomainEventBus, SessionRuntime};
use ab_sessions::storage::{FileStorage, MemoryStorage, SessionStorage};
use ab_sessions::SessionRepository;

use crate::auth::hash_token;
use crate::daemon_state::DaemonStateFile;
use crate::launcher::Launcher;
use crate::policies_runner::PoliciesRunner;
use crate::socket_registry::SocketRegistry;
use crate::state::AppState;
use crate::{admin, ws};

pub async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("agentbrokerd starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let storage: Arc<dyn SessionStorage> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::default()),
        StorageBackend::File => Arc::new(
            FileStorage::new(config.storage.state_dir.clone()).context("initializing file-backed session storage")?,
        ),
    };
    let repo = Arc::new(SessionRepository::new(storage));
    let restored = repo.restore(config.sessions.history_capacity).context("restoring sessions")?;
    tracing::info!(restored, "sessions restored from storage");

    let event_bus = Arc::new(DomainEventBus::default());
    let runtime = Arc::new(SessionRuntime::with_process_log_capacity(
        repo.clone(),
        event_bus.clone(),
        config.sessions.process_log_capacity,
    ));
    let sockets = Arc::new(SocketRegistry::new(Duration::from_millis(config.launcher.socket_registry_timeout_ms)));

    let launcher_command = config
        .launcher
        .command_templates
        .get("claude_sdk_url")
        .cloned()
        .unwrap_or_default();
    let launcher = Arc::new(Launcher::new(
        repo.clone(),
        runtime.clone(),
        sockets.clone(),
        launcher_command,
        config.server.port,
        config.launcher.max_sessions,
    ));

    let admin_token_hash = admin_token(&config).map(Arc::new);
    let api_token_hash = std::env::var("AGENTBROKER_API_TOKEN").ok().map(|t| Arc::new(hash_token(&t)));

    let state = AppState {
        config: config.clone(),
        repo: repo.clone(),
        runtime: runtime.clone(),
        event_bus,
        sockets,
        launcher: launcher.clone(),
        http: reqwest::Client::new(),
        admin_token_hash,
        api_token_hash,
        started_at: chrono::Utc::now(),
    };

    let daemon_state_file = Arc::new(DaemonStateFile::new(config.storage.state_dir.clone()));
    write_daemon_state(&daemon_state_file, &config, &state)?;

    {
        let daemon_state_file = daemon_state_file.clone();
        let config = config.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(15));
            loop {
                interval.tick().await;
                if let Err(e) = write_daemon_state(&daemon_state_file, &config, &state) {
                    tracing::warn!(error = %e, "daemon state heartbeat write failed");
                }
            }
        });
    }

    {
        let policies = Arc::new(PoliciesRunner::new(
            repo.clone(),
            runtime.clone(),
            launcher.clone(),
            Duration::from_millis(config.sessions.reconnect_grace_ms),
            Duration::from_millis(config.sessions.idle_timeout_ms),
        ));
        tokio::spawn(policies.run_forever(Duration::from_secs(5)));
    }

    let cors_layer = build_cors_layer(&config.server.cors);

    let max_concurrent = std::env::var("AGENTBROKER_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);

    let governor_layer = config.server.rate_limit.as_ref().map(|rl| {
        use tower_governor::governor::GovernorConfigBuilder;
        use tower_governor::GovernorLayer;

        let gov_config = GovernorConfigBuilder::default()
            .per_second(rl.requests_per_second)
            .burst_size(rl.burst_size)
            .finish()
            .expect("rate_limit: requests_per_second and burst_size must be > 0");

        tracing::info!(requests_per_second = rl.requests_per_second, burst_size = rl.burst_size, "per-IP rate limiting enabled");

        GovernorLayer { config: Arc::new(gov_config) }
    });
    if governor_layer.is_none() {
        tracing::info!("per-IP rate limiting disabled (no [server.rate_limit] in config)");
    }

    let router: Router<AppState> = Router::new()
        .merge(admin::router())
        .merge(ws::router())
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent));
    let app = if let Some(gov) = governor_layer {
        router.layer(gov).with_state(state)
    } else {
        router.with_state(state)
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "agentbrokerd listening");

    let serve_result = axum::serve(listener, app).await.context("axum server error");

    let _ = daemon_state_file.remove();
    serve_result
}

fn admin_token(config: &Config) -> Option<Vec<u8>> {
    std::env::var(&config.server.admin_token_env).ok().map(|t| hash_token(&t))
}

fn write_daemon_state(file: &DaemonStateFile, config: &Config, state: &AppState) -> anyhow::Result<()> {
    let control_api_token = state
        .api_token_hash
        .as_ref()
        .map(|h| hex::encode(h.as_slice()))
        .unwrap_or_default();
    let daemon_state = ab_domain::DaemonState {
        pid: std::process::id(),
        port: config.server.port,
        heartbeat: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        control_api_token,
    };
    file.write(&daemon_state).context("writing daemon state file")
}

/// Origins may carry a trailing `*` wildcard for the port segment (e.g.
/// `http://localhost:*`), expanded into a predicate matching any port on
/// that host. A literal `"*"` allows all origins.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            // Validate the remainder is digits-only to prevent a prefix bypass
            // (e.g. "http://localhost:3000.evil.com" matching "http://localhost:*").
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
