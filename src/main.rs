// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use beiboot_gateway::{
    backend::KubeClusterBackend,
    errors::GatewayError,
    gateway::ClusterGateway,
    metrics::gather_metrics,
    policy::{KubePolicyStore, PolicyCache},
    settings::Settings,
};
use clap::Parser;
use kube::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let settings = Settings::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("beiboot-gateway")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(settings))
}

async fn async_main(settings: Settings) -> Result<()> {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Beiboot gateway");
    debug!(?settings, "Loaded settings");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let config = settings.gateway_config();
    let timeout = settings.collaborator_timeout();

    let store = Arc::new(KubePolicyStore::new(
        client.clone(),
        settings.policy_location(),
        settings.quota_location(),
        timeout,
    ));
    let cache = Arc::new(PolicyCache::new(
        store,
        &config.default_policy,
        &config.default_group,
        config.quota_defaults,
    ));

    // Startup load is best-effort; missing records fall back to defaults
    let names = settings.warm_up_names();
    let loaded = cache.refresh_all(&names).await;
    info!(
        "Loaded {} policy and quota records for {} names",
        loaded,
        names.len()
    );

    let backend = Arc::new(KubeClusterBackend::new(
        client,
        &settings.cluster_namespace,
        timeout,
    ));
    let gateway = Arc::new(ClusterGateway::new(&config, cache, backend));

    let listener = tokio::net::TcpListener::bind(settings.listen_addr).await?;
    info!("Operations server listening on {}", settings.listen_addr);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Beiboot gateway stopped");
    Ok(())
}

fn router(gateway: Arc<ClusterGateway>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .route("/admin/policies/{name}/refresh", post(refresh_policy))
        .with_state(gateway)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

/// A [`GatewayError`] rendered as a JSON error body.
struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": self.0.to_string(),
            "reason": self.0.kind().as_str(),
        });
        (status, Json(body)).into_response()
    }
}

async fn metrics() -> Response {
    match gather_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn refresh_policy(
    State(gateway): State<Arc<ClusterGateway>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Administrator refresh of policy '{}'", name);
    gateway.refresh_policy(&name).await?;
    Ok(Json(json!({ "refreshed": name })))
}
