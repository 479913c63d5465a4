//! HTTP server and handlers.
//!
//! GET /api/health - liveness check.
//! GET /api/test - echo route with a timestamp.
//! Everything else is generated from the variant route tables: each route
//! loads its source table, applies the query-string filter and renders one
//! report.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::api::params::FilterQuery;
use crate::api::reports::{self, Report, ReportContext, ReportOutput};
use crate::api::variants::{VARIANTS, Variant};
use crate::config::ServerConfig;
use crate::state::AppState;

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    for (source, path) in &config.sources {
        log::info!("source '{}' -> {}", source.as_str(), path.display());
    }
    if config.kpi_jitter > 0.0 {
        log::info!("KPI jitter enabled (±{:.1}%)", config.kpi_jitter * 100.0);
    }

    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    log::info!("listening on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
}

/// Build the router for every variant plus the fixed routes.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/test", get(test_handler));

    for variant in VARIANTS {
        for &(route, report) in variant.routes {
            app = app.route(
                &variant.path(route),
                get(
                    move |State(state): State<Arc<AppState>>, Query(query): Query<FilterQuery>| {
                        serve_report(state, variant, report, query)
                    },
                ),
            );
        }
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn test_handler() -> Json<TestResponse> {
    Json(TestResponse {
        message: "Test route working".to_string(),
        timestamp: Local::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
struct TestResponse {
    message: String,
    timestamp: String,
}

/// Load, filter and render off the async runtime.
async fn serve_report(
    state: Arc<AppState>,
    variant: &'static Variant,
    report: Report,
    query: FilterQuery,
) -> Response {
    let spec = query.to_filter_spec(variant.filter_columns);
    let rendered = tokio::task::spawn_blocking(move || {
        let table = state.store.table(variant.source);
        let ctx = ReportContext {
            synthetic: &state.synthetic,
            jitter: &state.jitter,
            now: Local::now(),
            filter_columns: variant.filter_columns,
        };
        reports::render(report, &table, &spec, &ctx)
    })
    .await;

    match rendered {
        Ok(Ok(ReportOutput::Json(body))) => Json(body).into_response(),
        Ok(Ok(ReportOutput::Csv(bytes))) => csv_attachment(variant.export_name, bytes),
        Ok(Err(err)) => ApiError::Render(format!("{err:#}")).into_response(),
        Err(err) => ApiError::Worker(err.to_string()).into_response(),
    }
}

/// CSV body offered as a file download.
fn csv_attachment(filename: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        bytes,
    )
        .into_response()
}

/// Failures that surface as a 500 instead of a report body.
#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("rendering report failed: {0}")]
    Render(String),
    #[error("report worker failed: {0}")]
    Worker(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("{self}");
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
