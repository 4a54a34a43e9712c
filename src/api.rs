mod assets;
mod create_school;
pub(crate) mod data_service;
pub(crate) mod db;
pub mod dto;
mod list_facets;
mod list_schools;
pub mod types;

use std::sync::Arc;
use tokio::signal;

use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, DbErr, RuntimeErr};
use serde::Serialize;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, warn};
use utoipa::OpenApi;

use crate::{
    config::Settings,
    monitoring::{health_routes, HealthMonitor},
};

use self::{
    assets::{LocalAssetStore, IMAGE_ROUTE},
    create_school::api_create_school,
    data_service::{SchoolDataService, SchoolStore},
    list_facets::api_list_facets,
    list_schools::api_list_schools,
};

pub(crate) const TAG_SCHOOLS: &str = "schools";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_schools::api_list_schools,
        list_facets::api_list_facets,
        create_school::api_create_school,
    ),
    components(schemas(
        dto::School,
        dto::SchoolsPage,
        dto::SchoolCreated,
        dto::SchoolFacets,
        types::PaginationMeta,
        ErrorBody,
    )),
    tags((name = "schools", description = "School directory")),
)]
pub struct ApiDoc;

#[derive(Clone)]
pub(crate) struct ApiContext {
    store: Arc<dyn SchoolStore>,
    assets: Arc<LocalAssetStore>,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ApiErrors {
    #[error("Internal server error")]
    InternalServerError(Option<String>),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

/// Error payload of every non-2xx API response.
#[derive(Serialize, Debug, utoipa::ToSchema)]
pub(crate) struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}

impl IntoResponse for ApiErrors {
    fn into_response(self) -> Response {
        match self {
            ApiErrors::InternalServerError(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Internal server error", details)),
            )
                .into_response(),
            ApiErrors::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg, None))).into_response()
            }
            ApiErrors::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::new(msg, None))).into_response()
            }
            ApiErrors::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, Json(ErrorBody::new(msg, None))).into_response()
            }
        }
    }
}

impl From<DbErr> for ApiErrors {
    fn from(value: DbErr) -> Self {
        match &value {
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
            | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
                let code: String = e.code().unwrap_or_default().to_string();
                // SQLSTATE class 22: data exception, e.g. a value too long for its column
                if code.starts_with("22") {
                    warn!("Database rejected value, code {}: {}", code, e);
                    return ApiErrors::BadRequest(format!("Invalid field value (code {code})"));
                }
            }
            DbErr::RecordNotFound(t) => return ApiErrors::NotFound(t.clone()),
            _ => {}
        }
        error!("Database error: {:?}", value);
        ApiErrors::InternalServerError(Some(value.to_string()))
    }
}

impl From<validator::ValidationErrors> for ApiErrors {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiErrors::BadRequest(validation_message(&err))
    }
}

/// Joins the messages of all failing fields, ordered by field name.
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<(String, &Vec<validator::ValidationError>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    if messages.is_empty() {
        "Validation error".to_owned()
    } else {
        messages.join("; ")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

pub async fn serve(db: DatabaseConnection, settings: &Settings) -> anyhow::Result<()> {
    let ctx = ApiContext {
        store: Arc::new(SchoolDataService::new(&db)),
        assets: Arc::new(LocalAssetStore::new(&settings.upload_dir)),
    };
    let monitor = Arc::new(HealthMonitor::new(db));
    let app = api_routes(ctx, settings.max_upload_bytes)
        .nest("/app", health_routes(monitor))
        .layer(TraceLayer::new_for_http());

    tracing::debug!("Initializing service...");
    let addr = SocketAddr::new(IpAddr::from_str("::")?, settings.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Cannot start server")?;

    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("error running server")?;

    debug!("Shutdown complete");
    Ok(())
}

fn api_routes(ctx: ApiContext, max_upload_bytes: usize) -> Router {
    let images = ServeDir::new(ctx.assets.dir());

    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/schools", get(api_list_schools).post(api_create_school))
                .route("/schools/facets", get(api_list_facets))
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .with_state(ctx),
        )
        .nest_service(IMAGE_ROUTE, images)
}
