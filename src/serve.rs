//! HTTP interface over a built index.
//!
//! ## Routes
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | Index page: every group with previews |
//! | `GET /gallery/:group_id?page=N` | One page of a group's images |
//! | `GET /image/:image_id/:name` | The image bytes |
//! | `GET /api/groups` | Ordered groups as JSON |
//!
//! Handlers share one `Arc<GroupIndex>` and never mutate it. Paths never
//! appear in URLs: groups and images are addressed by their opaque ids, so
//! a request can only reach files the index already holds.
//!
//! Images are opened on tokio's blocking pool. Plain files are streamed from
//! disk; archive members are extracted whole, since the archive is closed
//! before the response goes out. A file that vanished since indexing answers
//! 404.

use crate::config::{BrowseConfig, ServerConfig};
use crate::discover::Address;
use crate::index::{Group, GroupIndex};
use crate::locate::{self, LocateError, OpenedFile};
use crate::pages::{self, Pagination};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub index: Arc<GroupIndex>,
    pub browse: BrowseConfig,
}

impl AppState {
    pub fn new(index: Arc<GroupIndex>, browse: BrowseConfig) -> Self {
        Self { index, browse }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/gallery/:group_id", get(gallery_handler))
        .route("/image/:image_id/:name", get(image_handler))
        .route("/api/groups", get(groups_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Bind the configured address.
pub async fn bind(server: &ServerConfig) -> Result<TcpListener, ServeError> {
    TcpListener::bind((server.host.as_str(), server.port))
        .await
        .map_err(|source| ServeError::Bind {
            addr: format!("{}:{}", server.host, server.port),
            source,
        })
}

/// Serve until Ctrl-C.
pub async fn run(listener: TcpListener, state: AppState) -> Result<(), ServeError> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    /// Requested page, 1-based. Missing or unparseable values mean page 1.
    fn requested(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::render_index(&state.index, &state.browse).into_string())
}

async fn gallery_handler(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(group) = state.index.group_by_id(&group_id) else {
        return not_found("Gallery");
    };
    let pagination = Pagination::new(group.len(), state.browse.page_size, query.requested());
    Html(pages::render_gallery(group, &pagination).into_string()).into_response()
}

async fn image_handler(
    State(state): State<AppState>,
    Path((image_id, _name)): Path<(String, String)>,
) -> Response {
    let Some((_, image)) = state.index.image(&image_id) else {
        return not_found("Image");
    };
    let address = image.address.clone();
    let name = image.name.clone();

    let result = tokio::task::spawn_blocking(move || load_image(&address, &name)).await;
    match result {
        Ok(Ok(Payload::File(opened))) => {
            debug!(image = %image_id, bytes = opened.len, mime = opened.mime, "streaming image");
            let headers = [
                (header::CONTENT_TYPE, HeaderValue::from_static(opened.mime)),
                (header::CONTENT_LENGTH, HeaderValue::from(opened.len)),
            ];
            let stream = ReaderStream::new(tokio::fs::File::from_std(opened.file));
            (headers, Body::from_stream(stream)).into_response()
        }
        Ok(Ok(Payload::Bytes { bytes, mime })) => {
            debug!(image = %image_id, bytes = bytes.len(), mime, "serving archive member");
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        Ok(Err(err)) => {
            warn!("indexed image no longer available: {err}");
            not_found("Image")
        }
        Err(err) => {
            error!("image read task failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

enum Payload {
    File(OpenedFile),
    Bytes { bytes: Vec<u8>, mime: &'static str },
}

fn load_image(address: &Address, name: &str) -> Result<Payload, LocateError> {
    match address {
        Address::File { path } => locate::open_file(path, name).map(Payload::File),
        Address::Member { .. } => {
            let bytes = locate::read_all(address)?;
            let mime = locate::content_type(&bytes, name);
            Ok(Payload::Bytes { bytes, mime })
        }
    }
}

async fn groups_handler(State(state): State<AppState>) -> Json<Vec<Group>> {
    Json(state.index.groups().to_vec())
}

async fn not_found_handler() -> Response {
    not_found("Page")
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::render_not_found(what).into_string()),
    )
        .into_response()
}
