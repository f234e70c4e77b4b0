//! wardrobe-closet library - wardrobe catalog service
//!
//! Exposes the metadata store, catalog queries, item lifecycle and outfit
//! suggestion bridge, plus the HTTP router built on top of them.

pub mod api;
pub mod background;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod store;
pub mod stylist;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use wardrobe_common::config::{RootLayout, IMAGE_FOLDER};

use crate::background::BackgroundRemover;
use crate::lifecycle::Closet;
use crate::stylist::Stylist;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Single writer for the metadata table and image folder
    pub closet: Arc<Mutex<Closet>>,
    pub layout: RootLayout,
    pub stylist: Stylist,
    /// Present only when a background removal key is configured
    pub background: Option<Arc<dyn BackgroundRemover>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(closet: Closet, stylist: Stylist) -> Self {
        let layout = closet.layout().clone();
        Self {
            closet: Arc::new(Mutex::new(closet)),
            layout,
            stylist,
            background: None,
            startup_time: Utc::now(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }

    pub fn with_background(mut self, remover: Arc<dyn BackgroundRemover>) -> Self {
        self.background = Some(remover);
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let images = ServeDir::new(state.layout.image_dir());
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::health_routes())
        .merge(api::item_routes())
        .merge(api::suggestion_routes())
        .nest_service(&format!("/{}", IMAGE_FOLDER), images)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
