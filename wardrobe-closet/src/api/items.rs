//! Catalog browsing, item upload and deletion

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wardrobe_common::config::IMAGE_FOLDER;
use wardrobe_common::models::{normalize_separators, TagChoices};
use wardrobe_common::ItemRecord;

use crate::lifecycle::{upload_file_name, NewItem};
use crate::query::{self, Facets, Selection};
use crate::{ApiError, ApiResult, AppState};

/// One row of a catalog listing
#[derive(Debug, Serialize)]
pub struct ListedItem {
    /// Position in the unfiltered catalog; pass back to delete
    pub index: usize,
    #[serde(flatten)]
    pub item: ItemRecord,
    /// Whether the image file is present on disk
    pub exists: bool,
    /// Where the image is served, when it lives under the image folder
    pub image_url: Option<String>,
}

/// GET /api/items response
#[derive(Debug, Serialize)]
pub struct ListItemsResponse {
    pub total: usize,
    pub matched: usize,
    pub items: Vec<ListedItem>,
}

/// POST /api/items response
#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub saved: bool,
    pub item: Option<ItemRecord>,
    pub index: Option<usize>,
}

/// DELETE /api/items/:index query parameters
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Expected image path at `index`; rejects the delete when it moved
    pub image_path: Option<String>,
}

/// DELETE /api/items/:index response
#[derive(Debug, Serialize)]
pub struct DeleteItemResponse {
    pub deleted: bool,
    pub item: Option<ItemRecord>,
    pub remaining: usize,
}

/// GET /api/items
///
/// Lists the catalog, optionally filtered by repeated `color`, `category` and
/// `season` parameters.
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ListItemsResponse>> {
    let selection = Selection::from_pairs(params);
    let catalog = state.closet.lock().await.load()?;

    let items: Vec<ListedItem> = query::filter(&catalog, &selection)
        .into_iter()
        .map(|entry| ListedItem {
            index: entry.index,
            exists: state.layout.resolve(&entry.item.image_path).exists(),
            image_url: image_url(&entry.item.image_path),
            item: entry.item,
        })
        .collect();

    debug!(total = catalog.len(), matched = items.len(), "Catalog listed");

    Ok(Json(ListItemsResponse {
        total: catalog.len(),
        matched: items.len(),
        items,
    }))
}

/// GET /api/facets
pub async fn list_facets(State(state): State<AppState>) -> ApiResult<Json<Facets>> {
    let catalog = state.closet.lock().await.load()?;
    Ok(Json(query::facets(&catalog)))
}

/// GET /api/choices
pub async fn list_choices() -> Json<TagChoices> {
    Json(TagChoices::standard())
}

/// POST /api/items
///
/// Multipart form with `image`, `category`, `color`, `season` and optional
/// `remove_background`. A form without an image saves nothing.
pub async fn add_item(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AddItemResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut tags = NewItem::default();
    let mut remove_background = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload = Some((file_name, bytes.to_vec()));
                }
            }
            "category" => tags.category = field.text().await?.trim().to_string(),
            "color" => tags.color = field.text().await?.trim().to_string(),
            "season" => tags.season = field.text().await?.trim().to_string(),
            "remove_background" => remove_background = is_checked(&field.text().await?),
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    let Some((file_name, bytes)) = upload else {
        debug!("Add requested without an image");
        return Ok(Json(AddItemResponse {
            saved: false,
            item: None,
            index: None,
        }));
    };

    let file_name = upload_file_name(&file_name)?.to_string();
    check_image_type(&bytes)?;

    let (file_name, bytes) = if remove_background {
        let remover = state.background.as_ref().ok_or_else(|| {
            ApiError::BadRequest("Background removal is not configured".to_string())
        })?;
        let processed = remover.remove_background(bytes, &file_name).await?;
        (png_file_name(&file_name), processed)
    } else {
        (file_name, bytes)
    };

    let added = state
        .closet
        .lock()
        .await
        .add(Some(&bytes), &file_name, tags)?;

    Ok(Json(match added {
        Some(added) => AddItemResponse {
            saved: true,
            item: Some(added.record),
            index: Some(added.index),
        },
        None => AddItemResponse {
            saved: false,
            item: None,
            index: None,
        },
    }))
}

/// DELETE /api/items/:index
pub async fn delete_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(params): Query<DeleteQuery>,
) -> ApiResult<Json<DeleteItemResponse>> {
    let closet = state.closet.lock().await;
    let item = closet.delete_checked(index, params.image_path.as_deref())?;
    let remaining = closet.load()?.len();

    if item.is_none() {
        info!(index, "Nothing to delete");
    }

    Ok(Json(DeleteItemResponse {
        deleted: item.is_some(),
        item,
        remaining,
    }))
}

/// Build catalog routes
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/choices", get(list_choices))
        .route("/api/facets", get(list_facets))
        .route("/api/items", get(list_items).post(add_item))
        .route("/api/items/:index", delete(delete_item))
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// Uploads must be PNG or JPEG
fn check_image_type(bytes: &[u8]) -> ApiResult<()> {
    match infer::get(bytes).map(|kind| kind.mime_type()) {
        Some("image/png") | Some("image/jpeg") => Ok(()),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unsupported image type {}; upload a PNG or JPEG",
            other
        ))),
        None => Err(ApiError::BadRequest(
            "Unrecognised image data; upload a PNG or JPEG".to_string(),
        )),
    }
}

/// Background removal always yields PNG
fn png_file_name(file_name: &str) -> String {
    FsPath::new(file_name)
        .with_extension("png")
        .to_string_lossy()
        .into_owned()
}

fn image_url(stored: &str) -> Option<String> {
    let path = normalize_separators(stored);
    let prefix = format!("{}/", IMAGE_FOLDER);
    path.strip_prefix(&prefix)
        .filter(|name| !name.is_empty())
        .map(|name| format!("/{}/{}", IMAGE_FOLDER, name))
}
