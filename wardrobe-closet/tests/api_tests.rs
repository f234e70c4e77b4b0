//! Integration tests for wardrobe-closet API endpoints
//!
//! Each test runs the full router against a temporary root folder, with
//! in-process stand-ins for the generative and background removal services.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use wardrobe_closet::background::{BackgroundError, BackgroundRemover};
use wardrobe_closet::lifecycle::Closet;
use wardrobe_closet::stylist::{GenerativeClient, Stylist, StylistError};
use wardrobe_closet::{build_router, AppState};
use wardrobe_common::config::RootLayout;

const BOUNDARY: &str = "wardrobe-test-boundary";

/// Replies with a fixed text
struct FixedReply(Result<String, String>);

#[async_trait]
impl GenerativeClient for FixedReply {
    async fn generate(&self, _prompt: &str) -> Result<String, StylistError> {
        self.0.clone().map_err(StylistError::RequestFailed)
    }
}

/// Returns a fixed white PNG for any input
struct WhiteBackground;

#[async_trait]
impl BackgroundRemover for WhiteBackground {
    async fn remove_background(
        &self,
        _image: Vec<u8>,
        _file_name: &str,
    ) -> Result<Vec<u8>, BackgroundError> {
        Ok(png_bytes(Rgba([255, 255, 255, 255])))
    }
}

/// Test helper: 2x2 PNG of one color
fn png_bytes(color: Rgba<u8>) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, color))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Test helper: Create app over a fresh root folder
fn setup_app(stylist: Stylist) -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let closet = Closet::open(RootLayout::new(dir.path())).unwrap();
    let state = AppState::new(closet, stylist);
    (dir, build_router(state))
}

fn setup_app_with_background() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let closet = Closet::open(RootLayout::new(dir.path())).unwrap();
    let state = AppState::new(closet, Stylist::disabled()).with_background(Arc::new(WhiteBackground));
    (dir, build_router(state))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: multipart add-item request
fn add_request(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/items")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn add_item(app: &Router, file_name: &str, category: &str, color: &str, season: &str) -> Value {
    let image = png_bytes(Rgba([10, 20, 30, 255]));
    let (status, body) = send(
        app,
        add_request(
            &[("category", category), ("color", color), ("season", season)],
            Some((file_name, &image)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "add failed: {}", body);
    body
}

// =============================================================================
// Health and choices
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wardrobe-closet");
    assert!(body["version"].is_string());
    assert_eq!(body["suggestions_enabled"], false);
    assert_eq!(body["background_removal_enabled"], false);
}

#[tokio::test]
async fn test_choices_lists_tag_options() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(&app, test_request("GET", "/api/choices")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["categories"].as_array().unwrap().contains(&json!("Shirts")));
    assert!(body["colors"].as_array().unwrap().contains(&json!("Blue")));
    assert!(body["seasons"].as_array().unwrap().contains(&json!("Summer")));
}

// =============================================================================
// Catalog lifecycle
// =============================================================================

#[tokio::test]
async fn test_empty_catalog_lists_nothing() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(&app, test_request("GET", "/api/items")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["matched"], 0);
    assert_eq!(body["items"], json!([]));

    let (_, facets) = send(&app, test_request("GET", "/api/facets")).await;
    assert_eq!(facets, json!({"colors": [], "categories": [], "seasons": []}));
}

#[tokio::test]
async fn test_add_list_filter_delete_flow() {
    let (dir, app) = setup_app(Stylist::disabled());

    let first = add_item(&app, "shirt.png", "Shirts", "Blue", "Summer").await;
    assert_eq!(first["saved"], true);
    assert_eq!(first["index"], 0);
    assert_eq!(first["item"]["image_path"], "wardrobe_images/shirt.png");

    add_item(&app, "pants.png", "Pants", "Black", "Fall").await;
    let coat = add_item(&app, "coat.png", "Jackets", "Blue", "Winter").await;
    assert_eq!(coat["index"], 2);

    assert!(dir.path().join("wardrobe_images/shirt.png").exists());
    let table = std::fs::read_to_string(dir.path().join("metadata.csv")).unwrap();
    assert!(table.starts_with("Image Path,Category,Color,Season\n"));
    assert_eq!(table.lines().count(), 4);

    // Filter by color
    let (_, blue) = send(&app, test_request("GET", "/api/items?color=Blue")).await;
    assert_eq!(blue["total"], 3);
    assert_eq!(blue["matched"], 2);
    assert_eq!(blue["items"][0]["index"], 0);
    assert_eq!(blue["items"][1]["index"], 2);
    assert_eq!(blue["items"][1]["image_url"], "/wardrobe_images/coat.png");
    assert_eq!(blue["items"][1]["exists"], true);

    // Values within one dimension are alternatives
    let (_, either) = send(
        &app,
        test_request("GET", "/api/items?season=Summer&season=Fall"),
    )
    .await;
    assert_eq!(either["matched"], 2);

    // Dimensions combine
    let (_, none) = send(&app, test_request("GET", "/api/items?color=Black&season=Summer")).await;
    assert_eq!(none["matched"], 0);

    let (_, facets) = send(&app, test_request("GET", "/api/facets")).await;
    assert_eq!(facets["colors"], json!(["Blue", "Black"]));
    assert_eq!(facets["categories"], json!(["Shirts", "Pants", "Jackets"]));

    // Stored images are served
    let response = app
        .clone()
        .oneshot(test_request("GET", "/wardrobe_images/pants.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Delete the middle item
    let (status, deleted) = send(&app, test_request("DELETE", "/api/items/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["item"]["image_path"], "wardrobe_images/pants.png");
    assert_eq!(deleted["remaining"], 2);
    assert!(!dir.path().join("wardrobe_images/pants.png").exists());

    let (_, rest) = send(&app, test_request("GET", "/api/items")).await;
    assert_eq!(rest["items"][1]["image_path"], "wardrobe_images/coat.png");
    assert_eq!(rest["items"][1]["index"], 1);

    // A new item lands after the renumbered rows
    let hat = add_item(&app, "hat.png", "Hats", "Red", "Fall").await;
    assert_eq!(hat["index"], 2);
    assert_eq!(hat["item"]["image_path"], "wardrobe_images/hat.png");
}

#[tokio::test]
async fn test_add_without_image_saves_nothing() {
    let (dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(
        &app,
        add_request(&[("category", "Shirts"), ("color", "Red"), ("season", "Fall")], None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved"], false);
    assert!(body["item"].is_null());
    assert!(!dir.path().join("metadata.csv").exists());
}

#[tokio::test]
async fn test_add_rejects_non_image_upload() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(
        &app,
        add_request(&[("category", "Shirts")], Some(("notes.png", b"just some text"))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_add_strips_directories_from_file_name() {
    let (dir, app) = setup_app(Stylist::disabled());

    let body = add_item(&app, "../../escape.png", "Shirts", "Red", "Fall").await;

    assert_eq!(body["item"]["image_path"], "wardrobe_images/escape.png");
    assert!(dir.path().join("wardrobe_images/escape.png").exists());
}

#[tokio::test]
async fn test_background_removal_requires_configuration() {
    let (_dir, app) = setup_app(Stylist::disabled());
    let image = png_bytes(Rgba([0, 0, 0, 255]));

    let (status, body) = send(
        &app,
        add_request(
            &[("category", "Shirts"), ("remove_background", "on")],
            Some(("shirt.png", &image)),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not configured"));
}

#[tokio::test]
async fn test_background_removal_stores_png() {
    let (dir, app) = setup_app_with_background();
    let image = png_bytes(Rgba([0, 0, 0, 255]));

    let (status, body) = send(
        &app,
        add_request(
            &[("category", "Shirts"), ("color", "White"), ("season", "Summer"), ("remove_background", "true")],
            Some(("photo.jpg", &image)),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["image_path"], "wardrobe_images/photo.png");

    let stored = std::fs::read(dir.path().join("wardrobe_images/photo.png")).unwrap();
    assert_eq!(stored, png_bytes(Rgba([255, 255, 255, 255])));
}

#[tokio::test]
async fn test_delete_on_empty_catalog_is_noop() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(&app, test_request("DELETE", "/api/items/0")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
    assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn test_delete_out_of_range_is_not_found() {
    let (_dir, app) = setup_app(Stylist::disabled());
    add_item(&app, "shirt.png", "Shirts", "Blue", "Summer").await;

    let (status, body) = send(&app, test_request("DELETE", "/api/items/5")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_with_stale_path_conflicts() {
    let (dir, app) = setup_app(Stylist::disabled());
    add_item(&app, "shirt.png", "Shirts", "Blue", "Summer").await;
    add_item(&app, "pants.png", "Pants", "Black", "Fall").await;

    let (status, _) = send(
        &app,
        test_request("DELETE", "/api/items/0?image_path=wardrobe_images/pants.png"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(dir.path().join("wardrobe_images/shirt.png").exists());

    let (status, body) = send(
        &app,
        test_request("DELETE", "/api/items/1?image_path=wardrobe_images/pants.png"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
}

// =============================================================================
// Suggestions
// =============================================================================

#[tokio::test]
async fn test_suggestion_requires_prompt() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, _) = send(&app, json_request("/api/suggestions", json!({"prompt": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_suggestion_flags_missing_images() {
    let reply = "Here you go:\n```python\n[['wardrobe_images/shirt.png', 'wardrobe_images/gone.png']]\n```";
    let (_dir, app) = setup_app(Stylist::new(Arc::new(FixedReply(Ok(reply.to_string())))));
    add_item(&app, "shirt.png", "Shirts", "Blue", "Summer").await;

    let (status, body) = send(
        &app,
        json_request("/api/suggestions", json!({"prompt": "beach party"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "suggested");
    assert_eq!(body["outfits"][0][0]["image_path"], "wardrobe_images/shirt.png");
    assert_eq!(body["outfits"][0][0]["exists"], true);
    assert_eq!(body["outfits"][0][1]["exists"], false);
}

#[tokio::test]
async fn test_unparsable_suggestion_reports_failure() {
    let reply = "I would wear the blue shirt.";
    let (_dir, app) = setup_app(Stylist::new(Arc::new(FixedReply(Ok(reply.to_string())))));

    let (status, body) = send(
        &app,
        json_request("/api/suggestions", json!({"prompt": "office"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "parse_failed");
}

#[tokio::test]
async fn test_unconfigured_stylist_reports_request_failure() {
    let (_dir, app) = setup_app(Stylist::disabled());

    let (status, body) = send(
        &app,
        json_request("/api/suggestions", json!({"prompt": "office"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "request_failed");
}

#[tokio::test]
async fn test_service_error_reports_request_failure() {
    let client = FixedReply(Err("service returned 503: overloaded".to_string()));
    let (_dir, app) = setup_app(Stylist::new(Arc::new(client)));

    let (_, body) = send(
        &app,
        json_request("/api/suggestions", json!({"prompt": "office"})),
    )
    .await;

    assert_eq!(body["kind"], "request_failed");
    assert!(body["message"].as_str().unwrap().contains("503"));
}
