//! Outfit suggestion endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::stylist::SuggestionOutcome;
use crate::{ApiError, ApiResult, AppState};

/// POST /api/suggestions request
#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub prompt: String,
}

/// POST /api/suggestions
///
/// Service and parse failures come back as a `failed` outcome with status 200;
/// only an empty prompt is rejected.
pub async fn suggest_outfits(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> ApiResult<Json<SuggestionOutcome>> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest(
            "Please enter a prompt to get outfit suggestions".to_string(),
        ));
    }

    // Snapshot, then release the lock for the duration of the remote call
    let catalog = state.closet.lock().await.load()?;

    let result = state.stylist.suggest(&catalog, prompt).await;
    let layout = &state.layout;
    Ok(Json(SuggestionOutcome::from_result(result, |path| {
        layout.resolve(path).exists()
    })))
}

/// Build suggestion routes
pub fn suggestion_routes() -> Router<AppState> {
    Router::new().route("/api/suggestions", post(suggest_outfits))
}
