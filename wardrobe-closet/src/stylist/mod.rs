//! Outfit suggestion bridge
//!
//! Builds a prompt from the catalog, sends it to a generative service and
//! parses the reply into outfit groupings. A request moves from idle to
//! requested and ends either suggested or failed; nothing is retried.

pub mod client;
pub mod parser;
pub mod prompt;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use client::{GeminiClient, GenerativeClient};
pub use parser::{parse_outfits, parse_structured, ParseError};
pub use prompt::build_prompt;

use crate::store::Catalog;

/// Image paths proposed together as one outfit
pub type Outfit = Vec<String>;

/// Why a suggestion request ended in the failed state
#[derive(Debug, Error)]
pub enum StylistError {
    /// The service could not be reached, refused the call, or sent no text
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The reply did not hold a well-formed outfit list
    #[error("Error parsing response: {0}")]
    ParseFailed(#[from] ParseError),
}

impl StylistError {
    pub fn kind(&self) -> &'static str {
        match self {
            StylistError::RequestFailed(_) => "request_failed",
            StylistError::ParseFailed(_) => "parse_failed",
        }
    }
}

/// Holds the generative client for the lifetime of the service
#[derive(Clone)]
pub struct Stylist {
    client: Option<Arc<dyn GenerativeClient>>,
}

impl Stylist {
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A stylist with no service configured; every request fails
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Send a prompt and return the raw reply text
    pub async fn request(&self, prompt: &str) -> Result<String, StylistError> {
        let client = self.client.as_ref().ok_or_else(|| {
            StylistError::RequestFailed("outfit suggestion service is not configured".to_string())
        })?;
        client.generate(prompt).await
    }

    /// Suggest outfits for `user_request` from the whole catalog
    pub async fn suggest(
        &self,
        catalog: &Catalog,
        user_request: &str,
    ) -> Result<Vec<Outfit>, StylistError> {
        let prompt = build_prompt(catalog, user_request);
        debug!(items = catalog.len(), "Outfit suggestion requested");

        let raw = self.request(&prompt).await.map_err(|e| {
            warn!(error = %e, "Outfit suggestion request failed");
            e
        })?;

        let outfits = self.parse_reply(&raw).map_err(|e| {
            warn!(error = %e, reply = %raw, "Outfit suggestion reply could not be parsed");
            e
        })?;

        info!(outfits = outfits.len(), "Outfit suggestions received");
        Ok(outfits)
    }

    /// Structured JSON first when the client asked for it, fenced literal otherwise
    fn parse_reply(&self, raw: &str) -> Result<Vec<Outfit>, StylistError> {
        let structured = self
            .client
            .as_ref()
            .map(|c| c.structured_output())
            .unwrap_or(false);

        if structured {
            match parse_structured(raw) {
                Ok(outfits) => return Ok(outfits),
                Err(e) => debug!(error = %e, "Structured reply rejected, trying fenced block"),
            }
        }

        Ok(parse_outfits(raw)?)
    }
}

/// One suggested image, flagged when its file is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedImage {
    pub image_path: String,
    pub exists: bool,
}

/// Terminal state of a suggestion request as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Suggested {
        outfits: Vec<Vec<SuggestedImage>>,
    },
    Failed {
        kind: String,
        message: String,
    },
}

impl SuggestionOutcome {
    /// Convert a suggestion result, checking each path with `exists`
    pub fn from_result<F>(result: Result<Vec<Outfit>, StylistError>, exists: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        match result {
            Ok(outfits) => SuggestionOutcome::Suggested {
                outfits: outfits
                    .into_iter()
                    .map(|outfit| {
                        outfit
                            .into_iter()
                            .map(|image_path| SuggestedImage {
                                exists: exists(&image_path),
                                image_path,
                            })
                            .collect()
                    })
                    .collect(),
            },
            Err(e) => SuggestionOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wardrobe_common::ItemRecord;

    /// Replays a canned reply and records prompts
    struct CannedClient {
        reply: Result<String, String>,
        structured: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(reply: Result<&str, &str>, structured: bool) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                structured,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeClient for CannedClient {
        async fn generate(&self, prompt: &str) -> Result<String, StylistError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(StylistError::RequestFailed)
        }

        fn structured_output(&self) -> bool {
            self.structured
        }
    }

    fn catalog() -> Catalog {
        Catalog::from(vec![
            ItemRecord::new("wardrobe_images/a.jpg", "Shirts", "Blue", "Summer"),
            ItemRecord::new("wardrobe_images/b.jpg", "Pants", "Black", "Fall"),
        ])
    }

    #[tokio::test]
    async fn test_suggest_parses_fenced_reply() {
        let client = CannedClient::new(
            Ok("Sure!\n```python\n[['wardrobe_images/a.jpg', 'wardrobe_images/b.jpg']]\n```"),
            false,
        );
        let stylist = Stylist::new(client.clone());

        let outfits = stylist.suggest(&catalog(), "office day").await.unwrap();

        assert_eq!(
            outfits,
            vec![vec!["wardrobe_images/a.jpg".to_string(), "wardrobe_images/b.jpg".to_string()]]
        );
        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("wardrobe_images/b.jpg,Pants,Black,Fall"));
        assert!(prompts[0].contains("User: office day"));
    }

    #[tokio::test]
    async fn test_structured_reply_preferred() {
        let stylist = Stylist::new(CannedClient::new(Ok("[[\"wardrobe_images/a.jpg\"]]"), true));
        let outfits = stylist.suggest(&catalog(), "beach").await.unwrap();
        assert_eq!(outfits, vec![vec!["wardrobe_images/a.jpg".to_string()]]);
    }

    #[tokio::test]
    async fn test_structured_mode_falls_back_to_fence() {
        let stylist = Stylist::new(CannedClient::new(Ok("```json\n[[\"a.jpg\"]]\n```"), true));
        let outfits = stylist.suggest(&catalog(), "beach").await.unwrap();
        assert_eq!(outfits, vec![vec!["a.jpg".to_string()]]);
    }

    #[tokio::test]
    async fn test_free_text_mode_ignores_bare_json() {
        let stylist = Stylist::new(CannedClient::new(Ok("[[\"a.jpg\"]]"), false));
        let err = stylist.suggest(&catalog(), "beach").await.unwrap_err();
        assert!(matches!(err, StylistError::ParseFailed(ParseError::FenceNotFound)));
    }

    #[tokio::test]
    async fn test_request_failure_propagates() {
        let stylist = Stylist::new(CannedClient::new(Err("service returned 503"), false));
        let err = stylist.suggest(&catalog(), "beach").await.unwrap_err();
        assert_eq!(err.kind(), "request_failed");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_disabled_stylist_fails_request() {
        let stylist = Stylist::disabled();
        assert!(!stylist.is_enabled());
        let err = stylist.suggest(&catalog(), "beach").await.unwrap_err();
        assert!(matches!(err, StylistError::RequestFailed(_)));
    }

    #[test]
    fn test_outcome_flags_missing_images() {
        let outcome = SuggestionOutcome::from_result(
            Ok(vec![vec!["here.jpg".to_string(), "gone.jpg".to_string()]]),
            |p| p == "here.jpg",
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "suggested");
        assert_eq!(json["outfits"][0][0]["exists"], true);
        assert_eq!(json["outfits"][0][1]["exists"], false);
        assert_eq!(json["outfits"][0][1]["image_path"], "gone.jpg");
    }

    #[test]
    fn test_outcome_reports_parse_cause() {
        let outcome = SuggestionOutcome::from_result(
            Err(StylistError::ParseFailed(ParseError::FenceNotFound)),
            |_| true,
        );

        assert_eq!(
            outcome,
            SuggestionOutcome::Failed {
                kind: "parse_failed".to_string(),
                message: "Error parsing response: no fenced code block found in reply".to_string(),
            }
        );
    }
}
