use anyhow::{Context, Result, bail};
use serde_json::Value;

use smartfridge_core::gemini::{GenerateContentRequest, GenerateContentResponse};
use smartfridge_core::service::TextGenerator;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Blocking Gemini client. Owns a current-thread runtime so the sync
/// service layer can call it directly.
pub struct GeminiClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "smartfridge-cli/{} (fridge assistant)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self {
            client,
            rt,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub async fn generate_async(&self, prompt: &str, schema: &Value) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::json_mode(prompt, schema))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API request failed: {e}");
                e
            })
            .context("Failed to reach Gemini API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Gemini API error: {status} - {body}");
            bail!("Gemini API returned {status}");
        }

        let data: GenerateContentResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        Ok(candidate_text(&data))
    }
}

/// First candidate's text. A reply without one (safety block, empty
/// candidate list) becomes an empty string, which the parsers reject as a
/// schema mismatch instead of a transport failure.
fn candidate_text(data: &GenerateContentResponse) -> String {
    if let Some(text) = data.first_text() {
        text.to_string()
    } else {
        tracing::warn!("Gemini response contained no text");
        String::new()
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str, schema: &Value) -> Result<String> {
        self.rt.block_on(self.generate_async(prompt, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartfridge_core::gemini::{parse_recipe_response, recipe_response_schema};

    #[test]
    fn test_client_builds_without_ambient_runtime() {
        assert!(GeminiClient::new("key", "gemini-2.5-flash").is_ok());
    }

    #[test]
    fn test_blocked_reply_is_a_schema_mismatch() {
        let blocked: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY"}],"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .unwrap();
        let text = candidate_text(&blocked);
        assert_eq!(text, "");
        assert!(matches!(
            parse_recipe_response(&text),
            Err(smartfridge_core::error::FridgeError::SchemaMismatch(_))
        ));

        let no_candidates: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(candidate_text(&no_candidates), "");
    }

    // --- Integration tests (hit the real Gemini API) ---

    #[test]
    #[ignore = "hits Gemini API, needs GEMINI_API_KEY"]
    fn test_generate_recipes_live() {
        let key = std::env::var("GEMINI_API_KEY").unwrap();
        let client = GeminiClient::new(&key, crate::config::DEFAULT_GEMINI_MODEL).unwrap();
        let text = client
            .generate(
                "My fridge contains: eggs, tomatoes. Please design 2 recipes. Please reply in English.",
                &recipe_response_schema(),
            )
            .unwrap();
        let recipes = parse_recipe_response(&text).unwrap();
        assert!(!recipes.is_empty());
    }
}
