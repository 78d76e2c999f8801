//! Gemini `generateContent` wire types, response schemas and parsers.
//!
//! The HTTP call itself lives in the CLI; this module only knows the shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::FridgeError;
use crate::models::{Language, RecipeSuggestion, StorageAdvice};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

impl GenerateContentRequest {
    /// Single-turn JSON-mode request constrained by `schema`.
    #[must_use]
    pub fn json_mode(prompt: &str, schema: &Value) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[must_use]
pub fn recipe_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "recipes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "recipeName": { "type": "STRING" },
                        "ingredients": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "steps": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["recipeName", "ingredients", "steps"]
                }
            }
        },
        "required": ["recipes"]
    })
}

#[must_use]
pub fn storage_advice_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "storageLocation": { "type": "STRING" },
            "shelfLifeDays": { "type": "INTEGER" }
        },
        "required": ["storageLocation", "shelfLifeDays"]
    })
}

#[must_use]
pub fn storage_advice_prompt(item_name: &str, language: Language) -> String {
    format!(
        "For the food \"{item_name}\", suggest the best refrigerator storage location and the \
         estimated shelf life in days from purchase. Please reply in {}. Reply in JSON with the \
         fields 'storageLocation' (string) and 'shelfLifeDays' (integer).",
        language.reply_name()
    )
}

/// Models sometimes wrap JSON-mode output in a Markdown code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
struct RecipeEnvelope {
    recipes: Vec<RecipeSuggestion>,
}

pub fn parse_recipe_response(text: &str) -> Result<Vec<RecipeSuggestion>, FridgeError> {
    let envelope: RecipeEnvelope = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| FridgeError::SchemaMismatch(e.to_string()))?;
    Ok(envelope
        .recipes
        .into_iter()
        .filter(|r| !r.recipe_name.trim().is_empty())
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStorageAdvice {
    storage_location: String,
    shelf_life_days: f64,
}

pub fn parse_storage_advice(text: &str) -> Result<StorageAdvice, FridgeError> {
    let raw: RawStorageAdvice = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| FridgeError::SchemaMismatch(e.to_string()))?;
    if !raw.shelf_life_days.is_finite() || raw.shelf_life_days < 0.0 {
        return Err(FridgeError::SchemaMismatch(format!(
            "shelfLifeDays must be a non-negative integer, got {}",
            raw.shelf_life_days
        )));
    }
    #[allow(clippy::cast_sign_loss)]
    let shelf_life_days = raw.shelf_life_days.round().min(f64::from(u32::MAX)) as u32;
    Ok(StorageAdvice {
        storage_location: raw.storage_location.trim().to_string(),
        shelf_life_days,
    })
}
