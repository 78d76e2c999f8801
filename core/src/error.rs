//! Error taxonomy for fridge operations.
//!
//! Nothing here is fatal to the process: callers turn every variant into a
//! notice and fall back to the last stable state.

/// Domain error returned by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum FridgeError {
    /// A required field is missing or blank. The caller blocks submission.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The edit/delete target vanished. Treated as already resolved.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence or AI call failed. Surfaced once, never retried.
    #[error("Transport failure: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// The AI response did not carry the expected fields.
    #[error("AI response did not match the expected schema: {0}")]
    SchemaMismatch(String),

    /// No eligible ingredients and no target ingredient, so no request was issued.
    #[error("No non-expired ingredients in the fridge")]
    NoIngredients,

    /// "Generate more" was requested before any query was started.
    #[error("No recipe search has been started yet")]
    NoActiveQuery,
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, FridgeError>;
