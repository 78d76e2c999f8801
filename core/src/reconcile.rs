//! Matching recipe ingredients against the fridge and the shopping list.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::expiry::is_eligible_for_recipe;
use crate::models::{FoodItem, RecipeSuggestion, ShoppingListItem};

/// Ingredients of `recipe` that are neither in the fridge (and still
/// eligible) nor already on the shopping list.
///
/// Matching is case-insensitive on the whole name. Purchased shopping items
/// still count as present. The result keeps the recipe's order and casing.
#[must_use]
pub fn find_missing_ingredients(
    recipe: &RecipeSuggestion,
    fridge: &[FoodItem],
    shopping: &[ShoppingListItem],
    today: NaiveDate,
) -> Vec<String> {
    let present: HashSet<String> = fridge
        .iter()
        .filter(|item| is_eligible_for_recipe(item, today))
        .map(|item| item.name.to_lowercase())
        .chain(shopping.iter().map(|item| item.name.to_lowercase()))
        .collect();

    recipe
        .ingredients
        .iter()
        .filter(|ingredient| !present.contains(&ingredient.to_lowercase()))
        .cloned()
        .collect()
}

/// Outcome of a best-effort bulk add to the shopping list.
#[derive(Debug, Default, Serialize)]
pub struct BulkAddReport {
    pub added: Vec<ShoppingListItem>,
    pub failed: Vec<BulkAddFailure>,
}

#[derive(Debug, Serialize)]
pub struct BulkAddFailure {
    pub name: String,
    pub error: String,
}

impl BulkAddReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
