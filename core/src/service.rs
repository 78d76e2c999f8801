use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{FridgeError, Result};
use crate::expiry::{self, Urgency};
use crate::gemini;
use crate::models::{
    FoodItem, NewFoodItem, NewShoppingItem, PreferencesUpdate, RecipePreferences,
    RecipeSuggestion, SavedRecipe, ShoppingListItem, UpdateFoodItem, UserPreferences,
};
use crate::reconcile::{self, BulkAddFailure, BulkAddReport};
use crate::session::{MergeOutcome, QueryContext, RecipeSession, build_request};

/// Text-generation capability used for storage advice and recipes.
///
/// The CLI implements this with a blocking Gemini client. Implementations
/// return the raw model text; parsing happens in the service.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, schema: &Value) -> anyhow::Result<String>;
}

/// A fridge item with its derived expiry state.
#[derive(Debug, Clone, Serialize)]
pub struct FoodStatus {
    #[serde(flatten)]
    pub item: FoodItem,
    pub expiry_date: Option<NaiveDate>,
    pub urgency: Option<Urgency>,
    pub eligible_for_recipe: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "recipe", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved(SavedRecipe),
    AlreadySaved(SavedRecipe),
}

/// Every user action the service understands.
#[derive(Debug, Clone)]
pub enum Command {
    AddFoodItem(NewFoodItem),
    UpdateFoodItem { id: i64, update: UpdateFoodItem },
    DeleteFoodItem(i64),
    FetchStorageAdvice(i64),
    AddShoppingItem(NewShoppingItem),
    ToggleShoppingItem(i64),
    DeleteShoppingItem(i64),
    AddMissingToShoppingList(Vec<String>),
    StartRecipeSearch {
        target_ingredient: Option<String>,
        preferences: Option<RecipePreferences>,
    },
    GenerateMoreRecipes,
    SaveRecipe(RecipeSuggestion),
    DeleteSavedRecipe(i64),
    UpdatePreferences(PreferencesUpdate),
    ToggleDarkMode,
    SaveRecipePreferences(RecipePreferences),
}

#[derive(Debug)]
pub enum Outcome {
    FoodItem(FoodItem),
    ShoppingItem(ShoppingListItem),
    Deleted(bool),
    BulkAdded(BulkAddReport),
    Recipes(MergeOutcome),
    Saved(SaveOutcome),
    Changed(bool),
    Preferences(UserPreferences),
}

pub struct FridgeService {
    db: Database,
    session: RecipeSession,
}

impl FridgeService {
    pub fn new(db_path: &Path, principal: &str) -> Result<Self> {
        let db = Database::open(db_path, principal)?;
        Ok(Self::with_database(db))
    }

    pub fn new_in_memory(principal: &str) -> Result<Self> {
        let db = Database::open_in_memory(principal)?;
        Ok(Self::with_database(db))
    }

    #[must_use]
    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            session: RecipeSession::new(),
        }
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        self.db.principal()
    }

    // --- Fridge ---

    pub fn add_food_item(&self, item: NewFoodItem) -> Result<FoodItem> {
        let item = item.validated()?;
        let created = self.db.insert_food_item(&item)?;
        info!(id = created.id, name = %created.name, "food item added");
        Ok(created)
    }

    pub fn get_food_item(&self, id: i64) -> Result<FoodItem> {
        self.db
            .get_food_item(id)?
            .ok_or_else(|| FridgeError::NotFound(format!("food item {id}")))
    }

    pub fn update_food_item(&self, id: i64, update: UpdateFoodItem) -> Result<FoodItem> {
        let update = update.validated()?;
        let updated = self
            .db
            .update_food_item(id, &update)?
            .ok_or_else(|| FridgeError::NotFound(format!("food item {id}")))?;
        info!(id, "food item updated");
        Ok(updated)
    }

    /// Returns `false` when the item was already gone.
    pub fn delete_food_item(&self, id: i64) -> Result<bool> {
        let deleted = self.db.delete_food_item(id)?;
        if !deleted {
            debug!(id, "food item already deleted");
        }
        Ok(deleted)
    }

    /// Fridge contents ordered by the stored sort preferences.
    pub fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        let prefs = self.db.load_preferences()?;
        let mut items = self.db.list_food_items()?;
        expiry::sort_food_items(
            &mut items,
            prefs.sort_criteria,
            prefs.sort_direction,
            prefs.language,
        );
        Ok(items)
    }

    pub fn list_food_status(&self, today: NaiveDate) -> Result<Vec<FoodStatus>> {
        Ok(self
            .list_food_items()?
            .into_iter()
            .map(|item| FoodStatus {
                expiry_date: item.expiry_date(),
                urgency: expiry::compute_urgency(&item, today),
                eligible_for_recipe: expiry::is_eligible_for_recipe(&item, today),
                item,
            })
            .collect())
    }

    /// Ask the generator for storage advice and write it to the item.
    pub fn fetch_storage_advice(
        &self,
        generator: &dyn TextGenerator,
        id: i64,
    ) -> Result<FoodItem> {
        let item = self.get_food_item(id)?;
        let language = self.db.load_preferences()?.language;
        let prompt = gemini::storage_advice_prompt(&item.name, language);
        let text = generator.generate(&prompt, &gemini::storage_advice_schema())?;
        let advice = gemini::parse_storage_advice(&text)?;
        if !self.db.set_storage_advice(id, &advice)? {
            return Err(FridgeError::NotFound(format!("food item {id}")));
        }
        info!(
            id,
            location = %advice.storage_location,
            shelf_life_days = advice.shelf_life_days,
            "storage advice stored"
        );
        self.get_food_item(id)
    }

    // --- Shopping list ---

    pub fn add_shopping_item(&self, item: NewShoppingItem) -> Result<ShoppingListItem> {
        let item = item.validated()?;
        let created = self.db.insert_shopping_item(&item)?;
        info!(id = created.id, name = %created.name, "shopping item added");
        Ok(created)
    }

    pub fn get_shopping_item(&self, id: i64) -> Result<ShoppingListItem> {
        self.db
            .get_shopping_item(id)?
            .ok_or_else(|| FridgeError::NotFound(format!("shopping item {id}")))
    }

    pub fn toggle_shopping_item(&self, id: i64) -> Result<ShoppingListItem> {
        let item = self.get_shopping_item(id)?;
        if !self.db.set_shopping_item_purchased(id, !item.purchased)? {
            return Err(FridgeError::NotFound(format!("shopping item {id}")));
        }
        self.get_shopping_item(id)
    }

    pub fn delete_shopping_item(&self, id: i64) -> Result<bool> {
        Ok(self.db.delete_shopping_item(id)?)
    }

    pub fn list_shopping_items(&self) -> Result<Vec<ShoppingListItem>> {
        let prefs = self.db.load_preferences()?;
        let mut items = self.db.list_shopping_items()?;
        expiry::sort_shopping_items(
            &mut items,
            prefs.shopping_list_sort_criteria,
            prefs.shopping_list_sort_direction,
            prefs.language,
        );
        Ok(items)
    }

    /// Draft a fridge item from a shopping entry. Nothing is written.
    pub fn shopping_item_to_food_draft(&self, id: i64, today: NaiveDate) -> Result<NewFoodItem> {
        let item = self.get_shopping_item(id)?;
        Ok(NewFoodItem {
            name: item.name,
            quantity: item.unit.unwrap_or_default(),
            purchase_date: today,
            manual_expiry_date: None,
        })
    }

    /// Insert each name independently. Earlier successes are kept when a
    /// later insert fails.
    pub fn add_missing_to_shopping_list(&self, names: &[String]) -> BulkAddReport {
        let mut report = BulkAddReport::default();
        for name in names {
            let result = self.add_shopping_item(NewShoppingItem {
                name: name.clone(),
                unit: None,
            });
            match result {
                Ok(item) => report.added.push(item),
                Err(e) => {
                    warn!(name = %name, error = %e, "failed to add ingredient to shopping list");
                    report.failed.push(BulkAddFailure {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    // --- Recipes ---

    fn eligible_ingredients(&self, today: NaiveDate) -> Result<Vec<String>> {
        let items = self.list_food_items()?;
        Ok(expiry::eligible_ingredient_names(&items, today))
    }

    /// Start a fresh recipe query and replace the session's results.
    ///
    /// `preferences` overrides the stored recipe preferences for this query
    /// only. A transport failure leaves the session reset but empty.
    pub fn start_recipe_search(
        &mut self,
        generator: &dyn TextGenerator,
        target_ingredient: Option<String>,
        preferences: Option<RecipePreferences>,
        today: NaiveDate,
    ) -> Result<MergeOutcome> {
        let language = self.db.load_preferences()?.language;
        let preferences = match preferences {
            Some(p) => p,
            None => self.db.load_recipe_preferences()?,
        };
        let eligible = self.eligible_ingredients(today)?;
        let context = QueryContext {
            preferences: Some(preferences),
            target_ingredient,
        };
        let request = build_request(&eligible, &context, &[], language)?;

        let token = self
            .session
            .start_query(context.preferences, context.target_ingredient);
        info!(
            target = request.target_ingredient.as_deref().unwrap_or("-"),
            ingredients = request.ingredients.len(),
            "requesting recipes"
        );
        let recipes = Self::request_recipes(generator, &request.to_prompt())?;
        Ok(self.session.replace_results(token, recipes))
    }

    /// Extend the current results with recipes not shown yet.
    pub fn generate_more_recipes(
        &mut self,
        generator: &dyn TextGenerator,
        today: NaiveDate,
    ) -> Result<MergeOutcome> {
        let language = self.db.load_preferences()?.language;
        let eligible = self.eligible_ingredients(today)?;
        let (token, request) = self.session.generate_more(&eligible, language)?;
        info!(
            avoid = request.avoid_recipes.len(),
            "requesting more recipes"
        );
        let recipes = Self::request_recipes(generator, &request.to_prompt())?;
        Ok(self.session.append_results(token, recipes))
    }

    fn request_recipes(
        generator: &dyn TextGenerator,
        prompt: &str,
    ) -> Result<Vec<RecipeSuggestion>> {
        let text = generator.generate(prompt, &gemini::recipe_response_schema())?;
        match gemini::parse_recipe_response(&text) {
            Ok(recipes) => Ok(recipes),
            Err(FridgeError::SchemaMismatch(reason)) => {
                warn!(%reason, "recipe response did not match schema, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub fn session(&self) -> &RecipeSession {
        &self.session
    }

    /// Save a recipe unless an identical one is already saved.
    pub fn save_recipe(&self, recipe: &RecipeSuggestion) -> Result<SaveOutcome> {
        let existing = self.db.list_saved_recipes()?;
        if let Some(saved) = existing.into_iter().find(|r| r.is_same_recipe(recipe)) {
            debug!(id = saved.id, "recipe already saved");
            return Ok(SaveOutcome::AlreadySaved(saved));
        }
        let saved = self.db.insert_saved_recipe(recipe)?;
        info!(id = saved.id, name = %saved.recipe_name, "recipe saved");
        Ok(SaveOutcome::Saved(saved))
    }

    pub fn list_saved_recipes(&self) -> Result<Vec<SavedRecipe>> {
        Ok(self.db.list_saved_recipes()?)
    }

    pub fn get_saved_recipe(&self, id: i64) -> Result<SavedRecipe> {
        self.db
            .get_saved_recipe(id)?
            .ok_or_else(|| FridgeError::NotFound(format!("saved recipe {id}")))
    }

    pub fn delete_saved_recipe(&self, id: i64) -> Result<bool> {
        Ok(self.db.delete_saved_recipe(id)?)
    }

    pub fn missing_ingredients(
        &self,
        recipe: &RecipeSuggestion,
        today: NaiveDate,
    ) -> Result<Vec<String>> {
        let fridge = self.db.list_food_items()?;
        let shopping = self.db.list_shopping_items()?;
        Ok(reconcile::find_missing_ingredients(
            recipe, &fridge, &shopping, today,
        ))
    }

    // --- Preferences ---

    pub fn preferences(&self) -> Result<UserPreferences> {
        Ok(self.db.load_preferences()?)
    }

    /// Returns whether anything changed. Unchanged settings are not written.
    pub fn update_preferences(&self, update: &PreferencesUpdate) -> Result<bool> {
        let current = self.db.load_preferences()?;
        let (next, changed) = current.apply(update);
        if changed {
            self.db.save_preferences(&next)?;
            info!("preferences updated");
        }
        Ok(changed)
    }

    pub fn toggle_dark_mode(&self) -> Result<UserPreferences> {
        let next = self.db.load_preferences()?.toggle_dark_mode();
        self.db.save_preferences(&next)?;
        Ok(next)
    }

    pub fn recipe_preferences(&self) -> Result<RecipePreferences> {
        Ok(self.db.load_recipe_preferences()?)
    }

    pub fn save_recipe_preferences(&self, prefs: &RecipePreferences) -> Result<bool> {
        let current = self.db.load_recipe_preferences()?;
        if current == *prefs {
            return Ok(false);
        }
        self.db.save_recipe_preferences(prefs)?;
        Ok(true)
    }

    // --- Command dispatch ---

    pub fn dispatch(
        &mut self,
        command: Command,
        generator: &dyn TextGenerator,
        today: NaiveDate,
    ) -> Result<Outcome> {
        debug!(?command, "dispatch");
        let outcome = match command {
            Command::AddFoodItem(item) => Outcome::FoodItem(self.add_food_item(item)?),
            Command::UpdateFoodItem { id, update } => {
                Outcome::FoodItem(self.update_food_item(id, update)?)
            }
            Command::DeleteFoodItem(id) => Outcome::Deleted(self.delete_food_item(id)?),
            Command::FetchStorageAdvice(id) => {
                Outcome::FoodItem(self.fetch_storage_advice(generator, id)?)
            }
            Command::AddShoppingItem(item) => Outcome::ShoppingItem(self.add_shopping_item(item)?),
            Command::ToggleShoppingItem(id) => {
                Outcome::ShoppingItem(self.toggle_shopping_item(id)?)
            }
            Command::DeleteShoppingItem(id) => Outcome::Deleted(self.delete_shopping_item(id)?),
            Command::AddMissingToShoppingList(names) => {
                Outcome::BulkAdded(self.add_missing_to_shopping_list(&names))
            }
            Command::StartRecipeSearch {
                target_ingredient,
                preferences,
            } => Outcome::Recipes(self.start_recipe_search(
                generator,
                target_ingredient,
                preferences,
                today,
            )?),
            Command::GenerateMoreRecipes => {
                Outcome::Recipes(self.generate_more_recipes(generator, today)?)
            }
            Command::SaveRecipe(recipe) => Outcome::Saved(self.save_recipe(&recipe)?),
            Command::DeleteSavedRecipe(id) => Outcome::Deleted(self.delete_saved_recipe(id)?),
            Command::UpdatePreferences(update) => {
                Outcome::Changed(self.update_preferences(&update)?)
            }
            Command::ToggleDarkMode => Outcome::Preferences(self.toggle_dark_mode()?),
            Command::SaveRecipePreferences(prefs) => {
                Outcome::Changed(self.save_recipe_preferences(&prefs)?)
            }
        };
        Ok(outcome)
    }
}
