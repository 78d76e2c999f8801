use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::models::{
    FoodItem, NewFoodItem, NewShoppingItem, RecipePreferences, RecipeSuggestion, SavedRecipe,
    ShoppingListItem, StorageAdvice, UpdateFoodItem, UserPreferences,
};

const PREFERENCES_KEY: &str = "preferences";
const RECIPE_PREFERENCES_KEY: &str = "recipe_preferences";

/// SQLite store. Every read and write is scoped to one principal.
pub struct Database {
    conn: Connection,
    principal: String,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn date_from_sql(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// Rows written before timestamps were tracked fall back to the epoch.
fn timestamp_from_sql(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(DateTime::UNIX_EPOCH, |dt| dt.with_timezone(&Utc))
}

impl Database {
    pub fn open(path: &Path, principal: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database {
            conn,
            principal: principal.to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory(principal: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn,
            principal: principal.to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Re-scope this handle to another principal.
    #[must_use]
    pub fn for_principal(self, principal: &str) -> Self {
        Database {
            conn: self.conn,
            principal: principal.to_string(),
        }
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS fridge_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    principal TEXT NOT NULL,
                    name TEXT NOT NULL,
                    quantity TEXT NOT NULL,
                    purchase_date TEXT NOT NULL,
                    manual_expiry_date TEXT,
                    storage_location TEXT,
                    shelf_life_days INTEGER CHECK (shelf_life_days IS NULL OR shelf_life_days >= 0),
                    added_at TEXT
                );

                CREATE TABLE IF NOT EXISTS shopping_list (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    principal TEXT NOT NULL,
                    name TEXT NOT NULL,
                    unit TEXT,
                    purchased INTEGER NOT NULL DEFAULT 0,
                    added_at TEXT
                );

                CREATE TABLE IF NOT EXISTS saved_recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    principal TEXT NOT NULL,
                    recipe_name TEXT NOT NULL,
                    ingredients TEXT NOT NULL,
                    steps TEXT NOT NULL,
                    saved_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    principal TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (principal, key)
                );

                CREATE INDEX IF NOT EXISTS idx_fridge_items_principal ON fridge_items(principal);
                CREATE INDEX IF NOT EXISTS idx_shopping_list_principal ON shopping_list(principal);
                CREATE INDEX IF NOT EXISTS idx_saved_recipes_principal ON saved_recipes(principal, saved_at);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns:
    // 0: id, 1: name, 2: quantity, 3: purchase_date, 4: manual_expiry_date,
    // 5: storage_location, 6: shelf_life_days, 7: added_at
    fn food_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodItem> {
        let purchase_date: String = row.get(3)?;
        let manual: Option<String> = row.get(4)?;
        let added_at: Option<String> = row.get(7)?;
        Ok(FoodItem {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            purchase_date: date_from_sql(3, &purchase_date)?,
            manual_expiry_date: manual.map(|m| date_from_sql(4, &m)).transpose()?,
            storage_location: row
                .get::<_, Option<String>>(5)?
                .filter(|s| !s.is_empty()),
            shelf_life_days: row.get(6)?,
            added_at: timestamp_from_sql(added_at.as_deref()),
        })
    }

    fn shopping_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingListItem> {
        let added_at: Option<String> = row.get(4)?;
        Ok(ShoppingListItem {
            id: row.get(0)?,
            name: row.get(1)?,
            unit: row.get(2)?,
            purchased: row.get(3)?,
            added_at: timestamp_from_sql(added_at.as_deref()),
        })
    }

    fn saved_recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedRecipe> {
        let json_list = |idx: usize| -> rusqlite::Result<Vec<String>> {
            let raw: String = row.get(idx)?;
            serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        };
        let saved_at: String = row.get(4)?;
        Ok(SavedRecipe {
            id: row.get(0)?,
            recipe_name: row.get(1)?,
            ingredients: json_list(2)?,
            steps: json_list(3)?,
            saved_at: timestamp_from_sql(Some(saved_at.as_str())),
        })
    }

    // --- Fridge items ---

    pub fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem> {
        self.conn.execute(
            "INSERT INTO fridge_items (principal, name, quantity, purchase_date, manual_expiry_date, storage_location, shelf_life_days, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6)",
            params![
                self.principal,
                item.name,
                item.quantity,
                date_to_sql(item.purchase_date),
                item.manual_expiry_date.map(date_to_sql),
                now_timestamp(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_food_item(id)?.context("Food item not found after insert")
    }

    pub fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, name, quantity, purchase_date, manual_expiry_date, storage_location, shelf_life_days, added_at
                 FROM fridge_items WHERE id = ?1 AND principal = ?2",
                params![id, self.principal],
                Self::food_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, quantity, purchase_date, manual_expiry_date, storage_location, shelf_life_days, added_at
             FROM fridge_items WHERE principal = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![self.principal], Self::food_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Apply a partial update. Returns `None` when the item does not exist.
    ///
    /// Storage advice is cleared when the name or purchase date changes.
    pub fn update_food_item(&self, id: i64, update: &UpdateFoodItem) -> Result<Option<FoodItem>> {
        let Some(current) = self.get_food_item(id)? else {
            return Ok(None);
        };

        let tx = self.conn.unchecked_transaction()?;
        if let Some(name) = &update.name {
            tx.execute(
                "UPDATE fridge_items SET name = ?1 WHERE id = ?2 AND principal = ?3",
                params![name, id, self.principal],
            )?;
        }
        if let Some(quantity) = &update.quantity {
            tx.execute(
                "UPDATE fridge_items SET quantity = ?1 WHERE id = ?2 AND principal = ?3",
                params![quantity, id, self.principal],
            )?;
        }
        if let Some(purchase_date) = update.purchase_date {
            tx.execute(
                "UPDATE fridge_items SET purchase_date = ?1 WHERE id = ?2 AND principal = ?3",
                params![date_to_sql(purchase_date), id, self.principal],
            )?;
        }
        if let Some(manual) = update.manual_expiry_date {
            tx.execute(
                "UPDATE fridge_items SET manual_expiry_date = ?1 WHERE id = ?2 AND principal = ?3",
                params![manual.map(date_to_sql), id, self.principal],
            )?;
        }
        if update.invalidates_advice(&current) {
            tx.execute(
                "UPDATE fridge_items SET storage_location = NULL, shelf_life_days = NULL
                 WHERE id = ?1 AND principal = ?2",
                params![id, self.principal],
            )?;
        }
        tx.commit()?;

        self.get_food_item(id)
    }

    /// Write AI advice. Touches only the two advice fields.
    pub fn set_storage_advice(&self, id: i64, advice: &StorageAdvice) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE fridge_items SET storage_location = ?1, shelf_life_days = ?2
             WHERE id = ?3 AND principal = ?4",
            params![
                advice.storage_location,
                advice.shelf_life_days,
                id,
                self.principal
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_food_item(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM fridge_items WHERE id = ?1 AND principal = ?2",
            params![id, self.principal],
        )?;
        Ok(rows > 0)
    }

    // --- Shopping list ---

    pub fn insert_shopping_item(&self, item: &NewShoppingItem) -> Result<ShoppingListItem> {
        self.conn.execute(
            "INSERT INTO shopping_list (principal, name, unit, purchased, added_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![self.principal, item.name, item.unit, now_timestamp()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_shopping_item(id)?
            .context("Shopping item not found after insert")
    }

    pub fn get_shopping_item(&self, id: i64) -> Result<Option<ShoppingListItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, name, unit, purchased, added_at
                 FROM shopping_list WHERE id = ?1 AND principal = ?2",
                params![id, self.principal],
                Self::shopping_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn list_shopping_items(&self) -> Result<Vec<ShoppingListItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, unit, purchased, added_at
             FROM shopping_list WHERE principal = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![self.principal], Self::shopping_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn set_shopping_item_purchased(&self, id: i64, purchased: bool) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE shopping_list SET purchased = ?1 WHERE id = ?2 AND principal = ?3",
            params![purchased, id, self.principal],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_shopping_item(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM shopping_list WHERE id = ?1 AND principal = ?2",
            params![id, self.principal],
        )?;
        Ok(rows > 0)
    }

    // --- Saved recipes ---

    pub fn insert_saved_recipe(&self, recipe: &RecipeSuggestion) -> Result<SavedRecipe> {
        self.conn.execute(
            "INSERT INTO saved_recipes (principal, recipe_name, ingredients, steps, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.principal,
                recipe.recipe_name,
                serde_json::to_string(&recipe.ingredients)?,
                serde_json::to_string(&recipe.steps)?,
                now_timestamp(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_saved_recipe(id)?
            .context("Saved recipe not found after insert")
    }

    pub fn get_saved_recipe(&self, id: i64) -> Result<Option<SavedRecipe>> {
        let recipe = self
            .conn
            .query_row(
                "SELECT id, recipe_name, ingredients, steps, saved_at
                 FROM saved_recipes WHERE id = ?1 AND principal = ?2",
                params![id, self.principal],
                Self::saved_recipe_from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    /// Newest first.
    pub fn list_saved_recipes(&self) -> Result<Vec<SavedRecipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipe_name, ingredients, steps, saved_at
             FROM saved_recipes WHERE principal = ?1 ORDER BY saved_at DESC, id DESC",
        )?;
        let recipes = stmt
            .query_map(params![self.principal], Self::saved_recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn delete_saved_recipe(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM saved_recipes WHERE id = ?1 AND principal = ?2",
            params![id, self.principal],
        )?;
        Ok(rows > 0)
    }

    // --- User settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_settings (principal, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(principal, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.principal, key, value, now_timestamp()],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM user_settings WHERE principal = ?1 AND key = ?2",
                params![self.principal, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn load_document<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.get_setting(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(key, error = %e, "unreadable settings document, using defaults");
                Ok(T::default())
            }
        }
    }

    fn save_document<T: Serialize>(&self, key: &str, doc: &T) -> Result<()> {
        let raw = serde_json::to_string(doc)
            .with_context(|| format!("Failed to serialize settings document '{key}'"))?;
        self.set_setting(key, &raw)
    }

    pub fn load_preferences(&self) -> Result<UserPreferences> {
        self.load_document(PREFERENCES_KEY)
    }

    pub fn save_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.save_document(PREFERENCES_KEY, prefs)
    }

    pub fn load_recipe_preferences(&self) -> Result<RecipePreferences> {
        self.load_document(RECIPE_PREFERENCES_KEY)
    }

    pub fn save_recipe_preferences(&self, prefs: &RecipePreferences) -> Result<()> {
        self.save_document(RECIPE_PREFERENCES_KEY, prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cuisine, Language, Theme};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_item() -> NewFoodItem {
        NewFoodItem {
            name: "Spinach".to_string(),
            quantity: "1 bag".to_string(),
            purchase_date: date("2024-01-01"),
            manual_expiry_date: None,
        }
    }

    fn sample_recipe() -> RecipeSuggestion {
        RecipeSuggestion {
            recipe_name: "Spinach Omelette".to_string(),
            ingredients: vec!["Spinach".to_string(), "Egg".to_string()],
            steps: vec!["Whisk eggs".to_string(), "Fold in spinach".to_string()],
        }
    }

    #[test]
    fn test_insert_and_get_food_item() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db.insert_food_item(&sample_item()).unwrap();

        assert_eq!(item.name, "Spinach");
        assert_eq!(item.quantity, "1 bag");
        assert_eq!(item.purchase_date, date("2024-01-01"));
        assert!(item.storage_location.is_none());
        assert!(item.shelf_life_days.is_none());
        assert!(item.added_at > DateTime::UNIX_EPOCH);

        let fetched = db.get_food_item(item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[test]
    fn test_manual_expiry_round_trips() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db
            .insert_food_item(&NewFoodItem {
                manual_expiry_date: Some(date("2024-02-01")),
                ..sample_item()
            })
            .unwrap();
        assert_eq!(item.manual_expiry_date, Some(date("2024-02-01")));
        assert_eq!(item.expiry_date(), Some(date("2024-02-01")));
    }

    #[test]
    fn test_storage_advice_and_invalidation() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db.insert_food_item(&sample_item()).unwrap();
        assert!(
            db.set_storage_advice(
                item.id,
                &StorageAdvice {
                    storage_location: "Crisper drawer".to_string(),
                    shelf_life_days: 5,
                },
            )
            .unwrap()
        );

        let updated = db
            .update_food_item(
                item.id,
                &UpdateFoodItem {
                    quantity: Some("half a bag".to_string()),
                    ..UpdateFoodItem::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.storage_location.as_deref(), Some("Crisper drawer"));
        assert_eq!(updated.expiry_date(), Some(date("2024-01-06")));

        let renamed = db
            .update_food_item(
                item.id,
                &UpdateFoodItem {
                    name: Some("Baby spinach".to_string()),
                    ..UpdateFoodItem::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Baby spinach");
        assert!(renamed.storage_location.is_none());
        assert!(renamed.shelf_life_days.is_none());
    }

    #[test]
    fn test_clear_manual_expiry() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db
            .insert_food_item(&NewFoodItem {
                manual_expiry_date: Some(date("2024-02-01")),
                ..sample_item()
            })
            .unwrap();
        let updated = db
            .update_food_item(
                item.id,
                &UpdateFoodItem {
                    manual_expiry_date: Some(None),
                    ..UpdateFoodItem::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.manual_expiry_date.is_none());
    }

    #[test]
    fn test_update_missing_food_item() {
        let db = Database::open_in_memory("alice").unwrap();
        assert!(
            db.update_food_item(42, &UpdateFoodItem::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_delete_food_item() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db.insert_food_item(&sample_item()).unwrap();
        assert!(db.delete_food_item(item.id).unwrap());
        assert!(!db.delete_food_item(item.id).unwrap());
        assert!(db.list_food_items().unwrap().is_empty());
    }

    #[test]
    fn test_records_scoped_to_principal() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db.insert_food_item(&sample_item()).unwrap();
        db.insert_shopping_item(&NewShoppingItem {
            name: "Milk".to_string(),
            unit: None,
        })
        .unwrap();
        db.insert_saved_recipe(&sample_recipe()).unwrap();

        let db = db.for_principal("bob");
        assert_eq!(db.principal(), "bob");
        assert!(db.list_food_items().unwrap().is_empty());
        assert!(db.list_shopping_items().unwrap().is_empty());
        assert!(db.list_saved_recipes().unwrap().is_empty());
        assert!(db.get_food_item(item.id).unwrap().is_none());
        assert!(!db.delete_food_item(item.id).unwrap());

        let db = db.for_principal("alice");
        assert_eq!(db.list_food_items().unwrap().len(), 1);
    }

    #[test]
    fn test_shopping_item_lifecycle() {
        let db = Database::open_in_memory("alice").unwrap();
        let item = db
            .insert_shopping_item(&NewShoppingItem {
                name: "Basil".to_string(),
                unit: Some("1 bunch".to_string()),
            })
            .unwrap();
        assert!(!item.purchased);
        assert_eq!(item.unit.as_deref(), Some("1 bunch"));

        assert!(db.set_shopping_item_purchased(item.id, true).unwrap());
        assert!(db.get_shopping_item(item.id).unwrap().unwrap().purchased);

        assert!(db.delete_shopping_item(item.id).unwrap());
        assert!(db.get_shopping_item(item.id).unwrap().is_none());
    }

    #[test]
    fn test_saved_recipes_newest_first() {
        let db = Database::open_in_memory("alice").unwrap();
        let first = db.insert_saved_recipe(&sample_recipe()).unwrap();
        let second = db
            .insert_saved_recipe(&RecipeSuggestion {
                recipe_name: "Creamed Spinach".to_string(),
                ..sample_recipe()
            })
            .unwrap();

        let listed = db.list_saved_recipes().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[1].steps, sample_recipe().steps);

        assert!(db.delete_saved_recipe(first.id).unwrap());
        assert_eq!(db.list_saved_recipes().unwrap().len(), 1);
    }

    #[test]
    fn test_preferences_default_when_missing() {
        let db = Database::open_in_memory("alice").unwrap();
        assert_eq!(db.load_preferences().unwrap(), UserPreferences::default());
        assert_eq!(
            db.load_recipe_preferences().unwrap(),
            RecipePreferences::default()
        );
    }

    #[test]
    fn test_preferences_round_trip() {
        let db = Database::open_in_memory("alice").unwrap();
        let prefs = UserPreferences {
            language: Language::JaJp,
            theme: Theme::Ocean,
            last_non_dark_theme: Theme::Ocean,
            ..UserPreferences::default()
        };
        db.save_preferences(&prefs).unwrap();
        assert_eq!(db.load_preferences().unwrap(), prefs);

        let recipe_prefs = RecipePreferences {
            cuisine: Cuisine::Custom("Thai".to_string()),
            avoid_ingredients: "peanuts".to_string(),
        };
        db.save_recipe_preferences(&recipe_prefs).unwrap();
        assert_eq!(db.load_recipe_preferences().unwrap(), recipe_prefs);
    }

    #[test]
    fn test_corrupt_preferences_fall_back_to_default() {
        let db = Database::open_in_memory("alice").unwrap();
        db.set_setting("preferences", "{not json").unwrap();
        assert_eq!(db.load_preferences().unwrap(), UserPreferences::default());
    }
}
