use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FridgeError;

// --- Fridge ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub quantity: String,
    pub purchase_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub manual_expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub storage_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shelf_life_days: Option<u32>,
    pub added_at: DateTime<Utc>,
}

impl FoodItem {
    /// Effective expiry date, honouring the manual override.
    #[must_use]
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        crate::expiry::compute_expiry_date(
            Some(self.purchase_date),
            self.shelf_life_days,
            self.manual_expiry_date,
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewFoodItem {
    pub name: String,
    pub quantity: String,
    pub purchase_date: NaiveDate,
    pub manual_expiry_date: Option<NaiveDate>,
}

impl NewFoodItem {
    /// Trim and check the required fields.
    pub fn validated(self) -> Result<Self, FridgeError> {
        Ok(Self {
            name: require_field("name", &self.name)?,
            quantity: require_field("quantity", &self.quantity)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFoodItem {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub manual_expiry_date: Option<Option<NaiveDate>>,
}

impl UpdateFoodItem {
    /// AI advice goes stale when the name or purchase date actually changes.
    #[must_use]
    pub fn invalidates_advice(&self, current: &FoodItem) -> bool {
        let name_changed = self.name.as_deref().is_some_and(|n| n != current.name);
        let date_changed = self
            .purchase_date
            .is_some_and(|d| d != current.purchase_date);
        name_changed || date_changed
    }

    pub fn validated(self) -> Result<Self, FridgeError> {
        let name = self
            .name
            .map(|n| require_field("name", &n))
            .transpose()?;
        let quantity = self
            .quantity
            .map(|q| require_field("quantity", &q))
            .transpose()?;
        Ok(Self {
            name,
            quantity,
            ..self
        })
    }
}

/// Storage location and shelf life suggested by the AI for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAdvice {
    pub storage_location: String,
    pub shelf_life_days: u32,
}

// --- Shopping list ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    pub purchased: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShoppingItem {
    pub name: String,
    pub unit: Option<String>,
}

impl NewShoppingItem {
    pub fn validated(self) -> Result<Self, FridgeError> {
        Ok(Self {
            name: require_field("name", &self.name)?,
            unit: self
                .unit
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        })
    }
}

// --- Recipes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSuggestion {
    pub recipe_name: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedRecipe {
    pub id: i64,
    pub recipe_name: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    /// Saved recipes are identified by name, ingredients and steps together.
    #[must_use]
    pub fn is_same_recipe(&self, recipe: &RecipeSuggestion) -> bool {
        self.recipe_name == recipe.recipe_name
            && self.ingredients == recipe.ingredients
            && self.steps == recipe.steps
    }

    #[must_use]
    pub fn to_suggestion(&self) -> RecipeSuggestion {
        RecipeSuggestion {
            recipe_name: self.recipe_name.clone(),
            ingredients: self.ingredients.clone(),
            steps: self.steps.clone(),
        }
    }
}

// --- Preferences ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "ja-JP")]
    JaJp,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::ZhTw, Language::EnUs, Language::JaJp];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::ZhTw => "zh-TW",
            Language::EnUs => "en-US",
            Language::JaJp => "ja-JP",
        }
    }

    /// Name of the language as used in "please reply in ..." instructions.
    #[must_use]
    pub fn reply_name(self) -> &'static str {
        match self {
            Language::ZhTw => "繁體中文",
            Language::EnUs => "English",
            Language::JaJp => "日本語",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zh-tw" | "zh" => Ok(Language::ZhTw),
            "en-us" | "en" => Ok(Language::EnUs),
            "ja-jp" | "ja" => Ok(Language::JaJp),
            _ => bail!("Invalid language '{s}'. Must be one of: zh-TW, en-US, ja-JP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Ocean,
    Forest,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Ocean => "ocean",
            Theme::Forest => "forest",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "ocean" => Ok(Theme::Ocean),
            "forest" => Ok(Theme::Forest),
            _ => bail!("Invalid theme '{s}'. Must be one of: light, dark, ocean, forest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => bail!("Invalid sort direction '{s}'. Must be 'asc' or 'desc'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FridgeSortCriteria {
    #[default]
    ExpiryDate,
    PurchaseDate,
    Name,
    AddedAt,
}

impl fmt::Display for FridgeSortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FridgeSortCriteria::ExpiryDate => "expiryDate",
            FridgeSortCriteria::PurchaseDate => "purchaseDate",
            FridgeSortCriteria::Name => "name",
            FridgeSortCriteria::AddedAt => "addedAt",
        })
    }
}

impl FromStr for FridgeSortCriteria {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "expirydate" | "expiry" => Ok(FridgeSortCriteria::ExpiryDate),
            "purchasedate" | "purchase" | "purchased" => Ok(FridgeSortCriteria::PurchaseDate),
            "name" => Ok(FridgeSortCriteria::Name),
            "addedat" | "added" => Ok(FridgeSortCriteria::AddedAt),
            _ => bail!("Invalid sort criteria '{s}'. Must be one of: expiry, purchase, name, added"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShoppingSortCriteria {
    #[default]
    AddedAt,
    Name,
}

impl fmt::Display for ShoppingSortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShoppingSortCriteria::AddedAt => "addedAt",
            ShoppingSortCriteria::Name => "name",
        })
    }
}

impl FromStr for ShoppingSortCriteria {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "addedat" | "added" => Ok(ShoppingSortCriteria::AddedAt),
            "name" => Ok(ShoppingSortCriteria::Name),
            _ => bail!("Invalid shopping list sort criteria '{s}'. Must be 'added' or 'name'"),
        }
    }
}

/// Cuisine filter for recipe requests.
///
/// `Any` is the single canonical "no preference" value. Localized labels are
/// only translated at the edges via [`Cuisine::from_label`] and [`Cuisine::label`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cuisine {
    #[default]
    Any,
    European,
    Japanese,
    Sichuan,
    Cantonese,
    Taiwanese,
    Custom(String),
}

const CUISINE_LABELS: &[(Cuisine, [&str; 3])] = &[
    (Cuisine::European, ["歐式", "European", "ヨーロッパ料理"]),
    (Cuisine::Japanese, ["日式", "Japanese", "日本料理"]),
    (Cuisine::Sichuan, ["川菜", "Sichuan", "四川料理"]),
    (Cuisine::Cantonese, ["粵菜", "Cantonese", "広東料理"]),
    (Cuisine::Taiwanese, ["台菜", "Taiwanese", "台湾料理"]),
];

const NO_PREFERENCE_LABELS: &[&str] = &["", "any", "none", "無指定", "指定なし"];

fn label_index(language: Language) -> usize {
    match language {
        Language::ZhTw => 0,
        Language::EnUs => 1,
        Language::JaJp => 2,
    }
}

impl Cuisine {
    /// Parse a user-facing label in any supported language.
    /// Unknown labels become a custom cuisine; "no preference" labels map to `Any`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        let lower = trimmed.to_lowercase();
        if NO_PREFERENCE_LABELS.contains(&lower.as_str()) {
            return Cuisine::Any;
        }
        for (cuisine, labels) in CUISINE_LABELS {
            if labels.iter().any(|l| l.to_lowercase() == lower) {
                return cuisine.clone();
            }
        }
        Cuisine::Custom(trimmed.to_string())
    }

    /// Localized cuisine name for prompts; `None` means no cuisine clause.
    #[must_use]
    pub fn label(&self, language: Language) -> Option<String> {
        match self {
            Cuisine::Any => None,
            Cuisine::Custom(name) => {
                let name = name.trim();
                (!name.is_empty()).then(|| name.to_string())
            }
            known => CUISINE_LABELS
                .iter()
                .find(|(c, _)| c == known)
                .map(|(_, labels)| labels[label_index(language)].to_string()),
        }
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        self.label(Language::EnUs).is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipePreferences {
    pub cuisine: Cuisine,
    /// Comma-separated list, passed to the AI verbatim.
    pub avoid_ingredients: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub language: Language,
    pub theme: Theme,
    pub last_non_dark_theme: Theme,
    pub sort_criteria: FridgeSortCriteria,
    pub sort_direction: SortDirection,
    pub shopping_list_sort_criteria: ShoppingSortCriteria,
    pub shopping_list_sort_direction: SortDirection,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: Language::default(),
            theme: Theme::Light,
            last_non_dark_theme: Theme::Light,
            sort_criteria: FridgeSortCriteria::ExpiryDate,
            sort_direction: SortDirection::Asc,
            shopping_list_sort_criteria: ShoppingSortCriteria::AddedAt,
            shopping_list_sort_direction: SortDirection::Desc,
        }
    }
}

/// Partial preference change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
    pub sort_criteria: Option<FridgeSortCriteria>,
    pub sort_direction: Option<SortDirection>,
    pub shopping_list_sort_criteria: Option<ShoppingSortCriteria>,
    pub shopping_list_sort_direction: Option<SortDirection>,
}

impl UserPreferences {
    /// Apply an update and return the resulting preferences plus whether
    /// anything actually changed.
    #[must_use]
    pub fn apply(&self, update: &PreferencesUpdate) -> (Self, bool) {
        let mut next = self.clone();
        if let Some(language) = update.language {
            next.language = language;
        }
        if let Some(theme) = update.theme {
            next.theme = theme;
            if theme != Theme::Dark {
                next.last_non_dark_theme = theme;
            }
        }
        if let Some(criteria) = update.sort_criteria {
            next.sort_criteria = criteria;
        }
        if let Some(direction) = update.sort_direction {
            next.sort_direction = direction;
        }
        if let Some(criteria) = update.shopping_list_sort_criteria {
            next.shopping_list_sort_criteria = criteria;
        }
        if let Some(direction) = update.shopping_list_sort_direction {
            next.shopping_list_sort_direction = direction;
        }
        let changed = next != *self;
        (next, changed)
    }

    /// Switch between dark mode and the most recent non-dark theme.
    #[must_use]
    pub fn toggle_dark_mode(&self) -> Self {
        let theme = if self.theme == Theme::Dark {
            self.last_non_dark_theme
        } else {
            Theme::Dark
        };
        self.apply(&PreferencesUpdate {
            theme: Some(theme),
            ..PreferencesUpdate::default()
        })
        .0
    }
}

/// Trim a required text field, rejecting blank input.
pub fn require_field(field: &str, value: &str) -> Result<String, FridgeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FridgeError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Identifier for a principal when no authenticated identity is available.
#[must_use]
pub fn anonymous_principal() -> String {
    uuid::Uuid::new_v4().to_string()
}
