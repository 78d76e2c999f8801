//! Recipe query session: one "search, then maybe ask for more" interaction.
//!
//! The session remembers the context of the most recent query so that
//! "generate more" repeats it exactly, even if the stored preferences have
//! changed in the meantime. Each query bumps a generation counter; results
//! tagged with an older generation are discarded.

use serde::Serialize;
use tracing::debug;

use crate::error::FridgeError;
use crate::models::{Language, RecipePreferences, RecipeSuggestion};

/// Number of recipes requested per call.
pub const RECIPES_PER_REQUEST: usize = 2;

/// Identifies the query a pending request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryContext {
    pub preferences: Option<RecipePreferences>,
    pub target_ingredient: Option<String>,
}

/// A fully resolved recipe request, ready to be rendered as a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeRequest {
    pub target_ingredient: Option<String>,
    /// All eligible ingredients, or the supplementary ones when a target is set.
    pub ingredients: Vec<String>,
    pub cuisine: Option<String>,
    pub avoid_ingredients: Option<String>,
    pub avoid_recipes: Vec<String>,
    pub language: Language,
}

impl RecipeRequest {
    #[must_use]
    pub fn to_prompt(&self) -> String {
        let mut prompt = match &self.target_ingredient {
            Some(target) => {
                let others = if self.ingredients.is_empty() {
                    "none".to_string()
                } else {
                    self.ingredients.join(", ")
                };
                let mut p = format!(
                    "My fridge contains \"{target}\". Please design {RECIPES_PER_REQUEST} recipes \
                     primarily using this ingredient. You can also use other non-expired \
                     ingredients from my fridge: {others}."
                );
                if let Some(cuisine) = &self.cuisine {
                    p.push_str(&format!(" The cuisine should be {cuisine}."));
                }
                p
            }
            None => {
                let mut p = format!(
                    "My fridge contains the following non-expired ingredients: {}.",
                    self.ingredients.join(", ")
                );
                match &self.cuisine {
                    Some(cuisine) => p.push_str(&format!(
                        " Please design {RECIPES_PER_REQUEST} {cuisine} recipes using these ingredients."
                    )),
                    None => p.push_str(&format!(
                        " Please design {RECIPES_PER_REQUEST} recipes using these ingredients."
                    )),
                }
                p
            }
        };
        if let Some(avoid) = &self.avoid_ingredients {
            prompt.push_str(&format!(
                " Please avoid using the following ingredients: {avoid}."
            ));
        }
        if !self.avoid_recipes.is_empty() {
            prompt.push_str(&format!(
                " Please avoid recommending the following recipes again: {}.",
                self.avoid_recipes.join(", ")
            ));
        }
        prompt.push_str(&format!(
            " Each recipe must include a recipe name ('recipeName': STRING), the ingredients \
             ('ingredients': ARRAY of STRING) and detailed cooking steps ('steps': ARRAY of \
             STRING). Please reply in {}. Reply in JSON with a single object whose root key is \
             'recipes'.",
            self.language.reply_name()
        ));
        prompt
    }
}

/// Build a request from the eligible ingredients and a query context.
///
/// The target ingredient is removed from the supplementary list by exact
/// name. Fails with [`FridgeError::NoIngredients`] when there is nothing to
/// cook with.
pub fn build_request(
    eligible: &[String],
    context: &QueryContext,
    existing_recipe_names: &[String],
    language: Language,
) -> Result<RecipeRequest, FridgeError> {
    let target = context
        .target_ingredient
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if eligible.is_empty() && target.is_none() {
        return Err(FridgeError::NoIngredients);
    }

    let ingredients = match target {
        Some(t) => eligible.iter().filter(|name| *name != t).cloned().collect(),
        None => eligible.to_vec(),
    };

    let (cuisine, avoid_ingredients) = match &context.preferences {
        Some(prefs) => {
            let avoid = prefs.avoid_ingredients.trim();
            (
                prefs.cuisine.label(language),
                (!avoid.is_empty()).then(|| avoid.to_string()),
            )
        }
        None => (None, None),
    };

    Ok(RecipeRequest {
        target_ingredient: target.map(str::to_string),
        ingredients,
        cuisine,
        avoid_ingredients,
        avoid_recipes: existing_recipe_names.to_vec(),
        language,
    })
}

/// Result of merging an AI response into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied { added: usize },
    /// The response was valid but empty. Accumulated recipes are untouched.
    NoRecipesFound,
    /// The response belongs to a query that has since been replaced.
    Stale,
}

#[derive(Debug, Default)]
pub struct RecipeSession {
    context: Option<QueryContext>,
    generation: u64,
    recipes: Vec<RecipeSuggestion>,
}

impl RecipeSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new query: drop accumulated recipes and remember the context.
    pub fn start_query(
        &mut self,
        preferences: Option<RecipePreferences>,
        target_ingredient: Option<String>,
    ) -> RequestToken {
        self.recipes.clear();
        self.context = Some(QueryContext {
            preferences,
            target_ingredient,
        });
        self.generation += 1;
        debug!(generation = self.generation, "recipe query started");
        self.token()
    }

    /// Rebuild the last query's request, avoiding every recipe shown so far.
    pub fn generate_more(
        &self,
        eligible: &[String],
        language: Language,
    ) -> Result<(RequestToken, RecipeRequest), FridgeError> {
        let context = self.context.as_ref().ok_or(FridgeError::NoActiveQuery)?;
        let request = build_request(eligible, context, &self.recipe_names(), language)?;
        Ok((self.token(), request))
    }

    pub fn replace_results(
        &mut self,
        token: RequestToken,
        recipes: Vec<RecipeSuggestion>,
    ) -> MergeOutcome {
        if !self.is_current(token) {
            debug!(?token, current = self.generation, "discarding stale recipe results");
            return MergeOutcome::Stale;
        }
        if recipes.is_empty() {
            return MergeOutcome::NoRecipesFound;
        }
        let added = recipes.len();
        self.recipes = recipes;
        MergeOutcome::Applied { added }
    }

    pub fn append_results(
        &mut self,
        token: RequestToken,
        recipes: Vec<RecipeSuggestion>,
    ) -> MergeOutcome {
        if !self.is_current(token) {
            debug!(?token, current = self.generation, "discarding stale recipe results");
            return MergeOutcome::Stale;
        }
        if recipes.is_empty() {
            return MergeOutcome::NoRecipesFound;
        }
        let added = recipes.len();
        self.recipes.extend(recipes);
        MergeOutcome::Applied { added }
    }

    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.generation == self.generation
    }

    #[must_use]
    pub fn context(&self) -> Option<&QueryContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn recipes(&self) -> &[RecipeSuggestion] {
        &self.recipes
    }

    #[must_use]
    pub fn recipe_names(&self) -> Vec<String> {
        self.recipes.iter().map(|r| r.recipe_name.clone()).collect()
    }

    fn token(&self) -> RequestToken {
        RequestToken {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cuisine;

    fn recipe(name: &str) -> RecipeSuggestion {
        RecipeSuggestion {
            recipe_name: name.to_string(),
            ingredients: vec!["Tofu".to_string()],
            steps: vec!["Cook".to_string()],
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_build_request_without_ingredients_fails() {
        let err = build_request(&[], &QueryContext::default(), &[], Language::EnUs).unwrap_err();
        assert!(matches!(err, FridgeError::NoIngredients));
    }

    #[test]
    fn test_build_request_target_without_fridge_items() {
        let context = QueryContext {
            preferences: None,
            target_ingredient: Some("Tofu".to_string()),
        };
        let request = build_request(&[], &context, &[], Language::EnUs).unwrap();
        assert_eq!(request.target_ingredient.as_deref(), Some("Tofu"));
        assert!(request.ingredients.is_empty());
        assert!(request.to_prompt().contains("from my fridge: none."));
    }

    #[test]
    fn test_build_request_removes_target_from_supplementary() {
        let context = QueryContext {
            preferences: None,
            target_ingredient: Some("Tofu".to_string()),
        };
        let eligible = strings(&["Tofu", "Scallion", "tofu"]);
        let request = build_request(&eligible, &context, &[], Language::EnUs).unwrap();
        assert_eq!(request.ingredients, strings(&["Scallion", "tofu"]));
    }

    #[test]
    fn test_cuisine_clause_only_for_real_cuisine() {
        let eligible = strings(&["Egg"]);
        let any = QueryContext {
            preferences: Some(RecipePreferences {
                cuisine: Cuisine::from_label("無指定"),
                avoid_ingredients: String::new(),
            }),
            target_ingredient: None,
        };
        let request = build_request(&eligible, &any, &[], Language::ZhTw).unwrap();
        assert!(request.cuisine.is_none());

        let sichuan = QueryContext {
            preferences: Some(RecipePreferences {
                cuisine: Cuisine::Sichuan,
                avoid_ingredients: " peanuts, cilantro ".to_string(),
            }),
            target_ingredient: None,
        };
        let request = build_request(&eligible, &sichuan, &[], Language::EnUs).unwrap();
        assert_eq!(request.cuisine.as_deref(), Some("Sichuan"));
        assert_eq!(request.avoid_ingredients.as_deref(), Some("peanuts, cilantro"));

        let prompt = request.to_prompt();
        assert!(prompt.contains("2 Sichuan recipes"));
        assert!(prompt.contains("avoid using the following ingredients: peanuts, cilantro."));
        assert!(prompt.contains("Please reply in English."));
    }

    #[test]
    fn test_prompt_lists_recipes_to_avoid() {
        let request = build_request(
            &strings(&["Egg", "Milk"]),
            &QueryContext::default(),
            &strings(&["Omelette", "Custard"]),
            Language::JaJp,
        )
        .unwrap();
        let prompt = request.to_prompt();
        assert!(prompt.contains("Egg, Milk"));
        assert!(prompt.contains("recommending the following recipes again: Omelette, Custard."));
        assert!(prompt.contains("Please reply in 日本語."));
    }

    #[test]
    fn test_start_query_resets_accumulation() {
        let mut session = RecipeSession::new();
        let token = session.start_query(None, None);
        session.replace_results(token, vec![recipe("A"), recipe("B")]);
        let token = session.start_query(None, None);
        session.append_results(token, vec![recipe("C")]);
        assert_eq!(session.recipe_names(), strings(&["C"]));
    }

    #[test]
    fn test_generate_more_uses_stored_context() {
        let mut session = RecipeSession::new();
        let original = RecipePreferences {
            cuisine: Cuisine::Japanese,
            avoid_ingredients: String::new(),
        };
        let token = session.start_query(Some(original), Some("Tofu".to_string()));
        assert_eq!(
            session.replace_results(token, vec![recipe("A"), recipe("B")]),
            MergeOutcome::Applied { added: 2 }
        );

        let eligible = strings(&["Tofu", "Leek"]);
        let (more_token, request) = session.generate_more(&eligible, Language::EnUs).unwrap();
        assert_eq!(request.target_ingredient.as_deref(), Some("Tofu"));
        assert_eq!(request.cuisine.as_deref(), Some("Japanese"));
        assert_eq!(request.avoid_recipes, strings(&["A", "B"]));

        assert_eq!(
            session.append_results(more_token, vec![recipe("C")]),
            MergeOutcome::Applied { added: 1 }
        );
        assert_eq!(session.recipe_names(), strings(&["A", "B", "C"]));
    }

    #[test]
    fn test_generate_more_without_query() {
        let session = RecipeSession::new();
        assert!(matches!(
            session.generate_more(&strings(&["Egg"]), Language::EnUs),
            Err(FridgeError::NoActiveQuery)
        ));
    }

    #[test]
    fn test_empty_append_keeps_results() {
        let mut session = RecipeSession::new();
        let token = session.start_query(None, None);
        session.replace_results(token, vec![recipe("A")]);
        assert_eq!(session.append_results(token, vec![]), MergeOutcome::NoRecipesFound);
        assert_eq!(session.recipe_names(), strings(&["A"]));
    }

    #[test]
    fn test_stale_results_discarded() {
        let mut session = RecipeSession::new();
        let first = session.start_query(None, None);
        let second = session.start_query(None, Some("Egg".to_string()));
        assert!(!session.is_current(first));

        assert_eq!(
            session.replace_results(first, vec![recipe("Old")]),
            MergeOutcome::Stale
        );
        assert!(session.recipes().is_empty());

        assert_eq!(
            session.replace_results(second, vec![recipe("New")]),
            MergeOutcome::Applied { added: 1 }
        );
        assert_eq!(session.recipe_names(), strings(&["New"]));
    }
}
