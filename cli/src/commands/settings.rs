use anyhow::Result;

use smartfridge_core::models::{
    Cuisine, FridgeSortCriteria, Language, PreferencesUpdate, ShoppingSortCriteria, SortDirection,
    Theme,
};
use smartfridge_core::service::FridgeService;

pub(crate) fn cmd_settings_show(svc: &FridgeService, json: bool) -> Result<()> {
    let prefs = svc.preferences()?;
    let recipe_prefs = svc.recipe_preferences()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "principal": svc.principal(),
                "preferences": prefs,
                "recipePreferences": recipe_prefs,
            }))?
        );
        return Ok(());
    }

    let cuisine = recipe_prefs
        .cuisine
        .label(prefs.language)
        .unwrap_or_else(|| "any".to_string());
    let avoid = if recipe_prefs.avoid_ingredients.trim().is_empty() {
        "-"
    } else {
        recipe_prefs.avoid_ingredients.as_str()
    };
    println!("Principal:      {}", svc.principal());
    println!("Language:       {}", prefs.language);
    println!(
        "Theme:          {} (last non-dark: {})",
        prefs.theme, prefs.last_non_dark_theme
    );
    println!(
        "Fridge sort:    {} {}",
        prefs.sort_criteria, prefs.sort_direction
    );
    println!(
        "Shopping sort:  {} {}",
        prefs.shopping_list_sort_criteria, prefs.shopping_list_sort_direction
    );
    println!("Cuisine:        {cuisine}");
    println!("Avoid:          {avoid}");
    Ok(())
}

/// Raw `settings set` arguments, parsed here so errors name the flag.
pub(crate) struct SettingsArgs {
    pub language: Option<String>,
    pub theme: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub shop_sort: Option<String>,
    pub shop_direction: Option<String>,
}

impl SettingsArgs {
    fn into_update(self) -> Result<PreferencesUpdate> {
        Ok(PreferencesUpdate {
            language: self.language.map(|s| s.parse::<Language>()).transpose()?,
            theme: self.theme.map(|s| s.parse::<Theme>()).transpose()?,
            sort_criteria: self
                .sort
                .map(|s| s.parse::<FridgeSortCriteria>())
                .transpose()?,
            sort_direction: self
                .direction
                .map(|s| s.parse::<SortDirection>())
                .transpose()?,
            shopping_list_sort_criteria: self
                .shop_sort
                .map(|s| s.parse::<ShoppingSortCriteria>())
                .transpose()?,
            shopping_list_sort_direction: self
                .shop_direction
                .map(|s| s.parse::<SortDirection>())
                .transpose()?,
        })
    }
}

pub(crate) fn cmd_settings_set(svc: &FridgeService, args: SettingsArgs, json: bool) -> Result<()> {
    let update = args.into_update()?;
    let changed = svc.update_preferences(&update)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "changed": changed,
                "preferences": svc.preferences()?,
            }))?
        );
    } else if changed {
        println!("Settings saved");
    } else {
        println!("Settings not changed");
    }
    Ok(())
}

pub(crate) fn cmd_settings_dark(svc: &FridgeService, json: bool) -> Result<()> {
    let prefs = svc.toggle_dark_mode()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&prefs)?);
    } else {
        println!("Theme is now {}", prefs.theme);
    }
    Ok(())
}

pub(crate) fn cmd_settings_recipe(
    svc: &FridgeService,
    cuisine: Option<String>,
    avoid: Option<String>,
    json: bool,
) -> Result<()> {
    let mut prefs = svc.recipe_preferences()?;
    if let Some(cuisine) = cuisine {
        prefs.cuisine = Cuisine::from_label(&cuisine);
    }
    if let Some(avoid) = avoid {
        prefs.avoid_ingredients = avoid.trim().to_string();
    }
    let changed = svc.save_recipe_preferences(&prefs)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "changed": changed,
                "recipePreferences": prefs,
            }))?
        );
    } else if changed {
        println!("Recipe preferences saved");
    } else {
        println!("Recipe preferences not changed");
    }
    Ok(())
}
