use anyhow::{Result, bail};

use smartfridge_core::error::FridgeError;
use smartfridge_core::models::{Cuisine, RecipeSuggestion};
use smartfridge_core::service::{Command, FridgeService, Outcome, SaveOutcome, TextGenerator};
use smartfridge_core::session::MergeOutcome;

use super::helpers::{
    exit_not_found, parse_choice, parse_selection, print_recipe, print_saved_recipe_table,
    prompt_line, today,
};

const SESSION_HELP: &str = "[m]ore, [s]ave <n>, [n]eed <n>, [l]ist, [q]uit";

/// One line of input in the interactive recipe session.
#[derive(Debug)]
enum SessionInput {
    Run(Command),
    Missing(usize),
    List,
    Quit,
}

fn parse_session_input(input: &str, recipes: &[RecipeSuggestion]) -> Result<SessionInput> {
    let mut parts = input.split_whitespace();
    let verb = parts.next().unwrap_or("q").to_lowercase();
    let arg = parts.next();
    let pick = |arg: Option<&str>| -> Result<usize> {
        match arg {
            Some(n) => parse_choice(n, recipes.len()),
            None if recipes.len() == 1 => Ok(0),
            None => bail!("Which recipe? (1-{})", recipes.len()),
        }
    };
    match verb.as_str() {
        "m" | "more" => Ok(SessionInput::Run(Command::GenerateMoreRecipes)),
        "s" | "save" => {
            let idx = pick(arg)?;
            Ok(SessionInput::Run(Command::SaveRecipe(recipes[idx].clone())))
        }
        "n" | "need" | "missing" => Ok(SessionInput::Missing(pick(arg)?)),
        "l" | "list" => Ok(SessionInput::List),
        "q" | "quit" | "exit" => Ok(SessionInput::Quit),
        other => bail!("Unknown command '{other}'. Use {SESSION_HELP}"),
    }
}

fn print_new_recipes(recipes: &[RecipeSuggestion], added: usize) {
    let start = recipes.len().saturating_sub(added);
    for (i, recipe) in recipes.iter().enumerate().skip(start) {
        print_recipe(Some(i), recipe);
    }
}

fn report_outcome(svc: &FridgeService, outcome: &Outcome) {
    match outcome {
        Outcome::Recipes(MergeOutcome::Applied { added }) => {
            print_new_recipes(svc.session().recipes(), *added);
        }
        Outcome::Recipes(MergeOutcome::NoRecipesFound) => println!("No new recipes found."),
        Outcome::Recipes(MergeOutcome::Stale) => {}
        Outcome::Saved(SaveOutcome::Saved(r)) => {
            println!("Saved '{}' (id: {})", r.recipe_name, r.id);
        }
        Outcome::Saved(SaveOutcome::AlreadySaved(r)) => {
            println!("'{}' is already saved (id: {})", r.recipe_name, r.id);
        }
        Outcome::BulkAdded(report) => {
            if !report.added.is_empty() {
                println!("Added {} ingredient(s) to the shopping list", report.added.len());
            }
            for failure in &report.failed {
                eprintln!("Failed to add {}: {}", failure.name, failure.error);
            }
        }
        Outcome::Deleted(_)
        | Outcome::FoodItem(_)
        | Outcome::ShoppingItem(_)
        | Outcome::Changed(_)
        | Outcome::Preferences(_) => println!("Done."),
    }
}

/// Show missing ingredients and let the user pick which to add to the
/// shopping list.
fn offer_missing(
    svc: &mut FridgeService,
    generator: &dyn TextGenerator,
    recipe: &RecipeSuggestion,
) -> Result<()> {
    let missing = svc.missing_ingredients(recipe, today())?;
    if missing.is_empty() {
        println!("You already have everything for '{}'.", recipe.recipe_name);
        return Ok(());
    }
    println!("Missing for '{}':", recipe.recipe_name);
    for (i, name) in missing.iter().enumerate() {
        println!("  {}. {name}", i + 1);
    }
    let Some(answer) = prompt_line("Add to the shopping list (e.g. 1,3 or all, Enter to skip): ")?
    else {
        return Ok(());
    };
    let chosen: Vec<String> = parse_selection(&answer, missing.len())?
        .into_iter()
        .map(|i| missing[i].clone())
        .collect();
    if chosen.is_empty() {
        return Ok(());
    }
    let outcome = svc.dispatch(
        Command::AddMissingToShoppingList(chosen),
        generator,
        today(),
    )?;
    report_outcome(svc, &outcome);
    Ok(())
}

/// Narrow `missing` to the names in `only` (case-insensitive). An empty
/// filter keeps everything. Returns the kept names and the filter entries
/// that matched nothing.
fn filter_missing(missing: &[String], only: &[String]) -> (Vec<String>, Vec<String>) {
    if only.is_empty() {
        return (missing.to_vec(), Vec::new());
    }
    let wanted: Vec<String> = only.iter().map(|n| n.trim().to_lowercase()).collect();
    let kept = missing
        .iter()
        .filter(|name| wanted.contains(&name.to_lowercase()))
        .cloned()
        .collect();
    let unmatched = only
        .iter()
        .filter(|n| {
            let n = n.trim().to_lowercase();
            !missing.iter().any(|m| m.to_lowercase() == n)
        })
        .cloned()
        .collect();
    (kept, unmatched)
}

pub(crate) fn cmd_recipe_suggest(
    svc: &mut FridgeService,
    generator: &dyn TextGenerator,
    item: Option<String>,
    cuisine: Option<String>,
    avoid: Option<String>,
    json: bool,
) -> Result<()> {
    let preferences = if cuisine.is_some() || avoid.is_some() {
        let mut prefs = svc.recipe_preferences()?;
        if let Some(cuisine) = cuisine {
            prefs.cuisine = Cuisine::from_label(&cuisine);
        }
        if let Some(avoid) = avoid {
            prefs.avoid_ingredients = avoid;
        }
        Some(prefs)
    } else {
        None
    };

    let start = Command::StartRecipeSearch {
        target_ingredient: item,
        preferences,
    };
    let outcome = match svc.dispatch(start, generator, today()) {
        Ok(outcome) => outcome,
        Err(FridgeError::NoIngredients) => exit_not_found(
            "No non-expired ingredients in the fridge. Add some, or pass --item",
            json,
        ),
        Err(e) => return Err(e.into()),
    };
    if matches!(outcome, Outcome::Recipes(MergeOutcome::NoRecipesFound)) {
        exit_not_found("No recipes found", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(svc.session().recipes())?);
        return Ok(());
    }

    report_outcome(svc, &outcome);
    loop {
        let Some(line) = prompt_line(&format!("\n{SESSION_HELP}: "))? else {
            break;
        };
        let recipes = svc.session().recipes().to_vec();
        let input = match parse_session_input(&line, &recipes) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let result = match input {
            SessionInput::Quit => break,
            SessionInput::List => {
                for (i, recipe) in recipes.iter().enumerate() {
                    print_recipe(Some(i), recipe);
                }
                Ok(())
            }
            SessionInput::Missing(idx) => offer_missing(svc, generator, &recipes[idx]),
            SessionInput::Run(command) => match svc.dispatch(command, generator, today()) {
                Ok(outcome) => {
                    report_outcome(svc, &outcome);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
        };
        // A failed step never ends the session.
        if let Err(e) = result {
            eprintln!("Error: {e:#}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_saved(svc: &FridgeService, json: bool) -> Result<()> {
    let recipes = svc.list_saved_recipes()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        println!("No saved recipes yet. Find some with: smartfridge recipe suggest");
        return Ok(());
    }
    print_saved_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &FridgeService, id: i64, json: bool) -> Result<()> {
    let recipe = match svc.get_saved_recipe(id) {
        Ok(recipe) => recipe,
        Err(FridgeError::NotFound(_)) => {
            exit_not_found(&format!("Saved recipe {id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        print_recipe(None, &recipe.to_suggestion());
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &FridgeService, id: i64, json: bool) -> Result<()> {
    if !svc.delete_saved_recipe(id)? {
        exit_not_found(&format!("Saved recipe {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted saved recipe {id}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_missing(
    svc: &FridgeService,
    id: i64,
    add: bool,
    only: &[String],
    json: bool,
) -> Result<()> {
    let recipe = match svc.get_saved_recipe(id) {
        Ok(recipe) => recipe.to_suggestion(),
        Err(FridgeError::NotFound(_)) => {
            exit_not_found(&format!("Saved recipe {id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    };
    let missing = svc.missing_ingredients(&recipe, today())?;
    let (selected, unmatched) = filter_missing(&missing, only);
    let report = if add && !selected.is_empty() {
        Some(svc.add_missing_to_shopping_list(&selected))
    } else {
        None
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "recipe": recipe.recipe_name,
                "missing": missing,
                "notMissing": unmatched,
                "added": &report,
            }))?
        );
        return Ok(());
    }

    if missing.is_empty() {
        println!("You already have everything for '{}'.", recipe.recipe_name);
        return Ok(());
    }
    println!("Missing for '{}':", recipe.recipe_name);
    for name in &missing {
        println!("  - {name}");
    }
    for name in &unmatched {
        eprintln!("'{name}' is not missing from this recipe, skipped");
    }
    match report {
        Some(report) => {
            println!("Added {} ingredient(s) to the shopping list", report.added.len());
            for failure in &report.failed {
                eprintln!("Failed to add {}: {}", failure.name, failure.error);
            }
        }
        None if add => println!("Nothing selected to add"),
        None => println!(
            "Add them with: smartfridge recipe missing {id} --add [--only <name>...]"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipes() -> Vec<RecipeSuggestion> {
        ["Omelette", "Custard"]
            .iter()
            .map(|name| RecipeSuggestion {
                recipe_name: (*name).to_string(),
                ingredients: vec!["Egg".to_string()],
                steps: vec!["Cook".to_string()],
            })
            .collect()
    }

    #[test]
    fn test_parse_more_and_quit() {
        assert!(matches!(
            parse_session_input("m", &recipes()).unwrap(),
            SessionInput::Run(Command::GenerateMoreRecipes)
        ));
        assert!(matches!(
            parse_session_input("QUIT", &recipes()).unwrap(),
            SessionInput::Quit
        ));
        assert!(matches!(
            parse_session_input("", &recipes()).unwrap(),
            SessionInput::Quit
        ));
    }

    #[test]
    fn test_parse_save_picks_recipe() {
        let input = parse_session_input("save 2", &recipes()).unwrap();
        let SessionInput::Run(Command::SaveRecipe(recipe)) = input else {
            panic!("expected a save command");
        };
        assert_eq!(recipe.recipe_name, "Custard");
    }

    #[test]
    fn test_parse_requires_index_with_several_recipes() {
        assert!(parse_session_input("s", &recipes()).is_err());
        assert!(parse_session_input("n 3", &recipes()).is_err());

        let single = &recipes()[..1];
        assert!(matches!(
            parse_session_input("n", single).unwrap(),
            SessionInput::Missing(0)
        ));
    }

    #[test]
    fn test_filter_missing_keeps_selected_names() {
        let missing = vec!["Basil".to_string(), "Pine nuts".to_string(), "Garlic".to_string()];

        let (kept, unmatched) = filter_missing(&missing, &[]);
        assert_eq!(kept, missing);
        assert!(unmatched.is_empty());

        let only = vec!["garlic".to_string(), " BASIL ".to_string(), "Egg".to_string()];
        let (kept, unmatched) = filter_missing(&missing, &only);
        assert_eq!(kept, vec!["Basil".to_string(), "Garlic".to_string()]);
        assert_eq!(unmatched, vec!["Egg".to_string()]);
    }

    #[test]
    fn test_missing_add_only_adds_selection() {
        let svc = FridgeService::new_in_memory("tester").unwrap();
        let recipe = svc
            .save_recipe(&RecipeSuggestion {
                recipe_name: "Pesto".to_string(),
                ingredients: vec!["Basil".to_string(), "Pine nuts".to_string()],
                steps: vec!["Blend".to_string()],
            })
            .unwrap();
        let SaveOutcome::Saved(saved) = recipe else {
            panic!("expected a new saved recipe");
        };

        cmd_recipe_missing(&svc, saved.id, true, &["basil".to_string()], true).unwrap();

        let names: Vec<String> = svc
            .list_shopping_items()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Basil".to_string()]);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_session_input("fly", &recipes()).is_err());
    }
}
