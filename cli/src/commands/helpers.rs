use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use smartfridge_core::models::{RecipeSuggestion, SavedRecipe};

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            "tomorrow" => Ok(today() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parse an optional date argument, keeping `None` as `None`.
pub(crate) fn parse_optional_date(date_str: Option<String>) -> Result<Option<NaiveDate>> {
    date_str.map(|s| parse_date(Some(s))).transpose()
}

/// Read one line from stdin after printing `prompt` to stderr.
/// Returns `None` on end of input.
pub(crate) fn prompt_line(prompt: &str) -> Result<Option<String>> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    match stdin.lock().lines().next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

/// Parse a 1-based selection into a 0-based index.
pub(crate) fn parse_choice(input: &str, count: usize) -> Result<usize> {
    let n: usize = input.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range (1-{count})");
    }
    Ok(n - 1)
}

/// Parse a multi-selection such as `1,3`, `2 4` or `all` into 0-based
/// indices, in the order given. Blank input or `none` selects nothing.
pub(crate) fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    match input.trim().to_lowercase().as_str() {
        "" | "none" | "n" => return Ok(Vec::new()),
        "all" | "a" | "*" => return Ok((0..count).collect()),
        _ => {}
    }
    let mut picked = Vec::new();
    for part in input.split([',', ' ']).filter(|p| !p.trim().is_empty()) {
        let idx = parse_choice(part, count)?;
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    Ok(picked)
}

pub(crate) fn print_recipe(index: Option<usize>, recipe: &RecipeSuggestion) {
    match index {
        Some(i) => println!("\n{}. {}", i + 1, recipe.recipe_name),
        None => println!("\n{}", recipe.recipe_name),
    }
    println!("   Ingredients: {}", recipe.ingredients.join(", "));
    for (step_no, step) in recipe.steps.iter().enumerate() {
        println!("   {}. {step}", step_no + 1);
    }
}

pub(crate) fn print_saved_recipe_table(recipes: &[SavedRecipe]) {
    #[derive(Tabled)]
    struct SavedRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Recipe")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
        #[tabled(rename = "Steps")]
        steps: usize,
        #[tabled(rename = "Saved")]
        saved_at: String,
    }

    let rows: Vec<SavedRow> = recipes
        .iter()
        .map(|r| SavedRow {
            id: r.id,
            name: truncate(&r.recipe_name, 35),
            ingredients: truncate(&r.ingredients.join(", "), 40),
            steps: r.steps.len(),
            saved_at: r
                .saved_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a "nothing found" condition and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    std::process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
