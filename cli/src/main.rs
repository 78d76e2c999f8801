mod commands;
mod config;
mod gemini;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    SettingsArgs, cmd_fridge_add, cmd_fridge_advise, cmd_fridge_delete, cmd_fridge_edit,
    cmd_fridge_list, cmd_recipe_delete, cmd_recipe_missing, cmd_recipe_saved, cmd_recipe_show,
    cmd_recipe_suggest, cmd_settings_dark, cmd_settings_recipe, cmd_settings_set,
    cmd_settings_show, cmd_shop_add, cmd_shop_delete, cmd_shop_list, cmd_shop_stock,
    cmd_shop_toggle,
};
use crate::config::Config;
use crate::gemini::GeminiClient;
use smartfridge_core::service::FridgeService;

#[derive(Parser)]
#[command(
    name = "smartfridge",
    version,
    about = "Track what's in your fridge and cook it before it expires",
    long_about = "Track what's in your fridge and cook it before it expires.\n\n\
        Recipe ideas and storage advice need GEMINI_API_KEY (env or .env file).\n\
        Set RUST_LOG=debug for diagnostics on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage food items in the fridge
    Fridge {
        #[command(subcommand)]
        command: FridgeCommands,
    },
    /// Manage the shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Get recipe ideas and manage saved recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum FridgeCommands {
    /// Add a food item
    Add {
        /// Food name
        name: String,
        /// Quantity (free text, e.g. "2 packs", "500g")
        quantity: String,
        /// Purchase date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        purchased: Option<String>,
        /// Expiry date printed on the package, overrides the estimate
        #[arg(long)]
        expires: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food items with their expiry status
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a food item
    Edit {
        /// Food item ID
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New quantity
        #[arg(short, long)]
        quantity: Option<String>,
        /// New purchase date
        #[arg(long)]
        purchased: Option<String>,
        /// New manual expiry date
        #[arg(long)]
        expires: Option<String>,
        /// Remove the manual expiry date
        #[arg(long)]
        clear_expiry: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food item
    Delete {
        /// Food item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask Gemini where to store an item and how long it keeps
    Advise {
        /// Food item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Add an item to the shopping list
    Add {
        /// Item name
        name: String,
        /// Unit or amount to buy (e.g. "1 dozen")
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the shopping list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the purchased mark on an item
    Toggle {
        /// Shopping item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item from the shopping list
    Delete {
        /// Shopping item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a bought item into the fridge
    Stock {
        /// Shopping item ID
        id: i64,
        /// Quantity (defaults to the item's unit)
        #[arg(short, long)]
        quantity: Option<String>,
        /// Expiry date printed on the package
        #[arg(long)]
        expires: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Suggest recipes from what's in the fridge (interactive)
    Suggest {
        /// Build the recipes around this ingredient
        #[arg(short, long)]
        item: Option<String>,
        /// Cuisine for this search (e.g. japanese, sichuan, "Thai street food")
        #[arg(short, long)]
        cuisine: Option<String>,
        /// Ingredients to avoid for this search, comma separated
        #[arg(long)]
        avoid: Option<String>,
        /// Print the first batch as JSON and exit
        #[arg(long)]
        json: bool,
    },
    /// List saved recipes
    Saved {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a saved recipe
    Show {
        /// Saved recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved recipe
    Delete {
        /// Saved recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which ingredients of a saved recipe you don't have
    Missing {
        /// Saved recipe ID
        id: i64,
        /// Add the missing ingredients to the shopping list
        #[arg(long)]
        add: bool,
        /// With --add, only add these ingredients
        #[arg(long, requires = "add", num_args = 1..)]
        only: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current preferences
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change display preferences
    Set {
        /// Language: zh-TW, en-US, ja-JP
        #[arg(long)]
        language: Option<String>,
        /// Theme: light, dark, ocean, forest
        #[arg(long)]
        theme: Option<String>,
        /// Fridge sort: expiry, purchase, name, added
        #[arg(long)]
        sort: Option<String>,
        /// Fridge sort direction: asc, desc
        #[arg(long)]
        direction: Option<String>,
        /// Shopping list sort: added, name
        #[arg(long)]
        shop_sort: Option<String>,
        /// Shopping list sort direction: asc, desc
        #[arg(long)]
        shop_direction: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle dark mode
    Dark {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the default cuisine and ingredients to avoid
    Recipe {
        /// Cuisine (use "any" to clear)
        #[arg(short, long)]
        cuisine: Option<String>,
        /// Ingredients to avoid, comma separated
        #[arg(long)]
        avoid: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn gemini_client(config: &Config) -> Result<GeminiClient> {
    GeminiClient::new(config.require_api_key()?, &config.gemini_model)
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let (principal, created) = config.load_or_create_principal()?;
    if created {
        eprintln!("Created a new local profile in {}", config.data_dir.display());
    }
    let mut svc = FridgeService::new(&config.db_path, &principal)?;

    match cli.command {
        Commands::Fridge { command } => match command {
            FridgeCommands::Add {
                name,
                quantity,
                purchased,
                expires,
                json,
            } => cmd_fridge_add(&svc, &name, &quantity, purchased, expires, json),
            FridgeCommands::List { json } => cmd_fridge_list(&svc, json),
            FridgeCommands::Edit {
                id,
                name,
                quantity,
                purchased,
                expires,
                clear_expiry,
                json,
            } => cmd_fridge_edit(
                &svc,
                id,
                name,
                quantity,
                purchased,
                expires,
                clear_expiry,
                json,
            ),
            FridgeCommands::Delete { id, json } => cmd_fridge_delete(&svc, id, json),
            FridgeCommands::Advise { id, json } => {
                let gemini = gemini_client(&config)?;
                cmd_fridge_advise(&svc, &gemini, id, json)
            }
        },
        Commands::Shop { command } => match command {
            ShopCommands::Add { name, unit, json } => cmd_shop_add(&svc, &name, unit, json),
            ShopCommands::List { json } => cmd_shop_list(&svc, json),
            ShopCommands::Toggle { id, json } => cmd_shop_toggle(&svc, id, json),
            ShopCommands::Delete { id, json } => cmd_shop_delete(&svc, id, json),
            ShopCommands::Stock {
                id,
                quantity,
                expires,
                json,
            } => cmd_shop_stock(&svc, id, quantity, expires, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Suggest {
                item,
                cuisine,
                avoid,
                json,
            } => {
                let gemini = gemini_client(&config)?;
                cmd_recipe_suggest(&mut svc, &gemini, item, cuisine, avoid, json)
            }
            RecipeCommands::Saved { json } => cmd_recipe_saved(&svc, json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json),
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&svc, id, json),
            RecipeCommands::Missing {
                id,
                add,
                only,
                json,
            } => cmd_recipe_missing(&svc, id, add, &only, json),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&svc, json),
            SettingsCommands::Set {
                language,
                theme,
                sort,
                direction,
                shop_sort,
                shop_direction,
                json,
            } => cmd_settings_set(
                &svc,
                SettingsArgs {
                    language,
                    theme,
                    sort,
                    direction,
                    shop_sort,
                    shop_direction,
                },
                json,
            ),
            SettingsCommands::Dark { json } => cmd_settings_dark(&svc, json),
            SettingsCommands::Recipe {
                cuisine,
                avoid,
                json,
            } => cmd_settings_recipe(&svc, cuisine, avoid, json),
        },
    }
}
