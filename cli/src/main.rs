mod commands;
mod config;
mod household;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    ClearScope, Service, cmd_grocery_add, cmd_grocery_check, cmd_grocery_clear,
    cmd_grocery_export, cmd_grocery_manual, cmd_grocery_pending, cmd_grocery_remove,
    cmd_grocery_select, cmd_grocery_servings, cmd_grocery_show, cmd_home_add, cmd_home_list,
    cmd_home_remove, cmd_plan_extra, cmd_plan_note, cmd_plan_remove, cmd_plan_set,
    cmd_plan_show, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show,
};
use crate::config::Config;
use crate::household::Household;
use larder_core::db::Database;
use larder_core::records::LocalRecordStore;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Plan the week's meals and shop from one grocery list",
    long_about = "Plan the week's meals and shop from one grocery list.\n\n\
                  The meal plan, recipes and at-home items can be shared by a household \
                  through `larder serve`; set LARDER_REMOTE_URL (and LARDER_API_KEY) to use one. \
                  Which meals you are shopping for and what you have checked off stay on this device."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Plan meals for the week
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Build and work through the grocery list
    Grocery {
        #[command(subcommand)]
        command: GroceryCommands,
    },
    /// Items the household already has at home
    Home {
        #[command(subcommand)]
        command: HomeCommands,
    },
    /// Start the household server sharing recipes, meal plan and at-home items
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a recipe
    Add {
        /// Recipe title
        title: String,
        /// Ingredient line, repeatable (e.g. -i "200 g spaghetti")
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,
        /// Number of people the recipe serves
        #[arg(short, long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe by id or title
    Show {
        /// Recipe id or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe (planned meals keep pointing at it)
    Delete {
        /// Recipe id or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: std::path::PathBuf,
        /// Title override (defaults to metadata title or filename)
        #[arg(long)]
        title: Option<String>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show planned meals, notes and extras
    Show {
        /// First day to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        from: Option<String>,
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan a recipe or a free-text meal in a slot
    Set {
        /// Slot in format "date:meal" (e.g. "today:dinner" or "2025-01-04:lunch")
        meal: String,
        /// Recipe id or title
        #[arg(short, long, conflicts_with = "text")]
        recipe: Option<String>,
        /// Free text, e.g. "Leftovers"
        #[arg(short, long)]
        text: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Empty a slot
    Remove {
        /// Slot in format "date:meal"
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set or clear the note for a day
    Note {
        /// Note text (empty to clear)
        note: String,
        /// Day (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a recipe to the week's extras
    ExtraAdd {
        /// Recipe id or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe from the week's extras
    ExtraRemove {
        /// Recipe id or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GroceryCommands {
    /// Show the grocery list
    Show {
        /// Include items marked as at home
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add or remove a planned meal from the grocery list
    Select {
        /// Slot in format "date:meal"
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cook a selected meal for more or fewer people
    Servings {
        /// Slot in format "date:meal"
        meal: String,
        /// Change in people, e.g. 2 or -1
        #[arg(allow_negative_numbers = true)]
        delta: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item by hand
    Add {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List items added by hand, numbered for `remove`
    Manual {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a hand-added item by its number from `manual`
    Remove {
        /// Item number (1-based)
        number: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check off an item
    Check {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Uncheck an item
    Uncheck {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the list (everything, including the planned meals, unless narrowed)
    Clear {
        /// Only clear checked items
        #[arg(long, conflicts_with_all = ["meals", "manual"])]
        checked: bool,
        /// Only deselect planned meals
        #[arg(long, conflicts_with = "manual")]
        meals: bool,
        /// Only remove hand-added items
        #[arg(long)]
        manual: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the items still to buy as plain text
    Export,
    /// Number of unchecked items still to buy
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HomeCommands {
    /// Mark an item as at home
    Add {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Unmark an item
    Remove {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List items marked as at home
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if matches!(cli.command, Commands::Serve { .. }) {
        "larder=info,larder_core=info,tower_http=info"
    } else {
        "warn"
    };
    init_tracing(default_filter);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => serve(&config, port, &bind, no_auth),
        Commands::Recipe { command } => run_recipe(&Household::open(&config)?, command),
        Commands::Plan { command } => run_plan(&Household::open(&config)?, command),
        Commands::Home { command } => run_home(&Household::open(&config)?, command),
        Commands::Grocery { command } => {
            let household = Household::open(&config)?;
            let records = LocalRecordStore::open(&config.device_db_path)?;
            let mut service = Service::open(records, &household, &household, &household)?;
            run_grocery(&mut service, command)
        }
    }
}

fn serve(config: &Config, port: u16, bind: &str, no_auth: bool) -> Result<()> {
    let api_key = if no_auth {
        None
    } else {
        let (key, new) = config.load_or_create_api_key()?;
        if new {
            eprintln!(
                "Generated a new API key in {}",
                config.data_dir.join("api_key").display()
            );
        }
        Some(key)
    };
    let db = Database::open(&config.household_db_path)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::start_server(db, port, bind, api_key))
}

fn run_recipe(household: &Household, command: RecipeCommands) -> Result<()> {
    match command {
        RecipeCommands::Add {
            title,
            ingredients,
            servings,
            json,
        } => cmd_recipe_add(household, &title, ingredients, servings, json),
        RecipeCommands::List { json } => cmd_recipe_list(household, json),
        RecipeCommands::Show { recipe, json } => cmd_recipe_show(household, &recipe, json),
        RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(household, &recipe, json),
        RecipeCommands::Import {
            file,
            title,
            servings,
            json,
        } => cmd_recipe_import(household, &file, title, servings, json),
    }
}

fn run_plan(household: &Household, command: PlanCommands) -> Result<()> {
    match command {
        PlanCommands::Show { from, days, json } => cmd_plan_show(household, from, days, json),
        PlanCommands::Set {
            meal,
            recipe,
            text,
            json,
        } => cmd_plan_set(household, &meal, recipe.as_deref(), text.as_deref(), json),
        PlanCommands::Remove { meal, json } => cmd_plan_remove(household, &meal, json),
        PlanCommands::Note { note, date, json } => cmd_plan_note(household, date, &note, json),
        PlanCommands::ExtraAdd { recipe, json } => cmd_plan_extra(household, &recipe, true, json),
        PlanCommands::ExtraRemove { recipe, json } => {
            cmd_plan_extra(household, &recipe, false, json)
        }
    }
}

fn run_grocery(service: &mut Service<'_>, command: GroceryCommands) -> Result<()> {
    match command {
        GroceryCommands::Show { all, json } => cmd_grocery_show(service, all, json),
        GroceryCommands::Select { meal, json } => cmd_grocery_select(service, &meal, json),
        GroceryCommands::Servings { meal, delta, json } => {
            cmd_grocery_servings(service, &meal, delta, json)
        }
        GroceryCommands::Add { name, json } => cmd_grocery_add(service, &name, json),
        GroceryCommands::Manual { json } => cmd_grocery_manual(service, json),
        GroceryCommands::Remove { number, json } => cmd_grocery_remove(service, number, json),
        GroceryCommands::Check { name, json } => cmd_grocery_check(service, &name, true, json),
        GroceryCommands::Uncheck { name, json } => cmd_grocery_check(service, &name, false, json),
        GroceryCommands::Clear {
            checked,
            meals,
            manual,
            json,
        } => {
            let scope = if checked {
                ClearScope::Checked
            } else if meals {
                ClearScope::Meals
            } else if manual {
                ClearScope::Manual
            } else {
                ClearScope::Everything
            };
            cmd_grocery_clear(service, scope, json)
        }
        GroceryCommands::Export => {
            cmd_grocery_export(service);
            Ok(())
        }
        GroceryCommands::Pending { json } => {
            cmd_grocery_pending(service, json);
            Ok(())
        }
    }
}

fn run_home(household: &Household, command: HomeCommands) -> Result<()> {
    match command {
        HomeCommands::Add { name, json } => cmd_home_add(household, &name, json),
        HomeCommands::Remove { name, json } => cmd_home_remove(household, &name, json),
        HomeCommands::List { json } => cmd_home_list(household, json),
    }
}
