use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

/// Servings assumed for a recipe that does not declare its own.
pub const DEFAULT_SERVINGS: u32 = 2;
pub const MIN_SERVINGS: u32 = 1;
pub const MAX_SERVINGS: u32 = 12;

/// Grocery items are not categorized yet; every line lands here.
pub const DEFAULT_CATEGORY: &str = "other";

pub fn validate_meal_type(meal: &str) -> anyhow::Result<String> {
    let lower = meal.trim().to_lowercase();
    if MEAL_TYPES.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        anyhow::bail!(
            "Invalid meal type '{meal}'. Must be one of: {}",
            MEAL_TYPES.join(", ")
        )
    }
}

/// Build the `{date}_{meal}` key identifying one planning slot.
#[must_use]
pub fn meal_key(date: NaiveDate, meal_type: &str) -> String {
    format!("{}_{meal_type}", date.format("%Y-%m-%d"))
}

pub fn parse_meal_key(key: &str) -> Result<(NaiveDate, String)> {
    let Some((date, meal)) = key.split_once('_') else {
        bail!("Invalid meal-plan key '{key}'. Expected 'YYYY-MM-DD_meal'");
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date in meal-plan key '{key}'"))?;
    let meal = validate_meal_type(meal)?;
    Ok((date, meal))
}

/// Sort key putting meal-plan keys in calendar order: by date, then by the
/// position of the meal within the day. Unknown meals sort last.
#[must_use]
pub fn meal_key_order(key: &str) -> (String, usize) {
    match key.split_once('_') {
        Some((date, meal)) => {
            let rank = MEAL_TYPES
                .iter()
                .position(|m| *m == meal)
                .unwrap_or(MEAL_TYPES.len());
            (date.to_string(), rank)
        }
        None => (key.to_string(), MEAL_TYPES.len()),
    }
}

/// A recipe's own serving count: any positive number. The 1..=12 range only
/// bounds how many people a chosen meal is shopped for.
pub fn validate_servings(servings: u32) -> Result<u32> {
    if servings == 0 {
        bail!("Servings must be greater than 0");
    }
    Ok(servings)
}

// --- Meal plan ---

/// What a planning slot holds: a recipe from the library or a free-text note
/// such as "leftovers". Only recipe references contribute ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MealAssignment {
    RecipeRef { recipe_id: String },
    FreeText { custom_text: String },
}

impl MealAssignment {
    pub fn recipe(recipe_id: impl Into<String>) -> Self {
        Self::RecipeRef {
            recipe_id: recipe_id.into(),
        }
    }

    pub fn text(custom_text: impl Into<String>) -> Self {
        Self::FreeText {
            custom_text: custom_text.into(),
        }
    }

    #[must_use]
    pub fn recipe_id(&self) -> Option<&str> {
        match self {
            Self::RecipeRef { recipe_id } => Some(recipe_id),
            Self::FreeText { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlan {
    #[serde(default)]
    pub meals: BTreeMap<String, MealAssignment>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub extras: Vec<String>,
}

impl MealPlan {
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&MealAssignment> {
        self.meals.get(key)
    }
}

// --- Recipes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
}

impl Recipe {
    #[must_use]
    pub fn base_servings(&self) -> u32 {
        self.servings.unwrap_or(DEFAULT_SERVINGS)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
}

pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<()> {
    if recipe.title.trim().is_empty() {
        bail!("Recipe title must not be empty");
    }
    if let Some(servings) = recipe.servings {
        validate_servings(servings)?;
    }
    Ok(())
}

// --- Local selection ---

/// Which planned meals go on the next shopping trip, and for how many people.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub chosen_keys: Vec<String>,
    #[serde(default)]
    pub serving_overrides: BTreeMap<String, u32>,
}

impl Selection {
    #[must_use]
    pub fn is_chosen(&self, key: &str) -> bool {
        self.chosen_keys.iter().any(|k| k == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomItem {
    pub name: String,
}

// --- Derived grocery list ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroceryItem {
    pub name: String,
    pub normalized_name: String,
    pub category: String,
    pub sources: Vec<String>,
    pub checked: bool,
    /// Added by hand rather than derived from a planned recipe.
    pub custom: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroceryList {
    pub items: Vec<GroceryItem>,
    pub total_items: usize,
    pub checked_count: usize,
}

impl GroceryList {
    #[must_use]
    pub fn sources_for(&self, normalized_name: &str) -> Option<&[String]> {
        self.items
            .iter()
            .find(|i| !i.custom && i.normalized_name == normalized_name)
            .map(|i| i.sources.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AtHomeView {
    pub items_to_buy: Vec<GroceryItem>,
    pub hidden_at_home_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtHomeItem {
    pub normalized_name: String,
    pub name: String,
    pub added_at: String,
}
