use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::household::Household;
use larder_core::meal_plan::MealPlanView;
use larder_core::models::{MealAssignment, MealPlan, Recipe, meal_key_order, parse_meal_key};
use larder_core::service::RecipeStore;

use super::helpers::{exit_not_found, parse_date, parse_meal_ref, print_json, truncate};

#[derive(Serialize)]
struct PlannedMeal {
    key: String,
    date: NaiveDate,
    meal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe_id: Option<String>,
    /// Recipe title, or the free text for non-recipe meals.
    label: String,
    missing_recipe: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    meals: Vec<PlannedMeal>,
    notes: &'a BTreeMap<String, String>,
    extras: Vec<String>,
}

fn planned_meals(plan: &MealPlan, recipes: &[Recipe], from: NaiveDate, days: u32) -> Vec<PlannedMeal> {
    let until = from + chrono::Duration::days(i64::from(days));
    let mut keys: Vec<&String> = plan.meals.keys().collect();
    keys.sort_by_key(|k| meal_key_order(k));

    keys.into_iter()
        .filter_map(|key| {
            let (date, meal_type) = parse_meal_key(key).ok()?;
            if date < from || date >= until {
                return None;
            }
            let (recipe_id, label, missing_recipe) = match plan.entry(key)? {
                MealAssignment::RecipeRef { recipe_id } => {
                    match recipes.iter().find(|r| &r.id == recipe_id) {
                        Some(recipe) => (Some(recipe_id.clone()), recipe.title.clone(), false),
                        None => (Some(recipe_id.clone()), "(deleted recipe)".to_string(), true),
                    }
                }
                MealAssignment::FreeText { custom_text } => (None, custom_text.clone(), false),
            };
            Some(PlannedMeal {
                key: key.clone(),
                date,
                meal_type,
                recipe_id,
                label,
                missing_recipe,
            })
        })
        .collect()
}

fn extra_titles(plan: &MealPlan, recipes: &[Recipe]) -> Vec<String> {
    plan.extras
        .iter()
        .map(|id| {
            recipes
                .iter()
                .find(|r| &r.id == id)
                .map_or_else(|| format!("(deleted recipe {id})"), |r| r.title.clone())
        })
        .collect()
}

pub(crate) fn cmd_plan_show(
    household: &Household,
    from: Option<String>,
    days: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "What")]
        what: String,
    }

    let from = parse_date(from)?;
    let view = MealPlanView::load(household)?;
    let recipes = household.list_recipes()?;
    let plan = view.plan();
    let meals = planned_meals(plan, &recipes, from, days);

    if json {
        return print_json(&PlanOutput {
            meals,
            notes: &plan.notes,
            extras: extra_titles(plan, &recipes),
        });
    }

    if meals.is_empty() {
        println!("Nothing planned for the {days} days from {from}");
    } else {
        let rows: Vec<MealRow> = meals
            .iter()
            .map(|m| MealRow {
                date: m.date.format("%a %Y-%m-%d").to_string(),
                meal: m.meal_type.clone(),
                what: truncate(&m.label, 40),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }

    for (day, note) in &plan.notes {
        println!("  Note {day}: {note}");
    }
    let extras = extra_titles(plan, &recipes);
    if !extras.is_empty() {
        println!("  Extras: {}", extras.join(", "));
    }
    Ok(())
}

pub(crate) fn cmd_plan_set(
    household: &Household,
    meal_ref: &str,
    recipe: Option<&str>,
    text: Option<&str>,
    json: bool,
) -> Result<()> {
    let (date, meal_type) = parse_meal_ref(meal_ref)?;
    let (assignment, label) = match (recipe, text) {
        (Some(query), None) => {
            let recipe = household.find_recipe(query)?;
            (MealAssignment::recipe(recipe.id), recipe.title)
        }
        (None, Some(text)) if !text.trim().is_empty() => {
            (MealAssignment::text(text.trim()), text.trim().to_string())
        }
        (None, Some(_)) => bail!("Meal text must not be empty"),
        _ => bail!("Provide exactly one of --recipe or --text"),
    };

    let mut view = MealPlanView::load(household)?;
    view.set_meal(date, &meal_type, assignment)?;

    if json {
        print_json(view.plan())?;
    } else {
        println!("Planned {label} for {meal_type} on {date}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove(household: &Household, meal_ref: &str, json: bool) -> Result<()> {
    let (date, meal_type) = parse_meal_ref(meal_ref)?;
    let mut view = MealPlanView::load(household)?;
    let key = larder_core::models::meal_key(date, &meal_type);
    if view.plan().entry(&key).is_none() {
        exit_not_found(&format!("Nothing planned for {meal_type} on {date}"), json);
    }
    view.remove_meal(date, &meal_type)?;

    if json {
        println!("{}", serde_json::json!({ "removed": key }));
    } else {
        println!("Removed {meal_type} on {date} from the plan");
    }
    Ok(())
}

pub(crate) fn cmd_plan_note(
    household: &Household,
    date: Option<String>,
    note: &str,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let mut view = MealPlanView::load(household)?;
    view.set_note(date, note.trim())?;

    if json {
        print_json(view.plan())?;
    } else if note.trim().is_empty() {
        println!("Cleared note for {date}");
    } else {
        println!("Noted for {date}: {}", note.trim());
    }
    Ok(())
}

pub(crate) fn cmd_plan_extra(household: &Household, query: &str, add: bool, json: bool) -> Result<()> {
    let recipe = household.find_recipe(query)?;
    let mut view = MealPlanView::load(household)?;
    let changed = if add {
        view.add_extra(&recipe.id)?
    } else {
        view.remove_extra(&recipe.id)?
    };

    if json {
        return print_json(view.plan());
    }
    let title = &recipe.title;
    match (add, changed) {
        (true, true) => println!("Added {title} to this week's extras"),
        (true, false) => println!("{title} is already an extra"),
        (false, true) => println!("Removed {title} from the extras"),
        (false, false) => exit_not_found(&format!("{title} is not an extra"), false),
    }
    Ok(())
}
