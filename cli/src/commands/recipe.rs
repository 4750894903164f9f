use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::household::Household;
use larder_core::models::{NewRecipe, Recipe};
use larder_core::service::RecipeStore;

use super::helpers::{exit_not_found, print_json, truncate};

pub(crate) fn cmd_recipe_add(
    household: &Household,
    title: &str,
    ingredients: Vec<String>,
    servings: Option<u32>,
    json: bool,
) -> Result<()> {
    let ingredients: Vec<String> = ingredients
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    let recipe = household.create_recipe(&NewRecipe {
        title: title.to_string(),
        ingredients,
        servings,
    })?;
    if json {
        print_json(&recipe)?;
    } else {
        let id = &recipe.id;
        let count = recipe.ingredients.len();
        println!("Created recipe: {} (id: {id}, {count} ingredients)", recipe.title);
        println!("Plan it with: larder plan set <date:meal> --recipe \"{}\"", recipe.title);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(household: &Household, query: &str, json: bool) -> Result<()> {
    let recipe = household.find_recipe(query)?;

    if json {
        return print_json(&recipe);
    }

    println!("=== {} ===", recipe.title);
    match recipe.servings {
        Some(n) => println!("  Serves: {n}  |  id: {}\n", recipe.id),
        None => println!("  Serves: not set  |  id: {}\n", recipe.id),
    }
    println!("  INGREDIENTS:");
    for ingredient in &recipe.ingredients {
        println!("    {ingredient}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(household: &Household, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Serves")]
        servings: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let recipes = household.list_recipes()?;
    if recipes.is_empty() {
        if json {
            println!("[]");
            return Ok(());
        }
        exit_not_found("No recipes found", false);
    }

    if json {
        return print_json(&recipes);
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: truncate(&r.id, 11),
            title: truncate(&r.title, 35),
            servings: r.servings.map_or("-".into(), |n| n.to_string()),
            ingredients: r.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_delete(household: &Household, query: &str, json: bool) -> Result<()> {
    let recipe = household.find_recipe(query)?;
    if !household.delete_recipe(&recipe.id)? {
        exit_not_found(&format!("Recipe '{query}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.id }));
    } else {
        println!("Deleted recipe: {}", recipe.title);
        println!("Meals planned with it stay on the plan but no longer add groceries");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    household: &Household,
    file: &std::path::Path,
    title_override: Option<String>,
    servings_override: Option<u32>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let recipe = parse_cooklang(&input, file, title_override, servings_override)?;
    let created = household.create_recipe(&recipe)?;

    if json {
        print_json(&created)?;
    } else {
        print_imported(&created);
    }
    Ok(())
}

fn print_imported(recipe: &Recipe) {
    let count = recipe.ingredients.len();
    let serves = recipe
        .servings
        .map_or_else(String::new, |n| format!(", serves {n}"));
    println!("Imported recipe: {} ({count} ingredients{serves})", recipe.title);
}

/// Turn a Cooklang file into a recipe whose ingredients read like a shopping
/// line: amount, unit, then name.
#[allow(clippy::cast_sign_loss)]
fn parse_cooklang(
    input: &str,
    file: &std::path::Path,
    title_override: Option<String>,
    servings_override: Option<u32>,
) -> Result<NewRecipe> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = title_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe title. Use --title to specify one")?;

    let servings = servings_override.or_else(|| {
        recipe_data
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(f64::from))
            .filter(|n| *n >= 1.0)
            .map(|n| n.round() as u32)
    });

    let converter = cooklang::Converter::default();
    let ingredients: Vec<String> = recipe_data
        .group_ingredients(&converter)
        .iter()
        .map(|gi| cooklang_ingredient_line(gi))
        .collect();

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    Ok(NewRecipe {
        title,
        ingredients,
        servings,
    })
}

fn cooklang_ingredient_line(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> String {
    // Only the first quantity; the list is for shopping, not cooking.
    let (amount, unit) = gi
        .quantity
        .iter()
        .next()
        .map_or((None, None), |qty: &cooklang::Quantity| {
            let amount = match qty.value() {
                cooklang::Value::Number(n) => format_amount(n.value()),
                cooklang::Value::Range { start, end } => {
                    format!("{}-{}", format_amount(start.value()), format_amount(end.value()))
                }
                cooklang::Value::Text(t) => t.clone(),
            };
            (Some(amount), qty.unit().map(String::from))
        });
    ingredient_line(&gi.ingredient.display_name().to_string(), amount, unit)
}

fn ingredient_line(name: &str, amount: Option<String>, unit: Option<String>) -> String {
    [amount, unit, Some(name.to_string())]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_line() {
        assert_eq!(
            ingredient_line("spaghetti", Some("200".into()), Some("g".into())),
            "200 g spaghetti"
        );
        assert_eq!(ingredient_line("eggs", Some("3".into()), None), "3 eggs");
        assert_eq!(ingredient_line("salt", None, None), "salt");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2.0), "2");
        assert_eq!(format_amount(0.5), "0.5");
        assert_eq!(format_amount(1.25), "1.25");
    }

    #[test]
    fn test_parse_cooklang_recipe() {
        let input = "---\ntitle: Pancakes\nservings: 4\n---\n\
                     Mix @flour{200%g} with @eggs{3} and a pinch of @salt{}.\n";
        let recipe = parse_cooklang(input, std::path::Path::new("pancakes.cook"), None, None).unwrap();

        assert_eq!(recipe.title, "Pancakes");
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.ingredients, vec!["200 g flour", "3 eggs", "salt"]);
    }

    #[test]
    fn test_parse_cooklang_overrides_and_file_stem() {
        let input = "Boil @water{1%l}.\n";
        let recipe = parse_cooklang(input, std::path::Path::new("tea.cook"), None, Some(2)).unwrap();
        assert_eq!(recipe.title, "tea");
        assert_eq!(recipe.servings, Some(2));

        let recipe = parse_cooklang(
            input,
            std::path::Path::new("tea.cook"),
            Some("Green tea".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(recipe.title, "Green tea");
        assert_eq!(recipe.servings, None);
    }

    #[test]
    fn test_parse_cooklang_without_ingredients_fails() {
        let input = "Just stir.\n";
        assert!(parse_cooklang(input, std::path::Path::new("x.cook"), None, None).is_err());
    }
}
