use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::models::{
    CustomItem, DEFAULT_CATEGORY, GroceryItem, GroceryList, MealAssignment, MealPlan, Recipe,
};
use crate::normalize::{normalize_name, normalize_pending_name};

/// Everything the grocery list is derived from, borrowed from its owners.
///
/// `chosen_keys` is walked in the order given; callers that want calendar
/// order sort it first (see [`crate::models::meal_key_order`]).
#[derive(Debug, Clone, Copy)]
pub struct GrocerySnapshot<'a> {
    pub chosen_keys: &'a [String],
    pub serving_overrides: &'a BTreeMap<String, u32>,
    pub meal_plan: &'a MealPlan,
    pub recipes: &'a [Recipe],
    pub custom_items: &'a [CustomItem],
    pub checked_names: &'a BTreeSet<String>,
}

/// Requested vs. nominal servings for one chosen meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingScale {
    pub requested: u32,
    pub base: u32,
}

impl ServingScale {
    #[must_use]
    pub fn for_recipe(recipe: &Recipe, requested: Option<u32>) -> Self {
        let base = recipe.base_servings();
        Self {
            requested: requested.unwrap_or(base),
            base,
        }
    }

    #[must_use]
    pub fn multiplier(self) -> f64 {
        f64::from(self.requested) / f64::from(self.base)
    }

    #[must_use]
    pub fn is_unscaled(self) -> bool {
        self.requested == self.base
    }
}

/// Provenance label shown under an item: the recipe title, plus the person
/// count when the meal is cooked for a different number of people.
#[must_use]
pub fn source_label(recipe: &Recipe, scale: ServingScale) -> String {
    if scale.is_unscaled() {
        recipe.title.clone()
    } else {
        format!("{} ({}👤)", recipe.title, scale.requested)
    }
}

/// Derive the shopping list from a snapshot.
///
/// Pure and deterministic: the same snapshot always yields the same items in
/// the same order. Free-text meals, unknown keys and recipes that no longer
/// resolve contribute nothing.
#[must_use]
pub fn generate_list(snapshot: &GrocerySnapshot<'_>) -> GroceryList {
    let recipes: HashMap<&str, &Recipe> = snapshot
        .recipes
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect();

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut items: Vec<GroceryItem> = Vec::new();

    for key in snapshot.chosen_keys {
        let Some(recipe_id) = snapshot
            .meal_plan
            .entry(key)
            .and_then(MealAssignment::recipe_id)
        else {
            continue;
        };
        let Some(recipe) = recipes.get(recipe_id) else {
            debug!(key = %key, recipe_id, "skipping meal with unresolved recipe");
            continue;
        };

        let scale = ServingScale::for_recipe(recipe, snapshot.serving_overrides.get(key).copied());
        let label = source_label(recipe, scale);

        for ingredient in &recipe.ingredients {
            let normalized = normalize_name(ingredient);
            if normalized.is_empty() {
                continue;
            }
            if let Some(&pos) = positions.get(&normalized) {
                let sources = &mut items[pos].sources;
                if !sources.contains(&label) {
                    sources.push(label.clone());
                }
            } else {
                positions.insert(normalized.clone(), items.len());
                items.push(GroceryItem {
                    name: ingredient.clone(),
                    normalized_name: normalized,
                    category: DEFAULT_CATEGORY.to_string(),
                    sources: vec![label.clone()],
                    checked: false,
                    custom: false,
                });
            }
        }
    }

    let generated = items.len();

    // Manual lines stay separate even when a recipe already needs the same thing.
    items.extend(snapshot.custom_items.iter().map(|custom| GroceryItem {
        name: custom.name.clone(),
        normalized_name: normalize_name(&custom.name),
        category: DEFAULT_CATEGORY.to_string(),
        sources: Vec::new(),
        checked: false,
        custom: true,
    }));

    for item in &mut items {
        item.checked = snapshot.checked_names.contains(&item.normalized_name);
    }

    let present: HashSet<&str> = items.iter().map(|i| i.normalized_name.as_str()).collect();
    let checked_count = snapshot
        .checked_names
        .iter()
        .filter(|name| present.contains(name.as_str()))
        .count();

    GroceryList {
        total_items: generated + snapshot.custom_items.len(),
        checked_count,
        items,
    }
}

/// Number of distinct things still to buy, using the looser pending key.
#[must_use]
pub fn pending_count(items: &[GroceryItem]) -> usize {
    items
        .iter()
        .filter(|i| !i.checked)
        .map(|i| normalize_pending_name(&i.name))
        .collect::<HashSet<_>>()
        .len()
}

/// Plain-text list for the "copy list" action: unchecked items only, recipe
/// items first, then manual ones.
#[must_use]
pub fn shopping_text(items: &[GroceryItem]) -> String {
    let (custom, derived): (Vec<&GroceryItem>, Vec<&GroceryItem>) =
        items.iter().filter(|i| !i.checked).partition(|i| i.custom);
    derived
        .into_iter()
        .chain(custom)
        .fold(String::new(), |mut acc, item| {
            acc.push_str("- ");
            acc.push_str(&item.name);
            acc.push('\n');
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        chosen_keys: Vec<String>,
        serving_overrides: BTreeMap<String, u32>,
        meal_plan: MealPlan,
        recipes: Vec<Recipe>,
        custom_items: Vec<CustomItem>,
        checked_names: BTreeSet<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                chosen_keys: Vec::new(),
                serving_overrides: BTreeMap::new(),
                meal_plan: MealPlan::default(),
                recipes: Vec::new(),
                custom_items: Vec::new(),
                checked_names: BTreeSet::new(),
            }
        }

        fn recipe(mut self, id: &str, title: &str, servings: Option<u32>, ingredients: &[&str]) -> Self {
            self.recipes.push(Recipe {
                id: id.to_string(),
                title: title.to_string(),
                ingredients: ingredients.iter().map(|s| (*s).to_string()).collect(),
                servings,
            });
            self
        }

        fn plan(mut self, key: &str, assignment: MealAssignment) -> Self {
            self.meal_plan.meals.insert(key.to_string(), assignment);
            self
        }

        fn choose(mut self, key: &str) -> Self {
            self.chosen_keys.push(key.to_string());
            self
        }

        fn servings(mut self, key: &str, servings: u32) -> Self {
            self.serving_overrides.insert(key.to_string(), servings);
            self
        }

        fn custom(mut self, name: &str) -> Self {
            self.custom_items.push(CustomItem {
                name: name.to_string(),
            });
            self
        }

        fn checked(mut self, name: &str) -> Self {
            self.checked_names.insert(name.to_string());
            self
        }

        fn generate(&self) -> GroceryList {
            generate_list(&GrocerySnapshot {
                chosen_keys: &self.chosen_keys,
                serving_overrides: &self.serving_overrides,
                meal_plan: &self.meal_plan,
                recipes: &self.recipes,
                custom_items: &self.custom_items,
                checked_names: &self.checked_names,
            })
        }
    }

    fn pasta_fixture() -> Fixture {
        Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Tomato", "2 onions"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("r1"))
            .choose("2025-01-04_lunch")
            .servings("2025-01-04_lunch", 4)
    }

    #[test]
    fn test_scaled_recipe_sources() {
        let list = pasta_fixture().generate();

        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].name, "Tomato");
        assert_eq!(list.items[0].sources, vec!["Pasta (4👤)"]);
        assert_eq!(list.items[1].name, "2 onions");
        assert_eq!(list.items[1].sources, vec!["Pasta (4👤)"]);
        assert_eq!(list.total_items, 2);
        assert_eq!(list.checked_count, 0);
    }

    #[test]
    fn test_unscaled_label_has_no_person_count() {
        let list = pasta_fixture()
            .servings("2025-01-04_lunch", 2)
            .generate();
        assert_eq!(list.items[0].sources, vec!["Pasta"]);
    }

    #[test]
    fn test_missing_override_uses_recipe_servings() {
        let mut fixture = pasta_fixture();
        fixture.serving_overrides.clear();
        let list = fixture.generate();
        assert_eq!(list.items[0].sources, vec!["Pasta"]);
    }

    #[test]
    fn test_recipe_without_servings_defaults_to_two() {
        let list = Fixture::new()
            .recipe("r1", "Stew", None, &["Beef"])
            .plan("2025-01-04_dinner", MealAssignment::recipe("r1"))
            .choose("2025-01-04_dinner")
            .servings("2025-01-04_dinner", 3)
            .generate();
        assert_eq!(list.items[0].sources, vec!["Stew (3👤)"]);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let fixture = Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Tomato", "Garlic"])
            .recipe("r2", "Curry", Some(4), &["garlic", "Rice"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("r1"))
            .plan("2025-01-05_dinner", MealAssignment::recipe("r2"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-05_dinner")
            .custom("Milk")
            .checked("rice");

        assert_eq!(fixture.generate(), fixture.generate());
    }

    #[test]
    fn test_case_insensitive_dedup_keeps_both_sources() {
        let list = Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Garlic"])
            .recipe("r2", "Curry", Some(4), &["garlic "])
            .plan("2025-01-04_lunch", MealAssignment::recipe("r1"))
            .plan("2025-01-05_dinner", MealAssignment::recipe("r2"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-05_dinner")
            .generate();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].name, "Garlic");
        assert_eq!(list.items[0].normalized_name, "garlic");
        assert_eq!(list.items[0].sources, vec!["Pasta", "Curry"]);
    }

    #[test]
    fn test_same_recipe_twice_does_not_repeat_label() {
        let list = Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Garlic", "garlic"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("r1"))
            .plan("2025-01-06_lunch", MealAssignment::recipe("r1"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-06_lunch")
            .generate();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].sources, vec!["Pasta"]);
    }

    #[test]
    fn test_deselecting_removes_only_unique_ingredients() {
        let both = Fixture::new()
            .recipe("a", "Pasta", Some(2), &["Tomato", "Basil"])
            .recipe("b", "Salad", Some(2), &["tomato", "Lettuce"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("a"))
            .plan("2025-01-04_dinner", MealAssignment::recipe("b"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-04_dinner");
        let list = both.generate();
        assert_eq!(list.sources_for("tomato").unwrap(), ["Pasta", "Salad"]);

        let mut only_b = both;
        only_b.chosen_keys.retain(|k| k != "2025-01-04_lunch");
        let list = only_b.generate();

        let names: Vec<&str> = list.items.iter().map(|i| i.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["tomato", "lettuce"]);
        assert_eq!(list.sources_for("tomato").unwrap(), ["Salad"]);
        // First raw text seen now comes from the remaining recipe.
        assert_eq!(list.items[0].name, "tomato");
    }

    #[test]
    fn test_caller_order_is_preserved() {
        let fixture = Fixture::new()
            .recipe("a", "Pasta", Some(2), &["Tomato"])
            .recipe("b", "Salad", Some(2), &["Lettuce"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("a"))
            .plan("2025-01-03_lunch", MealAssignment::recipe("b"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-03_lunch");

        let list = fixture.generate();
        assert_eq!(list.items[0].name, "Tomato");
        assert_eq!(list.items[1].name, "Lettuce");
    }

    #[test]
    fn test_free_text_and_unplanned_keys_contribute_nothing() {
        let list = Fixture::new()
            .plan("2025-01-04_lunch", MealAssignment::text("Leftovers"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-09_dinner")
            .generate();
        assert!(list.items.is_empty());
        assert_eq!(list.total_items, 0);
    }

    #[test]
    fn test_dangling_recipe_is_skipped() {
        let list = Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Tomato"])
            .plan("2025-01-04_lunch", MealAssignment::recipe("deleted"))
            .plan("2025-01-05_lunch", MealAssignment::recipe("r1"))
            .choose("2025-01-04_lunch")
            .choose("2025-01-05_lunch")
            .generate();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].name, "Tomato");
    }

    #[test]
    fn test_custom_item_checked() {
        let list = Fixture::new().custom("Milk").checked("milk").generate();

        assert_eq!(list.total_items, 1);
        assert_eq!(list.checked_count, 1);
        assert_eq!(list.items[0].name, "Milk");
        assert!(list.items[0].checked);
        assert!(list.items[0].custom);
        assert!(list.items[0].sources.is_empty());
    }

    #[test]
    fn test_custom_item_not_merged_with_recipe_item() {
        let list = pasta_fixture().custom("tomato").generate();

        assert_eq!(list.items.len(), 3);
        assert_eq!(list.total_items, 3);
        assert!(!list.items[0].custom);
        assert!(list.items[2].custom);
        assert_eq!(list.items[0].normalized_name, list.items[2].normalized_name);
    }

    #[test]
    fn test_checked_count_ignores_absent_names() {
        let list = pasta_fixture()
            .checked("tomato")
            .checked("flour")
            .generate();

        assert_eq!(list.checked_count, 1);
        assert!(list.items[0].checked);
        assert!(!list.items[1].checked);
    }

    #[test]
    fn test_blank_ingredients_are_skipped() {
        let list = Fixture::new()
            .recipe("r1", "Pasta", Some(2), &["Tomato", "   "])
            .plan("2025-01-04_lunch", MealAssignment::recipe("r1"))
            .choose("2025-01-04_lunch")
            .generate();
        assert_eq!(list.total_items, 1);
    }

    #[test]
    fn test_serving_scale_multiplier() {
        let recipe = Recipe {
            id: "r1".to_string(),
            title: "Pasta".to_string(),
            ingredients: vec![],
            servings: Some(4),
        };
        let scale = ServingScale::for_recipe(&recipe, Some(6));
        assert!((scale.multiplier() - 1.5).abs() < f64::EPSILON);
        assert!(!scale.is_unscaled());
        assert!(ServingScale::for_recipe(&recipe, None).is_unscaled());
    }

    #[test]
    fn test_pending_count_uses_loose_key() {
        let list = Fixture::new()
            .recipe(
                "r1",
                "Tart",
                Some(2),
                &["Sugar (step 2)", "Sugar for the filling", "Butter", "Eggs"],
            )
            .plan("2025-01-04_dinner", MealAssignment::recipe("r1"))
            .choose("2025-01-04_dinner")
            .checked("eggs")
            .generate();

        // The shopping list keeps the two sugar lines apart...
        assert_eq!(list.total_items, 4);
        // ...while the pending count treats them as one thing to buy.
        assert_eq!(pending_count(&list.items), 2);
    }

    #[test]
    fn test_shopping_text_lists_unchecked_recipe_items_first() {
        let list = pasta_fixture()
            .custom("Milk")
            .custom("Bread")
            .checked("bread")
            .generate();

        // Manual items first in the input; output still leads with recipe items.
        let mut items = list.items.clone();
        items.rotate_left(2);
        assert_eq!(shopping_text(&items), "- Tomato\n- 2 onions\n- Milk\n");
    }
}
