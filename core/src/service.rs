use anyhow::Result;
use tracing::warn;

use crate::error::SyncError;
use crate::grocery::{self, GrocerySnapshot};
use crate::household::{AtHomeSet, HouseholdPreferences, filter_at_home};
use crate::meal_plan::{MealPlanStore, MealPlanView};
use crate::models::{AtHomeView, GroceryList, Recipe, meal_key_order};
use crate::records::{LocalRecords, RecordStore};
use crate::selection::SelectionCoordinator;

/// Catalog of recipes the meal plan can point at.
///
/// Local sqlite on a single device, the household server over HTTP when
/// several devices share a plan. Called synchronously; callers on a UI thread
/// should move calls to a background thread.
pub trait RecipeStore {
    fn list_recipes(&self) -> Result<Vec<Recipe>>;
}

/// The grocery screen: the shared meal plan, the recipe catalog, household
/// preferences and this device's selection, combined into one list.
///
/// Remote state is cached and only re-read on [`refresh`](Self::refresh), so
/// every list computation works on a consistent snapshot.
pub struct GroceryService<'a, S> {
    selection: SelectionCoordinator<S>,
    meal_plan: MealPlanView<'a>,
    recipe_store: &'a dyn RecipeStore,
    preferences: &'a dyn HouseholdPreferences,
    recipes: Vec<Recipe>,
    at_home: AtHomeSet,
}

impl<'a, S: RecordStore> GroceryService<'a, S> {
    pub fn open(
        records: S,
        meal_plan: &'a dyn MealPlanStore,
        recipe_store: &'a dyn RecipeStore,
        preferences: &'a dyn HouseholdPreferences,
    ) -> Result<Self> {
        Ok(Self {
            selection: SelectionCoordinator::open(records)?,
            meal_plan: MealPlanView::load(meal_plan)?,
            recipes: recipe_store.list_recipes()?,
            at_home: preferences.at_home()?,
            recipe_store,
            preferences,
        })
    }

    /// Re-read every tier, e.g. when the grocery screen regains focus.
    pub fn refresh(&mut self) -> Result<()> {
        self.selection.refresh()?;
        self.meal_plan.refresh()?;
        self.recipes = self.recipe_store.list_recipes()?;
        match self.preferences.at_home() {
            Ok(at_home) => self.at_home = at_home,
            // Display filter only; a stale set is better than no list.
            Err(err) => warn!(error = %err, "could not reload at-home items, keeping previous"),
        }
        Ok(())
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionCoordinator<S> {
        &self.selection
    }

    #[must_use]
    pub fn meal_plan(&self) -> &MealPlanView<'a> {
        &self.meal_plan
    }

    pub fn meal_plan_mut(&mut self) -> &mut MealPlanView<'a> {
        &mut self.meal_plan
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    #[must_use]
    pub fn at_home(&self) -> &AtHomeSet {
        &self.at_home
    }

    fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Chosen keys in calendar order, so the list reads like the week.
    #[must_use]
    pub fn ordered_chosen_keys(records: &LocalRecords) -> Vec<String> {
        let mut keys = records.selection.chosen_keys.clone();
        keys.sort_by_key(|k| meal_key_order(k));
        keys
    }

    #[must_use]
    pub fn grocery_list(&self) -> GroceryList {
        let records = self.selection.snapshot();
        let chosen_keys = Self::ordered_chosen_keys(&records);
        grocery::generate_list(&GrocerySnapshot {
            chosen_keys: &chosen_keys,
            serving_overrides: &records.selection.serving_overrides,
            meal_plan: self.meal_plan.plan(),
            recipes: &self.recipes,
            custom_items: &records.custom_items,
            checked_names: &records.checked_names,
        })
    }

    #[must_use]
    pub fn to_buy(&self) -> AtHomeView {
        filter_at_home(&self.grocery_list().items, &self.at_home)
    }

    /// Items still needed, for the home screen badge.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        grocery::pending_count(&self.to_buy().items_to_buy)
    }

    #[must_use]
    pub fn shopping_text(&self) -> String {
        grocery::shopping_text(&self.to_buy().items_to_buy)
    }

    /// Chosen keys that no longer contribute anything: the slot was unset or
    /// its recipe deleted. They stay selected until the user drops them.
    #[must_use]
    pub fn dangling_keys(&self) -> Vec<String> {
        let records = self.selection.snapshot();
        Self::ordered_chosen_keys(&records)
            .into_iter()
            .filter(|key| match self.meal_plan.plan().entry(key) {
                None => true,
                Some(entry) => entry.recipe_id().is_some_and(|id| self.recipe(id).is_none()),
            })
            .collect()
    }

    /// Toggle a planned meal on the list, starting from the recipe's own
    /// serving count.
    pub fn toggle_selection(&self, key: &str) -> Result<bool> {
        let servings = self
            .meal_plan
            .plan()
            .entry(key)
            .and_then(|entry| entry.recipe_id())
            .and_then(|id| self.recipe(id))
            .and_then(|recipe| recipe.servings);
        self.selection.toggle_selection(key, servings)
    }

    pub fn clear_all(&mut self) -> Result<usize, SyncError> {
        self.selection.clear_all(&mut self.meal_plan)
    }
}
