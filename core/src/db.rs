use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::household::{AtHomeSet, HouseholdPreferences};
use crate::meal_plan::MealPlanStore;
use crate::models::{
    AtHomeItem, MealAssignment, MealPlan, NewRecipe, Recipe, validate_meal_type, validate_new_recipe,
};
use crate::normalize::normalize_name;
use crate::service::RecipeStore;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    servings INTEGER CHECK (servings IS NULL OR servings > 0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    PRIMARY KEY (recipe_id, position)
                );

                CREATE TABLE IF NOT EXISTS meal_plan (
                    date TEXT NOT NULL,
                    meal_type TEXT NOT NULL,
                    recipe_id TEXT,
                    custom_text TEXT,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (date, meal_type),
                    CHECK (recipe_id IS NOT NULL OR custom_text IS NOT NULL)
                );

                CREATE TABLE IF NOT EXISTS meal_plan_notes (
                    date TEXT PRIMARY KEY,
                    note TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plan_extras (
                    position INTEGER PRIMARY KEY,
                    recipe_id TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS at_home (
                    normalized_name TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    added_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS local_records (
                    name TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    revision INTEGER NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        validate_new_recipe(recipe)?;
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        let title = recipe.title.trim().to_string();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO recipes (id, title, servings, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, title, recipe.servings, now, now],
        )?;
        for (position, text) in recipe.ingredients.iter().enumerate() {
            tx.execute(
                "INSERT INTO recipe_ingredients (recipe_id, position, text) VALUES (?1, ?2, ?3)",
                params![id, position as i64, text],
            )?;
        }
        tx.commit()?;

        Ok(Recipe {
            id,
            title,
            ingredients: recipe.ingredients.clone(),
            servings: recipe.servings,
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Recipe> {
        let (id, title, servings) = self
            .conn
            .query_row(
                "SELECT id, title, servings FROM recipes WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<u32>>(2)?,
                    ))
                },
            )
            .context("Recipe not found")?;
        let ingredients = self.get_recipe_ingredients(&id)?;
        Ok(Recipe {
            id,
            title,
            ingredients,
            servings,
        })
    }

    /// Look a recipe up by id, falling back to a case-insensitive title match.
    pub fn find_recipe(&self, query: &str) -> Result<Recipe> {
        if let Ok(recipe) = self.get_recipe(query) {
            return Ok(recipe);
        }
        let ids: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM recipes WHERE LOWER(title) = LOWER(?1) ORDER BY created_at")?;
            stmt.query_map(params![query.trim()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        match ids.as_slice() {
            [] => bail!("Recipe '{query}' not found"),
            [id] => self.get_recipe(id),
            _ => bail!("Several recipes are titled '{query}'. Use the recipe id instead"),
        }
    }

    fn get_recipe_ingredients(&self, recipe_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT text FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY position",
        )?;
        let ingredients = stmt
            .query_map(params![recipe_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ingredients)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let rows: Vec<(String, String, Option<u32>)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, title, servings FROM recipes ORDER BY title COLLATE NOCASE, id")?;
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut ingredients: BTreeMap<String, Vec<String>> = BTreeMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT recipe_id, text FROM recipe_ingredients ORDER BY recipe_id, position")?;
            let pairs = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for pair in pairs {
                let (recipe_id, text) = pair?;
                ingredients.entry(recipe_id).or_default().push(text);
            }
        }

        Ok(rows
            .into_iter()
            .map(|(id, title, servings)| Recipe {
                ingredients: ingredients.remove(&id).unwrap_or_default(),
                id,
                title,
                servings,
            })
            .collect())
    }

    /// Deleting a recipe leaves any meal-plan slot pointing at it in place;
    /// those slots simply stop contributing to the grocery list.
    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Meal plan ---

    pub fn get_meal_plan(&self) -> Result<MealPlan> {
        let mut plan = MealPlan::default();

        {
            let mut stmt = self.conn.prepare(
                "SELECT date, meal_type, recipe_id, custom_text FROM meal_plan ORDER BY date, meal_type",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            for row in rows {
                let (date, meal_type, recipe_id, custom_text) = row?;
                let assignment = match (recipe_id, custom_text) {
                    (Some(recipe_id), _) => MealAssignment::RecipeRef { recipe_id },
                    (None, Some(custom_text)) => MealAssignment::FreeText { custom_text },
                    (None, None) => continue,
                };
                plan.meals.insert(format!("{date}_{meal_type}"), assignment);
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare("SELECT date, note FROM meal_plan_notes ORDER BY date")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (date, note) = row?;
                plan.notes.insert(date, note);
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare("SELECT recipe_id FROM meal_plan_extras ORDER BY position")?;
            plan.extras = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
        }

        Ok(plan)
    }

    pub fn upsert_meal(
        &self,
        date: NaiveDate,
        meal_type: &str,
        assignment: &MealAssignment,
    ) -> Result<()> {
        let meal_type = validate_meal_type(meal_type)?;
        let now = Local::now().to_rfc3339();
        let (recipe_id, custom_text) = match assignment {
            MealAssignment::RecipeRef { recipe_id } => (Some(recipe_id.as_str()), None),
            MealAssignment::FreeText { custom_text } => {
                if custom_text.trim().is_empty() {
                    bail!("Meal text must not be empty");
                }
                (None, Some(custom_text.as_str()))
            }
        };
        self.conn.execute(
            "INSERT INTO meal_plan (date, meal_type, recipe_id, custom_text, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(date, meal_type) DO UPDATE SET
                recipe_id = excluded.recipe_id,
                custom_text = excluded.custom_text,
                updated_at = excluded.updated_at",
            params![date.format("%Y-%m-%d").to_string(), meal_type, recipe_id, custom_text, now],
        )?;
        Ok(())
    }

    /// Returns false when the slot was already empty.
    pub fn delete_meal(&self, date: NaiveDate, meal_type: &str) -> Result<bool> {
        let meal_type = validate_meal_type(meal_type)?;
        let rows = self.conn.execute(
            "DELETE FROM meal_plan WHERE date = ?1 AND meal_type = ?2",
            params![date.format("%Y-%m-%d").to_string(), meal_type],
        )?;
        Ok(rows > 0)
    }

    /// An empty note removes the note for that day.
    pub fn upsert_note(&self, date: NaiveDate, note: &str) -> Result<()> {
        let date = date.format("%Y-%m-%d").to_string();
        if note.trim().is_empty() {
            self.conn
                .execute("DELETE FROM meal_plan_notes WHERE date = ?1", params![date])?;
        } else {
            self.conn.execute(
                "INSERT INTO meal_plan_notes (date, note) VALUES (?1, ?2)
                 ON CONFLICT(date) DO UPDATE SET note = excluded.note",
                params![date, note],
            )?;
        }
        Ok(())
    }

    pub fn replace_extras(&self, extras: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM meal_plan_extras", [])?;
        for (position, recipe_id) in extras.iter().enumerate() {
            tx.execute(
                "INSERT INTO meal_plan_extras (position, recipe_id) VALUES (?1, ?2)",
                params![position as i64, recipe_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // --- At home ---

    /// Returns false when the item was already on the list.
    pub fn add_at_home(&self, name: &str) -> Result<bool> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            bail!("Item name must not be empty");
        }
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "INSERT INTO at_home (normalized_name, name, added_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(normalized_name) DO NOTHING",
            params![normalized, name.trim(), now],
        )?;
        Ok(rows > 0)
    }

    pub fn remove_at_home(&self, name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM at_home WHERE normalized_name = ?1",
            params![normalize_name(name)],
        )?;
        Ok(rows > 0)
    }

    pub fn list_at_home(&self) -> Result<Vec<AtHomeItem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT normalized_name, name, added_at FROM at_home ORDER BY normalized_name")?;
        let items = stmt
            .query_map([], |row| {
                Ok(AtHomeItem {
                    normalized_name: row.get(0)?,
                    name: row.get(1)?,
                    added_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // --- Local records ---

    pub fn read_local_record(&self, name: &str) -> Result<Option<(String, u64)>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, revision FROM local_records WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.map(|(payload, revision)| (payload, u64::try_from(revision).unwrap_or(0))))
    }

    /// Store a record unless a newer (or equal) revision is already on disk.
    /// Returns whether the write was applied.
    pub fn write_local_record(&self, name: &str, revision: u64, payload: &str) -> Result<bool> {
        self.write_local_records(&[(name, revision, payload)])
    }

    /// Store `(name, revision, payload)` rows in one transaction. If any row
    /// is not newer than what is on disk nothing is written and the result is
    /// `false`.
    pub fn write_local_records(&self, rows: &[(&str, u64, &str)]) -> Result<bool> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        for &(name, revision, payload) in rows {
            let revision = i64::try_from(revision).context("Record revision out of range")?;
            let applied = tx.execute(
                "INSERT INTO local_records (name, payload, revision, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    payload = excluded.payload,
                    revision = excluded.revision,
                    updated_at = excluded.updated_at
                 WHERE excluded.revision > local_records.revision",
                params![name, payload, revision, now],
            )?;
            if applied == 0 {
                // Dropping the transaction rolls back rows already written.
                return Ok(false);
            }
        }
        tx.commit()?;
        Ok(true)
    }
}

impl RecipeStore for Database {
    fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Database::list_recipes(self)
    }
}

impl MealPlanStore for Database {
    fn get_meal_plan(&self) -> Result<MealPlan> {
        Database::get_meal_plan(self)
    }

    fn set_meal(
        &self,
        date: NaiveDate,
        meal_type: &str,
        assignment: &MealAssignment,
    ) -> Result<MealPlan> {
        self.upsert_meal(date, meal_type, assignment)?;
        self.get_meal_plan()
    }

    fn remove_meal(&self, date: NaiveDate, meal_type: &str) -> Result<MealPlan> {
        self.delete_meal(date, meal_type)?;
        self.get_meal_plan()
    }

    fn set_note(&self, date: NaiveDate, note: &str) -> Result<MealPlan> {
        self.upsert_note(date, note)?;
        self.get_meal_plan()
    }

    fn set_extras(&self, extras: &[String]) -> Result<MealPlan> {
        self.replace_extras(extras)?;
        self.get_meal_plan()
    }
}

impl HouseholdPreferences for Database {
    fn at_home(&self) -> Result<AtHomeSet> {
        Ok(self
            .list_at_home()?
            .into_iter()
            .map(|item| item.normalized_name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            title: "Pasta".to_string(),
            ingredients: vec!["Tomato".to_string(), "2 onions".to_string()],
            servings: Some(2),
        }
    }

    #[test]
    fn test_create_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        assert_eq!(recipe.title, "Pasta");
        assert_eq!(recipe.servings, Some(2));

        let fetched = db.get_recipe(&recipe.id).unwrap();
        assert_eq!(fetched, recipe);
        assert_eq!(fetched.ingredients, vec!["Tomato", "2 onions"]);
    }

    #[test]
    fn test_create_recipe_rejects_blank_title() {
        let db = Database::open_in_memory().unwrap();
        let mut recipe = sample_recipe();
        recipe.title = "  ".to_string();
        assert!(db.create_recipe(&recipe).is_err());
    }

    #[test]
    fn test_find_recipe_by_title_or_id() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        assert_eq!(db.find_recipe("pasta").unwrap().id, recipe.id);
        assert_eq!(db.find_recipe(&recipe.id).unwrap().id, recipe.id);
        assert!(db.find_recipe("Soup").is_err());
    }

    #[test]
    fn test_find_recipe_ambiguous_title() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe(&sample_recipe()).unwrap();
        db.create_recipe(&sample_recipe()).unwrap();
        assert!(db.find_recipe("Pasta").is_err());
    }

    #[test]
    fn test_list_recipes_keeps_ingredient_order() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe(&NewRecipe {
            title: "soup".to_string(),
            ingredients: vec!["Water".to_string(), "Leek".to_string(), "Salt".to_string()],
            servings: None,
        })
        .unwrap();
        db.create_recipe(&sample_recipe()).unwrap();

        let recipes = db.list_recipes().unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].title, "Pasta");
        assert_eq!(recipes[1].title, "soup");
        assert_eq!(recipes[1].ingredients, vec!["Water", "Leek", "Salt"]);
        assert_eq!(recipes[1].servings, None);
    }

    #[test]
    fn test_delete_recipe_cascades_ingredients() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        assert!(db.delete_recipe(&recipe.id).unwrap());
        assert!(!db.delete_recipe(&recipe.id).unwrap());
        assert!(db.get_recipe(&recipe.id).is_err());
        assert!(db.get_recipe_ingredients(&recipe.id).unwrap().is_empty());
    }

    #[test]
    fn test_meal_plan_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        db.upsert_meal(date("2025-01-04"), "lunch", &MealAssignment::recipe(&recipe.id))
            .unwrap();
        db.upsert_meal(date("2025-01-04"), "Dinner", &MealAssignment::text("Leftovers"))
            .unwrap();
        db.upsert_note(date("2025-01-04"), "Guests over").unwrap();
        db.replace_extras(&[recipe.id.clone()]).unwrap();

        let plan = db.get_meal_plan().unwrap();
        assert_eq!(
            plan.entry("2025-01-04_lunch"),
            Some(&MealAssignment::recipe(&recipe.id))
        );
        assert_eq!(
            plan.entry("2025-01-04_dinner"),
            Some(&MealAssignment::text("Leftovers"))
        );
        assert_eq!(plan.notes.get("2025-01-04").map(String::as_str), Some("Guests over"));
        assert_eq!(plan.extras, vec![recipe.id]);
    }

    #[test]
    fn test_upsert_meal_replaces_slot() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_meal(date("2025-01-04"), "lunch", &MealAssignment::text("Soup"))
            .unwrap();
        db.upsert_meal(date("2025-01-04"), "lunch", &MealAssignment::recipe("r1"))
            .unwrap();

        let plan = db.get_meal_plan().unwrap();
        assert_eq!(plan.meals.len(), 1);
        assert_eq!(
            plan.entry("2025-01-04_lunch"),
            Some(&MealAssignment::recipe("r1"))
        );
    }

    #[test]
    fn test_upsert_meal_validates() {
        let db = Database::open_in_memory().unwrap();
        assert!(
            db.upsert_meal(date("2025-01-04"), "brunch", &MealAssignment::text("Eggs"))
                .is_err()
        );
        assert!(
            db.upsert_meal(date("2025-01-04"), "lunch", &MealAssignment::text(" "))
                .is_err()
        );
    }

    #[test]
    fn test_delete_meal_missing_slot() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_meal(date("2025-01-04"), "lunch", &MealAssignment::text("Soup"))
            .unwrap();
        assert!(db.delete_meal(date("2025-01-04"), "lunch").unwrap());
        assert!(!db.delete_meal(date("2025-01-04"), "lunch").unwrap());
    }

    #[test]
    fn test_empty_note_removes_note() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_note(date("2025-01-04"), "Guests").unwrap();
        db.upsert_note(date("2025-01-04"), "").unwrap();
        assert!(db.get_meal_plan().unwrap().notes.is_empty());
    }

    #[test]
    fn test_store_mutations_return_authoritative_plan() {
        let db = Database::open_in_memory().unwrap();
        let plan = db
            .set_meal(date("2025-01-04"), "lunch", &MealAssignment::text("Soup"))
            .unwrap();
        assert_eq!(plan.meals.len(), 1);

        let plan = MealPlanStore::remove_meal(&db, date("2025-01-04"), "lunch").unwrap();
        assert!(plan.meals.is_empty());
    }

    #[test]
    fn test_at_home_crud() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.add_at_home("Olive Oil").unwrap());
        assert!(!db.add_at_home(" olive oil ").unwrap());
        assert!(db.add_at_home("Salt").unwrap());
        assert!(db.add_at_home("  ").is_err());

        let items = db.list_at_home().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].normalized_name, "olive oil");
        assert_eq!(items[0].name, "Olive Oil");

        let set = db.at_home().unwrap();
        assert!(set.is_at_home("SALT"));

        assert!(db.remove_at_home("salt").unwrap());
        assert!(!db.remove_at_home("salt").unwrap());
    }

    #[test]
    fn test_local_record_revision_guard() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.read_local_record("selection").unwrap().is_none());

        assert!(db.write_local_record("selection", 2, "{\"v\":2}").unwrap());
        // Older or equal revisions never overwrite.
        assert!(!db.write_local_record("selection", 1, "{\"v\":1}").unwrap());
        assert!(!db.write_local_record("selection", 2, "{\"v\":0}").unwrap());

        let (payload, revision) = db.read_local_record("selection").unwrap().unwrap();
        assert_eq!(payload, "{\"v\":2}");
        assert_eq!(revision, 2);

        assert!(db.write_local_record("selection", 3, "{\"v\":3}").unwrap());
        assert_eq!(db.read_local_record("selection").unwrap().unwrap().1, 3);
    }

    #[test]
    fn test_local_records_batch_rolls_back_on_stale_row() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.write_local_record("checked_names", 4, "[]").unwrap());

        let applied = db
            .write_local_records(&[
                ("selection", 1, "{}"),
                ("custom_items", 1, "[]"),
                ("checked_names", 4, "[\"milk\"]"),
            ])
            .unwrap();
        assert!(!applied);
        assert!(db.read_local_record("selection").unwrap().is_none());
        assert!(db.read_local_record("custom_items").unwrap().is_none());
        assert_eq!(db.read_local_record("checked_names").unwrap().unwrap().0, "[]");
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("household.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_recipe(&sample_recipe()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_recipes().unwrap().len(), 1);
    }
}
