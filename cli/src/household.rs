use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use larder_core::db::Database;
use larder_core::household::{AtHomeSet, HouseholdPreferences};
use larder_core::meal_plan::MealPlanStore;
use larder_core::models::{AtHomeItem, MealAssignment, MealPlan, NewRecipe, Recipe};
use larder_core::service::RecipeStore;

/// HTTP client for a `larder serve` instance shared by the household.
///
/// Blocking, since the core store traits are synchronous. The CLI only
/// starts a runtime for `serve`.
pub struct HouseholdClient {
    client: Client,
    base_url: reqwest::Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HouseholdClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("Invalid household server URL '{base_url}'"))?;
        let client = Client::builder()
            .user_agent(format!("larder-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Household server URL cannot be a base"))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> Result<RequestBuilder> {
        let builder = self.client.request(method, self.url(segments)?);
        Ok(match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        })
    }

    fn execute(builder: RequestBuilder) -> Result<Response> {
        builder.send().context("Failed to reach household server")
    }

    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .map_or_else(|_| status.to_string(), |body| body.error);
        bail!("Household server returned {status}: {message}")
    }

    fn send(builder: RequestBuilder) -> Result<Response> {
        Self::check(Self::execute(builder)?)
    }

    fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        Self::send(builder)?
            .json()
            .context("Failed to parse household server response")
    }

    /// `None` when the server answered 404.
    fn send_optional(builder: RequestBuilder) -> Result<Option<Response>> {
        let response = Self::execute(builder)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check(response).map(Some)
    }

    // --- Recipes ---

    pub fn get_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        Self::send_optional(self.request(reqwest::Method::GET, &["recipes", id])?)?
            .map(|response| {
                response
                    .json()
                    .context("Failed to parse household server response")
            })
            .transpose()
    }

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        Self::send_json(self.request(reqwest::Method::POST, &["recipes"])?.json(recipe))
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        Ok(Self::send_optional(self.request(reqwest::Method::DELETE, &["recipes", id])?)?.is_some())
    }

    // --- At home ---

    pub fn list_at_home(&self) -> Result<Vec<AtHomeItem>> {
        Self::send_json(self.request(reqwest::Method::GET, &["at-home"])?)
    }

    pub fn add_at_home(&self, name: &str) -> Result<bool> {
        let response = Self::send(
            self.request(reqwest::Method::POST, &["at-home"])?
                .json(&serde_json::json!({ "name": name })),
        )?;
        Ok(response.status() == StatusCode::CREATED)
    }

    pub fn remove_at_home(&self, name: &str) -> Result<bool> {
        Ok(Self::send_optional(self.request(reqwest::Method::DELETE, &["at-home", name])?)?.is_some())
    }
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl MealPlanStore for HouseholdClient {
    fn get_meal_plan(&self) -> Result<MealPlan> {
        Self::send_json(self.request(reqwest::Method::GET, &["meal-plan"])?)
    }

    fn set_meal(
        &self,
        date: NaiveDate,
        meal_type: &str,
        assignment: &MealAssignment,
    ) -> Result<MealPlan> {
        let day = day(date);
        Self::send_json(
            self.request(reqwest::Method::PUT, &["meal-plan", day.as_str(), meal_type])?
                .json(assignment),
        )
    }

    fn remove_meal(&self, date: NaiveDate, meal_type: &str) -> Result<MealPlan> {
        let day = day(date);
        Self::send_json(self.request(
            reqwest::Method::DELETE,
            &["meal-plan", day.as_str(), meal_type],
        )?)
    }

    fn set_note(&self, date: NaiveDate, note: &str) -> Result<MealPlan> {
        let day = day(date);
        Self::send_json(
            self.request(reqwest::Method::PUT, &["notes", day.as_str()])?
                .json(&serde_json::json!({ "note": note })),
        )
    }

    fn set_extras(&self, extras: &[String]) -> Result<MealPlan> {
        Self::send_json(
            self.request(reqwest::Method::PUT, &["extras"])?
                .json(&serde_json::json!({ "extras": extras })),
        )
    }
}

impl RecipeStore for HouseholdClient {
    fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Self::send_json(self.request(reqwest::Method::GET, &["recipes"])?)
    }
}

impl HouseholdPreferences for HouseholdClient {
    fn at_home(&self) -> Result<AtHomeSet> {
        Ok(self
            .list_at_home()?
            .iter()
            .map(|item| item.normalized_name.as_str())
            .collect())
    }
}

/// Where recipes, the meal plan and at-home items live: this machine's
/// household database, or a shared server when `LARDER_REMOTE_URL` is set.
pub enum Household {
    Local(Database),
    Remote(HouseholdClient),
}

impl Household {
    pub fn open(config: &Config) -> Result<Self> {
        match &config.remote_url {
            Some(url) => Ok(Self::Remote(HouseholdClient::new(
                url,
                config.api_key.clone(),
            )?)),
            None => Ok(Self::Local(Database::open(&config.household_db_path)?)),
        }
    }

    fn meal_plan_store(&self) -> &dyn MealPlanStore {
        match self {
            Self::Local(db) => db,
            Self::Remote(client) => client,
        }
    }

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        match self {
            Self::Local(db) => db.create_recipe(recipe),
            Self::Remote(client) => client.create_recipe(recipe),
        }
    }

    /// Look a recipe up by id, or by title when no id matches.
    pub fn find_recipe(&self, query: &str) -> Result<Recipe> {
        match self {
            Self::Local(db) => db.find_recipe(query),
            Self::Remote(client) => {
                if let Some(recipe) = client.get_recipe(query)? {
                    return Ok(recipe);
                }
                let mut matches: Vec<Recipe> = client
                    .list_recipes()?
                    .into_iter()
                    .filter(|r| r.title.eq_ignore_ascii_case(query.trim()))
                    .collect();
                match matches.len() {
                    0 => bail!("Recipe '{query}' not found"),
                    1 => Ok(matches.remove(0)),
                    _ => bail!("Several recipes are titled '{query}'. Use the recipe id instead"),
                }
            }
        }
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        match self {
            Self::Local(db) => db.delete_recipe(id),
            Self::Remote(client) => client.delete_recipe(id),
        }
    }

    pub fn list_at_home(&self) -> Result<Vec<AtHomeItem>> {
        match self {
            Self::Local(db) => db.list_at_home(),
            Self::Remote(client) => client.list_at_home(),
        }
    }

    pub fn add_at_home(&self, name: &str) -> Result<bool> {
        match self {
            Self::Local(db) => db.add_at_home(name),
            Self::Remote(client) => client.add_at_home(name),
        }
    }

    pub fn remove_at_home(&self, name: &str) -> Result<bool> {
        match self {
            Self::Local(db) => db.remove_at_home(name),
            Self::Remote(client) => client.remove_at_home(name),
        }
    }
}

impl MealPlanStore for Household {
    fn get_meal_plan(&self) -> Result<MealPlan> {
        self.meal_plan_store().get_meal_plan()
    }

    fn set_meal(
        &self,
        date: NaiveDate,
        meal_type: &str,
        assignment: &MealAssignment,
    ) -> Result<MealPlan> {
        self.meal_plan_store().set_meal(date, meal_type, assignment)
    }

    fn remove_meal(&self, date: NaiveDate, meal_type: &str) -> Result<MealPlan> {
        self.meal_plan_store().remove_meal(date, meal_type)
    }

    fn set_note(&self, date: NaiveDate, note: &str) -> Result<MealPlan> {
        self.meal_plan_store().set_note(date, note)
    }

    fn set_extras(&self, extras: &[String]) -> Result<MealPlan> {
        self.meal_plan_store().set_extras(extras)
    }
}

impl RecipeStore for Household {
    fn list_recipes(&self) -> Result<Vec<Recipe>> {
        match self {
            Self::Local(db) => RecipeStore::list_recipes(db),
            Self::Remote(client) => client.list_recipes(),
        }
    }
}

impl HouseholdPreferences for Household {
    fn at_home(&self) -> Result<AtHomeSet> {
        match self {
            Self::Local(db) => db.at_home(),
            Self::Remote(client) => client.at_home(),
        }
    }
}
