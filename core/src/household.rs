use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{AtHomeView, GroceryItem};
use crate::normalize::normalize_name;

/// Household-level "always have this at home" list.
pub trait HouseholdPreferences {
    fn at_home(&self) -> Result<AtHomeSet>;
}

/// Normalized names the household already has. Only hides items from the
/// to-buy view; never removes anything from the list itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AtHomeSet {
    names: BTreeSet<String>,
}

impl AtHomeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str) -> bool {
        let normalized = normalize_name(name);
        !normalized.is_empty() && self.names.insert(normalized)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(&normalize_name(name))
    }

    /// Accepts raw or already normalized names.
    #[must_use]
    pub fn is_at_home(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for AtHomeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for AtHomeSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<AtHomeSet> for Vec<String> {
    fn from(set: AtHomeSet) -> Self {
        set.names.into_iter().collect()
    }
}

/// Split a grocery list into what still has to be bought and how many lines
/// were hidden because the household has them at home. Checked items count
/// towards the hidden total like any other.
#[must_use]
pub fn filter_at_home(items: &[GroceryItem], at_home: &AtHomeSet) -> AtHomeView {
    let (hidden, items_to_buy): (Vec<&GroceryItem>, Vec<&GroceryItem>) = items
        .iter()
        .partition(|item| at_home.is_at_home(&item.normalized_name));

    AtHomeView {
        items_to_buy: items_to_buy.into_iter().cloned().collect(),
        hidden_at_home_count: hidden.len(),
    }
}
