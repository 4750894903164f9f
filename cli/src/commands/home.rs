use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use crate::household::Household;

use super::helpers::{exit_not_found, print_json, truncate};

pub(crate) fn cmd_home_add(household: &Household, name: &str, json: bool) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Item name must not be empty");
    }
    let added = household.add_at_home(name)?;

    if json {
        println!("{}", serde_json::json!({ "name": name, "added": added }));
    } else if added {
        println!("Marked {name} as at home; it will be hidden from the grocery list");
    } else {
        println!("{name} is already marked as at home");
    }
    Ok(())
}

pub(crate) fn cmd_home_remove(household: &Household, name: &str, json: bool) -> Result<()> {
    if !household.remove_at_home(name)? {
        exit_not_found(&format!("'{name}' is not marked as at home"), json);
    }

    if json {
        println!("{}", serde_json::json!({ "name": name, "removed": true }));
    } else {
        println!("{name} will show on the grocery list again");
    }
    Ok(())
}

pub(crate) fn cmd_home_list(household: &Household, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HomeRow {
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Since")]
        added_at: String,
    }

    let items = household.list_at_home()?;
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("Nothing is marked as at home");
        return Ok(());
    }

    let rows: Vec<HomeRow> = items
        .iter()
        .map(|item| HomeRow {
            name: truncate(&item.name, 40),
            added_at: item.added_at.chars().take(10).collect(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
