use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::GroceryItem;
use larder_core::records::LocalRecordStore;
use larder_core::service::GroceryService;

use super::helpers::{exit_not_found, meal_ref_key, print_json, truncate};

pub(crate) type Service<'a> = GroceryService<'a, LocalRecordStore>;

#[derive(Serialize)]
struct ListOutput<'a> {
    items: &'a [GroceryItem],
    total_items: usize,
    checked_count: usize,
    hidden_at_home_count: usize,
    dangling_keys: Vec<String>,
}

pub(crate) fn cmd_grocery_show(service: &Service<'_>, all: bool, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "")]
        checked: &'static str,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "For")]
        sources: String,
    }

    let list = service.grocery_list();
    let view = service.to_buy();
    let items = if all { &list.items } else { &view.items_to_buy };

    if json {
        return print_json(&ListOutput {
            items,
            total_items: list.total_items,
            checked_count: list.checked_count,
            hidden_at_home_count: view.hidden_at_home_count,
            dangling_keys: service.dangling_keys(),
        });
    }

    if items.is_empty() {
        println!("Your grocery list is empty");
    } else {
        let rows: Vec<ItemRow> = items
            .iter()
            .map(|item| ItemRow {
                checked: if item.checked { "[x]" } else { "[ ]" },
                name: truncate(&item.name, 40),
                sources: if item.custom {
                    "added by hand".to_string()
                } else {
                    truncate(&item.sources.join(", "), 50)
                },
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::first()).with(Alignment::center()))
            .to_string();
        println!("{table}");
    }

    println!(
        "{} items, {} checked",
        list.total_items, list.checked_count
    );
    if !all && view.hidden_at_home_count > 0 {
        println!(
            "{} already at home (show with --all)",
            view.hidden_at_home_count
        );
    }
    let dangling = service.dangling_keys();
    if !dangling.is_empty() {
        println!(
            "Selected but no longer planned: {} (drop with `larder grocery select`)",
            dangling.join(", ")
        );
    }
    Ok(())
}

pub(crate) fn cmd_grocery_select(service: &Service<'_>, meal_ref: &str, json: bool) -> Result<()> {
    let key = meal_ref_key(meal_ref)?;
    let chosen = service.toggle_selection(&key)?;
    let servings = service.selection().servings_for(&key);

    if json {
        println!(
            "{}",
            serde_json::json!({ "key": key, "chosen": chosen, "servings": servings })
        );
    } else if chosen {
        let servings = servings.unwrap_or_default();
        println!("Added {key} to the grocery list for {servings} people");
    } else {
        println!("Removed {key} from the grocery list");
    }
    Ok(())
}

pub(crate) fn cmd_grocery_servings(
    service: &Service<'_>,
    meal_ref: &str,
    delta: i32,
    json: bool,
) -> Result<()> {
    let key = meal_ref_key(meal_ref)?;
    let Some(servings) = service.selection().change_servings(&key, delta)? else {
        exit_not_found(
            &format!("{key} is not on the grocery list. Add it with `larder grocery select` first"),
            json,
        );
    };

    if json {
        println!("{}", serde_json::json!({ "key": key, "servings": servings }));
    } else {
        println!("{key} now cooks for {servings} people");
    }
    Ok(())
}

pub(crate) fn cmd_grocery_add(service: &Service<'_>, name: &str, json: bool) -> Result<()> {
    let added = service.selection().add_custom_item(name)?;
    if json {
        println!("{}", serde_json::json!({ "added": added, "name": name.trim() }));
    } else if added {
        println!("Added {} to the grocery list", name.trim());
    } else {
        println!("Nothing to add");
    }
    Ok(())
}

/// `position` is 1-based among the manually added items.
pub(crate) fn cmd_grocery_remove(service: &Service<'_>, position: usize, json: bool) -> Result<()> {
    let removed = match position.checked_sub(1) {
        Some(index) => service.selection().remove_custom_item(index)?,
        None => None,
    };
    let Some(item) = removed else {
        exit_not_found(&format!("No manual item #{position}"), json);
    };

    if json {
        println!("{}", serde_json::json!({ "removed": item.name }));
    } else {
        println!("Removed {} from the grocery list", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_grocery_check(
    service: &Service<'_>,
    name: &str,
    checked: bool,
    json: bool,
) -> Result<()> {
    service.selection().toggle_checked(name, checked)?;
    if json {
        println!("{}", serde_json::json!({ "name": name, "checked": checked }));
    } else if checked {
        println!("Checked off {name}");
    } else {
        println!("Unchecked {name}");
    }
    Ok(())
}

#[derive(Clone, Copy)]
pub(crate) enum ClearScope {
    Everything,
    Checked,
    Meals,
    Manual,
}

pub(crate) fn cmd_grocery_clear(service: &mut Service<'_>, scope: ClearScope, json: bool) -> Result<()> {
    let message = match scope {
        ClearScope::Everything => {
            let slots = service.clear_all()?;
            format!("Cleared the grocery list and {slots} planned meals")
        }
        ClearScope::Checked => {
            service.selection().clear_checked()?;
            "Cleared checked items".to_string()
        }
        ClearScope::Meals => {
            service.selection().clear_meal_plan_items_only()?;
            "Removed all planned meals from the grocery list".to_string()
        }
        ClearScope::Manual => {
            service.selection().clear_manual_items_only()?;
            "Removed all manually added items".to_string()
        }
    };

    if json {
        println!("{}", serde_json::json!({ "cleared": true, "message": message }));
    } else {
        println!("{message}");
    }
    Ok(())
}

pub(crate) fn cmd_grocery_export(service: &Service<'_>) {
    print!("{}", service.shopping_text());
}

pub(crate) fn cmd_grocery_pending(service: &Service<'_>, json: bool) {
    let pending = service.pending_count();
    if json {
        println!("{}", serde_json::json!({ "pending": pending }));
    } else {
        println!("{pending}");
    }
}

pub(crate) fn cmd_grocery_manual(service: &Service<'_>, json: bool) -> Result<()> {
    let items = service.selection().custom_items();
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No manually added items");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{:>3}. {}", i + 1, item.name);
    }
    Ok(())
}
