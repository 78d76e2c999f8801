use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use smartfridge_core::error::FridgeError;
use smartfridge_core::models::{NewShoppingItem, ShoppingListItem};
use smartfridge_core::service::FridgeService;

use super::helpers::{exit_not_found, parse_optional_date, today, truncate};

pub(crate) fn cmd_shop_add(
    svc: &FridgeService,
    name: &str,
    unit: Option<String>,
    json: bool,
) -> Result<()> {
    let item = svc.add_shopping_item(NewShoppingItem {
        name: name.to_string(),
        unit,
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Added {} to the shopping list (id: {})", display_name(&item), item.id);
    }
    Ok(())
}

pub(crate) fn cmd_shop_list(svc: &FridgeService, json: bool) -> Result<()> {
    let items = svc.list_shopping_items()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("The shopping list is empty.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ShoppingRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = " ")]
        check: &'static str,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<ShoppingRow> = items
        .iter()
        .map(|i| ShoppingRow {
            id: i.id,
            check: if i.purchased { "[x]" } else { "[ ]" },
            name: truncate(&i.name, 35),
            unit: i.unit.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_shop_toggle(svc: &FridgeService, id: i64, json: bool) -> Result<()> {
    let item = match svc.toggle_shopping_item(id) {
        Ok(item) => item,
        Err(FridgeError::NotFound(_)) => {
            exit_not_found(&format!("Shopping item {id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else if item.purchased {
        println!("Marked {} as purchased", display_name(&item));
    } else {
        println!("Marked {} as not purchased", display_name(&item));
    }
    Ok(())
}

pub(crate) fn cmd_shop_delete(svc: &FridgeService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_shopping_item(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id, "existed": deleted }));
    } else if deleted {
        println!("Deleted shopping item {id}");
    } else {
        println!("Shopping item {id} was already removed");
    }
    Ok(())
}

/// Move a shopping entry into the fridge. The shopping entry is kept.
pub(crate) fn cmd_shop_stock(
    svc: &FridgeService,
    id: i64,
    quantity: Option<String>,
    expires: Option<String>,
    json: bool,
) -> Result<()> {
    let mut draft = match svc.shopping_item_to_food_draft(id, today()) {
        Ok(draft) => draft,
        Err(FridgeError::NotFound(_)) => {
            exit_not_found(&format!("Shopping item {id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(quantity) = quantity {
        draft.quantity = quantity;
    }
    if draft.quantity.trim().is_empty() {
        bail!("'{}' has no unit on the shopping list. Pass --quantity", draft.name);
    }
    draft.manual_expiry_date = parse_optional_date(expires)?;

    let item = svc.add_food_item(draft)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Added {} ({}) to the fridge (id: {})", item.name, item.quantity, item.id);
    }
    Ok(())
}

fn display_name(item: &ShoppingListItem) -> String {
    match &item.unit {
        Some(unit) => format!("{} ({unit})", item.name),
        None => item.name.clone(),
    }
}
