use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use smartfridge_core::error::FridgeError;
use smartfridge_core::models::{Language, NewFoodItem, UpdateFoodItem};
use smartfridge_core::service::{FoodStatus, FridgeService, TextGenerator};

use super::helpers::{exit_not_found, parse_date, parse_optional_date, today, truncate};

pub(crate) fn cmd_fridge_add(
    svc: &FridgeService,
    name: &str,
    quantity: &str,
    purchased: Option<String>,
    expires: Option<String>,
    json: bool,
) -> Result<()> {
    let item = svc.add_food_item(NewFoodItem {
        name: name.to_string(),
        quantity: quantity.to_string(),
        purchase_date: parse_date(purchased)?,
        manual_expiry_date: parse_optional_date(expires)?,
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Added {} ({}) to the fridge (id: {})", item.name, item.quantity, item.id);
        println!("Get storage advice with: smartfridge fridge advise {}", item.id);
    }
    Ok(())
}

pub(crate) fn cmd_fridge_list(svc: &FridgeService, json: bool) -> Result<()> {
    let status = svc.list_food_status(today())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    if status.is_empty() {
        println!("The fridge is empty. Add something with: smartfridge fridge add <name> <quantity>");
        return Ok(());
    }
    let language = svc.preferences()?.language;
    print_fridge_table(&status, language);
    Ok(())
}

fn print_fridge_table(status: &[FoodStatus], language: Language) {
    #[derive(Tabled)]
    struct FridgeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Purchased")]
        purchased: String,
        #[tabled(rename = "Expires")]
        expires: String,
        #[tabled(rename = "Status")]
        urgency: String,
        #[tabled(rename = "Storage")]
        storage: String,
    }

    let rows: Vec<FridgeRow> = status
        .iter()
        .map(|s| FridgeRow {
            id: s.item.id,
            name: truncate(&s.item.name, 30),
            quantity: truncate(&s.item.quantity, 15),
            purchased: s.item.purchase_date.to_string(),
            expires: match (s.expiry_date, s.item.manual_expiry_date.is_some()) {
                (Some(d), true) => format!("{d} (manual)"),
                (Some(d), false) => d.to_string(),
                (None, _) => "-".to_string(),
            },
            urgency: s
                .urgency
                .map(|u| u.label(language))
                .unwrap_or_default(),
            storage: s
                .item
                .storage_location
                .as_deref()
                .map(|l| truncate(l, 25))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_fridge_edit(
    svc: &FridgeService,
    id: i64,
    name: Option<String>,
    quantity: Option<String>,
    purchased: Option<String>,
    expires: Option<String>,
    clear_expiry: bool,
    json: bool,
) -> Result<()> {
    if expires.is_some() && clear_expiry {
        bail!("--expires and --clear-expiry cannot be used together");
    }
    let manual_expiry_date = if clear_expiry {
        Some(None)
    } else {
        parse_optional_date(expires)?.map(Some)
    };
    let update = UpdateFoodItem {
        name,
        quantity,
        purchase_date: parse_optional_date(purchased)?,
        manual_expiry_date,
    };
    if update.name.is_none()
        && update.quantity.is_none()
        && update.purchase_date.is_none()
        && update.manual_expiry_date.is_none()
    {
        bail!("Nothing to update. Pass --name, --quantity, --purchased, --expires or --clear-expiry");
    }

    let previous = match svc.get_food_item(id) {
        Ok(item) => item,
        Err(FridgeError::NotFound(_)) => exit_not_found(&format!("Food item {id} not found"), json),
        Err(e) => return Err(e.into()),
    };
    let item = svc.update_food_item(id, update)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Updated {} (id: {})", item.name, item.id);
        if previous.storage_location.is_some() && item.storage_location.is_none() {
            println!("Storage advice was cleared. Refresh it with: smartfridge fridge advise {id}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_fridge_delete(svc: &FridgeService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_food_item(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id, "existed": deleted }));
    } else if deleted {
        println!("Deleted food item {id}");
    } else {
        println!("Food item {id} was already removed");
    }
    Ok(())
}

pub(crate) fn cmd_fridge_advise(
    svc: &FridgeService,
    generator: &dyn TextGenerator,
    id: i64,
    json: bool,
) -> Result<()> {
    let item = match svc.fetch_storage_advice(generator, id) {
        Ok(item) => item,
        Err(FridgeError::NotFound(_)) => exit_not_found(&format!("Food item {id} not found"), json),
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let location = item.storage_location.as_deref().unwrap_or("-");
        let days = item.shelf_life_days.unwrap_or_default();
        println!("{}: store in {location}, keeps about {days} days", item.name);
        if let Some(expiry) = item.expiry_date() {
            println!("Estimated expiry: {expiry}");
        }
    }
    Ok(())
}
