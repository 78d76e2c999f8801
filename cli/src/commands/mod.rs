mod fridge;
mod helpers;
mod recipe;
mod settings;
mod shopping;

pub(crate) use fridge::{
    cmd_fridge_add, cmd_fridge_advise, cmd_fridge_delete, cmd_fridge_edit, cmd_fridge_list,
};
pub(crate) use recipe::{
    cmd_recipe_delete, cmd_recipe_missing, cmd_recipe_saved, cmd_recipe_show, cmd_recipe_suggest,
};
pub(crate) use settings::{
    SettingsArgs, cmd_settings_dark, cmd_settings_recipe, cmd_settings_set, cmd_settings_show,
};
pub(crate) use shopping::{
    cmd_shop_add, cmd_shop_delete, cmd_shop_list, cmd_shop_stock, cmd_shop_toggle,
};
