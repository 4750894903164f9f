mod grocery;
mod helpers;
mod home;
mod plan;
mod recipe;

pub(crate) use grocery::{
    ClearScope, Service, cmd_grocery_add, cmd_grocery_check, cmd_grocery_clear,
    cmd_grocery_export, cmd_grocery_manual, cmd_grocery_pending, cmd_grocery_remove,
    cmd_grocery_select, cmd_grocery_servings, cmd_grocery_show,
};
pub(crate) use home::{cmd_home_add, cmd_home_list, cmd_home_remove};
pub(crate) use plan::{cmd_plan_extra, cmd_plan_note, cmd_plan_remove, cmd_plan_set, cmd_plan_show};
pub(crate) use recipe::{
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list, cmd_recipe_show,
};
