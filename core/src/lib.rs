pub mod db;
pub mod error;
pub mod grocery;
pub mod household;
pub mod meal_plan;
pub mod models;
pub mod normalize;
pub mod records;
pub mod selection;
pub mod service;
