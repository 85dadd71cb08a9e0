//! Kitz Chef: turns a list of ingredients into a recipe.
//!
//! Two halves share this crate:
//! - the recipe service (`kitz_chef_server`), a single `POST /api/recipe`
//!   endpoint that forwards ingredients to a language model provider;
//! - the terminal client (`kitz_chef`), which requests recipes and keeps a
//!   local history of the ones worth saving.

pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod recipe_entry;
pub mod recipe_history;
pub mod server;
pub mod service;
pub mod storage;
pub mod ui;
