pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod dialogs;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod table;
pub mod views;
