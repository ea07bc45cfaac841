pub mod api;
pub mod app;
pub mod balance;
pub mod config;
pub mod db;
pub mod events;
pub mod importers;
pub mod services;
pub mod workers;
