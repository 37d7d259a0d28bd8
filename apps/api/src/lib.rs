pub mod ai_gateway;
pub mod config;
pub mod db;
pub mod errors;
pub mod importer;
pub mod interview;
pub mod models;
pub mod resume;
pub mod routes;
pub mod state;
pub mod store;
