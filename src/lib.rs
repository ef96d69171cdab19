pub mod database;
pub mod service;
