pub mod auth;
pub mod errors;
pub mod storage;

pub mod database;
pub mod server;
pub mod services;
