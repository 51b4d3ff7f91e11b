pub mod config;
pub mod error;
pub mod input;
pub mod job_registry;
pub mod logger;
pub mod models;
pub mod openapi;
pub mod results;
pub mod routes;
pub mod validation;
pub mod worker;
