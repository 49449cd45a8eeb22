pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod docs;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod policy;
pub mod routes;
pub mod store;
