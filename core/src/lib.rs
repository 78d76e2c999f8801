pub mod db;
pub mod error;
pub mod expiry;
pub mod gemini;
pub mod models;
pub mod reconcile;
pub mod service;
pub mod session;
