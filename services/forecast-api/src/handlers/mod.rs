//! HTTP request handlers for the forecast API.

pub mod bywkt;
pub mod health;
