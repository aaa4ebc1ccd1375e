//! Adapters implementing the domain ports.

pub mod database;
pub mod gateways;
