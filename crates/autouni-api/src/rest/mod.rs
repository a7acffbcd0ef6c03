// REST surface of the AutoUni backend.

mod auth;
mod automations;
mod buildings;
pub mod client;
mod devices;
mod energy;
pub mod models;
mod notifications;
mod reports;
mod users;

pub use client::ApiClient;
pub use energy::EnergyScope;
