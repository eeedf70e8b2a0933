pub mod auth;
pub mod dashboard;
pub mod health;
pub mod meals;
pub mod pages;
pub mod profile;
pub mod stats;
