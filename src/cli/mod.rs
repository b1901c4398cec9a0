pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod guide;
pub mod habits;
pub mod settings;
pub mod setup;
pub mod ui;
