//! # MacroCalBot
//!
//! A Telegram bot that identifies food in photos with Google Vision, looks up
//! its macros with Nutritionix, and replies with a nutrition report. Nothing
//! starts until the credential gate in [`config`] has passed.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod config_errors;
pub mod estimator;
pub mod localization;
pub mod nutrition;
pub mod retry;
pub mod service_errors;
pub mod settings;
pub mod vision;
