//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: Routes incoming text, photo, and document messages
//! - `ui_builder`: Formats nutrition reports

pub mod message_handler;
pub mod ui_builder;

// Re-export main handler function for use in main.rs
pub use message_handler::message_handler;

pub use message_handler::{download_and_process_image, download_file};
pub use ui_builder::format_food_report;
