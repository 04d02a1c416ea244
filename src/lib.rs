//! USD/NGN Rate Bot Library
//!
//! Scrapes the dollar-to-naira rate with a headless browser, keeps a single
//! cached snapshot on disk and answers Telegram commands from it.

pub mod bot;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod oracle;
pub mod persistence;
pub mod scheduler;
pub mod types;
