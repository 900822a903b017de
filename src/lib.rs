pub mod calendar;
pub mod config;
pub mod consequences;
pub mod documentation;
pub mod error;
pub mod overrides;
pub mod party;
pub mod pattern;
pub mod request;
pub mod service;
pub mod store;
pub mod suggestions;
pub mod time;
pub mod utils;
