//! Bamboo Bank: a once-a-day bilingual inspiration message pushed over LINE.

pub mod compose;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod ledger;
pub mod line;
pub mod model;
pub mod retry;
pub mod server;
pub mod webhook;
