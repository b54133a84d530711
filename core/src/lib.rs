//! gsctl core: encoding-tolerant process output streaming plus the game
//! server config plumbing around it.

pub mod api;
pub mod config;
pub mod encoding;
pub mod error;
pub mod files;
pub mod games;
pub mod stream;
pub mod util;
