pub mod cli;
pub mod restart;
pub mod show_config;
