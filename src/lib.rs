pub mod app;
pub mod briefing;
pub mod cli;
pub mod config;
pub mod slack;
pub mod update;
pub mod zoom;
