#![forbid(unsafe_code)]

pub mod api;
pub mod audio;
pub mod chapter;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod formats;
pub mod logging;
pub mod page;
pub mod translation;
pub mod verses;
