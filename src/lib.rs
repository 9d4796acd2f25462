// src/lib.rs
pub mod app;
pub mod banner;
pub mod config;
pub mod errors;
pub mod models;
pub mod report;
pub mod runner;
pub mod source;
pub mod summary;
