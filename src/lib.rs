pub mod aggregate;
pub mod app;
pub mod blob;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod report;
pub mod sink;
pub mod walker;
pub mod workbook;
