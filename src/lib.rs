//! Extracts titled, sectioned documents from HTML pages and serves them over a small API.

pub mod api;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod parser;

pub use document::{Document, Section};
pub use error::{Error, Result, StreamError};
