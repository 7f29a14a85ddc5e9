//! Logseq API access

pub mod client;
pub mod models;

pub use client::{LogseqApi, LogseqClient};
pub use models::{Block, Page, QueryResult};
