//! # Cookbook Common Library
//!
//! Shared code for the cookbook services including:
//! - Database schema initialization and shared record models
//! - Event types (FeedEvent enum) and the EventBus
//! - Configuration loading
//! - Identity, credential and timestamp utilities

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod events;
pub mod identity;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use identity::same_identity;
