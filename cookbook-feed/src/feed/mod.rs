//! Recipe feed core
//!
//! Four components share one [`RecipeStore`](crate::store::RecipeStore):
//! - [`QueryEngine`] lists recipes under filter/sort criteria
//! - [`LikeLedger`] maintains per-recipe liker sets
//! - [`LifecycleManager`] creates, updates and deletes owned recipes
//! - [`Notifier`] fans new recipes out to connected sessions

pub mod fanout;
pub mod lifecycle;
pub mod likes;
pub mod query;

pub use fanout::{ConnectionRegistry, Notifier, SessionHandle, SessionInfo, SessionListener};
pub use lifecycle::{LifecycleManager, RecipeDraft, RecipeUpdate};
pub use likes::LikeLedger;
pub use query::{QueryEngine, QuerySpec, SortKey};

use serde::Serialize;
use thiserror::Error;

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Feed core errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Missing or invalid input fields
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldIssue>),

    /// Author and tag filters supplied together
    #[error("Filter by author or by tag, not both")]
    AmbiguousQuery,

    /// Requested sort field is not sortable
    #[error("Cannot sort by '{0}'")]
    InvalidSort(String),

    /// Listing failed in the store; distinct from an empty result
    #[error("Recipe query failed: {0}")]
    Transient(String),

    /// Store error outside the listing paths
    #[error(transparent)]
    Store(#[from] cookbook_common::Error),
}

impl FeedError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FeedError::Validation(vec![FieldIssue::new(field, message)])
    }
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Outcome of an ownership-scoped mutation
///
/// A recipe that does not exist and a recipe owned by someone else are
/// indistinguishable here.
#[derive(Debug, Clone, PartialEq)]
pub enum Owned<T> {
    Found(T),
    NotFoundOrForbidden,
}

impl<T> Owned<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Owned::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Owned::Found(value) => Some(value),
            Owned::NotFoundOrForbidden => None,
        }
    }
}

impl<T> From<Option<T>> for Owned<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Owned::Found(value),
            None => Owned::NotFoundOrForbidden,
        }
    }
}
