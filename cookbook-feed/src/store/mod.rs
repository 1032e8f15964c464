//! Record Store Adapter
//!
//! The feed core talks to persistence only through [`RecipeStore`]. Every
//! method touches at most one recipe document, so single-record atomicity
//! from the backing store is all the core relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cookbook_common::db::{AuthorRef, Recipe, User};
use cookbook_common::Result;

mod sqlite;
pub use sqlite::SqliteRecipeStore;

/// Store-level filter, already resolved to identities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<String>,
    pub tag: Option<String>,
}

impl RecipeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_author(author_id: impl Into<String>) -> Self {
        Self {
            author_id: Some(author_id.into()),
            tag: None,
        }
    }

    pub fn by_tag(tag: impl Into<String>) -> Self {
        Self {
            author_id: None,
            tag: Some(tag.into()),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// `ascending`/`asc` sort ascending, anything else descending
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Stored scalar fields the store can sort on natively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredField {
    CreatedAt,
    UpdatedAt,
    Title,
    Instructions,
    ImageUrl,
    /// Author identity, not the username
    Author,
}

impl StoredField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            StoredField::CreatedAt => "r.created_at",
            StoredField::UpdatedAt => "r.updated_at",
            StoredField::Title => "r.title",
            StoredField::Instructions => "r.instructions",
            StoredField::ImageUrl => "r.image_url",
            StoredField::Author => "r.author_id",
        }
    }
}

/// Native sort specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredSort {
    pub field: StoredField,
    pub order: SortOrder,
}

/// A recipe as returned by the aggregation path: author not yet populated,
/// derived like count attached
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDocument {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub likes: Vec<String>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeDocument {
    /// Attach a resolved author
    pub fn populate(self, author: AuthorRef) -> Recipe {
        Recipe {
            id: self.id,
            title: self.title,
            author,
            like_count: self.likes.len(),
            ingredients: self.ingredients,
            instructions: self.instructions,
            image_url: self.image_url,
            tags: self.tags,
            likes: self.likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields of a recipe about to be inserted (already validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub author_id: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persistence operations the feed core needs
///
/// `update_one`, `delete_one`, `add_like` and `remove_like` are atomic per
/// recipe. `update_one`/`delete_one` only match when the recipe's author is
/// `author_id` (ownership-scoped match).
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Number of recipes matching the filter
    async fn count(&self, filter: &RecipeFilter) -> Result<u64>;

    /// Filtered recipes in native sort order, author populated
    async fn find(&self, filter: &RecipeFilter, sort: StoredSort) -> Result<Vec<Recipe>>;

    /// Filtered recipes ordered by derived like count, author NOT populated
    async fn aggregate_by_likes(
        &self,
        filter: &RecipeFilter,
        order: SortOrder,
    ) -> Result<Vec<RecipeDocument>>;

    /// Resolve author references for aggregated documents, keeping order
    async fn populate_authors(&self, documents: Vec<RecipeDocument>) -> Result<Vec<Recipe>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Recipe>>;

    /// Insert with server-assigned id and timestamps
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe>;

    /// Apply a patch and advance `updated_at`, even for an empty patch
    async fn update_one(&self, id: &str, author_id: &str, patch: RecipePatch)
        -> Result<Option<Recipe>>;

    /// Returns the number of deleted recipes (0 or 1)
    async fn delete_one(&self, id: &str, author_id: &str) -> Result<u64>;

    /// Add `user_id` to the like set; `updated_at` advances only if it was absent
    async fn add_like(&self, id: &str, user_id: &str) -> Result<Option<Recipe>>;

    /// Remove `user_id` from the like set; `updated_at` advances only if it was present
    async fn remove_like(&self, id: &str, user_id: &str) -> Result<Option<Recipe>>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Fails with `Error::Conflict` when the username is taken
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User>;
}
