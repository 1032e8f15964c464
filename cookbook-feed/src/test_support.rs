//! Shared fixtures for unit tests

use crate::store::{
    NewRecipe, RecipeDocument, RecipeFilter, RecipePatch, RecipeStore, SortOrder,
    SqliteRecipeStore, StoredSort,
};
use async_trait::async_trait;
use cookbook_common::config::DatabaseLocation;
use cookbook_common::credentials::hash_password;
use cookbook_common::db::{init_database, Recipe, User};
use cookbook_common::{Error, Result};
use std::sync::Arc;

pub(crate) async fn memory_store() -> Arc<SqliteRecipeStore> {
    let pool = init_database(&DatabaseLocation::Memory)
        .await
        .expect("in-memory database");
    Arc::new(SqliteRecipeStore::new(pool))
}

pub(crate) async fn seed_user(store: &SqliteRecipeStore, username: &str) -> User {
    store
        .insert_user(username, &hash_password("secret123"))
        .await
        .expect("seed user")
}

pub(crate) fn new_recipe(author_id: &str, title: &str, tags: &[&str]) -> NewRecipe {
    NewRecipe {
        author_id: author_id.to_string(),
        title: title.to_string(),
        ingredients: vec!["salt".to_string()],
        instructions: None,
        image_url: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Store whose every call fails, for error-path tests
pub(crate) struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(Error::Internal("store unavailable".to_string()))
}

#[async_trait]
impl RecipeStore for FailingStore {
    async fn count(&self, _filter: &RecipeFilter) -> Result<u64> {
        unavailable()
    }

    async fn find(&self, _filter: &RecipeFilter, _sort: StoredSort) -> Result<Vec<Recipe>> {
        unavailable()
    }

    async fn aggregate_by_likes(
        &self,
        _filter: &RecipeFilter,
        _order: SortOrder,
    ) -> Result<Vec<RecipeDocument>> {
        unavailable()
    }

    async fn populate_authors(&self, _documents: Vec<RecipeDocument>) -> Result<Vec<Recipe>> {
        unavailable()
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Recipe>> {
        unavailable()
    }

    async fn insert(&self, _recipe: NewRecipe) -> Result<Recipe> {
        unavailable()
    }

    async fn update_one(
        &self,
        _id: &str,
        _author_id: &str,
        _patch: RecipePatch,
    ) -> Result<Option<Recipe>> {
        unavailable()
    }

    async fn delete_one(&self, _id: &str, _author_id: &str) -> Result<u64> {
        unavailable()
    }

    async fn add_like(&self, _id: &str, _user_id: &str) -> Result<Option<Recipe>> {
        unavailable()
    }

    async fn remove_like(&self, _id: &str, _user_id: &str) -> Result<Option<Recipe>> {
        unavailable()
    }

    async fn find_user_by_id(&self, _id: &str) -> Result<Option<User>> {
        unavailable()
    }

    async fn find_user_by_username(&self, _username: &str) -> Result<Option<User>> {
        unavailable()
    }

    async fn insert_user(&self, _username: &str, _password_hash: &str) -> Result<User> {
        unavailable()
    }
}
