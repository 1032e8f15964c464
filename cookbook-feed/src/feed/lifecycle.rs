//! Recipe Lifecycle Manager
//!
//! Creates recipes and applies owner-scoped updates and deletes. Reads are
//! never ownership-scoped; see [`QueryEngine`](super::QueryEngine).

use super::{FeedError, FeedResult, FieldIssue, Owned};
use crate::store::{NewRecipe, RecipePatch, RecipeStore};
use cookbook_common::db::Recipe;
use cookbook_common::identity;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Fields supplied when creating a recipe
///
/// `ingredients` entries are optional so that a missing entry can be
/// reported by position instead of failing the whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: Option<String>,
    pub ingredients: Vec<Option<String>>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update; absent fields stay as they are
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_title(title: Option<&str>, issues: &mut Vec<FieldIssue>) {
    if title.map_or(true, is_blank) {
        issues.push(FieldIssue::new("title", "title is required"));
    }
}

fn check_ingredients<'a, I>(ingredients: I, issues: &mut Vec<FieldIssue>)
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for (index, ingredient) in ingredients.into_iter().enumerate() {
        if ingredient.map_or(true, is_blank) {
            issues.push(FieldIssue::new(
                format!("ingredients.{}", index),
                "ingredient is required",
            ));
        }
    }
}

/// Drop blank and repeated tags, keeping first-seen order
fn tag_set(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn RecipeStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Create a recipe owned by `author_id`
    pub async fn create(&self, author_id: &str, draft: RecipeDraft) -> FeedResult<Recipe> {
        let author_id = identity::normalize(author_id);

        let mut issues = Vec::new();
        if author_id.is_empty() {
            issues.push(FieldIssue::new("authorId", "author is required"));
        }
        check_title(draft.title.as_deref(), &mut issues);
        check_ingredients(draft.ingredients.iter().map(|i| i.as_deref()), &mut issues);
        if !issues.is_empty() {
            return Err(FeedError::Validation(issues));
        }

        if self.store.find_user_by_id(&author_id).await?.is_none() {
            return Err(FeedError::validation("authorId", "unknown author"));
        }

        let recipe = NewRecipe {
            author_id,
            title: draft.title.unwrap_or_default(),
            ingredients: draft.ingredients.into_iter().flatten().collect(),
            instructions: draft.instructions,
            image_url: draft.image_url,
            tags: tag_set(draft.tags),
        };

        let created = self.store.insert(recipe).await?;
        info!(
            "Recipe created: {} '{}' by {}",
            created.id,
            created.title,
            created.author.display_name()
        );
        Ok(created)
    }

    /// Apply `update` if `author_id` owns the recipe
    ///
    /// An empty update still advances `updatedAt`.
    pub async fn update(
        &self,
        author_id: &str,
        recipe_id: &str,
        update: RecipeUpdate,
    ) -> FeedResult<Owned<Recipe>> {
        let mut issues = Vec::new();
        if update.title.is_some() {
            check_title(update.title.as_deref(), &mut issues);
        }
        if let Some(ingredients) = &update.ingredients {
            check_ingredients(ingredients.iter().map(|i| Some(i.as_str())), &mut issues);
        }
        if !issues.is_empty() {
            return Err(FeedError::Validation(issues));
        }

        let patch = RecipePatch {
            title: update.title,
            ingredients: update.ingredients,
            instructions: update.instructions,
            image_url: update.image_url,
            tags: update.tags.map(tag_set),
        };
        if patch.is_empty() {
            debug!("Empty update for recipe {}; touching updatedAt", recipe_id);
        }

        let outcome: Owned<Recipe> = self
            .store
            .update_one(
                &identity::normalize(recipe_id),
                &identity::normalize(author_id),
                patch,
            )
            .await?
            .into();

        if let Owned::Found(recipe) = &outcome {
            info!("Recipe updated: {}", recipe.id);
        }
        Ok(outcome)
    }

    /// Delete the recipe if `author_id` owns it; returns 0 or 1
    pub async fn delete(&self, author_id: &str, recipe_id: &str) -> FeedResult<u64> {
        let deleted = self
            .store
            .delete_one(
                &identity::normalize(recipe_id),
                &identity::normalize(author_id),
            )
            .await?;
        if deleted > 0 {
            info!("Recipe deleted: {}", recipe_id);
        }
        Ok(deleted)
    }
}
