//! Like Ledger
//!
//! Likes are a set per recipe. Liking twice keeps one entry, unliking a
//! recipe you never liked is a no-op, and liking your own recipe changes
//! nothing. The set add/remove itself is atomic in the store.

use super::{FeedError, FeedResult};
use crate::store::RecipeStore;
use cookbook_common::db::Recipe;
use cookbook_common::identity::{self, contains_identity, same_identity};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Like,
    Unlike,
}

#[derive(Clone)]
pub struct LikeLedger {
    store: Arc<dyn RecipeStore>,
}

impl LikeLedger {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Add `user_id` to the recipe's likes; `Ok(None)` when the recipe is absent
    pub async fn like(&self, recipe_id: &str, user_id: &str) -> FeedResult<Option<Recipe>> {
        self.toggle(recipe_id, user_id, Toggle::Like).await
    }

    /// Remove `user_id` from the recipe's likes; `Ok(None)` when the recipe is absent
    pub async fn unlike(&self, recipe_id: &str, user_id: &str) -> FeedResult<Option<Recipe>> {
        self.toggle(recipe_id, user_id, Toggle::Unlike).await
    }

    async fn toggle(
        &self,
        recipe_id: &str,
        user_id: &str,
        action: Toggle,
    ) -> FeedResult<Option<Recipe>> {
        let recipe_id = identity::normalize(recipe_id);
        let user_id = identity::normalize(user_id);

        let Some(recipe) = self.store.find_by_id(&recipe_id).await? else {
            return Ok(None);
        };

        if same_identity(&recipe.author.id, &user_id) {
            debug!("Ignoring {:?} of recipe {} by its own author", action, recipe_id);
            return Ok(Some(normalize_likes(recipe)));
        }

        // Only a like can introduce a dangling identity
        if action == Toggle::Like && self.store.find_user_by_id(&user_id).await?.is_none() {
            return Err(FeedError::validation("userId", "unknown user"));
        }

        let updated = match action {
            Toggle::Like if contains_identity(&recipe.likes, &user_id) => Some(recipe),
            Toggle::Like => self.store.add_like(&recipe_id, &user_id).await?,
            Toggle::Unlike => self.store.remove_like(&recipe_id, &user_id).await?,
        };

        if let Some(recipe) = &updated {
            info!(
                "{:?} recipe {} by {} ({} likes)",
                action,
                recipe.id,
                user_id,
                recipe.likes.len()
            );
        }
        Ok(updated.map(normalize_likes))
    }
}

fn normalize_likes(mut recipe: Recipe) -> Recipe {
    recipe.likes = recipe
        .likes
        .iter()
        .map(|like| identity::normalize(like))
        .collect();
    recipe.like_count = recipe.likes.len();
    recipe
}
