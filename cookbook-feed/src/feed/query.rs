//! Recipe Query Engine
//!
//! Two paths behind [`QueryEngine::list`]:
//! - stored fields (`createdAt`, `updatedAt`, `title`, `instructions`,
//!   `imageUrl`, `author`) sort natively in the store
//! - `likes` has no stored scalar; the store aggregates a derived count and
//!   the engine populates authors afterwards so both paths return the same shape

use super::{FeedError, FeedResult};
use crate::store::{RecipeFilter, RecipeStore, SortOrder, StoredField, StoredSort};
use cookbook_common::db::Recipe;
use cookbook_common::identity;
use std::sync::Arc;
use tracing::{debug, error};

/// Sortable keys accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Instructions,
    ImageUrl,
    Author,
    /// Popularity, the number of distinct likers
    Likes,
}

impl SortKey {
    /// Parse a `sortBy` value; blank selects the default
    pub fn parse(value: &str) -> FeedResult<Self> {
        match value.trim() {
            "" | "createdAt" => Ok(SortKey::CreatedAt),
            "updatedAt" => Ok(SortKey::UpdatedAt),
            "title" => Ok(SortKey::Title),
            "instructions" => Ok(SortKey::Instructions),
            "imageUrl" => Ok(SortKey::ImageUrl),
            "author" => Ok(SortKey::Author),
            "likes" => Ok(SortKey::Likes),
            other => Err(FeedError::InvalidSort(other.to_string())),
        }
    }

    fn stored_field(self) -> Option<StoredField> {
        match self {
            SortKey::CreatedAt => Some(StoredField::CreatedAt),
            SortKey::UpdatedAt => Some(StoredField::UpdatedAt),
            SortKey::Title => Some(StoredField::Title),
            SortKey::Instructions => Some(StoredField::Instructions),
            SortKey::ImageUrl => Some(StoredField::ImageUrl),
            SortKey::Author => Some(StoredField::Author),
            SortKey::Likes => None,
        }
    }
}

/// Request-scoped listing criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Author username
    pub author: Option<String>,
    pub tag: Option<String>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl QuerySpec {
    /// Build from raw request parameters
    pub fn from_params(
        author: Option<String>,
        tag: Option<String>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> FeedResult<Self> {
        Ok(Self {
            author,
            tag,
            sort_by: sort_by.map(SortKey::parse).transpose()?.unwrap_or_default(),
            sort_order: sort_order.map(SortOrder::parse).unwrap_or_default(),
        })
    }
}

fn transient(err: cookbook_common::Error) -> FeedError {
    error!("Recipe query failed: {}", err);
    FeedError::Transient(err.to_string())
}

#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn RecipeStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// List recipes matching `spec`
    ///
    /// An empty vector means nothing matched. Store failures surface as
    /// [`FeedError::Transient`], never as an empty result.
    pub async fn list(&self, spec: &QuerySpec) -> FeedResult<Vec<Recipe>> {
        let Some(filter) = self.resolve_filter(spec).await? else {
            return Ok(Vec::new());
        };

        let candidates = self.store.count(&filter).await.map_err(transient)?;
        if candidates == 0 {
            debug!("No recipes match {:?}", filter);
            return Ok(Vec::new());
        }

        let recipes = match spec.sort_by.stored_field() {
            Some(field) => {
                let sort = StoredSort {
                    field,
                    order: spec.sort_order,
                };
                self.store.find(&filter, sort).await.map_err(transient)?
            }
            None => self.by_popularity(&filter, spec.sort_order).await?,
        };

        debug!(
            "Listed {} recipes (sort {:?} {:?})",
            recipes.len(),
            spec.sort_by,
            spec.sort_order
        );
        Ok(recipes)
    }

    /// Single recipe by id; reads are never ownership-scoped
    pub async fn get(&self, recipe_id: &str) -> FeedResult<Option<Recipe>> {
        Ok(self.store.find_by_id(&identity::normalize(recipe_id)).await?)
    }

    async fn by_popularity(&self, filter: &RecipeFilter, order: SortOrder) -> FeedResult<Vec<Recipe>> {
        let documents = self
            .store
            .aggregate_by_likes(filter, order)
            .await
            .map_err(transient)?;
        self.store
            .populate_authors(documents)
            .await
            .map_err(transient)
    }

    /// `Ok(None)` means the criteria can match nothing
    async fn resolve_filter(&self, spec: &QuerySpec) -> FeedResult<Option<RecipeFilter>> {
        match (&spec.author, &spec.tag) {
            (Some(_), Some(_)) => Err(FeedError::AmbiguousQuery),
            (Some(author), None) => {
                let username = author.trim();
                if username.is_empty() {
                    return Ok(None);
                }
                let user = self
                    .store
                    .find_user_by_username(username)
                    .await
                    .map_err(transient)?;
                match user {
                    Some(user) => Ok(Some(RecipeFilter::by_author(user.id))),
                    None => {
                        debug!("Unknown author '{}' has no recipes", username);
                        Ok(None)
                    }
                }
            }
            (None, Some(tag)) if tag.trim().is_empty() => Ok(None),
            (None, Some(tag)) => Ok(Some(RecipeFilter::by_tag(tag.as_str()))),
            (None, None) => Ok(Some(RecipeFilter::all())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_store, new_recipe, seed_user, FailingStore};

    fn spec(sort_by: SortKey, sort_order: SortOrder) -> QuerySpec {
        QuerySpec {
            sort_by,
            sort_order,
            ..Default::default()
        }
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("likes").unwrap(), SortKey::Likes);
        assert_eq!(SortKey::parse("").unwrap(), SortKey::CreatedAt);
        assert_eq!(SortKey::parse("imageUrl").unwrap(), SortKey::ImageUrl);
        assert_eq!(SortKey::parse("author").unwrap(), SortKey::Author);
        assert!(matches!(
            SortKey::parse("password"),
            Err(FeedError::InvalidSort(field)) if field == "password"
        ));
    }

    #[test]
    fn test_query_spec_defaults() {
        let spec = QuerySpec::from_params(None, None, None, None).unwrap();
        assert_eq!(spec.sort_by, SortKey::CreatedAt);
        assert_eq!(spec.sort_order, SortOrder::Descending);

        let spec = QuerySpec::from_params(None, None, Some("title"), Some("ascending")).unwrap();
        assert_eq!(spec.sort_by, SortKey::Title);
        assert_eq!(spec.sort_order, SortOrder::Ascending);

        let spec = QuerySpec::from_params(None, None, None, Some("sideways")).unwrap();
        assert_eq!(spec.sort_order, SortOrder::Descending);
    }

    #[tokio::test]
    async fn test_default_listing_is_newest_first() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        for title in ["First", "Second", "Third"] {
            store.insert(new_recipe(&chef.id, title, &[])).await.unwrap();
        }

        let engine = QueryEngine::new(store.clone());
        let recipes = engine.list(&QuerySpec::default()).await.unwrap();
        let titles: Vec<_> = recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
        assert!(recipes.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_tag_filter_scenario() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let salad = store
            .insert(new_recipe(&chef.id, "Garden Salad", &["healthy", "salad"]))
            .await
            .unwrap();
        store.insert(new_recipe(&chef.id, "Brownies", &["chocolate"])).await.unwrap();

        let engine = QueryEngine::new(store.clone());
        let healthy = QuerySpec {
            tag: Some("healthy".to_string()),
            ..Default::default()
        };
        let found = engine.list(&healthy).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, salad.id);

        let dessert = QuerySpec {
            tag: Some("dessert".to_string()),
            ..Default::default()
        };
        assert!(engine.list(&dessert).await.unwrap().is_empty());

        let blank = QuerySpec {
            tag: Some(String::new()),
            ..Default::default()
        };
        assert!(engine.list(&blank).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_author_filter() {
        let store = memory_store().await;
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        store.insert(new_recipe(&alice.id, "Alice Soup", &[])).await.unwrap();
        store.insert(new_recipe(&bob.id, "Bob Stew", &[])).await.unwrap();

        let engine = QueryEngine::new(store.clone());
        let by_bob = QuerySpec {
            author: Some("bob".to_string()),
            ..Default::default()
        };
        let found = engine.list(&by_bob).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Bob Stew");

        let unknown = QuerySpec {
            author: Some("nobody".to_string()),
            ..Default::default()
        };
        assert!(engine.list(&unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_author_and_tag_is_ambiguous() {
        let store = memory_store().await;
        let engine = QueryEngine::new(store.clone());
        let both = QuerySpec {
            author: Some("alice".to_string()),
            tag: Some("soup".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            engine.list(&both).await,
            Err(FeedError::AmbiguousQuery)
        ));
    }

    #[tokio::test]
    async fn test_popularity_sort_scenario() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let mut fans = Vec::new();
        for name in ["fan1", "fan2", "fan3"] {
            fans.push(seed_user(&store, name).await);
        }

        let popular = store.insert(new_recipe(&chef.id, "Popular", &[])).await.unwrap();
        let niche = store.insert(new_recipe(&chef.id, "Niche", &[])).await.unwrap();
        for fan in &fans {
            store.add_like(&popular.id, &fan.id).await.unwrap();
        }
        store.add_like(&niche.id, &fans[0].id).await.unwrap();

        let engine = QueryEngine::new(store.clone());
        let descending = engine
            .list(&spec(SortKey::Likes, SortOrder::Descending))
            .await
            .unwrap();
        assert_eq!(descending[0].id, popular.id);
        assert_eq!(descending[0].likes.len(), 3);
        assert_eq!(descending[1].id, niche.id);

        let ascending = engine
            .list(&spec(SortKey::Likes, SortOrder::Ascending))
            .await
            .unwrap();
        assert_eq!(ascending[0].id, niche.id);

        // Same author shape as the native sort path
        let native = engine
            .list(&spec(SortKey::CreatedAt, SortOrder::Descending))
            .await
            .unwrap();
        let native_popular = native.iter().find(|r| r.id == popular.id).unwrap();
        assert_eq!(descending[0].author, native_popular.author);
        assert_eq!(descending[0].author.username.as_deref(), Some("chef"));
    }

    #[tokio::test]
    async fn test_sort_by_instructions() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        for (title, steps) in [("Stew", "Simmer slowly."), ("Salad", "Chop and toss.")] {
            let mut recipe = new_recipe(&chef.id, title, &[]);
            recipe.instructions = Some(steps.to_string());
            store.insert(recipe).await.unwrap();
        }

        let engine = QueryEngine::new(store.clone());
        let recipes = engine
            .list(&spec(SortKey::Instructions, SortOrder::Ascending))
            .await
            .unwrap();
        let titles: Vec<_> = recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Salad", "Stew"]);
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits() {
        let store = memory_store().await;
        let engine = QueryEngine::new(store.clone());
        let recipes = engine
            .list(&spec(SortKey::Likes, SortOrder::Descending))
            .await
            .unwrap();
        assert!(recipes.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_transient_not_empty() {
        let engine = QueryEngine::new(Arc::new(FailingStore));
        assert!(matches!(
            engine.list(&QuerySpec::default()).await,
            Err(FeedError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_get_normalizes_id() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let recipe = store.insert(new_recipe(&chef.id, "Pie", &[])).await.unwrap();

        let engine = QueryEngine::new(store.clone());
        let shouted = recipe.id.to_uppercase();
        assert_eq!(engine.get(&shouted).await.unwrap().unwrap().id, recipe.id);
        assert!(engine.get("missing").await.unwrap().is_none());
    }
}
