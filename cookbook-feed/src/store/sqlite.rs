//! SQLite implementation of the Record Store Adapter
//!
//! `likes` lives in the `recipe_likes` join table; add/remove are single
//! statements so concurrent likes on one recipe never lose updates.
//! `updated_at` advances with `MAX(now, updated_at + 1)` inside the same
//! transaction as the change.

use super::{
    NewRecipe, RecipeDocument, RecipeFilter, RecipePatch, RecipeStore, SortOrder, StoredSort,
};
use async_trait::async_trait;
use cookbook_common::db::{AuthorRef, Recipe, User};
use cookbook_common::{identity, time, Error, Result};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const RECIPE_SELECT: &str = "SELECT r.id, r.title, r.author_id, u.username AS author_username, \
     r.ingredients, r.instructions, r.image_url, r.tags, \
     (SELECT json_group_array(l.user_id) FROM recipe_likes l WHERE l.recipe_id = r.id) AS likes, \
     (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) AS like_count, \
     r.created_at, r.updated_at \
     FROM recipes r LEFT JOIN users u ON u.id = r.author_id";

// Aggregation path: no join, author resolved afterwards by populate_authors
const DOCUMENT_SELECT: &str = "SELECT r.id, r.title, r.author_id, NULL AS author_username, \
     r.ingredients, r.instructions, r.image_url, r.tags, \
     (SELECT json_group_array(l.user_id) FROM recipe_likes l WHERE l.recipe_id = r.id) AS likes, \
     (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) AS like_count, \
     r.created_at, r.updated_at \
     FROM recipes r";

const TOUCH_SQL: &str = "UPDATE recipes SET updated_at = MAX(?, updated_at + 1) WHERE id = ?";

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: String,
    title: String,
    author_id: String,
    author_username: Option<String>,
    ingredients: String,
    instructions: Option<String>,
    image_url: Option<String>,
    tags: String,
    likes: String,
    like_count: i64,
    created_at: i64,
    updated_at: i64,
}

impl RecipeRow {
    fn into_document(self) -> Result<(RecipeDocument, Option<String>)> {
        let document = RecipeDocument {
            ingredients: decode_list(&self.ingredients)?,
            tags: decode_list(&self.tags)?,
            likes: decode_list(&self.likes)?,
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            instructions: self.instructions,
            image_url: self.image_url,
            like_count: self.like_count,
            created_at: time::from_micros(self.created_at),
            updated_at: time::from_micros(self.updated_at),
        };
        Ok((document, self.author_username))
    }

    fn into_recipe(self) -> Result<Recipe> {
        let (document, username) = self.into_document()?;
        let author = AuthorRef {
            id: document.author_id.clone(),
            username,
        };
        Ok(document.populate(author))
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    created_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: time::from_micros(row.created_at),
        }
    }
}

fn decode_list(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(author_id) = &filter.author_id {
        qb.push(" AND r.author_id = ").push_bind(author_id.clone());
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(r.tags) t WHERE t.value = ")
            .push_bind(tag.clone())
            .push(")");
    }
}

async fn fetch_recipe<'e, E>(executor: E, id: &str) -> Result<Option<Recipe>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE r.id = ?", RECIPE_SELECT);
    let row: Option<RecipeRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(RecipeRow::into_recipe).transpose()
}

/// Record store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteRecipeStore {
    pool: SqlitePool,
}

impl SqliteRecipeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    async fn count(&self, filter: &RecipeFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
        push_filter(&mut qb, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find(&self, filter: &RecipeFilter, sort: StoredSort) -> Result<Vec<Recipe>> {
        let mut qb = QueryBuilder::<Sqlite>::new(RECIPE_SELECT);
        push_filter(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {} {}, r.rowid {}",
            sort.field.column(),
            sort.order.sql(),
            sort.order.sql()
        ));

        let rows: Vec<RecipeRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        debug!("find matched {} recipes", rows.len());
        rows.into_iter().map(RecipeRow::into_recipe).collect()
    }

    async fn aggregate_by_likes(
        &self,
        filter: &RecipeFilter,
        order: SortOrder,
    ) -> Result<Vec<RecipeDocument>> {
        let mut qb = QueryBuilder::<Sqlite>::new(DOCUMENT_SELECT);
        push_filter(&mut qb, filter);
        // Ties broken by recency so equal counts come back in a stable order
        qb.push(format!(" ORDER BY like_count {}, r.created_at DESC", order.sql()));

        let rows: Vec<RecipeRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        debug!("aggregate_by_likes matched {} recipes", rows.len());
        rows.into_iter()
            .map(|row| row.into_document().map(|(document, _)| document))
            .collect()
    }

    async fn populate_authors(&self, documents: Vec<RecipeDocument>) -> Result<Vec<Recipe>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: HashSet<&str> = documents.iter().map(|d| d.author_id.as_str()).collect();

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, username FROM users WHERE id IN (");
        let mut separated = qb.separated(", ");
        for author_id in &author_ids {
            separated.push_bind(author_id.to_string());
        }
        separated.push_unseparated(")");

        let users: Vec<(String, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        let usernames: HashMap<String, String> = users.into_iter().collect();

        Ok(documents
            .into_iter()
            .map(|document| {
                let author = AuthorRef {
                    id: document.author_id.clone(),
                    username: usernames.get(&document.author_id).cloned(),
                };
                document.populate(author)
            })
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Recipe>> {
        fetch_recipe(&self.pool, id).await
    }

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe> {
        let id = identity::generate();
        let now = time::now_micros();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO recipes
                (id, title, author_id, ingredients, instructions, image_url, tags, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&recipe.title)
        .bind(&recipe.author_id)
        .bind(serde_json::to_string(&recipe.ingredients)?)
        .bind(&recipe.instructions)
        .bind(&recipe.image_url)
        .bind(serde_json::to_string(&recipe.tags)?)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let created = fetch_recipe(&mut *tx, &id).await?;
        tx.commit().await?;

        created.ok_or_else(|| Error::Internal(format!("Recipe {} missing after insert", id)))
    }

    async fn update_one(
        &self,
        id: &str,
        author_id: &str,
        patch: RecipePatch,
    ) -> Result<Option<Recipe>> {
        let ingredients = patch
            .ingredients
            .as_ref()
            .map(|list| serde_json::to_string(list))
            .transpose()?;
        let tags = patch
            .tags
            .as_ref()
            .map(|list| serde_json::to_string(list))
            .transpose()?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE recipes SET
                title = COALESCE(?, title),
                ingredients = COALESCE(?, ingredients),
                instructions = COALESCE(?, instructions),
                image_url = COALESCE(?, image_url),
                tags = COALESCE(?, tags),
                updated_at = MAX(?, updated_at + 1)
             WHERE id = ? AND author_id = ?",
        )
        .bind(&patch.title)
        .bind(ingredients)
        .bind(&patch.instructions)
        .bind(&patch.image_url)
        .bind(tags)
        .bind(time::now_micros())
        .bind(id)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = fetch_recipe(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_one(&self, id: &str, author_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ? AND author_id = ?")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn add_like(&self, id: &str, user_id: &str) -> Result<Option<Recipe>> {
        let now = time::now_micros();
        let mut tx = self.pool.begin().await?;

        // Selecting from recipes makes the insert a no-op for unknown ids
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO recipe_likes (recipe_id, user_id, liked_at)
             SELECT id, ?, ? FROM recipes WHERE id = ?",
        )
        .bind(user_id)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            sqlx::query(TOUCH_SQL)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let recipe = fetch_recipe(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    async fn remove_like(&self, id: &str, user_id: &str) -> Result<Option<Recipe>> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM recipe_likes WHERE recipe_id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed > 0 {
            sqlx::query(TOUCH_SQL)
                .bind(time::now_micros())
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let recipe = fetch_recipe(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let id = identity::generate();
        let now = time::now_micros();

        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: time::from_micros(now),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                Error::Conflict(format!("username already exists: {}", username)),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredField;
    use crate::test_support::{memory_store, new_recipe, seed_user};

    fn newest_first() -> StoredSort {
        StoredSort {
            field: StoredField::CreatedAt,
            order: SortOrder::Descending,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = memory_store().await;
        let chef = seed_user(&store, "sampleChef").await;

        let recipe = store
            .insert(new_recipe(&chef.id, "Garden Salad", &["healthy", "salad"]))
            .await
            .unwrap();

        assert!(uuid::Uuid::parse_str(&recipe.id).is_ok());
        assert_eq!(recipe.author.id, chef.id);
        assert_eq!(recipe.author.username.as_deref(), Some("sampleChef"));
        assert_eq!(recipe.created_at, recipe.updated_at);
        assert!(recipe.likes.is_empty());
        assert_eq!(recipe.like_count, 0);
    }

    #[tokio::test]
    async fn test_count_and_find_by_tag() {
        let store = memory_store().await;
        let chef = seed_user(&store, "sampleChef").await;
        store.insert(new_recipe(&chef.id, "Carbonara", &["italian", "pasta"])).await.unwrap();
        store.insert(new_recipe(&chef.id, "Garden Salad", &["healthy", "salad"])).await.unwrap();

        let italian = RecipeFilter::by_tag("italian");
        assert_eq!(store.count(&italian).await.unwrap(), 1);
        assert_eq!(store.count(&RecipeFilter::by_tag("ital")).await.unwrap(), 0);

        let found = store.find(&italian, newest_first()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Carbonara");
    }

    #[tokio::test]
    async fn test_find_by_author() {
        let store = memory_store().await;
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        store.insert(new_recipe(&alice.id, "Soup", &[])).await.unwrap();
        store.insert(new_recipe(&bob.id, "Stew", &[])).await.unwrap();

        let found = store
            .find(&RecipeFilter::by_author(&bob.id), newest_first())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].author.username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_add_like_is_set_semantics() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let fan = seed_user(&store, "fan").await;
        let recipe = store.insert(new_recipe(&chef.id, "Pie", &[])).await.unwrap();

        let once = store.add_like(&recipe.id, &fan.id).await.unwrap().unwrap();
        let twice = store.add_like(&recipe.id, &fan.id).await.unwrap().unwrap();

        assert_eq!(once.likes, vec![fan.id.clone()]);
        assert_eq!(twice.likes, vec![fan.id.clone()]);
        assert!(once.updated_at > recipe.updated_at);
        // Duplicate like changes nothing, including the timestamp
        assert_eq!(twice.updated_at, once.updated_at);
    }

    #[tokio::test]
    async fn test_like_unknown_recipe_returns_none() {
        let store = memory_store().await;
        let fan = seed_user(&store, "fan").await;
        assert!(store.add_like("missing", &fan.id).await.unwrap().is_none());
        assert!(store.remove_like("missing", &fan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_like() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let fan = seed_user(&store, "fan").await;
        let recipe = store.insert(new_recipe(&chef.id, "Pie", &[])).await.unwrap();
        store.add_like(&recipe.id, &fan.id).await.unwrap();

        let removed = store.remove_like(&recipe.id, &fan.id).await.unwrap().unwrap();
        assert!(removed.likes.is_empty());

        let again = store.remove_like(&recipe.id, &fan.id).await.unwrap().unwrap();
        assert!(again.likes.is_empty());
        assert_eq!(again.updated_at, removed.updated_at);
    }

    #[tokio::test]
    async fn test_aggregate_by_likes_leaves_author_unpopulated() {
        let store = memory_store().await;
        let chef = seed_user(&store, "chef").await;
        let fans = [
            seed_user(&store, "fan1").await,
            seed_user(&store, "fan2").await,
        ];
        let quiet = store.insert(new_recipe(&chef.id, "Quiet", &[])).await.unwrap();
        let loved = store.insert(new_recipe(&chef.id, "Loved", &[])).await.unwrap();
        for fan in &fans {
            store.add_like(&loved.id, &fan.id).await.unwrap();
        }

        let documents = store
            .aggregate_by_likes(&RecipeFilter::all(), SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, loved.id);
        assert_eq!(documents[0].like_count, 2);
        assert_eq!(documents[1].id, quiet.id);

        let populated = store.populate_authors(documents).await.unwrap();
        assert_eq!(populated[0].author, loved.author);
        assert_eq!(populated[0].like_count, 2);
        assert_eq!(populated[1].author, quiet.author);
    }

    #[tokio::test]
    async fn test_populate_authors_empty() {
        let store = memory_store().await;
        assert!(store.populate_authors(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_one_is_ownership_scoped() {
        let store = memory_store().await;
        let owner = seed_user(&store, "owner").await;
        let other = seed_user(&store, "other").await;
        let recipe = store.insert(new_recipe(&owner.id, "Bread", &[])).await.unwrap();

        let patch = RecipePatch {
            title: Some("Stolen Bread".to_string()),
            ..Default::default()
        };
        assert!(store.update_one(&recipe.id, &other.id, patch.clone()).await.unwrap().is_none());

        let updated = store.update_one(&recipe.id, &owner.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "Stolen Bread");
        assert!(updated.updated_at > recipe.updated_at);
        assert_eq!(updated.created_at, recipe.created_at);
    }

    #[tokio::test]
    async fn test_empty_patch_still_touches() {
        let store = memory_store().await;
        let owner = seed_user(&store, "owner").await;
        let recipe = store.insert(new_recipe(&owner.id, "Bread", &["baking"])).await.unwrap();

        let touched = store
            .update_one(&recipe.id, &owner.id, RecipePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(touched.title, recipe.title);
        assert_eq!(touched.tags, recipe.tags);
        assert!(touched.updated_at > recipe.updated_at);
    }

    #[tokio::test]
    async fn test_delete_one_cascades_likes() {
        let store = memory_store().await;
        let owner = seed_user(&store, "owner").await;
        let fan = seed_user(&store, "fan").await;
        let recipe = store.insert(new_recipe(&owner.id, "Bread", &[])).await.unwrap();
        store.add_like(&recipe.id, &fan.id).await.unwrap();

        assert_eq!(store.delete_one(&recipe.id, &fan.id).await.unwrap(), 0);
        assert_eq!(store.delete_one(&recipe.id, &owner.id).await.unwrap(), 1);
        assert_eq!(store.delete_one(&recipe.id, &owner.id).await.unwrap(), 0);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_likes")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_insert_user_duplicate_is_conflict() {
        let store = memory_store().await;
        store.insert_user("sampleChef", "x").await.unwrap();
        let err = store.insert_user("sampleChef", "y").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let found = store.find_user_by_username("sampleChef").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "x");
        assert!(store.find_user_by_id(&found.id).await.unwrap().is_some());
        assert!(store.find_user_by_username("nobody").await.unwrap().is_none());
    }
}
