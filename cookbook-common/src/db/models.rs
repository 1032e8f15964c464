//! Shared record models
//!
//! These are the shapes returned to callers and carried inside events. The
//! store adapter in the feed service maps SQL rows onto them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author reference as returned with every recipe
///
/// `username` is `None` only when the referenced user no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub username: Option<String>,
}

impl AuthorRef {
    /// Name to show to people; falls back to the raw id
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }
}

/// A published recipe with its author populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub author: AuthorRef,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    /// Identities of the users who liked this recipe, canonical string form
    pub likes: Vec<String>,
    pub like_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered user (read-only reference target for the feed core)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        let known = AuthorRef {
            id: "u1".to_string(),
            username: Some("sampleChef".to_string()),
        };
        let orphan = AuthorRef {
            id: "u2".to_string(),
            username: None,
        };
        assert_eq!(known.display_name(), "sampleChef");
        assert_eq!(orphan.display_name(), "u2");
    }

    #[test]
    fn test_recipe_serializes_camel_case() {
        let recipe = Recipe {
            id: "r1".to_string(),
            title: "Garden Salad".to_string(),
            author: AuthorRef {
                id: "u1".to_string(),
                username: Some("sampleChef".to_string()),
            },
            ingredients: vec!["lettuce".to_string()],
            instructions: None,
            image_url: Some("https://example.com/salad.jpg".to_string()),
            tags: vec!["healthy".to_string()],
            likes: vec![],
            like_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["imageUrl"], "https://example.com/salad.jpg");
        assert_eq!(json["likeCount"], 0);
        assert_eq!(json["author"]["username"], "sampleChef");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            id: "u1".to_string(),
            username: "sampleChef".to_string(),
            password_hash: "salt$digest".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "sampleChef");
    }
}
