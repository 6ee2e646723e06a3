//! Persisted user record types.
//!
//! Field names on the wire match the documents the storefront already reads
//! (`_id`, `recentSearchedCities`).

use serde::{Deserialize, Serialize};

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// A user record keyed by the identity provider's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider subject id; immutable primary key
    #[serde(rename = "_id")]
    pub id: String,
    /// First email address reported by the provider
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    pub username: String,
    /// Avatar URL
    #[serde(default)]
    pub image: String,
    /// Owned by the storefront; set empty at creation and never rewritten here
    #[serde(rename = "recentSearchedCities", default)]
    pub recent_searched_cities: Vec<String>,
}

impl User {
    /// Apply an update in place, leaving the id and search history alone.
    pub fn apply(&mut self, update: &UserUpdate) {
        self.email = update.email.clone();
        self.username = update.username.clone();
        self.image = update.image.clone();
    }
}

/// Replacement values for a user's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: String,
    pub image: String,
}

/// Result of inserting a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new record was written
    Inserted,
    /// A record with the same id was already present and was left untouched
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: "user_1".to_string(),
            email: Some("ada@example.com".to_string()),
            username: "Ada Lovelace".to_string(),
            image: "https://img.example.com/ada.png".to_string(),
            recent_searched_cities: vec!["Paris".to_string()],
        }
    }

    #[test]
    fn test_user_serializes_with_document_field_names() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["_id"], "user_1");
        assert_eq!(json["recentSearchedCities"][0], "Paris");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_user_deserializes_missing_optional_fields() {
        let user: User =
            serde_json::from_str(r#"{"_id":"user_2","username":"grace"}"#).unwrap();

        assert_eq!(user.email, None);
        assert_eq!(user.image, "");
        assert!(user.recent_searched_cities.is_empty());
    }

    #[test]
    fn test_apply_keeps_id_and_search_history() {
        let mut user = sample();
        user.apply(&UserUpdate {
            email: None,
            username: "Countess".to_string(),
            image: "https://img.example.com/new.png".to_string(),
        });

        assert_eq!(user.id, "user_1");
        assert_eq!(user.email, None);
        assert_eq!(user.username, "Countess");
        assert_eq!(user.recent_searched_cities, vec!["Paris".to_string()]);
    }
}
