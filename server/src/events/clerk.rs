//! Clerk user payloads and the rules for turning them into user records.

use serde::Deserialize;

use crate::store::{User, UserUpdate};

/// Avatar stored when the provider sends no image.
pub const DEFAULT_AVATAR_URL: &str = "https://via.placeholder.com/150";

/// The `data` object of `user.created` and `user.updated` events.
///
/// Only the fields this service stores are modelled; everything else in the
/// provider payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Option<Vec<EmailAddress>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub email_address: Option<String>,
}

/// The `data` object of `user.deleted` events.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedUser {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

impl ClerkUser {
    /// First email address in the payload, if any.
    pub fn email(&self) -> Option<&str> {
        self.email_addresses
            .as_deref()
            .and_then(|addresses| addresses.first())
            .and_then(|address| address.email_address.as_deref())
            .filter(|email| !email.is_empty())
    }

    /// `"first last"` when both names are present, otherwise the email
    /// local-part, otherwise the user id.
    pub fn username(&self) -> String {
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => format!("{first} {last}").trim().to_string(),
            _ => match self.email() {
                Some(email) => email_local_part(email).to_string(),
                None => self.id.clone(),
            },
        }
    }

    pub fn image(&self) -> String {
        non_empty(&self.image_url)
            .unwrap_or(DEFAULT_AVATAR_URL)
            .to_string()
    }

    /// A fresh record for `user.created`.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email().map(str::to_string),
            username: self.username(),
            image: self.image(),
            recent_searched_cities: Vec::new(),
        }
    }

    /// The overwrite applied by `user.updated`.
    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            email: self.email().map(str::to_string),
            username: self.username(),
            image: self.image(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> ClerkUser {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_username_from_names() {
        let user = payload(
            r#"{"id":"u1","first_name":"Ada","last_name":"Lovelace",
                "email_addresses":[{"email_address":"ada@x.com"}]}"#,
        );
        assert_eq!(user.username(), "Ada Lovelace");
    }

    #[test]
    fn test_username_falls_back_to_email_local_part() {
        let user = payload(r#"{"id":"u1","email_addresses":[{"email_address":"ada@x.com"}]}"#);
        assert_eq!(user.username(), "ada");
    }

    #[test]
    fn test_username_needs_both_names() {
        let user = payload(
            r#"{"id":"u1","first_name":"Ada","last_name":null,
                "email_addresses":[{"email_address":"countess@x.com"}]}"#,
        );
        assert_eq!(user.username(), "countess");

        let user = payload(
            r#"{"id":"u1","first_name":"","last_name":"Lovelace",
                "email_addresses":[{"email_address":"countess@x.com"}]}"#,
        );
        assert_eq!(user.username(), "countess");
    }

    #[test]
    fn test_username_trims_joined_names() {
        let user = payload(r#"{"id":"u1","first_name":" Ada","last_name":"Lovelace "}"#);
        assert_eq!(user.username(), "Ada Lovelace");
    }

    #[test]
    fn test_username_without_names_or_email_uses_id() {
        let user = payload(r#"{"id":"user_2abc","email_addresses":[]}"#);
        assert_eq!(user.username(), "user_2abc");
    }

    #[test]
    fn test_email_uses_first_address() {
        let user = payload(
            r#"{"id":"u1","email_addresses":[
                {"email_address":"first@x.com"},{"email_address":"second@x.com"}]}"#,
        );
        assert_eq!(user.email(), Some("first@x.com"));
    }

    #[test]
    fn test_email_absent_is_none() {
        assert_eq!(payload(r#"{"id":"u1"}"#).email(), None);
        assert_eq!(payload(r#"{"id":"u1","email_addresses":null}"#).email(), None);
        assert_eq!(payload(r#"{"id":"u1","email_addresses":[{}]}"#).email(), None);
    }

    #[test]
    fn test_image_placeholder() {
        assert_eq!(payload(r#"{"id":"u1"}"#).image(), DEFAULT_AVATAR_URL);
        assert_eq!(payload(r#"{"id":"u1","image_url":""}"#).image(), DEFAULT_AVATAR_URL);
        assert_eq!(
            payload(r#"{"id":"u1","image_url":"https://img.clerk.com/u1"}"#).image(),
            "https://img.clerk.com/u1"
        );
    }

    #[test]
    fn test_to_user_starts_with_empty_search_history() {
        let user = payload(
            r#"{"id":"u1","first_name":"A","last_name":"B",
                "email_addresses":[{"email_address":"a@b.com"}]}"#,
        )
        .to_user();

        assert_eq!(
            user,
            User {
                id: "u1".to_string(),
                email: Some("a@b.com".to_string()),
                username: "A B".to_string(),
                image: DEFAULT_AVATAR_URL.to_string(),
                recent_searched_cities: Vec::new(),
            }
        );
    }
}
