//! Entity schemas, one struct per kind.
//!
//! Attribute names are camelCase on the wire and in the store, so a filter
//! token names a property exactly as the client sends it (`practitionerId`,
//! `postalCode`, ...). References to other entities are [`Key`]s.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Id, Key};

// Every schema struct keeps its identifier in an `id: Option<Id>` field.
macro_rules! entity {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl Entity for $ty {
                const KIND: &'static str = stringify!($ty);
                fn id(&self) -> Option<Id> {
                    self.id
                }
                fn set_id(&mut self, id: Id) {
                    self.id = Some(id);
                }
            }
        )+
        /// Every kind defined here, the default set registered with the store.
        pub const ALL_KINDS: &[&str] = &[$(stringify!($ty)),+];
    };
}

entity!(Comment, Practitioner, User, QuestionGroup, Question, QuestionChoice);

// ------------- Comment -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    Pending,
    Open,
    Visible,
    Moderated,
    Flagged,
    Blocked,
    Resolved,
}

/// Feedback left by a user about a practitioner. A reply points at the
/// comment it answers through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: Option<Id>,
    pub parent_id: Option<Key<Comment>>,
    pub practitioner_id: Key<Practitioner>,
    pub user_id: Key<User>,
    pub date: DateTime<Utc>,
    pub text: String,
    pub status: CommentStatus,
}

impl Comment {
    pub fn new(
        practitioner_id: Key<Practitioner>,
        user_id: Key<User>,
        text: impl Into<String>,
        status: CommentStatus,
    ) -> Self {
        Self {
            id: None,
            parent_id: None,
            practitioner_id,
            user_id,
            date: Utc::now(),
            text: text.into(),
            status,
        }
    }
}

// ------------- Practitioner -------------
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    #[serde(default)]
    pub id: Option<Id>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub specialty: Option<String>,
    /// Epoch milliseconds.
    pub creation_date: Option<i64>,
    pub created_by: Option<Key<User>>,
}

impl Practitioner {
    /// Attributes stored as JSON numbers, so text search values must be
    /// converted before they are compared.
    pub const NUMERIC_PROPERTIES: &'static [&'static str] = &["id", "creationDate", "createdBy"];

    /// The destination string handed to the distance service.
    pub fn location(&self, default_country: &str) -> String {
        let country = self
            .country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(default_country);
        format!("{}+{}", self.postal_code.trim(), country)
    }
}

// ------------- User -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Enabled,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<Id>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub email: String,
    pub role_id: Option<i32>,
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: UserStatus,
}

impl User {
    pub fn without_password(mut self) -> Self {
        self.password = None;
        self
    }
}

// ------------- Questionnaire -------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGroup {
    #[serde(default)]
    pub id: Option<Id>,
    pub text: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: Option<Id>,
    pub group_id: Key<QuestionGroup>,
    pub text: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub choice_ids: Vec<Key<QuestionChoice>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionChoice {
    #[serde(default)]
    pub id: Option<Id>,
    pub text: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn references_serialize_as_bare_identifiers() {
        let comment = Comment::new(Key::new(7), Key::new(3), "helpful", CommentStatus::Open);
        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["practitionerId"], json!(7));
        assert_eq!(value["userId"], json!(3));
        assert_eq!(value["status"], json!("OPEN"));
        assert_eq!(value["parentId"], json!(null));
    }

    #[test]
    fn statuses_use_their_wire_names() {
        for (status, name) in [
            (CommentStatus::Pending, "PENDING"),
            (CommentStatus::Open, "OPEN"),
            (CommentStatus::Resolved, "RESOLVED"),
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(name));
            assert_eq!(serde_json::from_value::<CommentStatus>(json!(name)).unwrap(), status);
        }
    }

    #[test]
    fn password_is_not_serialized_once_cleared() {
        let user: User = serde_json::from_value(json!({
            "username": "ann",
            "password": "secret",
            "email": "ann@example.org"
        }))
        .unwrap();
        assert_eq!(user.status, UserStatus::Enabled);
        let value = serde_json::to_value(user.without_password()).unwrap();
        assert!(value.get("password").is_none());
    }

    #[test]
    fn location_falls_back_to_default_country() {
        let mut practitioner = Practitioner {
            postal_code: "V5K 0A1".into(),
            ..Practitioner::default()
        };
        assert_eq!(practitioner.location("Canada"), "V5K 0A1+Canada");
        practitioner.country = Some("USA".into());
        assert_eq!(practitioner.location("Canada"), "V5K 0A1+USA");
    }

    #[test]
    fn all_kinds_lists_every_schema() {
        assert_eq!(ALL_KINDS.len(), 6);
        assert!(ALL_KINDS.contains(&Comment::KIND));
        assert!(ALL_KINDS.contains(&Practitioner::KIND));
    }
}
