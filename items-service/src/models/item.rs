//! Item model - a user-owned to-do entry stored in the `items` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::supabase::Payload;

pub const ITEMS_COLLECTION: &str = "items";

/// Item row as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Item as returned by the API. The owner is implied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            completed: item.completed,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
}

impl CreateItemRequest {
    /// Insert payload for a new, not yet completed item.
    pub fn into_payload(self, user_id: &str, now: DateTime<Utc>) -> Payload {
        Payload::new()
            .set("user_id", user_id)
            .set("title", self.title.trim())
            .set_opt("description", self.description)
            .set("completed", false)
            .set("created_at", now.to_rfc3339())
    }
}

/// Partial update. Fields left out of the request body are not touched;
/// `"description": null` clears the description.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    pub completed: Option<bool>,
}

/// Maps a field that is present in the body to `Some`, including `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn length_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("length");
    error.message = Some(message.into());
    error
}

impl Validate for UpdateItemRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            let len = title.chars().count();
            if !(1..=500).contains(&len) {
                errors.add("title", length_error("Title must not be empty"));
            }
        }

        if let Some(Some(description)) = &self.description {
            if description.chars().count() > 5000 {
                errors.add("description", length_error("Description is too long"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateItemRequest {
    pub fn into_payload(self, now: DateTime<Utc>) -> Payload {
        let payload = Payload::new().set_opt("title", self.title.map(|t| t.trim().to_string()));

        let payload = match self.description {
            Some(Some(description)) => payload.set("description", description),
            Some(None) => payload.set_null("description"),
            None => payload,
        };

        payload
            .set_opt("completed", self.completed)
            .set("updated_at", now.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_payload_starts_incomplete() {
        let now = Utc::now();
        let payload = CreateItemRequest {
            title: "  Buy milk ".to_string(),
            description: None,
        }
        .into_payload("user_123", now);

        assert_eq!(
            payload.into_value(),
            json!({
                "user_id": "user_123",
                "title": "Buy milk",
                "completed": false,
                "created_at": now.to_rfc3339(),
            })
        );
    }

    #[test]
    fn update_payload_only_carries_given_fields() {
        let now = Utc::now();
        let payload = UpdateItemRequest {
            completed: Some(true),
            ..Default::default()
        }
        .into_payload(now);

        let fields: Vec<&str> = payload.fields().collect();
        assert_eq!(fields, vec!["completed", "updated_at"]);
    }

    #[test]
    fn null_description_clears_the_field() {
        let now = Utc::now();
        let cleared: UpdateItemRequest =
            serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(
            cleared.into_payload(now).into_value(),
            json!({ "description": null, "updated_at": now.to_rfc3339() })
        );

        let untouched: UpdateItemRequest =
            serde_json::from_value(json!({ "completed": true })).unwrap();
        assert_eq!(untouched.description, None);
        assert!(!untouched.into_payload(now).contains("description"));
    }

    #[test]
    fn long_description_fails_validation() {
        let update = UpdateItemRequest {
            description: Some(Some("x".repeat(5001))),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateItemRequest::default().validate().is_ok());
    }

    #[test]
    fn blank_title_fails_validation() {
        let request = CreateItemRequest {
            title: String::new(),
            description: None,
        };
        assert!(request.validate().is_err());

        let update = UpdateItemRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
