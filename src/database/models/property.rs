use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::ids::{PropertyId, UserId};
use super::user::PublicUser;

/// Fields the server owns. Clients cannot set them on create.
const SERVER_FIELDS: [&str; 5] = ["_id", "currentOwner", "bookmarkedUsers", "createdAt", "updatedAt"];

/// Fields ignored on update.
const IMMUTABLE_FIELDS: [&str; 3] = ["_id", "createdAt", "updatedAt"];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Beach,
    Mountain,
    Village,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [PropertyType::Beach, PropertyType::Mountain, PropertyType::Village];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Beach => "beach",
            PropertyType::Mountain => "mountain",
            PropertyType::Village => "village",
        }
    }
}

impl FromStr for PropertyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("type", format!("unknown property type '{}'", s)))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property listing document.
///
/// `O` is the representation of the owner: a bare [`UserId`] as stored, or
/// `Option<PublicUser>` once the owner has been embedded (see [`Property::populate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property<O = UserId> {
    #[serde(rename = "_id")]
    pub id: PropertyId,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub featured: bool,
    pub current_owner: O,
    #[serde(default)]
    pub bookmarked_users: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Descriptive fields supplied by the client (title, price, images, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Property with its owner resolved to public user data (`null` if the user is gone).
pub type PopulatedProperty = Property<Option<PublicUser>>;

impl Property {
    /// Build a new property from a client payload. The owner is always `owner`,
    /// whatever the payload says.
    pub fn from_draft(body: Value, owner: UserId) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = body else {
            return Err(ValidationError::NotAnObject);
        };

        for key in SERVER_FIELDS {
            fields.remove(key);
        }

        let kind = match fields.remove("type") {
            Some(value) => parse_type(&value)?,
            None => return Err(ValidationError::MissingField("type")),
        };
        let featured = match fields.remove("featured") {
            Some(value) => parse_bool("featured", &value)?,
            None => false,
        };

        let now = Utc::now();
        Ok(Self {
            id: PropertyId::new(),
            kind,
            featured,
            current_owner: owner,
            bookmarked_users: Vec::new(),
            created_at: now,
            updated_at: now,
            details: fields,
        })
    }

    /// Overwrite the fields present in `body`. Nothing is changed if any field is invalid.
    pub fn apply_patch(&mut self, body: Value) -> Result<(), ValidationError> {
        let Value::Object(fields) = body else {
            return Err(ValidationError::NotAnObject);
        };

        let mut next = self.clone();
        for (key, value) in fields {
            if IMMUTABLE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            match key.as_str() {
                "type" => next.kind = parse_type(&value)?,
                "featured" => next.featured = parse_bool("featured", &value)?,
                "currentOwner" => next.current_owner = parse_user_id("currentOwner", &value)?,
                "bookmarkedUsers" => next.bookmarked_users = parse_user_ids(&value)?,
                _ => {
                    next.details.insert(key, value);
                }
            }
        }
        next.drop_owner_bookmark();
        next.updated_at = Utc::now();

        *self = next;
        Ok(())
    }

    /// The top-level fields a patch writes, validated and in stored form,
    /// plus the new `updatedAt`. Fields absent from `body` are left out so the
    /// store can merge them without touching anything else.
    pub fn patch_changes(&self, body: Value) -> Result<Map<String, Value>, ValidationError> {
        let Value::Object(fields) = &body else {
            return Err(ValidationError::NotAnObject);
        };
        let keys: Vec<String> = fields
            .keys()
            .filter(|key| !IMMUTABLE_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect();

        let mut next = self.clone();
        next.apply_patch(body)?;

        let mut changes = Map::new();
        for key in keys {
            let value = match key.as_str() {
                "type" => Value::String(next.kind.as_str().to_string()),
                "featured" => Value::Bool(next.featured),
                "currentOwner" => Value::String(next.current_owner.to_string()),
                "bookmarkedUsers" => Value::Array(
                    next.bookmarked_users
                        .iter()
                        .map(|u| Value::String(u.to_string()))
                        .collect(),
                ),
                _ => next.details.get(&key).cloned().unwrap_or(Value::Null),
            };
            changes.insert(key, value);
        }
        changes.insert("updatedAt".to_string(), json!(next.updated_at));
        Ok(changes)
    }

    /// Overlay `changes` onto this document's top-level fields.
    pub fn merge_fields(&self, changes: &Map<String, Value>) -> Result<Property, serde_json::Error> {
        let mut document = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut document {
            for (key, value) in changes {
                fields.insert(key.clone(), value.clone());
            }
        }
        let mut merged: Property = serde_json::from_value(document)?;
        merged.drop_owner_bookmark();
        Ok(merged)
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.current_owner == *user
    }

    // owner never appears in its own bookmark set
    fn drop_owner_bookmark(&mut self) {
        let owner = self.current_owner;
        self.bookmarked_users.retain(|user| *user != owner);
    }

    /// Remove `user` from the bookmark set if present, add it otherwise.
    /// Returns whether the property is bookmarked by `user` afterwards.
    pub fn toggle_bookmark(&mut self, user: UserId) -> bool {
        let bookmarked = match self.bookmarked_users.iter().position(|u| *u == user) {
            Some(index) => {
                self.bookmarked_users.remove(index);
                false
            }
            None => {
                self.bookmarked_users.push(user);
                true
            }
        };
        self.updated_at = Utc::now();
        bookmarked
    }

    /// Replace the owner id with the owner's public data.
    pub fn populate(self, owner: Option<PublicUser>) -> PopulatedProperty {
        Property {
            id: self.id,
            kind: self.kind,
            featured: self.featured,
            current_owner: owner,
            bookmarked_users: self.bookmarked_users,
            created_at: self.created_at,
            updated_at: self.updated_at,
            details: self.details,
        }
    }
}

/// Per-category listing counts returned by `/find/types`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub beach: i64,
    pub mountain: i64,
    pub village: i64,
}

impl TypeCounts {
    pub fn set(&mut self, kind: PropertyType, count: i64) {
        match kind {
            PropertyType::Beach => self.beach = count,
            PropertyType::Mountain => self.mountain = count,
            PropertyType::Village => self.village = count,
        }
    }
}

fn parse_type(value: &Value) -> Result<PropertyType, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::invalid("type", "expected a string"))?
        .parse()
}

fn parse_bool(field: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(ValidationError::invalid(field, "expected a boolean")),
    }
}

fn parse_user_id(field: &str, value: &Value) -> Result<UserId, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::invalid(field, "expected a user id string"))?
        .parse()
        .map_err(|e: uuid::Error| ValidationError::invalid(field, e.to_string()))
}

fn parse_user_ids(value: &Value) -> Result<Vec<UserId>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::invalid("bookmarkedUsers", "expected an array"))?;

    let mut ids: Vec<UserId> = Vec::with_capacity(items.len());
    for item in items {
        let id = parse_user_id("bookmarkedUsers", item)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
