use serde_json::Value;

use super::error::FilterError;
use crate::database::models::{PropertyType, UserId};

/// A single field-level predicate over a property document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field holds a scalar whose text form equals `value`.
    Equals { field: String, value: String },
    /// The field holds an array containing the string `value`.
    Contains { field: String, value: String },
}

/// Conjunction of field conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    conditions: Vec<Condition>,
}

impl PropertyFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn featured() -> Self {
        Self::all().equals("featured", "true")
    }

    pub fn of_type(kind: PropertyType) -> Self {
        Self::all().equals("type", kind.as_str())
    }

    pub fn owned_by(user: &UserId) -> Self {
        Self::all().equals("currentOwner", user.to_string())
    }

    pub fn bookmarked_by(user: &UserId) -> Self {
        Self::all().contains("bookmarkedUsers", user.to_string())
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Build a filter from a raw query string.
    ///
    /// `None` and `Some("")` both mean "no parameters" and yield the match-all
    /// filter. Every `key=value` pair becomes an equality condition.
    pub fn from_query(query: Option<&str>) -> Result<Self, FilterError> {
        let mut filter = Self::all();
        let Some(query) = query else {
            return Ok(filter);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            Self::validate_field(&key)?;
            filter = filter.equals(key.into_owned(), value.into_owned());
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate against a serialized property document.
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Equals { field, value } => document
                .get(field)
                .and_then(scalar_text)
                .map_or(false, |text| text == *value),
            Condition::Contains { field, value } => document
                .get(field)
                .and_then(Value::as_array)
                .map_or(false, |items| items.iter().any(|item| item.as_str() == Some(value.as_str()))),
        })
    }

    /// Render as a SQL predicate over a JSONB `column`, with `$n` placeholders
    /// numbered from `first_param`. All parameters are text.
    pub fn to_sql(&self, column: &str, first_param: usize) -> (String, Vec<String>) {
        if self.conditions.is_empty() {
            return ("TRUE".to_string(), vec![]);
        }

        let mut params = Vec::with_capacity(self.conditions.len() * 2);
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let field_idx = first_param + params.len();
            let value_idx = field_idx + 1;
            let clause = match condition {
                Condition::Equals { field, value } => {
                    params.push(field.clone());
                    params.push(value.clone());
                    format!(
                        "(jsonb_typeof({col} -> ${f}) IN ('string', 'number', 'boolean') AND {col} ->> ${f} = ${v})",
                        col = column,
                        f = field_idx,
                        v = value_idx
                    )
                }
                Condition::Contains { field, value } => {
                    params.push(field.clone());
                    params.push(value.clone());
                    format!(
                        "({col} -> ${f}) @> jsonb_build_array(${v}::text)",
                        col = column,
                        f = field_idx,
                        v = value_idx
                    )
                }
            };
            clauses.push(clause);
        }

        (clauses.join(" AND "), params)
    }

    fn validate_field(field: &str) -> Result<(), FilterError> {
        let mut chars = field.chars();
        let valid = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidField(field.to_string()))
        }
    }
}

/// Text form of a scalar JSON value, as Postgres `->>` renders it.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_or_empty_query_matches_everything() {
        assert!(PropertyFilter::from_query(None).unwrap().is_empty());
        assert!(PropertyFilter::from_query(Some("")).unwrap().is_empty());
    }

    #[test]
    fn query_pairs_become_equality_conditions() {
        let filter = PropertyFilter::from_query(Some("type=beach&city=Split%20Old")).unwrap();
        assert_eq!(
            filter.conditions(),
            &[
                Condition::Equals { field: "type".into(), value: "beach".into() },
                Condition::Equals { field: "city".into(), value: "Split Old".into() },
            ]
        );
    }

    #[test]
    fn rejects_unsafe_field_names() {
        assert_eq!(
            PropertyFilter::from_query(Some("doc->>x=1")),
            Err(FilterError::InvalidField("doc->>x".to_string()))
        );
        assert!(PropertyFilter::from_query(Some("1abc=1")).is_err());
        assert!(PropertyFilter::from_query(Some("=1")).is_err());
    }

    #[test]
    fn equality_compares_text_form() {
        let doc = json!({ "type": "beach", "featured": true, "beds": 3, "tags": ["sea"] });

        assert!(PropertyFilter::featured().matches(&doc));
        assert!(PropertyFilter::all().equals("beds", "3").matches(&doc));
        assert!(PropertyFilter::of_type(PropertyType::Beach).matches(&doc));
        assert!(!PropertyFilter::of_type(PropertyType::Village).matches(&doc));
        assert!(!PropertyFilter::all().equals("tags", "sea").matches(&doc));
        assert!(!PropertyFilter::all().equals("missing", "x").matches(&doc));
    }

    #[test]
    fn contains_checks_array_membership() {
        let user = UserId::new();
        let doc = json!({ "bookmarkedUsers": [user.to_string()] });

        assert!(PropertyFilter::bookmarked_by(&user).matches(&doc));
        assert!(!PropertyFilter::bookmarked_by(&UserId::new()).matches(&doc));
    }

    #[test]
    fn renders_numbered_sql() {
        let user = UserId::new();
        let filter = PropertyFilter::featured().contains("bookmarkedUsers", user.to_string());
        let (sql, params) = filter.to_sql("doc", 1);

        assert!(sql.contains("doc ->> $1 = $2"));
        assert!(sql.contains("(doc -> $3) @> jsonb_build_array($4::text)"));
        assert_eq!(params, vec!["featured", "true", "bookmarkedUsers", user.to_string().as_str()]);

        assert_eq!(PropertyFilter::all().to_sql("doc", 1), ("TRUE".to_string(), vec![]));
    }
}
