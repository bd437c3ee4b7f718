use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Record;

/// Query filter: equality tests plus conjunction/disjunction. The
/// disjunction form exists to match an unordered pair by checking both
/// column orderings in one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Eq { field: String, value: Value },
    All { clauses: Vec<Filter> },
    Any { clauses: Vec<Filter> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn all(clauses: Vec<Filter>) -> Self {
        Filter::All { clauses }
    }

    pub fn any(clauses: Vec<Filter>) -> Self {
        Filter::Any { clauses }
    }

    /// Evaluate against a record; `id` is addressable like a field.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Eq { field, value } => {
                if field == "id" {
                    value.as_str() == Some(record.id.as_str())
                } else {
                    record.get(field) == Some(value)
                }
            }
            Filter::All { clauses } => clauses.iter().all(|c| c.matches(record)),
            Filter::Any { clauses } => clauses.iter().any(|c| c.matches(record)),
        }
    }
}

/// Sort order over a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dir", content = "field", rename_all = "snake_case")]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Order {
    pub fn field(&self) -> &str {
        match self {
            Order::Asc(field) | Order::Desc(field) => field,
        }
    }

    pub fn descending(&self) -> bool {
        matches!(self, Order::Desc(_))
    }
}
