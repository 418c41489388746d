//! Translation of filter specs into SQL over the document table.
//!
//! Every entity lives in one row of `Entity(Kind, Identity, Attributes)` where
//! `Attributes` is the JSON text of its attribute map. A filter on a property
//! becomes a predicate on `json_extract(Attributes, '$.<property>')`, with the
//! exception of `id` which compares against the `Identity` column. Predicates
//! are joined by `and`; there is no `or` and no grouping.
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::filter::{Filter, Operator};

pub(crate) const ID_PROPERTY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A translated query, ready to be prepared against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A conjunction of filters with an optional explicit ordering and limit.
///
/// Without [`Query::order_by`] rows come back in whatever order the store
/// produces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<(String, Direction)>,
    limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_filters(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            filters: filters.into_iter().collect(),
            ..Self::default()
        }
    }
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
    pub fn order_by(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((property.into(), direction));
        self
    }
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn translate(&self, kind: &str) -> StoreQuery {
        let mut query = translate(kind, &self.filters);
        if let Some((property, direction)) = &self.order {
            let column = column_for(property, &mut query.params);
            let direction = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            query.sql.push_str(&format!(" order by {column} {direction}, Identity asc"));
        }
        if let Some(limit) = self.limit {
            query.sql.push_str(" limit ?");
            query.params.push(SqlValue::Integer(i64::from(limit)));
        }
        query
    }
}

/// Combines `filters` into one conjunctive query over entities of `kind`.
///
/// An empty slice selects every entity of the kind.
pub fn translate(kind: &str, filters: &[Filter]) -> StoreQuery {
    let mut sql = String::from("select Identity, Attributes from Entity where Kind = ?");
    let mut params = vec![SqlValue::Text(kind.to_owned())];
    for filter in filters {
        let column = column_for(filter.property(), &mut params);
        match (filter.operator(), filter.value()) {
            (Operator::Eq, Value::Null) => sql.push_str(&format!(" and {column} is null")),
            (Operator::Ne, Value::Null) => sql.push_str(&format!(" and {column} is not null")),
            (operator, value) => {
                sql.push_str(&format!(" and {column} {} ?", sql_operator(operator)));
                params.push(to_sql_value(value));
            }
        }
    }
    StoreQuery { sql, params }
}

// Pushes the JSON path parameter when the property lives in the attribute map.
fn column_for(property: &str, params: &mut Vec<SqlValue>) -> &'static str {
    if property == ID_PROPERTY {
        "Identity"
    } else {
        params.push(SqlValue::Text(format!("$.{property}")));
        "json_extract(Attributes, ?)"
    }
}

fn sql_operator(operator: Operator) -> &'static str {
    match operator {
        Operator::Eq => "=",
        Operator::Ne => "<>",
        Operator::Lt => "<",
        Operator::Le => "<=",
        Operator::Gt => ">",
        Operator::Ge => ">=",
    }
}

// json_extract hands back JSON booleans as 0/1, so they bind as integers.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Filter rejects non-scalar values at construction
        other => SqlValue::Text(other.to_string()),
    }
}
