//! Filter specs: one predicate each, parsed from a property token and a value.
//!
//! A property token is either a bare property name, meaning equality, or a
//! property name followed by whitespace and one of the comparison operators
//! `==`, `!=`, `<`, `<=`, `>`, `>=`:
//!
//! ```
//! use mefm::filter::{Filter, Operator};
//! let filter = Filter::parse("practitionerId ==", 5).unwrap();
//! assert_eq!(filter.property(), "practitionerId");
//! assert_eq!(filter.operator(), Operator::Eq);
//! assert_eq!(Filter::parse("status", "OPEN").unwrap().operator(), Operator::Eq);
//! assert!(Filter::parse("status==", "OPEN").is_err());
//! ```
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::{MefmError, Result};

lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s+(==|!=|<=|>=|<|>))?\s*$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Operator::Eq | Operator::Ne)
    }
}

impl FromStr for Operator {
    type Err = MefmError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(MefmError::parse(format!("unknown operator `{other}`"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One predicate of a conjunctive query. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    property: String,
    operator: Operator,
    value: Value,
}

impl Filter {
    /// Parses a property token and pairs it with a comparison value.
    pub fn parse(token: &str, value: impl Into<Value>) -> Result<Self> {
        let captures = TOKEN
            .captures(token)
            .ok_or_else(|| MefmError::parse(format!("malformed filter token `{token}`")))?;
        let property = captures[1].to_string();
        let operator = match captures.get(2) {
            Some(op) => op.as_str().parse()?,
            None => Operator::Eq,
        };
        Self::new(property, operator, value)
    }

    /// Builds a filter from its parts, validating the property name and value.
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let property = property.into();
        if !IDENTIFIER.is_match(&property) {
            return Err(MefmError::parse(format!("invalid property name `{property}`")));
        }
        let value = value.into();
        match &value {
            Value::Array(_) | Value::Object(_) => {
                return Err(MefmError::parse(format!(
                    "filter on `{property}` compares against a non-scalar value"
                )));
            }
            Value::Null if operator.is_ordering() => {
                return Err(MefmError::parse(format!(
                    "`{property} {operator}` cannot compare against null"
                )));
            }
            _ => (),
        }
        Ok(Self { property, operator, value })
    }

    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(property, Operator::Eq, value)
    }
    pub fn property(&self) -> &str {
        &self.property
    }
    pub fn operator(&self) -> Operator {
        self.operator
    }
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator, self.value)
    }
}

/// Same as [`Filter::parse`].
pub fn parse_filter(token: &str, value: impl Into<Value>) -> Result<Filter> {
    Filter::parse(token, value)
}
