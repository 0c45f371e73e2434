//! Row filters in PostgREST's `column=operator.value` form.

use std::fmt;
use std::str::FromStr;

use super::error::{DataError, DataResult};

/// Comparison operators understood by the REST layer. The set is closed:
/// anything else is rejected before a request is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Is,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::ILike,
        FilterOperator::In,
        FilterOperator::Is,
    ];

    /// Wire token, e.g. `eq` or `ilike`.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::In => "in",
            FilterOperator::Is => "is",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DataError::invalid(format!("unknown filter operator '{}'", s)))
    }
}

/// Literals accepted by the `is` operator.
const IS_LITERALS: [&str; 4] = ["null", "true", "false", "unknown"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Builds a filter from a textual operator, failing on anything outside
    /// the supported set.
    pub fn parse(
        column: impl Into<String>,
        operator: &str,
        value: impl Into<String>,
    ) -> DataResult<Self> {
        Ok(Self::new(column, operator.parse()?, value))
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Is, "null")
    }

    /// Set membership; members are quoted when they contain reserved
    /// characters.
    pub fn in_list<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members: Vec<String> = values
            .into_iter()
            .map(|v| quote_list_member(v.as_ref()))
            .collect();
        Self::new(column, FilterOperator::In, format!("({})", members.join(",")))
    }

    pub fn validate(&self) -> DataResult<()> {
        if self.column.trim().is_empty() {
            return Err(DataError::invalid("filter column must not be empty"));
        }

        match self.operator {
            FilterOperator::Is if !IS_LITERALS.contains(&self.value.as_str()) => {
                Err(DataError::invalid(format!(
                    "'is' filter on '{}' only accepts null, true, false or unknown",
                    self.column
                )))
            }
            FilterOperator::In if !(self.value.starts_with('(') && self.value.ends_with(')')) => {
                Err(DataError::invalid(format!(
                    "'in' filter on '{}' must be a parenthesised list",
                    self.column
                )))
            }
            _ => Ok(()),
        }
    }

    /// Query parameter pair: (`column`, `operator.value`).
    pub fn to_param(&self) -> DataResult<(String, String)> {
        self.validate()?;
        Ok((
            self.column.clone(),
            format!("{}.{}", self.operator.as_str(), self.value),
        ))
    }
}

/// Serialises a filter list, failing on the first invalid entry.
pub fn to_params(filters: &[Filter]) -> DataResult<Vec<(String, String)>> {
    filters.iter().map(Filter::to_param).collect()
}

fn quote_list_member(value: &str) -> String {
    let reserved = value
        .chars()
        .any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\' | ' '));
    if !reserved {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
