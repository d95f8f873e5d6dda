//! Filter and sort composition for list queries
//!
//! Filters and the sort clause are described by static configuration and
//! rendered onto a fresh [`sqlx::QueryBuilder`] per execution, so the same
//! criteria can drive both a count query and a data fetch. Column names only
//! ever come from the configuration, never from request input.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::error::{Error, Result};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending (A-Z, 0-9, oldest first)
    #[default]
    Asc,
    /// Descending (Z-A, 9-0, newest first)
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl SortOrder {
    /// Convert to SQL ORDER BY clause fragment
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse `asc`/`desc`, returning None for anything else
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Whitelist-based sort configuration
///
/// An unrecognized `sort_by` silently falls back to the default field and an
/// unrecognized `order` to the default order. Requests never error on sort
/// input, and unvalidated field names never reach a query.
#[derive(Debug, Clone, Copy)]
pub struct SortConfig {
    /// Columns callers may sort by
    pub allowed_fields: &'static [&'static str],
    /// Column used when `sort_by` is absent or not allowed
    pub default_field: &'static str,
    /// Direction used when `order` is absent or unrecognized
    pub default_order: SortOrder,
}

impl SortConfig {
    /// Resolve request parameters to a safe (column, direction) pair
    #[must_use]
    pub fn resolve(&self, sort_by: Option<&str>, order: Option<&str>) -> (&'static str, SortOrder) {
        let field = sort_by
            .and_then(|requested| {
                self.allowed_fields
                    .iter()
                    .find(|allowed| **allowed == requested)
                    .copied()
            })
            .unwrap_or(self.default_field);

        let order = order
            .and_then(SortOrder::parse)
            .unwrap_or(self.default_order);

        (field, order)
    }
}

/// Comparison operator for a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Exact match
    Eq,
    /// Case-sensitive substring match (value wrapped in wildcards)
    Like,
    /// Case-insensitive substring match (value wrapped in wildcards)
    ILike,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Greater than
    Gt,
    /// Less than
    Lt,
}

impl FilterOperator {
    /// SQL fragment for plain comparison operators
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// Type a filter value is parsed to before binding
///
/// Postgres will not compare an integer column against a text bind, so each
/// filter declares how its raw query-parameter value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Bind as text
    Text,
    /// Parse and bind as a 64-bit integer
    Int,
    /// Parse and bind as a double
    Float,
}

/// A parsed filter value ready to bind
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Text bind
    Text(String),
    /// Integer bind
    Int(i64),
    /// Double bind
    Float(f64),
}

/// Declares how one query parameter maps onto a column predicate
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    /// Request query parameter name
    pub query_param: &'static str,
    /// Target column
    pub column: &'static str,
    /// Comparison operator
    pub operator: FilterOperator,
    /// How the raw value is parsed before binding
    pub value_type: FilterType,
}

impl FilterConfig {
    /// Turn a raw query-parameter value into an applied filter
    ///
    /// Absent or empty values add no predicate. Values that cannot be parsed
    /// to the declared type are rejected rather than passed to the store.
    pub fn bind(&self, raw: Option<&str>) -> Result<Option<AppliedFilter>> {
        let raw = match raw {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(None),
        };

        let value = match self.value_type {
            FilterType::Text => FilterValue::Text(raw.to_string()),
            FilterType::Int => FilterValue::Int(raw.parse().map_err(|_| {
                Error::BadRequest(format!("invalid value for {}", self.query_param))
            })?),
            FilterType::Float => FilterValue::Float(raw.parse().map_err(|_| {
                Error::BadRequest(format!("invalid value for {}", self.query_param))
            })?),
        };

        Ok(Some(AppliedFilter {
            column: self.column,
            operator: self.operator,
            value,
        }))
    }
}

/// A filter predicate bound to a concrete value
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFilter {
    column: &'static str,
    operator: FilterOperator,
    value: FilterValue,
}

/// Re-derivable WHERE/ORDER BY criteria for one list request
///
/// Rendering does no I/O; the caller executes the built queries.
#[derive(Debug, Clone)]
pub struct QueryCriteria {
    filters: Vec<AppliedFilter>,
    sort_column: &'static str,
    sort_order: SortOrder,
}

impl QueryCriteria {
    /// Create criteria with the sort clause resolved against a whitelist
    #[must_use]
    pub fn new(sort: &SortConfig, sort_by: Option<&str>, order: Option<&str>) -> Self {
        let (sort_column, sort_order) = sort.resolve(sort_by, order);
        Self {
            filters: Vec::new(),
            sort_column,
            sort_order,
        }
    }

    /// Add a filter predicate; filters combine with AND in insertion order
    #[must_use]
    pub fn with_filter(mut self, filter: AppliedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Number of predicates that will be rendered
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Append the WHERE clause (if any filters are set) with bound values
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, filter) in self.filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(filter.column);
            builder.push(" ");
            builder.push(filter.operator.as_sql());
            builder.push(" ");

            match filter.operator {
                // Pattern operators bind the value wrapped in wildcards
                FilterOperator::Like | FilterOperator::ILike => {
                    builder.push_bind(format!("%{}%", filter.text_value()));
                }
                _ => {
                    match &filter.value {
                        FilterValue::Text(s) => builder.push_bind(s.clone()),
                        FilterValue::Int(i) => builder.push_bind(*i),
                        FilterValue::Float(f) => builder.push_bind(*f),
                    };
                }
            }
        }
    }

    /// Append the single ORDER BY clause
    pub fn push_order_by(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" ORDER BY ");
        builder.push(self.sort_column);
        builder.push(" ");
        builder.push(self.sort_order.as_sql());
    }

    /// Resolved sort column
    #[must_use]
    pub fn sort_column(&self) -> &'static str {
        self.sort_column
    }

    /// Resolved sort direction
    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }
}

impl AppliedFilter {
    /// Textual rendering of the value, used by the pattern operators
    fn text_value(&self) -> String {
        match &self.value {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Float(f) => f.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORT: SortConfig = SortConfig {
        allowed_fields: &["name", "stock", "price", "created_at"],
        default_field: "created_at",
        default_order: SortOrder::Desc,
    };

    const NAME_FILTER: FilterConfig = FilterConfig {
        query_param: "name",
        column: "name",
        operator: FilterOperator::ILike,
        value_type: FilterType::Text,
    };

    const MIN_STOCK_FILTER: FilterConfig = FilterConfig {
        query_param: "min_stock",
        column: "stock",
        operator: FilterOperator::Gte,
        value_type: FilterType::Int,
    };

    #[test]
    fn test_sort_resolve_allowed_field() {
        let (field, order) = SORT.resolve(Some("price"), Some("asc"));
        assert_eq!(field, "price");
        assert_eq!(order, SortOrder::Asc);
    }

    #[test]
    fn test_sort_resolve_unknown_field_falls_back() {
        let (field, order) = SORT.resolve(Some("id; DROP TABLE items"), None);
        assert_eq!(field, "created_at");
        assert_eq!(order, SortOrder::Desc);
    }

    #[test]
    fn test_sort_resolve_unknown_order_falls_back() {
        let (field, order) = SORT.resolve(Some("name"), Some("sideways"));
        assert_eq!(field, "name");
        assert_eq!(order, SortOrder::Desc);
    }

    #[test]
    fn test_sort_resolve_absent_params() {
        let (field, order) = SORT.resolve(None, None);
        assert_eq!(field, "created_at");
        assert_eq!(order, SortOrder::Desc);
    }

    #[test]
    fn test_filter_bind_absent_adds_no_predicate() {
        assert!(NAME_FILTER.bind(None).unwrap().is_none());
    }

    #[test]
    fn test_filter_bind_empty_adds_no_predicate() {
        assert!(NAME_FILTER.bind(Some("")).unwrap().is_none());
    }

    #[test]
    fn test_filter_bind_parses_int() {
        let applied = MIN_STOCK_FILTER.bind(Some("10")).unwrap().unwrap();
        assert_eq!(applied.value, FilterValue::Int(10));
    }

    #[test]
    fn test_filter_bind_rejects_unparsable_int() {
        let err = MIN_STOCK_FILTER.bind(Some("lots")).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_where_clause_rendering() {
        let criteria = QueryCriteria::new(&SORT, None, None)
            .with_filter(NAME_FILTER.bind(Some("Laptop")).unwrap().unwrap())
            .with_filter(MIN_STOCK_FILTER.bind(Some("5")).unwrap().unwrap());

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        criteria.push_where(&mut builder);
        criteria.push_order_by(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT * FROM items WHERE name ILIKE $1 AND stock >= $2 \
             ORDER BY created_at DESC"
        );
    }

    #[test]
    fn test_no_filters_renders_no_where() {
        let criteria = QueryCriteria::new(&SORT, Some("name"), Some("asc"));

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
        criteria.push_where(&mut builder);

        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM items");
    }

    #[test]
    fn test_criteria_rerenderable_for_count_and_fetch() {
        let criteria = QueryCriteria::new(&SORT, None, None)
            .with_filter(MIN_STOCK_FILTER.bind(Some("3")).unwrap().unwrap());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
        criteria.push_where(&mut count);

        let mut fetch = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        criteria.push_where(&mut fetch);

        assert_eq!(count.sql(), "SELECT COUNT(*) FROM items WHERE stock >= $1");
        assert_eq!(fetch.sql(), "SELECT * FROM items WHERE stock >= $1");
    }

    #[test]
    fn test_pattern_value_wrapped_in_wildcards() {
        let criteria = QueryCriteria::new(&SORT, None, None)
            .with_filter(NAME_FILTER.bind(Some("KeyBoard")).unwrap().unwrap());
        assert_eq!(criteria.filter_count(), 1);

        // Wildcard wrapping happens at bind time; the SQL text carries only
        // the placeholder.
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        criteria.push_where(&mut builder);
        assert!(builder.sql().contains("name ILIKE $1"));
    }
}
