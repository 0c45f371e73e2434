//! Read queries.
//!
//! A [`QuerySpec`] is a plain value: every builder method consumes it and
//! returns the changed copy, and [`QuerySpec::compile`] turns it into one
//! [`RemoteRequest`]. [`Query`] pairs a [`QuerySpec`] with a client and a caller token
//! and is consumed by [`Query::execute`].

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::client::{AccessToken, RemoteRequest, SupabaseClient, REST_PREFIX};
use super::error::{DataError, DataResult};
use super::filter::{self, Filter, FilterOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    fn to_param(&self) -> String {
        match self.direction {
            Direction::Ascending => self.column.clone(),
            Direction::Descending => format!("{}.desc", self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    collection: String,
    columns: Vec<String>,
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
    single: bool,
}

impl QuerySpec {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            single: false,
        }
    }

    /// Restricts the returned columns. An empty list keeps `*`.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !columns.is_empty() {
            self.columns = columns;
        }
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn where_op(
        self,
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        self.filter(Filter::new(column, operator, value))
    }

    /// Like [`QuerySpec::where_op`] with a textual operator. Unknown
    /// operators fail here rather than reaching the wire.
    pub fn filter_str(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<String>,
    ) -> DataResult<Self> {
        Ok(self.filter(Filter::parse(column, operator, value)?))
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Eq, value)
    }

    #[must_use]
    pub fn neq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Neq, value)
    }

    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Gt, value)
    }

    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Gte, value)
    }

    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Lt, value)
    }

    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Lte, value)
    }

    #[must_use]
    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::Like, pattern)
    }

    #[must_use]
    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.where_op(column, FilterOperator::ILike, pattern)
    }

    #[must_use]
    pub fn in_list<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter(Filter::in_list(column, values))
    }

    #[must_use]
    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(Filter::is_null(column))
    }

    /// Sets the sort key; a later call replaces an earlier one.
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: if ascending {
                Direction::Ascending
            } else {
                Direction::Descending
            },
        });
        self
    }

    /// A later call replaces an earlier one. Zero means "not set".
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = (n > 0).then_some(n);
        self
    }

    /// A later call replaces an earlier one. Zero means "not set".
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = (n > 0).then_some(n);
        self
    }

    /// Expect exactly one row, returned as an object. Forces `limit=1`.
    #[must_use]
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Effective row limit, accounting for single-row mode.
    pub fn effective_limit(&self) -> Option<u64> {
        if self.single {
            Some(1)
        } else {
            self.limit
        }
    }

    /// Compiles to a `GET rest/v1/<collection>` request. Fails without
    /// touching the network on an empty collection, column, or invalid
    /// filter.
    pub fn compile(&self) -> DataResult<RemoteRequest> {
        let collection = checked_collection(&self.collection)?;

        let select = if self.columns.is_empty() {
            "*".to_string()
        } else {
            if self.columns.iter().any(|c| c.trim().is_empty()) {
                return Err(DataError::invalid("selected column names must not be empty"));
            }
            self.columns.join(",")
        };

        let mut request = RemoteRequest::new(Method::GET, format!("{}/{}", REST_PREFIX, collection))
            .param("select", select)
            .params(filter::to_params(&self.filters)?);

        if let Some(order) = &self.order {
            if order.column.trim().is_empty() {
                return Err(DataError::invalid("order column must not be empty"));
            }
            request = request.param("order", order.to_param());
        }
        if let Some(limit) = self.effective_limit() {
            request = request.param("limit", limit.to_string());
        }
        if let Some(offset) = self.offset {
            request = request.param("offset", offset.to_string());
        }

        Ok(request.single_object(self.single))
    }
}

pub(crate) fn checked_collection(collection: &str) -> DataResult<&str> {
    let trimmed = collection.trim();
    if trimmed.is_empty() {
        return Err(DataError::invalid("collection name must not be empty"));
    }
    if trimmed.contains(&['/', '?', '#'][..]) {
        return Err(DataError::invalid(format!(
            "collection name '{}' contains reserved characters",
            collection
        )));
    }
    Ok(trimmed)
}

/// A [`QuerySpec`] bound to a client and, optionally, a caller token.
#[must_use = "a query does nothing until executed"]
pub struct Query<'c> {
    client: &'c SupabaseClient,
    spec: QuerySpec,
    token: Option<AccessToken>,
}

impl<'c> Query<'c> {
    pub(crate) fn new(client: &'c SupabaseClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            spec: QuerySpec::new(collection),
            token: None,
        }
    }

    /// Runs the query as the given user so row-level security applies.
    pub fn with_token(mut self, token: &AccessToken) -> Self {
        self.token = Some(token.clone());
        self
    }

    /// Applies any [`QuerySpec`] transformation, e.g. `.apply(|s| s.eq("id", id))`.
    pub fn apply(mut self, f: impl FnOnce(QuerySpec) -> QuerySpec) -> Self {
        self.spec = f(self.spec);
        self
    }

    pub fn select<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(|s| s.select(columns))
    }

    pub fn filter(self, filter: Filter) -> Self {
        self.apply(|s| s.filter(filter))
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.apply(|s| s.eq(column, value))
    }

    pub fn order(self, column: impl Into<String>, ascending: bool) -> Self {
        self.apply(|s| s.order(column, ascending))
    }

    pub fn limit(self, n: u64) -> Self {
        self.apply(|s| s.limit(n))
    }

    pub fn offset(self, n: u64) -> Self {
        self.apply(|s| s.offset(n))
    }

    pub fn single(self) -> Self {
        self.apply(QuerySpec::single)
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Sends the query and decodes the body into `T`: a `Vec` of rows
    /// normally, a single row in single-row mode.
    pub async fn execute<T: DeserializeOwned>(self) -> DataResult<T> {
        let request = self.spec.compile()?;
        let response = self.client.execute(request, self.token.as_ref()).await?;
        response.json()
    }
}

impl SupabaseClient {
    /// Starts a read query against `collection`.
    pub fn from(&self, collection: impl Into<String>) -> Query<'_> {
        Query::new(self, collection)
    }
}
