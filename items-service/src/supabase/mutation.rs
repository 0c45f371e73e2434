//! Insert, update and delete against a collection.
//!
//! Updates and deletes take an explicit [`Scope`]. Touching every row of a
//! collection is possible, but only by naming [`Scope::AllRows`].

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::client::{AccessToken, RemoteRequest, RemoteResponse, SupabaseClient, REST_PREFIX};
use super::error::{DataError, DataResult};
use super::filter::{self, Filter};
use super::payload::Payload;
use super::query::checked_collection;

/// Which rows an update or delete affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Rows matching every filter. Must be non-empty.
    Matching(Vec<Filter>),
    /// The whole collection.
    AllRows,
}

impl Scope {
    pub fn matching(filters: impl IntoIterator<Item = Filter>) -> Self {
        Scope::Matching(filters.into_iter().collect())
    }

    pub fn by_id(value: impl Into<String>) -> Self {
        Scope::Matching(vec![Filter::eq("id", value)])
    }

    fn to_params(&self) -> DataResult<Vec<(String, String)>> {
        match self {
            Scope::Matching(filters) if filters.is_empty() => Err(DataError::invalid(
                "an empty filter scope is not allowed; use Scope::AllRows to target every row",
            )),
            Scope::Matching(filters) => filter::to_params(filters),
            Scope::AllRows => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    Insert(Payload),
    Update { payload: Payload, scope: Scope },
    Delete { scope: Scope },
}

/// A single write, described as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSpec {
    pub collection: String,
    pub kind: MutationKind,
    pub returning: bool,
}

impl MutationSpec {
    pub fn insert(collection: impl Into<String>, payload: Payload) -> Self {
        Self {
            collection: collection.into(),
            kind: MutationKind::Insert(payload),
            returning: false,
        }
    }

    pub fn update(collection: impl Into<String>, payload: Payload, scope: Scope) -> Self {
        Self {
            collection: collection.into(),
            kind: MutationKind::Update { payload, scope },
            returning: false,
        }
    }

    pub fn delete(collection: impl Into<String>, scope: Scope) -> Self {
        Self {
            collection: collection.into(),
            kind: MutationKind::Delete { scope },
            returning: false,
        }
    }

    #[must_use]
    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    fn scope(&self) -> Option<&Scope> {
        match &self.kind {
            MutationKind::Insert(_) => None,
            MutationKind::Update { scope, .. } | MutationKind::Delete { scope } => Some(scope),
        }
    }

    pub fn compile(&self) -> DataResult<RemoteRequest> {
        let path = format!("{}/{}", REST_PREFIX, checked_collection(&self.collection)?);

        let request = match &self.kind {
            MutationKind::Insert(payload) => {
                RemoteRequest::new(Method::POST, path).json_body(payload.clone().into_value())
            }
            MutationKind::Update { payload, scope } => {
                if payload.is_empty() {
                    return Err(DataError::invalid("update payload must set at least one field"));
                }
                RemoteRequest::new(Method::PATCH, path)
                    .params(scope.to_params()?)
                    .json_body(payload.clone().into_value())
            }
            MutationKind::Delete { scope } => {
                RemoteRequest::new(Method::DELETE, path).params(scope.to_params()?)
            }
        };

        Ok(request.return_representation(self.returning))
    }
}

impl SupabaseClient {
    /// Runs a compiled mutation and returns the raw response.
    pub async fn mutate(
        &self,
        spec: &MutationSpec,
        caller: Option<&AccessToken>,
    ) -> DataResult<RemoteResponse> {
        let request = spec.compile()?;
        if matches!(spec.scope(), Some(Scope::AllRows)) {
            tracing::warn!(
                collection = %spec.collection,
                method = %request.method,
                user_scoped = caller.map(|t| !t.is_empty()).unwrap_or(false),
                "Unscoped write affects every row in collection"
            );
        }
        self.execute(request, caller).await
    }

    async fn mutate_returning<T: DeserializeOwned>(
        &self,
        spec: MutationSpec,
        caller: Option<&AccessToken>,
    ) -> DataResult<Vec<T>> {
        let response = self.mutate(&spec.returning(), caller).await?;
        if response.is_empty() {
            return Ok(Vec::new());
        }
        response.json()
    }

    pub async fn insert(
        &self,
        collection: &str,
        payload: Payload,
        caller: Option<&AccessToken>,
    ) -> DataResult<()> {
        self.mutate(&MutationSpec::insert(collection, payload), caller)
            .await
            .map(|_| ())
    }

    pub async fn insert_returning<T: DeserializeOwned>(
        &self,
        collection: &str,
        payload: Payload,
        caller: Option<&AccessToken>,
    ) -> DataResult<Vec<T>> {
        self.mutate_returning(MutationSpec::insert(collection, payload), caller)
            .await
    }

    pub async fn update(
        &self,
        collection: &str,
        payload: Payload,
        scope: Scope,
        caller: Option<&AccessToken>,
    ) -> DataResult<()> {
        self.mutate(&MutationSpec::update(collection, payload, scope), caller)
            .await
            .map(|_| ())
    }

    /// Updated rows. Zero matches is an empty `Vec`, not an error.
    pub async fn update_returning<T: DeserializeOwned>(
        &self,
        collection: &str,
        payload: Payload,
        scope: Scope,
        caller: Option<&AccessToken>,
    ) -> DataResult<Vec<T>> {
        self.mutate_returning(MutationSpec::update(collection, payload, scope), caller)
            .await
    }

    /// Succeeds whether or not any row matched.
    pub async fn delete(
        &self,
        collection: &str,
        scope: Scope,
        caller: Option<&AccessToken>,
    ) -> DataResult<()> {
        self.mutate(&MutationSpec::delete(collection, scope), caller)
            .await
            .map(|_| ())
    }

    pub async fn delete_returning<T: DeserializeOwned>(
        &self,
        collection: &str,
        scope: Scope,
        caller: Option<&AccessToken>,
    ) -> DataResult<Vec<T>> {
        self.mutate_returning(MutationSpec::delete(collection, scope), caller)
            .await
    }
}
