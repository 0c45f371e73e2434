//! Client for a Supabase project: PostgREST reads and writes plus the
//! GoTrue auth endpoints.

pub mod auth;
pub mod client;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod payload;
pub mod query;

pub use auth::{AuthUserRecord, Session, SignUpOutcome};
pub use client::{
    AccessToken, RemoteRequest, RemoteResponse, SupabaseClient, SupabaseSettings, DEFAULT_TIMEOUT,
};
pub use error::{DataError, DataResult};
pub use filter::{Filter, FilterOperator};
pub use mutation::{MutationKind, MutationSpec, Scope};
pub use payload::Payload;
pub use query::{Direction, Query, QuerySpec};
