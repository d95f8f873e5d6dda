//! Inventory CRUD service
//!
//! A small HTTP service exposing CRUD over inventory items backed by
//! PostgreSQL, with query-parameter driven pagination, sorting, and
//! filtering, gated by a configurable rate limiter.
//!
//! # Architecture
//!
//! - [`query`] composes whitelist-validated sort clauses and typed filter
//!   predicates onto fresh query builders
//! - [`pagination`] wraps a filtered query with offset/limit bounds and
//!   computes page metadata from a matching count query
//! - [`middleware`] gates requests through either an in-process token
//!   bucket or a Redis fixed-window counter
//! - [`repository`] owns the SQL for item persistence over the shared pool
//! - [`handlers`] translate HTTP requests into the above
//!
//! Control flow per request: rate limiter, handler, query builder,
//! pagination engine, persistence.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod responses;
pub mod seed;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{CreateItem, Item, UpdateItem};
pub use pagination::{PageMeta, PageParams, Paginated};
pub use query::{FilterConfig, FilterOperator, QueryCriteria, SortConfig, SortOrder};
pub use repository::ItemRepository;
pub use server::Server;
pub use state::AppState;
