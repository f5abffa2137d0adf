//! # BucketDB Server
//!
//! HTTP/JSON API over a BucketDB database.
//!
//! This crate provides:
//! - Bucket endpoints: list, create, list keys, delete
//! - Item endpoints: add, get, replace, delete
//! - Middleware: access log, panic recovery, content-type check, body limit
//! - A bounded wait for the writer slot on every write request
//!
//! # Endpoints
//!
//! All paths are under `/api`:
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | GET | `/v1/buckets` | | bucket names |
//! | POST | `/v1/buckets` | `{"name": ...}` | empty |
//! | GET | `/v1/buckets/{name}` | | keys |
//! | DELETE | `/v1/buckets/{name}` | | empty |
//! | POST | `/v1/buckets/{name}` | `{"Key": ..., "Value": ...}` | empty |
//! | GET | `/v1/buckets/{name}/{key}` | | value |
//! | PUT | `/v1/buckets/{name}/{key}` | value | value |
//! | DELETE | `/v1/buckets/{name}/{key}` | | empty |
//!
//! Failures answer `{"Error": "<message>"}`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
pub mod handlers;
mod middleware;
pub mod routes;
mod server;
mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
