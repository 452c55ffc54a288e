//! Named route templates, stub fallback and JSON request dispatch.
//!
//! Callers address endpoints by a logical path key. A [`config::RouteTable`] maps each key to a
//! URL template (`/users/:id`) and an optional [`config::StubTable`] supplies canned responses
//! for offline use. [`client::ApiClient::dispatch`] ties the two together.

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod resolver;
pub mod transport;

pub use client::ApiClient;
pub use config::{ClientConfig, RouteTable, StubTable};
pub use error::{ApiError, Result, SoftFailure};
pub use request::{ApiRequest, RequestDescriptor, RequestMethod};
pub use resolver::{RequestParams, resolve_url};
pub use transport::{CacheMode, NextOptions, Revalidate, TransportOptions};
