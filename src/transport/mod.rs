//! HTTP transport shared by the roster fetcher and the webhook sink.
//!
//! This module provides:
//! - Request/response value types ([`HttpRequest`], [`HttpResponse`])
//! - The client abstraction ([`HttpClient`]) and its error type ([`HttpError`])
//! - The production client ([`ReqwestClient`])

mod client;
mod error;
mod types;


pub use client::ReqwestClient;
pub use error::HttpError;
pub use types::{HttpClient, HttpRequest, HttpResponse};
