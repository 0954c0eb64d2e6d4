//! Zoho CRM source client.
//!
//! This crate defines the [`CrmSource`] trait the sync orchestrator reads
//! through, and [`ZohoClient`], its implementation over the Zoho CRM v8 REST
//! API. OAuth token refresh is internal to the client: callers never see a
//! token, only [`Error::Authentication`] when the refresh token is rejected.

mod client;
mod error;
mod token;
mod traits;

pub use client::{ZohoClient, ZohoConfig, DEFAULT_PAGE_SIZE, USERS_MODULE};
pub use error::{Error, Result};
pub use token::TokenCache;
pub use traits::{CrmSource, ModuleInfo, RecordsPage};
