//! Credential wrappers for [`HttpClient`](super::HttpClient).
//!
//! InfluxDB 1.x accepts either `u`/`p` query parameters or an
//! `Authorization: Token <user:password | token>` header.

mod token;
mod url_param;

pub use token::TokenAuth;
pub use url_param::UrlCredentials;
