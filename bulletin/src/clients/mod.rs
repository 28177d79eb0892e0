//! Network-facing collaborators of the orchestrators.
//!
//! Each concern is a trait so orchestrators can be driven by fakes in tests;
//! the `Http*` types are the production implementations.

mod record_lookup;
mod remote_query;

use std::time::Duration;

pub use record_lookup::{BrowseRecorder, HttpRecordStore, RecordLookupClient};
pub use remote_query::{
    HttpRemoteQueryClient, RemoteQueryClient, QA_SEARCH_ENDPOINT, RECOMMEND_ENDPOINT,
};

/// Shared HTTP client for both services.
pub fn build_http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
