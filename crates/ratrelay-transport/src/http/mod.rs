//! HTTP collaborators for the rescue API.

mod api;
mod case_store;
mod names;

pub use api::ApiClient;
pub use case_store::HttpCaseStore;
pub use names::HttpNameResolver;
