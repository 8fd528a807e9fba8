//! Resource provider abstraction.
//!
//! A [`ResourceProvider`] accepts a [`Resource`](crate::resource::Resource)
//! descriptor and a completion callback and returns a cancelable
//! [`RequestHandle`]. One provider instance is shared (`Arc<dyn
//! ResourceProvider>`) across many independent loaders and must be safe for
//! concurrent use.
//!
//! [`CachedResourceProvider`] is the concrete implementation, composing a
//! [`ResourceCache`](crate::cache::ResourceCache) with an [`HttpClient`] on
//! a tokio runtime.

mod cached;
mod http;
mod types;

pub use cached::CachedResourceProvider;
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use types::{CompletionCallback, RequestHandle, ResourceError, ResourceProvider, ResourceResponse};

#[cfg(test)]
pub use http::tests::MockHttpClient;
