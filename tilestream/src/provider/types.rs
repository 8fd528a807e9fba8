//! Provider contract types: responses, errors, handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::resource::{Freshness, Resource};

/// Failures a provider can report for a network attempt.
///
/// Cache misses are not failures; they surface as
/// [`ResourceResponse::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("connection failed: {0}")]
    Connection(String),

    /// The origin answered with an error status.
    #[error("server returned HTTP {code}")]
    Status { code: u16 },

    /// The origin asked us to back off.
    #[error("rate limited by remote server")]
    RateLimited,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Outcome of one resource request.
#[derive(Debug, Clone)]
pub enum ResourceResponse {
    /// The resource was obtained.
    Found {
        /// Payload bytes.
        data: Bytes,
        /// Validators recorded for future revalidation decisions.
        freshness: Freshness,
    },

    /// A cache lookup did not find an entry. Control flow, not an error.
    NotFound,

    /// A network attempt failed.
    Error(ResourceError),
}

/// Completion callback for a resource request.
///
/// Invoked exactly once, from the provider's own worker context, never
/// synchronously from within [`ResourceProvider::request`] (callers issue
/// requests while holding internal locks).
pub type CompletionCallback = Box<dyn FnOnce(ResourceResponse) + Send + 'static>;

/// Opaque cancelable token for an in-flight resource request.
///
/// Cancellation is cooperative: the provider's worker observes the token and
/// stops without invoking the completion callback. `cancel` is idempotent
/// and safe to call after the completion has already fired; dropping the
/// handle also cancels.
pub struct RequestHandle {
    id: u64,
    token: CancellationToken,
}

impl RequestHandle {
    /// Wrap a cancellation token as a request handle.
    ///
    /// Providers keep a child of `token` in their worker and select on it.
    pub fn new(token: CancellationToken) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            token,
        }
    }

    /// Identifier for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request provider-side cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        // A handle that goes away can never be cancelled later; cancel now.
        // Cancelling an already-completed request is a no-op.
        self.token.cancel();
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Cache-and-network fetch capability.
///
/// Implementations execute fetches on their own worker context(s) and invoke
/// the completion callback from there. A single instance is shared across
/// many loaders and must be safe for concurrent use.
pub trait ResourceProvider: Send + Sync {
    /// Begin fetching `resource`, honoring its
    /// [`LoadStrategy`](crate::resource::LoadStrategy).
    ///
    /// `on_complete` is invoked at most once: never after the returned
    /// handle was cancelled, and never synchronously from this call.
    fn request(&self, resource: &Resource, on_complete: CompletionCallback) -> RequestHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_cancel_is_idempotent() {
        let token = CancellationToken::new();
        let handle = RequestHandle::new(token.clone());

        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_handle_cancels_on_drop() {
        let token = CancellationToken::new();
        {
            let _handle = RequestHandle::new(token.clone());
        }
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_handle_ids_are_distinct() {
        let a = RequestHandle::new(CancellationToken::new());
        let b = RequestHandle::new(CancellationToken::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_resource_error_display() {
        assert_eq!(
            ResourceError::Status { code: 503 }.to_string(),
            "server returned HTTP 503"
        );
        assert!(ResourceError::Connection("refused".into())
            .to_string()
            .contains("refused"));
    }
}
