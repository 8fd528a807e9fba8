//! Tile owner capability.

use bytes::Bytes;

use crate::provider::ResourceError;
use crate::resource::Freshness;

/// The tile owner's sink for loader outcomes.
///
/// The owner constructs its loader with a value implementing this trait
/// (commonly a channel sender or a handle to the owner's state) and owns the
/// loader outright, so the owner always outlives it. Once the loader is
/// dropped neither method is ever called again, even for requests that were
/// still in flight.
///
/// Both methods are invoked from the resource provider's completion context
/// while the loader's internal lock is held: implementations must return
/// promptly and must not call back into the loader synchronously.
pub trait TileObserver: Send + Sync + 'static {
    /// A payload is ready for decoding.
    ///
    /// Also invoked for cached payloads that are about to be revalidated:
    /// stale data is still displayable while a fresher version is fetched.
    fn apply_loaded(&self, data: Bytes, freshness: Freshness);

    /// A network attempt failed. The loader does not retry on its own.
    fn apply_error(&self, error: ResourceError);
}
