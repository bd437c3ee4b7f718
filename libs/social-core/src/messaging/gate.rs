use remote_store::Store;
use uuid::Uuid;

use crate::error::SocialResult;
use crate::registry::find_connection;

/// Whether a message may pass between the two users: true exactly when
/// the pair has an established connection. Stateless and re-evaluated on
/// every call (no caching), so a disconnect takes effect on the very next
/// attempt. Must run before both send and conversation reads.
pub async fn authorize(store: &dyn Store, a: Uuid, b: Uuid) -> SocialResult<bool> {
    Ok(find_connection(store, a, b).await?.is_some())
}
