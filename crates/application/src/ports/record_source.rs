use std::sync::Arc;

use async_trait::async_trait;
use fleet_dns_domain::RecordSet;

/// Port for the current instance record snapshot. Implementations may
/// reload behind the call; the returned set is immutable.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn record_set(&self) -> Arc<RecordSet>;
}
