// Service exports
pub mod amap;
pub mod postgres;
pub mod provider;
pub mod retry;
pub mod snapshot;
pub mod store;

pub use amap::{marker_url, navigation_url, AmapClient};
pub use postgres::PostgresClient;
pub use provider::{Geocoder, ProviderError, RouteProvider};
pub use retry::{AttemptError, BackoffStrategy, RetryPolicy};
pub use snapshot::SnapshotStore;
pub use store::{Repository, StoreError};
