// client.rs — The remote store capability the engine depends on.
//
// The engine only ever needs two operations from the remote store. Any
// transport (the Notion HTTP client, the dry-run logger, test doubles) plugs
// in by implementing this trait.

use ns_events::RecordProperties;

use crate::error::RemoteError;

/// Create and update records in the remote store.
pub trait RemoteClient {
    /// Create a record under `parent_id` and return the new record id.
    fn create(&self, parent_id: &str, properties: &RecordProperties) -> Result<String, RemoteError>;

    /// Replace the properties of an existing record.
    fn update(&self, record_id: &str, properties: &RecordProperties) -> Result<(), RemoteError>;

    /// Client display name (for logs).
    fn name(&self) -> &str {
        "remote"
    }
}

impl<T: RemoteClient + ?Sized> RemoteClient for Box<T> {
    fn create(&self, parent_id: &str, properties: &RecordProperties) -> Result<String, RemoteError> {
        (**self).create(parent_id, properties)
    }

    fn update(&self, record_id: &str, properties: &RecordProperties) -> Result<(), RemoteError> {
        (**self).update(record_id, properties)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
