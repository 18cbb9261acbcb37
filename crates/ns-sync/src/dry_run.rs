// dry_run.rs — DryRunClient: a RemoteClient that only logs.
//
// Every call is logged with the destination and the properties that would
// have been sent. Creates return synthetic `dry-run:<parent>:<n>` ids, so a
// dry-run context must be built with `without_persistence()`.

use std::cell::Cell;

use ns_events::RecordProperties;

use crate::client::RemoteClient;
use crate::error::RemoteError;

/// Client used when `--dry-run` is passed. Makes no network requests.
#[derive(Debug, Default)]
pub struct DryRunClient {
    created: Cell<usize>,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of creates that would have been issued.
    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl RemoteClient for DryRunClient {
    fn create(&self, parent_id: &str, properties: &RecordProperties) -> Result<String, RemoteError> {
        let n = self.created.get() + 1;
        self.created.set(n);
        tracing::info!(
            parent_id,
            properties = %render(properties),
            "[DRY-RUN] would create record"
        );
        Ok(format!("dry-run:{}:{}", parent_id, n))
    }

    fn update(&self, record_id: &str, properties: &RecordProperties) -> Result<(), RemoteError> {
        tracing::info!(
            record_id,
            properties = %render(properties),
            "[DRY-RUN] would update record"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

fn render(properties: &RecordProperties) -> String {
    serde_json::to_string(properties).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
