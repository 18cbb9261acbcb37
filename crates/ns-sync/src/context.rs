// context.rs — SyncContext: the idempotent upsert.
//
// Policy: update-if-known, else create-and-remember. As long as the identity
// cache survives between runs, replays of the same source entity always land
// on the same remote record.
//
// Remote failures never escape `upsert`. They are logged with everything we
// know (kind, source id, cache key, remote id) and reported as "no change".
// A failed create leaves no mapping behind, so the next run creates afresh.

use ns_cache::{cache_key, CacheError, IdentityCache};
use ns_events::RecordProperties;

use crate::client::RemoteClient;
use crate::routing::RoutingTable;

/// Result of a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A record was created and its id remembered.
    Created(String),
    /// The known record was updated in place.
    Updated(String),
    /// No destination is configured for the kind.
    Unroutable,
    /// The remote call failed; nothing changed.
    Failed(String),
}

impl UpsertOutcome {
    /// Whether the identity cache was mutated.
    pub fn changed(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }

    /// The remote record the event resolved to, if any.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => Some(id),
            UpsertOutcome::Unroutable | UpsertOutcome::Failed(_) => None,
        }
    }
}

/// Client, identity cache, and routing for one run.
pub struct SyncContext {
    client: Box<dyn RemoteClient>,
    cache: IdentityCache,
    routing: RoutingTable,
    persist: bool,
    /// Set by any cache mutation, cleared by a successful flush.
    dirty: bool,
}

impl SyncContext {
    pub fn new(client: impl RemoteClient + 'static, cache: IdentityCache, routing: RoutingTable) -> Self {
        Self {
            client: Box::new(client),
            cache,
            routing,
            persist: true,
            dirty: false,
        }
    }

    /// Keep cache mutations in memory only. Used for dry runs, whose
    /// synthetic record ids must never reach the state file.
    pub fn without_persistence(mut self) -> Self {
        self.persist = false;
        self
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Whether the in-memory cache holds mappings not yet flushed to disk.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Create or update the record for `(kind, source_id)`.
    pub fn upsert(&mut self, kind: &str, source_id: &str, properties: &RecordProperties) -> UpsertOutcome {
        let outcome = self.apply_upsert(kind, source_id, properties);
        if outcome.changed() {
            self.dirty = true;
        }
        outcome
    }

    fn apply_upsert(&mut self, kind: &str, source_id: &str, properties: &RecordProperties) -> UpsertOutcome {
        let key = cache_key(kind, source_id);

        let Some(destination) = self.routing.resolve(kind) else {
            tracing::error!(
                kind,
                source_id,
                key = %key,
                "no destination database configured for event kind, skipping"
            );
            return UpsertOutcome::Unroutable;
        };

        if let Some(remote_id) = self.cache.get(&key) {
            return match self.client.update(remote_id, properties) {
                Ok(()) => {
                    tracing::info!(kind, source_id, key = %key, remote_id, "updated record");
                    UpsertOutcome::Updated(remote_id.to_string())
                }
                Err(e) => {
                    tracing::error!(
                        kind,
                        source_id,
                        key = %key,
                        remote_id,
                        destination,
                        error = %e,
                        "failed to update record"
                    );
                    UpsertOutcome::Failed(e.to_string())
                }
            };
        }

        match self.client.create(destination, properties) {
            Ok(remote_id) => {
                tracing::info!(
                    kind,
                    source_id,
                    key = %key,
                    remote_id = %remote_id,
                    destination,
                    "created record"
                );
                self.cache.insert(key, remote_id.clone());
                UpsertOutcome::Created(remote_id)
            }
            Err(e) => {
                tracing::error!(
                    kind,
                    source_id,
                    key = %key,
                    destination,
                    error = %e,
                    "failed to create record"
                );
                UpsertOutcome::Failed(e.to_string())
            }
        }
    }

    /// Flush the identity cache to disk, unless persistence is disabled.
    pub fn persist_cache(&mut self) -> Result<(), CacheError> {
        if !self.persist {
            tracing::debug!(entries = self.cache.len(), "cache persistence disabled, skipping flush");
            self.dirty = false;
            return Ok(());
        }
        self.cache.persist()?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(String),
        Update(String),
    }

    #[derive(Clone, Default)]
    struct MockClient {
        calls: Rc<RefCell<Vec<Call>>>,
        fail: bool,
    }

    impl RemoteClient for MockClient {
        fn create(&self, parent_id: &str, _: &RecordProperties) -> Result<String, RemoteError> {
            self.calls.borrow_mut().push(Call::Create(parent_id.to_string()));
            if self.fail {
                return Err(RemoteError::Unauthorized { status: 401 });
            }
            Ok(format!("page-{}", self.calls.borrow().len()))
        }

        fn update(&self, record_id: &str, _: &RecordProperties) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(Call::Update(record_id.to_string()));
            if self.fail {
                return Err(RemoteError::Transport("connection reset".into()));
            }
            Ok(())
        }
    }

    fn context(client: MockClient, routing: RoutingTable) -> SyncContext {
        let dir = tempdir().unwrap();
        SyncContext::new(client, IdentityCache::empty(dir.path().join("c.json")), routing)
    }

    #[test]
    fn create_then_update_same_record() {
        let client = MockClient::default();
        let mut ctx = context(client.clone(), RoutingTable::new().with_default("db"));
        let props = RecordProperties::new("Bug");

        let first = ctx.upsert("issues", "1", &props);
        assert_eq!(first, UpsertOutcome::Created("page-1".into()));
        assert!(first.changed());

        assert!(ctx.has_unsaved_changes());

        let second = ctx.upsert("issues", "1", &props);
        assert_eq!(second, UpsertOutcome::Updated("page-1".into()));
        assert!(!second.changed());

        assert_eq!(
            *client.calls.borrow(),
            vec![Call::Create("db".into()), Call::Update("page-1".into())]
        );
        assert_eq!(ctx.cache().len(), 1);
        assert_eq!(ctx.cache().get("issues:1"), Some("page-1"));
    }

    #[test]
    fn unroutable_kind_makes_no_calls() {
        let client = MockClient::default();
        let mut ctx = context(client.clone(), RoutingTable::new().with_route("issues", "db"));

        let outcome = ctx.upsert("discussion", "9", &RecordProperties::new("Q"));

        assert_eq!(outcome, UpsertOutcome::Unroutable);
        assert_eq!(outcome.remote_id(), None);
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn failed_create_leaves_no_mapping() {
        let client = MockClient {
            fail: true,
            ..Default::default()
        };
        let mut ctx = context(client, RoutingTable::new().with_default("db"));

        let outcome = ctx.upsert("issues", "1", &RecordProperties::new("Bug"));

        assert!(matches!(outcome, UpsertOutcome::Failed(_)));
        assert!(!outcome.changed());
        assert!(ctx.cache().is_empty());
        assert!(!ctx.has_unsaved_changes());
    }

    #[test]
    fn failed_update_keeps_mapping() {
        let dir = tempdir().unwrap();
        let mut cache = IdentityCache::empty(dir.path().join("c.json"));
        cache.insert("issues:1", "page-1");
        let client = MockClient {
            fail: true,
            ..Default::default()
        };
        let mut ctx = SyncContext::new(client, cache, RoutingTable::new().with_default("db"));

        let outcome = ctx.upsert("issues", "1", &RecordProperties::new("Bug"));

        assert!(matches!(outcome, UpsertOutcome::Failed(_)));
        assert_eq!(ctx.cache().get("issues:1"), Some("page-1"));
    }

    #[test]
    fn disabled_persistence_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        let mut ctx = SyncContext::new(
            MockClient::default(),
            IdentityCache::empty(&path),
            RoutingTable::new().with_default("db"),
        )
        .without_persistence();

        ctx.upsert("issues", "1", &RecordProperties::new("Bug"));
        ctx.persist_cache().unwrap();

        assert!(!path.exists());
        assert!(!ctx.has_unsaved_changes());
    }
}
