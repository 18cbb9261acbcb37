// handlers.rs — Built-in handlers: build properties, then upsert.

use ns_events::{build_properties, entity_identifier, EventKind, NormalizedEvent};

use crate::context::SyncContext;
use crate::dispatch::{EventOutcome, Handler, SkipReason};
use crate::error::SyncError;

/// The handler for one of the built-in kinds.
///
/// Fails without touching the remote store when handed an event of another
/// kind, which only happens when it is registered under a foreign name.
pub fn kind_handler(kind: EventKind) -> Handler {
    Box::new(
        move |ctx: &mut SyncContext, event: &NormalizedEvent| -> Result<EventOutcome, SyncError> {
            if event.event_kind() != Some(kind) {
                return Err(SyncError::Handler {
                    kind: event.kind.clone(),
                    message: format!("built-in '{}' handler cannot process this event", kind),
                });
            }
            Ok(sync_entity(ctx, kind, event))
        },
    )
}

/// Project one entity of `kind` into the remote store.
///
/// Entities without any identifier are skipped with a warning: there is
/// nothing stable to key the mapping on.
pub fn sync_entity(ctx: &mut SyncContext, kind: EventKind, event: &NormalizedEvent) -> EventOutcome {
    let Some(source_id) = entity_identifier(&event.entity) else {
        tracing::warn!(
            kind = %kind,
            "entity has no node_id, id, number or name, skipping"
        );
        return EventOutcome::Skipped {
            reason: SkipReason::NoIdentifier,
        };
    };

    let extra = (!event.context.is_empty()).then_some(&event.context);
    let properties = build_properties(kind, &event.entity, extra);
    ctx.upsert(kind.as_str(), &source_id, &properties).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteClient;
    use crate::error::RemoteError;
    use crate::routing::RoutingTable;
    use ns_cache::IdentityCache;
    use ns_events::{PropertyField, RecordProperties};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Capture {
        created: Rc<RefCell<Vec<RecordProperties>>>,
    }

    impl RemoteClient for Capture {
        fn create(&self, _: &str, properties: &RecordProperties) -> Result<String, RemoteError> {
            self.created.borrow_mut().push(properties.clone());
            Ok("page-1".to_string())
        }

        fn update(&self, _: &str, _: &RecordProperties) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn event(kind: &str, entity: serde_json::Value) -> NormalizedEvent {
        NormalizedEvent::new(kind, entity.as_object().cloned().unwrap())
    }

    #[test]
    fn entity_without_identifier_is_skipped() {
        let capture = Capture::default();
        let mut ctx = SyncContext::new(
            capture.clone(),
            IdentityCache::empty("unused.json"),
            RoutingTable::new().with_default("db"),
        );

        let outcome = sync_entity(&mut ctx, EventKind::Issues, &event("issues", json!({"title": "x"})));

        assert_eq!(
            outcome,
            EventOutcome::Skipped {
                reason: SkipReason::NoIdentifier
            }
        );
        assert!(capture.created.borrow().is_empty());
    }

    #[test]
    fn foreign_kind_is_rejected_before_any_call() {
        let capture = Capture::default();
        let mut ctx = SyncContext::new(
            capture.clone(),
            IdentityCache::empty("unused.json"),
            RoutingTable::new().with_default("db"),
        );
        let handler = kind_handler(EventKind::Issues);

        let result = handler(&mut ctx, &event("deployment", json!({"id": 3})));

        assert!(matches!(
            result,
            Err(SyncError::Handler { ref kind, .. }) if kind == "deployment"
        ));
        assert!(capture.created.borrow().is_empty());
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn delivery_context_lands_in_metadata() {
        let capture = Capture::default();
        let mut ctx = SyncContext::new(
            capture.clone(),
            IdentityCache::empty("unused.json"),
            RoutingTable::new().with_default("db"),
        );
        let mut ev = event("issues", json!({"id": 1, "title": "Bug"}));
        ev.context.insert("action".into(), json!("opened"));

        let outcome = sync_entity(&mut ctx, EventKind::Issues, &ev);

        assert_eq!(outcome, EventOutcome::Created { remote_id: "page-1".into() });
        let created = capture.created.borrow();
        let meta = created[0].text(PropertyField::Metadata).unwrap();
        assert!(meta.contains("\"action\": \"opened\""));
    }
}
