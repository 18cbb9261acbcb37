// dispatch.rs — Dispatcher: run a batch of events through their handlers.
//
// Events are processed strictly in arrival order on the calling thread. The
// identity cache is the single shared mutable structure, so there is no
// fan-out: every persist happens before the next event starts.
//
// Crash safety: the cache is flushed immediately after any event that
// changed it, whatever the handler returned. A crash can lose at most the
// in-flight event's mapping.
//
// Failure isolation: a missing handler, a handler error, or a handler panic
// is logged and recorded for that event only. The batch always runs to the
// end, and the report never feeds back into the exit code.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use ns_events::{EventKind, NormalizedEvent};
use serde::Serialize;

use crate::context::{SyncContext, UpsertOutcome};
use crate::error::SyncError;
use crate::handlers::kind_handler;

/// A per-kind event handler.
pub type Handler = Box<dyn Fn(&mut SyncContext, &NormalizedEvent) -> Result<EventOutcome, SyncError>>;

/// Why an event was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoHandler,
    NoIdentifier,
    Unroutable,
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Created { remote_id: String },
    Updated { remote_id: String },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl From<UpsertOutcome> for EventOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Created(remote_id) => EventOutcome::Created { remote_id },
            UpsertOutcome::Updated(remote_id) => EventOutcome::Updated { remote_id },
            UpsertOutcome::Unroutable => EventOutcome::Skipped {
                reason: SkipReason::Unroutable,
            },
            UpsertOutcome::Failed(error) => EventOutcome::Failed { error },
        }
    }
}

/// Outcome of one event, tagged with its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub index: usize,
    pub kind: String,
    #[serde(flatten)]
    pub outcome: EventOutcome,
}

/// Everything that happened during one dispatch call.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub events: Vec<EventRecord>,
}

impl DispatchReport {
    fn count(&self, pred: impl Fn(&EventOutcome) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Updated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Failed { .. }))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Routes events to handlers registered per kind name.
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
}

impl Dispatcher {
    /// A dispatcher with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A dispatcher with handlers for every built-in kind.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::new();
        for kind in EventKind::ALL {
            dispatcher.handlers.insert(kind.as_str().to_string(), kind_handler(kind));
        }
        dispatcher
    }

    /// Register (or replace) the handler for `kind`.
    ///
    /// Known kinds are stored under their canonical name, matching what
    /// `classify` emits, so `issue` and `issues` share one slot.
    pub fn register<F>(&mut self, kind: &str, handler: F)
    where
        F: Fn(&mut SyncContext, &NormalizedEvent) -> Result<EventOutcome, SyncError> + 'static,
    {
        let kind = EventKind::parse(kind).map_or_else(|| kind.to_string(), |k| k.as_str().to_string());
        tracing::debug!(kind = %kind, "registering handler");
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Process every event in order. Never fails as a whole.
    pub fn dispatch(&self, ctx: &mut SyncContext, events: &[NormalizedEvent]) -> DispatchReport {
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(events.len());

        for (index, event) in events.iter().enumerate() {
            let outcome = self.dispatch_one(ctx, event);
            records.push(EventRecord {
                index,
                kind: event.kind.clone(),
                outcome,
            });
        }

        if events.is_empty() {
            tracing::info!("no events to dispatch");
        }

        DispatchReport {
            started_at,
            finished_at: Utc::now(),
            events: records,
        }
    }

    fn dispatch_one(&self, ctx: &mut SyncContext, event: &NormalizedEvent) -> EventOutcome {
        let kind = event.kind.as_str();
        let Some(handler) = self.handlers.get(kind) else {
            tracing::warn!(kind, "no handler registered for event kind, skipping");
            return EventOutcome::Skipped {
                reason: SkipReason::NoHandler,
            };
        };

        tracing::debug!(kind, "dispatching event");
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx, event)));

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(kind, error = %e, "handler failed");
                EventOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(kind, error = %message, "handler panicked");
                EventOutcome::Failed { error: message }
            }
        };

        if ctx.has_unsaved_changes() {
            if let Err(e) = ctx.persist_cache() {
                tracing::error!(
                    kind,
                    path = %ctx.cache().path().display(),
                    error = %e,
                    "failed to persist identity cache"
                );
            }
        }

        outcome
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
