//! # Tracing Notifier
//!
//! The app-side notification collaborator: domain events become structured
//! log lines. Delivery to mail/webhook transports hangs off the same log
//! pipeline downstream; the engine neither knows nor waits.

use gradus_core::{DomainEvent, Notifier};

/// Forwards every domain event to the tracing pipeline.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &DomainEvent) {
        match event {
            DomainEvent::GroupStatusChanged {
                actor,
                group,
                old,
                new,
            } => {
                tracing::info!(
                    event = "group_status_changed",
                    actor = actor.0,
                    group = group.0,
                    old = %old,
                    new = %new,
                    "group {} moved {} -> {}",
                    group.0,
                    old,
                    new
                );
            }
            DomainEvent::ThesisStatusChanged {
                actor,
                thesis,
                old,
                new,
            } => {
                tracing::info!(
                    event = "thesis_status_changed",
                    actor = actor.0,
                    thesis = thesis.0,
                    old = %old,
                    new = %new,
                    "thesis {} moved {} -> {}",
                    thesis.0,
                    old,
                    new
                );
            }
            DomainEvent::AdviserAssigned {
                actor,
                group,
                adviser,
            } => {
                tracing::info!(
                    event = "adviser_assigned",
                    actor = actor.0,
                    group = group.0,
                    adviser = adviser.0,
                    "adviser {} assigned to group {}",
                    adviser.0,
                    group.0
                );
            }
            DomainEvent::PanelAssigned {
                actor,
                group,
                panels,
            } => {
                tracing::info!(
                    event = "panel_assigned",
                    actor = actor.0,
                    group = group.0,
                    panel_count = panels.len(),
                    "panel of {} assigned to group {}",
                    panels.len(),
                    group.0
                );
            }
        }
    }
}
