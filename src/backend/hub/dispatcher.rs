/**
 * Broadcast Dispatcher
 *
 * Pushes a stored message event to every connection joined to its chat.
 *
 * # Delivery
 *
 * Each member is offered the frame with a non-blocking `try_send` into its
 * bounded mailbox. A full or closed mailbox is a failure for that member
 * only; the rest of the room still receives the event. Nothing is retried:
 * a member that misses an event reconciles through history.
 *
 * # Ordering
 *
 * The gateway calls `dispatch` while it still holds the chat's sequencing
 * lock, and each mailbox is FIFO, so per-chat order is the order of
 * persistence for every member.
 */

use serde::Serialize;
use std::sync::Arc;

use super::membership::GroupTable;
use crate::shared::{HubEvent, MessageEvent, ServerFrame};

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn recipients(&self) -> usize {
        self.delivered + self.failed
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    groups: Arc<GroupTable>,
}

impl Dispatcher {
    pub fn new(groups: Arc<GroupTable>) -> Self {
        Self { groups }
    }

    pub async fn dispatch(&self, event: &MessageEvent) -> DispatchReport {
        let chat_id = event.chat_id();
        let frame = ServerFrame::event(HubEvent::from(event));
        let mut report = DispatchReport::default();

        self.groups
            .for_each_member(chat_id, |connection_id, outbound| {
                match outbound.try_send(frame.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            "[Hub] Dropped {:?} for message {} to connection {}: {}",
                            event.kind,
                            event.message_id(),
                            connection_id,
                            e
                        );
                    }
                }
            })
            .await;

        tracing::debug!(
            "[Hub] {:?} message {} in chat {}: {} delivered, {} failed",
            event.kind,
            event.message_id(),
            chat_id,
            report.delivered,
            report.failed
        );
        report
    }
}
