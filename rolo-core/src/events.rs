/// Access event fan-out
///
/// Mutating operations publish typed events on a broadcast channel instead
/// of invoking ad-hoc callbacks. Subscribers get at-most-once delivery: a
/// subscriber that falls behind the channel capacity loses the oldest
/// events (it sees a `Lagged` error, not silent reordering), and events
/// published before `subscribe` are never replayed.
///
/// # Example
///
/// ```
/// use rolo_core::events::{AccessEvent, EventBus};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.publish(AccessEvent::CollaboratorApproved {
///     community_id: uuid::Uuid::new_v4(),
///     user_id: uuid::Uuid::new_v4(),
/// });
///
/// let event = rx.recv().await.unwrap();
/// assert!(matches!(event, AccessEvent::CollaboratorApproved { .. }));
/// # }
/// ```

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::collaborator::{CollaboratorRole, CollaboratorStatus};

/// Default broadcast capacity per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Events emitted by the access-control core
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// A community and its owner collaborator were created
    CommunityCreated {
        community_id: Uuid,
        owner_id: Uuid,
    },

    /// A collaborator row was created (join request or direct add)
    CollaboratorAdded {
        community_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
        status: CollaboratorStatus,
    },

    /// A pending join request was approved
    CollaboratorApproved {
        community_id: Uuid,
        user_id: Uuid,
    },

    /// A pending join request was rejected
    CollaboratorRejected {
        community_id: Uuid,
        user_id: Uuid,
    },

    /// An approved collaborator's role changed
    RoleChanged {
        community_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    },

    /// An invite was created
    InviteSent {
        community_id: Uuid,
        invite_id: Uuid,
        role: CollaboratorRole,
    },

    /// An invite was redeemed and its grant applied
    InviteAccepted {
        community_id: Uuid,
        invite_id: Uuid,
        user_id: Uuid,
    },

    /// A community's subscription plan changed
    SubscriptionChanged {
        community_id: Uuid,
        plan: String,
    },
}

/// Broadcast bus for [`AccessEvent`]s
///
/// Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AccessEvent>,
}

impl EventBus {
    /// Creates a bus with the given per-subscriber capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Subscribes to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event to all current subscribers
    ///
    /// Publishing with no subscribers is not an error; the event is simply
    /// dropped, which is the at-most-once contract.
    pub fn publish(&self, event: AccessEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe_round_trip() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let community_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        bus.publish(AccessEvent::CollaboratorApproved {
            community_id,
            user_id,
        });

        match rx.recv().await.unwrap() {
            AccessEvent::CollaboratorApproved {
                community_id: c,
                user_id: u,
            } => {
                assert_eq!(c, community_id);
                assert_eq!(u, user_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);

        // must not panic or error
        bus.publish(AccessEvent::CommunityCreated {
            community_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
        });
    }

    #[tokio::test]
    async fn test_lagged_subscriber_drops_oldest() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();

        for _ in 0..3 {
            bus.publish(AccessEvent::CommunityCreated {
                community_id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
            });
        }

        // capacity 1: the first recv reports the lag, the next yields the
        // most recent event
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(rx.recv().await.is_ok());
    }
}
