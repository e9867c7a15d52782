/// Invite issuance and redemption
///
/// Invites are the out-of-band way into a community: a time-limited,
/// single-use token mailed to an address, granting a role to whoever
/// redeems it. Issuance commits the invite before delivery is attempted;
/// delivery failure never invalidates the token. Redemption runs as one
/// transaction so the grant and the token consumption land together.

use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::access::grant_collaborator;
use crate::audit::{AuditEntry, AuditSink};
use crate::error::AccessError;
use crate::events::{AccessEvent, EventBus};
use crate::models::collaborator::{Collaborator, CollaboratorRole, CollaboratorStatus};
use crate::models::community::Community;
use crate::models::invite::Invite;
use crate::notify::Notifier;

/// Invite lifecycle service
///
/// Cheap to clone; shares the pool, audit sink, event bus, and notifier
/// across clones.
#[derive(Clone)]
pub struct InviteManager {
    db: PgPool,
    audit: AuditSink,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
}

impl InviteManager {
    /// Creates a new invite manager
    pub fn new(
        db: PgPool,
        audit: AuditSink,
        events: EventBus,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        InviteManager {
            db,
            audit,
            events,
            notifier,
        }
    }

    /// Issues an invite and attempts delivery
    ///
    /// The invite row commits first; delivery is best-effort and a failure
    /// is logged and swallowed, since the token remains redeemable through
    /// any other channel the inviter shares it over.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Validation`] for a malformed email or the `owner` role
    /// - [`AccessError::NotFound`] if the community does not exist
    pub async fn send_invite(
        &self,
        inviter_id: Uuid,
        community_id: Uuid,
        email: &str,
        role: CollaboratorRole,
    ) -> Result<Invite, AccessError> {
        if role == CollaboratorRole::Owner {
            return Err(AccessError::validation(
                "role",
                "The owner role cannot be granted by invite",
            ));
        }
        if !email.validate_email() {
            return Err(AccessError::validation(
                "email",
                "Invitee email must be a valid email address",
            ));
        }

        let community = Community::find_by_id(&self.db, community_id)
            .await?
            .ok_or(AccessError::NotFound("community"))?;

        let invite = Invite::create(&self.db, community_id, inviter_id, email, role).await?;

        info!(invite_id = %invite.id, %community_id, "invite issued");

        self.audit.record(
            AuditEntry::new(inviter_id, "invite.send", "invites")
                .community(community_id)
                .record(invite.id)
                .new_value(json!({ "email": email, "role": role.as_str() })),
        );
        self.events.publish(AccessEvent::InviteSent {
            community_id,
            invite_id: invite.id,
            role,
        });

        if let Err(e) = self
            .notifier
            .send_invite(email, &community.name, &invite.token, role)
            .await
        {
            warn!(invite_id = %invite.id, error = %e, "invite delivery failed; token remains valid");
        }

        Ok(invite)
    }

    /// Redeems an invite token for the accepting user
    ///
    /// Runs as one transaction: the pending invite row is locked, expiry is
    /// checked against the clock, the collaborator grant (with its seat
    /// check) is applied, and the invite is consumed. Losing any of those
    /// steps rolls the whole redemption back, so a seat-limit failure leaves
    /// the invite pending and retryable after an upgrade.
    ///
    /// Unknown, consumed, and expired tokens are deliberately
    /// indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] for an unknown, consumed, or expired token
    /// - [`AccessError::SeatLimitExceeded`] if the granted class is full
    /// - [`AccessError::Conflict`] if the user is already a collaborator
    pub async fn accept_invite(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Collaborator, AccessError> {
        let mut tx = self.db.begin().await?;

        let invite = Invite::find_pending_by_token_for_update(&mut *tx, token)
            .await?
            .ok_or(AccessError::NotFound("invite"))?;

        if invite.is_expired_at(chrono::Utc::now()) {
            return Err(AccessError::NotFound("invite"));
        }

        let collaborator = grant_collaborator(
            &mut tx,
            invite.community_id,
            user_id,
            invite.role,
            CollaboratorStatus::Approved,
        )
        .await?;

        if !Invite::mark_accepted(&mut *tx, invite.id).await? {
            // the row was locked pending above, so this cannot happen
            return Err(AccessError::Inconsistency(
                "Invite vanished between lock and consume".to_string(),
            ));
        }

        tx.commit().await?;

        info!(invite_id = %invite.id, community_id = %invite.community_id, "invite accepted");

        self.audit.record(
            AuditEntry::new(user_id, "invite.accept", "invites")
                .community(invite.community_id)
                .record(invite.id)
                .new_value(json!({ "role": invite.role.as_str() })),
        );
        self.events.publish(AccessEvent::InviteAccepted {
            community_id: invite.community_id,
            invite_id: invite.id,
            user_id,
        });

        Ok(collaborator)
    }

    /// Sweeps clock-expired pending invites into the `expired` status
    ///
    /// Cosmetic housekeeping for listings; redemption never consults the
    /// swept status. Returns the number of invites swept.
    pub async fn expire_stale(&self, community_id: Option<Uuid>) -> Result<u64, AccessError> {
        let swept = Invite::expire_stale(&self.db, community_id).await?;

        if swept > 0 {
            info!(swept, "stale invites marked expired");
        }

        Ok(swept)
    }

    /// Lists invites for a community, newest first
    pub async fn list_invites(&self, community_id: Uuid) -> Result<Vec<Invite>, AccessError> {
        if Community::find_by_id(&self.db, community_id).await?.is_none() {
            return Err(AccessError::NotFound("community"));
        }

        Ok(Invite::list_by_community(&self.db, community_id).await?)
    }
}
