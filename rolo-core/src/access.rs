/// Access controller: the decision point for every membership mutation
///
/// All operations that change who can do what in a community flow through
/// [`AccessController`]. Compound mutations run in a single transaction and
/// take a row lock on the community before counting seats, so concurrent
/// grants serialize and a plan cap can never be raced past.
///
/// Authorization is per call: handlers resolve the acting user with
/// [`AccessController::authorize`] against the community in the request
/// path, then perform the operation. Nothing here caches a decision.
///
/// # Example
///
/// ```no_run
/// use rolo_core::access::AccessController;
/// use rolo_core::models::collaborator::CollaboratorRole;
/// use uuid::Uuid;
///
/// # async fn example(access: AccessController, user: Uuid, community: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let role = access
///     .authorize(user, community, &[CollaboratorRole::Owner, CollaboratorRole::Admin])
///     .await?;
/// println!("acting as {role}");
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::{conflict_on_unique, AccessError};
use crate::events::{AccessEvent, EventBus};
use crate::invites::InviteManager;
use crate::models::collaborator::{Collaborator, CollaboratorRole, CollaboratorStatus};
use crate::models::community::{validate_handle, Community, CreateCommunity};
use crate::models::subscription::{CommunitySubscription, SubscriptionPlan, SubscriptionStatus};
use crate::seats::enforce_seats;

/// An invitee named at community-creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRecipient {
    /// Address to deliver the invite to
    pub email: String,

    /// Role granted on acceptance
    pub role: CollaboratorRole,
}

/// Outcome of creating a community
///
/// The community and its owner grant are committed before any invites go
/// out; invite failures are advisory and never roll the creation back.
#[derive(Debug, Clone, Serialize)]
pub struct CommunityCreation {
    /// The committed community
    pub community: Community,

    /// One message per initial invite that could not be issued or delivered
    pub invite_errors: Vec<String>,
}

/// Grants a collaborator inside an open transaction
///
/// Locks the community row first, which serializes every grant against the
/// same community for the life of the transaction; the seat count taken
/// afterwards therefore cannot move before the insert lands. Approved
/// grants consume a seat and are checked against the plan; pending grants
/// consume nothing and skip the check.
pub(crate) async fn grant_collaborator(
    conn: &mut PgConnection,
    community_id: Uuid,
    user_id: Uuid,
    role: CollaboratorRole,
    status: CollaboratorStatus,
) -> Result<Collaborator, AccessError> {
    if !Community::lock_for_update(&mut *conn, community_id).await? {
        return Err(AccessError::NotFound("community"));
    }

    if status == CollaboratorStatus::Approved {
        enforce_seats(&mut *conn, community_id, role.seat_class()).await?;
    }

    Collaborator::create(&mut *conn, community_id, user_id, role, status)
        .await
        .map_err(|e| conflict_on_unique(e, "User is already a collaborator of this community"))
}

fn validate_community_input(data: &CreateCommunity) -> Result<(), AccessError> {
    validate_handle(&data.handle).map_err(|msg| AccessError::validation("handle", msg))?;

    if data.name.trim().is_empty() {
        return Err(AccessError::validation("name", "Name must not be empty"));
    }

    if !data.contact_email.validate_email() {
        return Err(AccessError::validation(
            "contact_email",
            "Contact email must be a valid email address",
        ));
    }

    if data.contact_phone.trim().is_empty() {
        return Err(AccessError::validation(
            "contact_phone",
            "Contact phone must not be empty",
        ));
    }

    Ok(())
}

/// The access-control service
///
/// Cheap to clone; shares the pool, audit sink, event bus, and invite
/// manager across clones.
#[derive(Clone)]
pub struct AccessController {
    db: PgPool,
    audit: AuditSink,
    events: EventBus,
    invites: InviteManager,
}

impl AccessController {
    /// Creates a new access controller
    pub fn new(db: PgPool, audit: AuditSink, events: EventBus, invites: InviteManager) -> Self {
        AccessController {
            db,
            audit,
            events,
            invites,
        }
    }

    /// Creates a community with its owner, then issues initial invites
    ///
    /// The community row and the owner's approved `owner` collaborator are
    /// written in one transaction; either both exist afterwards or neither
    /// does. Initial invites are issued after the commit, best-effort: each
    /// failure is reported in [`CommunityCreation::invite_errors`] instead
    /// of failing the creation.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Validation`] for a malformed handle, name, email, or phone
    /// - [`AccessError::Conflict`] if the handle is already taken
    pub async fn create_community(
        &self,
        owner_id: Uuid,
        data: &CreateCommunity,
        invitees: &[InviteRecipient],
    ) -> Result<CommunityCreation, AccessError> {
        validate_community_input(data)?;

        let mut tx = self.db.begin().await?;

        let community = Community::create(&mut *tx, owner_id, data)
            .await
            .map_err(|e| conflict_on_unique(e, "Handle already taken"))?;

        // The community row is invisible outside this transaction, so the
        // owner grant needs no lock and no seat check.
        Collaborator::create(
            &mut *tx,
            community.id,
            owner_id,
            CollaboratorRole::Owner,
            CollaboratorStatus::Approved,
        )
        .await?;

        tx.commit().await?;

        info!(community_id = %community.id, handle = %community.handle, "community created");

        self.audit.record(
            AuditEntry::new(owner_id, "community.create", "communities")
                .community(community.id)
                .record(community.id)
                .new_value(json!({ "handle": community.handle, "name": community.name })),
        );
        self.events.publish(AccessEvent::CommunityCreated {
            community_id: community.id,
            owner_id,
        });

        let mut invite_errors = Vec::new();
        for recipient in invitees {
            if let Err(e) = self
                .invites
                .send_invite(owner_id, community.id, &recipient.email, recipient.role)
                .await
            {
                invite_errors.push(format!("{}: {}", recipient.email, e));
            }
        }

        Ok(CommunityCreation {
            community,
            invite_errors,
        })
    }

    /// Files a join request against a community identified by handle
    ///
    /// The request is a pending viewer collaborator; it consumes no seat
    /// until approved.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if no community has the handle
    /// - [`AccessError::Conflict`] if the user already has a membership record there
    pub async fn request_join(
        &self,
        user_id: Uuid,
        handle: &str,
    ) -> Result<Collaborator, AccessError> {
        let community = Community::find_by_handle(&self.db, handle)
            .await?
            .ok_or(AccessError::NotFound("community"))?;

        let collaborator = Collaborator::create(
            &self.db,
            community.id,
            user_id,
            CollaboratorRole::Viewer,
            CollaboratorStatus::Pending,
        )
        .await
        .map_err(|e| {
            conflict_on_unique(e, "User already has a membership record for this community")
        })?;

        self.audit.record(
            AuditEntry::new(user_id, "collaborator.request_join", "collaborators")
                .community(community.id)
                .record(user_id)
                .new_value(json!({ "role": "viewer", "status": "pending" })),
        );
        self.events.publish(AccessEvent::CollaboratorAdded {
            community_id: community.id,
            user_id,
            role: collaborator.role,
            status: collaborator.status,
        });

        Ok(collaborator)
    }

    /// Whether the user holds at least one approved membership anywhere
    ///
    /// This is the coarse "may this user use the product at all" gate; it
    /// says nothing about any particular community.
    pub async fn check_access(&self, user_id: Uuid) -> Result<bool, AccessError> {
        Ok(Collaborator::has_any_approved(&self.db, user_id).await?)
    }

    /// Resolves the user's role in a community, requiring one of `allowed`
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Forbidden`] naming the accepted roles when the
    /// user has no membership, is not approved, or holds a role outside the
    /// set. Absence and insufficient role are deliberately indistinguishable.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        allowed: &[CollaboratorRole],
    ) -> Result<CollaboratorRole, AccessError> {
        let collaborator = Collaborator::find(&self.db, community_id, user_id)
            .await?
            .ok_or_else(|| AccessError::forbidden(allowed))?;

        if collaborator.status != CollaboratorStatus::Approved
            || !allowed.contains(&collaborator.role)
        {
            return Err(AccessError::forbidden(allowed));
        }

        Ok(collaborator.role)
    }

    /// Directly adds an approved collaborator to a community
    ///
    /// # Errors
    ///
    /// - [`AccessError::Validation`] if the role is `owner` (assigned only at creation)
    /// - [`AccessError::NotFound`] if the community does not exist
    /// - [`AccessError::SeatLimitExceeded`] if the seat class is at its cap
    /// - [`AccessError::Conflict`] if the user is already a collaborator
    pub async fn add_collaborator(
        &self,
        actor_id: Uuid,
        community_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Collaborator, AccessError> {
        if role == CollaboratorRole::Owner {
            return Err(AccessError::validation(
                "role",
                "The owner role is assigned at community creation and cannot be granted",
            ));
        }

        let mut tx = self.db.begin().await?;
        let collaborator = grant_collaborator(
            &mut tx,
            community_id,
            user_id,
            role,
            CollaboratorStatus::Approved,
        )
        .await?;
        tx.commit().await?;

        self.audit.record(
            AuditEntry::new(actor_id, "collaborator.add", "collaborators")
                .community(community_id)
                .record(user_id)
                .new_value(json!({ "role": role.as_str(), "status": "approved" })),
        );
        self.events.publish(AccessEvent::CollaboratorAdded {
            community_id,
            user_id,
            role,
            status: CollaboratorStatus::Approved,
        });

        Ok(collaborator)
    }

    /// Approves or rejects a pending join request
    ///
    /// Approval consumes a seat, so it locks the community and re-checks the
    /// cap inside the transaction. Rejection frees nothing and checks
    /// nothing. Both outcomes are terminal.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the community or membership record is absent
    /// - [`AccessError::Conflict`] if the request was already resolved
    /// - [`AccessError::SeatLimitExceeded`] on approval into a full class
    pub async fn resolve_request(
        &self,
        actor_id: Uuid,
        community_id: Uuid,
        user_id: Uuid,
        approve: bool,
    ) -> Result<Collaborator, AccessError> {
        let next = if approve {
            CollaboratorStatus::Approved
        } else {
            CollaboratorStatus::Rejected
        };

        let mut tx = self.db.begin().await?;

        if !Community::lock_for_update(&mut *tx, community_id).await? {
            return Err(AccessError::NotFound("community"));
        }

        let existing = Collaborator::find(&mut *tx, community_id, user_id)
            .await?
            .ok_or(AccessError::NotFound("collaborator"))?;

        if !existing.status.can_transition_to(next) {
            return Err(AccessError::Conflict(format!(
                "Join request is already {}",
                existing.status
            )));
        }

        if approve {
            enforce_seats(&mut tx, community_id, existing.role.seat_class()).await?;
        }

        let updated = Collaborator::set_status(&mut *tx, community_id, user_id, next)
            .await?
            .ok_or_else(|| {
                AccessError::Inconsistency(
                    "Join request vanished between read and write".to_string(),
                )
            })?;

        tx.commit().await?;

        self.audit.record(
            AuditEntry::new(actor_id, "collaborator.resolve", "collaborators")
                .community(community_id)
                .record(user_id)
                .old(json!({ "status": existing.status.as_str() }))
                .new_value(json!({ "status": updated.status.as_str() })),
        );
        self.events.publish(if approve {
            AccessEvent::CollaboratorApproved {
                community_id,
                user_id,
            }
        } else {
            AccessEvent::CollaboratorRejected {
                community_id,
                user_id,
            }
        });

        Ok(updated)
    }

    /// Changes an approved collaborator's role
    ///
    /// Moving between seat classes (e.g. viewer to admin) consumes a seat in
    /// the target class and is checked under the community lock; moving
    /// within a class is free. The owner role can be neither granted nor
    /// taken away here.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Validation`] if the target role is `owner`
    /// - [`AccessError::NotFound`] if the community or collaborator is absent
    /// - [`AccessError::Conflict`] if the collaborator is the owner or not approved
    /// - [`AccessError::SeatLimitExceeded`] if the target class is full
    pub async fn change_role(
        &self,
        actor_id: Uuid,
        community_id: Uuid,
        user_id: Uuid,
        new_role: CollaboratorRole,
    ) -> Result<Collaborator, AccessError> {
        if new_role == CollaboratorRole::Owner {
            return Err(AccessError::validation(
                "role",
                "The owner role cannot be granted through a role change",
            ));
        }

        let mut tx = self.db.begin().await?;

        if !Community::lock_for_update(&mut *tx, community_id).await? {
            return Err(AccessError::NotFound("community"));
        }

        let existing = Collaborator::find(&mut *tx, community_id, user_id)
            .await?
            .ok_or(AccessError::NotFound("collaborator"))?;

        if existing.role == CollaboratorRole::Owner {
            return Err(AccessError::Conflict(
                "The owner's role cannot be changed".to_string(),
            ));
        }
        if existing.status != CollaboratorStatus::Approved {
            return Err(AccessError::Conflict(
                "Only approved collaborators can change roles".to_string(),
            ));
        }

        if new_role.seat_class() != existing.role.seat_class() {
            enforce_seats(&mut tx, community_id, new_role.seat_class()).await?;
        }

        let updated = Collaborator::set_role(&mut *tx, community_id, user_id, new_role)
            .await?
            .ok_or_else(|| {
                AccessError::Inconsistency(
                    "Collaborator vanished between read and write".to_string(),
                )
            })?;

        tx.commit().await?;

        self.audit.record(
            AuditEntry::new(actor_id, "collaborator.change_role", "collaborators")
                .community(community_id)
                .record(user_id)
                .old(json!({ "role": existing.role.as_str() }))
                .new_value(json!({ "role": updated.role.as_str() })),
        );
        self.events.publish(AccessEvent::RoleChanged {
            community_id,
            user_id,
            role: new_role,
        });

        Ok(updated)
    }

    /// Lists all collaborators of a community, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotFound`] if the community does not exist.
    pub async fn list_collaborators(
        &self,
        community_id: Uuid,
    ) -> Result<Vec<Collaborator>, AccessError> {
        if Community::find_by_id(&self.db, community_id).await?.is_none() {
            return Err(AccessError::NotFound("community"));
        }

        Ok(Collaborator::list_by_community(&self.db, community_id).await?)
    }

    /// Loads a community by id
    pub async fn get_community(&self, community_id: Uuid) -> Result<Community, AccessError> {
        Community::find_by_id(&self.db, community_id)
            .await?
            .ok_or(AccessError::NotFound("community"))
    }

    /// Moves a community onto a named plan
    ///
    /// Takes effect for the next grant; existing approved collaborators are
    /// never evicted when caps shrink.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotFound`] if the community or the plan name
    /// does not exist.
    pub async fn update_subscription(
        &self,
        actor_id: Uuid,
        community_id: Uuid,
        plan_name: &str,
        status: SubscriptionStatus,
    ) -> Result<CommunitySubscription, AccessError> {
        if Community::find_by_id(&self.db, community_id).await?.is_none() {
            return Err(AccessError::NotFound("community"));
        }

        let plan = SubscriptionPlan::find_by_name(&self.db, plan_name)
            .await?
            .ok_or(AccessError::NotFound("plan"))?;

        let old = CommunitySubscription::find(&self.db, community_id).await?;
        let subscription =
            CommunitySubscription::set_plan(&self.db, community_id, plan.id, status).await?;

        info!(%community_id, plan = %plan.name, "subscription updated");

        self.audit.record(
            AuditEntry::new(actor_id, "subscription.update", "community_subscriptions")
                .community(community_id)
                .record(community_id)
                .old(json!({ "plan_id": old.map(|s| s.plan_id) }))
                .new_value(json!({ "plan_id": plan.id, "plan": plan.name, "status": status.as_str() })),
        );
        self.events.publish(AccessEvent::SubscriptionChanged {
            community_id,
            plan: plan.name,
        });

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateCommunity {
        CreateCommunity {
            handle: "gardenclub".to_string(),
            name: "Garden Club".to_string(),
            contact_email: "hello@gardenclub.org".to_string(),
            contact_phone: "+1 555 0100".to_string(),
        }
    }

    #[test]
    fn test_validate_community_input_accepts_good_input() {
        assert!(validate_community_input(&input()).is_ok());
    }

    #[test]
    fn test_validate_community_input_rejects_bad_handle() {
        let mut data = input();
        data.handle = "Garden Club".to_string();

        match validate_community_input(&data) {
            Err(AccessError::Validation { field, .. }) => assert_eq!(field, "handle"),
            other => panic!("expected handle validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_validate_community_input_rejects_blank_name() {
        let mut data = input();
        data.name = "   ".to_string();

        match validate_community_input(&data) {
            Err(AccessError::Validation { field, .. }) => assert_eq!(field, "name"),
            other => panic!("expected name validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_validate_community_input_rejects_bad_email() {
        let mut data = input();
        data.contact_email = "not-an-email".to_string();

        match validate_community_input(&data) {
            Err(AccessError::Validation { field, .. }) => assert_eq!(field, "contact_email"),
            other => panic!("expected email validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_validate_community_input_rejects_blank_phone() {
        let mut data = input();
        data.contact_phone = String::new();

        match validate_community_input(&data) {
            Err(AccessError::Validation { field, .. }) => assert_eq!(field, "contact_phone"),
            other => panic!("expected phone validation error, got {:?}", other.err()),
        }
    }
}
