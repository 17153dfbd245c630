//! Invitation flow: turns an accepted invitation into a freshly created
//! match with both invitees auto-seated.

use arena_types::models::{Invitation, InvitationStatus, MatchState};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::registry::SessionRegistry;
use crate::store::Store;

/// Create a pending invitation. At most one pending invitation may exist
/// per (sender, receiver) pair.
pub fn send(store: &dyn Store, sender_id: Uuid, receiver_id: Uuid) -> Result<Invitation> {
    if sender_id == receiver_id {
        return Err(Error::Conflict("cannot invite yourself"));
    }
    store.player_name(receiver_id)?.ok_or(Error::NotFound("player"))?;

    if store
        .pending_invitation_between(sender_id, receiver_id)?
        .is_some()
    {
        return Err(Error::Conflict("a pending invitation already exists"));
    }

    let invitation = Invitation {
        id: Uuid::new_v4(),
        sender_id,
        receiver_id,
        status: InvitationStatus::Pending,
        match_id: None,
        created_at: Utc::now(),
    };
    store.save_invitation(&invitation)?;
    info!(invitation_id = %invitation.id, %sender_id, %receiver_id, "invitation sent");
    Ok(invitation)
}

/// Accept an invitation: create a 2-capacity match, seat sender then
/// receiver, then mark the invitation accepted with the match id.
///
/// If either join fails the error propagates before the invitation is
/// updated -- the invitation stays pending and the created match is left
/// joinable for cleanup, never an accepted invitation pointing at a
/// partially-seated match.
pub fn accept(
    registry: &SessionRegistry,
    receiver_id: Uuid,
    invitation_id: Uuid,
) -> Result<(Invitation, MatchState)> {
    let store = registry.store();

    let mut invitation = store
        .load_invitation(invitation_id)?
        .ok_or(Error::NotFound("invitation"))?;
    if invitation.receiver_id != receiver_id {
        return Err(Error::Forbidden("invitation"));
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(Error::Conflict("invitation already handled"));
    }

    let sender_name = store
        .player_name(invitation.sender_id)?
        .ok_or(Error::NotFound("player"))?;
    let receiver_name = store
        .player_name(receiver_id)?
        .ok_or(Error::NotFound("player"))?;

    let state = registry.create_match(&format!("{} vs {}", sender_name, receiver_name))?;
    let session = registry.get_or_create(state.id)?;

    session.join(invitation.sender_id, &sender_name)?;
    let joined = session.join(receiver_id, &receiver_name)?;

    invitation.status = InvitationStatus::Accepted;
    invitation.match_id = Some(state.id);
    store.save_invitation(&invitation)?;

    info!(
        invitation_id = %invitation.id,
        match_id = %state.id,
        "invitation accepted, match seeded"
    );
    Ok((invitation, joined.state))
}

/// Reject a pending invitation.
pub fn reject(store: &dyn Store, receiver_id: Uuid, invitation_id: Uuid) -> Result<Invitation> {
    let mut invitation = store
        .load_invitation(invitation_id)?
        .ok_or(Error::NotFound("invitation"))?;
    if invitation.receiver_id != receiver_id {
        return Err(Error::Forbidden("invitation"));
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(Error::Conflict("invitation already handled"));
    }

    invitation.status = InvitationStatus::Rejected;
    store.save_invitation(&invitation)?;
    Ok(invitation)
}
