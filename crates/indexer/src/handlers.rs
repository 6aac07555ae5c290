//! State transition functions, one per event kind.
//!
//! Every transition loads what it needs from the store it is handed, mutates
//! it, and saves it back. Re-applying an event leaves the store unchanged,
//! which is what makes replays and crash recovery safe.

use netsepio_core::{known_role_name, Review, RoleKey, User};
use tracing::{debug, warn};

use crate::dispatch::{Outcome, SkipReason};
use crate::listener::events::{ReviewCreated, ReviewDeleted, ReviewUpdated, RoleChange};
use crate::storage::{EntityStore, StoreResult};

/// Mint a review and make sure its author exists.
///
/// The author is saved before the review so a review row never points at a
/// missing user.
pub async fn review_created<S: EntityStore>(
    store: &S,
    event: &ReviewCreated,
) -> StoreResult<Outcome> {
    let author = store
        .load_user_or_else(&event.receiver, || User::create(event.receiver))
        .await?;
    if author.created {
        store.save_user(&author.entity).await?;
    }

    let review = Review {
        category: event.category.clone(),
        domain_address: event.domain_address.clone(),
        site_url: event.site_url.clone(),
        site_type: event.site_type.clone(),
        site_tag: event.site_tag.clone(),
        site_safety: event.category.clone(),
        metadata_uri: event.metadata_uri.clone(),
        review_by: event.receiver,
        ..Review::create(event.review_id.clone())
    };
    store.save_review(&review).await?;

    debug!(
        review = %review.id,
        author = %review.review_by,
        new_author = author.created,
        "Review created"
    );
    Ok(Outcome::Applied)
}

/// Overwrite the info hash of an existing review.
pub async fn review_updated<S: EntityStore>(
    store: &S,
    event: &ReviewUpdated,
) -> StoreResult<Outcome> {
    let Some(mut review) = store.load_review(&event.review_id).await? else {
        warn!(
            review = %event.review_id,
            by = %event.owner_or_approved,
            "ReviewUpdated for unknown review, skipping"
        );
        return Ok(Outcome::Skipped(SkipReason::ReviewNotFound));
    };

    review.info_hash = event.new_info_hash.clone();
    store.save_review(&review).await?;

    debug!(review = %review.id, info_hash = %review.info_hash, "Review updated");
    Ok(Outcome::Applied)
}

/// Tombstone an existing review. The row is kept.
pub async fn review_deleted<S: EntityStore>(
    store: &S,
    event: &ReviewDeleted,
) -> StoreResult<Outcome> {
    let Some(mut review) = store.load_review(&event.review_id).await? else {
        warn!(
            review = %event.review_id,
            by = %event.owner_or_approved,
            "ReviewDeleted for unknown review, skipping"
        );
        return Ok(Outcome::Skipped(SkipReason::ReviewNotFound));
    };

    review.deleted = true;
    store.save_review(&review).await?;

    debug!(review = %review.id, "Review deleted");
    Ok(Outcome::Applied)
}

/// Add a role to an account, creating the user on first reference.
pub async fn role_granted<S: EntityStore>(
    store: &S,
    event: &RoleChange,
) -> StoreResult<Outcome> {
    let loaded = store
        .load_user_or_else(&event.account, || User::create(event.account))
        .await?;
    let created = loaded.created;
    let mut user = loaded.entity;

    let changed = user.roles.grant(event.role);
    if changed || created {
        store.save_user(&user).await?;
    }

    if !changed {
        debug!(
            account = %event.account,
            role = %role_label(&event.role),
            "Role already granted"
        );
        return Ok(Outcome::Skipped(SkipReason::RoleAlreadyGranted));
    }

    debug!(
        account = %event.account,
        role = %role_label(&event.role),
        sender = %event.sender,
        "Role granted"
    );
    Ok(Outcome::Applied)
}

/// Remove a role from an account.
///
/// An unknown account is materialized with an empty role set, matching the
/// create-on-first-reference rule for users. An existing user that does not
/// hold the role is left untouched.
pub async fn role_revoked<S: EntityStore>(
    store: &S,
    event: &RoleChange,
) -> StoreResult<Outcome> {
    let loaded = store
        .load_user_or_else(&event.account, || User::create(event.account))
        .await?;
    let created = loaded.created;
    let mut user = loaded.entity;

    let changed = user.roles.revoke(&event.role);
    if changed || created {
        store.save_user(&user).await?;
    }

    if !changed {
        debug!(
            account = %event.account,
            role = %role_label(&event.role),
            new_user = created,
            "Role not held"
        );
        return Ok(Outcome::Skipped(SkipReason::RoleNotHeld));
    }

    debug!(
        account = %event.account,
        role = %role_label(&event.role),
        sender = %event.sender,
        "Role revoked"
    );
    Ok(Outcome::Applied)
}

fn role_label(role: &RoleKey) -> String {
    match known_role_name(role) {
        Some(name) => name.to_string(),
        None => role.to_string(),
    }
}
