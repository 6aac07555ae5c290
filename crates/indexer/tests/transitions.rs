//! Entity transition properties, checked against every store backend.

mod common;

use alloy::primitives::B256;
use alloy::sol_types::SolEvent;
use common::*;
use netsepio_indexer::listener::{IndexedEvent, LedgerEvent};
use netsepio_indexer::storage::{EntityReader, EntityStore, MemoryStore};
use netsepio_indexer::{role_id, AccountKey, Dispatcher, Outcome, ReviewId, SkipReason};

/// Decode an ABI event the way the sync engine would.
fn ledger_event<E: SolEvent>(event: &E) -> LedgerEvent {
    IndexedEvent::from_log(&log_at(encode(event), 1, 0, 0))
        .unwrap()
        .unwrap()
        .event
}

fn reviewer_role() -> B256 {
    role_id("NETSEPIO_REVIEWER_ROLE")
}

macro_rules! on_both_backends {
    ($($property:ident),* $(,)?) => {
        $(
            mod $property {
                use super::*;

                #[tokio::test]
                async fn memory() {
                    super::$property(MemoryStore::new()).await;
                }

                #[tokio::test]
                async fn sqlite() {
                    let (storage, _temp_db) = sqlite_store().await;
                    super::$property(storage.clone()).await;
                    storage.close().await;
                }
            }
        )*
    };
}

on_both_backends!(
    review_created_twice_equals_once,
    update_never_clears_tombstone,
    repeated_grants_keep_one_role,
    revoke_for_unknown_account_creates_empty_user,
    created_review_round_trips,
    update_overwrites_only_info_hash,
    grant_then_revoke_leaves_no_roles,
    review_author_is_created,
    delete_is_idempotent,
    events_for_unknown_reviews_are_noops,
    revoke_does_not_rewrite_user_without_role,
    reader_normalizes_keys,
);

async fn review_created_twice_equals_once<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    let event = ledger_event(&review_created(1, account(0xaa)));

    dispatcher.apply(&event).await.unwrap();
    let once = dispatcher
        .store()
        .load_review(&ReviewId::from(1u64))
        .await
        .unwrap();

    dispatcher.apply(&event).await.unwrap();
    let twice = dispatcher
        .store()
        .load_review(&ReviewId::from(1u64))
        .await
        .unwrap();

    assert!(once.is_some());
    assert_eq!(once, twice);
}

async fn update_never_clears_tombstone<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    dispatcher
        .apply(&ledger_event(&review_created(3, account(0xaa))))
        .await
        .unwrap();
    dispatcher
        .apply(&ledger_event(&review_deleted(3, account(0xaa))))
        .await
        .unwrap();
    dispatcher
        .apply(&ledger_event(&review_updated(3, account(0xaa), "after")))
        .await
        .unwrap();

    let review = dispatcher
        .store()
        .load_review(&ReviewId::from(3u64))
        .await
        .unwrap()
        .unwrap();
    assert!(review.deleted);
    assert_eq!(review.info_hash, "after");
}

async fn repeated_grants_keep_one_role<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    let grant = ledger_event(&role_granted(reviewer_role(), account(0xbb)));

    for _ in 0..5 {
        dispatcher.apply(&grant).await.unwrap();
    }

    let user = dispatcher
        .store()
        .load_user(&AccountKey::from(account(0xbb)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.roles.len(), 1);
    assert!(user.roles.contains(&reviewer_role().into()));
}

async fn revoke_for_unknown_account_creates_empty_user<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);

    let outcome = dispatcher
        .apply(&ledger_event(&role_revoked(reviewer_role(), account(0xbb))))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Skipped(SkipReason::RoleNotHeld));

    let user = dispatcher
        .store()
        .load_user(&AccountKey::from(account(0xbb)))
        .await
        .unwrap()
        .unwrap();
    assert!(user.roles.is_empty());
}

async fn created_review_round_trips<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    dispatcher
        .apply(&ledger_event(&review_created(7, account(0xaa))))
        .await
        .unwrap();

    let review = dispatcher
        .store()
        .get_review("7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.id.as_str(), "7");
    assert_eq!(review.category, "A");
    assert_eq!(review.domain_address, "ABC");
    assert_eq!(review.site_url, "www.x.com");
    assert_eq!(review.site_type, "B");
    assert_eq!(review.site_tag, "Hello");
    assert_eq!(review.site_safety, "A");
    assert_eq!(review.metadata_uri, "ipfs://Q1");
    assert_eq!(review.review_by, AccountKey::from(account(0xaa)));
    assert!(!review.deleted);
    assert_eq!(review.info_hash, "");
}

async fn update_overwrites_only_info_hash<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    dispatcher
        .apply(&ledger_event(&review_created(7, account(0xaa))))
        .await
        .unwrap();
    let before = dispatcher.store().get_review("7").await.unwrap().unwrap();

    let outcome = dispatcher
        .apply(&ledger_event(&review_updated(7, account(0xaa), "Known")))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);

    let after = dispatcher.store().get_review("7").await.unwrap().unwrap();
    assert_eq!(after.info_hash, "Known");

    let mut expected = before;
    expected.info_hash = "Known".to_string();
    assert_eq!(after, expected);
}

async fn grant_then_revoke_leaves_no_roles<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    let role = reviewer_role();

    dispatcher
        .apply(&ledger_event(&role_granted(role, account(0xbb))))
        .await
        .unwrap();
    let outcome = dispatcher
        .apply(&ledger_event(&role_revoked(role, account(0xbb))))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);

    let user = dispatcher
        .store()
        .load_user(&AccountKey::from(account(0xbb)))
        .await
        .unwrap()
        .unwrap();
    assert!(user.roles.is_empty());
}

async fn review_author_is_created<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    let author = AccountKey::from(account(0x5a));
    assert!(dispatcher.store().load_user(&author).await.unwrap().is_none());

    dispatcher
        .apply(&ledger_event(&review_created(11, account(0x5a))))
        .await
        .unwrap();

    let user = dispatcher.store().load_user(&author).await.unwrap().unwrap();
    assert!(user.roles.is_empty());

    let authored = dispatcher.store().reviews_by(&author).await.unwrap();
    assert_eq!(authored.len(), 1);
    assert_eq!(authored[0].id, ReviewId::from(11u64));
}

async fn delete_is_idempotent<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    dispatcher
        .apply(&ledger_event(&review_created(2, account(0xaa))))
        .await
        .unwrap();

    let delete = ledger_event(&review_deleted(2, account(0xaa)));
    dispatcher.apply(&delete).await.unwrap();
    let once = dispatcher.store().get_review("2").await.unwrap();
    dispatcher.apply(&delete).await.unwrap();
    let twice = dispatcher.store().get_review("2").await.unwrap();

    assert_eq!(once, twice);
    assert!(twice.unwrap().deleted);
}

async fn events_for_unknown_reviews_are_noops<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);

    let update = dispatcher
        .apply(&ledger_event(&review_updated(99, account(0xaa), "h")))
        .await
        .unwrap();
    let delete = dispatcher
        .apply(&ledger_event(&review_deleted(99, account(0xaa))))
        .await
        .unwrap();

    assert_eq!(update, Outcome::Skipped(SkipReason::ReviewNotFound));
    assert_eq!(delete, Outcome::Skipped(SkipReason::ReviewNotFound));
    assert!(dispatcher.store().get_review("99").await.unwrap().is_none());
    assert!(dispatcher
        .store()
        .load_user(&AccountKey::from(account(0xaa)))
        .await
        .unwrap()
        .is_none());
}

async fn revoke_does_not_rewrite_user_without_role<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    let moderator = role_id("NETSEPIO_MODERATOR_ROLE");

    dispatcher
        .apply(&ledger_event(&role_granted(moderator, account(0xbb))))
        .await
        .unwrap();
    let outcome = dispatcher
        .apply(&ledger_event(&role_revoked(reviewer_role(), account(0xbb))))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Skipped(SkipReason::RoleNotHeld));

    let user = dispatcher
        .store()
        .load_user(&AccountKey::from(account(0xbb)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.roles.len(), 1);
    assert!(user.roles.contains(&moderator.into()));
}

async fn reader_normalizes_keys<S: EntityStore>(store: S) {
    let dispatcher = Dispatcher::new(store);
    dispatcher
        .apply(&ledger_event(&role_granted(reviewer_role(), account(0xab))))
        .await
        .unwrap();

    let lower = format!("0x{}", "ab".repeat(20));
    let upper = format!("0x{}", "AB".repeat(20));
    let bare = "ab".repeat(20);

    let a = dispatcher.store().get_user(&lower).await.unwrap();
    let b = dispatcher.store().get_user(&upper).await.unwrap();
    let c = dispatcher.store().get_user(&bare).await.unwrap();
    assert!(a.is_some());
    assert_eq!(a, b);
    assert_eq!(b, c);

    assert!(dispatcher.store().get_review("not-a-number").await.is_err());
}
