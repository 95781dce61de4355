//! Integration tests for `CartSynchronizer`.
//!
//! Drives the synchronizer against `FakeShop`, an in-memory platform that
//! merges lines and expires carts the way Shopify does, and checks the view,
//! the stored handle and the exact gateway traffic.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shopfront::cart::{
    AddItem, CartError, CartSynchronizer, CartView, DisplayMeta, FieldError, GatewayError,
    FileHandleStore, LinePreview, MemoryHandleStore, SyncStatus,
};
use shopfront_core::{CartId, CartLineId, CurrencyCode, MerchandiseId};
use shopfront_integration_tests::{Call, FakeShop, line};

type Synchronizer = CartSynchronizer<FakeShop, MemoryHandleStore>;

async fn fresh(shop: FakeShop) -> Synchronizer {
    CartSynchronizer::restore(shop, MemoryHandleStore::new()).await
}

/// A synchronizer restored onto an existing cart holding `[A:2 @ 10.00, B:1 @ 5.00]`.
async fn with_two_lines() -> Synchronizer {
    let shop = FakeShop::new();
    shop.seed_cart(
        "c1",
        vec![line("A", "V1", 2, "10.00"), line("B", "V2", 1, "5.00")],
    );
    let sync = CartSynchronizer::restore(shop, MemoryHandleStore::with_handle(&CartId::new("c1"))).await;
    sync.refresh().await.unwrap();
    sync
}

/// Yield until the shop has seen `n` calls.
async fn wait_for_calls(shop: &FakeShop, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while shop.calls().len() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

fn quantities(view: &CartView) -> Vec<(&str, u32)> {
    view.items
        .iter()
        .map(|i| (i.line_id.as_str(), i.quantity))
        .collect()
}

// =============================================================================
// Start-up
// =============================================================================

#[tokio::test]
async fn empty_start_has_no_items_and_zero_subtotal() {
    let sync = fresh(FakeShop::new()).await;
    let state = sync.snapshot();

    assert!(state.handle().is_none());
    assert!(state.view.items.is_empty());
    assert_eq!(state.view.item_count, 0);
    assert_eq!(state.view.subtotal, Decimal::ZERO);
    assert_eq!(state.view.currency_code, CurrencyCode::USD);
    assert_eq!(state.status, SyncStatus::Idle);
    assert!(sync.gateway().calls().is_empty());
}

#[tokio::test]
async fn restore_adopts_handle_without_calling_gateway() {
    let sync = CartSynchronizer::restore(
        FakeShop::new(),
        MemoryHandleStore::with_handle(&CartId::new("c1")),
    )
    .await;

    assert_eq!(sync.handle(), Some(CartId::new("c1")));
    assert!(sync.view().items.is_empty());
    assert!(sync.view().checkout_url.is_none());
    assert!(sync.gateway().calls().is_empty());
}

#[tokio::test]
async fn background_refresh_of_expired_cart_forgets_it() {
    let sync = Arc::new(
        CartSynchronizer::restore(
            FakeShop::new(),
            MemoryHandleStore::with_handle(&CartId::new("gone")),
        )
        .await,
    );

    let result = sync.spawn_refresh().await.unwrap();

    assert_eq!(result, Err(CartError::StaleHandle));
    assert!(sync.handle().is_none());
    assert!(sync.store().raw().is_none());
    assert_eq!(sync.view(), CartView::empty());
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn add_twice_merges_into_one_line_with_exact_totals() {
    let sync = fresh(FakeShop::new().with_price("V1", "10.00")).await;

    let view = sync.add_item(AddItem::new("V1")).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].merchandise_id, MerchandiseId::new("V1"));
    assert_eq!(view.items[0].quantity, 1);
    assert_eq!(view.item_count, 1);
    assert_eq!(view.subtotal, Decimal::new(1000, 2));

    let view = sync.add_item(AddItem::new("V1")).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 2);
    assert_eq!(view.item_count, 2);
    assert_eq!(view.subtotal, Decimal::new(2000, 2));
    assert_eq!(view.subtotal_display(), "$20.00");
}

#[tokio::test]
async fn second_add_reuses_the_cart() {
    let sync = fresh(FakeShop::new()).await;

    sync.add_item(AddItem::new("V1")).await.unwrap();
    sync.add_item(AddItem::new("V2").quantity(3)).await.unwrap();

    let calls = sync.gateway().calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], Call::Create(lines) if lines.len() == 1));
    assert!(
        matches!(&calls[1], Call::Add(id, lines) if Some(id.clone()) == sync.handle() && lines[0].quantity == 3)
    );
    assert_eq!(sync.gateway().create_count(), 1);
}

#[tokio::test]
async fn create_persists_handle_before_view_is_published() {
    let sync = fresh(FakeShop::new()).await;
    let view = sync.add_item(AddItem::new("V1")).await.unwrap();

    let stored = sync.store().raw().unwrap();
    let cart_id = view.cart_id.unwrap();
    assert!(stored.contains(cart_id.as_str()));
    assert!(cart_id.as_str().contains("?key="));
}

#[tokio::test]
async fn failed_create_writes_no_handle() {
    let shop = FakeShop::new();
    shop.fail_next(GatewayError::Transport("connection refused".to_string()));
    let sync = fresh(shop).await;

    let err = sync.add_item(AddItem::new("V1")).await.unwrap_err();

    assert_eq!(err, CartError::Transport("connection refused".to_string()));
    assert!(sync.store().raw().is_none());
    assert!(sync.handle().is_none());
}

#[tokio::test]
async fn failed_add_leaves_view_deep_equal() {
    let sync = with_two_lines().await;
    let before = sync.view();

    sync.gateway().fail_next(GatewayError::Domain(vec![FieldError {
        field: "lines.0.merchandiseId".to_string(),
        message: "The product is sold out.".to_string(),
    }]));
    let err = sync.add_item(AddItem::new("V3")).await.unwrap_err();

    assert_eq!(err.kind(), "mutation_failed");
    let state = sync.snapshot();
    assert_eq!(state.view, before);
    assert_eq!(state.last_error, Some(err));
    assert_eq!(state.status, SyncStatus::Idle);
}

#[tokio::test]
async fn next_success_clears_last_error() {
    let sync = with_two_lines().await;
    sync.gateway()
        .fail_next(GatewayError::Transport("timeout".to_string()));
    sync.add_item(AddItem::new("V1")).await.unwrap_err();
    assert!(sync.snapshot().last_error.is_some());

    sync.add_item(AddItem::new("V1")).await.unwrap();
    assert!(sync.snapshot().last_error.is_none());
}

#[tokio::test]
async fn add_to_expired_cart_starts_a_new_one() {
    let sync = with_two_lines().await;
    sync.gateway().expire(&CartId::new("c1"));

    let view = sync.add_item(AddItem::new("V9")).await.unwrap();

    let new_id = view.cart_id.clone().unwrap();
    assert_ne!(new_id, CartId::new("c1"));
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].merchandise_id, MerchandiseId::new("V9"));
    assert!(sync.store().raw().unwrap().contains(new_id.as_str()));
    assert_eq!(sync.gateway().create_count(), 1);
}

// =============================================================================
// Update and remove
// =============================================================================

#[tokio::test]
async fn update_sets_quantity() {
    let sync = with_two_lines().await;

    let view = sync
        .update_quantity(&CartLineId::new("B"), 4)
        .await
        .unwrap();

    assert_eq!(quantities(&view), vec![("A", 2), ("B", 4)]);
    assert_eq!(view.subtotal, Decimal::new(4000, 2));
}

#[tokio::test]
async fn zero_and_negative_quantities_behave_like_remove() {
    let mut outcomes = Vec::new();
    for quantity in [0, -3] {
        let sync = with_two_lines().await;
        let view = sync
            .update_quantity(&CartLineId::new("B"), quantity)
            .await
            .unwrap();
        let last = sync.gateway().calls().pop().unwrap();
        assert!(matches!(last, Call::Remove(_, ref ids) if ids == &[CartLineId::new("B")]));
        outcomes.push(view);
    }

    let sync = with_two_lines().await;
    let removed = sync.remove_item(&CartLineId::new("B")).await.unwrap();

    assert_eq!(outcomes[0], removed);
    assert_eq!(outcomes[1], removed);
}

#[tokio::test]
async fn remove_replaces_items_wholesale() {
    let sync = with_two_lines().await;

    let view = sync.remove_item(&CartLineId::new("B")).await.unwrap();

    assert_eq!(quantities(&view), vec![("A", 2)]);
    assert_eq!(view.item_count, 2);
    assert_eq!(view.subtotal, Decimal::new(2000, 2));
    assert_eq!(sync.view(), view);
}

#[tokio::test]
async fn removing_last_line_forgets_handle_and_next_add_creates() {
    let sync = with_two_lines().await;
    sync.remove_item(&CartLineId::new("A")).await.unwrap();

    let view = sync.remove_item(&CartLineId::new("B")).await.unwrap();
    assert_eq!(view, CartView::empty());
    assert!(sync.handle().is_none());
    assert!(sync.store().raw().is_none());

    sync.add_item(AddItem::new("V1")).await.unwrap();
    let last = sync.gateway().calls().pop().unwrap();
    assert!(last.is_create(), "expected a new cart, got {last:?}");
}

#[tokio::test]
async fn update_to_zero_on_last_line_forgets_handle() {
    let shop = FakeShop::new();
    shop.seed_cart("c1", vec![line("A", "V1", 1, "3.00")]);
    let sync = CartSynchronizer::restore(shop, MemoryHandleStore::with_handle(&CartId::new("c1"))).await;

    let view = sync.update_quantity(&CartLineId::new("A"), 0).await.unwrap();

    assert_eq!(view, CartView::empty());
    assert!(sync.store().raw().is_none());
}

#[tokio::test]
async fn update_on_expired_cart_self_heals() {
    let sync = with_two_lines().await;
    sync.gateway().expire(&CartId::new("c1"));

    let err = sync
        .update_quantity(&CartLineId::new("A"), 5)
        .await
        .unwrap_err();

    assert_eq!(err, CartError::StaleHandle);
    let state = sync.snapshot();
    assert_eq!(state.view, CartView::empty());
    assert_eq!(state.last_error, Some(CartError::StaleHandle));
    assert!(sync.store().raw().is_none());
}

#[tokio::test]
async fn failed_remove_leaves_view_unchanged() {
    let sync = with_two_lines().await;
    let before = sync.view();

    let err = sync
        .remove_item(&CartLineId::new("missing"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "mutation_failed");
    assert_eq!(sync.view(), before);
    assert_eq!(sync.handle(), Some(CartId::new("c1")));
}

#[tokio::test]
async fn mutations_without_a_cart_do_nothing() {
    let sync = fresh(FakeShop::new()).await;

    sync.update_quantity(&CartLineId::new("A"), 2).await.unwrap();
    sync.remove_item(&CartLineId::new("A")).await.unwrap();

    assert!(sync.gateway().calls().is_empty());
    assert_eq!(sync.view(), CartView::empty());
}

// =============================================================================
// Queuing and optimistic state
// =============================================================================

#[tokio::test]
async fn concurrent_adds_queue_and_all_apply() {
    let sync = Arc::new(fresh(FakeShop::gated().with_price("V1", "2.50")).await);
    let mut rx = sync.subscribe();

    let preview = LinePreview {
        unit_price: Decimal::new(250, 2),
        currency_code: CurrencyCode::USD,
        display: DisplayMeta {
            product_title: "Pineapple Soap".to_string(),
            ..DisplayMeta::default()
        },
    };

    let first = tokio::spawn({
        let sync = Arc::clone(&sync);
        let item = AddItem::new("V1").preview(preview.clone());
        async move { sync.add_item(item).await }
    });
    let second = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.add_item(AddItem::new("V1").quantity(2)).await }
    });

    // Both are outstanding; only one reached the gateway
    let state = rx.wait_for(|s| s.pending == 2).await.unwrap().clone();
    wait_for_calls(sync.gateway(), 1).await;
    assert_eq!(state.status, SyncStatus::Pending);
    assert_eq!(state.optimistic.len(), 2);
    assert!(state.view.items.is_empty(), "view must not change before a response");
    assert!(
        state
            .optimistic
            .iter()
            .any(|l| l.preview.as_ref() == Some(&preview))
    );
    assert_eq!(sync.gateway().calls().len(), 1);

    sync.gateway().release(2);
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    // Whichever ran second saw the first one's result
    let last = if a.item_count > b.item_count { a } else { b };
    assert_eq!(last.item_count, 3);
    assert_eq!(last.subtotal, Decimal::new(750, 2));

    let calls = sync.gateway().calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].is_create());
    assert!(matches!(calls[1], Call::Add(..)));

    let state = sync.snapshot();
    assert_eq!(state.status, SyncStatus::Idle);
    assert_eq!(state.pending, 0);
    assert!(state.optimistic.is_empty());
    assert_eq!(state.view, last);
}

#[tokio::test]
async fn failed_operation_still_returns_to_idle() {
    let shop = FakeShop::gated();
    shop.fail_next(GatewayError::Transport("504 Gateway Timeout".to_string()));
    let sync = Arc::new(fresh(shop).await);
    let mut rx = sync.subscribe();

    let task = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.add_item(AddItem::new("V1")).await }
    });

    rx.wait_for(|s| s.status == SyncStatus::Pending).await.unwrap();
    sync.gateway().release(1);

    assert_eq!(task.await.unwrap().unwrap_err().kind(), "transport");
    let state = sync.snapshot();
    assert_eq!(state.status, SyncStatus::Idle);
    assert!(state.optimistic.is_empty());
    assert_eq!(state.view, CartView::empty());
}

// =============================================================================
// Persistence across sessions
// =============================================================================

#[tokio::test]
async fn handle_file_carries_cart_into_next_session() {
    let dir = std::env::temp_dir().join(format!("shopfront-it-{}", uuid::Uuid::new_v4()));
    let path = dir.join("cart.json");
    let shop = Arc::new(FakeShop::new());

    let first = CartSynchronizer::restore(Arc::clone(&shop), FileHandleStore::new(&path)).await;
    let created = first.add_item(AddItem::new("V1").quantity(2)).await.unwrap();
    drop(first);

    let second = CartSynchronizer::restore(Arc::clone(&shop), FileHandleStore::new(&path)).await;
    assert_eq!(second.handle(), created.cart_id);
    assert!(second.view().items.is_empty());

    let refreshed = second.refresh().await.unwrap();
    assert_eq!(refreshed, created);

    second.clear().await.unwrap();
    assert!(!path.exists());
    let third = CartSynchronizer::restore(Arc::clone(&shop), FileHandleStore::new(&path)).await;
    assert!(third.handle().is_none());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
