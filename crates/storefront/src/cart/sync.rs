//! The cart synchronizer.
//!
//! Owns the session's single cart: a handle persisted through a
//! [`HandleStore`], and a [`CartView`] rebuilt wholesale from every cart the
//! [`CartGateway`] returns. Operations run one at a time in arrival order;
//! a call made while another is in flight waits its turn instead of failing.
//!
//! State is published through a `tokio::sync::watch` channel so presentation
//! layers can observe it without owning it:
//!
//! | Status    | Event                  | Next                       |
//! |-----------|------------------------|----------------------------|
//! | `Idle`    | operation issued       | `Pending`                  |
//! | `Pending` | operation issued       | `Pending` (queued)         |
//! | `Pending` | last operation settles | `Idle`, view or error set  |

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopfront_core::{CartId, CartLineId, CurrencyCode, MerchandiseId};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::error::CartError;
use super::gateway::{CartGateway, GatewayError};
use super::store::HandleStore;
use super::view::{CartView, DisplayMeta};
use crate::shopify::types::{Cart, CartLineInput, CartLineUpdateInput};

/// Whether an operation is queued or in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Pending,
}

/// Caller-supplied display data for a line that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePreview {
    pub unit_price: Decimal,
    pub currency_code: CurrencyCode,
    #[serde(flatten)]
    pub display: DisplayMeta,
}

/// An add that is queued or in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLine {
    pub merchandise_id: MerchandiseId,
    pub quantity: u32,
    pub preview: Option<LinePreview>,
}

/// Arguments to [`CartSynchronizer::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItem {
    pub merchandise_id: MerchandiseId,
    pub quantity: u32,
    pub preview: Option<LinePreview>,
}

impl AddItem {
    /// Add one unit of `merchandise_id`.
    #[must_use]
    pub fn new(merchandise_id: impl Into<MerchandiseId>) -> Self {
        Self {
            merchandise_id: merchandise_id.into(),
            quantity: 1,
            preview: None,
        }
    }

    #[must_use]
    pub const fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn preview(mut self, preview: LinePreview) -> Self {
        self.preview = Some(preview);
        self
    }
}

/// Everything a presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Projection of the last successful response. Carries the handle.
    pub view: CartView,
    pub status: SyncStatus,
    /// Operations queued or in flight.
    pub pending: usize,
    /// Adds not yet confirmed, oldest first. Never merged into `view`.
    pub optimistic: Vec<PendingLine>,
    /// Outcome of the most recent operation; cleared on success.
    pub last_error: Option<CartError>,
}

impl CartState {
    #[must_use]
    pub const fn handle(&self) -> Option<&CartId> {
        self.view.cart_id.as_ref()
    }

    #[must_use]
    pub fn checkout_url(&self) -> Option<&str> {
        self.view.checkout_url.as_deref()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == SyncStatus::Pending
    }
}

/// Result of a successful operation. `warning` records a non-fatal failure
/// (the handle could not be persisted) after the remote side already changed.
struct Applied {
    view: CartView,
    warning: Option<CartError>,
}

impl Applied {
    const fn clean(view: CartView) -> Self {
        Self {
            view,
            warning: None,
        }
    }
}

/// Marks one queued or in-flight operation. Dropping it settles the status,
/// including when the caller abandons the future.
struct Turn<'a> {
    state: &'a watch::Sender<CartState>,
    optimistic: Option<PendingLine>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let line = self.optimistic.take();
        self.state.send_modify(|s| {
            s.pending = s.pending.saturating_sub(1);
            if let Some(line) = &line
                && let Some(pos) = s.optimistic.iter().position(|l| l == line)
            {
                s.optimistic.remove(pos);
            }
            if s.pending == 0 {
                s.status = SyncStatus::Idle;
            }
        });
    }
}

/// Keeps a single remote cart and its local view in step.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct CartSynchronizer<G, S> {
    gateway: G,
    store: S,
    queue: Mutex<()>,
    state: watch::Sender<CartState>,
}

impl<G: CartGateway, S: HandleStore> CartSynchronizer<G, S> {
    /// A synchronizer with no cart, ignoring anything in `store`.
    pub fn new(gateway: G, store: S) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            gateway,
            store,
            queue: Mutex::new(()),
            state,
        }
    }

    /// Start a session, adopting any stored handle as an empty placeholder.
    ///
    /// Does not contact the gateway; call [`Self::refresh`] or
    /// [`Self::spawn_refresh`] to fill in the lines.
    pub async fn restore(gateway: G, store: S) -> Self {
        let sync = Self::new(gateway, store);
        if let Some(cart_id) = sync.store.load().await {
            info!(cart_id = %cart_id, "Restored cart handle");
            sync.state
                .send_modify(|s| s.view = CartView::placeholder(cart_id));
        }
        sync
    }

    /// Current state.
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Current view.
    pub fn view(&self) -> CartView {
        self.state.borrow().view.clone()
    }

    /// Current cart handle, if any.
    pub fn handle(&self) -> Option<CartId> {
        self.state.borrow().view.cart_id.clone()
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Add `item.quantity` units of a variant, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the input is invalid or the gateway refuses;
    /// the view is then unchanged.
    #[instrument(skip(self, item), fields(merchandise_id = %item.merchandise_id, quantity = item.quantity))]
    pub async fn add_item(&self, item: AddItem) -> Result<CartView, CartError> {
        if item.merchandise_id.is_blank() {
            return self.reject("merchandise id is required");
        }
        if item.quantity == 0 {
            return self.reject("quantity must be at least 1");
        }

        let _turn = self.begin(Some(PendingLine {
            merchandise_id: item.merchandise_id.clone(),
            quantity: item.quantity,
            preview: item.preview.clone(),
        }));
        let _queue = self.queue.lock().await;
        let result = self.add_locked(&item).await;
        self.settle(result)
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// A no-op without a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the gateway refuses or the cart is gone upstream.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &self,
        line_id: &CartLineId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if line_id.is_blank() {
            return self.reject("line id is required");
        }

        let _turn = self.begin(None);
        let _queue = self.queue.lock().await;
        let result = if quantity <= 0 {
            debug!("Non-positive quantity; removing line");
            self.remove_locked(line_id).await
        } else {
            self.update_locked(line_id, quantity).await
        };
        self.settle(result)
    }

    /// Remove a line. Removing the last line forgets the cart.
    ///
    /// A no-op without a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the gateway refuses or the cart is gone upstream.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: &CartLineId) -> Result<CartView, CartError> {
        if line_id.is_blank() {
            return self.reject("line id is required");
        }

        let _turn = self.begin(None);
        let _queue = self.queue.lock().await;
        let result = self.remove_locked(line_id).await;
        self.settle(result)
    }

    /// Re-fetch the cart and replace the view.
    ///
    /// # Errors
    ///
    /// Returns `CartError::StaleHandle` (after forgetting the handle) if the
    /// cart no longer exists, or `CartError::Transport` if it can't be fetched.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartView, CartError> {
        let _turn = self.begin(None);
        let _queue = self.queue.lock().await;
        let result = self.refresh_locked().await;
        self.settle(result)
    }

    /// Forget the cart locally. The remote cart is left alone.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the stored handle can't be removed; the
    /// handle and view are then kept.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        let _turn = self.begin(None);
        let _queue = self.queue.lock().await;
        // A handle that is still on disk stays in the view
        let result = match self.store.clear().await {
            Ok(()) => {
                self.publish(&CartView::empty());
                Ok(Applied::clean(CartView::empty()))
            }
            Err(e) => Err(CartError::from(e)),
        };
        self.settle(result).map(|_| ())
    }

    // =========================================================================
    // Operation bodies (run while holding the queue)
    // =========================================================================

    async fn add_locked(&self, item: &AddItem) -> Result<Applied, CartError> {
        let lines = vec![CartLineInput {
            merchandise_id: item.merchandise_id.clone(),
            quantity: i64::from(item.quantity),
        }];

        let Some(cart_id) = self.handle() else {
            return self.create(lines).await;
        };

        match self.gateway.add_lines(&cart_id, lines.clone()).await {
            Ok(cart) => self.adopt(&cart),
            Err(GatewayError::NotFound) => {
                warn!(cart_id = %cart_id, "Cart no longer exists; starting a new one");
                let warning = self.forget().await;
                let mut applied = self.create(lines).await?;
                applied.warning = applied.warning.or(warning);
                Ok(applied)
            }
            Err(e) => Err(CartError::from_mutation(e)),
        }
    }

    async fn update_locked(
        &self,
        line_id: &CartLineId,
        quantity: i64,
    ) -> Result<Applied, CartError> {
        let Some(cart_id) = self.handle() else {
            debug!("No cart; nothing to update");
            return Ok(Applied::clean(self.view()));
        };

        let lines = vec![CartLineUpdateInput {
            id: line_id.clone(),
            quantity,
        }];
        match self.gateway.update_lines(&cart_id, lines).await {
            Ok(cart) => self.adopt_or_forget(&cart).await,
            Err(GatewayError::NotFound) => Err(self.stale(&cart_id).await),
            Err(e) => Err(CartError::from_mutation(e)),
        }
    }

    async fn remove_locked(&self, line_id: &CartLineId) -> Result<Applied, CartError> {
        let Some(cart_id) = self.handle() else {
            debug!("No cart; nothing to remove");
            return Ok(Applied::clean(self.view()));
        };

        match self
            .gateway
            .remove_lines(&cart_id, vec![line_id.clone()])
            .await
        {
            Ok(cart) => self.adopt_or_forget(&cart).await,
            Err(GatewayError::NotFound) => Err(self.stale(&cart_id).await),
            Err(e) => Err(CartError::from_mutation(e)),
        }
    }

    async fn refresh_locked(&self) -> Result<Applied, CartError> {
        let Some(cart_id) = self.handle() else {
            return Ok(Applied::clean(self.view()));
        };

        match self.gateway.get_cart(&cart_id).await {
            Ok(Some(cart)) => self.adopt(&cart),
            Ok(None) | Err(GatewayError::NotFound) => Err(self.stale(&cart_id).await),
            Err(GatewayError::Transport(msg)) => Err(CartError::Transport(msg)),
            Err(e @ GatewayError::Domain(_)) => Err(CartError::Transport(e.to_string())),
        }
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Create a cart, persist its handle, then publish its view.
    async fn create(&self, lines: Vec<CartLineInput>) -> Result<Applied, CartError> {
        let cart = self
            .gateway
            .create_cart(lines)
            .await
            .map_err(CartError::from_create)?;
        let view = CartView::project(&cart)?;
        info!(cart_id = %cart.id, "Cart created");

        let warning = match self.store.save(&cart.id).await {
            Ok(()) => None,
            Err(e) => {
                error!(cart_id = %cart.id, error = %e, "Failed to persist cart handle");
                Some(CartError::from(e))
            }
        };

        self.publish(&view);
        Ok(Applied { view, warning })
    }

    /// Replace the view with the projection of `cart`.
    fn adopt(&self, cart: &Cart) -> Result<Applied, CartError> {
        let view = CartView::project(cart)?;
        self.publish(&view);
        Ok(Applied::clean(view))
    }

    /// Like [`Self::adopt`], but an emptied cart is forgotten.
    async fn adopt_or_forget(&self, cart: &Cart) -> Result<Applied, CartError> {
        let view = CartView::project(cart)?;
        if view.is_empty() {
            info!(cart_id = %cart.id, "Cart emptied; forgetting handle");
            let warning = self.forget().await;
            return Ok(Applied {
                view: CartView::empty(),
                warning,
            });
        }
        self.publish(&view);
        Ok(Applied::clean(view))
    }

    /// Drop the handle from state and store.
    async fn forget(&self) -> Option<CartError> {
        self.publish(&CartView::empty());
        match self.store.clear().await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "Failed to clear cart handle");
                Some(CartError::from(e))
            }
        }
    }

    async fn stale(&self, cart_id: &CartId) -> CartError {
        warn!(cart_id = %cart_id, "Cart no longer exists upstream; forgetting handle");
        // The stale error is what callers act on
        let _ = self.forget().await;
        CartError::StaleHandle
    }

    fn publish(&self, view: &CartView) {
        self.state.send_modify(|s| s.view = view.clone());
    }

    fn begin(&self, optimistic: Option<PendingLine>) -> Turn<'_> {
        self.state.send_modify(|s| {
            s.pending += 1;
            s.status = SyncStatus::Pending;
            if let Some(line) = &optimistic {
                s.optimistic.push(line.clone());
            }
        });
        Turn {
            state: &self.state,
            optimistic,
        }
    }

    fn settle(&self, result: Result<Applied, CartError>) -> Result<CartView, CartError> {
        match result {
            Ok(applied) => {
                self.state.send_modify(|s| s.last_error = applied.warning);
                Ok(applied.view)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Cart operation failed");
                self.state.send_modify(|s| s.last_error = Some(err.clone()));
                Err(err)
            }
        }
    }

    fn reject(&self, message: &str) -> Result<CartView, CartError> {
        let err = CartError::Validation(message.to_string());
        self.state.send_modify(|s| s.last_error = Some(err.clone()));
        Err(err)
    }
}

impl<G, S> CartSynchronizer<G, S>
where
    G: CartGateway + 'static,
    S: HandleStore + 'static,
{
    /// Run [`Self::refresh`] on the runtime without waiting for it.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<Result<CartView, CartError>> {
        let sync = Arc::clone(self);
        tokio::spawn(async move { sync.refresh().await })
    }
}
