//! Cart synchronization.
//!
//! Keeps the session's one remote cart and its local [`CartView`] in step:
//!
//! - [`gateway`]: the remote cart operations ([`CartGateway`])
//! - [`store`]: where the cart handle survives restarts ([`HandleStore`])
//! - [`view`]: the flat projection presentation layers render
//! - [`sync`]: the [`CartSynchronizer`] state machine

pub mod error;
pub mod gateway;
pub mod store;
pub mod sync;
pub mod view;

pub use error::CartError;
pub use gateway::{CartGateway, FieldError, GatewayError};
pub use store::{FileHandleStore, HandleStore, MemoryHandleStore, StoreError};
pub use sync::{AddItem, CartState, CartSynchronizer, LinePreview, PendingLine, SyncStatus};
pub use view::{CartView, DisplayMeta, LineItem, ViewError};
