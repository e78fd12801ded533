//! Conduit Core -- a generic resource transfer and routing engine.
//!
//! Storages of items, fluids and energy are attached at part addresses and
//! registered on a network. Bindings move resources between one storage and
//! everything reachable on a network channel, one bounded transfer per tick.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::TransferEngine::step`] runs every active binding:
//!
//! 1. **Settings** -- channel, rate, slot and round-robin are read from the
//!    binding's properties.
//! 2. **Validity** -- a binding whose target address holds no storage is
//!    skipped without touching anything.
//! 3. **Transfer** -- the channel is resolved through the routing table by
//!    priority, and [`transfer::move_single`] moves one kind of ingredient
//!    using simulate-then-commit calls on both sides.
//! 4. **Notification** -- a changed connection hash is reported once as a
//!    [`event::TransferEvent::TargetChanged`].
//!
//! # Configuration
//!
//! Values and property edits are compiled when they are set:
//!
//! ```rust,ignore
//! let id = engine.add_binding(
//!     ComponentKind::Item,
//!     target,
//!     TransferDirection::Import,
//!     PropertyPreset::RateSlot,
//! );
//! engine.edit_binding_property(id, PropertyKey::Rate, 16)?;
//! engine.set_binding_value(id, Some(Value::Boolean(true)))?;
//! ```
//!
//! # Key Types
//!
//! - [`predicate::IngredientPredicate`] -- immutable filter with blacklist,
//!   empty handling and exact-amount semantics.
//! - [`storage::IngredientStorage`] -- the two-phase storage contract.
//! - [`routing::RoutingTable`] -- priority and channel resolution with
//!   round-robin cursors.
//! - [`target::Target`] -- one bounded transfer bound to a storage.
//! - [`engine::TransferEngine`] -- owns storages, network and bindings.

pub mod aspect;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod id;
pub mod ingredient;
pub mod inventory;
pub mod network;
pub mod predicate;
pub mod properties;
pub mod routing;
pub mod storage;
pub mod tag;
pub mod target;
pub mod transfer;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
