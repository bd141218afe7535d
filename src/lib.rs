//! A policy-configurable manager for a single, globally accessible instance of a type.
//!
//! [`Singleton<T, C, S, L>`] lets each of three concerns be chosen independently:
//!
//! - **Creation** ([`CreationPolicy`]): build on first access ([`CreateOnFirstUse`]) or
//!   as soon as the identity is registered ([`CreateOnInit`]).
//! - **Synchronization** ([`SyncPolicy`]): none ([`NoThreadSafety`]), a lock on every
//!   access ([`ClassLevelLockable`]), or double-checked locking with a lock-free fast
//!   path ([`DoubleCheckedLockable`]).
//! - **Lifetime** ([`LifetimePolicy`]): drop the instance at teardown
//!   ([`DestroyOnExit`]) or leak it for the rest of the process ([`NeverDestroy`]).
//!
//! The combination is part of the manager's type, and each distinct type owns exactly
//! one instance slot. Construction happens at most once even under concurrent first
//! access, and a failed construction leaves the slot empty so the next access retries.
//!
//! The wrapped type implements [`Managed`]. Its constructor receives a [`Construct`]
//! token that only this crate can create, so the manager is the only way to build it.
//!
//! # Features
//!
//! - **Lock-free fast path**: with [`DoubleCheckedLockable`], a ready instance costs one
//!   `Acquire` load.
//! - **Efficient blocking**: the locking policies park on a futex through `parking_lot_core`.
//! - **Async access**: [`Singleton::get_instance_async`] waits for the lock without
//!   parking a runtime worker (`async-tokio`, `async-tokio-mt` features).
//! - **Process-wide identities**: [`Singleton::global`] and [`registry::shutdown`].
//!
//! # Examples
//!
//! ## In a static
//!
//! ```rust
//! use std::convert::Infallible;
//! use policy_singleton::{Construct, CreateOnFirstUse, DoubleCheckedLockable, Managed, NeverDestroy, Singleton};
//!
//! pub struct Settings {
//!    name: String,
//! }
//!
//! impl Managed for Settings {
//!    type Error = Infallible;
//!
//!    fn create(_: Construct) -> Result<Self, Self::Error> {
//!       Ok(Settings { name: "production".to_string() })
//!    }
//! }
//!
//! static SETTINGS: Singleton<Settings, CreateOnFirstUse, DoubleCheckedLockable, NeverDestroy> =
//!    Singleton::new();
//!
//! assert_eq!(SETTINGS.get_instance().unwrap().name, "production");
//! ```
//!
//! ## Owned by a scope
//!
//! ```rust
//! use std::convert::Infallible;
//! use policy_singleton::{Construct, CreateOnInit, Managed, SlotState, Singleton};
//!
//! struct Pool(Vec<u8>);
//!
//! impl Managed for Pool {
//!    type Error = Infallible;
//!
//!    fn create(_: Construct) -> Result<Self, Self::Error> {
//!       Ok(Pool(vec![0; 16]))
//!    }
//! }
//!
//! let mut pool = Singleton::<Pool, CreateOnInit>::try_new().unwrap();
//! assert_eq!(pool.state(), SlotState::Ready);
//! pool.teardown();
//! assert_eq!(pool.state(), SlotState::Destroyed);
//! ```

/// Creation policies and the managed-type contract.
mod creation;

/// Access errors.
mod error;

/// Lifetime policies.
mod lifetime;

/// Process-wide identity table.
pub mod registry;

/// The singleton manager.
mod singleton;

/// Instance slot.
mod slot;

/// Raw lock used by the locking policies.
mod state;

/// Synchronization policies.
mod sync;

pub use creation::{Construct, CreateOnFirstUse, CreateOnInit, CreationPolicy, Managed};
pub use error::Error;
pub use lifetime::{DestroyOnExit, LifetimePolicy, NeverDestroy};
pub use singleton::Singleton;
pub use slot::{SlotState, SlotTeardown};
pub use state::{LockGuard, RawLock};
pub use sync::{ClassLevelLockable, DoubleCheckedLockable, NoThreadSafety, SyncGuard, SyncPolicy};
