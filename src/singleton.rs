//! The singleton manager composing the creation, synchronization and lifetime
//! policies.
//!
//! A [`Singleton<T, C, S, L>`] owns exactly one slot for `T`. The policy
//! combination is part of the type, so two managers with different policies never
//! share a slot. Which access protocol runs is decided by `S::DOUBLE_CHECKED`, an
//! associated constant, so the unused protocol is compiled out.

use core::any::type_name;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::creation::{Construct, CreateOnFirstUse, CreationPolicy, Managed};
use crate::error::{Error, Result};
use crate::lifetime::{DestroyOnExit, LifetimePolicy, NeverDestroy};
use crate::registry;
use crate::slot::{Slot, SlotState, SlotTeardown};
use crate::sync::{ClassLevelLockable, SyncPolicy};

/// A policy-configured manager for a single instance of `T`.
///
/// - `C`: when the instance is built ([`CreateOnFirstUse`], [`CreateOnInit`](crate::CreateOnInit)).
/// - `S`: how access is serialized ([`NoThreadSafety`](crate::NoThreadSafety),
///   [`ClassLevelLockable`], [`DoubleCheckedLockable`](crate::DoubleCheckedLockable)).
/// - `L`: whether teardown destroys it ([`DestroyOnExit`], [`NeverDestroy`]).
///
/// The manager can live in a `static` (built with [`new`](Self::new)), be owned by a
/// scope (built with [`try_new`](Self::try_new)), or be the process-wide identity
/// returned by [`global`](Self::global). Dropping an owned manager fires its
/// teardown hook.
///
/// # Examples
///
/// ```rust
/// use std::convert::Infallible;
/// use policy_singleton::{
///    Construct, CreateOnFirstUse, DestroyOnExit, DoubleCheckedLockable, Managed, Singleton,
/// };
///
/// struct Counter(u32);
///
/// impl Managed for Counter {
///    type Error = Infallible;
///    fn create(_: Construct) -> Result<Self, Infallible> {
///       Ok(Counter(7))
///    }
/// }
///
/// static COUNTER: Singleton<Counter, CreateOnFirstUse, DoubleCheckedLockable, DestroyOnExit> =
///    Singleton::new();
///
/// let a = COUNTER.get_instance().unwrap();
/// let b = COUNTER.get_instance().unwrap();
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(a.0, 7);
/// ```
pub struct Singleton<T, C = CreateOnFirstUse, S = ClassLevelLockable, L = DestroyOnExit>
where
   S: SyncPolicy,
   L: LifetimePolicy,
{
   slot: Slot<T>,
   sync: S,
   torn_down: AtomicBool,
   _policies: PhantomData<fn() -> (C, L)>,
}

impl<T, C, S, L> Singleton<T, C, S, L>
where
   T: Managed,
   C: CreationPolicy,
   S: SyncPolicy,
   L: LifetimePolicy,
{
   /// Creates and registers an owned manager identity.
   ///
   /// With [`CreateOnInit`](crate::CreateOnInit) the instance is constructed before
   /// this returns, and a construction failure is returned here.
   pub fn try_new() -> Result<Self, T::Error> {
      let manager = Self::new();
      manager.register()?;
      Ok(manager)
   }

   /// Applies the creation policy's registration trigger.
   ///
   /// Eager policies construct the instance now if the slot is empty; lazy ones do
   /// nothing. Calling it again is harmless.
   ///
   /// This does not enroll the manager for [`registry::shutdown`]. An owned manager
   /// fires its teardown hook when dropped; one stored in a `static` should use
   /// [`register_static`](Self::register_static) instead.
   #[inline]
   pub fn register(&self) -> Result<&Self, T::Error> {
      if C::EAGER {
         self.get_instance()?;
      }
      Ok(self)
   }

   /// Returns the managed instance, constructing it if the creation policy allows.
   ///
   /// Concurrent callers racing on an empty slot construct it exactly once; the
   /// others block until it is ready and receive the same reference.
   ///
   /// # Errors
   ///
   /// - [`Error::Construction`] if the constructor failed; the next call retries.
   /// - [`Error::Destroyed`] if the teardown hook already released the instance.
   /// - [`Error::Reentrant`] if the constructor calls back into this manager
   ///   (detectable with [`NoThreadSafety`](crate::NoThreadSafety) only; the locking
   ///   policies deadlock instead).
   #[inline]
   pub fn get_instance(&self) -> Result<&T, T::Error> {
      if S::DOUBLE_CHECKED {
         // First check, outside the lock. Acquire pairs with the Release in
         // `mark_initialized`, so a `true` here also makes the slot write visible.
         if self.sync.is_initialized() {
            // SAFETY: The flag is only set after the slot is committed, and the
            // teardown hook clears it when it releases the slot.
            return Ok(unsafe { self.slot.get_unchecked(Ordering::Relaxed) });
         }
         self.get_instance_slow()
      } else {
         let _guard = self.sync.acquire();
         self.get_or_construct()
      }
   }

   /// Slow path of the double-checked protocol.
   #[cold]
   fn get_instance_slow(&self) -> Result<&T, T::Error> {
      let _guard = self.sync.acquire();
      self.get_or_construct()
   }

   /// Returns the managed instance from an async context.
   ///
   /// Follows the same protocol as [`get_instance`](Self::get_instance) but waits for
   /// the lock with [`RawLock::lock_async`](crate::RawLock::lock_async), yielding to
   /// the runtime instead of parking the worker thread. The constructor itself is
   /// synchronous.
   ///
   /// # Errors
   ///
   /// Same as [`get_instance`](Self::get_instance).
   ///
   /// # Panics
   ///
   /// With the `async-tokio-mt` feature, a wait that outlasts the bounded number of
   /// yields falls back to `tokio::task::block_in_place`, which panics on a
   /// `current_thread` runtime. Use the multi-threaded runtime, or only the
   /// `async-tokio` feature, when the lock can be contended.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_instance_async(&self) -> Result<&T, T::Error> {
      if S::DOUBLE_CHECKED && self.sync.is_initialized() {
         // SAFETY: See `get_instance`.
         return Ok(unsafe { self.slot.get_unchecked(Ordering::Relaxed) });
      }
      let _guard = match self.sync.raw_lock() {
         Some(lock) => Some(lock.lock_async().await),
         None => None,
      };
      self.get_or_construct()
   }

   /// Body of the critical section. The caller holds the sync policy's guard.
   fn get_or_construct(&self) -> Result<&T, T::Error> {
      // Second check for the double-checked protocol: another thread may have
      // finished construction while we waited for the lock.
      if S::DOUBLE_CHECKED && self.sync.is_initialized() {
         // SAFETY: See `get_instance`.
         return Ok(unsafe { self.slot.get_unchecked(Ordering::Relaxed) });
      }

      let value = match self.slot.state() {
         // SAFETY: Ready was observed with Acquire.
         SlotState::Ready => unsafe { self.slot.get_unchecked(Ordering::Acquire) },
         SlotState::Destroyed => {
            warn!(singleton = type_name::<T>(), "access after teardown");
            return Err(Error::Destroyed);
         }
         SlotState::Initializing => return Err(Error::Reentrant),
         SlotState::Uninitialized => self.construct()?,
      };

      if S::DOUBLE_CHECKED {
         self.sync.mark_initialized();
      }
      Ok(value)
   }

   #[cold]
   fn construct(&self) -> Result<&T, T::Error> {
      debug!(singleton = type_name::<T>(), eager = C::EAGER, "constructing instance");
      // Dropping `init` without committing reverts the slot to uninitialized,
      // which also covers a panicking constructor.
      let init = self.slot.begin();
      match C::create_instance::<T>(Construct::new()) {
         Ok(value) => {
            let value = init.commit(value);
            debug!(singleton = type_name::<T>(), "instance ready");
            Ok(value)
         }
         Err(err) => {
            drop(init);
            warn!(singleton = type_name::<T>(), error = %err, "construction failed");
            Err(Error::Construction(err))
         }
      }
   }
}

impl<T, C, S, L> Singleton<T, C, S, L>
where
   S: SyncPolicy,
   L: LifetimePolicy,
{
   /// Declares a manager identity with an empty slot.
   ///
   /// Nothing is constructed here, whatever the creation policy; eager policies
   /// construct at [`register`](Self::register) or, at the latest, on first access.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         slot: Slot::new(),
         sync: S::NEW,
         torn_down: AtomicBool::new(false),
         _policies: PhantomData,
      }
   }

   /// Returns the instance if it is ready, without constructing it.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      self.slot.get()
   }

   /// Returns the slot's current state.
   #[inline]
   pub fn state(&self) -> SlotState {
      self.slot.state()
   }

   /// Returns `true` once the teardown hook has fired.
   #[inline]
   pub fn is_torn_down(&self) -> bool {
      self.torn_down.load(Ordering::Acquire)
   }

   /// Fires the teardown hook, applying the lifetime policy.
   ///
   /// The hook runs at most once; later calls, including the one from `Drop`, do
   /// nothing.
   #[inline]
   pub fn teardown(&mut self) {
      // SAFETY: `&mut self` rules out concurrent access and outstanding borrows.
      unsafe { self.teardown_unchecked() }
   }

   /// Fires the teardown hook through a shared reference.
   ///
   /// This is how a manager stored in a `static` is torn down, since statics are
   /// never dropped.
   ///
   /// # Safety
   ///
   /// No other thread may be inside an access operation on this manager while the
   /// hook runs, and if the lifetime policy releases the instance, no reference
   /// previously returned by this manager may be used afterwards.
   pub unsafe fn teardown_unchecked(&self) {
      if self.torn_down.swap(true, Ordering::AcqRel) {
         return;
      }
      // SAFETY: Forwarded from the caller.
      let handle = unsafe { SlotTeardown::new(&self.slot) };
      let populated = handle.is_populated();
      // The value's destructor may reach this manager again, so the fast path is
      // closed before the lifetime policy gets a chance to release the value.
      self.sync.clear_initialized();
      L::destroy_instance(handle);

      let destroyed = self.slot.state() == SlotState::Destroyed;
      if !destroyed && populated {
         self.sync.mark_initialized();
      }
      debug!(
         singleton = type_name::<T>(),
         populated,
         destroyed,
         "teardown hook fired"
      );
   }
}

impl<T, C, S> Singleton<T, C, S, NeverDestroy>
where
   T: Managed + 'static,
   C: CreationPolicy,
   S: SyncPolicy,
{
   /// Returns the instance with a `'static` lifetime.
   ///
   /// [`NeverDestroy`] never releases the instance's storage, so the reference stays
   /// valid even after this manager is dropped.
   #[inline]
   pub fn get_static(&self) -> Result<&'static T, T::Error> {
      let value: *const T = self.get_instance()?;
      // SAFETY: The value is boxed and `NeverDestroy` never frees the box; the slot
      // itself has no drop glue for it.
      Ok(unsafe { &*value })
   }
}

impl<T, C, S, L> Singleton<T, C, S, L>
where
   T: Managed + Send + Sync + 'static,
   C: CreationPolicy + 'static,
   S: SyncPolicy + Send + Sync + 'static,
   L: LifetimePolicy + 'static,
{
   /// Returns the process-wide manager for this exact type and policy combination.
   ///
   /// The first call for an identity creates it and registers it; with
   /// [`CreateOnInit`](crate::CreateOnInit) that first call also constructs the
   /// instance. Every call returns the same manager.
   ///
   /// # Errors
   ///
   /// Returns a construction error from an eager creation policy. The identity stays
   /// registered and the next call retries.
   pub fn global() -> Result<&'static Self, T::Error> {
      registry::lookup_or_insert::<Self>(Self::new).register()
   }

   /// Registers a manager stored in a `static`.
   ///
   /// Enrolls its teardown hook so [`registry::shutdown`] fires it, then applies the
   /// creation policy's trigger like [`register`](Self::register). Calling it again
   /// does not enroll the manager twice.
   ///
   /// # Errors
   ///
   /// Returns a construction error from an eager creation policy. The manager stays
   /// enrolled and the next access retries.
   pub fn register_static(&'static self) -> Result<&'static Self, T::Error> {
      if registry::enroll(self) {
         debug!(singleton = type_name::<T>(), "static manager enrolled for shutdown");
      }
      self.register()
   }
}

impl<T, C, S, L> registry::Finalize for Singleton<T, C, S, L>
where
   T: Managed + Send + Sync,
   C: CreationPolicy,
   S: SyncPolicy + Send + Sync,
   L: LifetimePolicy,
{
   unsafe fn finalize(&self) {
      // SAFETY: Forwarded from `registry::shutdown`.
      unsafe { self.teardown_unchecked() }
   }
}

impl<T, C, S, L> Default for Singleton<T, C, S, L>
where
   T: Managed,
   C: CreationPolicy,
   S: SyncPolicy,
   L: LifetimePolicy,
{
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T, C, S, L> fmt::Debug for Singleton<T, C, S, L>
where
   T: fmt::Debug,
   S: SyncPolicy,
   L: LifetimePolicy,
{
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Singleton")
         .field("slot", &self.slot)
         .field("torn_down", &self.torn_down.load(Ordering::Relaxed))
         .finish()
   }
}

impl<T, C, S, L> Drop for Singleton<T, C, S, L>
where
   S: SyncPolicy,
   L: LifetimePolicy,
{
   fn drop(&mut self) {
      self.teardown();
   }
}
