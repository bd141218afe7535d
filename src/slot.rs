//! The instance slot: one heap-allocated value plus its initialization state.

use core::fmt;
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

/// Observable state of an instance slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
   /// No value has been constructed yet, or the last attempt failed.
   Uninitialized,
   /// A constructor is running.
   Initializing,
   /// The value is constructed and may be referenced.
   Ready,
   /// The teardown hook released the value. Terminal.
   Destroyed,
}

impl SlotState {
   const UNINIT: u8 = 0;
   const INITIALIZING: u8 = 1;
   const READY: u8 = 2;
   const DESTROYED: u8 = 3;

   #[inline]
   const fn from_raw(raw: u8) -> Self {
      match raw {
         Self::UNINIT => Self::Uninitialized,
         Self::INITIALIZING => Self::Initializing,
         Self::READY => Self::Ready,
         _ => Self::Destroyed,
      }
   }
}

/// Storage for a single managed instance.
///
/// The value is boxed so that its address is fixed from construction until it is
/// released, and so that a lifetime policy can leak it independently of the slot.
/// Mutation only happens through `SlotInit` (inside the construction critical
/// section) and [`SlotTeardown`] (inside the teardown hook).
pub struct Slot<T> {
   value: AtomicPtr<T>,
   state: AtomicU8,
   _owns: PhantomData<T>,
}

impl<T> Slot<T> {
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         value: AtomicPtr::new(ptr::null_mut()),
         state: AtomicU8::new(SlotState::UNINIT),
         _owns: PhantomData,
      }
   }

   /// Returns the current state.
   #[inline]
   pub fn state(&self) -> SlotState {
      SlotState::from_raw(self.state.load(Ordering::Acquire))
   }

   /// Returns a reference to the value if the slot is ready.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.state() == SlotState::Ready {
         // SAFETY: The Acquire load of READY synchronizes with the Release store in
         // `SlotInit::commit`, which happens after the pointer is published.
         Some(unsafe { self.get_unchecked(Ordering::Relaxed) })
      } else {
         None
      }
   }

   /// Returns a reference to the value without checking the state.
   ///
   /// # Safety
   ///
   /// The slot must be ready, and the caller must already have synchronized with the
   /// thread that constructed it, unless `ordering` is `Acquire`.
   #[inline]
   pub(crate) unsafe fn get_unchecked(&self, ordering: Ordering) -> &T {
      let value = self.value.load(ordering);
      debug_assert!(!value.is_null(), "get_unchecked called on an empty slot");
      // SAFETY: The caller guarantees the slot holds a live value. The box is only
      // freed by `SlotTeardown::release`, which requires exclusive access.
      unsafe { &*value }
   }

   /// Moves the slot to `Initializing` and returns the construction guard.
   ///
   /// The caller must hold whatever exclusion the sync policy provides and must
   /// have observed the slot as `Uninitialized`.
   #[inline]
   pub(crate) fn begin(&self) -> SlotInit<'_, T> {
      self.state.store(SlotState::INITIALIZING, Ordering::Relaxed);
      SlotInit { slot: self }
   }

   #[inline]
   fn seal(&self) {
      self.state.store(SlotState::DESTROYED, Ordering::Release);
   }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("Slot");
      d.field("state", &self.state());
      match self.get() {
         Some(v) => d.field("value", v),
         None => d.field("value", &format_args!("<empty>")),
      };
      d.finish()
   }
}

// SAFETY: `&Slot<T>` hands out `&T`, so sharing needs `T: Sync`. The value may be
// constructed on one thread and dropped on another, so it also needs `T: Send`.
unsafe impl<T: Send + Sync> Sync for Slot<T> {}
// SAFETY: The slot owns its `T`.
unsafe impl<T: Send> Send for Slot<T> {}

/// Construction guard. Reverts the slot to `Uninitialized` unless committed, so a
/// failing or panicking constructor leaves the slot retryable.
pub(crate) struct SlotInit<'a, T> {
   slot: &'a Slot<T>,
}

impl<'a, T> SlotInit<'a, T> {
   /// Publishes `value` and marks the slot ready.
   #[inline]
   pub(crate) fn commit(self, value: T) -> &'a T {
      let slot = self.slot;
      let raw = Box::into_raw(Box::new(value));
      slot.value.store(raw, Ordering::Release);
      slot.state.store(SlotState::READY, Ordering::Release);
      core::mem::forget(self);
      // SAFETY: `raw` came from `Box::into_raw` just above and is never freed
      // while the slot is borrowed.
      unsafe { &*raw }
   }
}

impl<T> Drop for SlotInit<'_, T> {
   #[inline]
   fn drop(&mut self) {
      self.slot.state.store(SlotState::UNINIT, Ordering::Release);
   }
}

/// Capability handed to a [`LifetimePolicy`](crate::LifetimePolicy) by the teardown hook.
///
/// Only the hook can create one, at a point where no other access to the slot can
/// happen. Dropping the handle without calling [`release`](Self::release) leaves the
/// value alive and accessible.
pub struct SlotTeardown<'a, T> {
   slot: &'a Slot<T>,
}

impl<'a, T> SlotTeardown<'a, T> {
   /// # Safety
   ///
   /// No other thread may access the slot, and no reference previously returned
   /// from it may be used after a `release`.
   #[inline]
   pub(crate) unsafe fn new(slot: &'a Slot<T>) -> Self {
      Self { slot }
   }

   /// Current state of the slot being torn down.
   #[inline]
   pub fn state(&self) -> SlotState {
      self.slot.state()
   }

   /// Returns `true` if the slot holds a value.
   #[inline]
   pub fn is_populated(&self) -> bool {
      self.state() == SlotState::Ready
   }

   /// Drops the value, if any, and marks the slot `Destroyed`.
   ///
   /// Returns `true` if a value was dropped.
   pub fn release(self) -> bool {
      // Sealed first, so the value's destructor observes `Destroyed`.
      self.slot.seal();
      let raw = self.slot.value.swap(ptr::null_mut(), Ordering::Acquire);
      if raw.is_null() {
         return false;
      }
      // SAFETY: `raw` came from `Box::into_raw` in `SlotInit::commit`. Creating this
      // handle required exclusive access, so nothing else reads the value.
      drop(unsafe { Box::from_raw(raw) });
      true
   }
}
