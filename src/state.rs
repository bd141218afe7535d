//! Futex-style lock word used by the locking synchronization policies.
//!
//! The state is packed into a single `AtomicU8` with the following layout:
//! - Bit 0: LOCKED - The lock is held
//! - Bit 1: WAITING - At least one thread is parked on the lock
//! - Bits 2-7: EPOCH - Generation counter bumped on every release
//!
//! Parked threads wait on the address of the atomic through `parking_lot_core`,
//! so an uncontended lock/unlock pair is one CAS and one swap.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// A raw mutual-exclusion lock with no protected data.
///
/// This is the lock resource owned by [`ClassLevelLockable`](crate::ClassLevelLockable)
/// and [`DoubleCheckedLockable`](crate::DoubleCheckedLockable). It is public so that
/// custom [`SyncPolicy`](crate::SyncPolicy) implementations can reuse it.
#[repr(transparent)]
pub struct RawLock(AtomicU8);

impl RawLock {
   /// Bit flag: Lock is held.
   const LOCKED: u8 = 1;
   /// Bit flag: At least one thread is waiting for the lock.
   const WAITING: u8 = 2;
   /// Start of epoch bits.
   const EPOCH_1: u8 = 4;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates a new, unlocked lock.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Returns `true` if some thread currently holds the lock.
   ///
   /// The answer may be stale by the time the caller looks at it.
   #[inline]
   pub fn is_locked(&self) -> bool {
      self.0.load(Ordering::Relaxed) & Self::LOCKED != 0
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: The address passed to unpark must match the address used for park.
      // We consistently use the address of the AtomicU8.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread until the state differs from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See safety comment in `notify_all`.
      unsafe {
         // park() validates before sleeping, so a release racing with us is never lost.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Relaxed) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Releases the lock, bumps the epoch and wakes waiters if any were recorded.
   #[inline]
   fn unlock(&self) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::next_epoch(current_state);

      // Release ordering publishes every write made inside the critical section
      // to the next thread that acquires the lock.
      let prev_state = self.0.swap(new_state, Ordering::Release);
      debug_assert!(prev_state & Self::LOCKED != 0, "unlock of an unlocked RawLock");

      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Tries to take the lock once.
   ///
   /// Returns `Ok(guard)` on success, or `Err(state)` with the state to wait on.
   /// With `nowait` the WAITING flag is left alone.
   #[inline]
   fn lock_step(&self, nowait: bool) -> Result<LockGuard<'_>, u8> {
      loop {
         let current_state = self.0.load(Ordering::Relaxed);

         if current_state & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(LockGuard::new(self)),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && (current_state & Self::WAITING == 0) {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(current_state);
      }
   }

   /// Acquires the lock, parking the calling thread while it is held elsewhere.
   #[inline]
   pub fn lock(&self) -> LockGuard<'_> {
      match self.lock_step(false) {
         Ok(guard) => guard,
         Err(mut state_when_failed) => loop {
            self.wait(state_when_failed);
            match self.lock_step(false) {
               Ok(guard) => return guard,
               Err(new_state) => state_when_failed = new_state,
            }
         },
      }
   }

   /// Acquires the lock if it is free, without blocking.
   #[inline]
   pub fn try_lock(&self) -> Option<LockGuard<'_>> {
      self.lock_step(true).ok()
   }

   /// Acquires the lock from an async context.
   ///
   /// Yields to the runtime while the lock is held elsewhere. With the
   /// `async-tokio-mt` feature it falls back to `block_in_place` after a bounded
   /// number of yields, which requires the multi-threaded runtime.
   ///
   /// # Panics
   ///
   /// With `async-tokio-mt`, panics if the wait reaches the `block_in_place`
   /// fallback on a `current_thread` runtime.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn lock_async(&self) -> LockGuard<'_> {
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            match self.lock_step(true) {
               Ok(guard) => return guard,
               Err(state) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            return match self.lock_step(false) {
               Ok(guard) => guard,
               Err(state) => tokio::task::block_in_place(|| {
                  self.wait(state);
                  self.lock()
               }),
            };
         }
      }
   }
}

impl Default for RawLock {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl core::fmt::Debug for RawLock {
   fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
      f.debug_struct("RawLock").field("locked", &self.is_locked()).finish()
   }
}

/// RAII guard returned by [`RawLock::lock`] and friends. Dropping it releases the lock.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
   lock: &'a RawLock,
}

impl<'a> LockGuard<'a> {
   /// Creates a new guard. Assumes the `LOCKED` flag is already set on `lock`.
   #[inline(always)]
   const fn new(lock: &'a RawLock) -> Self {
      Self { lock }
   }

   /// Releases the lock early.
   #[inline]
   pub fn unlock(self) {
      mem::drop(self);
   }
}

impl Drop for LockGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.lock.unlock();
   }
}
