//! Synchronization policies guarding the construction path.

use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::state::{LockGuard, RawLock};

/// Scoped acquire/release pair returned by [`SyncPolicy::acquire`].
///
/// Holds the policy's lock, if it has one. Dropping the guard releases it.
#[must_use = "the policy is released as soon as the guard is dropped"]
pub struct SyncGuard<'a>(Option<LockGuard<'a>>);

impl<'a> SyncGuard<'a> {
   /// A guard that holds nothing.
   #[inline(always)]
   pub const fn unlocked() -> Self {
      Self(None)
   }

   /// A guard holding `guard`.
   #[inline(always)]
   pub const fn locked(guard: LockGuard<'a>) -> Self {
      Self(Some(guard))
   }

   /// Returns `true` if this guard holds a lock.
   #[inline]
   pub fn is_locked(&self) -> bool {
      self.0.is_some()
   }
}

/// Decides how concurrent access to the construction check is serialized.
///
/// # Safety
///
/// If `Self: Sync`, the guard returned by [`acquire`](Self::acquire) must give
/// mutual exclusion between every thread sharing the policy: the manager reads and
/// writes its slot under that guard alone. Policies that cannot provide that must
/// be `!Sync`.
///
/// If [`DOUBLE_CHECKED`](Self::DOUBLE_CHECKED) is `true`, `is_initialized` must
/// load with `Acquire` and `mark_initialized` must store with `Release`.
pub unsafe trait SyncPolicy: Sized {
   /// An unlocked, uninitialized policy, used by `const` construction of managers.
   const NEW: Self;

   /// Selects the double-checked access protocol.
   const DOUBLE_CHECKED: bool = false;

   /// The lock resource, or `None` when the policy does not synchronize.
   fn raw_lock(&self) -> Option<&RawLock>;

   /// Enters the critical section.
   #[inline]
   fn acquire(&self) -> SyncGuard<'_> {
      match self.raw_lock() {
         Some(lock) => SyncGuard::locked(lock.lock()),
         None => SyncGuard::unlocked(),
      }
   }

   /// The policy's own readiness flag. Only meaningful for double-checked policies.
   #[inline]
   fn is_initialized(&self) -> bool {
      false
   }

   /// Publishes readiness. Called inside the critical section, after construction.
   #[inline]
   fn mark_initialized(&self) {}

   /// Withdraws readiness. Called by the teardown hook once the value is released.
   #[inline]
   fn clear_initialized(&self) {}
}

/// No synchronization at all.
///
/// Both halves of the acquire/release pair are no-ops. The policy is `!Sync`, so a
/// manager using it cannot be shared between threads or stored in a `static`; put
/// it in a `thread_local!` or keep it owned.
#[derive(Debug, Default)]
pub struct NoThreadSafety {
   _single_threaded: PhantomData<Cell<()>>,
}

// SAFETY: The policy is `!Sync`, so the manager is confined to one thread.
unsafe impl SyncPolicy for NoThreadSafety {
   const NEW: Self = Self {
      _single_threaded: PhantomData,
   };

   #[inline(always)]
   fn raw_lock(&self) -> Option<&RawLock> {
      None
   }
}

/// Takes an exclusive lock around every access, even after the instance is ready.
#[derive(Debug, Default)]
pub struct ClassLevelLockable {
   lock: RawLock,
}

// SAFETY: Every access goes through `RawLock::lock`.
unsafe impl SyncPolicy for ClassLevelLockable {
   const NEW: Self = Self {
      lock: RawLock::new(),
   };

   #[inline(always)]
   fn raw_lock(&self) -> Option<&RawLock> {
      Some(&self.lock)
   }
}

/// Double-checked locking with an independent readiness flag.
///
/// Once the flag is set, access is a single `Acquire` load and never touches the
/// lock. The flag is set with `Release` after the instance is fully constructed, so
/// any thread that sees it also sees the constructed value.
#[derive(Debug, Default)]
pub struct DoubleCheckedLockable {
   lock: RawLock,
   initialized: AtomicBool,
}

// SAFETY: Construction is serialized by `RawLock`, and the flag uses Acquire/Release.
unsafe impl SyncPolicy for DoubleCheckedLockable {
   const NEW: Self = Self {
      lock: RawLock::new(),
      initialized: AtomicBool::new(false),
   };

   const DOUBLE_CHECKED: bool = true;

   #[inline(always)]
   fn raw_lock(&self) -> Option<&RawLock> {
      Some(&self.lock)
   }

   #[inline(always)]
   fn is_initialized(&self) -> bool {
      self.initialized.load(Ordering::Acquire)
   }

   #[inline(always)]
   fn mark_initialized(&self) {
      self.initialized.store(true, Ordering::Release);
   }

   #[inline(always)]
   fn clear_initialized(&self) {
      self.initialized.store(false, Ordering::Release);
   }
}
