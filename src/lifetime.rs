//! Lifetime policies applied by the teardown hook.

use crate::slot::SlotTeardown;

/// Decides whether the managed instance is destroyed when its manager is torn down.
pub trait LifetimePolicy {
   /// Called exactly once, by the teardown hook. The slot may never have been
   /// populated.
   fn destroy_instance<T>(slot: SlotTeardown<'_, T>);
}

/// Drops the instance when the owning scope ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyOnExit;

impl LifetimePolicy for DestroyOnExit {
   #[inline]
   fn destroy_instance<T>(slot: SlotTeardown<'_, T>) {
      slot.release();
   }
}

/// Never destroys the instance. Its storage is leaked for the rest of the process
/// and stays accessible after teardown.
///
/// Suitable for values with no meaningful drop side effects, or whose teardown
/// order relative to other global state cannot be managed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverDestroy;

impl LifetimePolicy for NeverDestroy {
   #[inline(always)]
   fn destroy_instance<T>(_slot: SlotTeardown<'_, T>) {}
}
