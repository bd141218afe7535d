use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use policy_singleton::{
   ClassLevelLockable, Construct, CreateOnFirstUse, CreationPolicy, DestroyOnExit,
   DoubleCheckedLockable, LifetimePolicy, Managed, NoThreadSafety, Singleton, SyncPolicy,
};
use proptest::prelude::*;

#[macro_use]
mod common;

counted!(Scenario);
counted!(LockedRace);
counted!(CheckedRace);
counted!(Unsynced);

/// Spawns `threads` accessors released by one barrier and returns the addresses
/// they observed.
fn race<T, C, S, L>(manager: &Arc<Singleton<T, C, S, L>>, threads: usize) -> Vec<usize>
where
   T: Managed + Send + Sync + 'static,
   C: CreationPolicy + 'static,
   S: SyncPolicy + Send + Sync + 'static,
   L: LifetimePolicy + 'static,
{
   let barrier = Arc::new(Barrier::new(threads));
   let handles: Vec<_> = (0..threads)
      .map(|_| {
         let manager = Arc::clone(manager);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            manager.get_instance().unwrap() as *const T as usize
         })
      })
      .collect();
   handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_eight_threads_lazy_double_checked_destroy_on_exit() {
   let manager: Arc<Singleton<Scenario, CreateOnFirstUse, DoubleCheckedLockable, DestroyOnExit>> =
      Arc::new(Singleton::new());

   let addresses = race(&manager, 8);
   assert_eq!(Scenario::created(), 1);
   assert_eq!(addresses.len(), 8);
   assert!(addresses.iter().all(|&a| a == addresses[0]));
   assert_eq!(Scenario::dropped(), 0);

   // The last owner ends the scope.
   drop(manager);
   assert_eq!(Scenario::dropped(), 1);
}

#[test]
fn test_no_thread_safety_single_threaded() {
   let manager: Singleton<Unsynced, CreateOnFirstUse, NoThreadSafety> = Singleton::new();
   let first = manager.get_instance().unwrap() as *const Unsynced;
   for _ in 0..100 {
      assert_eq!(manager.get_instance().unwrap() as *const Unsynced, first);
   }
   assert_eq!(Unsynced::created(), 1);
   drop(manager);
   assert_eq!(Unsynced::dropped(), 1);
}

static SLOW_CREATED: AtomicUsize = AtomicUsize::new(0);

struct SlowLocked;

impl Managed for SlowLocked {
   type Error = std::convert::Infallible;

   fn create(_: Construct) -> Result<Self, Self::Error> {
      SLOW_CREATED.fetch_add(1, Ordering::SeqCst);
      thread::sleep(Duration::from_millis(20));
      Ok(SlowLocked)
   }
}

#[test]
fn test_waiters_block_until_slow_construction_finishes() {
   let manager: Arc<Singleton<SlowLocked, CreateOnFirstUse, ClassLevelLockable>> =
      Arc::new(Singleton::new());
   let addresses = race(&manager, 10);
   assert!(addresses.iter().all(|&a| a == addresses[0]));
   assert_eq!(SLOW_CREATED.load(Ordering::SeqCst), 1);
}

proptest! {
   #![proptest_config(ProptestConfig::with_cases(24))]

   #[test]
   fn prop_single_construction_always_locked(threads in 1usize..16) {
      LockedRace::reset();
      let manager: Arc<Singleton<LockedRace, CreateOnFirstUse, ClassLevelLockable>> =
         Arc::new(Singleton::new());
      let addresses = race(&manager, threads);
      prop_assert_eq!(LockedRace::created(), 1);
      prop_assert!(addresses.iter().all(|&a| a == addresses[0]));
      drop(manager);
      prop_assert_eq!(LockedRace::dropped(), 1);
   }

   #[test]
   fn prop_single_construction_double_checked(threads in 1usize..16) {
      CheckedRace::reset();
      let manager: Arc<Singleton<CheckedRace, CreateOnFirstUse, DoubleCheckedLockable>> =
         Arc::new(Singleton::new());
      let addresses = race(&manager, threads);
      prop_assert_eq!(CheckedRace::created(), 1);
      prop_assert!(addresses.iter().all(|&a| a == addresses[0]));
      drop(manager);
      prop_assert_eq!(CheckedRace::dropped(), 1);
   }
}
