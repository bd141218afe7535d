use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use policy_singleton::{
   ClassLevelLockable, DoubleCheckedLockable, NoThreadSafety, RawLock, SyncPolicy,
};

#[test]
fn test_try_lock() {
   let lock = RawLock::new();
   assert!(!lock.is_locked());

   let guard = lock.try_lock().expect("free lock");
   assert!(lock.is_locked());
   assert!(lock.try_lock().is_none());

   guard.unlock();
   assert!(!lock.is_locked());
   assert!(lock.try_lock().is_some());
}

#[test]
fn test_lock_excludes_other_threads() {
   let lock = Arc::new(RawLock::new());
   let inside = Arc::new(AtomicBool::new(false));
   let entries = Arc::new(AtomicUsize::new(0));

   let threads: Vec<_> = (0..8)
      .map(|_| {
         let lock = Arc::clone(&lock);
         let inside = Arc::clone(&inside);
         let entries = Arc::clone(&entries);
         thread::spawn(move || {
            for _ in 0..50 {
               let _guard = lock.lock();
               assert!(!inside.swap(true, Ordering::SeqCst), "two threads in the critical section");
               entries.fetch_add(1, Ordering::SeqCst);
               thread::sleep(Duration::from_micros(50));
               inside.store(false, Ordering::SeqCst);
            }
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   assert_eq!(entries.load(Ordering::SeqCst), 400);
   assert!(!lock.is_locked());
}

#[test]
fn test_policy_guards() {
   let none = NoThreadSafety::NEW;
   assert!(!none.acquire().is_locked());
   assert!(none.raw_lock().is_none());

   let locked = ClassLevelLockable::NEW;
   {
      let guard = locked.acquire();
      assert!(guard.is_locked());
      assert!(locked.raw_lock().unwrap().is_locked());
   }
   assert!(!locked.raw_lock().unwrap().is_locked());
   assert!(!ClassLevelLockable::DOUBLE_CHECKED);
}

#[test]
fn test_double_checked_flag_is_independent_of_lock() {
   let policy = DoubleCheckedLockable::NEW;
   assert!(DoubleCheckedLockable::DOUBLE_CHECKED);
   assert!(!policy.is_initialized());

   {
      let _guard = policy.acquire();
      policy.mark_initialized();
   }
   assert!(policy.is_initialized());
   assert!(!policy.raw_lock().unwrap().is_locked());

   policy.clear_initialized();
   assert!(!policy.is_initialized());
}
