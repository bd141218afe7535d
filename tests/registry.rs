use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use policy_singleton::{
   ClassLevelLockable, Construct, CreateOnFirstUse, CreateOnInit, DestroyOnExit,
   DoubleCheckedLockable, Managed, NeverDestroy, SlotState, Singleton,
};

#[macro_use]
mod common;

use common::Refused;

counted!(GlobalLazy);
counted!(GlobalEager);
counted!(GlobalShared);
counted!(GlobalRace);

type LazyGlobal = Singleton<GlobalLazy, CreateOnFirstUse, DoubleCheckedLockable, DestroyOnExit>;

#[test]
fn test_global_returns_same_identity() {
   let a = LazyGlobal::global().unwrap();
   let b = LazyGlobal::global().unwrap();
   assert!(std::ptr::eq(a, b));
   assert_eq!(a.state(), SlotState::Uninitialized);
   assert_eq!(GlobalLazy::created(), 0);

   assert!(std::ptr::eq(a.get_instance().unwrap(), b.get_instance().unwrap()));
   assert_eq!(GlobalLazy::created(), 1);
   assert!(policy_singleton::registry::len() >= 1);
   assert!(!policy_singleton::registry::is_empty());
}

#[test]
fn test_global_eager_constructs_on_first_reference() {
   let manager = Singleton::<GlobalEager, CreateOnInit, ClassLevelLockable, NeverDestroy>::global()
      .unwrap();
   assert_eq!(GlobalEager::created(), 1);
   assert_eq!(manager.state(), SlotState::Ready);

   Singleton::<GlobalEager, CreateOnInit, ClassLevelLockable, NeverDestroy>::global().unwrap();
   assert_eq!(GlobalEager::created(), 1);
}

#[test]
fn test_policy_combinations_are_distinct_identities() {
   let locked = Singleton::<GlobalShared, CreateOnFirstUse, ClassLevelLockable>::global().unwrap();
   let checked = Singleton::<GlobalShared, CreateOnFirstUse, DoubleCheckedLockable>::global().unwrap();

   let a = locked.get_instance().unwrap();
   let b = checked.get_instance().unwrap();
   assert!(!std::ptr::eq(a, b));
   assert_eq!(GlobalShared::created(), 2);

   let names = policy_singleton::registry::names();
   assert!(names.iter().any(|n| n.contains("ClassLevelLockable") && n.contains("GlobalShared")));
   assert!(names.iter().any(|n| n.contains("DoubleCheckedLockable") && n.contains("GlobalShared")));
}

#[test]
fn test_concurrent_first_reference() {
   type Race = Singleton<GlobalRace, CreateOnInit, DoubleCheckedLockable>;

   let threads: Vec<_> = (0..8)
      .map(|_| thread::spawn(|| Race::global().unwrap() as *const Race as usize))
      .collect();
   let addresses: Vec<usize> = threads.into_iter().map(|h| h.join().unwrap()).collect();

   assert!(addresses.iter().all(|&a| a == addresses[0]));
   assert_eq!(GlobalRace::created(), 1);
}

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

struct FailsFirst;

impl Managed for FailsFirst {
   type Error = Refused;

   fn create(_: Construct) -> Result<Self, Refused> {
      let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst);
      if attempt == 0 {
         Err(Refused(attempt))
      } else {
         Ok(FailsFirst)
      }
   }
}

#[test]
fn test_eager_global_failure_keeps_identity_and_retries() {
   type Flaky = Singleton<FailsFirst, CreateOnInit, ClassLevelLockable>;

   let err = Flaky::global().err().unwrap();
   assert_eq!(err.construction(), Some(&Refused(0)));

   let manager = Flaky::global().unwrap();
   assert_eq!(manager.state(), SlotState::Ready);
   assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
}
