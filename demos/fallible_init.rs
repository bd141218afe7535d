use std::sync::atomic::{AtomicBool, Ordering};

use policy_singleton::{Construct, CreateOnFirstUse, DoubleCheckedLockable, Managed, Singleton};

static FAIL_NEXT: AtomicBool = AtomicBool::new(true);

#[derive(Debug, thiserror::Error)]
#[error("backing store unavailable")]
struct Unavailable;

struct Store {
   banner: String,
}

impl Managed for Store {
   type Error = Unavailable;

   fn create(_: Construct) -> Result<Self, Unavailable> {
      let fail = FAIL_NEXT.swap(false, Ordering::SeqCst);
      println!("Attempting initialization (fail={fail})...");
      if fail {
         Err(Unavailable)
      } else {
         Ok(Store {
            banner: "Successfully initialized".to_string(),
         })
      }
   }
}

static STORE: Singleton<Store, CreateOnFirstUse, DoubleCheckedLockable> = Singleton::new();

fn main() {
   // First attempt fails and leaves the slot empty.
   match STORE.get_instance() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(STORE.get().is_none());

   // Second attempt retries construction.
   let store = STORE.get_instance().expect("second attempt succeeds");
   println!("Got data: {}", store.banner);

   // Later calls return the same instance without constructing again.
   assert!(std::ptr::eq(store, STORE.get_instance().unwrap()));
}
