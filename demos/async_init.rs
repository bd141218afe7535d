use std::sync::atomic::{AtomicUsize, Ordering};

use policy_singleton::{Construct, CreateOnFirstUse, DoubleCheckedLockable, Managed, Singleton};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Catalog {
   entries: Vec<&'static str>,
}

impl Managed for Catalog {
   type Error = std::convert::Infallible;

   fn create(_: Construct) -> Result<Self, Self::Error> {
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Loading catalog...");
      std::thread::sleep(std::time::Duration::from_millis(50));
      Ok(Catalog {
         entries: vec!["alpha", "beta", "gamma"],
      })
   }
}

static CATALOG: Singleton<Catalog, CreateOnFirstUse, DoubleCheckedLockable> = Singleton::new();

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|i| {
         tokio::spawn(async move {
            let catalog = CATALOG.get_instance_async().await.unwrap();
            println!("Task {i} sees {} entries", catalog.entries.len());
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);
}
