use std::convert::Infallible;

use policy_singleton::{
   ClassLevelLockable, Construct, CreateOnFirstUse, DestroyOnExit, DoubleCheckedLockable, Managed,
   NoThreadSafety, Singleton,
};
use tracing_subscriber::EnvFilter;

pub struct Logger {
   prefix: &'static str,
}

impl Logger {
   pub fn log(&self, message: &str) {
      println!("{}: {}", self.prefix, message);
   }
}

impl Managed for Logger {
   type Error = Infallible;

   fn create(_: Construct) -> Result<Self, Self::Error> {
      println!("Logger created");
      Ok(Logger { prefix: "LOG" })
   }
}

impl Drop for Logger {
   fn drop(&mut self) {
      println!("Logger destroyed");
   }
}

type ThreadSafeLogger = Singleton<Logger, CreateOnFirstUse, ClassLevelLockable, DestroyOnExit>;
type DclLogger = Singleton<Logger, CreateOnFirstUse, DoubleCheckedLockable, DestroyOnExit>;
type UnsafeLogger = Singleton<Logger, CreateOnFirstUse, NoThreadSafety, DestroyOnExit>;

static THREAD_SAFE: ThreadSafeLogger = Singleton::new();

thread_local! {
   static UNSAFE: UnsafeLogger = const { Singleton::new() };
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   println!("=== Thread-safe singleton ===");
   THREAD_SAFE
      .register_static()
      .unwrap()
      .get_instance()
      .unwrap()
      .log("message from the thread-safe logger");

   println!("\n=== Double-checked locking singleton ===");
   let dcl = DclLogger::global().unwrap();
   let threads: Vec<_> = (0..4)
      .map(|i| {
         std::thread::spawn(move || {
            dcl.get_instance()
               .unwrap()
               .log(&format!("message from DCL logger, thread {i}"));
         })
      })
      .collect();
   for t in threads {
      t.join().unwrap();
   }

   println!("\n=== Unsynchronized singleton ===");
   UNSAFE.with(|logger| {
      logger
         .get_instance()
         .unwrap()
         .log("message from the unsynchronized logger");
   });

   println!("\n=== Shutting down ===");
   // SAFETY: All threads are joined and no logger reference is used afterwards.
   unsafe { policy_singleton::registry::shutdown() };
   // The thread-local logger is destroyed when the main thread exits.
}
