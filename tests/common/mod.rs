#![allow(dead_code)]

/// Declares a managed type that counts its constructions and drops in statics of
/// its own, so tests running in parallel never share counters.
macro_rules! counted {
   ($name:ident) => {
      pub struct $name {
         pub serial: usize,
      }

      impl $name {
         pub fn created() -> usize {
            Self::counters().0.load(::std::sync::atomic::Ordering::SeqCst)
         }

         pub fn dropped() -> usize {
            Self::counters().1.load(::std::sync::atomic::Ordering::SeqCst)
         }

         pub fn reset() {
            Self::counters().0.store(0, ::std::sync::atomic::Ordering::SeqCst);
            Self::counters().1.store(0, ::std::sync::atomic::Ordering::SeqCst);
         }

         fn counters() -> &'static (
            ::std::sync::atomic::AtomicUsize,
            ::std::sync::atomic::AtomicUsize,
         ) {
            static COUNTERS: (
               ::std::sync::atomic::AtomicUsize,
               ::std::sync::atomic::AtomicUsize,
            ) = (
               ::std::sync::atomic::AtomicUsize::new(0),
               ::std::sync::atomic::AtomicUsize::new(0),
            );
            &COUNTERS
         }
      }

      impl ::policy_singleton::Managed for $name {
         type Error = ::std::convert::Infallible;

         fn create(_: ::policy_singleton::Construct) -> Result<Self, Self::Error> {
            let serial = Self::counters()
               .0
               .fetch_add(1, ::std::sync::atomic::Ordering::SeqCst);
            Ok(Self { serial })
         }
      }

      impl Drop for $name {
         fn drop(&mut self) {
            Self::counters()
               .1
               .fetch_add(1, ::std::sync::atomic::Ordering::SeqCst);
         }
      }
   };
}

/// Error used by the fallible managed types in the tests.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("construction refused on attempt {0}")]
pub struct Refused(pub usize);
