//! Creation policies and the construction contract of managed types.

/// Capability token proving that the caller is a singleton manager.
///
/// Its constructor is private to this crate, so [`Managed::create`] can only be
/// reached through a [`Singleton`](crate::Singleton). Keep the fields of a managed
/// type private as well and the manager becomes its only constructor.
#[derive(Debug)]
pub struct Construct {
   _private: (),
}

impl Construct {
   #[inline(always)]
   pub(crate) const fn new() -> Self {
      Self { _private: () }
   }
}

/// A type whose single instance is owned by a [`Singleton`](crate::Singleton).
///
/// ```rust
/// use std::convert::Infallible;
/// use policy_singleton::{Construct, Managed, Singleton};
///
/// pub struct Config {
///    level: u8,
/// }
///
/// impl Managed for Config {
///    type Error = Infallible;
///
///    fn create(_: Construct) -> Result<Self, Self::Error> {
///       Ok(Config { level: 3 })
///    }
/// }
///
/// static CONFIG: Singleton<Config> = Singleton::new();
/// assert_eq!(CONFIG.get_instance().unwrap().level, 3);
/// ```
pub trait Managed: Sized {
   /// Error returned by a failed construction. Use [`Infallible`](core::convert::Infallible)
   /// when construction cannot fail.
   type Error: std::error::Error + Send + Sync + 'static;

   /// Builds the instance. Called at most once per successful initialization.
   fn create(token: Construct) -> Result<Self, Self::Error>;
}

/// Decides when the managed instance is constructed.
pub trait CreationPolicy {
   /// `true` if the instance is built when the manager identity is registered,
   /// `false` if it waits for the first access.
   const EAGER: bool;

   /// Builds the instance. The manager calls this exactly when the policy says so,
   /// inside the construction critical section.
   #[inline]
   fn create_instance<T: Managed>(token: Construct) -> Result<T, T::Error> {
      T::create(token)
   }
}

/// Defers construction until the first access observes an empty slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOnFirstUse;

impl CreationPolicy for CreateOnFirstUse {
   const EAGER: bool = false;
}

/// Constructs the instance as soon as the manager identity is registered, ahead of
/// any access.
///
/// Registration happens in [`Singleton::try_new`](crate::Singleton::try_new),
/// [`Singleton::register`](crate::Singleton::register) and the first
/// [`Singleton::global`](crate::Singleton::global) for the identity. A manager
/// declared with `const fn new()` and never registered still constructs on first
/// access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOnInit;

impl CreationPolicy for CreateOnInit {
   const EAGER: bool = true;
}
