//! Error type for singleton access.

/// Errors returned by [`Singleton`](crate::Singleton) access operations.
///
/// `E` is the managed type's construction error.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
   /// The managed type's constructor failed. The slot is left uninitialized and the
   /// next access retries.
   #[error("singleton construction failed: {0}")]
   Construction(#[source] E),

   /// The instance was accessed after the teardown hook released it.
   #[error("singleton accessed after teardown")]
   Destroyed,

   /// The constructor accessed its own singleton while it was being built.
   #[error("singleton accessed re-entrantly during its own construction")]
   Reentrant,
}

impl<E> Error<E> {
   /// Returns the construction error, if that is what this is.
   #[inline]
   pub fn construction(&self) -> Option<&E> {
      match self {
         Self::Construction(e) => Some(e),
         _ => None,
      }
   }

   /// Returns `true` for [`Error::Destroyed`].
   #[inline]
   pub fn is_destroyed(&self) -> bool {
      matches!(self, Self::Destroyed)
   }
}

/// Result alias for access operations on a singleton of `T`.
pub type Result<T, E> = core::result::Result<T, Error<E>>;
