//! Process-wide table of singleton identities.
//!
//! Rust has no generic statics, so [`Singleton::global`](crate::Singleton::global)
//! keys each manager by the `TypeId` of its full type, which already encodes the
//! wrapped type and all three policies. Managers are leaked on insertion and live
//! for the rest of the process; only their teardown hooks run at [`shutdown`].
//!
//! Managers declared as `static` items join the table through
//! [`Singleton::register_static`](crate::Singleton::register_static). They are
//! enrolled for [`shutdown`] but are not returned by `global`.

use core::any::{type_name, Any, TypeId};

use parking_lot::{const_mutex, Mutex};
use tracing::{debug, trace};

/// Type-erased teardown hook of a registered manager.
pub(crate) trait Finalize: Send + Sync {
   /// # Safety
   ///
   /// Same contract as [`Singleton::teardown_unchecked`](crate::Singleton::teardown_unchecked).
   unsafe fn finalize(&self);
}

#[derive(Clone, Copy)]
struct Entry {
   /// Set for identities created by `global`; `None` for enrolled statics.
   global: Option<(TypeId, &'static (dyn Any + Send + Sync))>,
   name: &'static str,
   finalize: &'static dyn Finalize,
}

impl Entry {
   #[inline]
   fn address(&self) -> *const () {
      self.finalize as *const dyn Finalize as *const ()
   }
}

/// Entries in registration order.
static REGISTRY: Mutex<Vec<Entry>> = const_mutex(Vec::new());

/// Returns the registered manager of type `M`, creating it with `make` if absent.
///
/// `make` runs under the registry lock and must not construct the managed value;
/// eager construction happens after this returns.
pub(crate) fn lookup_or_insert<M>(make: fn() -> M) -> &'static M
where
   M: Finalize + Any + Send + Sync,
{
   let id = TypeId::of::<M>();
   let mut entries = REGISTRY.lock();

   let found = entries.iter().find_map(|entry| match entry.global {
      Some((entry_id, manager)) if entry_id == id => manager.downcast_ref::<M>(),
      _ => None,
   });
   if let Some(manager) = found {
      return manager;
   }

   let manager: &'static M = Box::leak(Box::new(make()));
   entries.push(Entry {
      global: Some((id, manager)),
      name: type_name::<M>(),
      finalize: manager,
   });
   trace!(identity = type_name::<M>(), count = entries.len(), "registered singleton identity");
   manager
}

/// Enrolls a manager that lives in a `static` so [`shutdown`] fires its hook.
///
/// Returns `false` if this manager was already enrolled.
pub(crate) fn enroll<M>(manager: &'static M) -> bool
where
   M: Finalize + 'static,
{
   let mut entries = REGISTRY.lock();
   let address = manager as *const M as *const ();
   if entries.iter().any(|entry| entry.address() == address) {
      return false;
   }
   entries.push(Entry {
      global: None,
      name: type_name::<M>(),
      finalize: manager,
   });
   trace!(identity = type_name::<M>(), count = entries.len(), "enrolled static singleton");
   true
}

/// Number of registered identities.
pub fn len() -> usize {
   REGISTRY.lock().len()
}

/// Returns `true` if no identity has been registered yet.
pub fn is_empty() -> bool {
   REGISTRY.lock().is_empty()
}

/// Type names of the registered identities, in registration order.
pub fn names() -> Vec<&'static str> {
   REGISTRY.lock().iter().map(|entry| entry.name).collect()
}

/// Fires the teardown hook of every registered identity, most recently registered
/// first.
///
/// Identities stay registered, so a later [`Singleton::global`](crate::Singleton::global)
/// returns the torn-down manager and access to a destroyed instance fails with
/// [`Error::Destroyed`](crate::Error::Destroyed). Calling this twice is harmless.
///
/// # Safety
///
/// No thread may be accessing any registered singleton, or do so afterwards through
/// a reference obtained before this call, for every identity whose lifetime policy
/// releases its instance. Call it once, at the end of `main`.
pub unsafe fn shutdown() {
   // Snapshot so teardown hooks run without the registry lock held.
   let entries = REGISTRY.lock().clone();
   debug!(count = entries.len(), "shutting down singleton registry");
   for entry in entries.iter().rev() {
      // SAFETY: Forwarded from the caller.
      unsafe { entry.finalize.finalize() };
   }
}
