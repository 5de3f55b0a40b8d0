//! Ordered destruction of singletons at the end of the program.
//!
//! Rust never runs destructors of `static` items. Every slot that finishes
//! construction is therefore recorded here, and a [`Teardown`] guard held by
//! `main` drops the recorded instances in reverse order of construction.
//! A singleton whose constructor touches another singleton is recorded after
//! it, and so is destroyed before it.

use core::any::Any;
use core::marker::PhantomData;
use core::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::event::{self, SingletonEvent};

/// A slot that can drop its instance in place.
pub(crate) trait Destroy: Sync {
   fn type_name(&self) -> &'static str;

   /// Moves the slot to DESTROYED and drops its instance, returning the
   /// address it occupied. Returns `None` if there was nothing to drop.
   ///
   /// # Safety
   ///
   /// No reference to the instance may be alive or created concurrently.
   unsafe fn destroy(&self) -> Option<usize>;
}

static CONSTRUCTED: Mutex<Vec<&'static dyn Destroy>> = Mutex::new(Vec::new());

pub(crate) fn register(slot: &'static dyn Destroy) {
   CONSTRUCTED.lock().unwrap_or_else(PoisonError::into_inner).push(slot);
}

/// Number of constructed singletons still awaiting teardown.
pub fn pending_teardown() -> usize {
   CONSTRUCTED.lock().unwrap_or_else(PoisonError::into_inner).len()
}

/// Guard that destroys every constructed singleton when dropped.
///
/// Create it at the top of `main` and keep it alive until the program's
/// ordinary logic has finished:
///
/// ```rust
/// use singleton_once::{singleton, Construct, Singleton, Teardown};
///
/// struct Registry;
///
/// impl Registry {
///    fn new(_: Construct<Self>) -> Self {
///       Registry
///    }
/// }
///
/// singleton!(Registry => Registry::new);
///
/// // SAFETY: nothing touches a singleton after `teardown` is dropped.
/// let teardown = unsafe { Teardown::install() };
/// let _ = Registry::instance();
/// assert_eq!(teardown.run(), 1);
/// assert!(Registry::try_instance().is_err());
/// ```
///
/// The guard is `!Send`: it is meant to be owned by the main thread.
#[must_use = "singletons are destroyed when the guard is dropped"]
pub struct Teardown {
   _main_thread: PhantomData<*const ()>,
}

impl Teardown {
   /// Creates the teardown guard.
   ///
   /// # Safety
   ///
   /// When the guard is dropped (or [`run`](Self::run)), no other thread may
   /// still hold or acquire a reference to any singleton, and the current
   /// thread may not hold one either. In practice: join every thread that uses
   /// singletons before the guard goes out of scope.
   #[inline]
   pub unsafe fn install() -> Self {
      Self { _main_thread: PhantomData }
   }

   /// Destroys every constructed singleton now and returns how many were
   /// dropped.
   ///
   /// # Panics
   ///
   /// A panicking destructor does not stop teardown: the remaining singletons
   /// are still destroyed, then the first panic is resumed.
   pub fn run(self) -> usize {
      mem::forget(self);
      match destroy_all() {
         Ok(destroyed) => destroyed,
         Err(payload) => panic::resume_unwind(payload),
      }
   }
}

impl Drop for Teardown {
   fn drop(&mut self) {
      if let Err(payload) = destroy_all() {
         if !thread::panicking() {
            panic::resume_unwind(payload);
         }
      }
   }
}

/// Pops one slot at a time so that destructors may construct other
/// singletons; those are destroyed in the same pass.
///
/// Returns the number of instances dropped, or the payload of the first
/// destructor that panicked.
fn destroy_all() -> Result<usize, Box<dyn Any + Send>> {
   let mut destroyed = 0;
   let mut first_panic = None;
   loop {
      let next = CONSTRUCTED.lock().unwrap_or_else(PoisonError::into_inner).pop();
      let Some(slot) = next else {
         break;
      };
      // SAFETY: upheld by the caller of `Teardown::install`.
      match panic::catch_unwind(AssertUnwindSafe(|| unsafe { slot.destroy() })) {
         Ok(Some(address)) => {
            destroyed += 1;
            event::emit(&SingletonEvent::Destroyed { type_name: slot.type_name(), address });
         }
         Ok(None) => {}
         Err(payload) => {
            first_panic.get_or_insert(payload);
         }
      }
   }
   match first_panic {
      Some(payload) => Err(payload),
      None => Ok(destroyed),
   }
}
