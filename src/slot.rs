//! Statically-scoped storage for one singleton instance.
//!
//! A [`Slot<T>`] lives in a `static` and owns the single instance of `T`. It
//! can be read by anyone, but only the crate can fill it: construction goes
//! through [`Singleton::instance`](crate::Singleton::instance), which hands the
//! client type its [`Construct`](crate::Construct) token.

use core::any::type_name;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;
use core::sync::atomic::Ordering;

use crate::error::{Result, SingletonError};
use crate::event::{self, SingletonEvent};
use crate::state::{SlotGuard, SlotState};
use crate::teardown::{self, Destroy};

/// Storage cell backing one singleton type.
///
/// `Slot` implements neither `Clone` nor `Copy`, so the instance it owns can
/// never be duplicated through it.
pub struct Slot<T> {
   value: UnsafeCell<MaybeUninit<T>>,
   state: SlotState,
}

impl<T> Slot<T> {
   /// Creates an empty slot. Intended for `static` items.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: UnsafeCell::new(MaybeUninit::uninit()),
         state: SlotState::new(),
      }
   }

   /// Checks whether the instance has been constructed and not torn down.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Checks whether the instance was destroyed by teardown.
   #[inline]
   pub fn is_destroyed(&self) -> bool {
      self.state.is_destroyed(Ordering::Acquire)
   }

   /// Returns the instance if it is constructed.
   ///
   /// Returns `None` while uninitialized, while construction is in flight and
   /// after teardown. This method never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_initialized() {
         // SAFETY: DONE was observed with Acquire, so the write is visible.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// # Safety
   ///
   /// The slot must be initialized.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized(), "get_unchecked called on an empty slot");
      (*self.value.get()).assume_init_ref()
   }
}

impl<T: Send + Sync + 'static> Slot<T> {
   /// Returns the instance, running `f` to construct it on first access.
   ///
   /// Concurrent first callers park until the winner commits. If `f`
   /// panics the slot is reset and one of the parked callers retries.
   pub(crate) fn get_or_init<F>(&'static self, f: F) -> Result<&'static T>
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.initialize(f);
      match self.get() {
         Some(value) => Ok(value),
         None => Err(SingletonError::TornDown { type_name: type_name::<T>() }),
      }
   }

   #[cold]
   fn initialize<F>(&'static self, f: F)
   where
      F: FnOnce() -> T,
   {
      let Some(guard) = self.state.lock() else {
         return;
      };

      let construction = Construction { guard: Some(guard), type_name: type_name::<T>() };
      let value = f();

      // SAFETY: the guard grants exclusive access to the uninitialized value.
      let address = unsafe { (*self.value.get()).write(value) as *mut T as usize };
      construction.commit();

      teardown::register(self);
      event::emit(&SingletonEvent::Constructed { type_name: type_name::<T>(), address });
   }
}

impl<T: Send + Sync> Destroy for Slot<T> {
   fn type_name(&self) -> &'static str {
      type_name::<T>()
   }

   unsafe fn destroy(&self) -> Option<usize> {
      if !self.state.set_destroyed() {
         return None;
      }
      let slot = &mut *self.value.get();
      let address = slot.as_mut_ptr() as usize;
      slot.assume_init_drop();
      Some(address)
   }
}

/// An in-flight construction.
///
/// If the constructor unwinds, the slot is reset before
/// `ConstructionAborted` is reported, so the trace callback may retry.
struct Construction<'a> {
   guard: Option<SlotGuard<'a>>,
   type_name: &'static str,
}

impl Construction<'_> {
   fn commit(mut self) {
      if let Some(guard) = self.guard.take() {
         guard.commit();
      }
   }
}

impl Drop for Construction<'_> {
   fn drop(&mut self) {
      if let Some(guard) = self.guard.take() {
         drop(guard);
         event::emit(&SingletonEvent::ConstructionAborted { type_name: self.type_name });
      }
   }
}

// SAFETY: the instance is shared by reference between threads (`T: Sync`) and
// may be constructed on one thread and dropped on another (`T: Send`).
unsafe impl<T: Send + Sync> Sync for Slot<T> {}
// SAFETY: moving the slot moves ownership of `T`.
unsafe impl<T: Send> Send for Slot<T> {}

impl<T> Default for Slot<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Slot");
      match self.get() {
         Some(v) => d.field(v),
         None if self.is_destroyed() => d.field(&format_args!("<destroyed>")),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T> Drop for Slot<T> {
   fn drop(&mut self) {
      if self.is_initialized() {
         // SAFETY: exclusive access, the value is initialized and not yet dropped.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
