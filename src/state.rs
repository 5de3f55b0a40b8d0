//! Lifecycle state of a singleton slot.
//!
//! The state is packed into a single `AtomicU8`:
//! - Bit 0: DONE - the instance is constructed
//! - Bit 1: LOCKED - a thread is running the constructor
//! - Bit 2: WAITING - at least one thread is parked on the state
//! - Bit 3: DESTROYED - the instance was torn down, terminal
//! - Bits 4-7: EPOCH - generation counter, bumped on every DONE/reset transition
//!
//! Readers of a constructed slot only perform an `Acquire` load. Threads that
//! arrive while construction is in flight park on the address of the state
//! through `parking_lot_core` and are woken when the constructor commits or
//! unwinds.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic lifecycle word of a [`Slot`](crate::Slot).
#[repr(transparent)]
pub(crate) struct SlotState(AtomicU8);

impl SlotState {
   const DONE: u8 = 1;
   const LOCKED: u8 = 2;
   const WAITING: u8 = 4;
   const DESTROYED: u8 = 8;
   const EPOCH_1: u8 = 16;
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING | Self::DESTROYED);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates the state of a slot that was never accessed.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline]
   fn key(&self) -> usize {
      self as *const Self as usize
   }

   /// Wakes every thread parked on this state.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: park and unpark use the same key, the address of this state.
      unsafe {
         parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread while the state still equals `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: see `notify_all`. The validation closure runs under the
      // bucket lock, so a concurrent commit cannot slip between check and sleep.
      unsafe {
         let _ = parking_lot_core::park(
            self.key(),
            || self.0.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Marks the slot constructed and wakes waiters.
   ///
   /// Returns `true` if the slot was not constructed before.
   #[inline]
   pub(crate) fn set_done(&self) -> bool {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::DONE | Self::next_epoch(current_state);

      // Release: the write of the instance happens-before any Acquire load
      // that observes DONE.
      let prev_state = self.0.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
      prev_state & Self::DONE == 0
   }

   /// Returns the slot to its never-constructed state and wakes waiters so one
   /// of them can retry construction.
   #[inline]
   pub(crate) fn set_uninit(&self) {
      let current_state = self.0.load(Ordering::Relaxed);
      let prev_state = self.0.swap(Self::next_epoch(current_state), Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Moves a constructed slot to DESTROYED.
   ///
   /// Returns `false` if the slot was not constructed, in which case nothing
   /// changes.
   pub(crate) fn set_destroyed(&self) -> bool {
      let mut current_state = self.0.load(Ordering::Relaxed);
      loop {
         if current_state & Self::DONE == 0 {
            return false;
         }
         let new_state = Self::DESTROYED | Self::next_epoch(current_state);
         match self.0.compare_exchange_weak(
            current_state,
            new_state,
            Ordering::AcqRel,
            Ordering::Relaxed,
         ) {
            Ok(_) => return true,
            Err(actual) => current_state = actual,
         }
      }
   }

   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DONE != 0
   }

   #[inline]
   pub(crate) fn is_destroyed(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DESTROYED != 0
   }

   /// One attempt at taking the construction lock.
   ///
   /// - `Ok(None)`: the slot is constructed or destroyed, nothing to do.
   /// - `Ok(Some(guard))`: the caller now owns construction.
   /// - `Err(state)`: another thread holds the lock; WAITING is set in `state`.
   fn lock_step(&self) -> Result<Option<SlotGuard<'_>>, u8> {
      loop {
         let current_state = self.0.load(Ordering::Acquire);
         if current_state & (Self::DONE | Self::DESTROYED) != 0 {
            return Ok(None);
         }

         if current_state & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(SlotGuard::new(self))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current_state);
      }
   }

   /// Takes the construction lock, parking while another thread holds it.
   ///
   /// Returns `None` once the slot is constructed or destroyed.
   pub(crate) fn lock(&self) -> Option<SlotGuard<'_>> {
      let mut observed = match self.lock_step() {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step() {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }
}

/// Ownership of an in-flight construction.
///
/// Dropping the guard without [`commit`](Self::commit), which is what happens
/// when the constructor panics, resets the slot so the next caller retries.
pub(crate) struct SlotGuard<'a> {
   state: &'a SlotState,
}

impl<'a> SlotGuard<'a> {
   #[inline(always)]
   const fn new(state: &'a SlotState) -> Self {
      Self { state }
   }

   /// Publishes the constructed instance and wakes waiters.
   #[inline(always)]
   pub(crate) fn commit(self) -> bool {
      let success = self.state.set_done();
      mem::forget(self);
      success
   }
}

impl Drop for SlotGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_uninit();
   }
}
