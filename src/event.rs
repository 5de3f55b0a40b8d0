//! Lifecycle events and the process-wide trace callback.
//!
//! A callback installed with [`set_trace_callback`] observes every
//! construction, aborted construction and teardown of every singleton. It is
//! invoked outside of any internal lock, so it may itself access singletons.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Callback receiving lifecycle events.
pub type TraceCallback = Arc<dyn Fn(&SingletonEvent) + Send + Sync>;

static TRACE: Mutex<Option<TraceCallback>> = Mutex::new(None);

/// Events emitted over the lifetime of a singleton.
///
/// `address` is the storage address of the instance, identical to what
/// `T::instance() as *const T` yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingletonEvent {
   /// The instance was constructed and published.
   Constructed {
      /// Type name of the singleton.
      type_name: &'static str,
      /// Address of the instance.
      address: usize,
   },

   /// The constructor panicked; the slot is ready for another attempt.
   ConstructionAborted {
      /// Type name of the singleton.
      type_name: &'static str,
   },

   /// The instance was dropped during teardown.
   Destroyed {
      /// Type name of the singleton.
      type_name: &'static str,
      /// Address the instance occupied.
      address: usize,
   },
}

impl fmt::Display for SingletonEvent {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         SingletonEvent::Constructed { type_name, address } => {
            write!(f, "{type_name} constructor called: {address:#x}")
         }
         SingletonEvent::ConstructionAborted { type_name } => {
            write!(f, "{type_name} constructor aborted")
         }
         SingletonEvent::Destroyed { type_name, address } => {
            write!(f, "{type_name} destructor called: {address:#x}")
         }
      }
   }
}

/// Installs `callback`, replacing any previous one.
pub fn set_trace_callback(callback: impl Fn(&SingletonEvent) + Send + Sync + 'static) {
   *TRACE.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
}

/// Removes the installed callback, if any.
pub fn clear_trace_callback() {
   *TRACE.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

pub(crate) fn emit(event: &SingletonEvent) {
   let callback = TRACE.lock().unwrap_or_else(PoisonError::into_inner).clone();
   if let Some(callback) = callback {
      callback(event);
   }
}
