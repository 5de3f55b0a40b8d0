//! The singleton accessor and its construction capability.

use core::fmt;
use core::marker::PhantomData;

use crate::error::Result;
use crate::slot::Slot;

/// Permission to construct one `T`.
///
/// Only this crate can create a `Construct<T>`, and it creates exactly one,
/// when the singleton for `T` is first accessed. A client type that takes the
/// token by value in its constructor cannot be built anywhere else.
///
/// ```compile_fail
/// use singleton_once::Construct;
///
/// struct Config;
/// let token: Construct<Config> = Construct { _target: std::marker::PhantomData };
/// ```
pub struct Construct<T> {
   _target: PhantomData<fn() -> T>,
}

impl<T> Construct<T> {
   #[inline]
   pub(crate) const fn new() -> Self {
      Self { _target: PhantomData }
   }
}

impl<T> fmt::Debug for Construct<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "Construct<{}>", core::any::type_name::<T>())
   }
}

/// A type with exactly one, lazily constructed, process-wide instance.
///
/// Implement it with the [`singleton!`](crate::singleton) macro, which
/// provides a dedicated `static` slot for the type:
///
/// ```rust
/// use singleton_once::{singleton, Construct, Singleton};
///
/// struct Counter {
///    start: u64,
/// }
///
/// impl Counter {
///    fn new(_: Construct<Self>) -> Self {
///       Counter { start: 10 }
///    }
/// }
///
/// singleton!(Counter => Counter::new);
///
/// let a = Counter::instance();
/// let b = Counter::instance();
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(a.start, 10);
/// ```
///
/// `T: Sync` is required because every thread shares the same instance; the
/// accessor guarantees safe construction only, so interior mutability must
/// bring its own synchronization.
pub trait Singleton: Sized + Send + Sync + 'static {
   /// The storage owning the instance. Must return the same `static` on every
   /// call.
   fn slot() -> &'static Slot<Self>;

   /// Builds the instance. Called at most once per successful construction.
   fn construct(token: Construct<Self>) -> Self;

   /// Returns the instance, constructing it on first access.
   ///
   /// Concurrent first callers block until the constructor returns. A
   /// panicking constructor propagates to the caller that ran it and the next
   /// access retries. Calling `instance` for the same type from inside its own
   /// constructor deadlocks.
   ///
   /// # Panics
   ///
   /// Panics if the singleton was destroyed by [`Teardown`](crate::Teardown).
   #[inline]
   fn instance() -> &'static Self {
      match Self::try_instance() {
         Ok(instance) => instance,
         Err(err) => panic!("{err}"),
      }
   }

   /// Like [`instance`](Self::instance), but reports access after teardown as
   /// an error.
   #[inline]
   fn try_instance() -> Result<&'static Self> {
      Self::slot().get_or_init(|| Self::construct(Construct::new()))
   }

   /// Checks whether the instance exists, without constructing it.
   #[inline]
   fn is_constructed() -> bool {
      Self::slot().is_initialized()
   }
}

/// Implements [`Singleton`] for a type, given the path of a constructor
/// taking a [`Construct`] token.
///
/// ```rust
/// use singleton_once::{singleton, Construct, Singleton};
///
/// mod config {
///    use singleton_once::Construct;
///
///    pub struct Config {
///       pub name: &'static str,
///    }
///
///    impl Config {
///       pub fn load(_: Construct<Self>) -> Self {
///          Config { name: "prod" }
///       }
///    }
/// }
///
/// singleton!(config::Config => config::Config::load);
///
/// assert_eq!(config::Config::instance().name, "prod");
/// ```
///
/// The type must not implement `Clone` (and therefore `Copy`): a clone of the
/// instance would be a second live object.
///
/// ```compile_fail
/// use singleton_once::{singleton, Construct, Singleton};
///
/// #[derive(Clone)]
/// struct Dup;
///
/// impl Dup {
///    fn new(_: Construct<Self>) -> Self {
///       Dup
///    }
/// }
///
/// singleton!(Dup => Dup::new);
///
/// let copy = Dup::instance().clone();
/// ```
#[macro_export]
macro_rules! singleton {
   ($ty:ty => $constructor:path) => {
      impl $crate::Singleton for $ty {
         fn slot() -> &'static $crate::Slot<Self> {
            static SLOT: $crate::Slot<$ty> = $crate::Slot::new();
            &SLOT
         }

         fn construct(token: $crate::Construct<Self>) -> Self {
            $constructor(token)
         }
      }

      // Resolves only if `$ty` has a single candidate impl, i.e. is not `Clone`.
      const _: fn() = || {
         trait AmbiguousIfClone<A> {
            fn some_item() {}
         }
         impl<T: ?Sized> AmbiguousIfClone<()> for T {}
         struct IsClone;
         impl<T: ?Sized + Clone> AmbiguousIfClone<IsClone> for T {}
         let _ = <$ty as AmbiguousIfClone<_>>::some_item;
      };
   };
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicUsize, Ordering};

   use super::*;

   static BUILT: AtomicUsize = AtomicUsize::new(0);

   struct Probe(u8);

   impl Probe {
      fn new(_: Construct<Self>) -> Self {
         BUILT.fetch_add(1, Ordering::SeqCst);
         Probe(3)
      }
   }

   crate::singleton!(Probe => Probe::new);

   #[test]
   fn instance_is_built_once() {
      let a = Probe::instance();
      let b = Probe::instance();
      assert!(core::ptr::eq(a, b));
      assert_eq!(a.0, 3);
      assert!(Probe::is_constructed());
      assert_eq!(BUILT.load(Ordering::SeqCst), 1);
   }

   #[test]
   fn token_debug_names_target() {
      let token = Construct::<Probe>::new();
      assert!(format!("{token:?}").ends_with("Probe>"));
   }
}
