//! Errors surfaced by singleton accessors.

use thiserror::Error;

/// Failure to hand out a singleton instance.
///
/// A panicking constructor is not represented here: the panic propagates to
/// the caller that triggered construction and the slot is left ready for a
/// retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SingletonError {
   /// The instance was destroyed by [`Teardown`](crate::Teardown) and will
   /// not be constructed again.
   #[error("singleton `{type_name}` accessed after teardown")]
   TornDown {
      /// Type name of the singleton.
      type_name: &'static str,
   },
}

/// Shorthand `Result` type used by the accessors.
pub type Result<T, E = SingletonError> = std::result::Result<T, E>;
