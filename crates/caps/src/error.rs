//! Error types.
//!
//! Runtime detection never fails; these cover contradictory declarations,
//! late overrides and malformed tag lists.

use thiserror::Error;

use crate::caps::Caps;

/// A contradictory or incomplete set of capability declarations.
///
/// All variants are configuration mistakes the implementer must fix. When the
/// failing check runs in a `const` item the program does not compile; the
/// panic text is [`message()`](ConfigError::message).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
  /// A combination carries more than one base tier.
  #[error("more than one base tag used: {0}")]
  MultipleBaseTags(Caps),

  /// More extra tags than the family defines.
  #[error("extra tag out of bounds: {0}")]
  ExtraTagOutOfBounds(Caps),

  /// Some reachable feature set has no safe variant.
  #[error("missing scalar fallback")]
  MissingScalarFallback,

  /// Two variants share the maximal priority with different tags.
  #[error("ambiguous dispatch between {first} and {second}, add a combined variant")]
  Ambiguous { first: Caps, second: Caps },

  /// Two variants are declared for the same tags.
  #[error("duplicate variant for {0}")]
  DuplicateVariant(Caps),

  /// A base tier appears in the extra tag list.
  #[error("only extra instruction set tags should be explicitly listed: {0}")]
  BaseTagListedAsExtra(Caps),

  /// A variant requires an extra tag that is not listed, so it is never selected.
  #[error("variant uses extra tags that are not listed: {0}")]
  UnlistedExtra(Caps),
}

impl ConfigError {
  /// Static message, usable from `const fn` panics.
  #[must_use]
  pub const fn message(&self) -> &'static str {
    match self {
      Self::MultipleBaseTags(_) => "more than one base tag used",
      Self::ExtraTagOutOfBounds(_) => "extra tag out of bounds",
      Self::MissingScalarFallback => "missing scalar fallback",
      Self::Ambiguous { .. } => "ambiguous dispatch: two variants share the highest priority, add a combined variant",
      Self::DuplicateVariant(_) => "duplicate variant",
      Self::BaseTagListedAsExtra(_) => "only extra instruction set tags should be explicitly listed",
      Self::UnlistedExtra(_) => "variant uses extra tags that are not listed",
    }
  }
}

/// Rejected detection override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum OverrideError {
  /// Detection already ran and its result is cached.
  #[error("detection already initialized")]
  AlreadyInitialized,
  /// This build cannot store an override.
  #[error("overrides are not supported on this target")]
  Unsupported,
}

/// A tag list that does not parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ParseCapsError {
  /// Token at byte offset `at` names no tag of the family.
  #[error("unknown capability tag at byte {at}")]
  UnknownTag { at: usize },
}
