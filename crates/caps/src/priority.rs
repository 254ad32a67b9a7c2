//! Priority ranking of variant tags.
//!
//! A higher base tier always outranks any number of extras; among equal base
//! tiers, more extras outrank fewer:
//!
//! ```text
//! priority = base_rank * (extra_tag_count + 1) + extra_rank
//! ```
//!
//! `base_rank` is 0 for scalar and the 1-based bit position of the base tier
//! otherwise. `extra_rank` is the number of extras, which never exceeds the
//! family's `extra_tag_count`, so it can't reach the next base rank.
//!
//! Two different tags of equal priority are a genuine ambiguity (`Avx|Popcnt`
//! vs `Avx|Lzcnt`); [`compare_in`] reports it instead of picking one.

use core::cmp::Ordering;

use crate::{
  caps::{Caps, EXTRA_OFFSET, Family},
  error::ConfigError,
};

/// 1-based index of the most significant set bit, 0 for 0.
#[inline]
#[must_use]
pub const fn bit_index(value: u32) -> u32 {
  if value == 0 { 0 } else { 32 - value.leading_zeros() }
}

/// Priority of a variant tag interpreted against `family`.
///
/// # Errors
///
/// - [`ConfigError::MultipleBaseTags`] when more than one base tier is set.
/// - [`ConfigError::ExtraTagOutOfBounds`] when an extra bit lies beyond the
///   family's extra tags.
pub const fn try_priority_in(caps: Caps, family: Family) -> Result<u32, ConfigError> {
  if caps.base_count() > 1 {
    return Err(ConfigError::MultipleBaseTags(caps));
  }

  let extra_count = family.extra_tag_count();
  let extra = caps.extras().bits() >> EXTRA_OFFSET;
  if extra_count < 32 && (extra >> extra_count) != 0 {
    return Err(ConfigError::ExtraTagOutOfBounds(caps));
  }

  let base_rank = bit_index(caps.base().bits());
  Ok(base_rank * (extra_count + 1) + extra.count_ones())
}

/// Priority for the current target's family.
#[inline]
pub const fn try_priority(caps: Caps) -> Result<u32, ConfigError> {
  try_priority_in(caps, Family::current())
}

/// Priority for the current target's family, for `const` contexts.
///
/// # Panics
///
/// Panics with the [`ConfigError`] message on an invalid tag. In a `const`
/// item this is a compile error.
#[must_use]
pub const fn priority(caps: Caps) -> u32 {
  match try_priority(caps) {
    Ok(p) => p,
    Err(err) => panic!("{}", err.message()),
  }
}

/// Rank two variant tags.
///
/// # Errors
///
/// [`ConfigError::Ambiguous`] when the priorities tie but the tags differ, or
/// the error of either priority computation.
pub const fn compare_in(a: Caps, b: Caps, family: Family) -> Result<Ordering, ConfigError> {
  let pa = match try_priority_in(a, family) {
    Ok(p) => p,
    Err(err) => return Err(err),
  };
  let pb = match try_priority_in(b, family) {
    Ok(p) => p,
    Err(err) => return Err(err),
  };

  if pa > pb {
    Ok(Ordering::Greater)
  } else if pa < pb {
    Ok(Ordering::Less)
  } else if a.bits() == b.bits() {
    Ok(Ordering::Equal)
  } else {
    Err(ConfigError::Ambiguous { first: a, second: b })
  }
}

/// [`compare_in`] for the current target's family.
#[inline]
pub const fn compare(a: Caps, b: Caps) -> Result<Ordering, ConfigError> {
  compare_in(a, b, Family::current())
}
