//! Variant registry and selection.
//!
//! This module provides the core dispatch primitives:
//!
//! - [`Variant`]: an implementation tagged with the capabilities it was written for
//! - [`Registry`]: the variants of one function plus the extra tags that participate
//! - [`Selected`]: the result of selection
//!
//! # Selection
//!
//! Given an observed feature set `F`:
//!
//! 1. The listed extras present in `F` form the extra part of the target.
//! 2. The highest base tier contained in `F` (scanning from the top) is the base part, or scalar.
//! 3. Among the variants whose tag [converts to](Caps::converts_to) that target, the one of maximal
//!    [priority](cpu_caps::priority) wins.
//!
//! Two winners with different tags are an error, never a coin toss:
//! declare the combined variant instead.
//!
//! # Validation
//!
//! [`Registry::checked`] runs selection for every base tier and every subset
//! of the listed extras. In a `const` item a contradictory registry is a
//! compile error:
//!
//! ```compile_fail
//! use cpu_dispatch::{Registry, Variant};
//! use cpu_dispatch::cpu_caps::caps::x86;
//!
//! fn scalar() {}
//! fn a() {}
//! fn b() {}
//!
//! // Avx|Popcnt and Avx|Lzcnt tie on a machine with both.
//! const REG: Registry<fn()> = Registry::with_extras(
//!   &[
//!     Variant::new("scalar", cpu_caps::Caps::SCALAR, scalar as fn()),
//!     Variant::new("avx+popcnt", x86::AVX.with(x86::POPCNT), a as fn()),
//!     Variant::new("avx+lzcnt", x86::AVX.with(x86::LZCNT), b as fn()),
//!   ],
//!   &[x86::POPCNT, x86::LZCNT],
//! )
//! .in_family(cpu_caps::Family::X86)
//! .checked();
//! # use cpu_dispatch::cpu_caps;
//! ```

use core::fmt;

use cpu_caps::{Caps, ConfigError, Family, priority::try_priority_in};

// ─────────────────────────────────────────────────────────────────────────────
// Core Types
// ─────────────────────────────────────────────────────────────────────────────

/// An implementation variant with capability requirements.
#[derive(Clone, Copy, Debug)]
pub struct Variant<F> {
  /// Human-readable name for diagnostics (e.g., "avx2").
  pub name: &'static str,
  /// Variant tag: at most one base tier plus extras.
  pub requires: Caps,
  /// The implementation.
  pub func: F,
}

impl<F> Variant<F> {
  /// Create a new variant.
  #[inline]
  #[must_use]
  pub const fn new(name: &'static str, requires: Caps, func: F) -> Self {
    Self { name, requires, func }
  }
}

/// The result of selection.
#[derive(Clone, Copy, Debug)]
pub struct Selected<F> {
  /// Name of the selected variant.
  pub name: &'static str,
  /// Tag of the selected variant.
  pub requires: Caps,
  /// The selected implementation.
  pub func: F,
}

impl<F: Copy> Selected<F> {
  #[inline]
  pub(crate) const fn of(variant: &Variant<F>) -> Self {
    Self {
      name: variant.name,
      requires: variant.requires,
      func: variant.func,
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// The variants of one dispatched function.
///
/// Only the listed extras take part in selection. A registry without extras
/// (see [`Registry::new`]) dispatches on base tiers alone.
pub struct Registry<F: 'static> {
  variants: &'static [Variant<F>],
  extras: Caps,
  family: Family,
}

impl<F: 'static> Clone for Registry<F> {
  #[inline]
  fn clone(&self) -> Self {
    *self
  }
}

impl<F: 'static> Copy for Registry<F> {}

impl<F: 'static> fmt::Debug for Registry<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names = self.variants.iter().map(|v| v.name);
    f.debug_struct("Registry")
      .field("variants", &DebugList(names))
      .field("extras", &self.extras)
      .field("family", &self.family)
      .finish()
  }
}

struct DebugList<I>(I);

impl<I: Iterator<Item = &'static str> + Clone> fmt::Debug for DebugList<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.0.clone()).finish()
  }
}

impl<F: 'static> Registry<F> {
  /// Registry dispatching on base tiers only.
  #[inline]
  #[must_use]
  pub const fn new(variants: &'static [Variant<F>]) -> Self {
    Self {
      variants,
      extras: Caps::SCALAR,
      family: Family::current(),
    }
  }

  /// Registry with an explicit list of participating extra tags.
  #[must_use]
  pub const fn with_extras(variants: &'static [Variant<F>], extras: &[Caps]) -> Self {
    let mut listed = Caps::SCALAR;
    let mut rest = extras;
    while let Some((extra, tail)) = rest.split_first() {
      listed = listed.union(*extra);
      rest = tail;
    }
    Self {
      variants,
      extras: listed,
      family: Family::current(),
    }
  }

  /// Interpret the tags against another family (tests, cross-target tables).
  #[inline]
  #[must_use]
  pub const fn in_family(self, family: Family) -> Self {
    Self {
      variants: self.variants,
      extras: self.extras,
      family,
    }
  }

  #[inline]
  #[must_use]
  pub const fn variants(&self) -> &'static [Variant<F>] {
    self.variants
  }

  /// Union of the listed extras.
  #[inline]
  #[must_use]
  pub const fn extras(&self) -> Caps {
    self.extras
  }

  #[inline]
  #[must_use]
  pub const fn family(&self) -> Family {
    self.family
  }

  /// The selection target for `features`: its highest base tier plus the
  /// listed extras it contains.
  #[inline]
  #[must_use]
  pub const fn target(&self, features: Caps) -> Caps {
    self.family.highest_tier_in(features).union(features.intersection(self.extras))
  }

  /// Index and variant chosen for `features`.
  ///
  /// # Errors
  ///
  /// - [`ConfigError::Ambiguous`] when two different tags share the highest priority.
  /// - [`ConfigError::MissingScalarFallback`] when no variant is safe.
  /// - A priority error for a malformed variant tag that would be a candidate.
  pub const fn pick(&self, features: Caps) -> Result<(usize, &'static Variant<F>), ConfigError> {
    let target = self.target(features);

    let mut best: Option<(usize, &'static Variant<F>, u32)> = None;
    let mut tie: Option<Caps> = None;

    let mut index = 0;
    let mut rest = self.variants;
    while let Some((variant, tail)) = rest.split_first() {
      if variant.requires.converts_to(target) {
        let priority = match try_priority_in(variant.requires, self.family) {
          Ok(p) => p,
          Err(err) => return Err(err),
        };
        match best {
          Some((_, current, top)) if priority == top => {
            if current.requires.bits() != variant.requires.bits() {
              tie = Some(variant.requires);
            }
          }
          Some((_, _, top)) if priority < top => {}
          _ => {
            best = Some((index, variant, priority));
            tie = None;
          }
        }
      }
      index += 1;
      rest = tail;
    }

    match (best, tie) {
      (Some((_, winner, _)), Some(other)) => Err(ConfigError::Ambiguous {
        first: winner.requires,
        second: other,
      }),
      (Some((index, winner, _)), None) => Ok((index, winner)),
      (None, _) => Err(ConfigError::MissingScalarFallback),
    }
  }

  /// Check the registry against every feature set it can observe.
  ///
  /// # Errors
  ///
  /// - [`ConfigError::BaseTagListedAsExtra`] for a base tier in the extra list.
  /// - [`ConfigError::ExtraTagOutOfBounds`] for extras the family doesn't define.
  /// - [`ConfigError::MultipleBaseTags`] for a variant with two base tiers.
  /// - [`ConfigError::UnlistedExtra`] for a variant that can never be selected.
  /// - [`ConfigError::DuplicateVariant`] for two variants with the same tag.
  /// - [`ConfigError::MissingScalarFallback`] without a scalar variant.
  /// - [`ConfigError::Ambiguous`] for a tie on some feature set.
  pub const fn validate(&self) -> Result<(), ConfigError> {
    if !self.extras.base().is_empty() {
      return Err(ConfigError::BaseTagListedAsExtra(self.extras.base()));
    }
    if let Err(err) = try_priority_in(self.extras, self.family) {
      return Err(err);
    }

    let mut has_scalar = false;
    let mut rest = self.variants;
    while let Some((variant, tail)) = rest.split_first() {
      let requires = variant.requires;
      if let Err(err) = try_priority_in(requires, self.family) {
        return Err(err);
      }
      if !requires.extras().is_subset_of(self.extras) {
        return Err(ConfigError::UnlistedExtra(requires));
      }

      let mut others = tail;
      while let Some((other, more)) = others.split_first() {
        if other.requires.bits() == requires.bits() {
          return Err(ConfigError::DuplicateVariant(requires));
        }
        others = more;
      }

      has_scalar |= requires.is_empty();
      rest = tail;
    }
    if !has_scalar {
      return Err(ConfigError::MissingScalarFallback);
    }

    // Every base tier (and scalar) times every subset of the listed extras.
    let mask = self.extras.bits();
    let mut tiers = self.family.base_tiers();
    let mut tier = Caps::SCALAR;
    loop {
      let below = self.family.ceiling(tier);
      let mut subset = mask;
      loop {
        if let Err(err) = self.pick(below.union(self.extras.masked(subset))) {
          return Err(err);
        }
        if subset == 0 {
          break;
        }
        subset = (subset - 1) & mask;
      }

      match tiers.split_first() {
        Some((next, tail)) => {
          tier = *next;
          tiers = tail;
        }
        None => break,
      }
    }

    Ok(())
  }

  /// [`validate`](Registry::validate) for `const` items.
  ///
  /// # Panics
  ///
  /// Panics with the [`ConfigError`] message. In a `const` item the program
  /// does not compile.
  #[must_use]
  pub const fn checked(self) -> Self {
    match self.validate() {
      Ok(()) => self,
      Err(err) => panic!("{}", err.message()),
    }
  }
}

impl<F: Copy + 'static> Registry<F> {
  /// Select the best variant for `features`.
  ///
  /// # Errors
  ///
  /// See [`pick`](Registry::pick).
  #[inline]
  pub const fn select(&self, features: Caps) -> Result<Selected<F>, ConfigError> {
    match self.pick(features) {
      Ok((_, variant)) => Ok(Selected::of(variant)),
      Err(err) => Err(err),
    }
  }

  /// Select the best variant for `features`.
  ///
  /// # Panics
  ///
  /// Panics if selection fails, which a [`checked`](Registry::checked)
  /// registry rules out.
  #[inline]
  #[must_use]
  pub const fn bind(&self, features: Caps) -> Selected<F> {
    match self.pick(features) {
      Ok((_, variant)) => Selected::of(variant),
      Err(err) => panic!("{}", err.message()),
    }
  }

  /// The implementation [`bind`](Registry::bind) selects.
  #[inline]
  #[must_use]
  pub const fn dispatch(&self, features: Caps) -> F {
    self.bind(features).func
  }

  /// The implementation matching the build configuration
  /// ([`cpu_caps::DEFAULT`]). No runtime work at all.
  #[inline]
  #[must_use]
  pub const fn bind_static(&self) -> F {
    self.dispatch(cpu_caps::DEFAULT)
  }

  /// Look up a variant by name.
  #[must_use]
  pub fn find(&self, name: &str) -> Option<(usize, Selected<F>)> {
    self
      .variants
      .iter()
      .enumerate()
      .find(|(_, v)| v.name == name)
      .map(|(index, v)| (index, Selected::of(v)))
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use cpu_caps::caps::{arm, x86};

  use super::*;

  type Kernel = fn(u32) -> u32;

  fn scalar(x: u32) -> u32 {
    x
  }
  fn sse2(x: u32) -> u32 {
    x + 2
  }
  fn avx(x: u32) -> u32 {
    x + 5
  }
  fn avx_popcnt(x: u32) -> u32 {
    x + 50
  }
  fn avx_lzcnt(x: u32) -> u32 {
    x + 51
  }
  fn avx_both(x: u32) -> u32 {
    x + 52
  }
  fn avx2_popcnt(x: u32) -> u32 {
    x + 60
  }

  const X86_FULL: Caps = Family::X86.ceiling(x86::AVX512F);

  fn features(top: Caps, extras: Caps) -> Caps {
    Family::X86.ceiling(top) | extras
  }

  #[test]
  fn test_variant_creation() {
    let v: Variant<Kernel> = Variant::new("scalar", Caps::SCALAR, scalar as Kernel);
    assert_eq!(v.name, "scalar");
    assert_eq!(v.requires, Caps::SCALAR);
    assert_eq!((v.func)(1), 1);
  }

  // Generic code over registries only needs `F: 'static` from the type itself.
  fn names_of<F>(registry: Registry<F>) -> usize {
    registry.variants().iter().filter(|v| !v.name.is_empty()).count()
  }

  #[test]
  fn test_registry_usable_generically() {
    const REG: Registry<Kernel> = Registry::new(&[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("sse2", x86::SSE2, sse2 as Kernel),
    ])
    .in_family(Family::X86);

    assert_eq!(names_of(REG), 2);
  }

  #[test]
  fn test_scalar_fallback_when_extra_missing() {
    const REG: Registry<Kernel> = Registry::with_extras(
      &[
        Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
        Variant::new("avx2+popcnt", x86::AVX2.with(x86::POPCNT), avx2_popcnt as Kernel),
      ],
      &[x86::POPCNT],
    )
    .in_family(Family::X86)
    .checked();

    let selected = REG.bind(features(x86::AVX2, Caps::SCALAR));
    assert_eq!(selected.name, "scalar");

    let selected = REG.bind(features(x86::AVX2, x86::POPCNT));
    assert_eq!(selected.name, "avx2+popcnt");
    assert_eq!((selected.func)(0), 60);
  }

  #[test]
  fn test_highest_tier_wins() {
    const REG: Registry<Kernel> = Registry::new(&[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("sse2", x86::SSE2, sse2 as Kernel),
      Variant::new("avx", x86::AVX, avx as Kernel),
    ])
    .in_family(Family::X86)
    .checked();

    assert_eq!(REG.bind(Caps::SCALAR).name, "scalar");
    assert_eq!(REG.bind(features(x86::SSE42, Caps::SCALAR)).name, "sse2");
    assert_eq!(REG.bind(X86_FULL).name, "avx");
    // Unlisted extras in the features are ignored.
    assert_eq!(REG.bind(features(x86::AVX, x86::POPCNT)).name, "avx");
  }

  #[test]
  fn test_more_extras_win_within_tier() {
    const REG: Registry<Kernel> = Registry::with_extras(
      &[
        Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
        Variant::new("avx", x86::AVX, avx as Kernel),
        Variant::new("avx+popcnt", x86::AVX.with(x86::POPCNT), avx_popcnt as Kernel),
        Variant::new("avx+lzcnt", x86::AVX.with(x86::LZCNT), avx_lzcnt as Kernel),
        Variant::new("avx+popcnt+lzcnt", x86::AVX.with(x86::POPCNT).with(x86::LZCNT), avx_both as Kernel),
      ],
      &[x86::POPCNT, x86::LZCNT],
    )
    .in_family(Family::X86)
    .checked();

    assert_eq!(REG.bind(features(x86::AVX2, Caps::SCALAR)).name, "avx");
    assert_eq!(REG.bind(features(x86::AVX2, x86::LZCNT)).name, "avx+lzcnt");
    assert_eq!(REG.bind(features(x86::AVX, x86::POPCNT | x86::LZCNT)).name, "avx+popcnt+lzcnt");
    assert_eq!(REG.bind(features(x86::SSE42, x86::POPCNT | x86::LZCNT)).name, "scalar");
  }

  #[test]
  fn test_ambiguity_without_combined_variant() {
    const VARIANTS: &[Variant<Kernel>] = &[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("avx+popcnt", x86::AVX.with(x86::POPCNT), avx_popcnt as Kernel),
      Variant::new("avx+lzcnt", x86::AVX.with(x86::LZCNT), avx_lzcnt as Kernel),
    ];
    let reg = Registry::with_extras(VARIANTS, &[x86::POPCNT, x86::LZCNT]).in_family(Family::X86);

    let err = reg.select(features(x86::AVX, x86::POPCNT | x86::LZCNT)).unwrap_err();
    assert_eq!(
      err,
      ConfigError::Ambiguous {
        first: x86::AVX | x86::POPCNT,
        second: x86::AVX | x86::LZCNT,
      }
    );
    assert!(matches!(reg.validate(), Err(ConfigError::Ambiguous { .. })));

    // Either extra alone is unambiguous.
    assert_eq!(reg.select(features(x86::AVX, x86::POPCNT)).unwrap().name, "avx+popcnt");
  }

  #[test]
  #[should_panic(expected = "ambiguous dispatch")]
  fn test_bind_panics_on_ambiguity() {
    const VARIANTS: &[Variant<Kernel>] = &[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("avx+popcnt", x86::AVX.with(x86::POPCNT), avx_popcnt as Kernel),
      Variant::new("avx+lzcnt", x86::AVX.with(x86::LZCNT), avx_lzcnt as Kernel),
    ];
    let reg = Registry::with_extras(VARIANTS, &[x86::POPCNT, x86::LZCNT]).in_family(Family::X86);
    let _ = reg.bind(X86_FULL);
  }

  #[test]
  fn test_validate_errors() {
    fn validate(variants: &'static [Variant<Kernel>], extras: &[Caps]) -> Result<(), ConfigError> {
      Registry::with_extras(variants, extras).in_family(Family::X86).validate()
    }

    const NO_SCALAR: &[Variant<Kernel>] = &[Variant::new("avx", x86::AVX, avx as Kernel)];
    const ONLY_SCALAR: &[Variant<Kernel>] = &[Variant::new("scalar", Caps::SCALAR, scalar as Kernel)];
    const TWO_BASES: &[Variant<Kernel>] = &[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("bad", x86::AVX.union(x86::SSE2), avx as Kernel),
    ];
    const UNLISTED: &[Variant<Kernel>] = &[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("avx+popcnt", x86::AVX.with(x86::POPCNT), avx_popcnt as Kernel),
    ];
    const DUPLICATE: &[Variant<Kernel>] = &[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("avx", x86::AVX, avx as Kernel),
      Variant::new("avx-again", x86::AVX, avx as Kernel),
    ];

    assert_eq!(validate(NO_SCALAR, &[]), Err(ConfigError::MissingScalarFallback));
    assert_eq!(
      validate(ONLY_SCALAR, &[x86::AVX]),
      Err(ConfigError::BaseTagListedAsExtra(x86::AVX))
    );
    assert_eq!(
      validate(TWO_BASES, &[]),
      Err(ConfigError::MultipleBaseTags(x86::AVX | x86::SSE2))
    );
    assert_eq!(
      validate(UNLISTED, &[]),
      Err(ConfigError::UnlistedExtra(x86::AVX | x86::POPCNT))
    );
    assert_eq!(validate(UNLISTED, &[x86::POPCNT]), Ok(()));
    assert_eq!(validate(DUPLICATE, &[]), Err(ConfigError::DuplicateVariant(x86::AVX)));
    assert_eq!(validate(ONLY_SCALAR, &[]), Ok(()));
  }

  #[test]
  fn test_arm_family() {
    const REG: Registry<Kernel> = Registry::new(&[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("neon", arm::NEON, sse2 as Kernel),
      Variant::new("neon-fp16", arm::NEON_FP16, avx as Kernel),
    ])
    .in_family(Family::Arm)
    .checked();

    assert_eq!(REG.bind(Caps::SCALAR).name, "scalar");
    assert_eq!(REG.bind(arm::NEON | arm::NEON_FMA).name, "neon");
    assert_eq!(REG.bind(Family::Arm.all()).name, "neon-fp16");

    let extras = Registry::with_extras(REG.variants(), &[x86::POPCNT]).in_family(Family::Arm);
    assert_eq!(extras.validate(), Err(ConfigError::ExtraTagOutOfBounds(x86::POPCNT)));
  }

  #[test]
  fn test_bind_static_matches_default() {
    const REG: Registry<Kernel> = Registry::new(&[Variant::new("scalar", Caps::SCALAR, scalar as Kernel)]).checked();
    const F: Kernel = REG.bind_static();
    assert_eq!(F(7), 7);
  }

  #[test]
  fn test_find() {
    const REG: Registry<Kernel> = Registry::new(&[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("sse2", x86::SSE2, sse2 as Kernel),
    ]);
    let (index, selected) = REG.find("sse2").unwrap();
    assert_eq!(index, 1);
    assert_eq!((selected.func)(0), 2);
    assert!(REG.find("avx").is_none());
  }

  #[test]
  fn test_debug_lists_names() {
    extern crate std;
    use std::format;

    const REG: Registry<Kernel> = Registry::new(&[
      Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
      Variant::new("sse2", x86::SSE2, sse2 as Kernel),
    ]);
    let rendered = format!("{REG:?}");
    assert!(rendered.contains(r#"["scalar", "sse2"]"#), "{rendered}");
  }
}
