//! Capability tags and tag combinations.
//!
//! This module answers the question: "What does this implementation variant
//! require, and is that at least as much as that one?"
//!
//! # Design
//!
//! [`Caps`] is a 32-bit mask. The low half holds *base* tags, which form one
//! linear hierarchy per architecture [`Family`]:
//!
//! ```text
//! x86:  Scalar < Sse2 < Sse3 < Ssse3 < Sse41 < Sse42 < Avx < Avx2 < Avx512f
//! ARM:  Scalar < Neon < NeonFma < NeonFp16
//! Wasm: Scalar < Simd128
//! ```
//!
//! The high half holds *extra* tags (`Popcnt`, `Lzcnt`, `AvxF16c`, `AvxFma` on
//! x86), which are neither implied by nor imply any base tier.
//!
//! A *variant tag* carries at most one base bit. A *feature set* describing a
//! machine ([`compiled_features`](crate::compiled_features),
//! [`runtime_features`](crate::runtime_features)) carries every tier it
//! supports, so `features.has(x86::AVX2)` reads naturally.
//!
//! # Usage
//!
//! ```
//! use cpu_caps::caps::{Caps, x86};
//!
//! const AVX2_POPCNT: Caps = x86::AVX2.with(x86::POPCNT);
//!
//! assert!(x86::SSE42.converts_to(AVX2_POPCNT));
//! assert!(!AVX2_POPCNT.converts_to(x86::AVX512F));
//! ```

use core::{fmt, str::FromStr};

use crate::error::{ConfigError, ParseCapsError};

// ─────────────────────────────────────────────────────────────────────────────
// Bit Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Mask of the base tag range (bits 0-15).
pub const BASE_MASK: u32 = (1 << EXTRA_OFFSET) - 1;

/// First bit of the extra tag range.
pub const EXTRA_OFFSET: u32 = 16;

/// Mask of the extra tag range (bits 16-31).
pub const EXTRA_MASK: u32 = !BASE_MASK;

// ─────────────────────────────────────────────────────────────────────────────
// Core Capability Type
// ─────────────────────────────────────────────────────────────────────────────

/// A combination of capability tags.
///
/// `Caps` is `Copy` and all operations are `const`. The operator impls
/// (`|`, `&`, `^`, `!`) are raw bitwise operations; use [`with()`](Caps::with)
/// to compose variant tags with the "at most one base tier" check.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Caps(pub(crate) u32);

impl Caps {
  /// No accelerated capability.
  pub const SCALAR: Self = Self(0);

  /// Create a capability set from a raw mask.
  ///
  /// This is primarily useful for testing and fuzzing. Normal usage should
  /// compose the per-family constants.
  ///
  /// # Availability
  ///
  /// Only with the `testing` feature or in test builds.
  #[cfg(any(test, feature = "testing"))]
  #[inline]
  #[must_use]
  pub const fn from_raw(bits: u32) -> Self {
    Self(bits)
  }

  /// Raw mask.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u32 {
    self.0
  }

  /// Single-bit set.
  #[inline]
  #[must_use]
  pub(crate) const fn bit(bit: u8) -> Self {
    Self(1 << (bit as u32 % 32))
  }

  /// Check if a specific bit is set.
  #[inline]
  #[must_use]
  pub const fn has_bit(self, bit: u8) -> bool {
    bit < 32 && (self.0 & (1 << bit as u32)) != 0
  }

  /// Superset test: every tag in `required` is present.
  #[inline(always)]
  #[must_use]
  pub const fn has(self, required: Self) -> bool {
    (self.0 & required.0) == required.0
  }

  /// Subset test: every tag of `self` is present in `other`.
  #[inline]
  #[must_use]
  pub const fn is_subset_of(self, other: Self) -> bool {
    other.has(self)
  }

  /// Union of two capability sets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Intersection of two capability sets.
  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  /// Tags present in exactly one of the two sets.
  #[inline]
  #[must_use]
  pub const fn symmetric_difference(self, other: Self) -> Self {
    Self(self.0 ^ other.0)
  }

  /// Tags of `self` not present in `other`.
  #[inline]
  #[must_use]
  pub const fn difference(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }

  /// Keep only the tags whose bits are set in `mask`.
  #[inline]
  #[must_use]
  pub const fn masked(self, mask: u32) -> Self {
    Self(self.0 & mask)
  }

  /// Bitwise complement.
  #[inline]
  #[must_use]
  pub const fn complement(self) -> Self {
    Self(!self.0)
  }

  /// `true` for [`Caps::SCALAR`].
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  /// Boolean conversion: `true` iff any tag is set.
  #[inline]
  #[must_use]
  pub const fn is_any(self) -> bool {
    self.0 != 0
  }

  /// Number of tags present.
  #[inline]
  #[must_use]
  pub const fn count(self) -> u32 {
    self.0.count_ones()
  }

  /// The base sub-range.
  #[inline]
  #[must_use]
  pub const fn base(self) -> Self {
    Self(self.0 & BASE_MASK)
  }

  /// The extra sub-range.
  #[inline]
  #[must_use]
  pub const fn extras(self) -> Self {
    Self(self.0 & EXTRA_MASK)
  }

  /// Number of base bits. A valid variant tag has 0 or 1.
  #[inline]
  #[must_use]
  pub const fn base_count(self) -> u32 {
    (self.0 & BASE_MASK).count_ones()
  }

  /// Keep only the highest base tier (and no extras).
  ///
  /// Higher tiers always occupy higher bits, so this is the most significant
  /// base bit.
  #[inline]
  #[must_use]
  pub const fn highest_base(self) -> Self {
    let base = self.0 & BASE_MASK;
    if base == 0 {
      Self::SCALAR
    } else {
      Self(1 << (31 - base.leading_zeros()))
    }
  }

  /// Compose two variant tags, rejecting a second, different base tier.
  ///
  /// `Avx2.with(Popcnt)` and `Avx2.with(Avx2)` are fine, `Avx2.with(Sse2)` is
  /// a [`ConfigError::MultipleBaseTags`].
  #[inline]
  pub const fn try_with(self, other: Self) -> Result<Self, ConfigError> {
    let combined = self.union(other);
    if combined.base_count() > 1 {
      return Err(ConfigError::MultipleBaseTags(combined));
    }
    Ok(combined)
  }

  /// Checked composition for `const` declarations.
  ///
  /// # Panics
  ///
  /// Panics with "more than one base tag used" when both sides carry
  /// different base tiers. In a `const` item the panic is a compile error.
  #[inline]
  #[must_use]
  pub const fn with(self, other: Self) -> Self {
    match self.try_with(other) {
      Ok(caps) => caps,
      Err(err) => panic!("{}", err.message()),
    }
  }

  /// "Is at least as capable as" conversion between variant tags.
  ///
  /// Valid only when both sides carry at most one base tier, the target's
  /// tier is the same as or a descendant of ours, and the target's extras
  /// are a superset of ours.
  #[inline]
  #[must_use]
  pub const fn converts_to(self, target: Self) -> bool {
    if self.base_count() > 1 || target.base_count() > 1 {
      return false;
    }
    (self.0 & BASE_MASK) <= (target.0 & BASE_MASK) && target.extras().has(self.extras())
  }
}

impl core::ops::BitOr for Caps {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    self.union(rhs)
  }
}

impl core::ops::BitAnd for Caps {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self::Output {
    self.intersection(rhs)
  }
}

impl core::ops::BitXor for Caps {
  type Output = Self;

  #[inline]
  fn bitxor(self, rhs: Self) -> Self::Output {
    self.symmetric_difference(rhs)
  }
}

impl core::ops::Not for Caps {
  type Output = Self;

  #[inline]
  fn not(self) -> Self::Output {
    self.complement()
  }
}

impl core::ops::BitOrAssign for Caps {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

impl core::ops::BitAndAssign for Caps {
  #[inline]
  fn bitand_assign(&mut self, rhs: Self) {
    *self = self.intersection(rhs);
  }
}

impl core::ops::BitXorAssign for Caps {
  #[inline]
  fn bitxor_assign(&mut self, rhs: Self) {
    *self = self.symmetric_difference(rhs);
  }
}

impl From<Caps> for u32 {
  #[inline]
  fn from(caps: Caps) -> Self {
    caps.0
  }
}

impl From<Tag> for Caps {
  #[inline]
  fn from(tag: Tag) -> Self {
    tag.caps
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tags
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a [`Tag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
  /// One tier of the family's linear hierarchy.
  Base,
  /// An orthogonal flag.
  Extra,
}

/// One named capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
  name: &'static str,
  caps: Caps,
  kind: TagKind,
}

impl Tag {
  const fn base(name: &'static str, caps: Caps) -> Self {
    Self {
      name,
      caps,
      kind: TagKind::Base,
    }
  }

  const fn extra(name: &'static str, caps: Caps) -> Self {
    Self {
      name,
      caps,
      kind: TagKind::Extra,
    }
  }

  /// Diagnostic name, e.g. `"Avx2"`.
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    self.name
  }

  /// The single-bit set for this tag.
  #[inline]
  #[must_use]
  pub const fn caps(self) -> Caps {
    self.caps
  }

  #[inline]
  #[must_use]
  pub const fn kind(self) -> TagKind {
    self.kind
  }

  /// Bit position.
  #[inline]
  #[must_use]
  pub const fn bit(self) -> u32 {
    self.caps.0.trailing_zeros()
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86/x86_64 Tags
// ─────────────────────────────────────────────────────────────────────────────

/// x86/x86_64 capability tags.
pub mod x86 {
  use super::Caps;

  // ─── Base hierarchy ───
  pub const SSE2: Caps = Caps::bit(0);
  pub const SSE3: Caps = Caps::bit(1);
  pub const SSSE3: Caps = Caps::bit(2);
  pub const SSE41: Caps = Caps::bit(3);
  pub const SSE42: Caps = Caps::bit(4);
  pub const AVX: Caps = Caps::bit(5);
  pub const AVX2: Caps = Caps::bit(6);
  pub const AVX512F: Caps = Caps::bit(7);

  // ─── Extras ───
  pub const POPCNT: Caps = Caps::bit(16);
  /// LZCNT.
  ///
  /// The encoding is shared with the older `BSR` instruction, which executes
  /// without faulting on CPUs lacking LZCNT and returns a different result.
  /// Always check for it through [`runtime_features()`](crate::runtime_features)
  /// instead of relying on the compile-time target feature.
  pub const LZCNT: Caps = Caps::bit(17);
  pub const AVX_F16C: Caps = Caps::bit(18);
  pub const AVX_FMA: Caps = Caps::bit(19);
}

// ─────────────────────────────────────────────────────────────────────────────
// ARM Tags
// ─────────────────────────────────────────────────────────────────────────────

/// ARM and AArch64 capability tags. There are no extras on ARM.
pub mod arm {
  use super::Caps;

  pub const NEON: Caps = Caps::bit(0);
  pub const NEON_FMA: Caps = Caps::bit(1);
  pub const NEON_FP16: Caps = Caps::bit(2);
}

// ─────────────────────────────────────────────────────────────────────────────
// WebAssembly Tags
// ─────────────────────────────────────────────────────────────────────────────

/// WebAssembly capability tags.
pub mod wasm {
  use super::Caps;

  pub const SIMD128: Caps = Caps::bit(0);
}

/// x86 tags in bit order, base tiers first.
const X86_TAGS: &[Tag] = &[
  Tag::base("Sse2", x86::SSE2),
  Tag::base("Sse3", x86::SSE3),
  Tag::base("Ssse3", x86::SSSE3),
  Tag::base("Sse41", x86::SSE41),
  Tag::base("Sse42", x86::SSE42),
  Tag::base("Avx", x86::AVX),
  Tag::base("Avx2", x86::AVX2),
  Tag::base("Avx512f", x86::AVX512F),
  Tag::extra("Popcnt", x86::POPCNT),
  Tag::extra("Lzcnt", x86::LZCNT),
  Tag::extra("AvxF16c", x86::AVX_F16C),
  Tag::extra("AvxFma", x86::AVX_FMA),
];

const X86_TIERS: &[Caps] = &[
  x86::SSE2,
  x86::SSE3,
  x86::SSSE3,
  x86::SSE41,
  x86::SSE42,
  x86::AVX,
  x86::AVX2,
  x86::AVX512F,
];

const ARM_TAGS: &[Tag] = &[
  Tag::base("Neon", arm::NEON),
  Tag::base("NeonFma", arm::NEON_FMA),
  Tag::base("NeonFp16", arm::NEON_FP16),
];

const ARM_TIERS: &[Caps] = &[arm::NEON, arm::NEON_FMA, arm::NEON_FP16];

const WASM_TAGS: &[Tag] = &[Tag::base("Simd128", wasm::SIMD128)];

const WASM_TIERS: &[Caps] = &[wasm::SIMD128];

// ─────────────────────────────────────────────────────────────────────────────
// Families
// ─────────────────────────────────────────────────────────────────────────────

/// A tag table: the architecture family a [`Caps`] is interpreted against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Family {
  X86,
  Arm,
  Wasm,
  /// No tags at all; every dispatch resolves to scalar.
  #[default]
  Other,
}

impl Family {
  /// The family of the current compilation target.
  #[inline]
  #[must_use]
  pub const fn current() -> Self {
    Arch::current().family()
  }

  /// All tags of this family in bit order, base tiers first.
  #[inline]
  #[must_use]
  pub const fn tags(self) -> &'static [Tag] {
    match self {
      Self::X86 => X86_TAGS,
      Self::Arm => ARM_TAGS,
      Self::Wasm => WASM_TAGS,
      Self::Other => &[],
    }
  }

  /// Base tiers in ascending order, without scalar.
  #[inline]
  #[must_use]
  pub const fn base_tiers(self) -> &'static [Caps] {
    match self {
      Self::X86 => X86_TIERS,
      Self::Arm => ARM_TIERS,
      Self::Wasm => WASM_TIERS,
      Self::Other => &[],
    }
  }

  /// Number of extra tags; bounds the extra rank in [`priority`](crate::priority).
  #[inline]
  #[must_use]
  pub const fn extra_tag_count(self) -> u32 {
    match self {
      Self::X86 => 4,
      Self::Arm | Self::Wasm | Self::Other => 0,
    }
  }

  /// Union of every tag the family defines.
  #[must_use]
  pub const fn all(self) -> Caps {
    let mut all = Caps::SCALAR;
    let mut rest = self.tags();
    while let Some((tag, tail)) = rest.split_first() {
      all = all.union(tag.caps);
      rest = tail;
    }
    all
  }

  /// Highest tier present in `features`, scanning from the top.
  ///
  /// Returns [`Caps::SCALAR`] when no tier is present.
  #[must_use]
  pub const fn highest_tier_in(self, features: Caps) -> Caps {
    let mut rest = self.base_tiers();
    while let Some((tier, head)) = rest.split_last() {
      if features.has(*tier) {
        return *tier;
      }
      rest = head;
    }
    Caps::SCALAR
  }

  /// Every tier up to and including the highest base in `limit`, plus the
  /// extras of `limit`.
  ///
  /// `ceiling(Avx2 | Popcnt)` is `Sse2 | … | Avx2 | Popcnt`. Used to cap a
  /// detected feature set.
  #[must_use]
  pub const fn ceiling(self, limit: Caps) -> Caps {
    let top = limit.highest_base();
    let mut out = limit.extras();
    let mut rest = self.base_tiers();
    while let Some((tier, tail)) = rest.split_first() {
      if tier.0 <= top.0 {
        out = out.union(*tier);
      }
      rest = tail;
    }
    out
  }

  /// Look up a tag by name, case-insensitively.
  #[must_use]
  pub fn tag_named(self, name: &str) -> Option<Tag> {
    self.tags().iter().copied().find(|tag| tag.name.eq_ignore_ascii_case(name))
  }

  /// Name of the single tag equal to `caps`, if any.
  #[must_use]
  pub fn name_of_tag(self, caps: Caps) -> Option<&'static str> {
    if caps.is_empty() {
      return Some("Scalar");
    }
    self.tags().iter().find(|tag| tag.caps == caps).map(|tag| tag.name)
  }

  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::Arm => "arm",
      Self::Wasm => "wasm",
      Self::Other => "other",
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Architecture Identification
// ─────────────────────────────────────────────────────────────────────────────

/// Target architecture enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Arch {
  X86_64,
  X86,
  Aarch64,
  Arm,
  Wasm32,
  Wasm64,
  #[default]
  Other,
}

impl Arch {
  /// Get the architecture for the current compilation target.
  #[inline]
  #[must_use]
  pub const fn current() -> Self {
    if cfg!(target_arch = "x86_64") {
      Self::X86_64
    } else if cfg!(target_arch = "x86") {
      Self::X86
    } else if cfg!(target_arch = "aarch64") {
      Self::Aarch64
    } else if cfg!(target_arch = "arm") {
      Self::Arm
    } else if cfg!(target_arch = "wasm32") {
      Self::Wasm32
    } else if cfg!(target_arch = "wasm64") {
      Self::Wasm64
    } else {
      Self::Other
    }
  }

  /// Tag family for this architecture.
  #[inline]
  #[must_use]
  pub const fn family(self) -> Family {
    match self {
      Self::X86_64 | Self::X86 => Family::X86,
      Self::Aarch64 | Self::Arm => Family::Arm,
      Self::Wasm32 | Self::Wasm64 => Family::Wasm,
      Self::Other => Family::Other,
    }
  }

  /// Returns the human-readable name for this architecture.
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::X86 => "x86",
      Self::Aarch64 => "aarch64",
      Self::Arm => "arm",
      Self::Wasm32 => "wasm32",
      Self::Wasm64 => "wasm64",
      Self::Other => "other",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Names
// ─────────────────────────────────────────────────────────────────────────────

impl Caps {
  /// Names of the set tags for the current family, in bit order.
  pub fn tag_names(self) -> impl Iterator<Item = &'static str> {
    self.tag_names_in(Family::current())
  }

  /// Names of the set tags for `family`, in bit order.
  pub fn tag_names_in(self, family: Family) -> impl Iterator<Item = &'static str> {
    family.tags().iter().filter(move |tag| self.has(tag.caps)).map(|tag| tag.name)
  }

  /// Name of this set if it is exactly one tag (or scalar).
  #[inline]
  #[must_use]
  pub fn name(self) -> Option<&'static str> {
    Family::current().name_of_tag(self)
  }

  /// Renders as `Scalar` or `Avx2|Popcnt` for the current family.
  #[inline]
  #[must_use]
  pub const fn display(self) -> Name {
    Name {
      caps: self,
      family: Family::current(),
    }
  }

  /// Renders against an explicit family.
  #[inline]
  #[must_use]
  pub const fn display_in(self, family: Family) -> Name {
    Name { caps: self, family }
  }

  /// Parse a tag list for an explicit family.
  ///
  /// Tags are matched case-insensitively and may be separated by `|`, `,`,
  /// `+` or any Unicode whitespace (so a trailing newline is fine).
  /// `Scalar` is accepted and contributes nothing.
  pub fn parse_in(family: Family, input: &str) -> Result<Self, ParseCapsError> {
    let mut caps = Self::SCALAR;
    for token in input.split(|c: char| matches!(c, '|' | ',' | '+') || c.is_whitespace()) {
      if token.is_empty() || token.eq_ignore_ascii_case("scalar") {
        continue;
      }
      // Byte offset of the token: `split` yields subslices of `input`.
      let at = token.as_ptr() as usize - input.as_ptr() as usize;
      match family.tag_named(token) {
        Some(tag) => caps |= tag.caps,
        None => return Err(ParseCapsError::UnknownTag { at }),
      }
    }
    Ok(caps)
  }
}

/// Diagnostic rendering of a [`Caps`], see [`name_of`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Name {
  caps: Caps,
  family: Family,
}

impl fmt::Display for Name {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.caps.is_empty() {
      return f.write_str("Scalar");
    }

    let mut known = Caps::SCALAR;
    let mut first = true;
    for tag in self.family.tags() {
      if self.caps.has(tag.caps) {
        if !first {
          f.write_str("|")?;
        }
        first = false;
        f.write_str(tag.name)?;
        known |= tag.caps;
      }
    }

    // Bits with no tag in this family stay visible so names remain injective.
    let unknown = self.caps.difference(known);
    if unknown.is_any() {
      if !first {
        f.write_str("|")?;
      }
      write!(f, "{:#x}", unknown.0)?;
    }
    Ok(())
  }
}

/// Diagnostic name of a capability set for the current family.
///
/// `Scalar` for the empty set, otherwise the tag names joined with `|` in bit
/// order, e.g. `Avx2|Popcnt`. Distinct sets never share a name.
#[inline]
#[must_use]
pub const fn name_of(caps: Caps) -> Name {
  caps.display()
}

impl fmt::Debug for Caps {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let arch = Arch::current();
    write!(f, "Caps({arch}")?;

    let mut iter = self.tag_names().peekable();
    if iter.peek().is_none() && self.is_empty() {
      write!(f, ", Scalar)")
    } else if iter.peek().is_none() {
      write!(f, ", {:#x})", self.0)
    } else {
      write!(f, ", [")?;
      let mut first = true;
      for name in iter {
        if !first {
          write!(f, ", ")?;
        }
        first = false;
        write!(f, "{name}")?;
      }
      write!(f, "])")
    }
  }
}

impl fmt::Display for Caps {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.display(), f)
  }
}

impl FromStr for Caps {
  type Err = ParseCapsError;

  /// Parse a tag list for the current family, e.g. `"Avx2|Popcnt"`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse_in(Family::current(), s)
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  extern crate std;

  use std::{format, string::ToString, vec::Vec};

  use super::*;

  #[test]
  fn test_layout() {
    assert_eq!(BASE_MASK, 0xFFFF);
    assert_eq!(EXTRA_MASK, 0xFFFF_0000);
    assert_eq!(x86::POPCNT.bits(), 1 << EXTRA_OFFSET);
    for family in [Family::X86, Family::Arm, Family::Wasm] {
      for tag in family.tags() {
        assert_eq!(tag.caps().count(), 1, "{} must be a single bit", tag.name());
        match tag.kind() {
          TagKind::Base => assert_eq!(tag.caps().extras(), Caps::SCALAR),
          TagKind::Extra => assert_eq!(tag.caps().base(), Caps::SCALAR),
        }
      }
    }
  }

  #[test]
  fn test_tiers_ascend() {
    for family in [Family::X86, Family::Arm, Family::Wasm] {
      let tiers = family.base_tiers();
      for pair in tiers.windows(2) {
        assert!(pair[0].bits() < pair[1].bits());
      }
      let base_tags = family.tags().iter().filter(|t| t.kind() == TagKind::Base).count();
      assert_eq!(base_tags, tiers.len());
    }
  }

  #[test]
  fn test_extra_counts() {
    assert_eq!(Family::X86.extra_tag_count(), 4);
    assert_eq!(Family::Arm.extra_tag_count(), 0);
    assert_eq!(Family::Wasm.extra_tag_count(), 0);
    let extras = Family::X86.tags().iter().filter(|t| t.kind() == TagKind::Extra).count();
    assert_eq!(extras as u32, Family::X86.extra_tag_count());
  }

  #[test]
  fn test_set_operations() {
    let a = x86::AVX2 | x86::POPCNT;
    let b = x86::AVX2 | x86::LZCNT;

    assert_eq!(a & b, x86::AVX2);
    assert_eq!(a ^ b, x86::POPCNT | x86::LZCNT);
    assert_eq!(!!a, a);
    assert!((a | b).has(a));
    assert!(x86::AVX2.is_subset_of(a));
    assert!(!a.is_subset_of(x86::AVX2));

    let mut c = Caps::SCALAR;
    c |= x86::SSE2;
    c |= x86::POPCNT;
    c &= x86::POPCNT | x86::LZCNT;
    assert_eq!(c, x86::POPCNT);
    c ^= x86::POPCNT;
    assert!(c.is_empty());
    assert!(!c.is_any());
    assert_eq!(u32::from(x86::AVX_FMA), 1 << 19);
  }

  #[test]
  fn test_with_single_base() {
    const AVX2_POPCNT: Caps = x86::AVX2.with(x86::POPCNT);
    assert_eq!(AVX2_POPCNT, x86::AVX2 | x86::POPCNT);
    assert_eq!(x86::AVX2.with(x86::AVX2), x86::AVX2);
    assert_eq!(
      x86::AVX2.try_with(x86::SSE2),
      Err(ConfigError::MultipleBaseTags(x86::AVX2 | x86::SSE2))
    );
  }

  #[test]
  #[should_panic(expected = "more than one base tag used")]
  fn test_with_two_bases_panics() {
    let _ = x86::AVX.with(x86::SSE41);
  }

  #[test]
  fn test_converts_to() {
    // Same or higher tier, extras superset.
    assert!(Caps::SCALAR.converts_to(x86::AVX512F));
    assert!(x86::SSE2.converts_to(x86::SSE2));
    assert!(x86::SSE2.converts_to(x86::AVX2 | x86::POPCNT));
    assert!((x86::SSE41 | x86::POPCNT).converts_to(x86::AVX | x86::POPCNT | x86::LZCNT));

    // Lower tier or missing extras.
    assert!(!x86::AVX2.converts_to(x86::AVX));
    assert!(!(x86::AVX | x86::POPCNT).converts_to(x86::AVX2));
    assert!(!x86::POPCNT.converts_to(x86::LZCNT));

    // Feature sets with several tiers are not variant tags.
    assert!(!x86::SSE2.converts_to(x86::SSE2 | x86::SSE3));
  }

  #[test]
  fn test_highest_base() {
    assert_eq!(Caps::SCALAR.highest_base(), Caps::SCALAR);
    assert_eq!((x86::SSE2 | x86::SSE3 | x86::AVX2 | x86::POPCNT).highest_base(), x86::AVX2);
    assert_eq!(x86::POPCNT.highest_base(), Caps::SCALAR);
  }

  #[test]
  fn test_highest_tier_in() {
    let features = x86::SSE2 | x86::SSE3 | x86::SSSE3 | x86::POPCNT;
    assert_eq!(Family::X86.highest_tier_in(features), x86::SSSE3);
    assert_eq!(Family::X86.highest_tier_in(x86::POPCNT), Caps::SCALAR);
    assert_eq!(Family::Arm.highest_tier_in(arm::NEON | arm::NEON_FMA), arm::NEON_FMA);
    assert_eq!(Family::Other.highest_tier_in(Caps(u32::MAX)), Caps::SCALAR);
  }

  #[test]
  fn test_ceiling() {
    let cap = Family::X86.ceiling(x86::SSE41 | x86::POPCNT);
    assert_eq!(cap, x86::SSE2 | x86::SSE3 | x86::SSSE3 | x86::SSE41 | x86::POPCNT);
    assert_eq!(Family::X86.ceiling(Caps::SCALAR), Caps::SCALAR);
    assert_eq!(Family::Arm.ceiling(arm::NEON_FP16), Family::Arm.all());
  }

  #[test]
  fn test_names() {
    assert_eq!(x86::AVX2.display_in(Family::X86).to_string(), "Avx2");
    assert_eq!(
      (x86::AVX2 | x86::POPCNT | x86::AVX_FMA).display_in(Family::X86).to_string(),
      "Avx2|Popcnt|AvxFma"
    );
    assert_eq!(Caps::SCALAR.display_in(Family::Arm).to_string(), "Scalar");
    assert_eq!(arm::NEON_FP16.display_in(Family::Arm).to_string(), "NeonFp16");
    assert_eq!(wasm::SIMD128.display_in(Family::Wasm).to_string(), "Simd128");
    // Unknown bits are rendered rather than dropped.
    assert_eq!(Caps(1 << 9).display_in(Family::X86).to_string(), "0x200");
    assert_eq!(arm::NEON.union(Caps(1 << 16)).display_in(Family::Arm).to_string(), "Neon|0x10000");
  }

  #[test]
  fn test_names_injective_per_family() {
    for family in [Family::X86, Family::Arm, Family::Wasm] {
      let names: Vec<_> = family.tags().iter().map(|t| t.name()).collect();
      for (i, a) in names.iter().enumerate() {
        assert_ne!(*a, "Scalar");
        for b in &names[i + 1..] {
          assert_ne!(a, b);
        }
      }
    }
  }

  #[test]
  fn test_name_of_tag() {
    assert_eq!(Family::X86.name_of_tag(x86::LZCNT), Some("Lzcnt"));
    assert_eq!(Family::X86.name_of_tag(Caps::SCALAR), Some("Scalar"));
    assert_eq!(Family::X86.name_of_tag(x86::AVX | x86::POPCNT), None);
  }

  #[test]
  fn test_debug_format() {
    let arch = Arch::current();
    assert_eq!(format!("{:?}", Caps::SCALAR), format!("Caps({arch}, Scalar)"));
    if Family::current() == Family::X86 {
      assert_eq!(
        format!("{:?}", x86::AVX2 | x86::POPCNT),
        format!("Caps({arch}, [Avx2, Popcnt])")
      );
    }
  }

  #[test]
  fn test_parse() {
    assert_eq!(Caps::parse_in(Family::X86, "Avx2|Popcnt"), Ok(x86::AVX2 | x86::POPCNT));
    assert_eq!(Caps::parse_in(Family::X86, "avx2, lzcnt"), Ok(x86::AVX2 | x86::LZCNT));
    assert_eq!(Caps::parse_in(Family::X86, "sse41+AvxFma"), Ok(x86::SSE41 | x86::AVX_FMA));
    assert_eq!(Caps::parse_in(Family::X86, "Scalar"), Ok(Caps::SCALAR));
    assert_eq!(Caps::parse_in(Family::X86, ""), Ok(Caps::SCALAR));
    assert_eq!(Caps::parse_in(Family::Arm, "neon|NeonFma"), Ok(arm::NEON | arm::NEON_FMA));
    assert_eq!(
      Caps::parse_in(Family::X86, "Avx2|Neon"),
      Err(ParseCapsError::UnknownTag { at: 5 })
    );
  }

  #[test]
  fn test_parse_accepts_any_whitespace() {
    assert_eq!(Caps::parse_in(Family::X86, "Avx2\n"), Ok(x86::AVX2));
    assert_eq!(Caps::parse_in(Family::X86, " Avx2\r\n|Popcnt "), Ok(x86::AVX2 | x86::POPCNT));
    assert_eq!(Caps::parse_in(Family::X86, "\tSse2\u{a0}Lzcnt\n\n"), Ok(x86::SSE2 | x86::LZCNT));
    assert_eq!(Caps::parse_in(Family::X86, "\n\r\t "), Ok(Caps::SCALAR));
  }

  #[test]
  fn test_parse_error_offset_is_byte_offset() {
    assert_eq!(
      Caps::parse_in(Family::X86, "Avx2\r\nNeon"),
      Err(ParseCapsError::UnknownTag { at: 6 })
    );
    // U+00A0 is two bytes wide.
    assert_eq!(
      Caps::parse_in(Family::X86, "Sse2\u{a0}Bogus"),
      Err(ParseCapsError::UnknownTag { at: 6 })
    );
  }

  #[test]
  fn test_parse_display_roundtrip_for_tags() {
    for family in [Family::X86, Family::Arm, Family::Wasm] {
      for tag in family.tags() {
        let rendered = tag.caps().display_in(family).to_string();
        assert_eq!(Caps::parse_in(family, &rendered), Ok(tag.caps()));
      }
    }
  }

  #[test]
  fn test_arch_family() {
    assert_eq!(Arch::X86_64.family(), Family::X86);
    assert_eq!(Arch::Aarch64.family(), Family::Arm);
    assert_eq!(Arch::Wasm32.family(), Family::Wasm);
    assert_eq!(Arch::Other.family(), Family::Other);
    assert_eq!(Family::current(), Arch::current().family());
    #[cfg(target_arch = "x86_64")]
    assert_eq!(Arch::current(), Arch::X86_64);
    #[cfg(target_arch = "aarch64")]
    assert_eq!(Arch::current(), Arch::Aarch64);
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Property-Based Tests (proptest)
// Note: proptest uses filesystem for failure persistence, which Miri doesn't support.
// ─────────────────────────────────────────────────────────────────────────────
