//! CPU capability tags, priority ranking and runtime detection.
//!
//! This crate is the **single source of truth** for which instruction sets a
//! dispatch point may rely on. The companion `cpu-dispatch` crate builds
//! per-function dispatch on top of it.
//!
//! # Core Types
//!
//! - [`Caps`]: a combination of capability tags (a `u32` bitmask)
//! - [`Tag`]: one named capability, either a *base* tier or an *extra* flag
//! - [`Family`]: the tag table of an architecture family (x86, ARM, Wasm)
//! - [`CpuTag`]: zero-sized typed tags for [`tag_for`]
//!
//! # Main Entry Points
//!
//! ```
//! use cpu_caps::{Caps, compiled_features, name_of, runtime_features};
//!
//! let compiled = compiled_features();
//! let runtime = runtime_features();
//!
//! // Whatever the build assumed, the machine provides at least as much.
//! # #[cfg(not(miri))]
//! assert!(runtime.has(compiled.base()));
//! println!("running with {}", name_of(runtime));
//! # let _ = Caps::SCALAR;
//! ```
//!
//! # Bit Layout
//!
//! - Bits 0-15: base tags. Each family's tiers form a linear hierarchy, each
//!   tier a strict superset of the previous one.
//! - Bits 16-31: extra tags. Orthogonal flags with no ordering relation.
//!
//! Base bits of different families overlap (`Sse2` and `Neon` are both bit 0);
//! a [`Caps`] is interpreted against the [`Family`] of the current target.
//!
//! # Design Philosophy
//!
//! 1. **One ranking rule**: a higher base tier always outranks any number of extras; among equal
//!    base tiers, more extras outrank fewer. See [`priority`].
//! 2. **Contradictions fail early**: combining two base tiers or ranking an ambiguous pair is a
//!    [`ConfigError`], rejected at compile time when evaluated in a `const`.
//! 3. **Cached detection**: runtime probing happens once, in `OnceLock` (std) or atomics (no_std).
//! 4. **Never fails**: a machine that cannot be probed reports the compiled set.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

// ─────────────────────────────────────────────────────────────────────────────
// Core modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod caps;
mod detect;
pub mod error;
pub mod priority;
pub mod tags;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

pub use caps::{Arch, BASE_MASK, Caps, EXTRA_MASK, EXTRA_OFFSET, Family, Name, Tag, TagKind, name_of};
pub use detect::{
  DEFAULT, DEFAULT_BASE, DEFAULT_EXTRA, ENV_CAPS, clear_override, compiled_features, from_aarch64_hwcap,
  from_arm_hwcap, has_override, probe, runtime_features, runtime_features_uncached, set_override,
  try_set_override,
};
pub use error::{ConfigError, OverrideError, ParseCapsError};
pub use priority::{bit_index, priority, try_priority, try_priority_in};
pub use tags::{CpuTag, NamedTag, tag_for};
