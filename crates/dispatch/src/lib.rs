//! CPU feature dispatch.
//!
//! Pick the best implementation of a function for the machine it runs on,
//! and bind it with one of three strategies:
//!
//! | Strategy | Resolved | Per call | Reassignable |
//! |----------|----------|----------|--------------|
//! | Link-resolved ([`dispatched_ifunc!`]) | by the loader, once | direct call | no |
//! | Cached pointer ([`dispatched_pointer!`], [`CachedPointer`]) | on first call | atomic load + indirect call | yes |
//! | Direct ([`dispatched_direct!`], [`Registry::bind_static`]) | at compile time | direct call, inlinable | no |
//!
//! All three share one selection rule (see [`dispatch`]): the variant whose
//! tag converts to the observed features with the highest
//! [priority](cpu_caps::priority) wins, and a registry that could ever tie or
//! lacks a scalar fallback is rejected when its `const` is evaluated.
//!
//! # Usage
//!
//! ```
//! use cpu_dispatch::{Registry, dispatched_pointer, registry};
//! use cpu_dispatch::cpu_caps::{Caps, caps::x86};
//!
//! fn sum_scalar(data: &[u32]) -> u32 {
//!   data.iter().sum()
//! }
//!
//! fn sum_avx2(data: &[u32]) -> u32 {
//!   // Stands in for a #[target_feature(enable = "avx2")] kernel.
//!   data.iter().sum()
//! }
//!
//! const SUM: Registry<fn(&[u32]) -> u32> = registry![
//!   "scalar" => Caps::SCALAR => sum_scalar,
//!   "avx2" => x86::AVX2 => sum_avx2,
//! ];
//!
//! dispatched_pointer! {
//!   pub fn sum(data: &[u32]) -> u32 = SUM;
//! }
//!
//! assert_eq!(sum(&[1, 2, 3, 4]), 10);
//! ```
//!
//! # Features
//!
//! - `std` (default): cached detection through `OnceLock`, OS probes, the
//!   `CPU_DISPATCH_CAPS` limit.
//! - `ifunc` (default): link-resolved binding on linux-gnu x86_64/aarch64.

// Fallibility discipline: deny unwrap/expect in production, allow in tests.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod dispatch;
pub mod link;
mod macros;
pub mod pointer;

pub use cpu_caps;
pub use dispatch::{Registry, Selected, Variant};
pub use link::{Binding, LINK_RESOLVED_AVAILABLE};
pub use pointer::CachedPointer;

#[doc(hidden)]
pub mod __private {
  pub use paste::paste;

  pub use crate::link::resolver_features;
}
