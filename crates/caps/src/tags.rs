//! Typed capability tags.
//!
//! Zero-sized marker types for every [`Tag`](crate::Tag), so tags can be
//! carried in types (generic kernels, trait impls) and turned back into a
//! [`Caps`] with [`tag_for`]:
//!
//! ```
//! use cpu_caps::{
//!   caps::x86 as bits,
//!   tag_for,
//!   tags::{With, x86},
//! };
//!
//! type Fast = With<x86::Avx2, x86::Popcnt>;
//!
//! const FAST: cpu_caps::Caps = tag_for::<Fast>();
//! assert_eq!(FAST, bits::AVX2 | bits::POPCNT);
//! ```
//!
//! Combining two base tiers fails to compile:
//!
//! ```compile_fail
//! use cpu_caps::{tag_for, tags::{With, x86}};
//!
//! const BAD: cpu_caps::Caps = tag_for::<With<x86::Avx2, x86::Sse2>>();
//! ```

use core::marker::PhantomData;

use crate::caps::{Caps, TagKind};

/// A type standing for a capability combination.
pub trait CpuTag {
  const CAPS: Caps;
}

/// A type standing for exactly one named tag.
pub trait NamedTag: CpuTag {
  const NAME: &'static str;
  const KIND: TagKind;
}

/// The [`Caps`] a tag type stands for.
#[inline(always)]
#[must_use]
pub const fn tag_for<T: CpuTag + ?Sized>() -> Caps {
  T::CAPS
}

/// Combination of two tag types, checked like [`Caps::with`].
///
/// Evaluating `With<A, B>::CAPS` for two base tiers is a compile error.
pub struct With<A, B>(PhantomData<(A, B)>);

impl<A: CpuTag, B: CpuTag> CpuTag for With<A, B> {
  const CAPS: Caps = A::CAPS.with(B::CAPS);
}

/// No accelerated capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scalar;

impl CpuTag for Scalar {
  const CAPS: Caps = Caps::SCALAR;
}

impl NamedTag for Scalar {
  const NAME: &'static str = "Scalar";
  const KIND: TagKind = TagKind::Base;
}

macro_rules! tag_types {
  ($family:ident; $($(#[$meta:meta])* $ty:ident => $caps:ident, $kind:ident;)+) => {
    $(
      $(#[$meta])*
      #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
      pub struct $ty;

      impl $crate::tags::CpuTag for $ty {
        const CAPS: $crate::Caps = $crate::caps::$family::$caps;
      }

      impl $crate::tags::NamedTag for $ty {
        const NAME: &'static str = stringify!($ty);
        const KIND: $crate::TagKind = $crate::TagKind::$kind;
      }
    )+
  };
}

/// x86/x86_64 tag types.
pub mod x86 {
  tag_types! { x86;
    Sse2 => SSE2, Base;
    Sse3 => SSE3, Base;
    Ssse3 => SSSE3, Base;
    Sse41 => SSE41, Base;
    Sse42 => SSE42, Base;
    Avx => AVX, Base;
    Avx2 => AVX2, Base;
    Avx512f => AVX512F, Base;
    Popcnt => POPCNT, Extra;
    /// See [`caps::x86::LZCNT`](crate::caps::x86::LZCNT) for the BSR caveat.
    Lzcnt => LZCNT, Extra;
    AvxF16c => AVX_F16C, Extra;
    AvxFma => AVX_FMA, Extra;
  }
}

/// ARM/AArch64 tag types.
pub mod arm {
  tag_types! { arm;
    Neon => NEON, Base;
    NeonFma => NEON_FMA, Base;
    NeonFp16 => NEON_FP16, Base;
  }
}

/// WebAssembly tag types.
pub mod wasm {
  tag_types! { wasm;
    Simd128 => SIMD128, Base;
  }
}
