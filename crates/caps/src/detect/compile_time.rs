// ─────────────────────────────────────────────────────────────────────────────
// Compile-Time Static Detection
// ─────────────────────────────────────────────────────────────────────────────

use crate::caps::Caps;

/// Capabilities known at compile time.
///
/// Collects the features enabled via `-C target-feature=...` or
/// `-C target-cpu=...`. This is a `const` value; the compiler removes every
/// check.
///
/// The result is a *feature set*: every enabled base tier is present, not
/// just the highest.
///
/// # Examples
///
/// ```
/// use cpu_caps::compiled_features;
///
/// const COMPILED: cpu_caps::Caps = compiled_features();
///
/// // SSE2 is part of the x86_64 baseline.
/// #[cfg(target_arch = "x86_64")]
/// assert!(COMPILED.has(cpu_caps::caps::x86::SSE2));
///
/// // NEON (with FMA) is part of the aarch64 baseline.
/// #[cfg(target_arch = "aarch64")]
/// assert!(COMPILED.has(cpu_caps::caps::arm::NEON_FMA));
/// ```
#[inline(always)]
#[must_use]
pub const fn compiled_features() -> Caps {
  // cfg!() is a const bool, so dead branches vanish.
  #[allow(unused_macros)]
  macro_rules! detect {
    ($caps:ident; $($feature:literal => $cap:expr),+ $(,)?) => {
      $(if cfg!(target_feature = $feature) { $caps = $caps.union($cap); })+
    };
  }

  #[allow(unused_mut)]
  let mut caps = Caps::SCALAR;

  // ─── x86/x86_64 ───
  #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
  {
    use crate::caps::x86;

    detect!(caps;
      "sse2" => x86::SSE2,
      "sse3" => x86::SSE3,
      "ssse3" => x86::SSSE3,
      "sse4.1" => x86::SSE41,
      "sse4.2" => x86::SSE42,
      "avx" => x86::AVX,
      "avx2" => x86::AVX2,
      "avx512f" => x86::AVX512F,
      "popcnt" => x86::POPCNT,
      "lzcnt" => x86::LZCNT,
      "f16c" => x86::AVX_F16C,
      "fma" => x86::AVX_FMA,
    );
  }

  // ─── aarch64 ───
  // Every aarch64 NEON unit has fused multiply-add.
  #[cfg(target_arch = "aarch64")]
  {
    use crate::caps::arm;

    detect!(caps;
      "neon" => arm::NEON.union(arm::NEON_FMA),
      "fp16" => arm::NEON_FP16,
    );
  }

  // ─── arm ───
  #[cfg(target_arch = "arm")]
  {
    use crate::caps::arm;

    detect!(caps; "neon" => arm::NEON);
    if cfg!(all(target_feature = "neon", target_feature = "vfp4")) {
      caps = caps.union(arm::NEON_FMA);
    }
  }

  // ─── wasm ───
  #[cfg(any(target_arch = "wasm32", target_arch = "wasm64"))]
  {
    use crate::caps::wasm;

    detect!(caps; "simd128" => wasm::SIMD128);
  }

  caps
}

/// Highest base tier the build assumes.
pub const DEFAULT_BASE: Caps = compiled_features().highest_base();

/// Extra tags the build assumes.
pub const DEFAULT_EXTRA: Caps = compiled_features().extras();

/// The variant tag matching the build configuration: [`DEFAULT_BASE`] plus
/// [`DEFAULT_EXTRA`]. Direct binding selects against this.
pub const DEFAULT: Caps = DEFAULT_BASE.union(DEFAULT_EXTRA);
