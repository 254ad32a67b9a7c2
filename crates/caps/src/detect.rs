//! CPU capability detection.
//!
//! Two views of the machine:
//!
//! - [`compiled_features()`]: what the build assumes (`-C target-feature`, `-C target-cpu`). A `const`
//!   value.
//! - [`runtime_features()`]: what the executing CPU and OS actually support. Probed once per process
//!   and cached.
//!
//! # Probing
//!
//! | Target | Source |
//! |--------|--------|
//! | x86/x86_64 | CPUID + XGETBV |
//! | aarch64/arm Linux, Android | `AT_HWCAP` from `/proc/self/auxv` |
//! | aarch64 Apple | `sysctlbyname("hw.optional.neon_fp16")` |
//! | everything else, Miri | the compiled set |
//!
//! Probing never fails. A machine that can't be queried reports the compiled
//! set, and the worst case is [`Caps::SCALAR`].
//!
//! # Configuration
//!
//! With `std`, the environment variable [`ENV_CAPS`] limits the probed set,
//! e.g. `CPU_DISPATCH_CAPS=Sse42|Popcnt` hides every tier above SSE4.2 and
//! every extra but POPCNT. It can only remove capabilities. Where nothing is
//! probed (Miri, Wasm, other architectures) it has no effect and
//! [`runtime_features()`] equals [`compiled_features()`].

use crate::caps::Caps;
#[cfg(feature = "std")]
use crate::caps::Family;

mod cache_override;
mod compile_time;

#[cfg_attr(miri, allow(dead_code))]
mod arch {
  pub(super) mod arm;
  #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
  pub(super) mod x86;
  #[cfg(any(target_arch = "wasm32", target_arch = "wasm64"))]
  pub(super) mod wasm;
}

pub use arch::arm::{from_aarch64_hwcap, from_arm_hwcap};
pub use cache_override::{clear_override, has_override, set_override, try_set_override};
pub use compile_time::{DEFAULT, DEFAULT_BASE, DEFAULT_EXTRA, compiled_features};

/// Environment variable limiting the detected capabilities.
///
/// Parsed with [`Caps::from_str`](core::str::FromStr). Every base tier up to
/// the highest one listed stays visible, plus the listed extras. Invalid
/// values are reported through `tracing` and ignored. Ignored entirely on
/// targets without a hardware probe.
pub const ENV_CAPS: &str = "CPU_DISPATCH_CAPS";

/// Whether [`probe()`] queries the hardware rather than returning the
/// compiled set.
#[cfg_attr(not(feature = "std"), allow(dead_code))]
const PROBES_HARDWARE: bool = cfg!(all(
  not(miri),
  any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64", target_arch = "arm")
));

// ─────────────────────────────────────────────────────────────────────────────
// Main API
// ─────────────────────────────────────────────────────────────────────────────

/// Capabilities of the executing machine.
///
/// This is the main entry point for dispatch. The first call probes the
/// machine; later calls return the cached value.
///
/// # Caching
///
/// - With `std`: cached in a `OnceLock`.
/// - Without `std`: cached with atomics (spin while another thread probes).
///
/// # Override
///
/// A value installed with [`set_override`] before the first call is
/// returned instead of probing.
#[inline]
#[must_use]
pub fn runtime_features() -> Caps {
  cache_override::get_or_init(init)
}

/// Capabilities of the executing machine, recomputed on every call.
///
/// Honors the override and [`ENV_CAPS`] like [`runtime_features()`] but
/// bypasses (and never fills) the cache.
#[must_use]
pub fn runtime_features_uncached() -> Caps {
  if let Some(caps) = cache_override::get_override() {
    return caps;
  }
  limit_from_env(probe())
}

/// Raw hardware probe: no cache, no override, no environment.
///
/// This is what a load-time resolver calls. It performs no allocation and no
/// logging.
#[must_use]
pub fn probe() -> Caps {
  #[cfg(miri)]
  {
    compiled_features()
  }

  #[cfg(all(not(miri), any(target_arch = "x86_64", target_arch = "x86")))]
  {
    arch::x86::probe()
  }

  #[cfg(all(not(miri), any(target_arch = "aarch64", target_arch = "arm")))]
  {
    arch::arm::probe()
  }

  #[cfg(all(not(miri), any(target_arch = "wasm32", target_arch = "wasm64")))]
  {
    arch::wasm::probe()
  }

  #[cfg(all(
    not(miri),
    not(any(
      target_arch = "x86_64",
      target_arch = "x86",
      target_arch = "aarch64",
      target_arch = "arm",
      target_arch = "wasm32",
      target_arch = "wasm64"
    ))
  ))]
  {
    compiled_features()
  }
}

#[cold]
fn init() -> Caps {
  let overridden = cache_override::get_override();
  let caps = match overridden {
    Some(caps) => caps,
    None => limit_from_env(probe()),
  };
  tracing::debug!(
    caps = %caps,
    source = if overridden.is_some() { "override" } else { "probe" },
    "cpu capabilities detected"
  );
  caps
}

#[cfg(feature = "std")]
fn limit_from_env(caps: Caps) -> Caps {
  if !PROBES_HARDWARE {
    return caps;
  }
  match std::env::var(ENV_CAPS) {
    Ok(value) => apply_limit(caps, &value),
    Err(_) => caps,
  }
}

/// `caps` under the ceiling described by `value`, or `caps` itself when
/// `value` doesn't parse.
#[cfg(feature = "std")]
fn apply_limit(caps: Caps, value: &str) -> Caps {
  match value.parse::<Caps>() {
    Ok(limit) => caps & Family::current().ceiling(limit),
    Err(err) => {
      tracing::warn!(var = ENV_CAPS, value = %value, error = %err, "ignoring invalid capability list");
      caps
    }
  }
}

#[cfg(not(feature = "std"))]
#[inline(always)]
fn limit_from_env(caps: Caps) -> Caps {
  caps
}

#[cfg(test)]
mod tests;
