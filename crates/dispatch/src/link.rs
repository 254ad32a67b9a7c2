//! Link-resolved binding (GNU IFUNC).
//!
//! The dynamic loader calls a resolver once while relocating the object and
//! patches the symbol with the address it returns. Afterwards a dispatched
//! call is an ordinary direct call, with no branch and no load on the path.
//!
//! Requirements, checked at build time through [`LINK_RESOLVED_AVAILABLE`]:
//!
//! - ELF with the glibc loader (`target_os = "linux"`, `target_env = "gnu"`)
//! - x86_64 or aarch64
//! - the `ifunc` feature (on by default)
//!
//! Everywhere else [`dispatched_ifunc!`](crate::dispatched_ifunc) falls back to
//! a [`CachedPointer`](crate::CachedPointer) with the same call surface.
//!
//! The resolver runs before the process is fully initialized. It probes the
//! hardware directly and ignores the detection override, the
//! `CPU_DISPATCH_CAPS` limit and the detection cache; it never logs.

use core::fmt;

use cpu_caps::Caps;

/// Whether `dispatched_ifunc!` resolves through the loader in this build.
pub const LINK_RESOLVED_AVAILABLE: bool = cfg!(all(
  feature = "ifunc",
  target_os = "linux",
  target_env = "gnu",
  any(target_arch = "x86_64", target_arch = "aarch64"),
  not(miri)
));

/// Strategy a dispatched function ended up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
  /// Resolved once by the dynamic loader.
  LinkResolved,
  /// Resolved on first call into a process-wide slot.
  CachedPointer,
  /// Wired at build time from the compiled features.
  Direct,
}

impl Binding {
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::LinkResolved => "link-resolved",
      Self::CachedPointer => "cached-pointer",
      Self::Direct => "direct",
    }
  }

  /// The strategy `dispatched_ifunc!` produces in this build.
  #[inline]
  #[must_use]
  pub const fn best_available() -> Self {
    if LINK_RESOLVED_AVAILABLE {
      Self::LinkResolved
    } else {
      Self::CachedPointer
    }
  }
}

impl fmt::Display for Binding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Feature set seen by a loader-time resolver.
///
/// On aarch64 glibc passes `AT_HWCAP` as the first resolver argument (with
/// `_IFUNC_ARG_HWCAP` in bit 62 when more arguments follow). On x86 the
/// argument carries nothing useful and CPUID is queried instead.
#[doc(hidden)]
#[inline]
#[must_use]
pub fn resolver_features(hwcap: u64) -> Caps {
  #[cfg(target_arch = "aarch64")]
  {
    const IFUNC_ARG_HWCAP: u64 = 1 << 62;
    cpu_caps::from_aarch64_hwcap(hwcap & !IFUNC_ARG_HWCAP)
  }

  #[cfg(not(target_arch = "aarch64"))]
  {
    let _ = hwcap;
    cpu_caps::probe()
  }
}
