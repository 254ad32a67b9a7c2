use super::*;
use crate::caps::{Family, TagKind};

// ─────────────────────────────────────────────────────────────────────────────
// Compile-Time Detection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compiled_features_is_const() {
  const COMPILED: Caps = compiled_features();
  assert_eq!(COMPILED, compiled_features());
}

#[test]
fn test_compiled_within_family() {
  let compiled = compiled_features();
  assert!(compiled.is_subset_of(Family::current().all()));
}

#[test]
fn test_compiled_tiers_are_downward_closed() {
  // Enabling a tier through target features enables every lower tier too.
  let compiled = compiled_features();
  let top = compiled.highest_base();
  for &tier in Family::current().base_tiers() {
    if tier.bits() <= top.bits() {
      assert!(compiled.has(tier), "{tier:?} below {top:?} missing from {compiled:?}");
    }
  }
}

#[test]
fn test_default_split() {
  assert!(DEFAULT_BASE.base_count() <= 1);
  assert_eq!(DEFAULT_BASE, compiled_features().highest_base());
  assert_eq!(DEFAULT_EXTRA, compiled_features().extras());
  assert_eq!(DEFAULT, DEFAULT_BASE | DEFAULT_EXTRA);
  assert!(DEFAULT.is_subset_of(compiled_features()));
}

#[test]
#[cfg(target_arch = "x86_64")]
fn test_x86_64_baseline() {
  use crate::caps::x86;
  assert!(compiled_features().has(x86::SSE2));
}

#[test]
#[cfg(target_arch = "aarch64")]
fn test_aarch64_baseline() {
  use crate::caps::arm;
  assert!(compiled_features().has(arm::NEON | arm::NEON_FMA));
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime Detection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_runtime_within_family() {
  let runtime = runtime_features();
  assert!(runtime.is_subset_of(Family::current().all()));
}

#[test]
fn test_runtime_is_cached() {
  assert_eq!(runtime_features(), runtime_features());
}

#[test]
#[cfg(not(miri))]
fn test_probe_consistent() {
  assert_eq!(probe(), probe());
}

#[test]
#[cfg(not(miri))]
fn test_probe_covers_compiled_base() {
  // The build's assumed tiers run on this machine, so the probe must see
  // them. LZCNT is excluded: it is never trusted from the build flags.
  let compiled = compiled_features();
  let probed = probe();
  assert!(probed.has(compiled.base()), "probed {probed:?}, compiled {compiled:?}");
}

#[test]
#[cfg(any(miri, not(any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64", target_arch = "arm"))))]
fn test_no_probe_means_compiled() {
  assert_eq!(probe(), compiled_features());
}

#[test]
fn test_probe_tiers_downward_closed() {
  let probed = probe();
  let top = probed.highest_base();
  let family = Family::current();
  for tag in family.tags() {
    if tag.kind() == TagKind::Base && tag.caps().bits() <= top.bits() {
      assert!(probed.has(tag.caps()), "{} missing below {top:?}", tag.name());
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment Limit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_probes_hardware_matches_probe_source() {
  let expected = cfg!(all(
    not(miri),
    any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64", target_arch = "arm")
  ));
  assert_eq!(PROBES_HARDWARE, expected);
}

#[test]
#[cfg(feature = "std")]
fn test_apply_limit() {
  let all = Family::current().all();
  assert_eq!(apply_limit(all, "Scalar"), Caps::SCALAR);
  assert_eq!(apply_limit(all, "Scalar\n"), Caps::SCALAR);
  assert_eq!(apply_limit(all, "not a tag"), all);
  assert_eq!(apply_limit(Caps::SCALAR, "Scalar"), Caps::SCALAR);
}

#[test]
#[cfg(all(feature = "std", any(target_arch = "x86_64", target_arch = "x86")))]
fn test_apply_limit_keeps_lower_tiers_and_listed_extras() {
  use crate::caps::x86;

  let machine = Family::X86.ceiling(x86::AVX2) | x86::POPCNT | x86::LZCNT;
  let limited = apply_limit(machine, "Sse41|Popcnt\n");
  assert_eq!(limited, Family::X86.ceiling(x86::SSE41) | x86::POPCNT);
  // A ceiling above the machine adds nothing.
  assert_eq!(apply_limit(machine, "Avx512f|AvxFma"), Family::X86.ceiling(x86::AVX2));
}

// ─────────────────────────────────────────────────────────────────────────────
// Override
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_late_override_rejected() {
  let _ = runtime_features();
  assert_eq!(try_set_override(Some(Caps::SCALAR)), Err(crate::OverrideError::AlreadyInitialized));
  assert!(!has_override());
}
