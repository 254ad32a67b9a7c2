// ─────────────────────────────────────────────────────────────────────────────
// ARM / AArch64 Detection
// ─────────────────────────────────────────────────────────────────────────────

use crate::caps::{Caps, arm};

// linux/arch/arm64/include/uapi/asm/hwcap.h
const HWCAP_ASIMDHP: u64 = 1 << 10;

// linux/arch/arm/include/uapi/asm/hwcap.h
const HWCAP_NEON: u64 = 1 << 12;
const HWCAP_VFPV4: u64 = 1 << 16;

/// Decode an AArch64 `AT_HWCAP` word.
///
/// NEON with FMA is architectural on AArch64, so the result always carries
/// `Neon | NeonFma`. A load-time resolver receives this word as its first
/// argument.
#[inline]
#[must_use]
pub const fn from_aarch64_hwcap(hwcap: u64) -> Caps {
  let mut caps = arm::NEON.union(arm::NEON_FMA);
  if hwcap & HWCAP_ASIMDHP != 0 {
    caps = caps.union(arm::NEON_FP16);
  }
  caps
}

/// Decode a 32-bit ARM `AT_HWCAP` word.
///
/// `NeonFma` requires VFPv4 *and* NEON.
#[inline]
#[must_use]
pub const fn from_arm_hwcap(hwcap: u64) -> Caps {
  if hwcap & HWCAP_NEON == 0 {
    return Caps::SCALAR;
  }
  let mut caps = arm::NEON;
  if hwcap & HWCAP_VFPV4 != 0 {
    caps = caps.union(arm::NEON_FMA);
  }
  caps
}

/// Probe the executing CPU.
///
/// The compiled set is always included: a binary built for a feature can only
/// be running on a CPU that has it.
#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
pub(crate) fn probe() -> Caps {
  let compiled = crate::compiled_features();

  #[cfg(all(feature = "std", any(target_os = "linux", target_os = "android")))]
  if let Some(hwcap) = read_hwcap() {
    #[cfg(target_arch = "aarch64")]
    return compiled | from_aarch64_hwcap(hwcap);
    #[cfg(target_arch = "arm")]
    return compiled | from_arm_hwcap(hwcap);
  }

  #[cfg(all(target_arch = "aarch64", feature = "std", target_vendor = "apple"))]
  if sysctl_flag(c"hw.optional.neon_fp16") {
    return compiled | arm::NEON | arm::NEON_FMA | arm::NEON_FP16;
  }

  compiled
}

/// Read `AT_HWCAP` from the ELF auxiliary vector.
///
/// `/proc/self/auxv` is a list of native-word `(type, value)` pairs ending in
/// `AT_NULL`. Pure Rust, no libc.
#[cfg(all(
  any(target_arch = "aarch64", target_arch = "arm"),
  feature = "std",
  any(target_os = "linux", target_os = "android")
))]
fn read_hwcap() -> Option<u64> {
  use std::{fs::File, io::Read};

  const AT_NULL: usize = 0;
  const AT_HWCAP: usize = 16;
  const WORD: usize = core::mem::size_of::<usize>();

  let mut file = File::open("/proc/self/auxv").ok()?;
  let mut buf = [0u8; 4096];
  let n = file.read(&mut buf).ok()?;

  for entry in buf.get(..n)?.chunks_exact(2 * WORD) {
    let a_type = usize::from_ne_bytes(entry.get(..WORD)?.try_into().ok()?);
    let a_val = usize::from_ne_bytes(entry.get(WORD..)?.try_into().ok()?);
    match a_type {
      AT_HWCAP => return Some(a_val as u64),
      AT_NULL => break,
      _ => {}
    }
  }
  None
}

/// Read a boolean `hw.optional.*` sysctl. Missing keys read as `false`.
#[cfg(all(target_arch = "aarch64", feature = "std", target_vendor = "apple"))]
fn sysctl_flag(name: &core::ffi::CStr) -> bool {
  // SAFETY: sysctlbyname(3) from libSystem, which every Apple binary links.
  unsafe extern "C" {
    fn sysctlbyname(
      name: *const core::ffi::c_char,
      oldp: *mut core::ffi::c_void,
      oldlenp: *mut usize,
      newp: *const core::ffi::c_void,
      newlen: usize,
    ) -> i32;
  }

  let mut value: u32 = 0;
  let mut size = core::mem::size_of::<u32>();

  // SAFETY: `name` is NUL-terminated and the output buffer holds a u32.
  let ret = unsafe {
    sysctlbyname(
      name.as_ptr(),
      core::ptr::addr_of_mut!(value).cast(),
      core::ptr::addr_of_mut!(size),
      core::ptr::null(),
      0,
    )
  };

  ret == 0 && value != 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_aarch64_hwcap() {
    assert_eq!(from_aarch64_hwcap(0), arm::NEON | arm::NEON_FMA);
    assert_eq!(
      from_aarch64_hwcap(HWCAP_ASIMDHP | 0b11),
      arm::NEON | arm::NEON_FMA | arm::NEON_FP16
    );
    // Unrelated bits are ignored.
    assert_eq!(from_aarch64_hwcap(!HWCAP_ASIMDHP), arm::NEON | arm::NEON_FMA);
  }

  #[test]
  fn test_arm_hwcap() {
    assert_eq!(from_arm_hwcap(0), Caps::SCALAR);
    assert_eq!(from_arm_hwcap(HWCAP_VFPV4), Caps::SCALAR);
    assert_eq!(from_arm_hwcap(HWCAP_NEON), arm::NEON);
    assert_eq!(from_arm_hwcap(HWCAP_NEON | HWCAP_VFPV4), arm::NEON | arm::NEON_FMA);
  }

  #[test]
  #[cfg(all(target_arch = "aarch64", not(miri)))]
  fn test_probe_has_baseline() {
    let caps = probe();
    assert!(caps.has(arm::NEON | arm::NEON_FMA));
  }

  #[test]
  #[cfg(all(
    any(target_arch = "aarch64", target_arch = "arm"),
    feature = "std",
    any(target_os = "linux", target_os = "android"),
    not(miri)
  ))]
  fn test_auxv_readable() {
    assert!(read_hwcap().is_some());
  }
}
