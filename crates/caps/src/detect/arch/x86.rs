// ─────────────────────────────────────────────────────────────────────────────
// x86/x86_64 Detection
// ─────────────────────────────────────────────────────────────────────────────
//
// CPUID reports what the CPU implements, not what the OS saves on a context
// switch. AVX and AVX-512 additionally need OSXSAVE and the matching XCR0
// state bits, otherwise using them faults.
//
// Base tiers are probed as a chain: the first missing tier ends the probe, so
// a CPU (or hypervisor) reporting AVX2 without AVX never gets AVX2.

#[cfg(target_arch = "x86")]
use core::arch::x86::{__cpuid, __cpuid_count, _xgetbv, CpuidResult};
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{__cpuid, __cpuid_count, _xgetbv, CpuidResult};

use crate::caps::{Caps, x86};

// XCR0 bits 1-2: XMM + YMM state.
const XCR0_AVX_MASK: u64 = 0x6;
// XCR0 bits 5-7: opmask + ZMM_Hi256 + Hi16_ZMM state.
const XCR0_AVX512_MASK: u64 = 0xE0;

const EXT_FEATURES_LEAF: u32 = 0x8000_0001;

/// Raw CPUID/XGETBV words the decoder looks at.
#[derive(Clone, Copy, Debug, Default)]
struct Cpuid {
  max_leaf: u32,
  max_ext_leaf: u32,
  leaf1_ecx: u32,
  leaf1_edx: u32,
  leaf7_ebx: u32,
  ext1_ecx: u32,
  xcr0: u64,
}

#[inline(always)]
const fn bit(word: u32, n: u32) -> bool {
  word & (1 << n) != 0
}

/// Probe the executing CPU.
pub(crate) fn probe() -> Caps {
  decode(&read())
}

#[allow(unused_unsafe)]
fn cpuid(leaf: u32) -> CpuidResult {
  // SAFETY: CPUID exists on every x86_64 CPU and was checked on 32-bit x86.
  unsafe { __cpuid(leaf) }
}

fn read() -> Cpuid {
  #[cfg(target_arch = "x86")]
  if !core::arch::x86::has_cpuid() {
    return Cpuid::default();
  }

  let mut words = Cpuid {
    max_leaf: cpuid(0).eax,
    max_ext_leaf: cpuid(0x8000_0000).eax,
    ..Cpuid::default()
  };

  if words.max_leaf >= 1 {
    let leaf1 = cpuid(1);
    words.leaf1_ecx = leaf1.ecx;
    words.leaf1_edx = leaf1.edx;

    // OSXSAVE (bit 27): the OS enabled XSAVE, so XGETBV is available.
    if bit(leaf1.ecx, 27) {
      // SAFETY: XGETBV is valid once OSXSAVE is reported.
      words.xcr0 = unsafe { _xgetbv(0) };
    }
  }

  if words.max_leaf >= 7 {
    #[allow(unused_unsafe)]
    // SAFETY: leaf 7 is within the reported maximum leaf.
    let leaf7 = unsafe { __cpuid_count(7, 0) };
    words.leaf7_ebx = leaf7.ebx;
  }

  if words.max_ext_leaf >= EXT_FEATURES_LEAF {
    words.ext1_ecx = cpuid(EXT_FEATURES_LEAF).ecx;
  }

  words
}

fn decode(w: &Cpuid) -> Caps {
  let mut caps = Caps::SCALAR;
  if w.max_leaf < 1 {
    return caps;
  }

  // ─── Extras (independent of the tier chain) ───
  if bit(w.leaf1_ecx, 23) {
    caps |= x86::POPCNT;
  }
  // LZCNT is always taken from CPUID: on CPUs without it the encoding runs
  // as BSR and returns a different result instead of faulting.
  if bit(w.ext1_ecx, 5) {
    caps |= x86::LZCNT;
  }

  // ─── SSE chain ───
  let sse = [
    (x86::SSE2, bit(w.leaf1_edx, 26)),
    (x86::SSE3, bit(w.leaf1_ecx, 0)),
    (x86::SSSE3, bit(w.leaf1_ecx, 9)),
    (x86::SSE41, bit(w.leaf1_ecx, 19)),
    (x86::SSE42, bit(w.leaf1_ecx, 20)),
  ];
  for (tier, present) in sse {
    if !present {
      return caps;
    }
    caps |= tier;
  }

  // ─── AVX (needs OS support) ───
  let osxsave = bit(w.leaf1_ecx, 27);
  let os_avx = osxsave && (w.xcr0 & XCR0_AVX_MASK) == XCR0_AVX_MASK;
  if !(bit(w.leaf1_ecx, 28) && os_avx) {
    return caps;
  }
  caps |= x86::AVX;

  if bit(w.leaf1_ecx, 12) {
    caps |= x86::AVX_FMA;
  }
  if bit(w.leaf1_ecx, 29) {
    caps |= x86::AVX_F16C;
  }

  // ─── AVX2 / AVX-512 (leaf 7) ───
  if w.max_leaf < 7 || !bit(w.leaf7_ebx, 5) {
    return caps;
  }
  caps |= x86::AVX2;

  let os_avx512 = (w.xcr0 & XCR0_AVX512_MASK) == XCR0_AVX512_MASK;
  if bit(w.leaf7_ebx, 16) && os_avx512 {
    caps |= x86::AVX512F;
  }

  caps
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
