//! Fuzz target for Caps bitset operations.
//!
//! Tests that:
//! - No panics on arbitrary input
//! - Union/intersection are commutative, associative and distributive
//! - has() is consistent with has_bit()
//! - base() and extras() partition the mask

#![no_main]

use arbitrary::Arbitrary;
use cpu_caps::Caps;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
  a: u32,
  b: u32,
  c: u32,
}

fuzz_target!(|input: Input| {
  let a = Caps::from_raw(input.a);
  let b = Caps::from_raw(input.b);
  let c = Caps::from_raw(input.c);

  // ─── Invariant: Self-containment ───
  assert!(a.has(a), "caps must contain itself");
  assert_eq!(a.count(), input.a.count_ones());
  assert_eq!(a.is_empty(), input.a == 0);

  // ─── Identity / absorbing ───
  assert_eq!(a | Caps::SCALAR, a);
  assert_eq!(a & Caps::SCALAR, Caps::SCALAR);
  assert_eq!(!!a, a);

  // ─── Commutativity / associativity / distributivity ───
  assert_eq!(a | b, b | a);
  assert_eq!(a & b, b & a);
  assert_eq!((a | b) | c, a | (b | c));
  assert_eq!((a & b) & c, a & (b & c));
  assert_eq!(a & (b | c), (a & b) | (a & c));

  // ─── Subset relationships ───
  assert!((a | b).has(a) && (a | b).has(b));
  assert!((a & b).is_subset_of(a) && (a & b).is_subset_of(b));
  assert_eq!(a.difference(b) | (a & b), a);

  // ─── has_bit consistency ───
  for n in 0u8..32 {
    assert_eq!(a.has_bit(n), input.a & (1 << n) != 0, "has_bit({n})");
  }

  // ─── Base / extra partition ───
  assert_eq!(a.base() | a.extras(), a);
  assert!((a.base() & a.extras()).is_empty());
  assert!(a.highest_base().base_count() <= 1);
});
