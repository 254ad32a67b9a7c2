//! Fuzz target for priority ranking and tag conversion.
//!
//! Tests that:
//! - Priority never panics through the fallible API
//! - A higher base tier always outranks a lower one, whatever the extras
//! - compare_in() agrees with try_priority_in() and only errors on real ties
//! - converts_to() implies "safe to run" (subset of the target's feature set)

#![no_main]

use arbitrary::Arbitrary;
use cpu_caps::{Caps, ConfigError, Family, priority};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
  a: u32,
  b: u32,
}

fuzz_target!(|input: Input| {
  let family = Family::X86;
  let a = Caps::from_raw(input.a);
  let b = Caps::from_raw(input.b);

  let pa = priority::try_priority_in(a, family);
  let pb = priority::try_priority_in(b, family);

  if a.base_count() > 1 {
    assert_eq!(pa, Err(ConfigError::MultipleBaseTags(a)));
  }

  match (pa, pb) {
    (Ok(pa), Ok(pb)) => {
      if a.base().bits() > b.base().bits() {
        assert!(pa > pb, "{a:?} must outrank {b:?}");
      }
      match priority::compare_in(a, b, family) {
        Ok(ordering) => assert_eq!(ordering, pa.cmp(&pb)),
        Err(ConfigError::Ambiguous { .. }) => assert!(pa == pb && a != b),
        Err(err) => panic!("unexpected {err:?}"),
      }

      if a.converts_to(b) {
        let features = family.ceiling(b);
        assert!(features.has(a), "{a:?} converts to {b:?} but is not contained in {features:?}");
      }
    }
    _ => assert!(priority::compare_in(a, b, family).is_err()),
  }
});
