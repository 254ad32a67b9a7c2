//! Fuzz target for tag-list parsing.
//!
//! Tests that:
//! - Arbitrary strings never panic the parser
//! - Error offsets point inside the input
//! - Rendering a parsed set and parsing it again is lossless

#![no_main]

use cpu_caps::{Caps, Family, ParseCapsError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
  for family in [Family::X86, Family::Arm, Family::Wasm] {
    match Caps::parse_in(family, input) {
      Ok(caps) => {
        assert!(caps.is_subset_of(family.all()));
        let rendered = caps.display_in(family).to_string();
        assert_eq!(Caps::parse_in(family, &rendered), Ok(caps), "{rendered}");
      }
      Err(ParseCapsError::UnknownTag { at }) => assert!(at < input.len() && input.is_char_boundary(at)),
    }
  }
});
