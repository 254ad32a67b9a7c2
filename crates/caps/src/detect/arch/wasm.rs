// ─────────────────────────────────────────────────────────────────────────────
// WebAssembly Detection
// ─────────────────────────────────────────────────────────────────────────────

use crate::caps::Caps;

/// A module using SIMD instructions fails validation on engines without them,
/// so the running engine always supports exactly what was compiled in.
#[inline]
pub(crate) fn probe() -> Caps {
  crate::compiled_features()
}
