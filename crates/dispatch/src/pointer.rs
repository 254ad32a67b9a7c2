//! Cached-pointer binding.
//!
//! A process-wide slot per dispatched function. The first call selects a
//! variant from [`runtime_features()`](cpu_caps::runtime_features) and stores
//! its index; every later call is one atomic load plus one indirect call.
//!
//! The slot can be reassigned with [`rebind`](CachedPointer::rebind) or
//! [`set`](CachedPointer::set), e.g. to force a capability set in tests.
//! Reassignment is memory-safe, but calls racing with it may run either the
//! old or the new variant.

use core::sync::atomic::{AtomicUsize, Ordering};

use cpu_caps::Caps;

use crate::dispatch::{Registry, Selected};

const UNBOUND: usize = usize::MAX;

/// A lazily bound, reassignable dispatch slot.
///
/// ```
/// use cpu_dispatch::{CachedPointer, Registry, Variant};
/// use cpu_dispatch::cpu_caps::Caps;
///
/// fn sum_scalar(data: &[u32]) -> u32 {
///   data.iter().sum()
/// }
///
/// const SUM: Registry<fn(&[u32]) -> u32> =
///   Registry::new(&[Variant::new("scalar", Caps::SCALAR, sum_scalar as fn(&[u32]) -> u32)]).checked();
/// static SUM_SLOT: CachedPointer<fn(&[u32]) -> u32> = CachedPointer::new("sum", SUM);
///
/// assert_eq!((SUM_SLOT.get())(&[1, 2, 3]), 6);
/// assert_eq!(SUM_SLOT.name(), "scalar");
/// ```
pub struct CachedPointer<F: 'static> {
  label: &'static str,
  registry: Registry<F>,
  slot: AtomicUsize,
}

impl<F: Copy + 'static> CachedPointer<F> {
  /// Create an unbound slot. The registry should be [`checked`](Registry::checked).
  #[must_use]
  pub const fn new(label: &'static str, registry: Registry<F>) -> Self {
    Self {
      label,
      registry,
      slot: AtomicUsize::new(UNBOUND),
    }
  }

  /// The bound implementation, binding on first use.
  #[inline]
  #[must_use]
  pub fn get(&self) -> F {
    match self.registry.variants().get(self.slot.load(Ordering::Acquire)) {
      Some(variant) => variant.func,
      None => self.init().func,
    }
  }

  /// The bound variant, binding on first use.
  #[must_use]
  pub fn selected(&self) -> Selected<F> {
    match self.registry.variants().get(self.slot.load(Ordering::Acquire)) {
      Some(variant) => Selected::of(variant),
      None => self.init(),
    }
  }

  /// Name of the bound variant, binding on first use.
  #[inline]
  #[must_use]
  pub fn name(&self) -> &'static str {
    self.selected().name
  }

  /// Whether the slot has been bound.
  #[inline]
  #[must_use]
  pub fn is_bound(&self) -> bool {
    self.slot.load(Ordering::Acquire) != UNBOUND
  }

  /// Bind from the process's runtime features.
  ///
  /// Called implicitly by the first [`get`](CachedPointer::get); call it
  /// during startup to keep detection off the first call's path.
  #[cold]
  pub fn init(&self) -> Selected<F> {
    self.rebind(cpu_caps::runtime_features())
  }

  /// Rebind to the best variant for `features`.
  ///
  /// # Panics
  ///
  /// Panics if the registry can't serve `features`, which a checked registry
  /// rules out.
  pub fn rebind(&self, features: Caps) -> Selected<F> {
    let (index, variant) = match self.registry.pick(features) {
      Ok(picked) => picked,
      Err(err) => panic!("{}: {err}", self.label),
    };
    self.slot.store(index, Ordering::Release);

    tracing::debug!(
      slot = self.label,
      variant = variant.name,
      requires = %variant.requires,
      features = %features,
      "dispatch slot bound"
    );

    Selected::of(variant)
  }

  /// Force the variant called `name`, bypassing selection.
  ///
  /// Returns `None` (leaving the slot untouched) if no such variant exists.
  /// Nothing checks that the CPU supports the forced variant.
  pub fn set(&self, name: &str) -> Option<Selected<F>> {
    let (index, selected) = self.registry.find(name)?;
    self.slot.store(index, Ordering::Release);
    tracing::debug!(slot = self.label, variant = selected.name, "dispatch slot forced");
    Some(selected)
  }

  /// Diagnostic label of the slot.
  #[inline]
  #[must_use]
  pub const fn label(&self) -> &'static str {
    self.label
  }

  #[inline]
  #[must_use]
  pub const fn registry(&self) -> &Registry<F> {
    &self.registry
  }
}

#[cfg(test)]
mod tests {
  use cpu_caps::{Family, caps::x86};

  use super::*;
  use crate::dispatch::Variant;

  type Kernel = fn(u32) -> u32;

  fn scalar(x: u32) -> u32 {
    x
  }
  fn sse2(x: u32) -> u32 {
    x + 2
  }
  fn avx2(x: u32) -> u32 {
    x + 6
  }

  const REG: Registry<Kernel> = Registry::new(&[
    Variant::new("scalar", Caps::SCALAR, scalar as Kernel),
    Variant::new("sse2", x86::SSE2, sse2 as Kernel),
    Variant::new("avx2", x86::AVX2, avx2 as Kernel),
  ])
  .in_family(Family::X86)
  .checked();

  #[test]
  fn test_binds_lazily() {
    static SLOT: CachedPointer<Kernel> = CachedPointer::new("lazy", REG);
    assert!(!SLOT.is_bound());
    let _ = SLOT.get();
    assert!(SLOT.is_bound());
    assert_eq!(SLOT.label(), "lazy");
  }

  #[test]
  fn test_rebind_forces_features() {
    static SLOT: CachedPointer<Kernel> = CachedPointer::new("rebind", REG);

    assert_eq!(SLOT.rebind(Caps::SCALAR).name, "scalar");
    assert_eq!((SLOT.get())(1), 1);

    let sse = Family::X86.ceiling(x86::SSE42);
    assert_eq!(SLOT.rebind(sse).name, "sse2");
    assert_eq!((SLOT.get())(1), 3);
    assert_eq!(SLOT.name(), "sse2");

    assert_eq!(SLOT.rebind(Family::X86.all()).name, "avx2");
    assert_eq!((SLOT.get())(1), 7);
  }

  #[test]
  fn test_set_by_name() {
    static SLOT: CachedPointer<Kernel> = CachedPointer::new("set", REG);

    let forced = SLOT.set("avx2").unwrap();
    assert_eq!(forced.requires, x86::AVX2);
    assert_eq!((SLOT.get())(0), 6);

    assert!(SLOT.set("neon").is_none());
    assert_eq!(SLOT.name(), "avx2");
  }

  #[test]
  #[cfg(not(miri))]
  fn test_init_uses_runtime_features() {
    static SLOT: CachedPointer<Kernel> = CachedPointer::new("init", REG);
    let selected = SLOT.init();
    let expected = REG.bind(cpu_caps::runtime_features());
    assert_eq!(selected.name, expected.name);
  }
}
