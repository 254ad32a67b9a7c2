// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "std")]
use std::sync::{OnceLock, RwLock};

use crate::{caps::Caps, error::OverrideError};

#[cfg(feature = "std")]
static STD_CACHE: OnceLock<Caps> = OnceLock::new();

#[cfg(feature = "std")]
static OVERRIDE: RwLock<Option<Caps>> = RwLock::new(None);

/// Return the cached capabilities, running `f` on first use.
#[inline]
pub(super) fn get_or_init(f: fn() -> Caps) -> Caps {
  #[cfg(feature = "std")]
  {
    *STD_CACHE.get_or_init(f)
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::CACHE.get_or_init(f)
  }

  // Nothing to cache in; probing is cheap enough to repeat.
  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    f()
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Override System
// ─────────────────────────────────────────────────────────────────────────────

/// Set a detection override.
///
/// Must be called **before** the first call to
/// [`runtime_features()`](crate::runtime_features). Intended for bare-metal
/// targets that know their CPU and for tests.
///
/// # Panics
///
/// Panics if detection already ran or overrides are unsupported, see
/// [`try_set_override`].
#[cold]
pub fn set_override(value: Option<Caps>) {
  if let Err(err) = try_set_override(value) {
    panic!("cpu_caps::set_override failed: {err}");
  }
}

/// Try to set a detection override.
///
/// Contract: pre-init only. Once [`runtime_features()`](crate::runtime_features)
/// has cached its result this returns [`OverrideError::AlreadyInitialized`].
/// `None` removes a previously installed override.
///
/// # Errors
///
/// - [`OverrideError::AlreadyInitialized`] after detection ran.
/// - [`OverrideError::Unsupported`] without `std` on targets lacking 32-bit atomics.
#[cold]
pub fn try_set_override(value: Option<Caps>) -> Result<(), OverrideError> {
  #[cfg(feature = "std")]
  {
    if STD_CACHE.get().is_some() {
      return Err(OverrideError::AlreadyInitialized);
    }

    if let Ok(mut guard) = OVERRIDE.write() {
      *guard = value;
      return Ok(());
    }
    Err(OverrideError::Unsupported)
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::CACHE.try_set_override(value)
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    let _ = value;
    Err(OverrideError::Unsupported)
  }
}

/// Clear the detection override.
///
/// # Panics
///
/// Same conditions as [`set_override`].
#[cold]
pub fn clear_override() {
  set_override(None);
}

/// Check if an override is set.
#[inline]
#[must_use]
pub fn has_override() -> bool {
  get_override().is_some()
}

pub(super) fn get_override() -> Option<Caps> {
  #[cfg(feature = "std")]
  {
    OVERRIDE.read().ok().and_then(|guard| *guard)
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::CACHE.get_override()
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    None
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomic Cache (no_std with 32-bit atomics)
// ─────────────────────────────────────────────────────────────────────────────

// Also built for tests with `std` so the state machine is exercised either way.
#[cfg(all(target_has_atomic = "32", any(test, not(feature = "std"))))]
#[cfg_attr(feature = "std", allow(dead_code))]
mod atomic_cache {
  use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

  use crate::{caps::Caps, error::OverrideError};

  const STATE_UNINIT: u8 = 0;
  const STATE_INITING: u8 = 1;
  const STATE_READY: u8 = 2;

  pub(super) static CACHE: AtomicCache = AtomicCache::new();

  /// One-shot capability cache plus a pre-init override, lock-free.
  pub(super) struct AtomicCache {
    state: AtomicU8,
    cached: AtomicU32,
    override_set: AtomicBool,
    override_value: AtomicU32,
  }

  impl AtomicCache {
    pub(super) const fn new() -> Self {
      Self {
        state: AtomicU8::new(STATE_UNINIT),
        cached: AtomicU32::new(0),
        override_set: AtomicBool::new(false),
        override_value: AtomicU32::new(0),
      }
    }

    pub(super) fn get_or_init(&self, f: fn() -> Caps) -> Caps {
      if self.state.load(Ordering::Acquire) == STATE_READY {
        return self.load_cached();
      }

      match self
        .state
        .compare_exchange(STATE_UNINIT, STATE_INITING, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => {
          let result = f();
          self.cached.store(result.bits(), Ordering::Relaxed);
          self.state.store(STATE_READY, Ordering::Release);
          result
        }
        Err(STATE_INITING) => {
          while self.state.load(Ordering::Acquire) == STATE_INITING {
            core::hint::spin_loop();
          }
          self.load_cached()
        }
        Err(_) => self.load_cached(),
      }
    }

    // Only read after observing STATE_READY with Acquire.
    fn load_cached(&self) -> Caps {
      Caps(self.cached.load(Ordering::Relaxed))
    }

    pub(super) fn try_set_override(&self, value: Option<Caps>) -> Result<(), OverrideError> {
      if self.state.load(Ordering::Acquire) != STATE_UNINIT {
        return Err(OverrideError::AlreadyInitialized);
      }

      // Payload first; readers gate on `override_set`.
      self.override_value.store(value.map_or(0, Caps::bits), Ordering::Relaxed);
      self.override_set.store(value.is_some(), Ordering::Release);
      Ok(())
    }

    pub(super) fn get_override(&self) -> Option<Caps> {
      if !self.override_set.load(Ordering::Acquire) {
        return None;
      }
      Some(Caps(self.override_value.load(Ordering::Relaxed)))
    }
  }

}
