//! Declaration macros.
//!
//! | Macro | Produces |
//! |-------|----------|
//! | [`variants!`](crate::variants) | `&[Variant<F>]` |
//! | [`registry!`](crate::registry) | a checked [`Registry<F>`](crate::Registry) |
//! | [`dispatcher!`](crate::dispatcher) | `fn(Caps) -> F` over a checked registry |
//! | [`dispatched_pointer!`](crate::dispatched_pointer) | a function bound through a [`CachedPointer`](crate::CachedPointer) |
//! | [`dispatched_direct!`](crate::dispatched_direct) | a function wired to the build's variant |
//! | [`dispatched_ifunc!`](crate::dispatched_ifunc) | a loader-resolved function (or the pointer fallback) |
//!
//! The three `dispatched_*` macros take the same signature line and also
//! declare `<NAME>_BINDING`, the [`Binding`](crate::Binding) they ended up
//! with. `dispatched_pointer!` additionally declares `<NAME>_SLOT`.
//!
//! Registries have to be `const` items: `dispatched_direct!` and the loader
//! resolver select from them at compile time and load time.

/// Build a variant table: `"name" => tags => function`.
///
/// ```
/// use cpu_dispatch::{Variant, variants};
/// use cpu_dispatch::cpu_caps::{Caps, caps::x86};
///
/// fn scalar(x: u32) -> u32 { x.count_ones() }
/// fn fast(x: u32) -> u32 { x.count_ones() }
///
/// const VARIANTS: &[Variant<fn(u32) -> u32>] = variants![
///   "scalar" => Caps::SCALAR => scalar,
///   "sse42+popcnt" => x86::SSE42.with(x86::POPCNT) => fast,
/// ];
/// assert_eq!(VARIANTS.len(), 2);
/// ```
#[macro_export]
macro_rules! variants {
  ($($name:literal => $tags:expr => $func:expr),+ $(,)?) => {
    &[$($crate::Variant::new($name, $tags, $func as _)),+]
  };
}

/// Build a [`checked`](crate::Registry::checked) registry.
///
/// Listed extras go first, in brackets. Without them the registry dispatches
/// on base tiers only.
///
/// ```
/// use cpu_dispatch::{Registry, registry};
/// use cpu_dispatch::cpu_caps::{Caps, caps::x86};
///
/// fn scalar() -> u8 { 0 }
/// fn avx2_popcnt() -> u8 { 1 }
///
/// # #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
/// const REG: Registry<fn() -> u8> = registry![
///   extras: [x86::POPCNT];
///   "scalar" => Caps::SCALAR => scalar,
///   "avx2+popcnt" => x86::AVX2.with(x86::POPCNT) => avx2_popcnt,
/// ];
/// assert_eq!(REG.extras(), x86::POPCNT);
/// # }
/// ```
///
/// Extras are checked against the target's family, so an x86 extra in a
/// registry built for ARM is a compile error.
#[macro_export]
macro_rules! registry {
  (extras: [$($extra:expr),* $(,)?]; $($name:literal => $tags:expr => $func:expr),+ $(,)?) => {
    $crate::Registry::with_extras($crate::variants![$($name => $tags => $func),+], &[$($extra),*]).checked()
  };
  ($($name:literal => $tags:expr => $func:expr),+ $(,)?) => {
    $crate::Registry::new($crate::variants![$($name => $tags => $func),+]).checked()
  };
}

/// Declare a selection function `fn(Caps) -> F`.
///
/// The registry behind it is a checked `const`, so a contradictory
/// declaration (ambiguity, missing scalar variant, a base tier listed as an
/// extra) fails to compile. An empty extra list gives a base-only dispatcher.
///
/// ```
/// use cpu_dispatch::dispatcher;
/// use cpu_dispatch::cpu_caps::{Caps, caps::x86};
///
/// type CountFn = fn(u64) -> u32;
///
/// fn count_scalar(x: u64) -> u32 { x.count_ones() }
/// fn count_popcnt(x: u64) -> u32 { x.count_ones() }
///
/// # #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
/// dispatcher! {
///   /// Picks a popcount kernel.
///   pub fn select_count -> CountFn {
///     extras: [x86::POPCNT],
///     "scalar" => Caps::SCALAR => count_scalar,
///     "popcnt" => x86::POPCNT => count_popcnt,
///   }
/// }
///
/// let count = select_count(cpu_dispatch::cpu_caps::runtime_features());
/// assert_eq!(count(0b1011), 3);
/// # }
/// ```
#[macro_export]
macro_rules! dispatcher {
  (
    $(#[$meta:meta])*
    $vis:vis fn $name:ident -> $ty:ty {
      extras: [$($extra:expr),* $(,)?],
      $($variant:literal => $tags:expr => $func:expr),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[must_use]
    $vis fn $name(features: $crate::cpu_caps::Caps) -> $ty {
      const REGISTRY: $crate::Registry<$ty> = $crate::registry![
        extras: [$($extra),*];
        $($variant => $tags => $func),+
      ];
      REGISTRY.dispatch(features)
    }
  };
}

/// Declare a function bound through a [`CachedPointer`](crate::CachedPointer).
///
/// ```
/// use cpu_dispatch::{Binding, Registry, dispatched_pointer, registry};
/// use cpu_dispatch::cpu_caps::{Caps, caps::x86};
///
/// fn sum_scalar(data: &[u32]) -> u32 { data.iter().sum() }
/// fn sum_wide(data: &[u32]) -> u32 { data.iter().sum() }
///
/// const SUM: Registry<fn(&[u32]) -> u32> = registry![
///   "scalar" => Caps::SCALAR => sum_scalar,
///   "avx2" => x86::AVX2 => sum_wide,
/// ];
///
/// dispatched_pointer! {
///   pub fn sum(data: &[u32]) -> u32 = SUM;
/// }
///
/// assert_eq!(sum(&[1, 2, 3]), 6);
/// assert!(SUM_SLOT.is_bound());
/// assert_eq!(SUM_BINDING, Binding::CachedPointer);
/// ```
#[macro_export]
macro_rules! dispatched_pointer {
  (
    $(#[$meta:meta])*
    $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? = $registry:expr;
  ) => {
    $crate::__private::paste! {
      #[allow(dead_code)]
      $vis static [<$name:upper _SLOT>]: $crate::CachedPointer<fn($($ty),*) $(-> $ret)?> =
        $crate::CachedPointer::new(stringify!($name), $registry);

      #[allow(dead_code)]
      $vis const [<$name:upper _BINDING>]: $crate::Binding = $crate::Binding::CachedPointer;

      $(#[$meta])*
      #[inline]
      $vis fn $name($($arg: $ty),*) $(-> $ret)? {
        ([<$name:upper _SLOT>].get())($($arg),*)
      }
    }
  };
}

/// Declare a function wired at build time to the variant matching
/// [`cpu_caps::DEFAULT`](crate::cpu_caps::DEFAULT).
///
/// ```
/// use cpu_dispatch::{Binding, Registry, dispatched_direct, registry};
/// use cpu_dispatch::cpu_caps::Caps;
///
/// fn double(x: u32) -> u32 { x * 2 }
///
/// const DOUBLE: Registry<fn(u32) -> u32> = registry!["scalar" => Caps::SCALAR => double];
///
/// dispatched_direct! {
///   fn doubled(x: u32) -> u32 = DOUBLE;
/// }
///
/// assert_eq!(doubled(21), 42);
/// assert_eq!(DOUBLED_BINDING, Binding::Direct);
/// ```
#[macro_export]
macro_rules! dispatched_direct {
  (
    $(#[$meta:meta])*
    $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? = $registry:expr;
  ) => {
    $crate::__private::paste! {
      #[allow(dead_code)]
      $vis const [<$name:upper _BINDING>]: $crate::Binding = $crate::Binding::Direct;

      $(#[$meta])*
      #[inline]
      $vis fn $name($($arg: $ty),*) $(-> $ret)? {
        const IMPL: fn($($ty),*) $(-> $ret)? = $registry.bind_static();
        IMPL($($arg),*)
      }
    }
  };
}

/// Declare a function resolved by the dynamic loader (GNU IFUNC).
///
/// `symbol` names the emitted ELF symbol and must be unique in the final
/// link. Where [`LINK_RESOLVED_AVAILABLE`](crate::LINK_RESOLVED_AVAILABLE)
/// is false this expands to [`dispatched_pointer!`](crate::dispatched_pointer)
/// and the symbol is unused.
///
/// The resolver selects from [`resolver_features`](crate::link) rather than
/// [`runtime_features`](crate::cpu_caps::runtime_features): overrides and the
/// environment limit do not apply.
///
/// The expansion contains `global_asm!`, so the macro has to be invoked at
/// module level, not inside a function body.
///
/// ```
/// use cpu_dispatch::{Binding, Registry, dispatched_ifunc, registry};
/// use cpu_dispatch::cpu_caps::Caps;
///
/// fn answer_scalar() -> u32 { 42 }
///
/// const ANSWER: Registry<fn() -> u32> = registry!["scalar" => Caps::SCALAR => answer_scalar];
///
/// dispatched_ifunc! {
///   #[symbol = "cpu_dispatch_doc_answer"]
///   pub fn answer() -> u32 = ANSWER;
/// }
///
/// fn main() {
///   assert_eq!(answer(), 42);
///   assert_eq!(ANSWER_BINDING, Binding::best_available());
/// }
/// ```
#[cfg(all(
  feature = "ifunc",
  target_os = "linux",
  target_env = "gnu",
  any(target_arch = "x86_64", target_arch = "aarch64"),
  not(miri)
))]
#[macro_export]
macro_rules! dispatched_ifunc {
  (
    #[symbol = $symbol:literal]
    $(#[$meta:meta])*
    $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? = $registry:expr;
  ) => {
    $crate::__private::paste! {
      #[allow(dead_code)]
      $vis const [<$name:upper _BINDING>]: $crate::Binding = $crate::Binding::LinkResolved;

      // Runs inside the dynamic loader, before `main` and before TLS is set up.
      #[cfg(target_arch = "aarch64")]
      extern "C" fn [<__ $name _resolver>](hwcap: u64, _hwcap2: *const ()) -> *const () {
        let func: fn($($ty),*) $(-> $ret)? = $registry.dispatch($crate::__private::resolver_features(hwcap));
        func as *const ()
      }

      #[cfg(not(target_arch = "aarch64"))]
      extern "C" fn [<__ $name _resolver>]() -> *const () {
        let func: fn($($ty),*) $(-> $ret)? = $registry.dispatch($crate::__private::resolver_features(0));
        func as *const ()
      }

      ::core::arch::global_asm!(
        concat!(".globl ", $symbol),
        concat!(".hidden ", $symbol),
        concat!(".type ", $symbol, ", %gnu_indirect_function"),
        concat!(".set ", $symbol, ", {resolver}"),
        resolver = sym [<__ $name _resolver>],
      );

      // SAFETY: the symbol is the IFUNC above; the loader binds it to a
      // registry entry of exactly this signature.
      unsafe extern "Rust" {
        $(#[$meta])*
        #[link_name = $symbol]
        $vis safe fn $name($($arg: $ty),*) $(-> $ret)?;
      }
    }
  };
}

/// Declare a function resolved by the dynamic loader (GNU IFUNC).
///
/// This build has no loader support, so the declaration falls back to
/// [`dispatched_pointer!`](crate::dispatched_pointer). The symbol is unused.
/// Invoke it at module level, as on loader-capable targets.
///
/// ```
/// use cpu_dispatch::{Binding, Registry, dispatched_ifunc, registry};
/// use cpu_dispatch::cpu_caps::Caps;
///
/// fn answer_scalar() -> u32 { 42 }
///
/// const ANSWER: Registry<fn() -> u32> = registry!["scalar" => Caps::SCALAR => answer_scalar];
///
/// dispatched_ifunc! {
///   #[symbol = "cpu_dispatch_doc_answer"]
///   pub fn answer() -> u32 = ANSWER;
/// }
///
/// fn main() {
///   assert_eq!(answer(), 42);
///   assert_eq!(ANSWER_BINDING, Binding::best_available());
/// }
/// ```
#[cfg(not(all(
  feature = "ifunc",
  target_os = "linux",
  target_env = "gnu",
  any(target_arch = "x86_64", target_arch = "aarch64"),
  not(miri)
)))]
#[macro_export]
macro_rules! dispatched_ifunc {
  (
    #[symbol = $symbol:literal]
    $(#[$meta:meta])*
    $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? = $registry:expr;
  ) => {
    $crate::dispatched_pointer! {
      $(#[$meta])*
      $vis fn $name($($arg: $ty),*) $(-> $ret)? = $registry;
    }
  };
}
