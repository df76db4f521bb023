//! Key contract for the hash containers
//!
//! A table key carries its own 64-bit hash and a reserved *hash-null*
//! value that marks an empty slot. The default-constructed key is the
//! unique hash-null value, which is why [`HashKey`] requires `Default`:
//! freshly allocated tables are filled with defaults and are thereby
//! entirely empty.

use ahash::RandomState;
use std::hash::Hash;

/// Contract every container key must satisfy.
///
/// Null keys are never stored; inserting one is rejected with
/// `InvalidArguments`. Equality decides slot identity, the hash only
/// decides the probe start.
pub trait HashKey: Clone + Eq + Default {
    /// 64-bit-wide hash of the key.
    fn hash_value(&self) -> u64;

    /// True for the reserved empty-slot value.
    fn is_hash_null(&self) -> bool;
}

macro_rules! impl_hash_key_for_int {
    ($($t:ty),*) => {
        $(
            impl HashKey for $t {
                #[inline]
                fn hash_value(&self) -> u64 {
                    *self as u64
                }

                #[inline]
                fn is_hash_null(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

// Identity hash; zero is the empty sentinel. Handy for tests and for ids
// that are already well distributed.
impl_hash_key_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

// Fixed seeds so iteration order is a deterministic function of the inserted
// values within a process run.
const SEED: (u64, u64, u64, u64) = (
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
);

/// Adapter that turns any `Hash + Eq + Default` payload into a [`HashKey`].
///
/// The hash is computed with a fixed-seed [`ahash`] state; the payload's
/// `Default` value acts as the hash-null sentinel. Useful for string-ish
/// keys that do not carry a precomputed hash of their own.
///
/// # Examples
///
/// ```rust
/// use setkit::key::{HashKey, HashedKey};
///
/// let k = HashedKey::new("lantern");
/// assert!(!k.is_hash_null());
/// assert!(HashedKey::<&str>::default().is_hash_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashedKey<T>(T);

impl<T: Hash + Eq + Clone + Default> HashedKey<T> {
    /// Wrap a payload.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the payload.
    pub fn get(&self) -> &T {
        &self.0
    }

    /// Unwrap the payload.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Hash + Eq + Clone + Default> From<T> for HashedKey<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Hash + Eq + Clone + Default> HashKey for HashedKey<T> {
    fn hash_value(&self) -> u64 {
        let state = RandomState::with_seeds(SEED.0, SEED.1, SEED.2, SEED.3);
        state.hash_one(&self.0)
    }

    fn is_hash_null(&self) -> bool {
        self.0 == T::default()
    }
}
