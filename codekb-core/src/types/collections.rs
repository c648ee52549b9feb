//! Fast, non-cryptographic hash collections for the hot paths (indices,
//! per-file maps) where the DoS resistance of the default hasher isn't needed.

pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
