pub mod error;
pub mod logger;
pub mod macros;
pub mod rand;
pub mod saveload;

pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;
