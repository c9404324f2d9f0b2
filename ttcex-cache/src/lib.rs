pub mod cache;

pub use cache::{Atom, Prefab, PrefabId, PrefabRegistry};
