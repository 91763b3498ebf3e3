//! Scope modeling shared by cache keys, the index, and exchange requests.

pub mod scope;

pub use scope::*;
