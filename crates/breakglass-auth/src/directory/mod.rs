//! User directory lookup.

pub mod lookup;

pub use lookup::{DirectoryUserLookup, UserLookup};
