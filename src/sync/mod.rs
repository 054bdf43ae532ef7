//! Coordination primitives shared by the resolvers.

pub mod debounce;
pub mod settled;

pub use debounce::{DEFAULT_DEBOUNCE_WINDOW, Debouncer};
pub use settled::{SettledReader, SettledWriter, settled};
