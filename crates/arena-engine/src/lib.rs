pub mod board;
pub mod error;
pub mod invitation;
pub mod registry;
pub mod session;
pub mod settlement;
pub mod store;

pub use error::{Error, Result};
pub use registry::SessionRegistry;
pub use session::{JoinOutcome, MatchSession, MoveOutcome};
pub use store::Store;

#[cfg(test)]
pub(crate) mod testing;
