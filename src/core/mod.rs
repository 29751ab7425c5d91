//! Core protocol primitives.
//!
//! Everything here except [`SystemClock`] is a pure function of its inputs:
//! no I/O, no shared state. Safe to call from any number of request
//! tasks at once.

pub mod clock;
pub mod game_id;
pub mod key;
pub mod salt;
pub mod tsk;

// Re-export core types
pub use clock::{Clock, FixedClock, SystemClock};
pub use game_id::{GameId, GameQuery, GameVersion};
pub use key::{derive_password, AuthKey, KeyIssuer, KeyPayload};
pub use salt::{derive_salt, KeyTime, TimeWindow};
pub use tsk::TskProof;
