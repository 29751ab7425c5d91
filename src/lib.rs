//! # PBX Backend
//!
//! Stateless telemetry backend for games: high scores, achievement unlocks,
//! download records, version checks and player names. Clients are untrusted
//! binaries, so every write must carry a key the server issued for exactly
//! that data.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        PBX BACKEND                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Key protocol primitives (pure)            │
//! │  ├── salt.rs     - Time salt and acceptance window           │
//! │  ├── key.rs      - Keyed SHA-256 digests                     │
//! │  ├── tsk.rs      - Offline TSK proofs                        │
//! │  ├── game_id.rs  - Game codes and versions                   │
//! │  └── clock.rs    - Injected "now"                            │
//! │                                                              │
//! │  handshake/      - Authorize / submit per domain             │
//! │  store/          - Datastore boundary + in-memory store      │
//! │  catalog/        - Game/achievement snapshot and refresh     │
//! │                                                              │
//! │  request/        - Handler registry and handlers             │
//! │  network/        - WebSocket transport                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Guarantee
//!
//! A key is a pure function of (purpose, ordered payload, time salt).
//! Submissions are always re-verified from the submitted data; the server
//! keeps no record of keys it issued.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod core;
pub mod error;
pub mod handshake;
pub mod network;
pub mod request;
pub mod store;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogCell, CatalogRefresher, CatalogSources};
pub use crate::core::{AuthKey, GameId, KeyIssuer, KeyPayload, KeyTime, TskProof};
pub use error::{PbxError, Result};
pub use handshake::{authorize, verify, Authorization, Handshake};
pub use network::{BackendServer, ServerConfig};
pub use request::{BackendSettings, HandlerContext, Outcome, RequestManager};
pub use store::{Datastore, MemoryStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
