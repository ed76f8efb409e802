//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (mount lookup, longest prefix first)
//!     → mount.rs (strip prefix, build upstream URL)
//!     → Return: matched Mount or NoMatch
//! ```
//!
//! # Design Decisions
//! - Mounts compiled at startup, immutable at runtime
//! - Prefix matching only, no regex
//! - Deterministic: same path always matches the same mount

pub mod mount;
pub mod router;

pub use mount::Mount;
pub use router::MountTable;
