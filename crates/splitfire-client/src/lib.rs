//! Remote API clients for splitfire
//!
//! Two thin REST clients implement the core ports: [`SplitwiseClient`] for
//! the expense source and [`FireflyClient`] for the ledger sink. Wire types
//! stay private to this crate; the boundary hands out core models only.

pub mod error;
pub mod firefly;
pub mod splitwise;

pub use error::ClientError;
pub use firefly::FireflyClient;
pub use splitwise::SplitwiseClient;
