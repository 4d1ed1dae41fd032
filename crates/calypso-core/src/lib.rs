//! # Calypso Core
//!
//! Client-side workflow for secrets protected by a threshold-encryption roster.
//!
//! This crate provides the building blocks for:
//! - Requesting a distributed long-term secret (LTS) from a roster
//! - Registering write requests bound to an LTS
//! - Registering read requests bound to a write
//! - Obtaining the re-encrypted key and finishing decryption locally
//!
//! ## Workflow Overview
//!
//! Every step returns an identifier that seeds the next one:
//! `NoLTS -> LTSCreated -> WriteRegistered -> ReadRegistered -> Decrypted`.
//! The roster itself is reached through the [`SecretService`] trait; local
//! input is validated before any call crosses that boundary.
//!
//! ## Example
//!
//! ```rust,ignore
//! use calypso_core::{Orchestrator, Roster};
//!
//! let orchestrator = Orchestrator::new(client);
//! let lts = orchestrator.create_lts(&roster).await?;
//! let write = orchestrator
//!     .add_write(&roster, &lts.id.to_hex(), &lts.public_key_hex(), payload)
//!     .await?;
//! let record = orchestrator.add_read(&roster, &write.to_hex()).await?;
//! let result = orchestrator.decrypt_record(&roster, &record).await?;
//! let key = calypso_core::recover_key(&record.secret, &result)?;
//! ```

pub mod codec;
pub mod error;
pub mod orchestrator;
pub mod recover;
pub mod roster;
pub mod service;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
pub use recover::recover_key;
pub use roster::{Roster, ServerIdentity};
pub use service::{MemoryRoster, SecretService, ServiceFailure};
pub use types::{
    DecryptionResult, LtsHandle, LtsId, Operation, ReadAddress, ReadRecord, ReadSecret,
    WriteAddress, ADDRESS_LEN,
};

pub use k256;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
