//! Identifiers and records exchanged between workflow steps

use crate::codec;
use crate::Result;
use k256::ProjectivePoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Width in bytes of write and read addresses
pub const ADDRESS_LEN: usize = 20;

/// The four roster operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateLts,
    AddWrite,
    AddRead,
    DecryptKey,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateLts => "create_lts",
            Operation::AddWrite => "add_write",
            Operation::AddRead => "add_read",
            Operation::DecryptKey => "decrypt_key",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle of a distributed secret, kept byte-for-byte as issued
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LtsId(Vec<u8>);

impl LtsId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse a hex handle; the decoded handle must not be empty
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = codec::decode(hex_str)?;
        if bytes.is_empty() {
            return Err(crate::Error::Encoding("LTS id is empty".into()));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        codec::encode(&self.0)
    }
}

impl fmt::Display for LtsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Result of distributed key generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtsHandle {
    /// Handle referencing the secret at the roster
    pub id: LtsId,
    /// Aggregate public key of the secret
    pub public_key: ProjectivePoint,
}

impl LtsHandle {
    /// Compressed SEC1 hex of the aggregate key
    pub fn public_key_hex(&self) -> String {
        codec::encode_point_hex(&self.public_key)
    }
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; ADDRESS_LEN]);

        impl $name {
            pub fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            pub fn from_hex(hex_str: &str) -> Result<Self> {
                codec::decode_address(hex_str).map(Self)
            }

            pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
                &self.0
            }

            /// Canonical 40-digit lowercase hex form
            pub fn to_hex(&self) -> String {
                codec::encode(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

address_type!(
    /// Address of a registered write request
    WriteAddress
);

address_type!(
    /// Address of a registered read request
    ReadAddress
);

/// Single-use secret issued with a read request
///
/// Needed again to finish decryption locally; never logged.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ReadSecret(Vec<u8>);

impl ReadSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        codec::decode(hex_str).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        codec::encode(&self.0)
    }
}

impl fmt::Debug for ReadSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadSecret(<redacted>)")
    }
}

/// A registered read, bound to the write it authorizes
#[derive(Debug, Clone)]
pub struct ReadRecord {
    /// Write this read was registered against
    pub write: WriteAddress,
    /// Address of the read request
    pub read: ReadAddress,
    /// Secret required to unmask the decrypted key
    pub secret: ReadSecret,
}

/// Re-encrypted key material returned by the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionResult {
    /// Symmetric key material, still masked
    pub masked_key: Vec<u8>,
    /// Aggregate share re-encrypted towards the reader
    pub xhat_enc: ProjectivePoint,
    /// Ciphertext points stored with the write
    pub cs: Vec<ProjectivePoint>,
    /// Aggregate public key of the LTS
    pub public_key: ProjectivePoint,
}
