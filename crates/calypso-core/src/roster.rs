//! Roster descriptor: the ordered set of nodes holding an LTS

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One node of the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    /// Endpoint of the node
    #[serde(rename = "Address", alias = "address")]
    pub address: String,
    /// Hex-encoded node key, if published
    #[serde(rename = "Public", alias = "public", default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
    /// Free-form description
    #[serde(rename = "Description", alias = "description", default)]
    pub description: String,
}

impl ServerIdentity {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            public: None,
            description: String::new(),
        }
    }
}

/// Ordered list of nodes; the first entry is the leader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    servers: Vec<ServerIdentity>,
}

impl Roster {
    /// Build a roster, validating that it is usable
    pub fn new(servers: Vec<ServerIdentity>) -> Result<Self> {
        let roster = Self { servers };
        roster.validate()?;
        Ok(roster)
    }

    /// Build a roster from node addresses
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        Self::new(
            addresses
                .iter()
                .map(|a| ServerIdentity::new(a.as_ref()))
                .collect(),
        )
    }

    /// Parse a roster from TOML
    pub fn from_toml(contents: &str) -> Result<Self> {
        let roster: Roster = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("invalid roster: {}", e)))?;
        roster.validate()?;
        Ok(roster)
    }

    /// Load a roster file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read roster {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Check the roster is non-empty with a resolvable leader
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Configuration("roster is empty".into()));
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            let address = server.address.trim();
            if address.is_empty() {
                return Err(Error::Configuration("roster node without address".into()));
            }
            if !seen.insert(address) {
                return Err(Error::Configuration(format!(
                    "duplicate roster node: {}",
                    address
                )));
            }
        }

        Ok(())
    }

    /// Rooted view with `address` promoted to leader
    pub fn with_root(&self, address: &str) -> Result<Roster> {
        self.validate()?;

        let index = self
            .servers
            .iter()
            .position(|s| s.address.trim() == address.trim())
            .ok_or_else(|| {
                Error::Configuration(format!("{} is not a member of the roster", address))
            })?;

        let mut servers = self.servers.clone();
        let root = servers.remove(index);
        servers.insert(0, root);
        Ok(Roster { servers })
    }

    /// Rooted view led by the first listed node
    pub fn rooted(&self) -> Result<Roster> {
        let first = self
            .servers
            .first()
            .ok_or_else(|| Error::Configuration("roster is empty".into()))?;
        self.with_root(&first.address)
    }

    /// Leader of this roster
    pub fn leader(&self) -> Option<&ServerIdentity> {
        self.servers.first()
    }

    pub fn servers(&self) -> &[ServerIdentity] {
        &self.servers
    }

    /// Node addresses in roster order
    pub fn addresses(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.address.trim().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
