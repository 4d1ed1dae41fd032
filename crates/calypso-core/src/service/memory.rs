//! In-memory roster implementation for testing

use super::{async_trait, SecretService, ServiceFailure, ServiceResult};
use crate::codec;
use crate::recover::apply_mask;
use crate::{
    DecryptionResult, LtsHandle, LtsId, ReadAddress, ReadSecret, Roster, WriteAddress,
    ADDRESS_LEN,
};
use dashmap::{mapref::entry::Entry, DashMap, DashSet};
use k256::{elliptic_curve::Field, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of live nodes needed to operate on an LTS held by `n` nodes
pub fn threshold(n: usize) -> usize {
    n - n.saturating_sub(1) / 3
}

struct LtsState {
    /// Node addresses in the order shares were dealt
    members: Vec<String>,
    threshold: usize,
    /// Share of node `i`, evaluated at `i + 1`
    shares: Vec<Scalar>,
    public_key: ProjectivePoint,
}

struct WriteState {
    lts_id: Vec<u8>,
    u: ProjectivePoint,
    masked_key: Vec<u8>,
}

struct ReadState {
    write: WriteAddress,
    reader: ProjectivePoint,
    consumed: bool,
}

/// Simulated roster holding threshold shares in process memory
#[derive(Clone, Default)]
pub struct MemoryRoster {
    lts: Arc<DashMap<Vec<u8>, LtsState>>,
    writes: Arc<DashMap<WriteAddress, WriteState>>,
    reads: Arc<DashMap<ReadAddress, ReadState>>,
    offline: Arc<DashSet<String>>,
}

impl MemoryRoster {
    /// Create an empty simulated roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node as reachable or not
    pub fn set_online(&self, address: &str, online: bool) {
        if online {
            self.offline.remove(address);
        } else {
            self.offline.insert(address.to_string());
        }
    }

    /// Positions of members currently online
    fn online_members(&self, members: &[String]) -> Vec<usize> {
        members
            .iter()
            .enumerate()
            .filter(|(_, address)| !self.offline.contains(*address))
            .map(|(i, _)| i)
            .collect()
    }

    fn check_roster(roster: &Roster) -> ServiceResult<()> {
        roster
            .validate()
            .map_err(|e| ServiceFailure::Rejected(e.to_string()))
    }

    fn check_members(state: &LtsState, roster: &Roster) -> ServiceResult<()> {
        let mut expected = state.members.clone();
        let mut actual = roster.addresses();
        expected.sort();
        actual.sort();

        if expected != actual {
            return Err(ServiceFailure::NotFound(
                "LTS is not held by this roster".into(),
            ));
        }
        Ok(())
    }
    /// Register a read of `write` for the holder of the key behind `reader`
    ///
    /// The roster only ever sees the reader's public point; the matching
    /// scalar stays with whoever drew it.
    pub fn register_read(
        &self,
        roster: &Roster,
        write: &WriteAddress,
        reader: &ProjectivePoint,
    ) -> ServiceResult<ReadAddress> {
        Self::check_roster(roster)?;

        if *reader == ProjectivePoint::IDENTITY {
            return Err(ServiceFailure::Rejected("reader key is the identity".into()));
        }

        let write_state = self
            .writes
            .get(write)
            .ok_or_else(|| ServiceFailure::NotFound(format!("unknown write {}", write)))?;
        let lts = self
            .lts
            .get(&write_state.lts_id)
            .ok_or_else(|| ServiceFailure::NotFound("write references unknown LTS".into()))?;
        Self::check_members(&lts, roster)?;

        let address = ReadAddress::new(derive_address(
            "read",
            &[write.as_bytes(), &codec::encode_point(reader)],
        ));

        match self.reads.entry(address) {
            Entry::Occupied(_) => {
                return Err(ServiceFailure::Rejected(
                    "reader key already registered for this write".into(),
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(ReadState {
                    write: *write,
                    reader: *reader,
                    consumed: false,
                });
            }
        }

        debug!(read = %address, write = %write, "Read registered");
        Ok(address)
    }
}

/// Evaluate polynomial at a point
fn evaluate_polynomial(coefficients: &[Scalar], x: u64) -> Scalar {
    let x_scalar = Scalar::from(x);
    let mut result = Scalar::ZERO;
    let mut x_power = Scalar::ONE;

    for coef in coefficients {
        result += *coef * x_power;
        x_power *= x_scalar;
    }

    result
}

/// Lagrange coefficient at zero for position `i` among `positions`
fn lagrange_at_zero(positions: &[usize], i: usize) -> Option<Scalar> {
    let x_i = Scalar::from(i as u64 + 1);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for &j in positions {
        if j == i {
            continue;
        }
        let x_j = Scalar::from(j as u64 + 1);
        numerator *= x_j;
        denominator *= x_j - x_i;
    }

    Option::<Scalar>::from(denominator.invert()).map(|inv| numerator * inv)
}

fn derive_address(domain: &str, parts: &[&[u8]]) -> [u8; ADDRESS_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }

    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&hasher.finalize().as_bytes()[..ADDRESS_LEN]);
    address
}

#[async_trait]
impl SecretService for MemoryRoster {
    async fn create_lts(&self, roster: &Roster) -> ServiceResult<LtsHandle> {
        Self::check_roster(roster)?;

        let members = roster.addresses();
        let n = members.len();
        let t = threshold(n);

        let online = self.online_members(&members).len();
        if online < t {
            return Err(ServiceFailure::Unavailable(format!(
                "{} of {} nodes online, {} needed",
                online, n, t
            )));
        }

        // Every node deals a degree t-1 polynomial; node j keeps the sum of
        // all evaluations at j + 1.
        let mut rng = OsRng;
        let mut shares = vec![Scalar::ZERO; n];
        let mut public_key = ProjectivePoint::IDENTITY;

        for _dealer in 0..n {
            let coefficients: Vec<Scalar> = (0..t).map(|_| Scalar::random(&mut rng)).collect();
            public_key += ProjectivePoint::GENERATOR * coefficients[0];

            for (j, share) in shares.iter_mut().enumerate() {
                *share += evaluate_polynomial(&coefficients, j as u64 + 1);
            }
        }

        let id: [u8; 32] = rand::random();
        self.lts.insert(
            id.to_vec(),
            LtsState {
                members,
                threshold: t,
                shares,
                public_key,
            },
        );

        info!(
            lts_id = codec::encode(&id),
            n_nodes = n,
            threshold = t,
            "LTS created"
        );

        Ok(LtsHandle {
            id: LtsId::new(id.to_vec()),
            public_key,
        })
    }

    async fn add_write(
        &self,
        roster: &Roster,
        lts_id: &LtsId,
        public_key: &ProjectivePoint,
        payload: &[u8],
    ) -> ServiceResult<WriteAddress> {
        Self::check_roster(roster)?;

        let lts = self
            .lts
            .get(lts_id.as_bytes())
            .ok_or_else(|| ServiceFailure::NotFound(format!("unknown LTS {}", lts_id)))?;
        Self::check_members(&lts, roster)?;

        if *public_key != lts.public_key {
            return Err(ServiceFailure::Rejected(
                "public key does not belong to this LTS".into(),
            ));
        }

        let lts_key = lts.public_key;
        drop(lts);

        let r = Scalar::random(&mut OsRng);
        let u = ProjectivePoint::GENERATOR * r;
        let masked_key = apply_mask(&(lts_key * r), payload);

        let u_bytes = codec::encode_point(&u);
        let address = WriteAddress::new(derive_address(
            "write",
            &[lts_id.as_bytes(), &u_bytes, &masked_key],
        ));

        self.writes.insert(
            address,
            WriteState {
                lts_id: lts_id.as_bytes().to_vec(),
                u,
                masked_key,
            },
        );

        debug!(write = %address, lts_id = %lts_id, "Write registered");
        Ok(address)
    }

    async fn add_read(
        &self,
        roster: &Roster,
        write: &WriteAddress,
    ) -> ServiceResult<(ReadSecret, ReadAddress)> {
        let xc = Scalar::random(&mut OsRng);
        let address = self.register_read(roster, write, &(ProjectivePoint::GENERATOR * xc))?;
        Ok((ReadSecret::new(xc.to_bytes().to_vec()), address))
    }

    async fn decrypt_key(
        &self,
        roster: &Roster,
        write: &WriteAddress,
        read: &ReadAddress,
    ) -> ServiceResult<DecryptionResult> {
        Self::check_roster(roster)?;

        let write_state = self
            .writes
            .get(write)
            .ok_or_else(|| ServiceFailure::NotFound(format!("unknown write {}", write)))?;
        let lts = self
            .lts
            .get(&write_state.lts_id)
            .ok_or_else(|| ServiceFailure::NotFound("write references unknown LTS".into()))?;
        let mut read_state = self
            .reads
            .get_mut(read)
            .ok_or_else(|| ServiceFailure::NotFound(format!("unknown read {}", read)))?;

        if read_state.write != *write {
            return Err(ServiceFailure::Unauthorized(format!(
                "read {} does not authorize write {}",
                read, write
            )));
        }
        if read_state.consumed {
            return Err(ServiceFailure::Unauthorized(format!(
                "read {} has already been used",
                read
            )));
        }

        Self::check_members(&lts, roster)?;

        let online = self.online_members(&lts.members);
        if online.len() < lts.threshold {
            return Err(ServiceFailure::Unavailable(format!(
                "{} of {} nodes online, {} needed",
                online.len(),
                lts.members.len(),
                lts.threshold
            )));
        }

        // Combine partial re-encryptions of the first t live nodes
        let signers = &online[..lts.threshold];
        let base = write_state.u + read_state.reader;
        let mut xhat_enc = ProjectivePoint::IDENTITY;

        for &i in signers {
            let lambda = lagrange_at_zero(signers, i).ok_or_else(|| {
                ServiceFailure::Unavailable("degenerate share set".into())
            })?;
            xhat_enc += base * (lts.shares[i] * lambda);
        }

        read_state.consumed = true;

        debug!(write = %write, read = %read, signers = signers.len(), "Key re-encrypted");

        Ok(DecryptionResult {
            masked_key: write_state.masked_key.clone(),
            xhat_enc,
            cs: vec![write_state.u],
            public_key: lts.public_key,
        })
    }
}
