//! Engine event journal
//!
//! Append-only record of every state change, hash-chained with blake3
//! so a retained window can be checked for tampering:
//!
//! ```text
//! digest[n] = blake3(digest[n-1] || sequence[n] || json(event[n]))
//! ```
//!
//! The journal is bounded; evicted entries leave their digest behind as
//! the anchor for the first retained one.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cropshield_common::{Address, ConditionKind, LocationId, PolicyId, Result};

/// Event types recorded by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    LocationRegistered {
        location_id: LocationId,
        latitude: Decimal,
        longitude: Decimal,
    },
    OracleGranted {
        oracle: Address,
    },
    OracleRevoked {
        oracle: Address,
    },
    EscrowFunded {
        funder: Address,
        amount: Decimal,
        balance: Decimal,
    },
    PolicyCreated {
        policy_id: PolicyId,
        farmer: Address,
        location_id: LocationId,
        condition: ConditionKind,
        threshold: Decimal,
        premium: Decimal,
        coverage: Decimal,
        expires_at: i64,
    },
    WeatherReported {
        oracle: Address,
        location_id: LocationId,
        condition: ConditionKind,
        value: Decimal,
        timestamp: i64,
    },
    PolicyExpired {
        policy_id: PolicyId,
    },
    PayoutExecuted {
        policy_id: PolicyId,
        farmer: Address,
        amount: Decimal,
        balance: Decimal,
    },
    /// Triggered, but escrow could not cover it; the policy stays Active
    PayoutDeferred {
        policy_id: PolicyId,
        required: Decimal,
        available: Decimal,
    },
}

/// Journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the full history, starting at 0
    pub sequence: u64,
    pub event_id: Uuid,
    /// Unix milliseconds from the engine clock
    pub recorded_at: i64,
    pub event: LedgerEvent,
    /// Hex-encoded chained blake3 digest
    pub digest: String,
}

/// Bounded, hash-chained event log
#[derive(Debug, Clone)]
pub struct EventJournal {
    entries: VecDeque<JournalEntry>,
    capacity: usize,
    next_sequence: u64,
    /// Digest preceding the first retained entry
    anchor: [u8; 32],
    head: [u8; 32],
}

impl EventJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_sequence: 0,
            anchor: [0u8; 32],
            head: [0u8; 32],
        }
    }

    /// Append `event`; fails without touching the journal if it cannot be serialized
    pub fn append(&mut self, event: LedgerEvent, recorded_at: i64) -> Result<&JournalEntry> {
        let sequence = self.next_sequence;
        let digest = chain_digest(&self.head, sequence, &event)?;

        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.anchor = decode_digest(&evicted.digest);
            }
        }

        self.head = digest;
        self.next_sequence += 1;
        self.entries.push_back(JournalEntry {
            sequence,
            event_id: Uuid::now_v7(),
            recorded_at,
            event,
            digest: hex::encode(digest),
        });

        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Recompute the chain over the retained window
    pub fn verify_chain(&self) -> bool {
        let mut previous = self.anchor;
        for entry in &self.entries {
            let Ok(expected) = chain_digest(&previous, entry.sequence, &entry.event) else {
                return false;
            };
            if hex::encode(expected) != entry.digest {
                return false;
            }
            previous = expected;
        }
        true
    }

    /// Hex digest of the newest entry
    pub fn head(&self) -> String {
        hex::encode(self.head)
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }
}

fn chain_digest(previous: &[u8; 32], sequence: u64, event: &LedgerEvent) -> Result<[u8; 32]> {
    let payload = serde_json::to_vec(event)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(previous);
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&payload);
    Ok(*hasher.finalize().as_bytes())
}

fn decode_digest(digest: &str) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    // Digests are produced by `append`, always 32 bytes of hex
    if let Ok(decoded) = hex::decode(digest) {
        if decoded.len() == 32 {
            bytes.copy_from_slice(&decoded);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expired(id: u64) -> LedgerEvent {
        LedgerEvent::PolicyExpired {
            policy_id: PolicyId(id),
        }
    }

    #[test]
    fn test_append_assigns_sequence_and_chains() {
        let mut journal = EventJournal::new(10);
        let first = journal.append(expired(1), 100).unwrap().clone();
        let second = journal.append(expired(2), 200).unwrap().clone();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_ne!(first.digest, second.digest);
        assert_eq!(journal.head(), second.digest);
        assert!(journal.verify_chain());
    }

    #[test]
    fn test_tampering_breaks_chain() {
        let mut journal = EventJournal::new(10);
        journal.append(
            LedgerEvent::EscrowFunded {
                funder: Address::from("operator"),
                amount: dec!(500),
                balance: dec!(500),
            },
            1,
        )
        .unwrap();
        journal.append(expired(1), 2).unwrap();

        if let Some(entry) = journal.entries.front_mut() {
            entry.event = LedgerEvent::EscrowFunded {
                funder: Address::from("operator"),
                amount: dec!(5000),
                balance: dec!(5000),
            };
        }
        assert!(!journal.verify_chain());
    }

    #[test]
    fn test_eviction_keeps_chain_verifiable() {
        let mut journal = EventJournal::new(3);
        for id in 0..5 {
            journal.append(expired(id), id as i64).unwrap();
        }

        assert_eq!(journal.entries().count(), 3);
        assert_eq!(journal.entries().next().map(|e| e.sequence), Some(2));
        assert_eq!(journal.entries().last().map(|e| e.sequence), Some(4));
        assert!(journal.verify_chain());
    }

    #[test]
    fn test_digest_covers_serialized_event() {
        let mut journal = EventJournal::new(4);
        let event = LedgerEvent::PayoutExecuted {
            policy_id: PolicyId(7),
            farmer: Address::from("farmer"),
            amount: dec!(500),
            balance: dec!(100),
        };
        let entry = journal.append(event.clone(), 42).unwrap().clone();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&[0u8; 32]);
        hasher.update(&0u64.to_le_bytes());
        hasher.update(&serde_json::to_vec(&event).unwrap());
        assert_eq!(entry.digest, hasher.finalize().to_hex().to_string());
        assert_eq!(entry.recorded_at, 42);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_string(&expired(4)).unwrap();
        assert_eq!(json, r#"{"type":"PolicyExpired","data":{"policy_id":4}}"#);
    }
}
