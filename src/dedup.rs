//! # Deduplication
//! Pure classification of one run's listings against the persisted seen-state.
//! No I/O; the run controller decides what gets written and when.
//!
//! Order of rules:
//! 1. aggregate by id (first record wins),
//! 2. first run seeds everything,
//! 3. ids already seen are dropped,
//! 4. a new id whose fingerprint is already persisted is a repost,
//! 5. everything else is genuinely new.
//!
//! Fingerprints are only compared against the *persisted* set, so two new
//! listings in the same batch with the same title and price are both new.

use std::collections::HashSet;

use crate::ingest::aggregate_unique;
use crate::listing::{fingerprint_digest, Listing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// First run: every listing is recorded, none is announced.
    Seeded(Vec<Listing>),
    Compared {
        genuinely_new: Vec<Listing>,
        reposts: Vec<Listing>,
        /// Number of listings dropped because their id was already known.
        already_seen: usize,
    },
}

impl Classification {
    /// Ids to add to the identity set: everything on a first run, otherwise
    /// every new-by-id listing (reposts included).
    pub fn ids_to_record(&self) -> Vec<String> {
        match self {
            Classification::Seeded(all) => all.iter().map(|l| l.id.clone()).collect(),
            Classification::Compared {
                genuinely_new,
                reposts,
                ..
            } => genuinely_new
                .iter()
                .chain(reposts.iter())
                .map(|l| l.id.clone())
                .collect(),
        }
    }

    pub fn genuinely_new(&self) -> &[Listing] {
        match self {
            Classification::Seeded(_) => &[],
            Classification::Compared { genuinely_new, .. } => genuinely_new,
        }
    }
}

pub fn classify(
    listings: &[Listing],
    is_first_run: bool,
    seen_ids: &HashSet<String>,
    seen_fingerprints: &HashSet<String>,
) -> Classification {
    let unique = aggregate_unique(vec![listings.to_vec()]);

    if is_first_run {
        return Classification::Seeded(unique);
    }

    let mut genuinely_new = Vec::new();
    let mut reposts = Vec::new();
    let mut already_seen = 0usize;

    for l in unique {
        if seen_ids.contains(&l.id) {
            already_seen += 1;
        } else if seen_fingerprints.contains(&fingerprint_digest(&l)) {
            reposts.push(l);
        } else {
            genuinely_new.push(l);
        }
    }

    Classification::Compared {
        genuinely_new,
        reposts,
        already_seen,
    }
}

/// Fingerprint digests of a whole batch, for the every-run resync.
pub fn batch_fingerprints(listings: &[Listing]) -> Vec<String> {
    let mut seen = HashSet::new();
    listings
        .iter()
        .map(fingerprint_digest)
        .filter(|d| seen.insert(d.clone()))
        .collect()
}
