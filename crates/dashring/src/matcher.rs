//! Product code resolution.
//!
//! A [`ProductTable`] maps registered color codes to product names and
//! resolves an extracted code in three tiers: exact lookup, lookup of
//! every single-character rotation (the ring has no fixed start), and
//! finally a similarity sweep over every rotation × registered key.
//! The similarity tier is O(rotations × keys × ratio) and is the
//! pipeline's hot spot; the first two tiers exist to keep it rare.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::similarity::ratio;

/// Minimum Ratcliff–Obershelp ratio for a tier-3 match.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Rotation,
    Similarity,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Rotation => "rotation",
            Self::Similarity => "similarity",
        })
    }
}

/// Best tier-3 candidate, reported even when rejected so callers can
/// log how close a failed code came.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMatch {
    /// The winning registered key, present only at or above
    /// [`SIMILARITY_THRESHOLD`].
    pub key: Option<String>,
    /// Best ratio seen across every rotation × key pair.
    pub ratio: f64,
}

/// Result of [`ProductTable::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Match {
        /// The registered key the code normalized to.
        key: String,
        product: String,
        tier: MatchTier,
    },
    NoMatch(SimilarMatch),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Registered code → product name table with deterministic iteration
/// order (insertion order), so the similarity sweep ranks candidates
/// the same way on every run.
#[derive(Debug, Clone, Default)]
pub struct ProductTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ProductTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a registered code.
    pub fn insert(&mut self, code: impl Into<String>, product: impl Into<String>) {
        let code = code.into();
        let product = product.into();
        match self.index.get(&code) {
            Some(&i) => self.entries[i].1 = product,
            None => {
                self.index.insert(code.clone(), self.entries.len());
                self.entries.push((code, product));
            }
        }
    }

    /// Parse a JSON object of `code → product name`. Entries load in
    /// key order, which fixes the tier-3 tie-break deterministically.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (code, product) in map {
            table.insert(code, product);
        }
        Ok(table)
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.index
            .get(code)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered `(code, product)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    /// Resolve a code through the three tiers.
    pub fn resolve(&self, code: &str) -> MatchOutcome {
        if let Some(product) = self.get(code) {
            return MatchOutcome::Match {
                key: code.to_string(),
                product: product.to_string(),
                tier: MatchTier::Exact,
            };
        }

        // The ring can be read starting at any dash, so every rotation
        // of the code names the same marker. First registered hit wins.
        for rotated in rotations(code) {
            if let Some(product) = self.get(&rotated) {
                return MatchOutcome::Match {
                    key: rotated,
                    product: product.to_string(),
                    tier: MatchTier::Rotation,
                };
            }
        }

        let similar = self.check_similar(code);
        debug!(code, ratio = similar.ratio, key = ?similar.key, "similarity sweep");
        match similar.key.clone() {
            Some(key) => {
                let product = self
                    .get(&key)
                    .unwrap_or_default()
                    .to_string();
                MatchOutcome::Match {
                    key,
                    product,
                    tier: MatchTier::Similarity,
                }
            }
            None => MatchOutcome::NoMatch(similar),
        }
    }

    /// Tier-3 sweep: best ratio over every rotation × registered key.
    ///
    /// A candidate only displaces the incumbent on a strictly greater
    /// ratio, so earlier rotations and earlier table entries win ties.
    pub fn check_similar(&self, code: &str) -> SimilarMatch {
        let mut best = SimilarMatch {
            key: None,
            ratio: 0.0,
        };
        for rotated in rotations(code) {
            for (key, _) in &self.entries {
                let r = ratio(&rotated, key);
                if r > best.ratio {
                    best.ratio = r;
                    best.key = Some(key.clone());
                }
            }
        }
        if best.ratio < SIMILARITY_THRESHOLD {
            best.key = None;
        }
        best
    }
}

/// All single-character left-rotations of `code`, identity first.
/// Empty for the empty code. Rotation is per char, so a malformed code
/// with non-ASCII input still resolves (to nothing) instead of hitting
/// a byte boundary.
fn rotations(code: &str) -> impl Iterator<Item = String> {
    let chars: Vec<char> = code.chars().collect();
    (0..chars.len()).map(move |i| {
        chars[i..]
            .iter()
            .chain(chars[..i].iter())
            .collect()
    })
}
