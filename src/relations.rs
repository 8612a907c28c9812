/// Relation vector provider: embedding-space translations used by the
/// expansion strategy's vector arithmetic.
///
/// Three kinds: `prerequisite` (small positive offset, traversal to slightly
/// more advanced KPs), `similarity` (moderate offset, neighboring KPs),
/// `advanced` (larger offset, exploratory jumps). The default provider simulates each
/// from a fixed-seed normal distribution, then normalizes; identical seeds
/// always yield identical vectors. Vectors may instead be supplied
/// externally, e.g. from an offline trans-E run.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::errors::RecError;
use crate::vecmath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Prerequisite,
    Similarity,
    Advanced,
}

impl RelationKind {
    /// Draw order is fixed so the simulated vectors are reproducible.
    pub const ALL: [RelationKind; 3] = [
        RelationKind::Prerequisite,
        RelationKind::Similarity,
        RelationKind::Advanced,
    ];

    /// (mean, std) of the simulated normal draw for this kind.
    fn distribution(self) -> (f64, f64) {
        match self {
            RelationKind::Prerequisite => (0.08, 0.12),
            RelationKind::Similarity => (0.12, 0.15),
            RelationKind::Advanced => (0.18, 0.25),
        }
    }
}

/// Immutable set of relation vectors, one per kind, all unit length.
#[derive(Debug, Clone)]
pub struct RelationVectors {
    dim: usize,
    prerequisite: Vec<f64>,
    similarity: Vec<f64>,
    advanced: Vec<f64>,
}

impl RelationVectors {
    /// Simulate the three relation vectors from a single seeded RNG.
    pub fn simulated(dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |kind: RelationKind| {
            let (mean, std) = kind.distribution();
            let normal = Normal::new(mean, std).expect("std deviation is positive");
            let mut v: Vec<f64> = (0..dim).map(|_| rng.sample(normal)).collect();
            vecmath::normalize(&mut v);
            v
        };
        let prerequisite = draw(RelationKind::Prerequisite);
        let similarity = draw(RelationKind::Similarity);
        let advanced = draw(RelationKind::Advanced);
        RelationVectors {
            dim,
            prerequisite,
            similarity,
            advanced,
        }
    }

    /// Use externally supplied vectors. Each must match the catalog
    /// dimension; they are normalized here.
    pub fn from_vectors(
        dim: usize,
        mut vectors: HashMap<RelationKind, Vec<f64>>,
    ) -> Result<Self, RecError> {
        let mut take = |kind: RelationKind| -> Result<Vec<f64>, RecError> {
            let mut v = vectors
                .remove(&kind)
                .ok_or_else(|| RecError::Config(format!("missing relation vector {:?}", kind)))?;
            if v.len() != dim {
                return Err(RecError::DimensionMismatch {
                    expected: dim,
                    found: v.len(),
                });
            }
            vecmath::normalize(&mut v);
            Ok(v)
        };
        Ok(RelationVectors {
            dim,
            prerequisite: take(RelationKind::Prerequisite)?,
            similarity: take(RelationKind::Similarity)?,
            advanced: take(RelationKind::Advanced)?,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, kind: RelationKind) -> &[f64] {
        match kind {
            RelationKind::Prerequisite => &self.prerequisite,
            RelationKind::Similarity => &self.similarity,
            RelationKind::Advanced => &self.advanced,
        }
    }
}
