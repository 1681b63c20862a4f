//! Delta Manager Implementation

use crate::{DeltaError, DeltaStore};
use face_landmarks::Landmark;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Per-point displacement of an emotion pose from the baseline
pub type Delta = Vec<Landmark>;

/// Emotion name to delta mapping, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaTable(BTreeMap<String, Delta>);

impl DeltaTable {
    pub fn get(&self, name: &str) -> Option<&Delta> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, delta: Delta) -> Option<Delta> {
        self.0.insert(name.into(), delta)
    }

    pub fn remove(&mut self, name: &str) -> Option<Delta> {
        self.0.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Delta)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Delta)> for DeltaTable {
    fn from_iter<I: IntoIterator<Item = (String, Delta)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn check_topology(expected: usize, actual: usize) -> Result<(), DeltaError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DeltaError::TopologyMismatch { expected, actual })
    }
}

/// Owner of the neutral baseline and the emotion delta table
#[derive(Default)]
pub struct DeltaManager {
    /// Neutral pose, absent until extracted
    baseline: Option<Vec<Landmark>>,
    /// Deltas by emotion name
    deltas: DeltaTable,
    /// Injected persistence service
    store: Option<Box<dyn DeltaStore>>,
}

impl DeltaManager {
    /// Create a manager without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager backed by a persistence service
    pub fn with_store(store: impl DeltaStore + 'static) -> Self {
        Self {
            store: Some(Box::new(store)),
            ..Self::default()
        }
    }

    /// Replace the neutral baseline
    pub fn set_baseline(&mut self, landmarks: Vec<Landmark>) {
        info!("Baseline set with {} landmarks", landmarks.len());
        self.baseline = Some(landmarks);
    }

    pub fn baseline(&self) -> Option<&[Landmark]> {
        self.baseline.as_deref()
    }

    /// Compute and store `landmarks - baseline` under `name`
    pub fn compute_delta(&mut self, landmarks: &[Landmark], name: &str) -> Result<(), DeltaError> {
        let baseline = self.baseline.as_ref().ok_or(DeltaError::MissingBaseline)?;
        check_topology(baseline.len(), landmarks.len())?;

        let delta: Delta = landmarks
            .iter()
            .zip(baseline)
            .map(|(&emotion, &neutral)| emotion - neutral)
            .collect();

        debug!("Computed delta for '{}' ({} points)", name, delta.len());
        self.deltas.insert(name, delta);
        Ok(())
    }

    pub fn get_delta(&self, name: &str) -> Option<&Delta> {
        self.deltas.get(name)
    }

    pub fn remove_delta(&mut self, name: &str) -> Option<Delta> {
        self.deltas.remove(name)
    }

    /// Emotion names with a stored delta
    pub fn emotions(&self) -> impl Iterator<Item = &str> {
        self.deltas.names()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Drop every stored delta ahead of a re-extraction
    pub fn clear(&mut self) {
        self.deltas = DeltaTable::default();
    }

    /// `base[i] + delta[i] * intensity` for every point
    pub fn apply_delta(
        base: &[Landmark],
        delta: &[Landmark],
        intensity: f32,
    ) -> Result<Vec<Landmark>, DeltaError> {
        check_topology(base.len(), delta.len())?;
        Ok(base
            .iter()
            .zip(delta)
            .map(|(&b, &d)| b + d * intensity)
            .collect())
    }

    /// `base` plus the weighted sum of the named deltas.
    ///
    /// Names without a stored delta are skipped.
    pub fn blend(&self, base: &[Landmark], weights: &[(&str, f32)]) -> Result<Vec<Landmark>, DeltaError> {
        let mut result = base.to_vec();
        for &(name, weight) in weights {
            let Some(delta) = self.deltas.get(name) else {
                debug!("Blend skipping unknown emotion '{}'", name);
                continue;
            };
            check_topology(base.len(), delta.len())?;
            for (point, &d) in result.iter_mut().zip(delta) {
                *point += d * weight;
            }
        }
        Ok(result)
    }

    /// Snapshot of the whole delta table
    pub fn export(&self) -> DeltaTable {
        self.deltas.clone()
    }

    /// Replace the delta table with a snapshot
    pub fn import(&mut self, table: DeltaTable) {
        if let Some(baseline) = &self.baseline {
            for (name, delta) in table.iter() {
                if delta.len() != baseline.len() {
                    warn!(
                        "Imported delta '{}' has {} points, baseline has {}",
                        name,
                        delta.len(),
                        baseline.len()
                    );
                }
            }
        }
        info!("Imported {} deltas", table.len());
        self.deltas = table;
    }

    /// Save the table through the persistence service.
    ///
    /// Returns `false` when no service is configured.
    pub fn persist(&self) -> Result<bool, DeltaError> {
        match &self.store {
            Some(store) => {
                store.save(&self.deltas)?;
                Ok(true)
            }
            None => {
                debug!("No delta store configured, skipping persist");
                Ok(false)
            }
        }
    }

    /// Import the table from the persistence service.
    ///
    /// Returns `false` when no service is configured or it holds no snapshot.
    pub fn restore(&mut self) -> Result<bool, DeltaError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        match store.load()? {
            Some(table) => {
                self.import(table);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
