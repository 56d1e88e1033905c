//! Section inference from entry labels
//!
//! Given the keys of a raw record, find the one section declaring them.
//! Every label maps to the set of sections declaring it; labels are grouped
//! into clusters by intersecting those sets, and the largest cluster wins.

use super::nodes::Section;
use super::SchemaIndex;
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// How strictly an inference must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Every label must belong to the same single section
    #[default]
    Strict,
    /// The best single section wins even when some labels do not fit it
    Permissive,
}

/// Outcome of inferring a section from a set of labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    /// One section declares every label
    Exact(String),
    /// One section declares the largest share of the labels
    Partial {
        /// The best section
        section_id: String,
        /// Labels the section declares
        matched: usize,
        /// Labels given
        total: usize,
    },
    /// Several sections fit equally well
    Ambiguous(Vec<String>),
    /// No label is declared anywhere
    Unknown,
}

impl SchemaIndex {
    /// Infer the section a set of entry labels belongs to
    ///
    /// Results are cached per label set.
    pub fn infer<S: AsRef<str>>(&self, names: &[S]) -> Inference {
        let mut sorted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        let key = sorted.join("\u{1f}");

        if let Ok(cache) = self.inference_cache.read() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let inference = self.compute_inference(&sorted);
        if let Ok(mut cache) = self.inference_cache.write() {
            cache.insert(key, inference.clone());
        }
        inference
    }

    /// Number of label sets with a cached inference
    pub fn cached_inferences(&self) -> usize {
        self.inference_cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn compute_inference(&self, names: &[&str]) -> Inference {
        let mut clusters: Vec<(BTreeSet<String>, usize)> = Vec::new();

        for name in names {
            let Some(ids) = self.entries.get(*name) else {
                continue;
            };

            let mut joined = false;
            for (cluster, count) in clusters.iter_mut() {
                let common: BTreeSet<String> = cluster.intersection(ids).cloned().collect();
                if !common.is_empty() {
                    *cluster = common;
                    *count += 1;
                    joined = true;
                }
            }
            if !joined {
                clusters.push((ids.clone(), 1));
            }
        }

        let Some(best) = clusters.iter().map(|(_, count)| *count).max() else {
            return Inference::Unknown;
        };

        let winners: BTreeSet<String> = clusters
            .into_iter()
            .filter(|(_, count)| *count == best)
            .flat_map(|(ids, _)| ids)
            .collect();

        if winners.len() > 1 {
            return Inference::Ambiguous(winners.into_iter().collect());
        }

        let section_id = winners.into_iter().next().unwrap_or_default();
        if best == names.len() {
            Inference::Exact(section_id)
        } else {
            Inference::Partial {
                section_id,
                matched: best,
                total: names.len(),
            }
        }
    }

    /// Find the section whose declared entries best match `names`
    ///
    /// In strict mode every miss is an error. In permissive mode an
    /// ambiguous or unknown set gives `None` and a partial match is
    /// accepted with a warning.
    pub fn section_from_field_names<S: AsRef<str>>(
        &self,
        names: &[S],
        mode: InferenceMode,
    ) -> Result<Option<&Section>> {
        let listed = || {
            names
                .iter()
                .map(|n| format!("\"{}\"", n.as_ref()))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match (self.infer(names), mode) {
            (Inference::Exact(id), _) => self.section_by_id(&id).map(Some),
            (Inference::Partial { section_id, matched, total }, InferenceMode::Permissive) => {
                let section = self.section_by_id(&section_id)?;
                tracing::warn!(
                    "only {} of {} entries ({}) belong to {}",
                    matched,
                    total,
                    listed(),
                    section.describe()
                );
                Ok(Some(section))
            }
            (Inference::Partial { section_id, matched, total }, InferenceMode::Strict) => {
                let section = self.section_by_id(&section_id)?;
                Err(Error::Section(format!(
                    "entries {} do not all belong to one section; best match {} declares {} of {}",
                    listed(),
                    section.describe(),
                    matched,
                    total
                )))
            }
            (Inference::Ambiguous(ids), InferenceMode::Strict) => Err(Error::Ambiguous {
                key: format!("section for entries {}", listed()),
                candidates: ids
                    .iter()
                    .filter_map(|id| self.sections.get(id))
                    .map(|s| s.describe())
                    .collect(),
            }),
            (Inference::Unknown, InferenceMode::Strict) => Err(Error::Section(format!(
                "no section declares any of the entries {}",
                listed()
            ))),
            (Inference::Ambiguous(_), InferenceMode::Permissive)
            | (Inference::Unknown, InferenceMode::Permissive) => Ok(None),
        }
    }
}
