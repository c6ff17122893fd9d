use anyhow::Context;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use super::io::{is_exhausted, ChannelFactory};
use super::mux::{ChannelId, ChannelMux};
use super::naming::ChannelName;
use crate::fileformat::GroupTable;

///////////////////////////////
/// Which cells get a file of their own
#[derive(Debug, Clone)]
pub enum AdmissionPolicy {
    /// The cells with the most reads
    TopK(usize),
    /// Cells given in a list, in list order
    Listed(Vec<String>),
    /// Cells sharing a group go into one file per group
    Grouped(GroupTable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Discovered,
    Admitted(ChannelId),
    Rejected,
}

#[derive(Debug, Clone)]
pub struct Bucket {
    pub key: String,
    /// Reads seen while discovering
    pub count: u64,
    /// Reads written to the file of this bucket
    pub saved: u64,
    pub state: BucketState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionSummary {
    pub admitted: usize,
    pub rejected: usize,
    /// Admission stopped early because no more files could be opened
    pub exhausted: bool,
}

///////////////////////////////
/// All cells seen, with their counts and the file they go to
#[derive(Debug, Default)]
pub struct BucketRegistry {
    index: FxHashMap<String, usize>,
    buckets: Vec<Bucket>,
    sealed: bool,
}

impl BucketRegistry {
    pub fn new() -> BucketRegistry {
        BucketRegistry::default()
    }

    /// Count one read for a cell
    pub fn observe(&mut self, key: &str) {
        debug_assert!(!self.sealed, "cannot observe after admission");
        if let Some(&i) = self.index.get(key) {
            self.buckets[i].count += 1;
        } else {
            self.index.insert(key.to_string(), self.buckets.len());
            self.buckets.push(Bucket {
                key: key.to_string(),
                count: 1,
                saved: 0,
                state: BucketState::Discovered,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Bucket> {
        self.index.get(key).map(|&i| &self.buckets[i])
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Bucket indices, most reads first. Equal counts are ordered by key
    fn ranked(&self) -> Vec<usize> {
        (0..self.buckets.len())
            .sorted_by(|&a, &b| {
                let (a, b) = (&self.buckets[a], &self.buckets[b]);
                b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key))
            })
            .collect()
    }

    /// Decide once and for all which buckets get a file. Every bucket is either
    /// admitted or rejected afterwards. Running out of file handles stops admission but
    /// is not an error; the remaining buckets are rejected. Any other failure to open
    /// a file is an error
    pub fn select_for_admission<F: ChannelFactory>(
        &mut self,
        policy: &AdmissionPolicy,
        mux: &mut ChannelMux<F>,
    ) -> anyhow::Result<AdmissionSummary> {
        assert!(!self.sealed, "admission can only be done once");
        self.sealed = true;

        let candidates: Vec<usize> = match policy {
            AdmissionPolicy::TopK(max_admitted) => {
                self.ranked().into_iter().take(*max_admitted).collect()
            }
            AdmissionPolicy::Listed(keys) => keys
                .iter()
                .filter_map(|key| {
                    let found = self.index.get(key.as_str()).copied();
                    if found.is_none() {
                        log::debug!("Listed cell {} was never seen", key);
                    }
                    found
                })
                .unique()
                .collect(),
            AdmissionPolicy::Grouped(groups) => self
                .ranked()
                .into_iter()
                .filter(|&i| groups.get(&self.buckets[i].key).is_some())
                .collect(),
        };

        let mut summary = AdmissionSummary::default();
        let mut group_channels: FxHashMap<u32, ChannelId> = FxHashMap::default();

        for (n, &i) in candidates.iter().enumerate() {
            let opened = match policy {
                AdmissionPolicy::Grouped(groups) => {
                    //Candidates were filtered on being in the table
                    let group = groups.get(&self.buckets[i].key).unwrap_or_default();
                    match group_channels.get(&group) {
                        Some(&id) => Ok(id),
                        None => mux.open(ChannelName::Group(group)).inspect(|&id| {
                            group_channels.insert(group, id);
                        }),
                    }
                }
                _ => mux.open(ChannelName::Bucket(self.buckets[i].key.clone())),
            };

            match opened {
                Ok(id) => {
                    self.buckets[i].state = BucketState::Admitted(id);
                    summary.admitted += 1;
                }
                Err(e) if is_exhausted(&e) => {
                    log::warn!("Unable to open more than {} files: {}", mux.num_open(), e);
                    log::warn!(
                        "{} cells will go to the fallback file instead",
                        candidates.len() - n
                    );
                    summary.exhausted = true;
                    break;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to open file for cell {}", self.buckets[i].key)
                    });
                }
            }
            if (n + 1) % 100 == 0 {
                log::debug!("Opened files for {} cells", n + 1);
            }
        }

        for bucket in self.buckets.iter_mut() {
            if bucket.state == BucketState::Discovered {
                bucket.state = BucketState::Rejected;
                summary.rejected += 1;
            }
        }

        log::info!(
            "Admitted {} of {} cells, rejected {}",
            summary.admitted,
            self.buckets.len(),
            summary.rejected
        );
        Ok(summary)
    }

    /// File for the reads of a cell, if the cell was admitted
    pub fn channel_for(&self, key: &str) -> Option<ChannelId> {
        match self.get(key)?.state {
            BucketState::Admitted(id) => Some(id),
            _ => None,
        }
    }

    /// Note that one read of a cell went to its file
    pub fn record_saved(&mut self, key: &str) {
        if let Some(&i) = self.index.get(key) {
            self.buckets[i].saved += 1;
        }
    }

    /// Admitted buckets first, then the rest, each in discovery order
    pub fn report_order(&self) -> impl Iterator<Item = &Bucket> {
        let admitted = self
            .buckets
            .iter()
            .filter(|b| matches!(b.state, BucketState::Admitted(_)));
        let others = self
            .buckets
            .iter()
            .filter(|b| !matches!(b.state, BucketState::Admitted(_)));
        admitted.chain(others)
    }
}
