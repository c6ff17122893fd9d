use std::io::Write;

use anyhow::Context;
use rust_htslib::bam::record::Record as BamRecord;

use super::bucket::{AdmissionPolicy, AdmissionSummary, BucketRegistry};
use super::chimera::ChimeraDetector;
use super::io::{AlignmentSource, ChannelFactory};
use super::key::BucketKeySource;
use super::mux::{ChannelId, ChannelMux, ClosedChannel};
use super::naming::ChannelName;
use super::stats::{ChimeraReport, CleaveStats};
use super::{Destination, RemapTable};
use crate::fileformat::ChromosomeMap;

const PROGRESS_INTERVAL: u64 = 1_000_000;

///////////////////////////////
/// Whether and how to split the first destination into one file per cell
#[derive(Debug, Clone)]
pub enum Bucketing {
    None,
    ByCell {
        key_source: BucketKeySource,
        policy: AdmissionPolicy,
    },
}

#[derive(Debug, Clone)]
pub struct CleaveOptions {
    pub bucketing: Bucketing,
    /// In group mode, also write the reads to the group files rather than only creating them
    pub write_group_records: bool,
}

impl CleaveOptions {
    fn is_grouped(&self) -> bool {
        matches!(
            self.bucketing,
            Bucketing::ByCell {
                policy: AdmissionPolicy::Grouped(_),
                ..
            }
        )
    }
}

/// Everything the caller needs to write the logs
#[derive(Debug)]
pub struct CleaveOutcome {
    pub stats: CleaveStats,
    pub registry: Option<BucketRegistry>,
    pub admission: Option<AdmissionSummary>,
    /// Records read in the commit pass; zero if it was skipped
    pub records: u64,
    /// Statistics are only meaningful to report outside group mode
    pub emit_report: bool,
    pub closed: Vec<ClosedChannel>,
}

///////////////////////////////
/// First phase: count reads per cell
struct Discovery<'k> {
    key_source: &'k BucketKeySource,
    registry: BucketRegistry,
}

impl<'k> Discovery<'k> {
    fn scan<S: AlignmentSource>(&mut self, source: &mut S, remap: &RemapTable) -> anyhow::Result<u64> {
        let mut record = BamRecord::new();
        let mut num_reads = 0;
        while let Some(r) = source.read_next(&mut record) {
            r.context("Failed to read record while counting cells")?;
            num_reads += 1;
            if num_reads % PROGRESS_INTERVAL == 0 {
                log::info!("{} reads", num_reads);
            }

            if remap.route(record.tid()).destination == Destination::First {
                if let Some(cell) = self.key_source.extract(&record) {
                    self.registry.observe(&cell);
                }
            }
        }
        log::info!("Found {} cells in {} reads", self.registry.len(), num_reads);
        Ok(num_reads)
    }

    /// The one transition between the phases: pick cells, then commit to them
    fn admit<F: ChannelFactory>(
        mut self,
        policy: &AdmissionPolicy,
        mux: &mut ChannelMux<F>,
    ) -> anyhow::Result<(Commit<'k>, AdmissionSummary)> {
        let summary = self.registry.select_for_admission(policy, mux)?;
        let commit = Commit::ByCell {
            key_source: self.key_source,
            registry: self.registry,
        };
        Ok((commit, summary))
    }
}

///////////////////////////////
/// Second phase: where reads of the first destination are written
enum Commit<'k> {
    All(ChannelId),
    ByCell {
        key_source: &'k BucketKeySource,
        registry: BucketRegistry,
    },
}

impl<'k> Commit<'k> {
    fn channel_for(&mut self, record: &BamRecord) -> ChannelId {
        match self {
            Commit::All(id) => *id,
            Commit::ByCell {
                key_source,
                registry,
            } => {
                let Some(cell) = key_source.extract(record) else {
                    return ChannelId::Fallback;
                };
                match registry.channel_for(&cell) {
                    Some(id) => {
                        registry.record_saved(&cell);
                        id
                    }
                    None => ChannelId::Fallback,
                }
            }
        }
    }

    fn into_registry(self) -> Option<BucketRegistry> {
        match self {
            Commit::All(_) => None,
            Commit::ByCell { registry, .. } => Some(registry),
        }
    }
}

///////////////////////////////
/// Splits one alignment stream into files per destination and per cell
pub struct Cleaver<'a> {
    remap: &'a RemapTable,
    names: &'a ChromosomeMap,
    options: &'a CleaveOptions,
}

impl<'a> Cleaver<'a> {
    pub fn new(remap: &'a RemapTable, names: &'a ChromosomeMap, options: &'a CleaveOptions) -> Cleaver<'a> {
        Cleaver {
            remap,
            names,
            options,
        }
    }

    /// Run both passes and close all outputs
    pub fn run<S, F, W>(
        &self,
        source: &mut S,
        mux: &mut ChannelMux<F>,
        mut chimeras: Option<&mut ChimeraReport<W>>,
    ) -> anyhow::Result<CleaveOutcome>
    where
        S: AlignmentSource,
        F: ChannelFactory,
        W: Write,
    {
        let grouped = self.options.is_grouped();

        let (mut commit, admission) = match &self.options.bucketing {
            Bucketing::None => {
                let id = mux
                    .open(ChannelName::All)
                    .context("Failed to open first bam file")?;
                (Commit::All(id), None)
            }
            Bucketing::ByCell { key_source, policy } => {
                let mut discovery = Discovery {
                    key_source,
                    registry: BucketRegistry::new(),
                };
                discovery.scan(source, self.remap)?;
                source.rewind().context("Failed to rewind input")?;
                let (commit, summary) = discovery.admit(policy, mux)?;
                (commit, Some(summary))
            }
        };

        if grouped && !self.options.write_group_records {
            log::info!("Group files created; not writing reads in group mode");
            let closed = mux.close_all()?;
            return Ok(CleaveOutcome {
                stats: CleaveStats::default(),
                registry: commit.into_registry(),
                admission,
                records: 0,
                emit_report: false,
                closed,
            });
        }

        let targets = source.targets().to_vec();
        let detector = ChimeraDetector::new(self.remap, &targets, self.names);
        let mut stats = CleaveStats::default();
        let mut record = BamRecord::new();
        let mut num_reads: u64 = 0;

        while let Some(r) = source.read_next(&mut record) {
            r.context("Failed to read record")?;
            num_reads += 1;
            if num_reads % PROGRESS_INTERVAL == 0 {
                log::info!("{} reads", num_reads);
            }

            let report = if grouped { None } else { chimeras.as_deref_mut() };
            let destination = detector.classify(&mut record, &mut stats, report)?;
            let channel = match destination {
                Destination::First => commit.channel_for(&record),
                Destination::Second => ChannelId::Fallback,
            };
            mux.write(channel, &record)?;
        }
        log::info!("Finished writing {} reads", num_reads);

        let closed = mux.close_all()?;
        Ok(CleaveOutcome {
            stats,
            registry: commit.into_registry(),
            admission,
            records: num_reads,
            emit_report: !grouped,
            closed,
        })
    }
}
