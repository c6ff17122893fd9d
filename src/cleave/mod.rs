pub mod bucket;
pub mod chimera;
pub mod driver;
pub mod io;
pub mod key;
pub mod mux;
pub mod naming;
pub mod remap;
pub mod stats;

#[cfg(test)]
pub mod testing;

pub use bucket::{AdmissionPolicy, AdmissionSummary, Bucket, BucketRegistry, BucketState};
pub use chimera::ChimeraDetector;
pub use driver::{Bucketing, CleaveOptions, CleaveOutcome, Cleaver};
pub use io::{AlignmentChannel, AlignmentSource, ChannelFactory, ChannelsExhausted};
pub use key::{BucketKeySource, DEFAULT_CELL_TAG};
pub use mux::{ChannelId, ChannelMux, ClosedChannel};
pub use naming::{ChannelName, OutputNaming};
pub use remap::{Destination, RemapEntry, RemapFilter, RemapTable, Target};
pub use stats::{write_split_log, ChimeraReport, CleaveStats, GenomeStats};
