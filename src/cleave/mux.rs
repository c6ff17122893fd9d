use std::path::PathBuf;

use anyhow::{bail, Context};
use rust_htslib::bam::record::Record as BamRecord;

use super::io::{AlignmentChannel, ChannelFactory};
use super::naming::{ChannelName, OutputNaming};
use super::{Destination, RemapTable, Target};

/// Handle to one of the files of a [ChannelMux]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// The `_rest` file, whose header lists the second destination. Reads of the first
    /// destination that end up here keep their first destination reference indices,
    /// so their reference names in this file are not meaningful
    Fallback,
    First(usize),
}

struct Slot<C> {
    name: String,
    path: PathBuf,
    channel: Option<C>,
    written: u64,
}
impl<C: AlignmentChannel> Slot<C> {
    fn write(&mut self, record: &BamRecord) -> anyhow::Result<()> {
        let Some(channel) = self.channel.as_mut() else {
            bail!("Output {} has already been closed", self.path.display());
        };
        channel.write(record)?;
        self.written += 1;
        Ok(())
    }
}

/// What ended up in one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedChannel {
    pub name: String,
    pub path: PathBuf,
    pub records: u64,
}

///////////////////////////////
/// All output files of a run. The fallback file is opened right away and receives
/// whatever has no file of its own
pub struct ChannelMux<F: ChannelFactory> {
    factory: F,
    naming: OutputNaming,
    first_targets: Vec<Target>,
    fallback: Slot<F::Channel>,
    channels: Vec<Slot<F::Channel>>,
}

impl<F: ChannelFactory> ChannelMux<F> {
    pub fn new(mut factory: F, naming: OutputNaming, remap: &RemapTable) -> anyhow::Result<ChannelMux<F>> {
        let path = naming.rest();
        let channel = factory
            .open(&path, remap.targets(Destination::Second))
            .with_context(|| format!("Failed to open second bam file {}", path.display()))?;

        Ok(ChannelMux {
            factory,
            naming,
            first_targets: remap.targets(Destination::First).to_vec(),
            fallback: Slot {
                name: "rest".to_string(),
                path,
                channel: Some(channel),
                written: 0,
            },
            channels: Vec::new(),
        })
    }

    /// Open a new file for the first destination. Failure here is typically running
    /// out of file handles, which the caller may choose to survive
    pub fn open(&mut self, name: ChannelName) -> anyhow::Result<ChannelId> {
        if let ChannelName::Bucket(key) = &name {
            check_file_name_part(key)?;
        }
        let path = self.naming.channel(&name);
        let channel = self.factory.open(&path, &self.first_targets)?;
        let label = match name {
            ChannelName::All => "all".to_string(),
            ChannelName::Bucket(key) => key,
            ChannelName::Group(id) => format!("group_{}", id),
        };
        log::debug!("Opened {}", path.display());

        self.channels.push(Slot {
            name: label,
            path,
            channel: Some(channel),
            written: 0,
        });
        Ok(ChannelId::First(self.channels.len() - 1))
    }

    pub fn write(&mut self, id: ChannelId, record: &BamRecord) -> anyhow::Result<()> {
        self.slot_mut(id).write(record)
    }

    pub fn num_open(&self) -> usize {
        self.channels.len() + 1
    }

    pub fn name(&self, id: ChannelId) -> &str {
        &self.slot(id).name
    }

    pub fn written(&self, id: ChannelId) -> u64 {
        self.slot(id).written
    }

    fn slot(&self, id: ChannelId) -> &Slot<F::Channel> {
        match id {
            ChannelId::Fallback => &self.fallback,
            ChannelId::First(i) => &self.channels[i],
        }
    }

    fn slot_mut(&mut self, id: ChannelId) -> &mut Slot<F::Channel> {
        match id {
            ChannelId::Fallback => &mut self.fallback,
            ChannelId::First(i) => &mut self.channels[i],
        }
    }

    /// Close every file, then index the ones that got any reads.
    /// Indexing needs sorted input, so a failure there only warns
    pub fn close_all(&mut self) -> anyhow::Result<Vec<ClosedChannel>> {
        let mut closed = Vec::with_capacity(self.channels.len() + 1);

        log::info!("Indexing first genome files");
        for slot in self.channels.iter_mut() {
            closed.extend(close_and_index(&mut self.factory, slot)?);
        }

        log::info!("Indexing second genome file");
        closed.extend(close_and_index(&mut self.factory, &mut self.fallback)?);

        Ok(closed)
    }
}

/// Cells become part of file names, so they must not leave the output directory
fn check_file_name_part(key: &str) -> anyhow::Result<()> {
    if key.contains(['/', '\\']) || key == "." || key == ".." {
        bail!("Cell {:?} cannot be used in a file name", key);
    }
    Ok(())
}

fn close_and_index<F: ChannelFactory>(
    factory: &mut F,
    slot: &mut Slot<F::Channel>,
) -> anyhow::Result<Option<ClosedChannel>> {
    let Some(channel) = slot.channel.take() else {
        return Ok(None);
    };
    channel
        .close()
        .with_context(|| format!("Failed to close {}", slot.path.display()))?;

    if slot.written > 0 {
        if let Err(e) = factory.index(&slot.path) {
            log::warn!("Could not index {}: {}", slot.path.display(), e);
        }
    }

    Ok(Some(ClosedChannel {
        name: slot.name.clone(),
        path: slot.path.clone(),
        records: slot.written,
    }))
}
