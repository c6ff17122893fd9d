use std::io::Write;

use super::bucket::BucketRegistry;
use super::Destination;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenomeStats {
    pub mapped_pairs: u64,
    pub single_mapped: u64,
    pub chimeras: u64,
}

///////////////////////////////
/// Read counts for the whole run. Counters only ever go up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaveStats {
    pub first: GenomeStats,
    pub second: GenomeStats,
    pub unmapped: u64,
}

impl CleaveStats {
    pub fn genome(&self, destination: Destination) -> &GenomeStats {
        match destination {
            Destination::First => &self.first,
            Destination::Second => &self.second,
        }
    }

    pub fn genome_mut(&mut self, destination: Destination) -> &mut GenomeStats {
        match destination {
            Destination::First => &mut self.first,
            Destination::Second => &mut self.second,
        }
    }

    /// Count a read once its mate has been resolved
    pub fn count_read(&mut self, destination: Destination, mapped: bool, mate_mapped: bool) {
        if !mapped {
            self.unmapped += 1;
        } else if mate_mapped {
            self.genome_mut(destination).mapped_pairs += 1;
        } else {
            self.genome_mut(destination).single_mapped += 1;
        }
    }

    pub fn count_chimera(&mut self, destination: Destination) {
        self.genome_mut(destination).chimeras += 1;
    }

    /// Every read ends up as a pair, a singleton or unmapped; chimeras are counted on top
    pub fn total_reads(&self) -> u64 {
        self.first.mapped_pairs
            + self.first.single_mapped
            + self.second.mapped_pairs
            + self.second.single_mapped
            + self.unmapped
    }
}

fn tsv_writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(w)
}

/// One block of counts, followed by an empty line
fn write_genome<W: Write>(w: &mut W, title: &str, stats: &GenomeStats) -> anyhow::Result<()> {
    {
        let mut out = tsv_writer(&mut *w);
        out.write_record([title])?;
        out.write_record(["Mapped pairs", stats.mapped_pairs.to_string().as_str()])?;
        out.write_record(["Singletons", stats.single_mapped.to_string().as_str()])?;
        out.write_record(["Chimeras", stats.chimeras.to_string().as_str()])?;
        out.flush()?;
    }
    //csv would quote an empty record
    writeln!(w)?;
    Ok(())
}

///////////////////////////////
/// Write the tab separated run log: counts per genome, then reads per cell
pub fn write_split_log<W: Write>(
    mut w: W,
    stats: &CleaveStats,
    registry: Option<&BucketRegistry>,
) -> anyhow::Result<()> {
    write_genome(&mut w, "First Genome", &stats.first)?;
    write_genome(&mut w, "Second Genome", &stats.second)?;
    writeln!(w)?;

    let mut out = tsv_writer(&mut w);
    out.write_record(["Unmapped reads", stats.unmapped.to_string().as_str()])?;

    out.write_record(["Saved cell data"])?;
    out.write_record(["Cell", "Reads", "Saved"])?;
    if let Some(registry) = registry {
        for bucket in registry.report_order() {
            out.write_record([
                bucket.key.as_str(),
                bucket.count.to_string().as_str(),
                bucket.saved.to_string().as_str(),
            ])?;
        }
    }
    out.flush()?;
    Ok(())
}

///////////////////////////////
/// Tab separated list of read pairs with one end in each genome
pub struct ChimeraReport<W: Write> {
    out: csv::Writer<W>,
}

impl<W: Write> ChimeraReport<W> {
    pub fn new(w: W) -> anyhow::Result<ChimeraReport<W>> {
        let mut out = tsv_writer(w);
        out.write_record(["First", "", "Second", ""])?;
        Ok(ChimeraReport { out })
    }

    pub fn write(&mut self, name: &str, pos: i64, mate_name: &str, mate_pos: i64) -> anyhow::Result<()> {
        self.out
            .write_record([name, pos.to_string().as_str(), mate_name, mate_pos.to_string().as_str()])?;
        Ok(())
    }

    pub fn finish(mut self) -> anyhow::Result<W> {
        self.out.flush()?;
        self.out
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush chimera report: {}", e.error()))
    }
}
