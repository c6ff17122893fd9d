use std::io::Write;

use rust_htslib::bam::record::Record as BamRecord;

use super::stats::{ChimeraReport, CleaveStats};
use super::{Destination, RemapTable, Target};
use crate::fileformat::ChromosomeMap;

///////////////////////////////
/// Moves reads over to the reference indices of their destination, and breaks up
/// pairs whose mates ended up in different destinations
pub struct ChimeraDetector<'a> {
    remap: &'a RemapTable,
    source_targets: &'a [Target],
    names: &'a ChromosomeMap,
}

impl<'a> ChimeraDetector<'a> {
    pub fn new(remap: &'a RemapTable, source_targets: &'a [Target], names: &'a ChromosomeMap) -> ChimeraDetector<'a> {
        ChimeraDetector {
            remap,
            source_targets,
            names,
        }
    }

    fn source_name(&self, tid: i32) -> &'a str {
        usize::try_from(tid)
            .ok()
            .and_then(|tid| self.source_targets.get(tid))
            .map(|t| t.name.as_str())
            .unwrap_or("*")
    }

    /// Rewrite the reference indices of the read and count it. Returns where the read belongs
    pub fn classify<W: Write>(
        &self,
        record: &mut BamRecord,
        stats: &mut CleaveStats,
        report: Option<&mut ChimeraReport<W>>,
    ) -> anyhow::Result<Destination> {
        let tid = record.tid();
        let mtid = record.mtid();

        let own = self.remap.route(tid);
        record.set_tid(own.tid);

        if mtid != -1 {
            let mate = self.remap.route(mtid);
            if mate.destination == own.destination {
                record.set_mtid(mate.tid);
            } else {
                stats.count_chimera(own.destination);
                if let Some(report) = report {
                    report.write(
                        self.source_name(tid),
                        record.pos(),
                        self.names.translate(self.source_name(mtid)),
                        record.mpos(),
                    )?;
                }
                //The mate is not really unmapped, but it has no place in this file
                record.set_mate_unmapped();
                record.set_mtid(own.tid);
            }
        }

        stats.count_read(own.destination, !record.is_unmapped(), !record.is_mate_unmapped());
        Ok(own.destination)
    }
}
