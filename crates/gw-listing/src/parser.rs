//! Boundary-condition flux parser.
//!
//! The listing file is streamed once, top to bottom. Outside a block the
//! parser looks for stress-period markers and flux block headers; inside a
//! block every line starting with the block's record prefix is one flux
//! record, numbered in output order. The first line that is not a record
//! ends the block and is scanned again for markers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gw_core::{BcType, Snapshot, StressPeriod, TimeStep, ensure_finite};

use crate::cursor::{Line, LineCursor};
use crate::error::{ListingError, ListingResult};
use crate::flux::{FluxKey, FluxRecord, FluxTable};
use crate::layout::{FluxBlockLayout, ListingLayout};
use crate::lookup::ReachLookup;

pub struct ListingParser<'a> {
    lookup: &'a ReachLookup,
    layout: ListingLayout,
    bc_types: Vec<BcType>,
}

impl<'a> ListingParser<'a> {
    pub fn new(lookup: &'a ReachLookup) -> Self {
        Self {
            lookup,
            layout: ListingLayout::default(),
            bc_types: BcType::REPORT_ORDER.to_vec(),
        }
    }

    pub fn with_layout(mut self, layout: ListingLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Restrict parsing to these packages; blocks of other types are skipped.
    pub fn with_bc_types(mut self, bc_types: &[BcType]) -> Self {
        self.bc_types = bc_types.to_vec();
        self
    }

    pub fn parse_file(&self, path: &Path) -> ListingResult<FluxTable> {
        let file = File::open(path).map_err(|e| ListingError::io(path, e))?;
        self.parse(BufReader::new(file), path)
    }

    pub fn parse<R: BufRead>(&self, reader: R, origin: &Path) -> ListingResult<FluxTable> {
        let mut cursor = LineCursor::new(reader, origin);
        let mut table = FluxTable::new();

        while let Some(line) = cursor.next_line()? {
            if line.text.starts_with(&self.layout.stress_period_marker) {
                let stress_period: StressPeriod =
                    line.field(self.layout.stress_period, "stress period", "stress period marker")?;
                tracing::debug!(stress_period = %stress_period, line = line.number, "Stress period");
                table.note_stress_period_marker();
                continue;
            }
            for &bc_type in &self.bc_types {
                let block = self.layout.block(bc_type);
                if line.text.starts_with(&block.header) {
                    let snapshot = block_snapshot(&line, block, bc_type)?;
                    self.read_block(&mut cursor, &mut table, bc_type, snapshot)?;
                    break;
                }
            }
        }

        tracing::info!(
            path = %origin.display(),
            lines = cursor.lines_read(),
            records = table.len(),
            stress_periods = table.stress_period_count(),
            "Parsed boundary-condition fluxes"
        );
        Ok(table)
    }

    fn read_block<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        table: &mut FluxTable,
        bc_type: BcType,
        snapshot: Snapshot,
    ) -> ListingResult<()> {
        let block = self.layout.block(bc_type);
        let context = format!("{bc_type} block {snapshot}");
        let stress_period = snapshot.stress_period;
        table.begin_master(bc_type, snapshot);
        table.note_stress_period(stress_period);

        let mut ordinal = 0usize;
        loop {
            let Some(line) = cursor.next_line()? else {
                return Err(ListingError::UnexpectedEof {
                    what: format!("{} fluxes", block_name(bc_type)),
                });
            };
            if !line.text.starts_with(&block.record_prefix) {
                cursor.push_back(line);
                break;
            }
            ordinal += 1;

            let sequence: usize = line.field(block.sequence, "sequence number", &context)?;
            if sequence != ordinal {
                return Err(ListingError::SequenceMismatch {
                    bc_type,
                    snapshot,
                    expected: ordinal,
                    found: sequence,
                    line_no: line.number,
                });
            }
            let reach_id = self.lookup.translate(bc_type, stress_period, ordinal)?;
            let flux: f64 = line.field(block.flux, "flux", &context)?;
            let flux = ensure_finite(flux, "flux")?;
            table.insert(FluxRecord {
                key: FluxKey::new(bc_type, reach_id, snapshot),
                flux,
            })?;
        }

        let expected = self
            .lookup
            .sequence(bc_type, stress_period)
            .map_or(0, <[_]>::len);
        if ordinal != expected {
            return Err(ListingError::LookupLengthMismatch {
                bc_type,
                snapshot,
                expected,
                found: ordinal,
            });
        }
        tracing::debug!(bc = %bc_type, snapshot = %snapshot, records = ordinal, "Flux block");
        Ok(())
    }
}

fn block_snapshot(line: &Line, block: &FluxBlockLayout, bc_type: BcType) -> ListingResult<Snapshot> {
    let context = format!("{bc_type} block header");
    let stress_period: u32 = line.field(block.stress_period, "stress period", &context)?;
    let time_step: u32 = line.field(block.time_step, "time step", &context)?;
    Ok(Snapshot::new(
        TimeStep::new(time_step)?,
        StressPeriod::new(stress_period)?,
    ))
}

fn block_name(bc_type: BcType) -> &'static str {
    match bc_type {
        BcType::River => "RIVER",
        BcType::Drain => "DRAIN",
        BcType::GeneralHead => "GHB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::ReachId;

    fn river_header(sp: u32, ts: u32) -> String {
        format!("    RIVER LEAKAGE   PERIOD {sp:>4}   STEP{ts:>4}")
    }

    fn river_record(seq: usize, flux: f64) -> String {
        let head = format!(" REACH {seq:>6}   LAYER   1   ROW   10   COL   20");
        format!("{head:<58}{flux:>14.6E}")
    }

    fn listing(lines: &[String]) -> String {
        let mut text = lines.join("\n");
        text.push_str("\n\n");
        text
    }

    fn lookup(ids: &[u32]) -> ReachLookup {
        let mut lookup = ReachLookup::new();
        lookup
            .insert_sequence(
                BcType::River,
                StressPeriod::FIRST,
                ids.iter().copied().map(ReachId).collect(),
            )
            .unwrap();
        lookup
    }

    #[test]
    fn record_helpers_line_up_with_layout() {
        let layout = ListingLayout::default();
        let header = river_header(1, 1);
        let record = river_record(3, -5.0);
        assert_eq!(layout.river.stress_period.slice(&header).trim(), "1");
        assert_eq!(layout.river.time_step.slice(&header).trim(), "1");
        assert_eq!(layout.river.sequence.slice(&record).trim(), "3");
        assert_eq!(
            layout.river.flux.slice(&record).trim().parse::<f64>().unwrap(),
            -5.0
        );
    }

    #[test]
    fn block_ending_line_is_scanned_again() {
        let text = listing(&[
            river_header(1, 1),
            river_record(1, 2.0),
            river_header(2, 1),
            river_record(1, 3.0),
        ]);
        let mut lookup = lookup(&[42]);
        lookup
            .insert_sequence(BcType::River, StressPeriod::new(2).unwrap(), vec![ReachId(42)])
            .unwrap();
        let table = ListingParser::new(&lookup)
            .parse(text.as_bytes(), Path::new("mem"))
            .unwrap();
        assert_eq!(table.len(), 2);
        let sp2 = Snapshot::from_raw(1, 2).unwrap();
        assert_eq!(table.get(BcType::River, ReachId(42), sp2), Some(3.0));
    }

    #[test]
    fn out_of_order_sequence_is_malformed() {
        let text = listing(&[river_header(1, 1), river_record(2, 1.0)]);
        let lookup = lookup(&[1, 2]);
        let err = ListingParser::new(&lookup)
            .parse(text.as_bytes(), Path::new("mem"))
            .unwrap_err();
        assert!(matches!(err, ListingError::SequenceMismatch { found: 2, .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn skipped_types_are_ignored() {
        let text = listing(&[river_header(1, 1), river_record(1, 1.0)]);
        let empty = ReachLookup::new();
        let table = ListingParser::new(&empty)
            .with_bc_types(&[BcType::Drain])
            .parse(text.as_bytes(), Path::new("mem"))
            .unwrap();
        assert!(table.is_empty());
    }
}
