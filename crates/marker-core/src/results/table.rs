//! Tab-separated position table: one row per frame, one column group per sequence

use super::SequenceResult;
use crate::geometry::Position;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Final table composed from per-sequence results.
///
/// Each cell is `x\ty\tflag` with coordinates in 3-decimal fixed point and
/// `flag` 1 for a detection, 0 otherwise. Frames a sequence never reached
/// are written as the sentinel with flag 0.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    frame_count: usize,
    sequences: Vec<SequenceResult>,
}

impl ResultTable {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            sequences: Vec::new(),
        }
    }

    pub fn push(&mut self, result: SequenceResult) {
        self.sequences.push(result);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sequences(&self) -> &[SequenceResult] {
        &self.sequences
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for row in 0..self.frame_count {
            let cells: Vec<String> = self
                .sequences
                .iter()
                .map(|sequence| match sequence.frames.get(row) {
                    Some(frame) => format_cell(frame.position(), frame.detected()),
                    None => format_cell(Position::SENTINEL, false),
                })
                .collect();

            writeln!(writer, "{}", cells.join("\t"))
                .with_context(|| format!("Failed to write result row {}", row))?;
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create result file: {:?}", path))?;

        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush result file: {:?}", path))?;

        tracing::info!(
            "Wrote {} rows x {} sequences to {:?}",
            self.frame_count,
            self.sequences.len(),
            path
        );
        Ok(())
    }
}

fn format_cell(position: Position, detected: bool) -> String {
    format!("{:.3}\t{:.3}\t{}", position.x, position.y, u8::from(detected))
}
