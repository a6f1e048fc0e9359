//! Sequence and reference-mask list files
//!
//! A batch run is described by two plain-text lists holding one path per
//! whitespace-separated token: the frame sequences, and for each sequence the
//! reference mask recorded from the same camera.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("list {0:?} contains no paths")]
    Empty(PathBuf),
    #[error("{sequences} sequences but {masks} masks")]
    CountMismatch { sequences: usize, masks: usize },
}

/// One sequence of the batch together with its reference mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceInput {
    pub index: usize,
    pub frames: PathBuf,
    pub mask: PathBuf,
}

impl SequenceInput {
    /// Short display name, the file name of the frame sequence
    pub fn name(&self) -> String {
        self.frames
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.frames.to_string_lossy().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequenceList {
    pub sequences: Vec<SequenceInput>,
}

impl SequenceList {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(sequence_list: P, mask_list: Q) -> Result<Self> {
        let frames = read_paths(sequence_list.as_ref())?;
        let masks = read_paths(mask_list.as_ref())?;
        Ok(Self::from_paths(frames, masks)?)
    }

    pub fn from_paths(frames: Vec<PathBuf>, masks: Vec<PathBuf>) -> Result<Self, ListError> {
        if frames.len() != masks.len() {
            return Err(ListError::CountMismatch {
                sequences: frames.len(),
                masks: masks.len(),
            });
        }

        let sequences = frames
            .into_iter()
            .zip(masks)
            .enumerate()
            .map(|(index, (frames, mask))| SequenceInput { index, frames, mask })
            .collect();

        Ok(Self { sequences })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Keep at most `count` sequences
    pub fn truncate(&mut self, count: usize) {
        if count < self.sequences.len() {
            tracing::info!("Limiting run to {} of {} sequences", count, self.sequences.len());
            self.sequences.truncate(count);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceInput> {
        self.sequences.iter()
    }
}

fn read_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read list file: {:?}", path))?;

    let paths: Vec<PathBuf> = content.split_whitespace().map(PathBuf::from).collect();
    if paths.is_empty() {
        return Err(ListError::Empty(path.to_path_buf()).into());
    }

    tracing::debug!("Loaded {} paths from {:?}", paths.len(), path);
    Ok(paths)
}
