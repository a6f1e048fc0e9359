//! Planar 8-bit YUV file reader

use crate::traits::FrameSource;
use crate::Result;
use anyhow::{bail, Context};
use opencv::{
    core::{self, Mat, Size},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Chroma subsampling of a planar YUV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChromaFormat {
    #[default]
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaFormat {
    /// Chroma plane dimensions for a `width`x`height` luma plane
    pub fn chroma_size(&self, width: usize, height: usize) -> (usize, usize) {
        match self {
            ChromaFormat::Yuv420 => (width / 2, height / 2),
            ChromaFormat::Yuv422 => (width / 2, height),
            ChromaFormat::Yuv444 => (width, height),
        }
    }

    /// Horizontal and vertical subsampling factors
    fn factors(&self) -> (usize, usize) {
        match self {
            ChromaFormat::Yuv420 => (2, 2),
            ChromaFormat::Yuv422 => (2, 1),
            ChromaFormat::Yuv444 => (1, 1),
        }
    }

    pub fn frame_bytes(&self, width: usize, height: usize) -> usize {
        let (cw, ch) = self.chroma_size(width, height);
        width * height + 2 * cw * ch
    }
}

impl TryFrom<u32> for ChromaFormat {
    type Error = anyhow::Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            420 => Ok(ChromaFormat::Yuv420),
            422 => Ok(ChromaFormat::Yuv422),
            444 => Ok(ChromaFormat::Yuv444),
            other => bail!("unsupported chroma subsampling: {}", other),
        }
    }
}

/// Reads frames of a raw planar YUV file as 3-channel (Y, U, V) Mats with
/// upsampled chroma.
pub struct YuvCapture {
    path: PathBuf,
    reader: BufReader<File>,
    width: usize,
    height: usize,
    format: ChromaFormat,
    step: usize,
    next_frame: usize,
    frame_count: usize,
    buffer: Vec<u8>,
}

impl YuvCapture {
    /// Open `path`; `step` frames are advanced per read, so 1 reads every frame
    pub fn open<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        format: ChromaFormat,
        step: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if width == 0 || height == 0 {
            bail!("invalid YUV resolution {}x{}", width, height);
        }
        if step == 0 {
            bail!("frame step must be at least 1");
        }

        let file =
            File::open(&path).with_context(|| format!("Failed to open YUV file: {:?}", path))?;
        let file_len = file
            .metadata()
            .with_context(|| format!("Failed to stat YUV file: {:?}", path))?
            .len() as usize;

        let (width, height) = (width as usize, height as usize);
        let frame_bytes = format.frame_bytes(width, height);
        let frame_count = file_len / frame_bytes;
        if file_len % frame_bytes != 0 {
            warn!(
                path = %path.display(),
                trailing_bytes = file_len % frame_bytes,
                "YUV file ends with a partial frame"
            );
        }
        debug!(path = %path.display(), frames = frame_count, "opened YUV file");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            width,
            height,
            format,
            step,
            next_frame: 0,
            frame_count,
            buffer: vec![0; frame_bytes],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Complete frames stored in the file
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Index of the frame the next read returns
    pub fn position(&self) -> usize {
        self.next_frame
    }

    fn read_planes(&mut self) -> Result<bool> {
        let offset = (self.next_frame * self.buffer.len()) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        match self.reader.read_exact(&mut self.buffer) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(path = %self.path.display(), frame = self.next_frame, "short read");
                Ok(false)
            }
            Err(err) => Err(err).with_context(|| {
                format!("Failed to read frame {} of {:?}", self.next_frame, self.path)
            }),
        }
    }

    /// Interleave the planes into (Y, U, V) pixels
    fn interleave(&self) -> Result<Mat> {
        let (w, h) = (self.width, self.height);
        let (cw, ch) = self.format.chroma_size(w, h);
        let (fx, fy) = self.format.factors();

        let luma = &self.buffer[..w * h];
        let u_plane = &self.buffer[w * h..w * h + cw * ch];
        let v_plane = &self.buffer[w * h + cw * ch..];

        let mut mat = Mat::new_rows_cols_with_default(
            h as i32,
            w as i32,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?;
        let data = mat.data_bytes_mut()?;
        for row in 0..h {
            let crow = (row / fy).min(ch.saturating_sub(1));
            for col in 0..w {
                let ccol = (col / fx).min(cw.saturating_sub(1));
                let pixel = (row * w + col) * 3;
                data[pixel] = luma[row * w + col];
                data[pixel + 1] = u_plane[crow * cw + ccol];
                data[pixel + 2] = v_plane[crow * cw + ccol];
            }
        }
        Ok(mat)
    }
}

impl FrameSource for YuvCapture {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        if self.next_frame >= self.frame_count {
            return Ok(None);
        }
        if !self.read_planes()? {
            return Ok(None);
        }

        let frame = self.interleave()?;
        self.next_frame += self.step;
        Ok(Some(frame))
    }

    fn frame_size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }
}
