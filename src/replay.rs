//! Recorded detector output.
//!
//! A recording is a JSON-lines file: one [`RecordedFrame`] per line holding
//! the frame size and the normalized landmarks of every detected face. It
//! stands in for a live camera and detector, so sessions can be replayed
//! deterministically.

use crate::{
    landmarks::LandmarkSet,
    runner::{DetectorFrame, FrameSource},
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub width: f64,
    pub height: f64,
    /// Normalized `[x, y]` keypoints per face
    #[serde(default)]
    pub faces: Vec<Vec<[f64; 2]>>,
}

impl RecordedFrame {
    /// Capture detector output for writing
    #[must_use]
    pub fn from_faces(faces: &[LandmarkSet], width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            faces: faces
                .iter()
                .map(|face| face.points().iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        }
    }

    /// Validate the landmarks and turn the line into detector output
    ///
    /// # Errors
    ///
    /// Returns an error if the frame size is not positive or a face breaks
    /// the landmark contract
    pub fn into_detector_frame(self) -> Result<DetectorFrame> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(Error::Recording(format!(
                "Invalid frame size {}x{}",
                self.width, self.height
            )));
        }
        let faces = self
            .faces
            .iter()
            .map(|pairs| LandmarkSet::from_pairs(pairs))
            .collect::<Result<Vec<_>>>()?;
        Ok(DetectorFrame {
            faces,
            width: self.width,
            height: self.height,
        })
    }
}

/// Reads a JSON-lines recording frame by frame
pub struct RecordingSource<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl RecordingSource<BufReader<File>> {
    /// Open a recording file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Opened recording {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordingSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Next frame record, skipping blank lines
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a malformed line
    pub fn next_record(&mut self) -> Result<Option<RecordedFrame>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(line)
                .map_err(|e| Error::Recording(format!("line {}: {e}", self.line_number)))?;
            return Ok(Some(record));
        }
    }

    /// Lines consumed so far
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead + Send> FrameSource for RecordingSource<R> {
    fn next_frame(&mut self) -> Result<Option<DetectorFrame>> {
        match self.next_record()? {
            Some(record) => record.into_detector_frame().map(Some),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        debug!("Recording closed after {} lines", self.line_number);
    }
}

/// Append frames to a recording
pub struct RecordingWriter<W: Write> {
    writer: W,
}

impl<W: Write> RecordingWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one frame as a single JSON line
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn write_frame(&mut self, frame: &RecordedFrame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame)
            .map_err(|e| Error::Recording(format!("Failed to encode frame: {e}")))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
