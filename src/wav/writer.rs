//! WAV file writer

use super::header::{WavHeader, WAV_HEADER_SIZE};
use crate::error::Result;
use std::io::{self, Seek, SeekFrom, Write};

/// Streams 16-bit samples after a placeholder header, then patches the
/// header sizes in `finalize`
pub struct WavWriter<W: Write + Seek> {
    inner: W,
    header: WavHeader,
    /// Bytes of sample data written so far
    data_size: u32,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Write a placeholder header and position the stream at the sample data
    pub fn new(mut inner: W, sample_rate: u32) -> Result<Self> {
        let header = WavHeader::new(sample_rate);
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(header.as_bytes())?;
        Ok(Self {
            inner,
            header,
            data_size: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        let len = u32::try_from(samples.len() * 2)
            .ok()
            .and_then(|bytes| self.data_size.checked_add(bytes))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "WAV data exceeds 4 GiB"))?;

        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.inner.write_all(&bytes)?;
        self.data_size = len;
        Ok(())
    }

    /// Number of samples written so far
    pub fn samples_written(&self) -> u32 {
        self.data_size / 2
    }

    /// Rewrite the header with final sizes, flush, and return the inner stream
    pub fn finalize(mut self) -> Result<W> {
        self.header.set_data_size(self.data_size);

        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(self.header.as_bytes())?;
        self.inner
            .seek(SeekFrom::Start(WAV_HEADER_SIZE as u64 + self.data_size as u64))?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }
}
