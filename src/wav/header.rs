//! Canonical 44-byte RIFF/WAVE header

/// Header size in bytes
pub const WAV_HEADER_SIZE: usize = 44;

/// Bytes in the RIFF chunk that precede the sample data, excluding the
/// 8-byte RIFF chunk header itself
const RIFF_OVERHEAD: u32 = (WAV_HEADER_SIZE - 8) as u32;

pub const NUM_CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

/// WAV header offsets (in bytes)
pub mod offset {
    /// "RIFF" identifier
    pub const RIFF: usize = 0x00;
    /// Size of everything after this field
    pub const CHUNK_SIZE: usize = 0x04;
    /// "WAVE" format
    pub const WAVE: usize = 0x08;
    /// "fmt " sub-chunk identifier
    pub const FMT: usize = 0x0C;
    /// fmt sub-chunk size (16 for PCM)
    pub const FMT_SIZE: usize = 0x10;
    /// Audio format (1 = PCM)
    pub const AUDIO_FORMAT: usize = 0x14;
    pub const NUM_CHANNELS: usize = 0x16;
    pub const SAMPLE_RATE: usize = 0x18;
    pub const BYTE_RATE: usize = 0x1C;
    pub const BLOCK_ALIGN: usize = 0x20;
    pub const BITS_PER_SAMPLE: usize = 0x22;
    /// "data" sub-chunk identifier
    pub const DATA: usize = 0x24;
    /// Sample data size in bytes
    pub const DATA_SIZE: usize = 0x28;
}

/// WAV header for mono 16-bit little-endian PCM
#[derive(Debug, Clone)]
pub struct WavHeader {
    data: [u8; WAV_HEADER_SIZE],
}

impl WavHeader {
    pub fn new(sample_rate: u32) -> Self {
        let mut header = Self {
            data: [0; WAV_HEADER_SIZE],
        };

        header.data[offset::RIFF..offset::RIFF + 4].copy_from_slice(b"RIFF");
        header.data[offset::WAVE..offset::WAVE + 4].copy_from_slice(b"WAVE");
        header.data[offset::FMT..offset::FMT + 4].copy_from_slice(b"fmt ");
        header.data[offset::DATA..offset::DATA + 4].copy_from_slice(b"data");

        header.write_u32(offset::FMT_SIZE, 16);
        header.write_u16(offset::AUDIO_FORMAT, 1);
        header.write_u16(offset::NUM_CHANNELS, NUM_CHANNELS);
        header.write_u16(offset::BLOCK_ALIGN, NUM_CHANNELS * BITS_PER_SAMPLE / 8);
        header.write_u16(offset::BITS_PER_SAMPLE, BITS_PER_SAMPLE);
        header.set_sample_rate(sample_rate);
        header.set_data_size(0);

        header
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) {
        if offset + 1 < WAV_HEADER_SIZE {
            self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        if offset + 3 < WAV_HEADER_SIZE {
            self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Set sample rate and the byte rate derived from it
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let bytes_per_frame = (NUM_CHANNELS * BITS_PER_SAMPLE / 8) as u32;
        self.write_u32(offset::SAMPLE_RATE, sample_rate);
        self.write_u32(offset::BYTE_RATE, sample_rate * bytes_per_frame);
    }

    /// Set data size and the RIFF chunk size derived from it
    pub fn set_data_size(&mut self, data_size: u32) {
        self.write_u32(offset::DATA_SIZE, data_size);
        self.write_u32(offset::CHUNK_SIZE, RIFF_OVERHEAD + data_size);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
