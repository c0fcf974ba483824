//! WAV output for generated samples

pub mod header;
pub mod writer;

pub use header::{WavHeader, WAV_HEADER_SIZE};
pub use writer::WavWriter;

use crate::error::Result;
use crate::generator::SampleGenerator;
use crate::parser::InputSource;
use log::debug;
use std::io::{Seek, Write};

/// Number of samples generated per `generate` call while rendering
pub const RENDER_CHUNK_SAMPLES: usize = 1024;

/// Run a generator to completion, streaming its output into a WAV writer.
///
/// Returns the number of samples written. The writer still has to be
/// finalized.
pub fn render<S, W>(generator: &mut SampleGenerator<S>, writer: &mut WavWriter<W>) -> Result<u64>
where
    S: InputSource,
    W: Write + Seek,
{
    let mut buffer = [0i16; RENDER_CHUNK_SAMPLES];
    let mut total = 0u64;

    loop {
        let count = generator.generate(&mut buffer)?;
        writer.write_samples(&buffer[..count])?;
        total += count as u64;
        if count < buffer.len() {
            break;
        }
    }

    debug!("rendered {} samples", total);
    Ok(total)
}
