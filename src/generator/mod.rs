//! PCM sample generation from parsed notes
//!
//! A [`SampleGenerator`] owns a [`Parser`] and keeps one [`NoteStream`] per
//! channel. Every output sample mixes one sample from each channel that still
//! has notes, pulling the next note from the parser whenever the current one
//! runs out.

pub mod pitch;
pub mod waveform;

pub use pitch::key_to_hz;
pub use waveform::{fast_sin, Waveform, MAX_HARMONICS};

use crate::error::{Error, Result};
use crate::parser::{InputSource, Note, Parser, MAX_CHANNELS};
use log::debug;
use serde::{Deserialize, Serialize};

/// Largest magnitude of an output sample
pub const MAX_SAMPLE_VALUE: i16 = i16::MAX;

/// Sample generator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Length of the linear fade-in at the start of each note, in samples
    pub attack_samples: u32,
    /// Length of the linear fade-out at the end of each note, in samples
    pub decay_samples: u32,
    /// Output volume, 0.0 - 1.0
    pub amplitude: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            attack_samples: 100,
            decay_samples: 500,
            amplitude: 0.8,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(Error::InvalidAmplitude(self.amplitude));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Number of samples a note of `duration_ms` occupies
    pub fn note_samples(&self, duration_ms: u16) -> u32 {
        (duration_ms as u64 * self.sample_rate as u64 / 1000) as u32
    }
}

/// Playback state of the note currently sounding on one channel
#[derive(Debug, Clone, Default)]
pub struct NoteStream {
    pub note: Note,
    /// Samples already generated for this note
    pub elapsed: u32,
    /// Absolute index of the note's first sample
    pub start_sample: u64,
    pub num_samples: u32,
    pub attack: u32,
    pub decay: u32,
    pub pitch_hz: f32,
    /// Vibrato phase accumulator, 0.0 - 1.0
    pub phasor: f32,
    pub waveform: Waveform,
}

impl NoteStream {
    fn load(&mut self, note: Note, start_sample: u64, config: &GeneratorConfig) {
        self.note = note;
        self.elapsed = 0;
        self.start_sample = start_sample;
        self.num_samples = config.note_samples(note.duration_ms);
        self.phasor = 0.0;
        self.pitch_hz = key_to_hz(note.key);

        let (attack, decay) =
            clamp_envelope(config.attack_samples, config.decay_samples, self.num_samples);
        self.attack = attack;
        self.decay = decay;
    }

    fn is_exhausted(&self) -> bool {
        self.elapsed >= self.num_samples
    }

    /// Produce the next sample for this note, scaled by `amplitude`
    fn next_sample(&mut self, sample_rate: u32, amplitude: f32) -> f32 {
        let elapsed = self.elapsed;
        self.elapsed += 1;

        if self.note.is_rest() {
            return 0.0;
        }

        let rate = sample_rate as f64;
        let value = if self.note.has_vibrato() {
            let sweep = (self.note.vibrato_frequency_hz as f64 * elapsed as f64 / rate).fract();
            let pitch =
                self.pitch_hz + self.note.vibrato_variance_hz as f32 * fast_sin(sweep as f32);
            let value = self.waveform.sample(self.phasor, pitch, sample_rate);
            self.phasor = (self.phasor + pitch / sample_rate as f32).rem_euclid(1.0);
            value
        } else {
            let phase = (self.pitch_hz as f64 * elapsed as f64 / rate).fract();
            self.waveform.sample(phase as f32, self.pitch_hz, sample_rate)
        };

        let mut raw = value * MAX_SAMPLE_VALUE as f32;
        let remaining = self.num_samples - elapsed;
        if elapsed < self.attack {
            raw *= elapsed as f32 / self.attack as f32;
        } else if remaining < self.decay {
            raw *= remaining as f32 / self.decay as f32;
        }

        raw * amplitude
    }
}

/// Shrink attack and decay so that together they fit in `num_samples`.
/// The longer ramp gives way first.
fn clamp_envelope(attack: u32, decay: u32, num_samples: u32) -> (u32, u32) {
    let total = attack as u64 + decay as u64;
    if total <= num_samples as u64 {
        return (attack, decay);
    }

    let mut excess = (total - num_samples as u64) as u32;
    let (mut attack, mut decay) = (attack, decay);
    let (first, second) = if attack > decay {
        (&mut attack, &mut decay)
    } else {
        (&mut decay, &mut attack)
    };

    let taken = excess.min(*first);
    *first -= taken;
    excess -= taken;
    *second -= excess.min(*second);

    (attack, decay)
}

/// Mixes all channels of a parsed song into mono 16-bit PCM
pub struct SampleGenerator<S> {
    parser: Parser<S>,
    config: GeneratorConfig,
    current_sample: u64,
    streams: [NoteStream; MAX_CHANNELS],
    channel_finished: [bool; MAX_CHANNELS],
    finished: bool,
}

impl<S: InputSource> SampleGenerator<S> {
    /// Create a generator and load the first note of every channel
    pub fn new(parser: Parser<S>, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let mut generator = Self {
            parser,
            config,
            current_sample: 0,
            streams: std::array::from_fn(|_| NoteStream::default()),
            channel_finished: [false; MAX_CHANNELS],
            finished: false,
        };

        for channel in 0..generator.channel_count() {
            generator.load_next_note(channel)?;
        }

        debug!(
            "generator created: {} channel(s), {} Hz, attack={} decay={} amplitude={}",
            generator.channel_count(),
            config.sample_rate,
            config.attack_samples,
            config.decay_samples,
            config.amplitude
        );

        Ok(generator)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn channel_count(&self) -> usize {
        self.parser.channel_count()
    }

    pub fn parser(&self) -> &Parser<S> {
        &self.parser
    }

    pub fn into_parser(self) -> Parser<S> {
        self.parser
    }

    /// Index of the next sample to be generated
    pub fn current_sample(&self) -> u64 {
        self.current_sample
    }

    /// True once every channel has run out of notes
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Playback state of a channel
    pub fn stream(&self, channel: usize) -> Option<&NoteStream> {
        self.streams[..self.channel_count()].get(channel)
    }

    /// Select the waveform used for a channel from its next sample onward
    pub fn set_waveform(&mut self, channel: usize, waveform: Waveform) -> Result<()> {
        let count = self.channel_count();
        if channel >= count {
            return Err(Error::InvalidChannel {
                index: channel,
                count,
            });
        }
        self.streams[channel].waveform = waveform;
        Ok(())
    }

    /// Fill `samples` with generated PCM.
    ///
    /// Returns the number of samples written. A count smaller than
    /// `samples.len()` means the song has ended; later calls return 0.
    pub fn generate(&mut self, samples: &mut [i16]) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let channel_count = self.channel_count();
        for (written, out) in samples.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            let mut active = false;

            for channel in 0..channel_count {
                if self.channel_finished[channel] {
                    continue;
                }
                if self.streams[channel].is_exhausted() && !self.load_next_note(channel)? {
                    continue;
                }

                active = true;
                sum += self.streams[channel]
                    .next_sample(self.config.sample_rate, self.config.amplitude);
            }

            if !active {
                self.finished = true;
                debug!("generation finished after {} samples", self.current_sample);
                return Ok(written);
            }

            *out = (sum / channel_count as f32) as i16;
            self.current_sample += 1;
        }

        Ok(samples.len())
    }

    /// Pull notes for a channel until one with a nonzero sample count is
    /// loaded. Returns false once the channel has no notes left.
    fn load_next_note(&mut self, channel: usize) -> Result<bool> {
        loop {
            match self.parser.parse_next(channel)? {
                Some(note) => {
                    let stream = &mut self.streams[channel];
                    stream.load(note, self.current_sample, &self.config);
                    if !stream.is_exhausted() {
                        return Ok(true);
                    }
                }
                None => {
                    self.channel_finished[channel] = true;
                    debug!(
                        "channel {} finished at sample {}",
                        channel, self.current_sample
                    );
                    return Ok(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MemorySource;

    fn generator(text: &str, config: GeneratorConfig) -> SampleGenerator<MemorySource<&str>> {
        let parser = Parser::new(MemorySource::new(text)).unwrap();
        SampleGenerator::new(parser, config).unwrap()
    }

    fn render_all<S: InputSource>(gen: &mut SampleGenerator<S>) -> Vec<i16> {
        let mut out = Vec::new();
        let mut buf = [0i16; 777];
        loop {
            let n = gen.generate(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n < buf.len() {
                break;
            }
        }
        out
    }

    #[test]
    fn test_config_validation() {
        assert!(GeneratorConfig::default().validate().is_ok());

        let bad = GeneratorConfig {
            amplitude: 1.5,
            ..GeneratorConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidAmplitude(_))));

        let nan = GeneratorConfig {
            amplitude: f32::NAN,
            ..GeneratorConfig::default()
        };
        assert!(matches!(nan.validate(), Err(Error::InvalidAmplitude(_))));

        let zero_rate = GeneratorConfig {
            sample_rate: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(zero_rate.validate(), Err(Error::InvalidSampleRate(0))));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config: GeneratorConfig = serde_json::from_str(r#"{"sample_rate": 8000}"#).unwrap();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.attack_samples, 100);
        assert_eq!(config.decay_samples, 500);
        assert_eq!(config.amplitude, 0.8);
    }

    #[test]
    fn test_clamp_envelope() {
        assert_eq!(clamp_envelope(100, 500, 22050), (100, 500));
        assert_eq!(clamp_envelope(100, 500, 300), (100, 200));
        assert_eq!(clamp_envelope(500, 100, 300), (200, 100));
        assert_eq!(clamp_envelope(100, 500, 50), (50, 0));
        assert_eq!(clamp_envelope(100, 100, 0), (0, 0));
    }

    #[test]
    fn test_single_note_sample_count() {
        let mut gen = generator("test:d=4,o=5,b=120:c", GeneratorConfig::default());
        let samples = render_all(&mut gen);
        assert_eq!(samples.len(), 22050);
        assert!(gen.is_finished());
        assert_eq!(gen.current_sample(), 22050);
        assert!(samples.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_rest_is_silent() {
        let mut gen = generator("x:d=4,b=120:p", GeneratorConfig::default());
        let samples = render_all(&mut gen);
        assert_eq!(samples.len(), 22050);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_envelope_starts_and_ends_quiet() {
        let mut gen = generator("x:d=4,o=5,b=120:a", GeneratorConfig::default());
        let samples = render_all(&mut gen);
        assert_eq!(samples[0], 0);
        assert!(samples[samples.len() - 1].abs() < 200);
    }

    #[test]
    fn test_amplitude_bound() {
        let config = GeneratorConfig {
            amplitude: 0.5,
            ..GeneratorConfig::default()
        };
        let mut gen = generator("x:d=4,o=5,b=120:a,c6v,e", config);
        gen.set_waveform(0, Waveform::Square).unwrap();
        let samples = render_all(&mut gen);
        let limit = (MAX_SAMPLE_VALUE as f32 * 0.5) as i16 + 1;
        assert!(samples.iter().all(|&s| s.abs() <= limit));
    }

    #[test]
    fn test_mix_divides_by_channel_count() {
        let config = GeneratorConfig {
            attack_samples: 0,
            decay_samples: 0,
            amplitude: 1.0,
            ..GeneratorConfig::default()
        };
        let dc = || Waveform::custom(|_, _, _| 1.0);

        // Second channel ends after the first note; the mix keeps dividing by 2
        let mut gen = generator("x:d=4,b=120:c,c|c", config);
        gen.set_waveform(0, dc()).unwrap();
        gen.set_waveform(1, dc()).unwrap();
        let samples = render_all(&mut gen);
        assert_eq!(samples.len(), 44100);
        assert_eq!(samples[0], MAX_SAMPLE_VALUE);
        assert_eq!(samples[30000], MAX_SAMPLE_VALUE / 2);
    }

    #[test]
    fn test_trailing_pipe_does_not_dilute_mix() {
        let config = GeneratorConfig {
            attack_samples: 0,
            decay_samples: 0,
            amplitude: 1.0,
            ..GeneratorConfig::default()
        };
        let mut gen = generator("x:d=4,b=120:c|c|", config);
        assert_eq!(gen.channel_count(), 2);
        gen.set_waveform(0, Waveform::custom(|_, _, _| 1.0)).unwrap();
        gen.set_waveform(1, Waveform::custom(|_, _, _| 1.0)).unwrap();
        let samples = render_all(&mut gen);
        assert_eq!(samples.len(), 22050);
        assert_eq!(samples[10], MAX_SAMPLE_VALUE);
    }

    #[test]
    fn test_zero_length_notes_are_skipped() {
        let config = GeneratorConfig {
            sample_rate: 1,
            ..GeneratorConfig::default()
        };
        // At 1 Hz, a 500 ms note has no samples at all
        let mut gen = generator("x:d=4,b=120:c,2c,1c", config);
        let samples = render_all(&mut gen);
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_generate_after_finish_returns_zero() {
        let mut gen = generator("x:d=32,b=120:c", GeneratorConfig::default());
        render_all(&mut gen);
        let mut buf = [0i16; 16];
        assert_eq!(gen.generate(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_set_waveform_invalid_channel() {
        let mut gen = generator("x:b=120:c", GeneratorConfig::default());
        assert!(matches!(
            gen.set_waveform(3, Waveform::Sine),
            Err(Error::InvalidChannel { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_invalid_amplitude_rejected() {
        let parser = Parser::new(MemorySource::new("x:b=120:c")).unwrap();
        let config = GeneratorConfig {
            amplitude: -0.1,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            SampleGenerator::new(parser, config),
            Err(Error::InvalidAmplitude(_))
        ));
    }

    #[test]
    fn test_vibrato_changes_output() {
        let config = GeneratorConfig::default();
        let plain = render_all(&mut generator("x:d=4,o=5,b=120:a", config));
        let wobbly = render_all(&mut generator("x:d=4,o=5,b=120:av20-50", config));
        assert_eq!(plain.len(), wobbly.len());
        assert_ne!(plain, wobbly);
    }

    #[test]
    fn test_parse_error_surfaces_from_generate() {
        let mut gen = generator("x:d=32,b=120:c,h", GeneratorConfig::default());
        let mut buf = vec![0i16; 44100];
        let err = gen.generate(&mut buf).unwrap_err();
        assert!(err.kind().is_some());
    }
}
