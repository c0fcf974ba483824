//! Waveform synthesis from a polynomial sine primitive

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Maximum number of harmonic terms summed for square, sawtooth and triangle
pub const MAX_HARMONICS: u32 = 16;

/// Fast sine approximation. `x` is in turns (0..1), not radians.
pub fn fast_sin(x: f32) -> f32 {
    let mut x = if x < 0.0 { 0.5 - x } else { x };
    x -= 0.5 + x.trunc();
    x *= 16.0 * (x.abs() - 0.5);
    x += 0.225 * (x.abs() - 1.0) * x;
    x
}

/// User-supplied waveform: `(phase_turns, frequency_hz, sample_rate) -> amplitude`
pub type WaveformFn = dyn Fn(f32, f32, u32) -> f32 + Send + Sync;

/// Shape of the signal generated for a channel
#[derive(Clone, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Custom(Arc<WaveformFn>),
}

impl Waveform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f32, f32, u32) -> f32 + Send + Sync + 'static,
    {
        Waveform::Custom(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
            Waveform::Custom(_) => "custom",
        }
    }

    /// Amplitude in [-1, 1] at `phase` turns into the cycle of a `frequency` Hz tone
    pub fn sample(&self, phase: f32, frequency: f32, sample_rate: u32) -> f32 {
        let value = match self {
            Waveform::Sine => fast_sin(phase),
            Waveform::Square => harmonic_sum(phase, frequency, sample_rate, 2, |n| {
                4.0 / (PI * n as f32)
            }),
            Waveform::Sawtooth => harmonic_sum(phase, frequency, sample_rate, 1, |n| {
                let sign = if n % 2 == 1 { 1.0 } else { -1.0 };
                sign * 2.0 / (PI * n as f32)
            }),
            Waveform::Triangle => harmonic_sum(phase, frequency, sample_rate, 2, |n| {
                // n = 1, 5, 9, ... positive; n = 3, 7, 11, ... negative
                let sign = if n % 4 == 1 { 1.0 } else { -1.0 };
                sign * 8.0 / (PI * PI * (n * n) as f32)
            }),
            Waveform::Custom(f) => f(phase, frequency, sample_rate),
        };
        value.clamp(-1.0, 1.0)
    }
}

impl fmt::Debug for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Highest harmonic number that stays below Nyquist (at least 1)
fn harmonic_limit(frequency: f32, sample_rate: u32) -> u32 {
    if frequency <= 0.0 {
        return 1;
    }
    let limit = (sample_rate as f32 / 2.0) / frequency;
    (limit as u32).max(1)
}

/// Sum of `weight(n) * sin(n * phase)` for n = 1, 1 + step, 1 + 2 * step, ...
fn harmonic_sum(
    phase: f32,
    frequency: f32,
    sample_rate: u32,
    step: u32,
    weight: impl Fn(u32) -> f32,
) -> f32 {
    let limit = harmonic_limit(frequency, sample_rate);
    (0..MAX_HARMONICS)
        .map(|i| 1 + i * step)
        .take_while(|&n| n <= limit)
        .map(|n| weight(n) * fast_sin((phase * n as f32).fract()))
        .sum()
}
