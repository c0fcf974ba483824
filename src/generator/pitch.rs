//! Piano key to frequency conversion

/// Key number of A4
pub const A4_KEY: u8 = 49;

/// Frequency of A4 in Hz
pub const A4_HZ: f32 = 440.0;

/// Equal-temperament frequency of a piano key (1-88). Key 0 (rest) gives 0 Hz.
pub fn key_to_hz(key: u8) -> f32 {
    if key == 0 {
        return 0.0;
    }
    let semitones = key as f32 - A4_KEY as f32;
    A4_HZ * (semitones / 12.0).exp2()
}
