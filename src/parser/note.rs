//! Parsed notes, pitch classes and piano key arithmetic

use super::cursor::Scanner;
use super::input::InputSource;
use super::settings::Settings;
use crate::error::{Error, ParseErrorKind};

/// Highest octave number a note may use
pub const NOTE_OCTAVE_MAX: u32 = 8;

/// Highest piano key number (C8)
pub const MAX_KEY: u8 = 88;

/// Allowed note durations (whole, half, quarter, ...)
pub const VALID_DURATIONS: [u32; 6] = [1, 2, 4, 8, 16, 32];

/// 0-based key number of the first C in each octave. Octave 0 only has A, A# and B.
const OCTAVE_STARTS: [u32; NOTE_OCTAVE_MAX as usize + 1] = [0, 3, 15, 27, 39, 51, 63, 75, 87];

pub fn is_valid_duration(duration: u32) -> bool {
    VALID_DURATIONS.contains(&duration)
}

/// The twelve pitch classes of one octave. Enharmonic spellings (Db, E#, ...)
/// map onto the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchClass {
    C = 0,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Classify a lowercase note letter plus optional `#` or `b`
    pub fn from_name(letter: u8, accidental: Option<u8>) -> Option<Self> {
        use PitchClass::*;
        let pitch = match (letter, accidental) {
            (b'c', None) => C,
            (b'c', Some(b'#')) => CSharp,
            (b'd', None) => D,
            (b'd', Some(b'#')) => DSharp,
            (b'd', Some(b'b')) => CSharp,
            (b'e', None) => E,
            (b'e', Some(b'#')) => F,
            (b'e', Some(b'b')) => DSharp,
            (b'f', None) => F,
            (b'f', Some(b'#')) => FSharp,
            (b'g', None) => G,
            (b'g', Some(b'#')) => GSharp,
            (b'g', Some(b'b')) => FSharp,
            (b'a', None) => A,
            (b'a', Some(b'#')) => ASharp,
            (b'a', Some(b'b')) => GSharp,
            (b'b', None) => B,
            (b'b', Some(b'b')) => ASharp,
            _ => return None,
        };
        Some(pitch)
    }

    pub fn semitone(self) -> u32 {
        self as u32
    }

    pub fn from_semitone(semitone: u32) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NAMES[self as usize]
    }
}

/// Piano key number (1-88) for a pitch class in an octave
pub fn key_number(pitch: PitchClass, octave: u32) -> Result<u8, ParseErrorKind> {
    if octave > NOTE_OCTAVE_MAX {
        return Err(ParseErrorKind::InvalidOctave(octave));
    }

    let key = if octave == 0 {
        if pitch < PitchClass::A {
            return Err(ParseErrorKind::InvalidNoteForOctave);
        }
        pitch.semitone() - PitchClass::A.semitone() + 1
    } else {
        OCTAVE_STARTS[octave as usize] + pitch.semitone() + 1
    };

    if key > MAX_KEY as u32 {
        return Err(ParseErrorKind::InvalidNoteForOctave);
    }
    Ok(key as u8)
}

/// Note length in milliseconds at a given tempo
pub fn duration_ms(bpm: u32, duration: u32, dotted: bool) -> Result<u16, ParseErrorKind> {
    if bpm == 0 {
        return Err(ParseErrorKind::InvalidBpm);
    }
    if !is_valid_duration(duration) {
        return Err(ParseErrorKind::InvalidDuration(duration));
    }

    let whole_ms = (60000.0 / bpm as f64) * 4.0;
    let mut ms = whole_ms / duration as f64;
    if dotted {
        ms += ms / 2.0;
    }

    let ms = ms as u32;
    u16::try_from(ms).map_err(|_| ParseErrorKind::NoteTooLong(ms))
}

/// A single compiled note: pitch, duration and vibrato
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Note {
    /// Piano key number 1-88, or 0 for a rest
    pub key: u8,
    pub duration_ms: u16,
    pub vibrato_frequency_hz: u16,
    /// Maximum +/- deviation from the note pitch, in Hz
    pub vibrato_variance_hz: u16,
}

impl Note {
    pub fn rest(duration_ms: u16) -> Self {
        Self {
            key: 0,
            duration_ms,
            ..Self::default()
        }
    }

    pub fn is_rest(&self) -> bool {
        self.key == 0
    }

    pub fn has_vibrato(&self) -> bool {
        self.vibrato_frequency_hz != 0 || self.vibrato_variance_hz != 0
    }

    /// Octave and pitch class for this key, `None` for a rest
    pub fn pitch(&self) -> Option<(u32, PitchClass)> {
        if self.is_rest() {
            return None;
        }
        let k0 = self.key as u32 - 1;
        if k0 < 3 {
            Some((0, PitchClass::from_semitone(PitchClass::A.semitone() + k0)))
        } else {
            Some(((k0 - 3) / 12 + 1, PitchClass::from_semitone(k0 - 3)))
        }
    }

    /// Scientific pitch name, e.g. "C#4", or "P" for a rest
    pub fn name(&self) -> String {
        match self.pitch() {
            Some((octave, pitch)) => format!("{}{}", pitch.name(), octave),
            None => "P".to_string(),
        }
    }

    /// Pack into the compact `(note_settings, vibrato_settings)` words.
    ///
    /// note_settings: bits 0-6 key, bits 7-22 duration in ms.
    /// vibrato_settings: bits 0-15 frequency, bits 16-31 variance.
    pub fn pack(&self) -> (u32, u32) {
        let note = (self.key as u32 & 0x7f) | ((self.duration_ms as u32) << 7);
        let vibrato =
            self.vibrato_frequency_hz as u32 | ((self.vibrato_variance_hz as u32) << 16);
        (note, vibrato)
    }

    pub fn unpack(note_settings: u32, vibrato_settings: u32) -> Self {
        Self {
            key: (note_settings & 0x7f) as u8,
            duration_ms: ((note_settings >> 7) & 0xffff) as u16,
            vibrato_frequency_hz: (vibrato_settings & 0xffff) as u16,
            vibrato_variance_hz: ((vibrato_settings >> 16) & 0xffff) as u16,
        }
    }
}

impl<S: InputSource> Scanner<'_, S> {
    fn eat(&mut self, expected: u8) -> Result<bool, Error> {
        if self.peek()? == Some(expected) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Parse one note at the current position.
    ///
    /// Grammar: `[duration] name ['.'] [octave] ['.'] ['v' [freq ['-' variance]]]`.
    /// Returns `None` if the input is already exhausted.
    pub(crate) fn parse_note(&mut self, settings: &Settings) -> Result<Option<Note>, Error> {
        let Some(first) = self.peek()? else {
            return Ok(None);
        };

        let mut duration = settings.default_duration;
        if first.is_ascii_digit() {
            duration = self.read_unsigned_int()?;
            if !is_valid_duration(duration) {
                return Err(self.error(ParseErrorKind::InvalidDuration(duration)));
            }
        }

        let pitch = self.parse_pitch()?;

        let mut dotted = self.eat(b'.')?;

        let mut octave = settings.default_octave;
        if let Some(c) = self.peek()? {
            if c.is_ascii_digit() {
                self.advance()?;
                octave = (c - b'0') as u32;
                if octave > NOTE_OCTAVE_MAX {
                    return Err(self.error(ParseErrorKind::InvalidOctave(octave)));
                }
            }
        }

        dotted |= self.eat(b'.')?;

        let key = match pitch {
            Some(pitch) => key_number(pitch, octave).map_err(|kind| self.error(kind))?,
            None => 0,
        };
        let duration_ms =
            duration_ms(settings.bpm, duration, dotted).map_err(|kind| self.error(kind))?;
        let (vibrato_frequency_hz, vibrato_variance_hz) = self.parse_vibrato(settings)?;

        Ok(Some(Note {
            key,
            duration_ms,
            vibrato_frequency_hz,
            vibrato_variance_hz,
        }))
    }

    /// Note letter plus accidental. `None` means a rest.
    fn parse_pitch(&mut self) -> Result<Option<PitchClass>, Error> {
        let letter = match self.peek()? {
            None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_lowercase(),
            Some(_) => return Err(self.error(ParseErrorKind::ExpectedNote)),
        };
        self.advance()?;

        if letter == b'p' {
            return Ok(None);
        }

        let accidental = match self.peek()? {
            Some(b'#') => Some(b'#'),
            Some(c) if c.to_ascii_lowercase() == b'b' => Some(b'b'),
            _ => None,
        };
        if accidental.is_some() {
            self.advance()?;
        }

        match PitchClass::from_name(letter, accidental) {
            Some(pitch) => Ok(Some(pitch)),
            None => {
                let mut name = String::from(letter as char);
                if let Some(a) = accidental {
                    name.push(a as char);
                }
                Err(self.error(ParseErrorKind::InvalidNote(name)))
            }
        }
    }

    fn parse_vibrato(&mut self, settings: &Settings) -> Result<(u16, u16), Error> {
        if !matches!(self.peek()?, Some(b'v') | Some(b'V')) {
            return Ok((0, 0));
        }
        self.advance()?;

        let mut freq = settings.default_vibrato_freq;
        let mut var = settings.default_vibrato_var;

        if matches!(self.peek()?, Some(c) if c.is_ascii_digit()) {
            freq = self.read_vibrato_value()?;
            if self.eat(b'-')? {
                var = self.read_vibrato_value()?;
            }
        }

        Ok((freq, var))
    }

    pub(crate) fn read_vibrato_value(&mut self) -> Result<u16, Error> {
        let value = self.read_unsigned_int()?;
        u16::try_from(value).map_err(|_| self.error(ParseErrorKind::VibratoOutOfRange(value)))
    }
}
