//! Name field and `key=value` settings section

use super::cursor::Scanner;
use super::input::InputSource;
use super::note::{is_valid_duration, NOTE_OCTAVE_MAX};
use super::MAX_NAME_LEN;
use crate::error::{Error, ParseErrorKind};
use serde::Serialize;

/// Song-wide values from the first two colon-separated fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub name: String,
    /// Beats per minute. 0 means the source never set it.
    pub bpm: u32,
    pub default_duration: u32,
    pub default_octave: u32,
    pub default_vibrato_freq: u16,
    pub default_vibrato_var: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            bpm: 0,
            default_duration: 8,
            default_octave: 4,
            default_vibrato_freq: 7,
            default_vibrato_var: 10,
        }
    }
}

impl<S: InputSource> Scanner<'_, S> {
    /// Parse `name:settings:`, leaving the cursor at the first note
    pub(crate) fn parse_header(&mut self) -> Result<Settings, Error> {
        let name = self.parse_name()?;
        let mut settings = Settings {
            name,
            ..Settings::default()
        };
        self.parse_settings(&mut settings)?;
        Ok(settings)
    }

    fn parse_name(&mut self) -> Result<String, Error> {
        if self.skip_nonvisible()?.is_none() {
            return Err(self.error(ParseErrorKind::UnexpectedEof));
        }

        let mut name = Vec::with_capacity(32);
        loop {
            let c = match self.advance()? {
                None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
                Some(b':') => break,
                Some(b'\\') => match self.advance()? {
                    Some(escaped) => escaped,
                    None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
                },
                Some(c) => c,
            };
            if name.len() == MAX_NAME_LEN - 1 {
                return Err(self.error(ParseErrorKind::NameTooLong));
            }
            name.push(c);
        }

        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    fn parse_settings(&mut self, settings: &mut Settings) -> Result<(), Error> {
        if self.skip_nonvisible()? == Some(b':') {
            // Empty settings section
            self.advance()?;
        } else {
            loop {
                let key = self.expect_visible()?.to_ascii_lowercase();
                if !matches!(key, b'b' | b'd' | b'o' | b'f' | b'v') {
                    let kind = match key {
                        b':' | b',' => ParseErrorKind::InvalidSettingsSection,
                        other => ParseErrorKind::UnrecognizedSetting(other as char),
                    };
                    return Err(self.error(kind));
                }

                if self.expect_visible()? != b'=' {
                    return Err(self.error(ParseErrorKind::MissingEquals));
                }

                self.skip_nonvisible()?;
                self.parse_setting_value(key, settings)?;

                match self.expect_visible()? {
                    b',' => continue,
                    b':' => break,
                    _ => return Err(self.error(ParseErrorKind::InvalidSettingsSection)),
                }
            }
        }

        if self.skip_nonvisible()? == Some(b':') {
            return Err(self.error(ParseErrorKind::InvalidSettingsSection));
        }

        Ok(())
    }

    fn parse_setting_value(&mut self, key: u8, settings: &mut Settings) -> Result<(), Error> {
        match key {
            b'b' => {
                let bpm = self.read_unsigned_int()?;
                if bpm == 0 {
                    return Err(self.error(ParseErrorKind::InvalidBpm));
                }
                settings.bpm = bpm;
            }
            b'd' => {
                let duration = self.read_unsigned_int()?;
                if !is_valid_duration(duration) {
                    return Err(self.error(ParseErrorKind::InvalidDuration(duration)));
                }
                settings.default_duration = duration;
            }
            b'o' => {
                let octave = self.read_unsigned_int()?;
                if octave > NOTE_OCTAVE_MAX {
                    return Err(self.error(ParseErrorKind::InvalidOctave(octave)));
                }
                settings.default_octave = octave;
            }
            b'f' => settings.default_vibrato_freq = self.read_vibrato_value()?,
            b'v' => settings.default_vibrato_var = self.read_vibrato_value()?,
            _ => return Err(self.error(ParseErrorKind::UnrecognizedSetting(key as char))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cursor::ChannelCursor;
    use crate::parser::input::MemorySource;

    fn header(text: &str) -> Result<Settings, Error> {
        let mut src = MemorySource::new(text);
        let mut sc = Scanner::new(&mut src, ChannelCursor::new());
        sc.parse_header()
    }

    fn header_err(text: &str) -> ParseErrorKind {
        header(text).unwrap_err().kind().cloned().unwrap()
    }

    #[test]
    fn test_full_header() {
        let s = header("The Entertainer:d=4, o=5, b=140, f=6, v=12:c").unwrap();
        assert_eq!(s.name, "The Entertainer");
        assert_eq!(s.bpm, 140);
        assert_eq!(s.default_duration, 4);
        assert_eq!(s.default_octave, 5);
        assert_eq!(s.default_vibrato_freq, 6);
        assert_eq!(s.default_vibrato_var, 12);
    }

    #[test]
    fn test_defaults() {
        let s = header("x:b=100:c").unwrap();
        assert_eq!(s.default_duration, 8);
        assert_eq!(s.default_octave, 4);
        assert_eq!(s.default_vibrato_freq, 7);
        assert_eq!(s.default_vibrato_var, 10);
    }

    #[test]
    fn test_empty_settings_and_comments() {
        let s = header("# leading comment\nsong::c").unwrap();
        assert_eq!(s.name, "song");
        assert_eq!(s.bpm, 0);
    }

    #[test]
    fn test_uppercase_keys() {
        let s = header("x:D=16,O=6,B=90:c").unwrap();
        assert_eq!((s.default_duration, s.default_octave, s.bpm), (16, 6, 90));
    }

    #[test]
    fn test_escaped_colon_in_name() {
        let s = header("a\\:b:b=100:c").unwrap();
        assert_eq!(s.name, "a:b");
    }

    #[test]
    fn test_name_too_long() {
        let text = format!("{}:b=100:c", "n".repeat(MAX_NAME_LEN));
        assert_eq!(header_err(&text), ParseErrorKind::NameTooLong);

        let text = format!("{}:b=100:c", "n".repeat(MAX_NAME_LEN - 1));
        assert_eq!(header(&text).unwrap().name.len(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn test_settings_errors() {
        assert_eq!(header_err("x:b=0:c"), ParseErrorKind::InvalidBpm);
        assert_eq!(header_err("x:d=3:c"), ParseErrorKind::InvalidDuration(3));
        assert_eq!(header_err("x:o=9:c"), ParseErrorKind::InvalidOctave(9));
        assert_eq!(header_err("x:f=65536:c"), ParseErrorKind::VibratoOutOfRange(65536));
        assert_eq!(header_err("x:q=1:c"), ParseErrorKind::UnrecognizedSetting('q'));
        assert_eq!(header_err("x:b100:c"), ParseErrorKind::MissingEquals);
        assert_eq!(header_err("x:b=100=2:c"), ParseErrorKind::InvalidSettingsSection);
        assert_eq!(header_err("x:b=100,:c"), ParseErrorKind::InvalidSettingsSection);
        assert_eq!(header_err("x:b=100::c"), ParseErrorKind::InvalidSettingsSection);
        assert_eq!(header_err("x:b=100"), ParseErrorKind::UnexpectedEof);
        assert_eq!(header_err("no colon"), ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_error_location() {
        let err = header("x:\nb=100,\n  z=1:c").unwrap_err();
        assert_eq!(err.location(), Some((3, 4)));
    }
}
