//! JSON serialization types for parsed songs

use crate::error::Result;
use crate::generator::key_to_hz;
use crate::parser::{InputSource, Note, Parser, Settings};
use serde::Serialize;

/// Top-level JSON structure for a parsed song
#[derive(Debug, Clone, Serialize)]
pub struct SongJson {
    /// Name and default settings
    #[serde(flatten)]
    pub settings: Settings,
    /// Notes of each channel, in channel order
    pub channels: Vec<ChannelJson>,
}

/// JSON representation of one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelJson {
    pub channel: usize,
    /// Sum of all note durations
    pub duration_ms: u64,
    pub notes: Vec<NoteJson>,
}

/// JSON representation of a single note
#[derive(Debug, Clone, Serialize)]
pub struct NoteJson {
    /// Piano key number (0 for a rest)
    pub key: u8,
    /// Note name, e.g. "C#4", or "P" for a rest
    pub name: String,
    /// Pitch in Hz (absent for rests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_hz: Option<f32>,
    pub duration_ms: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<VibratoJson>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VibratoJson {
    pub frequency_hz: u16,
    pub variance_hz: u16,
}

impl From<&Note> for NoteJson {
    fn from(note: &Note) -> Self {
        Self {
            key: note.key,
            name: note.name(),
            pitch_hz: (!note.is_rest()).then(|| key_to_hz(note.key)),
            duration_ms: note.duration_ms,
            vibrato: note.has_vibrato().then_some(VibratoJson {
                frequency_hz: note.vibrato_frequency_hz,
                variance_hz: note.vibrato_variance_hz,
            }),
        }
    }
}

impl SongJson {
    /// Read every channel of a parser to the end
    pub fn from_parser<S: InputSource>(parser: &mut Parser<S>) -> Result<Self> {
        let mut channels = Vec::with_capacity(parser.channel_count());
        for channel in 0..parser.channel_count() {
            let notes = parser
                .notes(channel)
                .map(|note| note.map(|n| NoteJson::from(&n)))
                .collect::<Result<Vec<_>>>()?;
            channels.push(ChannelJson {
                channel,
                duration_ms: notes.iter().map(|n| n.duration_ms as u64).sum(),
                notes,
            });
        }

        Ok(Self {
            settings: parser.settings().clone(),
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MemorySource;

    #[test]
    fn test_song_json() {
        let mut parser =
            Parser::new(MemorySource::new("tune:d=4,o=5,b=120:a,pv|c6v9-3,8p")).unwrap();
        let song = SongJson::from_parser(&mut parser).unwrap();
        let value = serde_json::to_value(&song).unwrap();

        assert_eq!(value["name"], "tune");
        assert_eq!(value["bpm"], 120);
        assert_eq!(value["channels"].as_array().unwrap().len(), 2);

        let a5 = &value["channels"][0]["notes"][0];
        assert_eq!(a5["name"], "A5");
        assert_eq!(a5["pitch_hz"], 880.0);
        assert!(a5.get("vibrato").is_none());

        let rest = &value["channels"][0]["notes"][1];
        assert_eq!(rest["key"], 0);
        assert!(rest.get("pitch_hz").is_none());

        let c6 = &value["channels"][1]["notes"][0];
        assert_eq!(c6["vibrato"]["frequency_hz"], 9);
        assert_eq!(c6["vibrato"]["variance_hz"], 3);
        assert_eq!(value["channels"][1]["duration_ms"], 750);
    }

    #[test]
    fn test_parse_error_propagates() {
        let mut parser = Parser::new(MemorySource::new("x:b=120:c,x")).unwrap();
        assert!(SongJson::from_parser(&mut parser).is_err());
    }
}
