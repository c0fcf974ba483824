//! Streaming PTTTL/RTTTL parser
//!
//! A PTTTL source is `name:settings:blocks`. Each block is terminated by `;`
//! and holds one `|`-separated segment per channel; a segment is a
//! `,`-separated list of notes. RTTTL is the single-channel, single-block case.
//!
//! The parser never buffers the input. It keeps one saved [`ChannelCursor`]
//! per channel and, for every note requested, seeks the shared source back to
//! that channel's position, parses one note, and saves the new position. When
//! a channel's segment ends, its cursor jumps to the same channel's segment in
//! the next block.

pub mod cursor;
pub mod input;
pub mod lexer;
pub mod note;
pub mod settings;

pub use cursor::ChannelCursor;
pub use input::{decompress_if_gzip, FileSource, InputSource, MemorySource, StreamSource};
pub use lexer::INTEGER_BUFFER_LEN;
pub use note::{Note, PitchClass};
pub use settings::Settings;

use crate::error::{Error, ErrorInfo, ParseErrorKind, Result};
use cursor::Scanner;
use log::{debug, trace};

/// Maximum number of channels in one source
pub const MAX_CHANNELS: usize = 16;

/// Size of the name field buffer (the name holds at most `MAX_NAME_LEN - 1` bytes)
pub const MAX_NAME_LEN: usize = 256;

/// Block index given to cursors that have reached the end of input
const FINISHED_BLOCK: u32 = u32::MAX;

/// Parser state for one PTTTL/RTTTL source
#[derive(Debug)]
pub struct Parser<S> {
    source: S,
    settings: Settings,
    channel_count: usize,
    channels: [ChannelCursor; MAX_CHANNELS],
    last_error: Option<ErrorInfo>,
}

impl<S: InputSource> Parser<S> {
    /// Parse the name and settings, and discover the channels in the first block
    pub fn new(mut source: S) -> Result<Self> {
        let mut channels = [ChannelCursor::new(); MAX_CHANNELS];

        let (settings, channel_count) = {
            let mut scanner = Scanner::new(&mut source, ChannelCursor::new());
            let settings = scanner.parse_header()?;
            let count = locate_channels(&mut scanner, &mut channels)?;
            (settings, count)
        };

        debug!(
            "parsed '{}': bpm={} d={} o={}, {} channel(s)",
            settings.name,
            settings.bpm,
            settings.default_duration,
            settings.default_octave,
            channel_count
        );

        Ok(Self {
            source,
            settings,
            channel_count,
            channels,
            last_error: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Saved read position of a channel
    pub fn channel_cursor(&self, channel: usize) -> Option<&ChannelCursor> {
        self.channels[..self.channel_count].get(channel)
    }

    /// The last error returned by [`Parser::parse_next`], if any
    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Parse the next note of a channel.
    ///
    /// Returns `Ok(None)` once the channel has no more notes.
    pub fn parse_next(&mut self, channel: usize) -> Result<Option<Note>> {
        let result = self.next_note(channel);
        if let Err(e) = &result {
            self.last_error = Some(ErrorInfo::from(e));
        }
        result
    }

    /// Iterate over the remaining notes of one channel
    pub fn notes(&mut self, channel: usize) -> ChannelNotes<'_, S> {
        ChannelNotes {
            parser: self,
            channel,
            done: false,
        }
    }

    fn next_note(&mut self, channel: usize) -> Result<Option<Note>> {
        if channel >= self.channel_count {
            return Err(Error::InvalidChannel {
                index: channel,
                count: self.channel_count,
            });
        }

        let saved = self.channels[channel];
        let mut scanner = Scanner::new(&mut self.source, saved);
        scanner.resume(saved)?;

        let Some(note) = scanner.parse_note(&self.settings)? else {
            scanner.cursor.block = FINISHED_BLOCK;
            self.channels[channel] = scanner.cursor;
            return Ok(None);
        };

        let last_channel = channel + 1 == self.channel_count;
        match scanner.next_visible()? {
            None => scanner.cursor.block = FINISHED_BLOCK,
            Some(b',') => {
                if scanner.skip_nonvisible()?.is_none() {
                    scanner.cursor.block = FINISHED_BLOCK;
                }
            }
            Some(b'|') if last_channel => {
                if scanner.skip_nonvisible()?.is_some() {
                    return Err(scanner.error(ParseErrorKind::InconsistentChannelCount));
                }
                scanner.cursor.block = FINISHED_BLOCK;
            }
            Some(b';') if !last_channel => {
                return Err(scanner.error(ParseErrorKind::InconsistentChannelCount));
            }
            Some(sep @ (b'|' | b';')) => {
                jump_to_next_block(&mut scanner, &self.channels, self.channel_count, channel, sep)?;
            }
            Some(c) => {
                return Err(scanner.error(ParseErrorKind::UnexpectedCharacter(c as char)));
            }
        }

        trace!(
            "channel {}: {} {}ms (block {})",
            channel,
            note.name(),
            note.duration_ms,
            scanner.cursor.block
        );

        self.channels[channel] = scanner.cursor;
        Ok(Some(note))
    }
}

/// Single pass over the first block, recording where each channel starts
fn locate_channels<S: InputSource>(
    scanner: &mut Scanner<'_, S>,
    channels: &mut [ChannelCursor; MAX_CHANNELS],
) -> Result<usize> {
    let mut count = 0;
    loop {
        let at_end = scanner.skip_nonvisible()?.is_none();
        if at_end && count > 0 {
            // `|` followed by nothing opens no channel
            break;
        }
        let mut start = scanner.cursor;
        start.block = if at_end { FINISHED_BLOCK } else { 0 };
        channels[count] = start;
        count += 1;

        match scanner.skip_to_separator()? {
            Some(b'|') => {
                if count == MAX_CHANNELS {
                    return Err(scanner.error(ParseErrorKind::TooManyChannels));
                }
            }
            _ => break,
        }
    }
    Ok(count)
}

/// Move a channel's scanner from the end of its segment to the start of its
/// segment in the next block.
///
/// `separator` is the byte that ended the segment: `|` means the rest of the
/// current block still has to be skipped, `;` means the scanner is already at
/// the start of the next block.
fn jump_to_next_block<S: InputSource>(
    scanner: &mut Scanner<'_, S>,
    channels: &[ChannelCursor; MAX_CHANNELS],
    channel_count: usize,
    channel: usize,
    separator: u8,
) -> Result<()> {
    let current_block = scanner.cursor.block;
    let target_block = current_block + 1;

    // A lower channel already in the target block: start from its position and
    // only skip the segments between it and us.
    if let Some(lower) = (0..channel).rev().find(|&i| channels[i].block == target_block) {
        trace!(
            "channel {}: jumping via channel {} into block {}",
            channel,
            lower,
            target_block
        );
        scanner.resume(channels[lower])?;
        skip_segments(scanner, channel - lower)?;
        return land_in_segment(scanner);
    }

    if separator == b'|' {
        // A higher channel still in this block is further along than we are.
        if let Some(upper) = (channel + 1..channel_count)
            .rev()
            .find(|&i| channels[i].block == current_block)
        {
            trace!(
                "channel {}: scanning for block end from channel {}",
                channel,
                upper
            );
            scanner.resume(channels[upper])?;
        }

        loop {
            match scanner.skip_to_separator()? {
                Some(b';') => break,
                Some(_) => continue,
                None => {
                    scanner.cursor.block = FINISHED_BLOCK;
                    return Ok(());
                }
            }
        }
    }

    if scanner.skip_nonvisible()?.is_none() {
        scanner.cursor.block = FINISHED_BLOCK;
        return Ok(());
    }

    scanner.cursor.block = target_block;
    skip_segments(scanner, channel)?;
    land_in_segment(scanner)
}

/// Skip `count` channel segments of the current block
fn skip_segments<S: InputSource>(scanner: &mut Scanner<'_, S>, count: usize) -> Result<()> {
    for _ in 0..count {
        if scanner.skip_to_separator()? != Some(b'|') {
            return Err(scanner.error(ParseErrorKind::InconsistentChannelCount));
        }
    }
    Ok(())
}

fn land_in_segment<S: InputSource>(scanner: &mut Scanner<'_, S>) -> Result<()> {
    match scanner.skip_nonvisible()? {
        Some(_) => Ok(()),
        None => Err(scanner.error(ParseErrorKind::UnexpectedEof)),
    }
}

/// Iterator over the remaining notes of one channel
pub struct ChannelNotes<'p, S> {
    parser: &'p mut Parser<S>,
    channel: usize,
    done: bool,
}

impl<S: InputSource> Iterator for ChannelNotes<'_, S> {
    type Item = Result<Note>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.parse_next(self.channel) {
            Ok(Some(note)) => Some(Ok(note)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
