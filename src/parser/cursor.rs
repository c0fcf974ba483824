//! Per-channel read position and the peekable scanner that drives it

use super::input::InputSource;
use crate::error::{Error, ParseErrorKind};

/// Saved read position for one channel (or for the header).
///
/// `position` is the physical offset of the next byte the source would
/// deliver. When `pending` holds a byte, that byte has already been fetched
/// from the source but not consumed, and is delivered before anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCursor {
    pub position: u32,
    pub line: u32,
    pub column: u32,
    /// Index of the `;`-terminated block this cursor is positioned in
    pub block: u32,
    pub pending: Option<u8>,
}

impl ChannelCursor {
    pub fn new() -> Self {
        Self {
            position: 0,
            line: 1,
            column: 1,
            block: 0,
            pending: None,
        }
    }
}

impl Default for ChannelCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward-only view of the shared input, positioned by one cursor at a time
pub(crate) struct Scanner<'a, S> {
    source: &'a mut S,
    pub(crate) cursor: ChannelCursor,
    /// Set when the last seek landed outside the source
    at_end: bool,
}

impl<'a, S: InputSource> Scanner<'a, S> {
    pub(crate) fn new(source: &'a mut S, cursor: ChannelCursor) -> Self {
        Self {
            source,
            cursor,
            at_end: false,
        }
    }

    /// Adopt a saved cursor and move the physical stream to match it
    pub(crate) fn resume(&mut self, cursor: ChannelCursor) -> Result<(), Error> {
        self.cursor = cursor;
        self.at_end = !self
            .source
            .seek(cursor.position)
            .map_err(|e| self.input_error(e))?;
        Ok(())
    }

    fn fetch(&mut self) -> Result<Option<u8>, Error> {
        if self.at_end {
            return Ok(None);
        }
        let byte = self.source.read().map_err(|e| self.input_error(e))?;
        match byte {
            Some(_) => {
                self.cursor.position = self.cursor.position.checked_add(1).ok_or_else(|| {
                    self.input_error(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "input is larger than 4 GiB",
                    ))
                })?;
            }
            None => self.at_end = true,
        }
        Ok(byte)
    }

    /// Look at the next byte without consuming it
    pub(crate) fn peek(&mut self) -> Result<Option<u8>, Error> {
        if let Some(c) = self.cursor.pending {
            return Ok(Some(c));
        }
        let byte = self.fetch()?;
        self.cursor.pending = byte;
        Ok(byte)
    }

    /// Consume the next byte, updating line and column
    pub(crate) fn advance(&mut self) -> Result<Option<u8>, Error> {
        let byte = match self.cursor.pending.take() {
            Some(c) => Some(c),
            None => self.fetch()?,
        };
        match byte {
            Some(b'\n') => {
                self.cursor.line += 1;
                self.cursor.column = 1;
            }
            Some(_) => self.cursor.column += 1,
            None => {}
        }
        Ok(byte)
    }

    /// Build an error located at the current cursor position
    pub(crate) fn error(&self, kind: ParseErrorKind) -> Error {
        Error::Parse {
            kind,
            line: self.cursor.line,
            column: self.cursor.column,
        }
    }

    fn input_error(&self, source: std::io::Error) -> Error {
        Error::Input {
            source,
            line: self.cursor.line,
            column: self.cursor.column,
        }
    }
}
