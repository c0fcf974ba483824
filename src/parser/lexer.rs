//! Lexical helpers: whitespace and comments, integers, separators

use super::cursor::Scanner;
use super::input::InputSource;
use crate::error::{Error, ParseErrorKind};

/// Size of the digit buffer for integer parsing (one slot is reserved, so an
/// integer may hold at most `INTEGER_BUFFER_LEN - 1` digits)
pub const INTEGER_BUFFER_LEN: usize = 32;

pub(crate) fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

impl<S: InputSource> Scanner<'_, S> {
    /// Consume whitespace and `#` comments. Returns the next significant
    /// byte (left unconsumed), or `None` at end of input.
    pub(crate) fn skip_nonvisible(&mut self) -> Result<Option<u8>, Error> {
        loop {
            match self.peek()? {
                None => return Ok(None),
                Some(c) if is_whitespace(c) => {
                    self.advance()?;
                }
                Some(b'#') => {
                    self.advance()?;
                    self.skip_comment()?;
                }
                Some(c) => return Ok(Some(c)),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), Error> {
        while let Some(c) = self.advance()? {
            if c == b'\n' {
                break;
            }
        }
        Ok(())
    }

    /// Consume and return the next significant byte
    pub(crate) fn next_visible(&mut self) -> Result<Option<u8>, Error> {
        self.skip_nonvisible()?;
        self.advance()
    }

    /// Like `next_visible`, but end of input is an error
    pub(crate) fn expect_visible(&mut self) -> Result<u8, Error> {
        match self.next_visible()? {
            Some(c) => Ok(c),
            None => Err(self.error(ParseErrorKind::UnexpectedEof)),
        }
    }

    /// Read an unsigned decimal integer starting at the current position
    pub(crate) fn read_unsigned_int(&mut self) -> Result<u32, Error> {
        let mut digits = 0usize;
        let mut value: Option<u32> = Some(0);

        while let Some(c) = self.peek()? {
            if !c.is_ascii_digit() {
                break;
            }
            if digits == INTEGER_BUFFER_LEN - 1 {
                return Err(self.error(ParseErrorKind::IntegerTooLong));
            }
            self.advance()?;
            digits += 1;
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add((c - b'0') as u32));
        }

        if digits == 0 {
            let kind = if self.peek()?.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::ExpectedInteger
            };
            return Err(self.error(kind));
        }

        value.ok_or_else(|| self.error(ParseErrorKind::IntegerTooLarge))
    }

    /// Consume note text up to and including the next `|` or `;`.
    ///
    /// Returns the separator found, or `None` if input ended first. A `#`
    /// directly after a letter is a sharp sign; anywhere else it starts a
    /// comment.
    pub(crate) fn skip_to_separator(&mut self) -> Result<Option<u8>, Error> {
        let mut prev = b' ';
        while let Some(c) = self.advance()? {
            match c {
                b'|' | b';' => return Ok(Some(c)),
                b'#' if !prev.is_ascii_alphabetic() => {
                    self.skip_comment()?;
                    prev = b'\n';
                    continue;
                }
                _ => {}
            }
            prev = c;
        }
        Ok(None)
    }
}
