// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds-checked cursor over file bytes, with binary and text accessors.

use crate::error::FormatError;
use crate::formats::FiberFormat;

/// Byte order of binary payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

/// Reads binary values and whitespace-separated tokens from a byte slice.
///
/// Every read that would run past the end yields [`FormatError::Truncated`].
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    format: FiberFormat,
    comments: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8], format: FiberFormat) -> Self {
        Self {
            data,
            pos: 0,
            format,
            comments: false,
        }
    }

    /// Treat `#` as the start of a comment running to end of line when reading tokens.
    pub(crate) fn with_comments(mut self) -> Self {
        self.comments = true;
        self
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<(), FormatError> {
        if pos > self.data.len() {
            return Err(self.truncated(format!(
                "offset {pos} lies past the end ({} bytes)",
                self.data.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn truncated(&self, detail: String) -> FormatError {
        FormatError::Truncated {
            format: self.format,
            detail,
        }
    }

    pub(crate) fn malformed(&self, reason: String) -> FormatError {
        FormatError::Malformed {
            format: self.format,
            reason,
        }
    }

    pub(crate) fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], FormatError> {
        if self.remaining() < n {
            return Err(self.truncated(format!(
                "{what}: needed {n} bytes at offset {}, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], FormatError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8, FormatError> {
        Ok(self.array::<1>(what)?[0])
    }

    pub(crate) fn i32(&mut self, endian: Endian, what: &str) -> Result<i32, FormatError> {
        let b = self.array::<4>(what)?;
        Ok(match endian {
            Endian::Little => i32::from_le_bytes(b),
            Endian::Big => i32::from_be_bytes(b),
        })
    }

    pub(crate) fn f32(&mut self, endian: Endian, what: &str) -> Result<f32, FormatError> {
        let b = self.array::<4>(what)?;
        Ok(match endian {
            Endian::Little => f32::from_le_bytes(b),
            Endian::Big => f32::from_be_bytes(b),
        })
    }

    pub(crate) fn f64(&mut self, endian: Endian, what: &str) -> Result<f64, FormatError> {
        let b = self.array::<8>(what)?;
        Ok(match endian {
            Endian::Little => f64::from_le_bytes(b),
            Endian::Big => f64::from_be_bytes(b),
        })
    }

    /// Next line without its terminator, or `None` at end of data.
    pub(crate) fn line(&mut self) -> Result<Option<&'a str>, FormatError> {
        if self.is_at_end() {
            return Ok(None);
        }
        let rest = &self.data[self.pos..];
        let (raw, advance) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        core::str::from_utf8(raw)
            .map(Some)
            .map_err(|_| self.malformed("header line is not valid UTF-8".into()))
    }

    /// Next non-blank line, trimmed.
    pub(crate) fn content_line(&mut self) -> Result<Option<&'a str>, FormatError> {
        while let Some(line) = self.line()? {
            let t = line.trim();
            if !t.is_empty() {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn skip_space(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if self.comments && b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Next whitespace-separated token, or `None` at end of data.
    pub(crate) fn token(&mut self) -> Result<Option<&'a str>, FormatError> {
        self.skip_space();
        let start = self.pos;
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() || (self.comments && b == b'#') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        core::str::from_utf8(&self.data[start..self.pos])
            .map(Some)
            .map_err(|_| self.malformed(format!("non UTF-8 token at offset {start}")))
    }

    pub(crate) fn expect_token(&mut self, what: &str) -> Result<&'a str, FormatError> {
        self.token()?
            .ok_or_else(|| self.truncated(format!("expected {what}, found end of data")))
    }

    pub(crate) fn parse_usize(&mut self, what: &str) -> Result<usize, FormatError> {
        let tok = self.expect_token(what)?;
        tok.parse()
            .map_err(|_| self.malformed(format!("{what}: `{tok}` is not a non-negative integer")))
    }

    pub(crate) fn parse_f32(&mut self, what: &str) -> Result<f32, FormatError> {
        let tok = self.expect_token(what)?;
        tok.parse()
            .map_err(|_| self.malformed(format!("{what}: `{tok}` is not a number")))
    }
}
