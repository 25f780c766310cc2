//! Protocol requests, responses and snapshot encodings.
//!
//! Requests render to the exact ASCII line sent on the wire (without
//! the trailing newline, which the codec appends). Responses are parsed
//! from one received line; anything that does not fit the grammar is a
//! [`PixelflutError::Protocol`] quoting the line.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::PixelflutError;

// ── StateEncoding ────────────────────────────────────────────────

/// Pixel encoding of a `STATE` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateEncoding {
    /// Base64 of packed `R G B` triples.
    #[default]
    Rgb64,
    /// Base64 of packed `A R G B` quads with alpha always zero.
    Rgba64,
}

impl StateEncoding {
    /// Command argument and response tag.
    pub const fn token(self) -> &'static str {
        match self {
            StateEncoding::Rgb64 => "rgb64",
            StateEncoding::Rgba64 => "rgba64",
        }
    }

    /// Bytes per pixel in the decoded payload.
    pub const fn channels(self) -> usize {
        match self {
            StateEncoding::Rgb64 => 3,
            StateEncoding::Rgba64 => 4,
        }
    }

    /// Offset of the alpha byte inside one pixel, if there is one.
    pub const fn alpha_offset(self) -> Option<usize> {
        match self {
            StateEncoding::Rgb64 => None,
            StateEncoding::Rgba64 => Some(0),
        }
    }

    /// Match a response tag, ignoring ASCII case.
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        [StateEncoding::Rgb64, StateEncoding::Rgba64]
            .into_iter()
            .find(|enc| tag.eq_ignore_ascii_case(enc.token().as_bytes()))
    }
}

impl fmt::Display for StateEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for StateEncoding {
    type Err = PixelflutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateEncoding::from_tag(s.as_bytes())
            .ok_or_else(|| PixelflutError::Other(format!("unknown state encoding '{s}'")))
    }
}

// ── Request ──────────────────────────────────────────────────────

/// A command line sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `SIZE`
    Size,
    /// `HELP [topic]`
    Help(Option<String>),
    /// `PX <x> <y>`
    GetPixel { x: u32, y: u32 },
    /// `PX <x> <y> <color>`
    SetPixel { x: u32, y: u32, color: Color },
    /// `STATE <encoding>`
    State(StateEncoding),
    /// Legacy `BINARY`, answered like `STATE rgb64`.
    Binary,
}

impl Request {
    /// The encoding a snapshot request will be answered with.
    pub fn snapshot_encoding(&self) -> Option<StateEncoding> {
        match self {
            Request::State(enc) => Some(*enc),
            Request::Binary => Some(StateEncoding::Rgb64),
            _ => None,
        }
    }

    /// Echo lines a server may send back for a pixel write.
    ///
    /// A 6-digit write may be echoed with `FF` appended or verbatim;
    /// an 8-digit write only verbatim. Empty for non-write requests.
    pub fn accepted_echoes(&self) -> Vec<String> {
        match self {
            Request::SetPixel { x, y, color } => match color.alpha {
                Some(_) => vec![format!("PX {x} {y} {color}")],
                None => vec![
                    format!("PX {x} {y} {}", color.opaque()),
                    format!("PX {x} {y} {color}"),
                ],
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Size => write!(f, "SIZE"),
            Request::Help(None) => write!(f, "HELP"),
            Request::Help(Some(topic)) => write!(f, "HELP {topic}"),
            Request::GetPixel { x, y } => write!(f, "PX {x} {y}"),
            Request::SetPixel { x, y, color } => write!(f, "PX {x} {y} {color}"),
            Request::State(enc) => write!(f, "STATE {enc}"),
            Request::Binary => write!(f, "BINARY"),
        }
    }
}

// ── Response ─────────────────────────────────────────────────────

/// A parsed server response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `SIZE <w> <h>`
    Size { width: u32, height: u32 },
    /// `PX <x> <y> <color>`
    Pixel { x: u32, y: u32, color: Color },
    /// `STATE <encoding> <base64>`; `body` is still base64 text.
    State { encoding: StateEncoding, body: Bytes },
}

impl Response {
    /// Parse one line (sentinel already stripped).
    ///
    /// `STATE` lines are split on the first two spaces only and the
    /// body is sliced out of `line` without copying.
    pub fn parse(line: Bytes) -> Result<Self, PixelflutError> {
        let keyword_end = line.iter().position(|&b| b == b' ').unwrap_or(line.len());
        let keyword = &line[..keyword_end];

        if keyword.eq_ignore_ascii_case(b"STATE") {
            Self::parse_state(line, keyword_end)
        } else if keyword.eq_ignore_ascii_case(b"SIZE") {
            Self::parse_size(&line)
        } else if keyword.eq_ignore_ascii_case(b"PX") {
            Self::parse_pixel(&line)
        } else {
            Err(PixelflutError::unexpected("unexpected response", &line))
        }
    }

    fn parse_size(line: &[u8]) -> Result<Self, PixelflutError> {
        let fields = fields(line, "SIZE")?;
        match fields.as_slice() {
            [_, w, h] => Ok(Response::Size {
                width: number(w).ok_or_else(|| PixelflutError::unexpected("bad SIZE width", line))?,
                height: number(h).ok_or_else(|| PixelflutError::unexpected("bad SIZE height", line))?,
            }),
            _ => Err(PixelflutError::unexpected("malformed SIZE response", line)),
        }
    }

    fn parse_pixel(line: &[u8]) -> Result<Self, PixelflutError> {
        let fields = fields(line, "PX")?;
        match fields.as_slice() {
            [_, x, y, color] => Ok(Response::Pixel {
                x: number(x).ok_or_else(|| PixelflutError::unexpected("bad PX x", line))?,
                y: number(y).ok_or_else(|| PixelflutError::unexpected("bad PX y", line))?,
                color: color
                    .parse()
                    .map_err(|_| PixelflutError::unexpected("bad PX color", line))?,
            }),
            _ => Err(PixelflutError::unexpected("malformed PX response", line)),
        }
    }

    fn parse_state(line: Bytes, keyword_end: usize) -> Result<Self, PixelflutError> {
        let rest = &line[keyword_end..];
        let tag_start = keyword_end + 1;
        let tag_len = rest
            .get(1..)
            .and_then(|r| r.iter().position(|&b| b == b' '))
            .ok_or_else(|| PixelflutError::unexpected("malformed STATE response", &line))?;

        let tag = &line[tag_start..tag_start + tag_len];
        let encoding = StateEncoding::from_tag(tag)
            .ok_or_else(|| PixelflutError::unexpected("unknown STATE encoding", &line))?;

        let body = line.slice(tag_start + tag_len + 1..);
        Ok(Response::State { encoding, body })
    }

    /// Short name for logging and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Size { .. } => "SIZE",
            Response::Pixel { .. } => "PX",
            Response::State { .. } => "STATE",
        }
    }
}

fn fields<'a>(line: &'a [u8], keyword: &str) -> Result<Vec<&'a str>, PixelflutError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| PixelflutError::unexpected(&format!("non-ASCII {keyword} response"), line))?;
    Ok(text.split_ascii_whitespace().collect())
}

fn number(field: &str) -> Option<u32> {
    if field.bytes().all(|b| b.is_ascii_digit()) {
        field.parse().ok()
    } else {
        None
    }
}

// ── Tests ────────────────────────────────────────────────────────
