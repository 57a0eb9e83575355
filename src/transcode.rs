//! Streaming decode from the source encoding into UTF-8.
//!
//! A multi-byte character split across two chunks is held back by the decoder
//! and emitted with the next chunk, so concatenating the outputs equals
//! decoding the whole input at once.

use crate::{Error, Result};
use bytes::Bytes;
use encoding_rs::{Decoder, DecoderResult, Encoding, REPLACEMENT, UTF_8};
use std::fmt;

/// A source character encoding
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// ISO-8859-1, every byte is the code point of the same value
    Latin1,
    /// Any WHATWG encoding supported by `encoding_rs`
    Whatwg(&'static Encoding),
}

impl SourceEncoding {
    /// Resolve a label, accepts WHATWG labels and the usual aliases
    /// (`latin-1`, `utf_8`, `shift_jis`, ...)
    ///
    /// # Errors
    ///
    /// Will return `Err` if the label is unknown
    pub fn for_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase();

        // WHATWG maps these to windows-1252, which differs in 0x80..=0x9f
        if matches!(
            normalized.as_str(),
            "latin-1"
                | "latin_1"
                | "latin1"
                | "l1"
                | "iso-8859-1"
                | "iso8859-1"
                | "iso_8859-1"
                | "iso_8859_1"
                | "iso8859_1"
                | "8859"
                | "cp819"
        ) {
            return Ok(Self::Latin1);
        }

        let candidates = [
            normalized.clone(),
            normalized.replace('_', "-"),
            normalized.replace(['-', '_'], ""),
        ];

        candidates
            .iter()
            .find_map(|candidate| Encoding::for_label_no_replacement(candidate.as_bytes()))
            .filter(|encoding| *encoding != REPLACEMENT)
            .map(Self::Whatwg)
            .ok_or_else(|| Error::invalid(format!("unknown source encoding: {label}")))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Whatwg(encoding) => encoding.name(),
        }
    }

    /// Smallest source chunk that still decodes to at least `min_part`
    /// bytes of UTF-8.
    ///
    /// Single-byte encodings map every byte to at least one output byte.
    /// UTF-16 halves ASCII text, the other multi-byte encodings never shrink
    /// by more than that. Those may also drop a BOM and hold back an
    /// incomplete sequence for the next chunk.
    #[must_use]
    pub fn min_chunk_size(&self, min_part: u64) -> u64 {
        match self {
            Self::Latin1 => min_part,
            Self::Whatwg(encoding) if encoding.is_single_byte() => min_part,
            Self::Whatwg(encoding) if *encoding == UTF_8 => min_part + HELD_BACK_BYTES,
            Self::Whatwg(_) => min_part.saturating_mul(2) + HELD_BACK_BYTES,
        }
    }
}

// a removed BOM plus an incomplete sequence carried into the next chunk
const HELD_BACK_BYTES: u64 = 8;

impl fmt::Debug for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceEncoding({})", self.name())
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoder state for one object, chunks must be fed in order
pub struct Transcoder {
    encoding: SourceEncoding,
    decoder: Option<Decoder>,
    // source bytes consumed so far
    offset: u64,
}

impl Transcoder {
    #[must_use]
    pub fn new(encoding: SourceEncoding) -> Self {
        let decoder = match encoding {
            SourceEncoding::Latin1 => None,
            SourceEncoding::Whatwg(encoding) => Some(encoding.new_decoder_with_bom_removal()),
        };

        Self {
            encoding,
            decoder,
            offset: 0,
        }
    }

    #[must_use]
    pub const fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// Decode the next chunk and return it as UTF-8. `last` flushes the
    /// decoder, an incomplete sequence at that point is an error.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the input is not valid in the source encoding
    pub fn transcode(&mut self, input: &[u8], last: bool) -> Result<Bytes> {
        let offset = self.offset;
        self.offset += input.len() as u64;

        let Some(decoder) = self.decoder.as_mut() else {
            let output: String = input.iter().copied().map(char::from).collect();
            return Ok(Bytes::from(output.into_bytes()));
        };

        let capacity = decoder
            .max_utf8_buffer_length_without_replacement(input.len())
            .ok_or_else(|| Error::invalid("chunk too large to decode"))?;
        let mut output = String::with_capacity(capacity);
        let mut src = input;

        loop {
            let (result, read) =
                decoder.decode_to_string_without_replacement(src, &mut output, last);

            let consumed = u64::try_from(input.len() - src.len() + read).unwrap_or(u64::MAX);
            src = src.get(read..).unwrap_or_default();

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {
                    let more = decoder
                        .max_utf8_buffer_length_without_replacement(src.len())
                        .unwrap_or(src.len() * 3 + 4);
                    output.reserve(more.max(4));
                }
                DecoderResult::Malformed(bad, extra) => {
                    let at = (offset + consumed)
                        .saturating_sub(u64::from(bad) + u64::from(extra));
                    return Err(Error::Decode {
                        encoding: self.encoding.name().to_string(),
                        offset: at,
                        reason: format!("malformed sequence of {bad} byte(s)"),
                    });
                }
            }
        }

        Ok(Bytes::from(output.into_bytes()))
    }
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("encoding", &self.encoding)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
