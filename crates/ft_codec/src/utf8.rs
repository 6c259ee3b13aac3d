//! Plain UTF-8 codec pieces, shared by every codec in the registry.

use std::io::{Read, Write};

use ft_ast::ErrorPolicy;

use crate::charset::{decode_bytes, incomplete_tail};
use crate::codec::{IncrementalDecoder, IncrementalEncoder};
use crate::error::CodecError;

/// Canonical registry name.
pub const NAME: &str = "utf_8";

/// Encode `text`; returns the bytes and the number of characters consumed.
pub fn encode(text: &str, _errors: ErrorPolicy) -> Result<(Vec<u8>, usize), CodecError> {
    Ok((text.as_bytes().to_vec(), text.chars().count()))
}

/// Decode `input` in one go; returns the text and the number of bytes consumed.
pub fn decode(input: &[u8], errors: ErrorPolicy) -> Result<(String, usize), CodecError> {
    let text = decode_bytes(input, errors)?;
    Ok((text.into_owned(), input.len()))
}

#[derive(Debug, Default)]
pub struct Utf8IncrementalEncoder;

impl IncrementalEncoder for Utf8IncrementalEncoder {
    fn encode(&mut self, input: &str, _final: bool) -> Result<Vec<u8>, CodecError> {
        Ok(input.as_bytes().to_vec())
    }
}

pub fn incremental_encoder(_errors: ErrorPolicy) -> Box<dyn IncrementalEncoder> {
    Box::new(Utf8IncrementalEncoder)
}

/// Decodes chunked input, holding back a multi-byte sequence split across chunks.
#[derive(Debug)]
pub struct Utf8IncrementalDecoder {
    errors: ErrorPolicy,
    pending: Vec<u8>,
}

impl Utf8IncrementalDecoder {
    pub fn new(errors: ErrorPolicy) -> Self {
        Self {
            errors,
            pending: Vec::new(),
        }
    }
}

impl IncrementalDecoder for Utf8IncrementalDecoder {
    fn decode(&mut self, input: &[u8], final_: bool) -> Result<String, CodecError> {
        self.pending.extend_from_slice(input);
        let keep = if final_ {
            0
        } else {
            incomplete_tail(&self.pending)
        };
        let ready = self.pending.len() - keep;
        let text = decode_bytes(&self.pending[..ready], self.errors)?.into_owned();
        self.pending.drain(..ready);
        Ok(text)
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

pub fn incremental_decoder(errors: ErrorPolicy) -> Box<dyn IncrementalDecoder> {
    Box::new(Utf8IncrementalDecoder::new(errors))
}

/// Reads text from a byte stream.
pub struct StreamReader {
    inner: Box<dyn Read + Send>,
    decoder: Utf8IncrementalDecoder,
}

impl StreamReader {
    pub fn new(inner: Box<dyn Read + Send>, errors: ErrorPolicy) -> Self {
        Self {
            inner,
            decoder: Utf8IncrementalDecoder::new(errors),
        }
    }

    /// Read up to `size` bytes and decode them. An empty string means end of stream.
    pub fn read(&mut self, size: usize) -> Result<String, CodecError> {
        let mut buf = vec![0; size.max(4)];
        loop {
            let n = self.inner.read(&mut buf)?;
            let text = self.decoder.decode(&buf[..n], n == 0)?;
            if n == 0 || !text.is_empty() {
                return Ok(text);
            }
        }
    }

    pub fn read_to_string(&mut self) -> Result<String, CodecError> {
        let mut bytes = Vec::new();
        self.inner.read_to_end(&mut bytes)?;
        self.decoder.decode(&bytes, true)
    }
}

pub fn stream_reader(inner: Box<dyn Read + Send>, errors: ErrorPolicy) -> StreamReader {
    StreamReader::new(inner, errors)
}

/// Writes text to a byte stream.
pub struct StreamWriter {
    inner: Box<dyn Write + Send>,
}

impl StreamWriter {
    pub fn new(inner: Box<dyn Write + Send>) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, text: &str) -> Result<(), CodecError> {
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}

pub fn stream_writer(inner: Box<dyn Write + Send>, _errors: ErrorPolicy) -> StreamWriter {
    StreamWriter::new(inner)
}
