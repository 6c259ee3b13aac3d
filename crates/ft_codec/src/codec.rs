//! Codec descriptors and the `future_typing` codec itself.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use ft_ast::{ErrorPolicy, RewriteOptions, ENCODING_NAME};

use crate::error::CodecError;
use crate::utf8::{self, StreamReader, StreamWriter};

pub trait IncrementalEncoder: Send {
    fn encode(&mut self, input: &str, final_: bool) -> Result<Vec<u8>, CodecError>;

    fn reset(&mut self) {}
}

pub trait IncrementalDecoder: Send {
    fn decode(&mut self, input: &[u8], final_: bool) -> Result<String, CodecError>;

    fn reset(&mut self);
}

pub type EncodeFn = Arc<dyn Fn(&str, ErrorPolicy) -> Result<(Vec<u8>, usize), CodecError> + Send + Sync>;
pub type DecodeFn = Arc<dyn Fn(&[u8], ErrorPolicy) -> Result<(String, usize), CodecError> + Send + Sync>;
pub type EncoderFactory = Arc<dyn Fn(ErrorPolicy) -> Box<dyn IncrementalEncoder> + Send + Sync>;
pub type DecoderFactory = Arc<dyn Fn(ErrorPolicy) -> Box<dyn IncrementalDecoder> + Send + Sync>;

/// Everything the host needs to use an encoding: one-shot functions,
/// incremental factories and stream wrappers.
#[derive(Clone)]
pub struct CodecInfo {
    name: String,
    encode: EncodeFn,
    decode: DecodeFn,
    incremental_encoder: EncoderFactory,
    incremental_decoder: DecoderFactory,
}

impl CodecInfo {
    /// Plain UTF-8.
    pub fn utf8() -> Self {
        Self {
            name: utf8::NAME.to_string(),
            encode: Arc::new(utf8::encode),
            decode: Arc::new(utf8::decode),
            incremental_encoder: Arc::new(utf8::incremental_encoder),
            incremental_decoder: Arc::new(utf8::incremental_decoder),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encode(&self, text: &str, errors: ErrorPolicy) -> Result<(Vec<u8>, usize), CodecError> {
        (self.encode)(text, errors)
    }

    pub fn decode(&self, input: &[u8], errors: ErrorPolicy) -> Result<(String, usize), CodecError> {
        (self.decode)(input, errors)
    }

    pub fn incremental_encoder(&self, errors: ErrorPolicy) -> Box<dyn IncrementalEncoder> {
        (self.incremental_encoder)(errors)
    }

    pub fn incremental_decoder(&self, errors: ErrorPolicy) -> Box<dyn IncrementalDecoder> {
        (self.incremental_decoder)(errors)
    }

    /// Stream reading is plain UTF-8; rewriting only happens through
    /// [`CodecInfo::decode`] and the incremental decoder.
    pub fn stream_reader(&self, inner: Box<dyn Read + Send>, errors: ErrorPolicy) -> StreamReader {
        utf8::stream_reader(inner, errors)
    }

    pub fn stream_writer(&self, inner: Box<dyn Write + Send>, errors: ErrorPolicy) -> StreamWriter {
        utf8::stream_writer(inner, errors)
    }
}

impl fmt::Debug for CodecInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecInfo")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Buffers every chunk and decodes the whole input once `final_` is set.
///
/// Rewriting needs the full token stream, so nothing is emitted before the
/// last chunk.
pub struct BufferedIncrementalDecoder {
    buffer: Vec<u8>,
    errors: ErrorPolicy,
    decode: DecodeFn,
}

impl BufferedIncrementalDecoder {
    pub fn new(errors: ErrorPolicy, decode: DecodeFn) -> Self {
        Self {
            buffer: Vec::new(),
            errors,
            decode,
        }
    }

    /// Bytes held back so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl IncrementalDecoder for BufferedIncrementalDecoder {
    fn decode(&mut self, input: &[u8], final_: bool) -> Result<String, CodecError> {
        self.buffer.extend_from_slice(input);
        if !final_ {
            return Ok(String::new());
        }
        let buffer = std::mem::take(&mut self.buffer);
        let (text, _) = (self.decode)(&buffer, self.errors)?;
        Ok(text)
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// The `future_typing` codec configured with `options`.
pub fn future_typing_codec(options: RewriteOptions) -> CodecInfo {
    let options = Arc::new(options);
    let decode: DecodeFn = {
        let options = Arc::clone(&options);
        Arc::new(move |input: &[u8], errors: ErrorPolicy| crate::decode::decode(input, errors, &options))
    };
    let factory: DecoderFactory = {
        let decode = Arc::clone(&decode);
        Arc::new(move |errors: ErrorPolicy| {
            Box::new(BufferedIncrementalDecoder::new(errors, Arc::clone(&decode)))
                as Box<dyn IncrementalDecoder>
        })
    };

    CodecInfo {
        name: ENCODING_NAME.to_string(),
        decode,
        incremental_decoder: factory,
        ..CodecInfo::utf8()
    }
}
