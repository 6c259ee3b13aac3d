use ft_lexer::{LexError, UnlexError};
use thiserror::Error;

use crate::charset::DecodeError;

/// Any failure while decoding a source through a codec.
///
/// None of these are recovered from: a file that cannot be rewritten must
/// fail to load rather than load as the wrong text.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to tokenize source: {0}")]
    Lex(#[from] LexError),
    #[error("failed to reassemble rewritten source: {0}")]
    Unlex(#[from] UnlexError),
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
