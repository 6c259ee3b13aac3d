//! The `future_typing` source codec.
//!
//! Decoding a source file through this codec rewrites new-style annotations
//! so an older interpreter can load it:
//!
//! - Builtin generics (`list[int]`)
//! - Union operator (`int | None`)
//!
//! The rewrite works on the token stream, never on a syntax tree. The file's
//! preamble (shebang, encoding cookie, docstring, `__future__` import) is kept
//! at the top and the compatibility import is placed right after it.
//!
//! Codecs are looked up through an explicit [`CodecRegistry`]; call
//! [`register`] once at startup to install this one.

pub mod charset;
pub mod classify;
pub mod codec;
pub mod decode;
pub mod error;
pub mod loader;
pub mod preamble;
pub mod registry;
pub mod utf8;

use ft_ast::{RewriteOptions, ENCODING_NAME};

pub use classify::{BracketDepthClassifier, Classifier, Step};
pub use codec::{future_typing_codec, CodecInfo, IncrementalDecoder, IncrementalEncoder};
pub use decode::{decode, decode_with};
pub use error::CodecError;
pub use loader::{detect_encoding, load_source};
pub use registry::CodecRegistry;

/// Install the `future_typing` codec into `registry`.
///
/// Returns `false` when a codec under that name was already registered.
pub fn register(registry: &mut CodecRegistry, options: RewriteOptions) -> bool {
    registry.register(ENCODING_NAME, future_typing_codec(options))
}
