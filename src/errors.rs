/*
This file is part of jxl-toolkit.

jxl-toolkit is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

jxl-toolkit is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with jxl-toolkit.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Errors reported by the decoder facade and the merge composer

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while decoding or composing.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Underlying read or seek failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The input does not start with a JXL codestream or container signature.
    #[error("not a JXL file: {0}")]
    NotJxl(&'static str),
    /// A second pass over the input was required but the source refuses to
    /// seek back to its start position.
    #[error("input source is not seekable")]
    NotSeekable,
    /// The codec reported an error, produced an out-of-contract event, or
    /// stalled without consuming input.
    #[error("corrupted stream: {0}")]
    CorruptedStream(&'static str),
    /// A frame, box or JPEG index beyond a known-complete enumeration.
    #[error("index {index} out of range (count is {count})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The complete enumeration's length.
        count: usize,
    },
    /// A caller-provided sink is smaller than the computed minimum.
    #[error("buffer of {got} bytes is too small, need {needed}")]
    BufferTooSmall {
        /// Minimum byte count required.
        needed: usize,
        /// Byte count actually offered.
        got: usize,
    },
    /// Size or stride arithmetic overflowed.
    #[error("image buffer size overflows")]
    BufferTooLarge,
    /// A method was called in an invalid state.
    #[error("usage error: {0}")]
    Usage(&'static str),
    /// Box decompression requested but the backend lacks Brotli support.
    #[error("Brotli support is not available")]
    NoBrotli,
    /// Merge composer inputs violate a constraint.
    #[error("invalid merge config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this is a caller mistake rather than a problem with the input.
    ///
    /// Groups [`Error::Usage`] with [`Error::IndexOutOfRange`], which the
    /// original exception hierarchy treated as a usage subclass.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::IndexOutOfRange { .. })
    }
}
