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

//! A toolkit around the JPEG XL image format.
//!
//! The centrepiece is [`decode::Decoder`], a lazy random-access view of a JXL
//! file built on top of an event-driven codec session. Callers ask for basic
//! info, frames, pixels, boxes, ICC profiles or JPEG reconstructions in any
//! order; the decoder buffers input in bounded chunks, replays the stream and
//! skips frames as needed to answer each query.
//!
//! [`merge::MergeComposer`] goes the other way: it assembles frames and
//! metadata boxes from several sources into a single (possibly animated) JXL
//! through a low-level [`encode::EncoderSession`].

#[macro_use]
extern crate derive_builder;

mod common;
pub mod color;
pub mod decode;
pub mod encode;
mod errors;
pub mod merge;
pub mod metadata;
pub mod parallel;
pub mod pixmap;
pub mod utils;


pub use common::{Endianness, PixelDataType, PixelFormat, PixelType};
pub use decode::{options_builder, Decoder, DecoderOptions};
pub use errors::{Error, Result};

#[cfg(feature = "threads")]
pub use parallel::threads_runner::ThreadsRunner;
