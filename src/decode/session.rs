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

//! The contract between the decoder facade and an event-driven codec
//! session. Implementations are thin translations of the backing library;
//! all policy lives in [`Decoder`](super::Decoder).

use std::sync::Arc;

use super::event::{Event, EventSet};
use crate::color::EncodedProfile;
use crate::common::PixelFormat;
use crate::errors::Result;
use crate::metadata::{
    BasicInfo, BlendInfo, BoxType, ColorProfileTarget, ExtraChannelInfo, FrameHeader,
};
use crate::parallel::ParallelRunner;

/// An event-driven JXL codec session.
///
/// The session is fed input windows and repeatedly asked to
/// [`process`](Self::process); each call either makes progress silently or
/// surfaces one [`Event`]. Getters are only valid while the corresponding
/// event is the most recent one (box getters after [`Event::Box`], frame
/// getters after [`Event::Frame`], and so on), exactly as in the backing
/// library.
///
/// Output sinks are owned `Vec<u8>` buffers moved into the session; the
/// matching `release_*` call recovers the buffer and reports how many of its
/// bytes were *not* written, preserving the set/release byte accounting of
/// the native API.
pub trait CodecSession {
    /// The color management system type accepted by
    /// [`set_cms`](Self::set_cms). Sessions without CMS support use `()`.
    type Cms;

    /// Declare which events the session will surface. Must be called before
    /// the first [`process`](Self::process) after creation or rewind.
    fn subscribe(&mut self, events: EventSet) -> Result<()>;

    /// Hand a worker pool to the session. Pixel decoding of a single frame
    /// is the only parallelised work.
    fn set_parallel_runner(&mut self, runner: Arc<dyn ParallelRunner>) -> Result<()>;

    /// Install a color management system, enabling ICC output profiles.
    fn set_cms(&mut self, cms: Self::Cms) -> Result<()>;

    /// Decode raw layers instead of coalesced frames.
    fn set_coalescing(&mut self, coalescing: bool) -> Result<()>;

    /// Keep the as-in-bitstream orientation instead of re-orienting pixels.
    fn set_keep_orientation(&mut self, keep: bool) -> Result<()>;

    /// Convert associated alpha to straight alpha on decode.
    fn set_unpremultiply_alpha(&mut self, unpremultiply: bool) -> Result<()>;

    /// Emit decompressed box content rather than raw `brob` payloads.
    /// Fails when the backend lacks Brotli support.
    fn set_decompress_boxes(&mut self, decompress: bool) -> Result<()>;

    /// Whether the backend can decompress `brob` boxes at all.
    fn has_brotli(&self) -> bool;

    /// Provide the next input window. Only one window may be outstanding;
    /// call [`release_input`](Self::release_input) before setting another.
    fn set_input(&mut self, data: &[u8]) -> Result<()>;

    /// Signal that no further input will follow the current window.
    fn close_input(&mut self);

    /// Take back the outstanding input window; returns the number of bytes
    /// at its tail the session has not consumed yet.
    fn release_input(&mut self) -> usize;

    /// Advance the state machine until the next event.
    fn process(&mut self) -> Event;

    /// Basic info; valid once [`Event::BasicInfo`] has occurred.
    fn basic_info(&self) -> Result<BasicInfo>;

    /// Header of the current frame; valid after [`Event::Frame`].
    fn frame_header(&self) -> Result<FrameHeader>;

    /// Name of the current frame. `len` is the byte length announced by the
    /// frame header.
    fn frame_name(&self, len: usize) -> Result<String>;

    /// Description of extra channel `index`.
    fn extra_channel_info(&self, index: u32) -> Result<ExtraChannelInfo>;

    /// Name of extra channel `index`; `len` as announced by its info record.
    fn extra_channel_name(&self, index: u32, len: usize) -> Result<String>;

    /// Blend info of extra channel `index` for the current frame; only
    /// meaningful with coalescing disabled.
    fn extra_channel_blend_info(&self, index: u32) -> Result<BlendInfo>;

    /// Type of the current box; valid after [`Event::Box`]. With
    /// `decompressed` the inner type of a `brob` wrapper is reported.
    fn box_type(&self, decompressed: bool) -> Result<BoxType>;

    /// Total size of the current box including its header, or 0 when the box
    /// extends to end of file.
    fn box_size_raw(&self) -> Result<u64>;

    /// Payload size of the current box, or 0 when unknown.
    fn box_size_contents(&self) -> Result<u64>;

    /// The encoded color profile for `target`, when one can be represented.
    fn encoded_profile(&self, target: ColorProfileTarget) -> Result<Option<EncodedProfile>>;

    /// Size in bytes of the ICC profile for `target`; 0 when unavailable.
    fn icc_profile_size(&self, target: ColorProfileTarget) -> Result<usize>;

    /// The ICC profile bytes for `target`.
    fn icc_profile(&self, target: ColorProfileTarget) -> Result<Vec<u8>>;

    /// Override the output color profile with an encoded description or raw
    /// ICC bytes (exactly one of the two). An `Err` from this call is the
    /// backing library refusing the override, which the facade reports as a
    /// `false` return, not an error.
    fn set_output_color_profile(
        &mut self,
        encoded: Option<&EncodedProfile>,
        icc: Option<&[u8]>,
    ) -> Result<()>;

    /// Register the main image output buffer for the current frame.
    fn set_image_out(&mut self, format: &PixelFormat, buf: Vec<u8>) -> Result<()>;

    /// Recover the image output buffer; `None` when none was set.
    fn release_image_out(&mut self) -> Option<Vec<u8>>;

    /// Register an output buffer for extra channel `index`.
    fn set_extra_channel_out(&mut self, index: u32, format: &PixelFormat, buf: Vec<u8>)
        -> Result<()>;

    /// Recover the output buffer of extra channel `index`.
    fn release_extra_channel_out(&mut self, index: u32) -> Option<Vec<u8>>;

    /// Register the box content output buffer.
    fn set_box_out(&mut self, buf: Vec<u8>) -> Result<()>;

    /// Recover the box content buffer and the count of its bytes not
    /// written.
    fn release_box_out(&mut self) -> (Vec<u8>, usize);

    /// Register the JPEG reconstruction output buffer.
    fn set_jpeg_out(&mut self, buf: Vec<u8>) -> Result<()>;

    /// Recover the JPEG buffer and the count of its bytes not written.
    fn release_jpeg_out(&mut self) -> (Vec<u8>, usize);

    /// Return to the start of the stream. Subscriptions and input must be
    /// re-established afterwards; decoder options survive.
    fn rewind(&mut self);

    /// Skip the next `n` frames; skipped frames surface no events.
    fn skip_frames(&mut self, n: usize);

    /// Abandon the current frame's pixel data and continue with the next
    /// event.
    fn skip_current_frame(&mut self);
}
