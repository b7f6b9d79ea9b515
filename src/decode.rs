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

//! Lazy random-access decoder of JPEG XL files.
//!
//! [`Decoder`] hides the push/pull streaming protocol of an event-driven
//! [`CodecSession`] behind an object model: basic info, frames, pixels,
//! extra channels, boxes, ICC profiles and JPEG reconstructions can be
//! queried in any order, as often as needed. Internally the decoder buffers
//! input in bounded chunks, resubscribes to codec events, rewinds and
//! replays the stream, and skips frames to answer each query.

use std::path::Path;
use std::sync::Arc;

use crate::color::EncodedProfile;
use crate::common::{buffer_size, PixelDataType, PixelFormat};
use crate::errors::{Error, Result};
use crate::metadata::{
    BasicInfo, BoxRecord, BoxType, ColorProfileTarget, ExtraChannelInfo, FrameRecord,
};
use crate::parallel::ParallelRunner;
use crate::utils::{check_signature, Signature};

pub mod event;
pub mod input;
pub mod session;

pub use event::{Event, EventSet};
pub use input::{FileSource, PipeSource, SeekSource, Source};
pub use session::CodecSession;

use input::InputBuffer;

/// Options fixed when a source is opened.
///
/// The flag group affects decoded values; the hint group only tunes which
/// codec events are subscribed at open time and never affects correctness.
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct DecoderOptions {
    /// Decode individual layers instead of flattened animation frames.
    pub no_coalesce: bool,
    /// Emit pixels in their stored orientation instead of re-orienting them.
    pub keep_orientation: bool,
    /// Convert associated alpha to straight alpha on decode.
    pub unpremultiply_alpha: bool,
    /// Subscribe to box events at open time.
    pub want_boxes: bool,
    /// Do not subscribe to pixel output events at open time.
    pub no_pixels: bool,
    /// Do not subscribe to color profile events at open time.
    pub no_color_profile: bool,
    /// Subscribe to JPEG reconstruction events at open time.
    pub want_jpeg: bool,
    /// Input buffer cap in KiB; 0 selects the 64 MiB default.
    pub buffer_kib: usize,
}

/// Return a [`DecoderOptionsBuilder`] with default settings.
#[must_use]
pub fn options_builder() -> DecoderOptionsBuilder {
    DecoderOptionsBuilder::default()
}

/// Named state flags of the decoder.
#[derive(Clone, Debug, Default)]
struct Status {
    is_open: bool,
    is_coalescing: bool,
    got_basic_info: bool,
    got_color: bool,
    got_orig_color_enc: bool,
    got_data_color_enc: bool,
    seen_all_boxes: bool,
    seen_all_frames: bool,
    seen_all_jpeg: bool,
    decoded_some_pixels: bool,
    whole_file_buffered: bool,
    have_cms: bool,
}

/// Stop conditions for [`Decoder::process_until`]. The loop always stops at
/// `Success` and fails at `Error`.
#[derive(Clone, Copy, Default)]
struct Stop {
    events: EventSet,
    frame: Option<usize>,
    box_index: Option<usize>,
    jpeg: Option<usize>,
}

impl Stop {
    fn at(event: Event) -> Self {
        Stop {
            events: EventSet::only(event),
            ..Stop::default()
        }
    }

    fn at_frame(index: usize) -> Self {
        Stop {
            frame: Some(index),
            ..Stop::default()
        }
    }

    fn at_box(index: usize) -> Self {
        Stop {
            box_index: Some(index),
            ..Stop::default()
        }
    }

    fn at_jpeg(index: usize) -> Self {
        Stop {
            jpeg: Some(index),
            ..Stop::default()
        }
    }

    /// Run until `Success`.
    fn end() -> Self {
        Stop::default()
    }
}

/// A request for the pixels of one frame.
pub struct PixelsRequest<'buf> {
    /// Desired pixel format of the buffer.
    pub format: PixelFormat,
    /// Destination; resized to the exact required byte count.
    pub buf: &'buf mut Vec<u8>,
    /// Cap on the destination size.
    pub max: usize,
}

/// A request for one extra channel of a frame.
pub struct ExtraChannelRequest<'buf> {
    /// Extra channel index, as ordered by
    /// [`Decoder::extra_channel_info`].
    pub index: u32,
    /// Per-channel pixel format. `num_channels` must be 1.
    pub format: PixelFormat,
    /// Destination; resized to the exact required byte count.
    pub buf: &'buf mut Vec<u8>,
    /// Cap on the destination size.
    pub max: usize,
}

fn target_index(target: ColorProfileTarget) -> usize {
    match target {
        ColorProfileTarget::Original => 0,
        ColorProfileTarget::Data => 1,
    }
}

/// Lazy random-access JPEG XL decoder over a streaming codec session.
///
/// A decoder is created empty; one of the `open_*` operations binds a source
/// and establishes the initial state. Queries may mutate internal state (the
/// stream is replayed and re-buffered as needed) but never the logical view
/// of the file. An instance must be used from one thread at a time; the only
/// parallelism is the worker pool handed to the session, which decodes the
/// pixels of a single frame.
pub struct Decoder<'src, S: CodecSession> {
    session: S,
    runner: Option<Arc<dyn ParallelRunner>>,
    /// Options applied at the next `open_*` call.
    pub options: DecoderOptions,

    buffer: Option<InputBuffer<'src>>,
    source: Option<Box<dyn Source + 'src>>,
    anchor: u64,
    input_closed: bool,

    status: Status,
    events_subbed: EventSet,

    basic_info: Option<BasicInfo>,
    extra_channels: Vec<ExtraChannelInfo>,
    frame_records: Vec<Option<FrameRecord>>,
    box_records: Vec<BoxRecord>,
    encoded_profiles: [Option<EncodedProfile>; 2],
    icc_profiles: [Option<Vec<u8>>; 2],
    jpeg_count: usize,
    level: Option<i32>,

    next_frame: usize,
    next_box: usize,
    next_jpeg: usize,
}

impl<'src, S: CodecSession> Decoder<'src, S> {
    /// A closed decoder over `session`.
    pub fn new(session: S, options: DecoderOptions) -> Self {
        Self {
            session,
            runner: None,
            options,
            buffer: None,
            source: None,
            anchor: 0,
            input_closed: false,
            status: Status::default(),
            events_subbed: EventSet::EMPTY,
            basic_info: None,
            extra_channels: Vec::new(),
            frame_records: Vec::new(),
            box_records: Vec::new(),
            encoded_profiles: [None, None],
            icc_profiles: [None, None],
            jpeg_count: 0,
            level: None,
            next_frame: 0,
            next_box: 0,
            next_jpeg: 0,
        }
    }

    /// A closed decoder whose session decodes pixels on `runner`'s workers.
    pub fn with_runner(
        session: S,
        options: DecoderOptions,
        runner: Arc<dyn ParallelRunner>,
    ) -> Self {
        let mut dec = Self::new(session, options);
        dec.runner = Some(runner);
        dec
    }

    /// Open a file on disk.
    ///
    /// # Errors
    /// [`Error::Io`], [`Error::NotJxl`], [`Error::CorruptedStream`].
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let source = FileSource::open(path)?;
        self.open_stream(source)
    }

    /// Open a stream source. The stream is borrowed until `close` or reopen;
    /// its position is indeterminate afterwards. A non-seekable stream works
    /// until a rewind outruns the buffered window, which fails with
    /// [`Error::NotSeekable`].
    ///
    /// # Errors
    /// [`Error::Io`], [`Error::NotJxl`], [`Error::CorruptedStream`].
    pub fn open_stream(&mut self, source: impl Source + 'src) -> Result<()> {
        self.close();
        let mut source: Box<dyn Source + 'src> = Box::new(source);
        self.anchor = source.tell().unwrap_or(0);
        let mut buffer = InputBuffer::for_stream(self.options.buffer_kib, source.len_hint());
        buffer.prime(&mut source)?;
        self.buffer = Some(buffer);
        self.source = Some(source);
        self.begin()
    }

    /// Open a caller-owned byte range. The whole file is buffered by
    /// construction and the range is borrowed immutably until close.
    ///
    /// # Errors
    /// [`Error::NotJxl`], [`Error::CorruptedStream`].
    pub fn open_memory(&mut self, data: &'src [u8]) -> Result<()> {
        self.close();
        self.buffer = Some(InputBuffer::from_memory(data));
        self.begin()
    }

    /// Release the source and all cached state. Idempotent.
    pub fn close(&mut self) {
        self.session.rewind();
        self.buffer = None;
        self.source = None;
        self.anchor = 0;
        self.input_closed = false;
        self.status = Status::default();
        self.events_subbed = EventSet::EMPTY;
        self.basic_info = None;
        self.extra_channels.clear();
        self.frame_records.clear();
        self.box_records.clear();
        self.encoded_profiles = [None, None];
        self.icc_profiles = [None, None];
        self.jpeg_count = 0;
        self.level = None;
        self.next_frame = 0;
        self.next_box = 0;
        self.next_jpeg = 0;
    }

    /// Signature check and session bring-up over a primed buffer.
    fn begin(&mut self) -> Result<()> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or(Error::Usage("no file open"))?;
        let container = match check_signature(buffer.window()) {
            Signature::Codestream => false,
            Signature::Container => true,
            Signature::Png => {
                return Err(Error::NotJxl("this is a PNG; convert it to JXL first"))
            }
            Signature::Invalid | Signature::NotEnoughBytes => {
                return Err(Error::NotJxl("unrecognized signature"));
            }
        };

        if let Some(runner) = &self.runner {
            self.session.set_parallel_runner(Arc::clone(runner))?;
        }

        let mut events = EventSet::only(Event::BasicInfo) | Event::Frame;
        if !self.options.no_pixels {
            events |= Event::FullImage;
        }
        if !self.options.no_color_profile {
            events |= Event::ColorEncoding;
        }
        if self.options.want_boxes && container {
            events |= Event::Box;
        }
        if self.options.want_jpeg {
            events |= Event::JpegReconstruction;
        }
        self.session.subscribe(events)?;
        self.events_subbed = events;

        if self.options.no_coalesce {
            self.session.set_coalescing(false)?;
        }
        if self.options.keep_orientation {
            self.session.set_keep_orientation(true)?;
        }
        if self.options.unpremultiply_alpha {
            self.session.set_unpremultiply_alpha(true)?;
        }

        self.feed_window()?;

        self.status.is_open = true;
        self.status.is_coalescing = !self.options.no_coalesce;
        if !container {
            // A bare codestream has no container layer, hence no boxes.
            self.status.seen_all_boxes = true;
        }
        Ok(())
    }

    /// Hand the current window to the session, closing input at EOF.
    fn feed_window(&mut self) -> Result<()> {
        let buffer = self
            .buffer
            .as_mut()
            .ok_or(Error::Usage("no file open"))?;
        self.session.set_input(buffer.window())?;
        if buffer.at_eof() && !self.input_closed {
            self.session.close_input();
            self.input_closed = true;
            if buffer.whole_file() {
                self.status.whole_file_buffered = true;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.status.is_open {
            Ok(())
        } else {
            Err(Error::Usage("no file open"))
        }
    }

    /// Whether every byte of the source is buffered and the codec has been
    /// told no more input follows.
    #[must_use]
    pub fn is_fully_buffered(&self) -> bool {
        self.status.whole_file_buffered
    }

    /// Install a color management system, enabling ICC output-profile
    /// overrides.
    ///
    /// # Errors
    /// Propagated from the session.
    pub fn set_cms(&mut self, cms: S::Cms) -> Result<()> {
        self.session.set_cms(cms)?;
        self.status.have_cms = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // The event pump.
    // ------------------------------------------------------------------

    /// Drive the codec until a stop condition holds, applying each event's
    /// side effects exactly once.
    fn process_until(&mut self, stop: Stop) -> Result<Event> {
        self.ensure_open()?;
        loop {
            let event = self.session.process();
            match event {
                Event::Error => {
                    // Best-effort internal rewind so the decoder stays
                    // usable, then surface the failure.
                    let subbed = self.events_subbed;
                    let _ = self.rewind(subbed);
                    return Err(Error::CorruptedStream("codec reported an error"));
                }
                Event::Success => {
                    self.on_success();
                    return Ok(event);
                }
                Event::NeedMoreInput => {
                    self.refill()?;
                    continue;
                }
                Event::NeedImageOutBuffer => {
                    // The client did not request pixels for this frame.
                    self.session.skip_current_frame();
                    continue;
                }
                Event::BasicInfo => self.on_basic_info()?,
                Event::ColorEncoding => self.on_color()?,
                Event::Frame => self.on_frame()?,
                Event::Box => self.on_box()?,
                Event::JpegReconstruction => self.on_jpeg(),
                Event::FullImage | Event::BoxNeedMoreOutput | Event::JpegNeedMoreOutput => {}
            }

            if stop.events.contains(event) {
                return Ok(event);
            }
            let reached = match event {
                Event::Frame => stop.frame.is_some_and(|k| self.next_frame > k),
                Event::Box => stop.box_index.is_some_and(|k| self.next_box > k),
                Event::JpegReconstruction => stop.jpeg.is_some_and(|k| self.next_jpeg > k),
                _ => false,
            };
            if reached {
                return Ok(event);
            }
        }
    }

    fn on_success(&mut self) {
        if self.events_subbed.contains(Event::Frame) {
            self.status.seen_all_frames = true;
            if self.frame_records.len() < self.next_frame {
                self.frame_records.resize(self.next_frame, None);
            }
        }
        if self.events_subbed.contains(Event::Box) {
            self.status.seen_all_boxes = true;
        }
        if self.events_subbed.contains(Event::JpegReconstruction) {
            self.status.seen_all_jpeg = true;
        }
    }

    fn on_basic_info(&mut self) -> Result<()> {
        let info = self.session.basic_info()?;
        // Not re-subscribable without a rewind.
        self.events_subbed = self.events_subbed.without(Event::BasicInfo);

        let mut channels = Vec::with_capacity(info.num_extra_channels as usize);
        for index in 0..info.num_extra_channels {
            channels.push(self.session.extra_channel_info(index)?);
        }
        self.extra_channels = channels;
        self.basic_info = Some(info);
        self.status.got_basic_info = true;
        Ok(())
    }

    fn on_color(&mut self) -> Result<()> {
        self.events_subbed = self.events_subbed.without(Event::ColorEncoding);
        self.status.got_color = true;
        for target in [ColorProfileTarget::Original, ColorProfileTarget::Data] {
            let idx = target_index(target);
            if let Ok(Some(encoded)) = self.session.encoded_profile(target) {
                self.encoded_profiles[idx] = Some(encoded);
                match target {
                    ColorProfileTarget::Original => self.status.got_orig_color_enc = true,
                    ColorProfileTarget::Data => self.status.got_data_color_enc = true,
                }
            }
            if let Ok(size) = self.session.icc_profile_size(target) {
                if size > 0 {
                    if let Ok(icc) = self.session.icc_profile(target) {
                        self.icc_profiles[idx] = Some(icc);
                    }
                }
            }
        }
        Ok(())
    }

    fn on_frame(&mut self) -> Result<()> {
        let index = self.next_frame;
        let known = self
            .frame_records
            .get(index)
            .is_some_and(Option::is_some);
        if !known {
            let header = self.session.frame_header()?;
            let name = if header.name_length > 0 {
                Some(self.session.frame_name(header.name_length as usize)?)
            } else {
                None
            };
            let extra_channel_blend = if self.status.is_coalescing {
                None
            } else {
                let count = self
                    .basic_info
                    .as_ref()
                    .map_or(0, |info| info.num_extra_channels);
                let mut blends = Vec::with_capacity(count as usize);
                for channel in 0..count {
                    blends.push(self.session.extra_channel_blend_info(channel)?);
                }
                Some(blends)
            };
            let is_last = header.is_last;
            if self.frame_records.len() <= index {
                self.frame_records.resize(index + 1, None);
            }
            self.frame_records[index] = Some(FrameRecord {
                header,
                name,
                extra_channel_blend,
            });
            if self.status.is_coalescing && is_last {
                self.status.seen_all_frames = true;
            }
        }
        self.next_frame += 1;
        Ok(())
    }

    fn on_box(&mut self) -> Result<()> {
        let index = self.next_box;
        if index >= self.box_records.len() {
            let raw = self.session.box_type(false)?;
            let (box_type, compressed) = if raw == BoxType::BROB {
                (self.session.box_type(true)?, true)
            } else {
                (raw, false)
            };
            let size = self.session.box_size_contents()?;
            let (size, unbounded) = if size == 0 {
                // Distinguish an empty box from one that runs to EOF.
                (0, self.session.box_size_raw()? == 0)
            } else {
                (size, false)
            };
            self.box_records.push(BoxRecord {
                box_type,
                compressed,
                size,
                unbounded,
            });
        }
        self.next_box += 1;
        Ok(())
    }

    fn on_jpeg(&mut self) {
        self.next_jpeg += 1;
        if self.jpeg_count < self.next_jpeg {
            self.jpeg_count = self.next_jpeg;
        }
    }

    /// Refill the input window after the codec asked for more bytes.
    fn refill(&mut self) -> Result<()> {
        if self.input_closed {
            return Err(Error::CorruptedStream("input requested after close"));
        }
        let unconsumed = self.session.release_input();
        let buffer = self
            .buffer
            .as_mut()
            .ok_or(Error::Usage("no file open"))?;
        let source = self
            .source
            .as_mut()
            .ok_or(Error::CorruptedStream("input exhausted"))?;
        buffer.replenish(unconsumed, source)?;
        self.feed_window()
    }

    // ------------------------------------------------------------------
    // Rewind protocol.
    // ------------------------------------------------------------------

    /// Rewind the codec and replay the stream with a new subscription mask.
    ///
    /// Cached records, profiles and all `seen_*`/`got_*` bits survive; the
    /// `next_*` cursors restart at 0.
    fn rewind(&mut self, events: EventSet) -> Result<()> {
        tracing::debug!(?events, "rewinding decoder");
        self.session.rewind();
        self.session.subscribe(events)?;
        self.events_subbed = events;
        self.next_frame = 0;
        self.next_box = 0;
        self.next_jpeg = 0;
        self.input_closed = false;

        let buffer = self
            .buffer
            .as_mut()
            .ok_or(Error::Usage("no file open"))?;
        if buffer.rewind_buffered() {
            return self.feed_window();
        }
        let source = self.source.as_mut().ok_or(Error::NotSeekable)?;
        source.seek_to(self.anchor)?;
        buffer.reset();
        buffer.prime(source)?;
        self.feed_window()
    }

    /// Rewind when the current subscription lacks `wanted` events or the
    /// enumeration cursor has gone past `target`.
    fn reposition(&mut self, wanted: EventSet, passed: bool) -> Result<()> {
        let mut events = self.events_subbed;
        // One-shot events cannot be re-subscribed once delivered.
        let mut missing = EventSet::EMPTY;
        for event in [
            Event::Frame,
            Event::FullImage,
            Event::Box,
            Event::JpegReconstruction,
            Event::ColorEncoding,
            Event::BasicInfo,
        ] {
            if wanted.contains(event) && !events.contains(event) {
                let delivered = match event {
                    Event::BasicInfo => self.status.got_basic_info,
                    Event::ColorEncoding => self.status.got_color,
                    _ => false,
                };
                if !delivered {
                    missing |= event;
                }
            }
        }
        if passed || !missing.is_empty() {
            events = events | missing;
            self.rewind(events)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Basic info, extra channels, color.
    // ------------------------------------------------------------------

    /// Basic information about the image.
    ///
    /// # Errors
    /// [`Error::Io`], [`Error::CorruptedStream`], [`Error::Usage`].
    pub fn basic_info(&mut self) -> Result<&BasicInfo> {
        self.ensure_open()?;
        if self.basic_info.is_none() {
            self.reposition(EventSet::only(Event::BasicInfo), false)?;
            self.process_until(Stop::at(Event::BasicInfo))?;
        }
        self.basic_info
            .as_ref()
            .ok_or(Error::CorruptedStream("stream ended before basic info"))
    }

    /// Image width in pixels.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn xsize(&mut self) -> Result<u32> {
        Ok(self.basic_info()?.xsize)
    }

    /// Image height in pixels.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn ysize(&mut self) -> Result<u32> {
        Ok(self.basic_info()?.ysize)
    }

    /// Descriptions of all extra channels, in channel order.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn extra_channel_info(&mut self) -> Result<&[ExtraChannelInfo]> {
        self.basic_info()?;
        Ok(&self.extra_channels)
    }

    /// The pixel format the image itself suggests: the color channels plus
    /// alpha when present, in the narrowest data type covering the encoded
    /// bit depth.
    ///
    /// # Errors
    /// As [`Self::basic_info`]; [`Error::Usage`] for bit depths no supported
    /// data type covers.
    pub fn default_pixel_format(&mut self) -> Result<PixelFormat> {
        let info = self.basic_info()?;
        let num_channels = info.num_color_channels + u32::from(info.alpha_bits > 0);
        let data_type =
            PixelDataType::from_bit_depth(info.bits_per_sample, info.exponent_bits_per_sample)?;
        Ok(PixelFormat::new(num_channels, data_type))
    }

    fn ensure_color(&mut self) -> Result<()> {
        self.basic_info()?;
        if self.status.got_color {
            return Ok(());
        }
        self.reposition(EventSet::only(Event::ColorEncoding), false)?;
        self.process_until(Stop::at(Event::ColorEncoding))?;
        if self.status.got_color {
            Ok(())
        } else {
            Err(Error::CorruptedStream("stream ended before color encoding"))
        }
    }

    /// The ICC profile for `target`; empty when the codec cannot provide
    /// one.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn icc_profile(&mut self, target: ColorProfileTarget) -> Result<Vec<u8>> {
        self.ensure_color()?;
        Ok(self.icc_profiles[target_index(target)]
            .clone()
            .unwrap_or_default())
    }

    /// The encoded color profile for `target`, when the profile can be
    /// represented in structured form.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn encoded_color_profile(
        &mut self,
        target: ColorProfileTarget,
    ) -> Result<Option<EncodedProfile>> {
        self.ensure_color()?;
        Ok(self.encoded_profiles[target_index(target)].clone())
    }

    /// Override the output color profile with an encoded description or raw
    /// ICC bytes (exactly one of the two).
    ///
    /// Returns whether the codec accepted the override. The backing library
    /// rejects some combinations silently (notably on non-XYB images), which
    /// surfaces here as `Ok(false)`.
    ///
    /// # Errors
    /// [`Error::Usage`] when called after pixels were decoded, when both or
    /// neither representation is given, or for ICC without a CMS installed.
    pub fn set_preferred_output_profile(
        &mut self,
        encoded: Option<&EncodedProfile>,
        icc: Option<&[u8]>,
    ) -> Result<bool> {
        self.ensure_open()?;
        if encoded.is_some() == icc.is_some() {
            return Err(Error::Usage("exactly one profile representation required"));
        }
        if self.status.decoded_some_pixels {
            return Err(Error::Usage("output profile change after pixel decode"));
        }
        if icc.is_some() && !self.status.have_cms {
            return Err(Error::Usage("ICC output profile requires a CMS"));
        }
        self.ensure_color()?;

        let data = target_index(ColorProfileTarget::Data);
        self.encoded_profiles[data] = None;
        self.icc_profiles[data] = None;
        self.status.got_data_color_enc = false;

        if self
            .session
            .set_output_color_profile(encoded, icc)
            .is_err()
        {
            return Ok(false);
        }

        if let Ok(Some(enc)) = self.session.encoded_profile(ColorProfileTarget::Data) {
            self.encoded_profiles[data] = Some(enc);
            self.status.got_data_color_enc = true;
        }
        if let Ok(size) = self.session.icc_profile_size(ColorProfileTarget::Data) {
            if size > 0 {
                if let Ok(icc) = self.session.icc_profile(ColorProfileTarget::Data) {
                    self.icc_profiles[data] = Some(icc);
                }
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Frames.
    // ------------------------------------------------------------------

    /// Number of frames in the file.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn frame_count(&mut self) -> Result<usize> {
        self.basic_info()?;
        if !self.status.seen_all_frames {
            self.reposition(EventSet::only(Event::Frame), false)?;
            self.process_until(Stop::end())?;
            if !self.status.seen_all_frames {
                return Err(Error::CorruptedStream("frame enumeration incomplete"));
            }
        }
        Ok(self.frame_records.len())
    }

    /// Move the codec to the `Frame` event of frame `index`, using a bounded
    /// skip and rewinding when the cursor has already passed it.
    fn goto_frame(&mut self, index: usize, extra: EventSet) -> Result<()> {
        self.basic_info()?;
        if self.status.seen_all_frames && index >= self.frame_records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.frame_records.len(),
            });
        }
        let wanted = EventSet::only(Event::Frame) | extra;
        self.reposition(wanted, self.next_frame > index)?;
        if self.next_frame < index {
            // Skip only frames already enumerated; unknown frames are walked
            // one event at a time so their records land in the cache and the
            // frame count stays exact.
            let limit = if self.status.seen_all_frames {
                index
            } else {
                let mut limit = self.next_frame;
                while limit < index
                    && self
                        .frame_records
                        .get(limit)
                        .is_some_and(Option::is_some)
                {
                    limit += 1;
                }
                limit
            };
            let skip = limit - self.next_frame;
            if skip > 0 {
                self.session.skip_frames(skip);
                self.next_frame += skip;
            }
        }
        self.process_until(Stop::at_frame(index))?;
        if self.next_frame <= index {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.frame_records.len(),
            });
        }
        Ok(())
    }

    /// Header, name and blend info of frame `index`.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`], plus the conditions of
    /// [`Self::basic_info`].
    pub fn frame_info(&mut self, index: usize) -> Result<FrameRecord> {
        self.basic_info()?;
        if let Some(record) = self.frame_records.get(index).and_then(Option::as_ref) {
            return Ok(record.clone());
        }
        if self.status.seen_all_frames && index >= self.frame_records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.frame_records.len(),
            });
        }
        self.goto_frame(index, EventSet::EMPTY)?;
        self.frame_records
            .get(index)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(Error::CorruptedStream("frame record missing after seek"))
    }

    /// Forward iterator over all frames.
    pub fn frames(&mut self) -> FrameIterator<'_, 'src, S> {
        FrameIterator {
            decoder: self,
            index: 0,
        }
    }

    /// Decode the pixels of frame `index` into `buf`.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`], [`Error::BufferTooSmall`],
    /// [`Error::BufferTooLarge`], [`Error::CorruptedStream`].
    pub fn frame_pixels(
        &mut self,
        index: usize,
        format: &PixelFormat,
        buf: &mut Vec<u8>,
        max: usize,
    ) -> Result<()> {
        self.frame_pixels_with_extras(
            index,
            Some(PixelsRequest {
                format: *format,
                buf,
                max,
            }),
            &mut [],
        )
    }

    /// Decode the pixels and/or extra channels of frame `index`.
    ///
    /// When `main` is `None` and only extra channels are requested, a
    /// throwaway main buffer is still registered with the codec: the backing
    /// library emits nothing until an image output buffer is set.
    ///
    /// # Errors
    /// As [`Self::frame_pixels`]; [`Error::Usage`] for a malformed request.
    pub fn frame_pixels_with_extras(
        &mut self,
        index: usize,
        main: Option<PixelsRequest<'_>>,
        extras: &mut [ExtraChannelRequest<'_>],
    ) -> Result<()> {
        let info = self.basic_info()?.clone();
        if main.is_none() && extras.is_empty() {
            return Err(Error::Usage("no output requested"));
        }
        for request in extras.iter() {
            if request.index >= info.num_extra_channels {
                return Err(Error::IndexOutOfRange {
                    index: request.index as usize,
                    count: info.num_extra_channels as usize,
                });
            }
            if request.format.num_channels != 1 {
                return Err(Error::Usage("extra channel buffers are single-channel"));
            }
        }

        self.goto_frame(index, EventSet::only(Event::FullImage))?;

        // Non-coalesced layers have their own geometry, distinct from the
        // canvas.
        let record = self
            .frame_records
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(Error::CorruptedStream("frame record missing after seek"))?;
        let (xsize, ysize) = (
            record.header.layer_info.xsize,
            record.header.layer_info.ysize,
        );

        // Validate every size before moving any caller buffer in.
        let mut extra_sizes = Vec::with_capacity(extras.len());
        for request in extras.iter() {
            let needed = buffer_size(xsize, ysize, &request.format)?;
            if needed > request.max {
                return Err(Error::BufferTooSmall {
                    needed,
                    got: request.max,
                });
            }
            extra_sizes.push(needed);
        }
        if let Some(request) = &main {
            let needed = buffer_size(xsize, ysize, &request.format)?;
            if needed > request.max {
                return Err(Error::BufferTooSmall {
                    needed,
                    got: request.max,
                });
            }
        }

        for (request, needed) in extras.iter_mut().zip(&extra_sizes) {
            let mut out = std::mem::take(request.buf);
            out.resize(*needed, 0);
            self.session
                .set_extra_channel_out(request.index, &request.format, out)?;
        }

        let mut main = main;
        if let Some(request) = main.as_mut() {
            let needed = buffer_size(xsize, ysize, &request.format)?;
            let mut out = std::mem::take(request.buf);
            out.resize(needed, 0);
            self.session.set_image_out(&request.format, out)?;
        } else {
            // Throwaway main buffer; the codec emits nothing without one.
            let format = PixelFormat::new(info.num_color_channels, PixelDataType::Uint8);
            let needed = buffer_size(xsize, ysize, &format)?;
            self.session.set_image_out(&format, vec![0; needed])?;
        }

        self.status.decoded_some_pixels = true;

        let event = self.process_until(Stop::at(Event::FullImage))?;
        if event != Event::FullImage {
            return Err(Error::CorruptedStream("stream ended before frame pixels"));
        }

        for request in extras.iter_mut() {
            *request.buf = self
                .session
                .release_extra_channel_out(request.index)
                .ok_or(Error::CorruptedStream("extra channel buffer lost"))?;
        }
        match main {
            Some(request) => {
                *request.buf = self
                    .session
                    .release_image_out()
                    .ok_or(Error::CorruptedStream("image buffer lost"))?;
            }
            None => {
                // Discard the throwaway main buffer.
                let _ = self.session.release_image_out();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Boxes.
    // ------------------------------------------------------------------

    /// Number of metadata boxes in the container; 0 for a bare codestream.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn box_count(&mut self) -> Result<usize> {
        self.ensure_open()?;
        if !self.status.seen_all_boxes {
            self.reposition(EventSet::only(Event::Box), false)?;
            self.process_until(Stop::end())?;
            if !self.status.seen_all_boxes {
                return Err(Error::CorruptedStream("box enumeration incomplete"));
            }
        }
        Ok(self.box_records.len())
    }

    /// Move the codec to the `Box` event of box `index`.
    fn goto_box(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        if self.status.seen_all_boxes && index >= self.box_records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.box_records.len(),
            });
        }
        self.reposition(EventSet::only(Event::Box), self.next_box > index)?;
        self.process_until(Stop::at_box(index))?;
        if self.next_box <= index {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.box_records.len(),
            });
        }
        Ok(())
    }

    /// Type, size and compression flag of box `index`.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`], plus the conditions of
    /// [`Self::basic_info`].
    pub fn box_info(&mut self, index: usize) -> Result<BoxRecord> {
        self.ensure_open()?;
        if let Some(record) = self.box_records.get(index) {
            return Ok(record.clone());
        }
        if self.status.seen_all_boxes && index >= self.box_records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.box_records.len(),
            });
        }
        self.goto_box(index)?;
        self.box_records
            .get(index)
            .cloned()
            .ok_or(Error::CorruptedStream("box record missing after seek"))
    }

    /// Read the contents of box `index` into `sink`, up to `max` bytes.
    ///
    /// Returns whether the whole payload was read; exhausting `max` is not
    /// an error, the partial content is preserved in `sink`.
    ///
    /// # Errors
    /// [`Error::NoBrotli`] when `decompress` is requested for a compressed
    /// box without backend support; otherwise as [`Self::box_info`].
    pub fn box_content(
        &mut self,
        index: usize,
        sink: &mut Vec<u8>,
        max: usize,
        decompress: bool,
    ) -> Result<bool> {
        let record = self.box_info(index)?;
        if decompress && !self.session.has_brotli() {
            return Err(Error::NoBrotli);
        }
        sink.clear();
        if max == 0 {
            return Ok(record.size == 0 && !record.unbounded);
        }

        // The decompression mode applies to the content read that follows
        // the box event, so set it before repositioning.
        self.session.set_decompress_boxes(decompress)?;
        self.reposition(EventSet::only(Event::Box), true)?;
        self.process_until(Stop::at_box(index))?;

        let mut chunk = usize::try_from(record.size)
            .unwrap_or(usize::MAX)
            .clamp(1, input::DEFAULT_CHUNK)
            .min(max);
        let mut total = 0usize;
        self.session.set_box_out(vec![0; chunk])?;
        loop {
            let stop = Stop {
                events: EventSet::only(Event::BoxNeedMoreOutput) | Event::Box,
                ..Stop::default()
            };
            let event = self.process_until(stop)?;
            let (mut out, unwritten) = self.session.release_box_out();
            let written = out.len() - unwritten;
            out.truncate(written);
            total += written;
            sink.append(&mut out);
            match event {
                Event::BoxNeedMoreOutput => {
                    if total >= max {
                        return Ok(false);
                    }
                    chunk = (chunk * 2).min(max - total);
                    self.session.set_box_out(vec![0; chunk.max(1)])?;
                }
                // The next box event or end of stream closes this payload.
                _ => return Ok(true),
            }
        }
    }

    /// The codestream level from the `jxll` box, or -1 when absent.
    ///
    /// The lookup never considers boxes before index 2: the signature and
    /// file type boxes always come first.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn codestream_level(&mut self) -> Result<i32> {
        if let Some(level) = self.level {
            return Ok(level);
        }
        let have_container = self.basic_info()?.have_container;
        if !have_container {
            self.level = Some(-1);
            return Ok(-1);
        }
        let mut index = 2;
        let level = loop {
            match self.box_info(index) {
                Ok(record) if record.box_type == BoxType::JXLL => {
                    let mut payload = Vec::new();
                    self.box_content(index, &mut payload, 8, false)?;
                    break payload.first().map_or(-1, |&level| i32::from(level));
                }
                Ok(_) => index += 1,
                Err(Error::IndexOutOfRange { .. }) => break -1,
                Err(err) => return Err(err),
            }
        };
        self.level = Some(level);
        Ok(level)
    }

    // ------------------------------------------------------------------
    // JPEG reconstruction.
    // ------------------------------------------------------------------

    /// Whether the file carries JPEG reconstruction data.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn has_jpeg_reconstruction(&mut self) -> Result<bool> {
        self.basic_info()?;
        if self.jpeg_count > 0 || self.status.seen_all_jpeg {
            return Ok(self.jpeg_count > 0);
        }
        self.reposition(
            EventSet::only(Event::JpegReconstruction) | Event::FullImage,
            false,
        )?;
        self.process_until(Stop::at_jpeg(0))?;
        Ok(self.jpeg_count > 0)
    }

    /// Reconstruct the original JPEG into `sink`, up to `max` bytes.
    ///
    /// Returns whether the full JPEG was written; exhausting `max` is not an
    /// error. Returns `false` without touching `sink` when the file has no
    /// reconstruction data.
    ///
    /// # Errors
    /// As [`Self::basic_info`].
    pub fn reconstructed_jpeg(&mut self, sink: &mut Vec<u8>, max: usize) -> Result<bool> {
        if !self.has_jpeg_reconstruction()? {
            return Ok(false);
        }
        sink.clear();
        if max == 0 {
            return Ok(false);
        }

        self.reposition(
            EventSet::only(Event::JpegReconstruction) | Event::FullImage,
            self.next_jpeg > 0,
        )?;
        self.process_until(Stop::at_jpeg(0))?;

        let mut chunk = input::DEFAULT_CHUNK.min(max);
        let mut total = 0usize;
        self.session.set_jpeg_out(vec![0; chunk])?;
        loop {
            let stop = Stop {
                events: EventSet::only(Event::JpegNeedMoreOutput) | Event::FullImage,
                ..Stop::default()
            };
            let event = self.process_until(stop)?;
            let (mut out, unwritten) = self.session.release_jpeg_out();
            let written = out.len() - unwritten;
            out.truncate(written);
            total += written;
            sink.append(&mut out);
            match event {
                Event::JpegNeedMoreOutput => {
                    if total >= max {
                        return Ok(false);
                    }
                    chunk = (chunk * 2).min(max - total);
                    self.session.set_jpeg_out(vec![0; chunk.max(1)])?;
                }
                _ => return Ok(true),
            }
        }
    }
}

/// Forward iterator over the frames of a decoder.
///
/// Borrows the decoder mutably: enumeration fills the decoder's caches as it
/// goes, and the borrow rules out iterating a closed or reopened decoder.
pub struct FrameIterator<'a, 'src, S: CodecSession> {
    decoder: &'a mut Decoder<'src, S>,
    index: usize,
}

impl<S: CodecSession> Iterator for FrameIterator<'_, '_, S> {
    type Item = Result<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.frame_info(self.index) {
            Ok(record) => {
                self.index += 1;
                Some(Ok(record))
            }
            Err(Error::IndexOutOfRange { .. }) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn options_builder_defaults() {
        let options = options_builder().build().unwrap();
        assert!(!options.no_coalesce);
        assert!(!options.want_boxes);
        assert_eq!(options.buffer_kib, 0);

        let options = options_builder()
            .no_coalesce(true)
            .want_jpeg(true)
            .buffer_kib(128)
            .build()
            .unwrap();
        assert!(options.no_coalesce);
        assert!(options.want_jpeg);
        assert_eq!(options.buffer_kib, 128);
    }
}
