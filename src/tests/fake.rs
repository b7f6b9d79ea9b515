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

//! A scripted [`CodecSession`] over a declarative file description.
//!
//! The session consumes input windows byte-for-byte like the real codec and
//! then surfaces events in container order: boxes, basic info, color, JPEG
//! reconstruction, frames. Only subscribed events are visible; everything
//! else is skipped silently.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::color::EncodedProfile;
use crate::common::PixelFormat;
use crate::decode::{CodecSession, Event, EventSet};
use crate::errors::{Error, Result};
use crate::metadata::{
    BasicInfo, BlendInfo, BlendMode, BoxType, ColorProfileTarget, ExtraChannelInfo, FrameHeader,
    LayerInfo,
};
use crate::parallel::ParallelRunner;
use crate::utils::CONTAINER_MAGIC;

/// One frame of a [`FakeFile`].
#[derive(Clone, Default)]
pub(crate) struct FakeFrame {
    pub header: FrameHeader,
    pub name: Option<String>,
    /// Blend info per extra channel, served with coalescing disabled.
    pub ec_blend: Vec<BlendInfo>,
    /// Bytes written into the main image sink.
    pub pixels: Vec<u8>,
    /// Bytes written instead when unpremultiply-alpha is on.
    pub pixels_unpremultiplied: Option<Vec<u8>>,
    /// Bytes written into each extra channel sink.
    pub extra_planes: Vec<Vec<u8>>,
}

impl FakeFrame {
    /// A frame serving `pixels`, with layer geometry and name wired into the
    /// header.
    pub fn new(xsize: u32, ysize: u32, pixels: Vec<u8>) -> Self {
        FakeFrame {
            header: FrameHeader {
                layer_info: LayerInfo {
                    xsize,
                    ysize,
                    ..LayerInfo::default()
                },
                ..FrameHeader::default()
            },
            pixels,
            ..FakeFrame::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.header.name_length = u32::try_from(name.len()).unwrap();
        self.name = Some(name.to_owned());
        self
    }

    pub fn last(mut self) -> Self {
        self.header.is_last = true;
        self
    }
}

/// One container box of a [`FakeFile`].
#[derive(Clone)]
pub(crate) struct FakeBox {
    /// The decompressed inner type.
    pub box_type: BoxType,
    pub compressed: bool,
    /// Decompressed payload.
    pub content: Vec<u8>,
    /// Payload as stored; differs from `content` for compressed boxes.
    pub raw: Vec<u8>,
    pub unbounded: bool,
    /// A box whose header is too short to carry a type.
    pub malformed: bool,
}

impl FakeBox {
    pub fn plain(box_type: &[u8; 4], content: &[u8]) -> Self {
        FakeBox {
            box_type: BoxType(*box_type),
            compressed: false,
            content: content.to_vec(),
            raw: content.to_vec(),
            unbounded: false,
            malformed: false,
        }
    }

    pub fn truncated() -> Self {
        FakeBox {
            malformed: true,
            ..FakeBox::plain(b"\0\0\0\0", &[])
        }
    }

    /// A `brob`-wrapped box; `raw` stands in for the Brotli stream.
    pub fn compressed(box_type: &[u8; 4], content: &[u8], raw: &[u8]) -> Self {
        FakeBox {
            compressed: true,
            content: content.to_vec(),
            raw: raw.to_vec(),
            ..FakeBox::plain(box_type, content)
        }
    }

    pub fn unbounded(box_type: &[u8; 4], content: &[u8]) -> Self {
        FakeBox {
            unbounded: true,
            ..FakeBox::plain(box_type, content)
        }
    }
}

/// A declarative description of a JXL file for the scripted session.
#[derive(Clone, Default)]
pub(crate) struct FakeFile {
    /// Raw file bytes; only the signature prefix and the length matter.
    pub data: Vec<u8>,
    pub info: BasicInfo,
    pub extra: Vec<ExtraChannelInfo>,
    pub original_encoded: Option<EncodedProfile>,
    pub data_encoded: Option<EncodedProfile>,
    pub original_icc: Option<Vec<u8>>,
    pub data_icc: Option<Vec<u8>>,
    /// Whether an output-profile override is accepted. Mirrors the backing
    /// library's silent refusal on non-XYB images.
    pub accepts_profile_override: bool,
    pub brotli: bool,
    pub frames: Vec<FakeFrame>,
    pub boxes: Vec<FakeBox>,
    pub jpeg: Option<Vec<u8>>,
}

impl FakeFile {
    /// A container file of `len` bytes with the given canvas.
    pub fn container(len: usize, xsize: u32, ysize: u32) -> Self {
        let mut data = CONTAINER_MAGIC.to_vec();
        data.resize(len.max(CONTAINER_MAGIC.len()), 0xA5);
        FakeFile {
            data,
            info: BasicInfo {
                have_container: true,
                xsize,
                ysize,
                bits_per_sample: 8,
                num_color_channels: 3,
                intrinsic_xsize: xsize,
                intrinsic_ysize: ysize,
                ..BasicInfo::default()
            },
            original_encoded: Some(EncodedProfile::srgb(false)),
            data_encoded: Some(EncodedProfile::srgb(false)),
            brotli: true,
            ..FakeFile::default()
        }
    }

    /// A bare codestream file of `len` bytes.
    pub fn codestream(len: usize, xsize: u32, ysize: u32) -> Self {
        let mut file = Self::container(len, xsize, ysize);
        file.data = vec![0xFF, 0x0A];
        file.data.resize(len.max(2), 0xA5);
        file.info.have_container = false;
        file.boxes.clear();
        file
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Consume,
    Boxes(usize),
    BoxData(usize),
    Info,
    Color,
    Jpeg,
    JpegData,
    Frame(usize),
    Pixels(usize),
    End,
}

/// Scripted codec session over a [`FakeFile`].
#[allow(dead_code)]
pub(crate) struct FakeSession {
    file: Arc<FakeFile>,

    subscribed: EventSet,
    coalescing: bool,
    keep_orientation: bool,
    unpremultiply: bool,
    decompress_boxes: bool,
    runner: Option<Arc<dyn ParallelRunner>>,
    cms_installed: bool,
    data_override: Option<EncodedProfile>,

    window_len: usize,
    window_consumed: usize,
    bytes_seen: usize,
    closed: bool,

    stage: Stage,
    got_info: bool,
    current_box: Option<usize>,
    current_frame: Option<usize>,
    pending_skip: usize,
    skip_pixels: bool,

    image_out: Option<(PixelFormat, Vec<u8>)>,
    extra_out: BTreeMap<u32, Vec<u8>>,
    box_out: Option<(Vec<u8>, usize)>,
    box_served: usize,
    jpeg_out: Option<(Vec<u8>, usize)>,
    jpeg_served: usize,

    /// Observability for tests.
    pub rewinds: usize,
}

impl Default for FakeSession {
    fn default() -> Self {
        FakeSession::new(Arc::new(FakeFile::default()))
    }
}

impl FakeSession {
    pub fn new(file: Arc<FakeFile>) -> Self {
        FakeSession {
            file,
            subscribed: EventSet::EMPTY,
            coalescing: true,
            keep_orientation: false,
            unpremultiply: false,
            decompress_boxes: false,
            runner: None,
            cms_installed: false,
            data_override: None,
            window_len: 0,
            window_consumed: 0,
            bytes_seen: 0,
            closed: false,
            stage: Stage::Consume,
            got_info: false,
            current_box: None,
            current_frame: None,
            pending_skip: 0,
            skip_pixels: false,
            image_out: None,
            extra_out: BTreeMap::new(),
            box_out: None,
            box_served: 0,
            jpeg_out: None,
            jpeg_served: 0,
            rewinds: 0,
        }
    }

    fn current_box(&self) -> Result<&FakeBox> {
        self.current_box
            .and_then(|index| self.file.boxes.get(index))
            .ok_or(Error::CorruptedStream("no current box"))
    }

    fn current_frame(&self) -> Result<&FakeFrame> {
        self.current_frame
            .and_then(|index| self.file.frames.get(index))
            .ok_or(Error::CorruptedStream("no current frame"))
    }

    fn box_payload(&self, b: &FakeBox) -> Vec<u8> {
        if b.compressed && !self.decompress_boxes {
            b.raw.clone()
        } else {
            b.content.clone()
        }
    }

    /// Advance the machine one tick; `Some` is an event to surface.
    fn step(&mut self) -> Option<Event> {
        match self.stage {
            Stage::Consume => {
                let total = self.file.data.len();
                if self.bytes_seen < total {
                    let available = self.window_len - self.window_consumed;
                    let take = available.min(total - self.bytes_seen);
                    self.window_consumed += take;
                    self.bytes_seen += take;
                    if self.bytes_seen < total {
                        return Some(if self.closed && take == 0 {
                            Event::Error
                        } else {
                            Event::NeedMoreInput
                        });
                    }
                }
                self.stage = if self.file.boxes.is_empty() {
                    Stage::Info
                } else {
                    Stage::Boxes(0)
                };
                None
            }
            Stage::Boxes(index) => {
                if index >= self.file.boxes.len() {
                    self.stage = Stage::Info;
                    return None;
                }
                self.current_box = Some(index);
                self.box_served = 0;
                self.stage = Stage::BoxData(index);
                self.subscribed.contains(Event::Box).then_some(Event::Box)
            }
            Stage::BoxData(index) => {
                let payload = {
                    let b = &self.file.boxes[index];
                    self.box_payload(b)
                };
                if let Some((sink, used)) = &mut self.box_out {
                    let remaining = &payload[self.box_served..];
                    let room = sink.len() - *used;
                    let take = room.min(remaining.len());
                    sink[*used..*used + take].copy_from_slice(&remaining[..take]);
                    *used += take;
                    self.box_served += take;
                    if self.box_served < payload.len() {
                        return Some(Event::BoxNeedMoreOutput);
                    }
                }
                self.stage = Stage::Boxes(index + 1);
                None
            }
            Stage::Info => {
                self.got_info = true;
                self.stage = Stage::Color;
                self.subscribed
                    .contains(Event::BasicInfo)
                    .then_some(Event::BasicInfo)
            }
            Stage::Color => {
                self.stage = if self.file.jpeg.is_some() {
                    Stage::Jpeg
                } else {
                    Stage::Frame(0)
                };
                self.subscribed
                    .contains(Event::ColorEncoding)
                    .then_some(Event::ColorEncoding)
            }
            Stage::Jpeg => {
                self.jpeg_served = 0;
                self.stage = Stage::JpegData;
                self.subscribed
                    .contains(Event::JpegReconstruction)
                    .then_some(Event::JpegReconstruction)
            }
            Stage::JpegData => {
                let payload = self.file.jpeg.clone().unwrap_or_default();
                if let Some((sink, used)) = &mut self.jpeg_out {
                    let remaining = &payload[self.jpeg_served..];
                    let room = sink.len() - *used;
                    let take = room.min(remaining.len());
                    sink[*used..*used + take].copy_from_slice(&remaining[..take]);
                    *used += take;
                    self.jpeg_served += take;
                    if self.jpeg_served < payload.len() {
                        return Some(Event::JpegNeedMoreOutput);
                    }
                }
                self.stage = Stage::Frame(0);
                None
            }
            Stage::Frame(mut index) => {
                if self.pending_skip > 0 {
                    index += self.pending_skip;
                    self.pending_skip = 0;
                }
                if index >= self.file.frames.len() {
                    self.stage = Stage::End;
                    return None;
                }
                self.current_frame = Some(index);
                self.skip_pixels = false;
                self.stage = Stage::Pixels(index);
                self.subscribed
                    .contains(Event::Frame)
                    .then_some(Event::Frame)
            }
            Stage::Pixels(index) => {
                if self.skip_pixels {
                    self.stage = Stage::Frame(index + 1);
                    return None;
                }
                if self.image_out.is_some() {
                    self.write_pixels(index);
                    self.stage = Stage::Frame(index + 1);
                    return self
                        .subscribed
                        .contains(Event::FullImage)
                        .then_some(Event::FullImage);
                }
                if self.subscribed.contains(Event::FullImage) {
                    // Pixels wanted in principle, but no buffer was set.
                    return Some(Event::NeedImageOutBuffer);
                }
                self.stage = Stage::Frame(index + 1);
                None
            }
            Stage::End => Some(Event::Success),
        }
    }

    fn write_pixels(&mut self, index: usize) {
        let frame = &self.file.frames[index];
        let source = if self.unpremultiply {
            frame
                .pixels_unpremultiplied
                .as_ref()
                .unwrap_or(&frame.pixels)
        } else {
            &frame.pixels
        };
        if let Some((_, sink)) = &mut self.image_out {
            let take = sink.len().min(source.len());
            sink[..take].copy_from_slice(&source[..take]);
        }
        for (&channel, sink) in &mut self.extra_out {
            if let Some(plane) = frame.extra_planes.get(channel as usize) {
                let take = sink.len().min(plane.len());
                sink[..take].copy_from_slice(&plane[..take]);
            }
        }
    }
}

impl CodecSession for FakeSession {
    type Cms = ();

    fn subscribe(&mut self, events: EventSet) -> Result<()> {
        self.subscribed = events;
        Ok(())
    }

    fn set_parallel_runner(&mut self, runner: Arc<dyn ParallelRunner>) -> Result<()> {
        self.runner = Some(runner);
        Ok(())
    }

    fn set_cms(&mut self, _cms: ()) -> Result<()> {
        self.cms_installed = true;
        Ok(())
    }

    fn set_coalescing(&mut self, coalescing: bool) -> Result<()> {
        self.coalescing = coalescing;
        Ok(())
    }

    fn set_keep_orientation(&mut self, keep: bool) -> Result<()> {
        self.keep_orientation = keep;
        Ok(())
    }

    fn set_unpremultiply_alpha(&mut self, unpremultiply: bool) -> Result<()> {
        self.unpremultiply = unpremultiply;
        Ok(())
    }

    fn set_decompress_boxes(&mut self, decompress: bool) -> Result<()> {
        if decompress && !self.file.brotli {
            return Err(Error::NoBrotli);
        }
        self.decompress_boxes = decompress;
        Ok(())
    }

    fn has_brotli(&self) -> bool {
        self.file.brotli
    }

    fn set_input(&mut self, data: &[u8]) -> Result<()> {
        self.window_len = data.len();
        self.window_consumed = 0;
        Ok(())
    }

    fn close_input(&mut self) {
        self.closed = true;
    }

    fn release_input(&mut self) -> usize {
        let unconsumed = self.window_len - self.window_consumed;
        self.window_len = 0;
        self.window_consumed = 0;
        unconsumed
    }

    fn process(&mut self) -> Event {
        loop {
            if let Some(event) = self.step() {
                return event;
            }
        }
    }

    fn basic_info(&self) -> Result<BasicInfo> {
        if self.got_info {
            Ok(self.file.info.clone())
        } else {
            Err(Error::CorruptedStream("basic info not reached"))
        }
    }

    fn frame_header(&self) -> Result<FrameHeader> {
        let frame = self.current_frame()?;
        let mut header = frame.header.clone();
        if self.coalescing {
            // Coalesced frames are canvas-sized and replace-blended.
            header.layer_info = LayerInfo {
                have_crop: false,
                crop_x0: 0,
                crop_y0: 0,
                xsize: self.file.info.xsize,
                ysize: self.file.info.ysize,
                blend_info: BlendInfo {
                    blend_mode: BlendMode::Replace,
                    ..header.layer_info.blend_info
                },
                save_as_reference: header.layer_info.save_as_reference,
            };
        }
        Ok(header)
    }

    fn frame_name(&self, len: usize) -> Result<String> {
        let frame = self.current_frame()?;
        let name = frame.name.clone().unwrap_or_default();
        if name.len() != len {
            return Err(Error::CorruptedStream("frame name length mismatch"));
        }
        Ok(name)
    }

    fn extra_channel_info(&self, index: u32) -> Result<ExtraChannelInfo> {
        self.file
            .extra
            .get(index as usize)
            .cloned()
            .ok_or(Error::CorruptedStream("extra channel index out of range"))
    }

    fn extra_channel_name(&self, index: u32, len: usize) -> Result<String> {
        let info = self
            .file
            .extra
            .get(index as usize)
            .ok_or(Error::CorruptedStream("extra channel index out of range"))?;
        let name = info.name.clone().unwrap_or_default();
        if name.len() != len {
            return Err(Error::CorruptedStream("extra channel name length mismatch"));
        }
        Ok(name)
    }

    fn extra_channel_blend_info(&self, index: u32) -> Result<BlendInfo> {
        if self.coalescing {
            return Err(Error::CorruptedStream(
                "extra channel blend info requires no-coalesce",
            ));
        }
        let frame = self.current_frame()?;
        frame
            .ec_blend
            .get(index as usize)
            .cloned()
            .ok_or(Error::CorruptedStream("extra channel index out of range"))
    }

    fn box_type(&self, decompressed: bool) -> Result<BoxType> {
        let b = self.current_box()?;
        if b.malformed {
            return Err(Error::CorruptedStream("box smaller than its header"));
        }
        if b.compressed && !decompressed {
            Ok(BoxType::BROB)
        } else {
            Ok(b.box_type)
        }
    }

    fn box_size_raw(&self) -> Result<u64> {
        let b = self.current_box()?;
        if b.unbounded {
            Ok(0)
        } else {
            Ok(b.raw.len() as u64 + 8)
        }
    }

    fn box_size_contents(&self) -> Result<u64> {
        let b = self.current_box()?;
        if b.unbounded {
            Ok(0)
        } else {
            Ok(b.raw.len() as u64)
        }
    }

    fn encoded_profile(&self, target: ColorProfileTarget) -> Result<Option<EncodedProfile>> {
        Ok(match target {
            ColorProfileTarget::Original => self.file.original_encoded.clone(),
            ColorProfileTarget::Data => self
                .data_override
                .clone()
                .or_else(|| self.file.data_encoded.clone()),
        })
    }

    fn icc_profile_size(&self, target: ColorProfileTarget) -> Result<usize> {
        Ok(match target {
            ColorProfileTarget::Original => {
                self.file.original_icc.as_ref().map_or(0, Vec::len)
            }
            ColorProfileTarget::Data => self.file.data_icc.as_ref().map_or(0, Vec::len),
        })
    }

    fn icc_profile(&self, target: ColorProfileTarget) -> Result<Vec<u8>> {
        let icc = match target {
            ColorProfileTarget::Original => self.file.original_icc.clone(),
            ColorProfileTarget::Data => self.file.data_icc.clone(),
        };
        icc.ok_or(Error::CorruptedStream("no ICC profile"))
    }

    fn set_output_color_profile(
        &mut self,
        encoded: Option<&EncodedProfile>,
        _icc: Option<&[u8]>,
    ) -> Result<()> {
        if !self.file.accepts_profile_override {
            // The backing library fails this silently on non-XYB images.
            return Err(Error::CorruptedStream("profile override refused"));
        }
        if let Some(profile) = encoded {
            self.data_override = Some(profile.clone());
        }
        Ok(())
    }

    fn set_image_out(&mut self, format: &PixelFormat, buf: Vec<u8>) -> Result<()> {
        self.image_out = Some((*format, buf));
        Ok(())
    }

    fn release_image_out(&mut self) -> Option<Vec<u8>> {
        self.image_out.take().map(|(_, buf)| buf)
    }

    fn set_extra_channel_out(
        &mut self,
        index: u32,
        _format: &PixelFormat,
        buf: Vec<u8>,
    ) -> Result<()> {
        self.extra_out.insert(index, buf);
        Ok(())
    }

    fn release_extra_channel_out(&mut self, index: u32) -> Option<Vec<u8>> {
        self.extra_out.remove(&index)
    }

    fn set_box_out(&mut self, buf: Vec<u8>) -> Result<()> {
        self.box_out = Some((buf, 0));
        Ok(())
    }

    fn release_box_out(&mut self) -> (Vec<u8>, usize) {
        match self.box_out.take() {
            Some((buf, used)) => {
                let unwritten = buf.len() - used;
                (buf, unwritten)
            }
            None => (Vec::new(), 0),
        }
    }

    fn set_jpeg_out(&mut self, buf: Vec<u8>) -> Result<()> {
        self.jpeg_out = Some((buf, 0));
        Ok(())
    }

    fn release_jpeg_out(&mut self) -> (Vec<u8>, usize) {
        match self.jpeg_out.take() {
            Some((buf, used)) => {
                let unwritten = buf.len() - used;
                (buf, unwritten)
            }
            None => (Vec::new(), 0),
        }
    }

    fn rewind(&mut self) {
        self.rewinds += 1;
        self.subscribed = EventSet::EMPTY;
        self.window_len = 0;
        self.window_consumed = 0;
        self.bytes_seen = 0;
        self.closed = false;
        self.stage = Stage::Consume;
        self.current_box = None;
        self.current_frame = None;
        self.pending_skip = 0;
        self.skip_pixels = false;
        self.image_out = None;
        self.extra_out.clear();
        self.box_out = None;
        self.box_served = 0;
        self.jpeg_out = None;
        self.jpeg_served = 0;
    }

    fn skip_frames(&mut self, n: usize) {
        self.pending_skip += n;
    }

    fn skip_current_frame(&mut self) {
        self.skip_pixels = true;
    }
}
