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

//! Lazily materialised pixel buffers.
//!
//! A [`Pixmap`] captures the intent "these pixels exist, possibly not yet
//! decoded": it is backed by an in-memory buffer, an owned [`Decoder`], or a
//! file path that turns into a decoder on first access.

use std::path::PathBuf;

use byteorder::{ByteOrder, NativeEndian, BE, LE};
use half::f16;

use crate::common::{buffer_size, row_stride, Endianness, PixelDataType, PixelFormat};
use crate::decode::{CodecSession, Decoder, DecoderOptions};
use crate::errors::{Error, Result};

enum Backing<S: CodecSession> {
    /// Pixels only; the source is gone.
    None,
    /// A file that will be opened on first access.
    Path {
        path: PathBuf,
        options: DecoderOptions,
    },
    /// An open decoder.
    Decoder(Box<Decoder<'static, S>>),
}

/// Write one maximal ("fully opaque") alpha sample.
fn opaque_sample(data_type: PixelDataType, endianness: Endianness, out: &mut [u8]) {
    match data_type {
        PixelDataType::Uint8 => out[0] = u8::MAX,
        PixelDataType::Uint16 => write_u16(out, u16::MAX, endianness),
        PixelDataType::Float16 => write_u16(out, f16::ONE.to_bits(), endianness),
        PixelDataType::Float => match endianness {
            Endianness::Native => NativeEndian::write_f32(out, 1.0),
            Endianness::Little => LE::write_f32(out, 1.0),
            Endianness::Big => BE::write_f32(out, 1.0),
        },
    }
}

fn write_u16(out: &mut [u8], value: u16, endianness: Endianness) {
    match endianness {
        Endianness::Native => NativeEndian::write_u16(out, value),
        Endianness::Little => LE::write_u16(out, value),
        Endianness::Big => BE::write_u16(out, value),
    }
}

/// A lazy pixel holder with uniform access to file-, decoder- and
/// memory-backed pixels.
pub struct Pixmap<S: CodecSession> {
    backing: Backing<S>,
    frame: usize,
    format: PixelFormat,
    buffer: Option<Vec<u8>>,
    xsize: Option<u32>,
    ysize: Option<u32>,
}

impl<S: CodecSession + Default> Pixmap<S> {
    /// A pixmap over an in-memory buffer.
    pub fn from_buffer(buffer: Vec<u8>, xsize: u32, ysize: u32, format: PixelFormat) -> Self {
        Self {
            backing: Backing::None,
            frame: 0,
            format,
            buffer: Some(buffer),
            xsize: Some(xsize),
            ysize: Some(ysize),
        }
    }

    /// A pixmap over frame `frame` of an open decoder.
    pub fn from_decoder(decoder: Decoder<'static, S>, frame: usize, format: PixelFormat) -> Self {
        Self {
            backing: Backing::Decoder(Box::new(decoder)),
            frame,
            format,
            buffer: None,
            xsize: None,
            ysize: None,
        }
    }

    /// A pixmap over frame `frame` of a file; the decoder is created on
    /// first access.
    pub fn from_path(
        path: impl Into<PathBuf>,
        frame: usize,
        format: PixelFormat,
        options: DecoderOptions,
    ) -> Self {
        Self {
            backing: Backing::Path {
                path: path.into(),
                options,
            },
            frame,
            format,
            buffer: None,
            xsize: None,
            ysize: None,
        }
    }

    /// The target pixel format.
    #[must_use]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    fn decoder(&mut self) -> Result<&mut Decoder<'static, S>> {
        if let Backing::Path { path, options } = &self.backing {
            let mut decoder = Decoder::new(S::default(), options.clone());
            decoder.open_file(path)?;
            self.backing = Backing::Decoder(Box::new(decoder));
        }
        match &mut self.backing {
            Backing::Decoder(decoder) => Ok(decoder),
            _ => Err(Error::Usage("pixmap has no decoder")),
        }
    }

    /// Resolve the frame geometry. For non-coalesced layers this differs
    /// from the canvas size, so the frame header is authoritative.
    fn dimensions(&mut self) -> Result<(u32, u32)> {
        if let (Some(xsize), Some(ysize)) = (self.xsize, self.ysize) {
            return Ok((xsize, ysize));
        }
        let frame = self.frame;
        let record = self.decoder()?.frame_info(frame)?;
        let (xsize, ysize) = (
            record.header.layer_info.xsize,
            record.header.layer_info.ysize,
        );
        self.xsize = Some(xsize);
        self.ysize = Some(ysize);
        Ok((xsize, ysize))
    }

    /// Frame width in pixels.
    ///
    /// # Errors
    /// Decoding errors when the geometry is not yet known.
    pub fn width(&mut self) -> Result<u32> {
        Ok(self.dimensions()?.0)
    }

    /// Frame height in pixels.
    ///
    /// # Errors
    /// Decoding errors when the geometry is not yet known.
    pub fn height(&mut self) -> Result<u32> {
        Ok(self.dimensions()?.1)
    }

    /// Whether the pixels are materialised in memory.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        self.buffer.is_some()
    }

    /// Decode the pixels into memory if they are not there yet.
    ///
    /// # Errors
    /// Decoding errors from the backing decoder.
    pub fn ensure_buffered(&mut self) -> Result<()> {
        if self.buffer.is_some() {
            return Ok(());
        }
        let (xsize, ysize) = self.dimensions()?;
        let format = self.format;
        let needed = buffer_size(xsize, ysize, &format)?;
        let frame = self.frame;
        let mut buffer = Vec::new();
        self.decoder()?
            .frame_pixels(frame, &format, &mut buffer, needed)?;
        self.buffer = Some(buffer);
        Ok(())
    }

    /// The materialised pixels.
    ///
    /// # Errors
    /// As [`Self::ensure_buffered`].
    pub fn pixels(&mut self) -> Result<&[u8]> {
        self.ensure_buffered()?;
        self.buffer
            .as_deref()
            .ok_or(Error::Usage("pixmap has no pixels"))
    }

    /// Basic info of the backing file, when there is one.
    ///
    /// # Errors
    /// Decoding errors from the backing decoder.
    pub fn source_info(&mut self) -> Result<Option<crate::metadata::BasicInfo>> {
        if matches!(self.backing, Backing::None) {
            return Ok(None);
        }
        Ok(Some(self.decoder()?.basic_info()?.clone()))
    }

    /// The original color profile of the backing file, when there is one.
    /// Empty for memory-backed pixmaps.
    ///
    /// # Errors
    /// Decoding errors from the backing decoder.
    pub fn source_color_profile(&mut self) -> Result<crate::color::ColorProfile> {
        if matches!(self.backing, Backing::None) {
            return Ok(crate::color::ColorProfile::default());
        }
        let decoder = self.decoder()?;
        let target = crate::metadata::ColorProfileTarget::Original;
        let encoded = decoder.encoded_color_profile(target)?;
        let icc = decoder.icc_profile(target)?;
        Ok(crate::color::ColorProfile {
            encoded,
            icc: if icc.is_empty() { None } else { Some(icc) },
        })
    }

    /// Give up the owned decoder, if any, so its other content (boxes,
    /// profiles) can still be read by the caller.
    ///
    /// A path-backed pixmap is materialised first so there is a decoder to
    /// hand over.
    ///
    /// # Errors
    /// Open errors when a path-backed decoder has to be created.
    pub fn release_decoder(&mut self) -> Result<Option<Decoder<'static, S>>> {
        if matches!(self.backing, Backing::Path { .. }) {
            self.decoder()?;
        }
        match std::mem::replace(&mut self.backing, Backing::None) {
            Backing::Decoder(decoder) => Ok(Some(*decoder)),
            _ => Ok(None),
        }
    }

    /// Whether the format carries an interleaved alpha channel.
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        matches!(self.format.num_channels, 2 | 4)
    }

    /// Append a fully opaque interleaved alpha channel.
    ///
    /// Before buffering this only widens the intended channel count; after
    /// buffering the buffer is rebuilt with an opaque trailing channel
    /// spliced into each pixel, respecting row alignment. A format that
    /// already has alpha is left alone.
    ///
    /// # Errors
    /// [`Error::BufferTooLarge`] on size arithmetic overflow.
    pub fn add_interleaved_alpha(&mut self) -> Result<()> {
        if self.has_alpha() {
            return Ok(());
        }
        let old_format = self.format;
        let new_format = PixelFormat {
            num_channels: old_format.num_channels + 1,
            ..old_format
        };
        self.format = new_format;
        let Some(old) = self.buffer.take() else {
            return Ok(());
        };

        let (xsize, ysize) = self.dimensions()?;
        let bps = old_format.data_type.bytes_per_sample();
        let old_stride = row_stride(xsize, &old_format)?;
        let new_stride = row_stride(xsize, &new_format)?;
        let old_pixel = old_format.num_channels as usize * bps;
        let new_pixel = new_format.num_channels as usize * bps;

        let mut new = vec![0u8; buffer_size(xsize, ysize, &new_format)?];
        let mut opaque = [0u8; 4];
        opaque_sample(new_format.data_type, new_format.endianness, &mut opaque);

        for row in 0..ysize as usize {
            for x in 0..xsize as usize {
                let src = row * old_stride + x * old_pixel;
                let dst = row * new_stride + x * new_pixel;
                new[dst..dst + old_pixel].copy_from_slice(&old[src..src + old_pixel]);
                new[dst + old_pixel..dst + new_pixel].copy_from_slice(&opaque[..bps]);
            }
        }
        self.buffer = Some(new);
        Ok(())
    }

    /// Remove the interleaved alpha channel, keeping the color channels.
    ///
    /// The inverse of [`Self::add_interleaved_alpha`]; a no-op for formats
    /// without alpha.
    ///
    /// # Errors
    /// [`Error::BufferTooLarge`] on size arithmetic overflow.
    pub fn drop_interleaved_alpha(&mut self) -> Result<()> {
        if !self.has_alpha() {
            return Ok(());
        }
        let old_format = self.format;
        let new_format = PixelFormat {
            num_channels: old_format.num_channels - 1,
            ..old_format
        };
        self.format = new_format;
        let Some(old) = self.buffer.take() else {
            return Ok(());
        };

        let (xsize, ysize) = self.dimensions()?;
        let bps = old_format.data_type.bytes_per_sample();
        let old_stride = row_stride(xsize, &old_format)?;
        let new_stride = row_stride(xsize, &new_format)?;
        let old_pixel = old_format.num_channels as usize * bps;
        let new_pixel = new_format.num_channels as usize * bps;

        let mut new = vec![0u8; buffer_size(xsize, ysize, &new_format)?];
        for row in 0..ysize as usize {
            for x in 0..xsize as usize {
                let src = row * old_stride + x * old_pixel;
                let dst = row * new_stride + x * new_pixel;
                new[dst..dst + new_pixel].copy_from_slice(&old[src..src + new_pixel]);
            }
        }
        self.buffer = Some(new);
        Ok(())
    }

    /// Whether every alpha sample is maximal. Trivially true for 1- and
    /// 3-channel formats.
    ///
    /// # Errors
    /// As [`Self::ensure_buffered`].
    pub fn is_fully_opaque(&mut self) -> Result<bool> {
        if !self.has_alpha() {
            return Ok(true);
        }
        self.ensure_buffered()?;
        let (xsize, ysize) = self.dimensions()?;
        let format = self.format;
        let bps = format.data_type.bytes_per_sample();
        let stride = row_stride(xsize, &format)?;
        let pixel = format.num_channels as usize * bps;
        let alpha_offset = pixel - bps;

        let mut opaque = [0u8; 4];
        opaque_sample(format.data_type, format.endianness, &mut opaque);
        let buffer = self
            .buffer
            .as_deref()
            .ok_or(Error::Usage("pixmap has no pixels"))?;

        for row in 0..ysize as usize {
            for x in 0..xsize as usize {
                let at = row * stride + x * pixel + alpha_offset;
                if buffer[at..at + bps] != opaque[..bps] {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
