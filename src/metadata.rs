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

//! Metadata records surfaced from the JPEG XL codestream headers: basic
//! info, frame headers, extra channel descriptions and container boxes.

use std::fmt;

/// Image orientation metadata.
///
/// Values 1..8 match the EXIF definitions. The name indicates the operation
/// to perform to transform from the encoded image to the display image.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum Orientation {
    /// No transformation.
    #[default]
    Identity = 1,
    /// Mirror across the vertical axis.
    FlipHorizontal = 2,
    /// Rotate by 180 degrees.
    Rotate180 = 3,
    /// Mirror across the horizontal axis.
    FlipVertical = 4,
    /// Mirror across the top-left to bottom-right diagonal.
    Transpose = 5,
    /// Rotate clockwise by 90 degrees.
    Rotate90Cw = 6,
    /// Mirror across the bottom-left to top-right diagonal.
    AntiTranspose = 7,
    /// Rotate counter-clockwise by 90 degrees.
    Rotate90Ccw = 8,
}

/// Given type of an extra channel.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ExtraChannelType {
    /// Transparency.
    Alpha,
    /// Distance field.
    Depth,
    /// Additional color information, e.g. a printing ink.
    SpotColor,
    /// Region mask.
    SelectionMask,
    /// CMYK black channel.
    Black,
    /// Color filter array sample.
    Cfa,
    /// Thermal imaging data.
    Thermal,
    /// Reserved for future use.
    Reserved0,
    /// Reserved for future use.
    Reserved1,
    /// Reserved for future use.
    Reserved2,
    /// Reserved for future use.
    Reserved3,
    /// Reserved for future use.
    Reserved4,
    /// Reserved for future use.
    Reserved5,
    /// Reserved for future use.
    Reserved6,
    /// Reserved for future use.
    Reserved7,
    /// None of the other table entries describe the channel.
    Unknown,
    /// Application-defined optional data.
    Optional,
}

/// The codestream animation header; if present it applies to all animation
/// frames, unlike [`FrameHeader`] which applies to an individual frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationHeader {
    /// Numerator of ticks per second of a single animation frame time unit.
    pub tps_numerator: u32,
    /// Denominator of ticks per second of a single animation frame time unit.
    pub tps_denominator: u32,
    /// Amount of animation loops, or 0 to repeat infinitely.
    pub num_loops: u32,
    /// Whether animation time codes are present at animation frames.
    pub have_timecodes: bool,
}

/// Basic image information, available from the file signature and the first
/// part of the codestream header. Populated exactly once per open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicInfo {
    /// Whether the codestream is embedded in the container format. If true,
    /// metadata boxes may be available in addition to the codestream.
    pub have_container: bool,
    /// Width of the image in pixels, before applying orientation.
    pub xsize: u32,
    /// Height of the image in pixels, before applying orientation.
    pub ysize: u32,
    /// Original image color channel bit depth.
    pub bits_per_sample: u32,
    /// Original image color channel floating point exponent bits, or 0 if
    /// samples are unsigned integers.
    pub exponent_bits_per_sample: u32,
    /// Whether the codestream keeps the original color profile rather than
    /// an internally supported absolute color space.
    pub uses_original_profile: bool,
    /// Indicates animation frames exist in the codestream.
    pub have_animation: bool,
    /// Image orientation.
    pub orientation: Orientation,
    /// Number of color channels encoded in the image: 1 for grayscale, 3 for
    /// color. Does not include alpha or other extra channels.
    pub num_color_channels: u32,
    /// Number of additional image channels, including the main alpha channel.
    pub num_extra_channels: u32,
    /// Bit depth of the encoded alpha channel, or 0 if there is none.
    pub alpha_bits: u32,
    /// Alpha channel floating point exponent bits, or 0 if unsigned.
    pub alpha_exponent_bits: u32,
    /// Whether the alpha channel is premultiplied.
    pub alpha_premultiplied: bool,
    /// Global animation properties, only meaningful if
    /// [`Self::have_animation`] is set.
    pub animation: AnimationHeader,
    /// Intrinsic width: the recommended display width, which can differ from
    /// [`Self::xsize`].
    pub intrinsic_xsize: u32,
    /// Intrinsic height: the recommended display height.
    pub intrinsic_ysize: u32,
}

/// Information for a single extra channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraChannelInfo {
    /// Given type of the channel.
    pub channel_type: ExtraChannelType,
    /// Total bits per sample for this channel.
    pub bits_per_sample: u32,
    /// Floating point exponent bits, or 0 for unsigned integer samples.
    pub exponent_bits_per_sample: u32,
    /// The exponent the channel is downsampled by on each axis.
    pub dim_shift: u32,
    /// Channel name, when one is encoded.
    pub name: Option<String>,
    /// Whether an alpha channel uses premultiplied alpha. Only applicable to
    /// [`ExtraChannelType::Alpha`].
    pub alpha_premultiplied: bool,
    /// Spot color in linear RGBA. Only applicable to
    /// [`ExtraChannelType::SpotColor`].
    pub spot_color: [f32; 4],
    /// Only applicable to [`ExtraChannelType::Cfa`].
    pub cfa_channel: u32,
}

impl Default for ExtraChannelInfo {
    fn default() -> Self {
        Self {
            channel_type: ExtraChannelType::Unknown,
            bits_per_sample: 0,
            exponent_bits_per_sample: 0,
            dim_shift: 0,
            name: None,
            alpha_premultiplied: false,
            spot_color: [0.0; 4],
            cfa_channel: 0,
        }
    }
}

/// Frame blend modes. With coalescing enabled every frame behaves as
/// [`BlendMode::Replace`].
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Replace = 0,
    /// Add to the destination.
    Add = 1,
    /// Alpha-blend onto the destination.
    Blend = 2,
    /// Multiply by alpha, then add.
    MulAdd = 3,
    /// Multiply with the destination.
    Mul = 4,
}

/// How the color channels or a single extra channel blend onto the canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlendInfo {
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Reference frame ID to use as the bottom layer (0-3).
    pub source: u32,
    /// Which extra channel to use as the alpha channel for
    /// [`BlendMode::Blend`] and [`BlendMode::MulAdd`].
    pub alpha: u32,
    /// Clamp values to [0, 1] for the purpose of blending.
    pub clamp: bool,
}

/// Layer geometry of a non-coalesced frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerInfo {
    /// Whether cropping applies to this frame. Always false when coalescing.
    pub have_crop: bool,
    /// Horizontal offset of the frame (can be negative).
    pub crop_x0: i32,
    /// Vertical offset of the frame (can be negative).
    pub crop_y0: i32,
    /// Width of the frame.
    pub xsize: u32,
    /// Height of the frame.
    pub ysize: u32,
    /// Blending of the color channels. Extra channel blending is recorded per
    /// channel on the [`FrameRecord`] when coalescing is disabled.
    pub blend_info: BlendInfo,
    /// After blending, save the frame as reference frame with this ID (0-3).
    pub save_as_reference: u32,
}

/// The header of one displayed frame or non-coalesced layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// How long to wait after rendering, in ticks.
    pub duration: u32,
    /// Length of the frame name in bytes, or 0 if unnamed.
    pub name_length: u32,
    /// Whether this is the last animation frame.
    pub is_last: bool,
    /// Layer geometry and blending.
    pub layer_info: LayerInfo,
}

/// A frame as enumerated by the decoder: header plus decoded name and, when
/// coalescing is disabled, per-extra-channel blend info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameRecord {
    /// The frame header.
    pub header: FrameHeader,
    /// Decoded UTF-8 frame name, when one is present.
    pub name: Option<String>,
    /// Blend info per extra channel. `Some` iff coalescing is disabled.
    pub extra_channel_blend: Option<Vec<BlendInfo>>,
}

/// A 4-byte ISO-BMFF box type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    /// Wrapper type indicating a Brotli-compressed inner box.
    pub const BROB: BoxType = BoxType(*b"brob");
    /// Codestream level box.
    pub const JXLL: BoxType = BoxType(*b"jxll");

    /// The type as a string, when it is valid ASCII.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "BoxType({s:?})"),
            None => write!(f, "BoxType({:02x?})", self.0),
        }
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

impl From<&[u8; 4]> for BoxType {
    fn from(value: &[u8; 4]) -> Self {
        BoxType(*value)
    }
}

/// A container box as enumerated by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxRecord {
    /// The box type; for `brob`-wrapped boxes this is the decompressed inner
    /// type.
    pub box_type: BoxType,
    /// True iff the outer wrapper indicated a Brotli-compressed box.
    pub compressed: bool,
    /// Exact payload byte count, or 0 when [`Self::unbounded`] is set.
    pub size: u64,
    /// True iff the container indicated the box extends to end of file.
    pub unbounded: bool,
}

/// Which color profile a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorProfileTarget {
    /// The color profile of the original image data.
    Original,
    /// The color profile of the decoded pixel data.
    Data,
}
