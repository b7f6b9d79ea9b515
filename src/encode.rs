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

//! The contract between the merge composer and a low-level JPEG XL encoder.

use crate::color::EncodedProfile;
use crate::common::PixelFormat;
use crate::errors::Result;
use crate::metadata::{BasicInfo, BlendMode, BoxType, ExtraChannelInfo};

/// Butteraugli distance below which a frame is considered lossless.
pub const LOSSLESS_DISTANCE: f32 = 0.001;

/// Per-frame encoder settings.
#[derive(Clone, Debug)]
pub struct FrameSettings {
    /// Frame name, at most 1071 bytes of UTF-8.
    pub name: Option<String>,
    /// Display duration in ticks of the animation header.
    pub duration_ticks: u32,
    /// How the frame blends onto the canvas.
    pub blend_mode: BlendMode,
    /// Reference slot used as the bottom layer.
    pub blend_source: u32,
    /// Layer offset within the canvas, when the frame is cropped.
    pub crop: Option<(i32, i32)>,
    /// Reference slot to save the blended result into (0-3).
    pub save_as_reference: u32,
    /// Target butteraugli distance; values below
    /// [`LOSSLESS_DISTANCE`] encode losslessly.
    pub distance: f32,
    /// Encoder effort, 1 (fastest) to 10.
    pub effort: Option<u32>,
    /// Whether the encoder may use patches.
    pub patches: Option<bool>,
    /// Number of previous channels the modular MA tree may refer to.
    pub modular_ma_prev_channels: Option<u32>,
    /// Fraction of pixels used for modular MA tree learning, 0 to 100.
    pub modular_ma_tree_learning_percent: Option<f32>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            name: None,
            duration_ticks: 0,
            blend_mode: BlendMode::Replace,
            blend_source: 0,
            crop: None,
            save_as_reference: 0,
            distance: 1.0,
            effort: None,
            patches: None,
            modular_ma_prev_channels: None,
            modular_ma_tree_learning_percent: None,
        }
    }
}

/// A push-mode JPEG XL encoder session.
///
/// Setup calls (container toggle, basic info, color, extra channels, level)
/// come first, then boxes and frames in output order, then
/// [`close_frames`](Self::close_frames) and a final
/// [`process_output`](Self::process_output) drain. Implementations are thin
/// translations of the backing library.
pub trait EncoderSession {
    /// Wrap the codestream in the container format. Required when boxes or
    /// a codestream level tag are written.
    fn use_container(&mut self, use_container: bool) -> Result<()>;

    /// Image-wide metadata: dimensions, bit depth, alpha, animation,
    /// orientation.
    fn set_basic_info(&mut self, info: &BasicInfo) -> Result<()>;

    /// Structured output color profile.
    fn set_color_encoding(&mut self, profile: &EncodedProfile) -> Result<()>;

    /// Raw ICC output color profile.
    fn set_icc_profile(&mut self, icc: &[u8]) -> Result<()>;

    /// Describe extra channel `index`.
    fn set_extra_channel_info(&mut self, index: u32, info: &ExtraChannelInfo) -> Result<()>;

    /// Force a codestream level tag. Whether a `jxll` box is actually
    /// emitted stays under library control.
    fn set_codestream_level(&mut self, level: i32) -> Result<()>;

    /// Effort for Brotli-compressed metadata boxes, 0 to 11.
    fn set_brotli_effort(&mut self, effort: u32) -> Result<()>;

    /// Append a metadata box, optionally Brotli-compressed into a `brob`
    /// wrapper.
    fn add_box(&mut self, box_type: BoxType, contents: &[u8], compress: bool) -> Result<()>;

    /// Append one frame of interleaved pixels.
    fn add_image_frame(
        &mut self,
        settings: &FrameSettings,
        format: &PixelFormat,
        pixels: &[u8],
    ) -> Result<()>;

    /// Declare that no further frames or boxes follow.
    fn close_frames(&mut self);

    /// Drain all pending output into `sink`.
    fn process_output(&mut self, sink: &mut Vec<u8>) -> Result<()>;
}
