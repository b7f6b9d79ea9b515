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

//! Merge several frames and metadata boxes into one JPEG XL file.
//!
//! The composer is driven by a declarative configuration (the JSON document
//! itself is parsed elsewhere; this module consumes the resolved model),
//! reads its inputs through [`Pixmap`]s, and emits a single file through an
//! [`EncoderSession`].

use crate::color::{ColorProfile, EncodedProfile};
use crate::common::{PixelDataType, PixelFormat};
use crate::decode::{CodecSession, Decoder};
use crate::encode::{EncoderSession, FrameSettings, LOSSLESS_DISTANCE};
use crate::errors::{Error, Result};
use crate::metadata::{
    AnimationHeader, BasicInfo, BlendMode, BoxType, ExtraChannelInfo, ExtraChannelType,
    Orientation,
};
use crate::pixmap::Pixmap;

/// A ticks-per-second ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fraction {
    /// Numerator.
    pub numerator: u32,
    /// Denominator; never 0 in a valid config.
    pub denominator: u32,
}

impl Fraction {
    /// A new ratio.
    #[must_use]
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The ratio with the common factor divided out.
    #[must_use]
    pub fn reduced(self) -> Self {
        let g = gcd(self.numerator, self.denominator);
        if g <= 1 {
            return self;
        }
        Self {
            numerator: self.numerator / g,
            denominator: self.denominator / g,
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// A frame duration as configured. The two units are mutually exclusive
/// across one composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Duration {
    /// Ticks of the (possibly auto-computed) animation header.
    Ticks(u32),
    /// Milliseconds; the tick rate is reconciled over all such durations.
    Millis(u32),
}

/// Per-frame configuration. `None` fields fall back to the composition's
/// frame defaults, then to built-in defaults.
#[derive(Clone, Debug, Default)]
pub struct FrameOptions {
    /// Frame name.
    pub name: Option<String>,
    /// Blend mode onto the canvas.
    pub blend_mode: Option<BlendMode>,
    /// Reference slot used as the bottom layer.
    pub blend_source: Option<u32>,
    /// Copy metadata boxes from this frame's source file.
    pub copy_boxes: Option<bool>,
    /// Horizontal layer offset.
    pub crop_x0: Option<i32>,
    /// Vertical layer offset.
    pub crop_y0: Option<i32>,
    /// Target butteraugli distance.
    pub distance: Option<f32>,
    /// Display duration.
    pub duration: Option<Duration>,
    /// Encoder effort, 1 to 10.
    pub effort: Option<u32>,
    /// Modular MA tree previous-channel count.
    pub ma_prev_channels: Option<u32>,
    /// Modular MA tree learning percentage.
    pub ma_tree_learn_percent: Option<f32>,
    /// Whether patches may be generated.
    pub patches: Option<bool>,
    /// Reference slot to save into (0-3).
    pub save_as_reference: Option<u32>,
}

impl FrameOptions {
    /// This option set with `defaults` filling its gaps.
    #[must_use]
    pub fn resolve(&self, defaults: &FrameOptions) -> FrameOptions {
        FrameOptions {
            name: self.name.clone().or_else(|| defaults.name.clone()),
            blend_mode: self.blend_mode.or(defaults.blend_mode),
            blend_source: self.blend_source.or(defaults.blend_source),
            copy_boxes: self.copy_boxes.or(defaults.copy_boxes),
            crop_x0: self.crop_x0.or(defaults.crop_x0),
            crop_y0: self.crop_y0.or(defaults.crop_y0),
            distance: self.distance.or(defaults.distance),
            duration: self.duration.or(defaults.duration),
            effort: self.effort.or(defaults.effort),
            ma_prev_channels: self.ma_prev_channels.or(defaults.ma_prev_channels),
            ma_tree_learn_percent: self
                .ma_tree_learn_percent
                .or(defaults.ma_tree_learn_percent),
            patches: self.patches.or(defaults.patches),
            save_as_reference: self.save_as_reference.or(defaults.save_as_reference),
        }
    }
}

/// Per-box defaults.
#[derive(Clone, Debug, Default)]
pub struct BoxOptions {
    /// Brotli-compress the box into a `brob` wrapper.
    pub compress: Option<bool>,
}

/// A metadata box to write.
#[derive(Clone, Debug)]
pub struct BoxEntry {
    /// Box type; validated against the container rules.
    pub box_type: BoxType,
    /// Payload bytes.
    pub data: Vec<u8>,
    /// Brotli-compress; `None` falls back to the box defaults.
    pub compress: Option<bool>,
}

/// Composition-wide configuration, mirroring the recognised document keys.
#[derive(Clone, Debug, Default)]
pub struct MergeConfig {
    /// Animation loop count; 0 repeats forever.
    pub loops: u32,
    /// Tick rate; overrides the automatic reconciliation.
    pub ticks_per_second: Option<Fraction>,
    /// Output orientation.
    pub orientation: Option<Orientation>,
    /// Canvas width; auto-computed from the frames when absent.
    pub xsize: Option<u32>,
    /// Canvas height; auto-computed from the frames when absent.
    pub ysize: Option<u32>,
    /// Preferred display width.
    pub intrinsic_xsize: Option<u32>,
    /// Preferred display height.
    pub intrinsic_ysize: Option<u32>,
    /// Forced codestream level tag. Whether the library actually emits a
    /// `jxll` box stays under its control.
    pub codestream_level: Option<i32>,
    /// Brotli effort for compressed boxes, 0 to 11.
    pub brotli_effort: Option<u32>,
    /// Output color profile; wins over every input profile.
    pub color: Option<ColorProfile>,
    /// Fallbacks applied to every frame before per-frame overrides.
    pub frame_defaults: FrameOptions,
    /// Fallbacks applied to every box.
    pub box_defaults: BoxOptions,
}

/// Tick rate: the config wins; else `1000 / gcd` over millisecond
/// durations; else 100 ticks per second.
fn reconcile_ticks(config: Option<Fraction>, durations: &[Option<Duration>]) -> Fraction {
    if let Some(fraction) = config {
        return fraction;
    }
    let mut g = 0;
    for duration in durations.iter().flatten() {
        if let Duration::Millis(ms) = duration {
            g = gcd(g, *ms);
        }
    }
    if g > 0 {
        Fraction::new(1000, g).reduced()
    } else {
        Fraction::new(100, 1)
    }
}

/// A millisecond duration in ticks, rounded to nearest.
fn millis_to_ticks(ms: u32, tps: Fraction) -> u32 {
    let numerator = u64::from(ms) * u64::from(tps.numerator);
    let denominator = 1000 * u64::from(tps.denominator);
    u32::try_from((numerator + denominator / 2) / denominator).unwrap_or(u32::MAX)
}

/// Canvas size covering every frame extent on the positive axes.
fn auto_canvas(extents: &[(i32, i32, u32, u32)]) -> (u32, u32) {
    let mut xsize: i64 = 0;
    let mut ysize: i64 = 0;
    for &(x0, y0, width, height) in extents {
        xsize = xsize.max(i64::from(x0) + i64::from(width));
        ysize = ysize.max(i64::from(y0) + i64::from(height));
    }
    (
        u32::try_from(xsize).unwrap_or(0),
        u32::try_from(ysize).unwrap_or(0),
    )
}

/// Container rules for configured box types: exactly 4 printable ASCII
/// bytes, not a reserved structural type.
fn validate_box_type(box_type: BoxType) -> Result<()> {
    let bytes = box_type.0;
    if !bytes.iter().all(u8::is_ascii) || bytes.iter().any(|&b| b < 0x20) {
        return Err(Error::InvalidConfig(format!(
            "box type {box_type:?} is not 4 ASCII bytes"
        )));
    }
    if bytes[..3].eq_ignore_ascii_case(b"JXL") {
        return Err(Error::InvalidConfig(format!(
            "box type {box_type} is reserved for the container"
        )));
    }
    if &bytes == b"ftyp" || &bytes == b"jbrd" {
        return Err(Error::InvalidConfig(format!(
            "box type {box_type} is reserved for the container"
        )));
    }
    Ok(())
}

/// Structural container boxes are never copied from an input.
fn is_structural_box(box_type: BoxType) -> bool {
    let bytes = box_type.0;
    bytes == *b"ftyp" || bytes == *b"jbrd" || bytes[..3].eq_ignore_ascii_case(b"jxl")
}

/// Facts gathered from one input before encoding.
struct InputFacts {
    width: u32,
    height: u32,
    bits_per_sample: u32,
    exponent_bits: u32,
    alpha_bits: u32,
    alpha_exponent_bits: u32,
    num_color_channels: u32,
    profile: ColorProfile,
}

fn facts_from_format(format: &PixelFormat, width: u32, height: u32) -> InputFacts {
    let (bits, exponent) = match format.data_type {
        PixelDataType::Uint8 => (8, 0),
        PixelDataType::Uint16 => (16, 0),
        PixelDataType::Float16 => (16, 5),
        PixelDataType::Float => (32, 8),
    };
    let has_alpha = matches!(format.num_channels, 2 | 4);
    InputFacts {
        width,
        height,
        bits_per_sample: bits,
        exponent_bits: exponent,
        alpha_bits: if has_alpha { bits } else { 0 },
        alpha_exponent_bits: if has_alpha { exponent } else { 0 },
        num_color_channels: if format.num_channels <= 2 { 1 } else { 3 },
        profile: ColorProfile::default(),
    }
}

/// Orchestrates N input frames and M metadata boxes into one output JXL.
pub struct MergeComposer<S: CodecSession + Default> {
    config: MergeConfig,
    frames: Vec<(Pixmap<S>, FrameOptions)>,
    boxes: Vec<BoxEntry>,
}

impl<S: CodecSession + Default> MergeComposer<S> {
    /// A composer for `config` with no inputs yet.
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            boxes: Vec::new(),
        }
    }

    /// Append an input frame.
    pub fn add_frame(&mut self, pixmap: Pixmap<S>, options: FrameOptions) {
        self.frames.push((pixmap, options));
    }

    /// Append a metadata box.
    pub fn add_box(&mut self, entry: BoxEntry) {
        self.boxes.push(entry);
    }

    fn validate(&self, resolved: &[FrameOptions]) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::InvalidConfig("at least one frame required".into()));
        }
        if self.config.xsize.is_some() != self.config.ysize.is_some() {
            return Err(Error::InvalidConfig(
                "xsize and ysize must be given together".into(),
            ));
        }
        if self.config.intrinsic_xsize.is_some() != self.config.intrinsic_ysize.is_some() {
            return Err(Error::InvalidConfig(
                "intrinsicXsize and intrinsicYsize must be given together".into(),
            ));
        }
        if let Some(tps) = self.config.ticks_per_second {
            if tps.denominator == 0 {
                return Err(Error::InvalidConfig(
                    "ticksPerSecond denominator must not be 0".into(),
                ));
            }
        }
        if let Some(effort) = self.config.brotli_effort {
            if effort > 11 {
                return Err(Error::InvalidConfig(format!(
                    "brotliEffort {effort} out of range 0..=11"
                )));
            }
        }

        let mut has_millis = false;
        let mut has_ticks = false;
        for options in resolved {
            match options.duration {
                Some(Duration::Millis(_)) => has_millis = true,
                Some(Duration::Ticks(_)) => has_ticks = true,
                None => {}
            }
            if let Some(effort) = options.effort {
                if !(1..=10).contains(&effort) {
                    return Err(Error::InvalidConfig(format!(
                        "effort {effort} out of range 1..=10"
                    )));
                }
            }
            if let Some(distance) = options.distance {
                if !(0.0..=25.0).contains(&distance) {
                    return Err(Error::InvalidConfig(format!(
                        "distance {distance} out of range 0..=25"
                    )));
                }
            }
            if let Some(slot) = options.save_as_reference {
                if slot > 3 {
                    return Err(Error::InvalidConfig(format!(
                        "saveAsReference {slot} out of range 0..=3"
                    )));
                }
            }
        }
        if has_millis && has_ticks {
            return Err(Error::InvalidConfig(
                "durationMs and durationTicks cannot be mixed".into(),
            ));
        }

        for entry in &self.boxes {
            validate_box_type(entry.box_type)?;
        }
        Ok(())
    }

    /// Run the composition and return the encoded file.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] for constraint violations; decoding and
    /// encoding errors from the inputs and `session`.
    pub fn compose<E: EncoderSession>(&mut self, session: &mut E) -> Result<Vec<u8>> {
        let resolved: Vec<FrameOptions> = self
            .frames
            .iter()
            .map(|(_, options)| options.resolve(&self.config.frame_defaults))
            .collect();
        self.validate(&resolved)?;

        // Pass 1: materialise inputs, gather facts, collect copied boxes.
        let mut facts = Vec::with_capacity(self.frames.len());
        let mut copied_boxes = Vec::new();
        for ((pixmap, _), options) in self.frames.iter_mut().zip(&resolved) {
            // Opaque alpha carries no information worth encoding.
            if pixmap.has_alpha() && pixmap.is_fully_opaque()? {
                pixmap.drop_interleaved_alpha()?;
            }
            pixmap.ensure_buffered()?;
            let width = pixmap.width()?;
            let height = pixmap.height()?;

            let mut fact = match pixmap.source_info()? {
                Some(info) => InputFacts {
                    width,
                    height,
                    bits_per_sample: info.bits_per_sample,
                    exponent_bits: info.exponent_bits_per_sample,
                    alpha_bits: info.alpha_bits,
                    alpha_exponent_bits: info.alpha_exponent_bits,
                    num_color_channels: info.num_color_channels,
                    profile: ColorProfile::default(),
                },
                None => facts_from_format(pixmap.format(), width, height),
            };
            fact.profile = pixmap.source_color_profile()?;
            facts.push(fact);

            if options.copy_boxes.unwrap_or(false) {
                if let Some(mut decoder) = pixmap.release_decoder()? {
                    copied_boxes.append(&mut collect_boxes(&mut decoder)?);
                }
            }
        }

        // Derived outputs.
        let durations: Vec<Option<Duration>> =
            resolved.iter().map(|options| options.duration).collect();
        let tps = reconcile_ticks(self.config.ticks_per_second, &durations);
        let ticks: Vec<u32> = durations
            .iter()
            .map(|duration| match duration {
                Some(Duration::Ticks(t)) => *t,
                Some(Duration::Millis(ms)) => millis_to_ticks(*ms, tps),
                None => 0,
            })
            .collect();
        let animated = ticks.iter().any(|&t| t > 0);

        let uses_original_profile = resolved
            .iter()
            .any(|options| options.distance.unwrap_or(1.0) < LOSSLESS_DISTANCE);

        // Reference slot 3 is claimed by encoder-internal patch frames.
        let disable_patches = resolved
            .iter()
            .any(|options| options.save_as_reference == Some(3));
        if disable_patches {
            tracing::debug!("reference slot 3 in use; disabling patches for all frames");
        }

        let (xsize, ysize) = match (self.config.xsize, self.config.ysize) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                let extents: Vec<(i32, i32, u32, u32)> = resolved
                    .iter()
                    .zip(&facts)
                    .map(|(options, fact)| {
                        (
                            options.crop_x0.unwrap_or(0),
                            options.crop_y0.unwrap_or(0),
                            fact.width,
                            fact.height,
                        )
                    })
                    .collect();
                auto_canvas(&extents)
            }
        };

        let bits_per_sample = facts.iter().map(|f| f.bits_per_sample).max().unwrap_or(8);
        let exponent_bits = facts.iter().map(|f| f.exponent_bits).max().unwrap_or(0);
        let alpha_bits = facts.iter().map(|f| f.alpha_bits).max().unwrap_or(0);
        let alpha_exponent_bits = facts
            .iter()
            .map(|f| f.alpha_exponent_bits)
            .max()
            .unwrap_or(0);
        let num_color_channels = facts
            .iter()
            .map(|f| f.num_color_channels)
            .max()
            .unwrap_or(3);

        let color = self.output_color(&facts);

        // Pass 2: drive the encoder.
        if !self.boxes.is_empty()
            || !copied_boxes.is_empty()
            || self.config.codestream_level.is_some()
        {
            session.use_container(true)?;
        }

        let info = BasicInfo {
            have_container: false,
            xsize,
            ysize,
            bits_per_sample,
            exponent_bits_per_sample: exponent_bits,
            uses_original_profile,
            have_animation: animated,
            orientation: self.config.orientation.unwrap_or_default(),
            num_color_channels,
            num_extra_channels: u32::from(alpha_bits > 0),
            alpha_bits,
            alpha_exponent_bits,
            alpha_premultiplied: false,
            animation: AnimationHeader {
                tps_numerator: tps.numerator,
                tps_denominator: tps.denominator,
                num_loops: self.config.loops,
                have_timecodes: false,
            },
            intrinsic_xsize: self.config.intrinsic_xsize.unwrap_or(xsize),
            intrinsic_ysize: self.config.intrinsic_ysize.unwrap_or(ysize),
        };
        session.set_basic_info(&info)?;

        if let Some(encoded) = &color.encoded {
            session.set_color_encoding(encoded)?;
        } else if let Some(icc) = &color.icc {
            session.set_icc_profile(icc)?;
        }

        if alpha_bits > 0 {
            session.set_extra_channel_info(
                0,
                &ExtraChannelInfo {
                    channel_type: ExtraChannelType::Alpha,
                    bits_per_sample: alpha_bits,
                    exponent_bits_per_sample: alpha_exponent_bits,
                    ..ExtraChannelInfo::default()
                },
            )?;
        }

        if let Some(level) = self.config.codestream_level {
            session.set_codestream_level(level)?;
        }
        if let Some(effort) = self.config.brotli_effort {
            session.set_brotli_effort(effort)?;
        }

        for entry in &self.boxes {
            let compress = entry
                .compress
                .or(self.config.box_defaults.compress)
                .unwrap_or(false);
            session.add_box(entry.box_type, &entry.data, compress)?;
        }
        for (box_type, data, compress) in &copied_boxes {
            session.add_box(*box_type, data, *compress)?;
        }

        for (index, ((pixmap, _), options)) in
            self.frames.iter_mut().zip(&resolved).enumerate()
        {
            let crop = if options.crop_x0.is_some() || options.crop_y0.is_some() {
                Some((
                    options.crop_x0.unwrap_or(0),
                    options.crop_y0.unwrap_or(0),
                ))
            } else {
                None
            };
            let settings = FrameSettings {
                name: options.name.clone(),
                duration_ticks: ticks[index],
                blend_mode: options.blend_mode.unwrap_or_default(),
                blend_source: options.blend_source.unwrap_or(0),
                crop,
                save_as_reference: options.save_as_reference.unwrap_or(0),
                distance: options.distance.unwrap_or(1.0),
                effort: options.effort,
                patches: if disable_patches {
                    Some(false)
                } else {
                    options.patches
                },
                modular_ma_prev_channels: options.ma_prev_channels,
                modular_ma_tree_learning_percent: options.ma_tree_learn_percent,
            };
            let format = *pixmap.format();
            let pixels = pixmap.pixels()?;
            session.add_image_frame(&settings, &format, pixels)?;
        }

        session.close_frames();
        let mut out = Vec::new();
        session.process_output(&mut out)?;
        Ok(out)
    }

    /// Output profile: explicit config wins; else the first non-empty input
    /// profile; else sRGB, gray when every input is gray. Mismatching input
    /// profiles are reported once, then the check stops.
    fn output_color(&self, facts: &[InputFacts]) -> ColorProfile {
        if let Some(color) = &self.config.color {
            return color.clone();
        }
        let mut chosen: Option<&ColorProfile> = None;
        for fact in facts {
            if fact.profile.is_empty() {
                continue;
            }
            match chosen {
                None => chosen = Some(&fact.profile),
                Some(reference) => {
                    if !reference.equivalent(&fact.profile) {
                        tracing::warn!(
                            "input color profiles differ; keeping the first one"
                        );
                        break;
                    }
                }
            }
        }
        if let Some(profile) = chosen {
            return profile.clone();
        }
        let all_gray = facts.iter().all(|f| f.num_color_channels == 1);
        ColorProfile::from_encoded(EncodedProfile::srgb(all_gray))
    }
}

fn collect_boxes<S: CodecSession>(
    decoder: &mut Decoder<'static, S>,
) -> Result<Vec<(BoxType, Vec<u8>, bool)>> {
    let count = decoder.box_count()?;
    let mut boxes = Vec::new();
    for index in 0..count {
        let record = decoder.box_info(index)?;
        if is_structural_box(record.box_type) {
            continue;
        }
        let mut data = Vec::new();
        decoder.box_content(index, &mut data, usize::MAX, record.compressed)?;
        boxes.push((record.box_type, data, record.compressed));
    }
    Ok(boxes)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn gcd_and_reduction() {
        assert_eq!(gcd(1000, 40), 40);
        assert_eq!(Fraction::new(1000, 40).reduced(), Fraction::new(25, 1));
        assert_eq!(Fraction::new(7, 3).reduced(), Fraction::new(7, 3));
    }

    #[test]
    fn ticks_reconciliation() {
        // Explicit config wins.
        assert_eq!(
            reconcile_ticks(Some(Fraction::new(30, 1)), &[Some(Duration::Millis(40))]),
            Fraction::new(30, 1)
        );
        // Millisecond durations: 1000 / gcd, reduced.
        assert_eq!(
            reconcile_ticks(
                None,
                &[
                    Some(Duration::Millis(40)),
                    Some(Duration::Millis(120)),
                    None
                ]
            ),
            Fraction::new(25, 1)
        );
        assert_eq!(
            reconcile_ticks(None, &[Some(Duration::Millis(3))]),
            Fraction::new(1000, 3)
        );
        // No durations at all: the 100/1 default.
        assert_eq!(reconcile_ticks(None, &[None]), Fraction::new(100, 1));
        assert_eq!(
            reconcile_ticks(None, &[Some(Duration::Ticks(5))]),
            Fraction::new(100, 1)
        );
    }

    #[test]
    fn millis_conversion() {
        let tps = Fraction::new(25, 1);
        assert_eq!(millis_to_ticks(40, tps), 1);
        assert_eq!(millis_to_ticks(120, tps), 3);
        let thirds = Fraction::new(1000, 3);
        assert_eq!(millis_to_ticks(3, thirds), 1);
    }

    #[test]
    fn canvas_expansion() {
        // Negative offsets only count their positive extent.
        let extents = [(-2, -1, 16, 16), (4, 0, 16, 8)];
        assert_eq!(auto_canvas(&extents), (20, 16));
        assert_eq!(auto_canvas(&[(-30, -30, 16, 16)]), (0, 0));
    }

    #[test]
    fn box_type_rules() {
        assert!(validate_box_type(BoxType(*b"Exif")).is_ok());
        assert!(validate_box_type(BoxType(*b"xml ")).is_ok());
        assert!(validate_box_type(BoxType(*b"JXL ")).is_err());
        assert!(validate_box_type(BoxType(*b"jxlc")).is_err());
        assert!(validate_box_type(BoxType(*b"JxLl")).is_err());
        assert!(validate_box_type(BoxType(*b"ftyp")).is_err());
        assert!(validate_box_type(BoxType(*b"jbrd")).is_err());
        assert!(validate_box_type(BoxType([0x00, b'a', b'b', b'c'])).is_err());
        assert!(validate_box_type(BoxType([0xFF, b'a', b'b', b'c'])).is_err());
    }

    #[test]
    fn structural_boxes_never_copied() {
        assert!(is_structural_box(BoxType(*b"ftyp")));
        assert!(is_structural_box(BoxType(*b"jxlc")));
        assert!(is_structural_box(BoxType(*b"JXLL")));
        assert!(is_structural_box(BoxType(*b"jbrd")));
        assert!(!is_structural_box(BoxType(*b"Exif")));
    }

    #[test]
    fn defaults_resolution() {
        let defaults = FrameOptions {
            distance: Some(0.0),
            effort: Some(7),
            ..FrameOptions::default()
        };
        let options = FrameOptions {
            effort: Some(3),
            ..FrameOptions::default()
        };
        let resolved = options.resolve(&defaults);
        assert_eq!(resolved.effort, Some(3));
        assert_eq!(resolved.distance, Some(0.0));
        assert_eq!(resolved.patches, None);
    }
}
