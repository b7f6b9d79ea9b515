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

//! Structured color profiles and profile equivalence.
//!
//! Pixels are reinterpreted, never color-managed: this module only compares
//! and describes profiles, it does not convert between them.

/// Color space of the image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Tristimulus RGB.
    Rgb,
    /// Luminance based; primaries are ignored.
    Gray,
    /// XYB (opsin) color space.
    Xyb,
    /// None of the other table entries describe the color space.
    Unknown,
}

/// Built-in white points. [`WhitePoint::Custom`] defers to the numerical xy
/// fields of the profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WhitePoint {
    /// CIE Standard Illuminant D65: 0.3127, 0.3290.
    D65,
    /// Read the numerical white point fields.
    Custom,
    /// CIE Standard Illuminant E (equal-energy): 1/3, 1/3.
    E,
    /// DCI-P3 from SMPTE RP 431-2: 0.314, 0.351.
    Dci,
}

/// Built-in RGB primaries. [`Primaries::Custom`] defers to the numerical xy
/// fields of the profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primaries {
    /// IEC 61966-2-1 sRGB primaries.
    SRgb,
    /// Read the numerical primaries fields.
    Custom,
    /// As specified in Rec. ITU-R BT.2100-1.
    Rec2100,
    /// As specified in SMPTE RP 431-2.
    P3,
}

/// Built-in transfer functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferFunction {
    /// As specified in ITU-R BT.709-6.
    Bt709,
    /// None of the other table entries describe the transfer function.
    Unknown,
    /// The gamma exponent is 1.
    Linear,
    /// As specified in IEC 61966-2-1 sRGB.
    SRgb,
    /// As specified in SMPTE ST 2084.
    Pq,
    /// As specified in SMPTE ST 428-1.
    Dci,
    /// As specified in Rec. ITU-R BT.2100-1.
    Hlg,
    /// Power law given by the profile's gamma field.
    Gamma,
}

/// Rendering intent, as specified in ISO 15076-1:2010.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderingIntent {
    /// Vendor-specific.
    Perceptual,
    /// Media-relative.
    Relative,
    /// Vendor-specific.
    Saturation,
    /// ICC-absolute.
    Absolute,
}

macro_rules! name_table {
    ($ty:ident { $( $variant:ident => $name:literal ),+ $(,)? }) => {
        impl $ty {
            /// The enumerator name recognised by the merge configuration.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $( $ty::$variant => $name, )+
                }
            }

            /// Parse an enumerator name. Inverse of [`Self::name`].
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some($ty::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

name_table!(ColorSpace {
    Rgb => "rgb",
    Gray => "gray",
    Xyb => "xyb",
    Unknown => "unknown",
});

name_table!(WhitePoint {
    D65 => "d65",
    Custom => "custom",
    E => "e",
    Dci => "dci",
});

name_table!(Primaries {
    SRgb => "srgb",
    Custom => "custom",
    Rec2100 => "rec2100",
    P3 => "p3",
});

name_table!(TransferFunction {
    Bt709 => "bt709",
    Unknown => "unknown",
    Linear => "linear",
    SRgb => "srgb",
    Pq => "pq",
    Dci => "dci",
    Hlg => "hlg",
    Gamma => "gamma",
});

name_table!(RenderingIntent {
    Perceptual => "perceptual",
    Relative => "relative",
    Saturation => "saturation",
    Absolute => "absolute",
});

const D65_XY: [f64; 2] = [0.3127, 0.3290];
const E_XY: [f64; 2] = [1.0 / 3.0, 1.0 / 3.0];
const DCI_XY: [f64; 2] = [0.314, 0.351];

const SRGB_RED_XY: [f64; 2] = [0.639_998_686, 0.330_010_138];
const SRGB_GREEN_XY: [f64; 2] = [0.300_003_784, 0.600_003_357];
const SRGB_BLUE_XY: [f64; 2] = [0.150_002_046, 0.059_997_204];
const REC2100_RED_XY: [f64; 2] = [0.708, 0.292];
const REC2100_GREEN_XY: [f64; 2] = [0.170, 0.797];
const REC2100_BLUE_XY: [f64; 2] = [0.131, 0.046];
const P3_RED_XY: [f64; 2] = [0.680, 0.320];
const P3_GREEN_XY: [f64; 2] = [0.265, 0.690];
const P3_BLUE_XY: [f64; 2] = [0.150, 0.060];

const XY_TOLERANCE: f64 = 1e-9;
const GAMMA_TOLERANCE: f64 = 1e-6;

/// A structured color profile description, as opposed to an ICC byte blob.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedProfile {
    /// Color space of the image data.
    pub color_space: ColorSpace,
    /// Built-in white point; [`WhitePoint::Custom`] defers to
    /// [`Self::white_point_xy`].
    pub white_point: WhitePoint,
    /// Numerical white point in CIE xy space.
    pub white_point_xy: [f64; 2],
    /// Built-in primaries; [`Primaries::Custom`] defers to the numerical
    /// fields below. Ignored for gray and XYB profiles.
    pub primaries: Primaries,
    /// Numerical red primary in CIE xy space.
    pub primaries_red_xy: [f64; 2],
    /// Numerical green primary in CIE xy space.
    pub primaries_green_xy: [f64; 2],
    /// Numerical blue primary in CIE xy space.
    pub primaries_blue_xy: [f64; 2],
    /// Transfer function.
    pub transfer_function: TransferFunction,
    /// Gamma exponent, used when [`Self::transfer_function`] is
    /// [`TransferFunction::Gamma`].
    pub gamma: f64,
    /// Rendering intent. Ignored by profile equivalence.
    pub rendering_intent: RenderingIntent,
}

impl EncodedProfile {
    /// Standard sRGB, gray or trichromatic.
    #[must_use]
    pub fn srgb(gray: bool) -> Self {
        Self {
            color_space: if gray { ColorSpace::Gray } else { ColorSpace::Rgb },
            white_point: WhitePoint::D65,
            white_point_xy: D65_XY,
            primaries: Primaries::SRgb,
            primaries_red_xy: SRGB_RED_XY,
            primaries_green_xy: SRGB_GREEN_XY,
            primaries_blue_xy: SRGB_BLUE_XY,
            transfer_function: TransferFunction::SRgb,
            gamma: 0.0,
            rendering_intent: RenderingIntent::Relative,
        }
    }

    /// Linear sRGB, gray or trichromatic.
    #[must_use]
    pub fn linear_srgb(gray: bool) -> Self {
        Self {
            transfer_function: TransferFunction::Linear,
            ..Self::srgb(gray)
        }
    }

    /// The effective white point in CIE xy space.
    #[must_use]
    pub fn derived_white_point_xy(&self) -> [f64; 2] {
        match self.white_point {
            WhitePoint::D65 => D65_XY,
            WhitePoint::E => E_XY,
            WhitePoint::Dci => DCI_XY,
            WhitePoint::Custom => self.white_point_xy,
        }
    }

    /// The effective red/green/blue primaries in CIE xy space.
    #[must_use]
    pub fn derived_primaries_xy(&self) -> [[f64; 2]; 3] {
        match self.primaries {
            Primaries::SRgb => [SRGB_RED_XY, SRGB_GREEN_XY, SRGB_BLUE_XY],
            Primaries::Rec2100 => [REC2100_RED_XY, REC2100_GREEN_XY, REC2100_BLUE_XY],
            Primaries::P3 => [P3_RED_XY, P3_GREEN_XY, P3_BLUE_XY],
            Primaries::Custom => [
                self.primaries_red_xy,
                self.primaries_green_xy,
                self.primaries_blue_xy,
            ],
        }
    }
}

fn xy_close(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).abs() <= XY_TOLERANCE && (a[1] - b[1]).abs() <= XY_TOLERANCE
}

fn effectively_linear(profile: &EncodedProfile) -> bool {
    match profile.transfer_function {
        TransferFunction::Linear => true,
        TransferFunction::Gamma => (profile.gamma - 1.0).abs() <= GAMMA_TOLERANCE,
        _ => false,
    }
}

fn transfer_equivalent(a: &EncodedProfile, b: &EncodedProfile) -> bool {
    if effectively_linear(a) && effectively_linear(b) {
        return true;
    }
    if a.transfer_function != b.transfer_function {
        return false;
    }
    if a.transfer_function == TransferFunction::Gamma {
        return a.gamma == b.gamma;
    }
    true
}

fn primaries_equivalent(a: &EncodedProfile, b: &EncodedProfile) -> bool {
    if a.primaries == b.primaries && a.primaries != Primaries::Custom {
        return true;
    }
    let pa = a.derived_primaries_xy();
    let pb = b.derived_primaries_xy();
    pa.iter().zip(pb.iter()).all(|(x, y)| xy_close(*x, *y))
}

fn white_point_equivalent(a: &EncodedProfile, b: &EncodedProfile) -> bool {
    if a.white_point == b.white_point && a.white_point != WhitePoint::Custom {
        return true;
    }
    xy_close(a.derived_white_point_xy(), b.derived_white_point_xy())
}

/// Structural equivalence of two encoded profiles. Rendering intent is
/// ignored; [`ColorSpace::Unknown`] never matches anything, itself included.
#[must_use]
pub fn encoded_equivalent(a: &EncodedProfile, b: &EncodedProfile) -> bool {
    if a.color_space != b.color_space || a.color_space == ColorSpace::Unknown {
        return false;
    }
    if !white_point_equivalent(a, b) || !transfer_equivalent(a, b) {
        return false;
    }
    // Primaries carry no meaning outside tristimulus data.
    a.color_space != ColorSpace::Rgb || primaries_equivalent(a, b)
}

/// Byte-level equivalence of two ICC profiles, skipping the header fields
/// that legitimately vary between otherwise identical profiles: flags,
/// rendering intent and the MD5 checksum.
#[must_use]
pub fn icc_equivalent(a: &[u8], b: &[u8]) -> bool {
    if a.len() < 128 || b.len() < 128 || a.len() != b.len() {
        return false;
    }
    a[0..44] == b[0..44]
        && a[48..64] == b[48..64]
        && a[68..84] == b[68..84]
        && a[100..] == b[100..]
}

/// A color profile held in encoded and/or ICC form. Consumers prefer the
/// encoded form when both are present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorProfile {
    /// Structured description, when available.
    pub encoded: Option<EncodedProfile>,
    /// Raw ICC bytes, when available.
    pub icc: Option<Vec<u8>>,
}

impl ColorProfile {
    /// A profile from a structured description.
    #[must_use]
    pub fn from_encoded(encoded: EncodedProfile) -> Self {
        Self {
            encoded: Some(encoded),
            icc: None,
        }
    }

    /// A profile from raw ICC bytes.
    #[must_use]
    pub fn from_icc(icc: Vec<u8>) -> Self {
        Self {
            encoded: None,
            icc: Some(icc),
        }
    }

    /// Whether neither representation is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encoded.is_none() && self.icc.is_none()
    }

    /// Profile equivalence: both encoded and structurally equal, or both ICC
    /// and byte-equal outside the volatile header regions.
    #[must_use]
    pub fn equivalent(&self, other: &ColorProfile) -> bool {
        if let (Some(a), Some(b)) = (&self.encoded, &other.encoded) {
            return encoded_equivalent(a, b);
        }
        if let (Some(a), Some(b)) = (&self.icc, &other.icc) {
            return icc_equivalent(a, b);
        }
        false
    }
}
