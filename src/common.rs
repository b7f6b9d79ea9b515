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

//! Common types used across the crate

use byteorder::{ByteOrder, NativeEndian, BE, LE};
use half::f16;

use crate::errors::{Error, Result};

/// Endianness of multibyte pixel samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Use the endianness of the host.
    #[default]
    Native,
    /// Force little endian.
    Little,
    /// Force big endian.
    Big,
}

/// Sample data type of a pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelDataType {
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit unsigned integer.
    Uint16,
    /// Half-precision float. Accepted in metadata; processing paths do not
    /// require it.
    Float16,
    /// 32-bit float.
    Float,
}

impl PixelDataType {
    /// Byte width of one sample.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelDataType::Uint8 => 1,
            PixelDataType::Uint16 | PixelDataType::Float16 => 2,
            PixelDataType::Float => 4,
        }
    }

    /// Data type used when the caller does not force one, from the encoded
    /// bit depth.
    pub(crate) fn from_bit_depth(bits: u32, exponent_bits: u32) -> Result<Self> {
        match (bits, exponent_bits) {
            (x, 0) if x <= 8 => Ok(PixelDataType::Uint8),
            (x, 0) if x <= 16 => Ok(PixelDataType::Uint16),
            (16, _) => Ok(PixelDataType::Float16),
            (32, _) => Ok(PixelDataType::Float),
            _ => Err(Error::Usage("unsupported bit depth")),
        }
    }
}

/// Desired pixel format of a decoded buffer.
#[derive(Clone, Copy, Debug)]
pub struct PixelFormat {
    /// Amount of channels available in a pixel buffer.
    ///
    /// 1. single-channel data, e.g. grayscale or a single extra channel
    /// 2. single-channel + alpha
    /// 3. trichromatic, e.g. RGB
    /// 4. trichromatic + alpha
    pub num_channels: u32,
    /// Sample data type.
    pub data_type: PixelDataType,
    /// Whether multibyte data types are represented in big endian or little
    /// endian format. This applies to `u16`, `f16`, and `f32`.
    pub endianness: Endianness,
    /// Align scanlines to a multiple of align bytes.
    ///
    /// 0 requires no alignment (which has the same effect as value 1).
    pub align: usize,
}

impl PixelFormat {
    /// A format with the given channel count and data type, native endianness
    /// and no row alignment.
    #[must_use]
    pub fn new(num_channels: u32, data_type: PixelDataType) -> Self {
        Self {
            num_channels,
            data_type,
            endianness: Endianness::Native,
            align: 0,
        }
    }

    /// Bytes in one row before alignment padding.
    pub(crate) fn row_bytes(&self, xsize: u32) -> Result<usize> {
        (xsize as usize)
            .checked_mul(self.num_channels as usize)
            .and_then(|n| n.checked_mul(self.data_type.bytes_per_sample()))
            .ok_or(Error::BufferTooLarge)
    }
}

/// Distance in bytes between the starts of consecutive rows.
///
/// The unpadded row width rounded up to the next multiple of
/// [`PixelFormat::align`] when that is greater than 1.
///
/// # Errors
/// [`Error::BufferTooLarge`] when the arithmetic overflows.
pub fn row_stride(xsize: u32, format: &PixelFormat) -> Result<usize> {
    let row = format.row_bytes(xsize)?;
    if format.align > 1 {
        let rem = row % format.align;
        if rem != 0 {
            return row
                .checked_add(format.align - rem)
                .ok_or(Error::BufferTooLarge);
        }
    }
    Ok(row)
}

/// Minimum buffer size for a full frame.
///
/// Padding on the last row is not required, so this is
/// `stride * (ysize - 1) + unpadded_row`.
///
/// # Errors
/// [`Error::BufferTooLarge`] when the arithmetic overflows.
pub fn buffer_size(xsize: u32, ysize: u32, format: &PixelFormat) -> Result<usize> {
    if ysize == 0 {
        return Ok(0);
    }
    let stride = row_stride(xsize, format)?;
    let last_row = format.row_bytes(xsize)?;
    stride
        .checked_mul(ysize as usize - 1)
        .and_then(|n| n.checked_add(last_row))
        .ok_or(Error::BufferTooLarge)
}

mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for half::f16 {}
    impl Sealed for f32 {}
}

/// Pixel sample type.
/// Currently `u8`, `u16`, `f16` and `f32` are supported.
pub trait PixelType: private::Sealed + Sized {
    /// Corresponding [`PixelDataType`].
    fn pixel_type() -> PixelDataType;

    /// Number of bits per sample and exponent bits.
    fn bits_per_sample() -> (u32, u32);

    /// Reinterpret a raw byte buffer as samples of this type.
    fn convert(data: &[u8], endianness: Endianness) -> Vec<Self>;
}

impl PixelType for u8 {
    fn pixel_type() -> PixelDataType {
        PixelDataType::Uint8
    }

    fn bits_per_sample() -> (u32, u32) {
        (8, 0)
    }

    fn convert(data: &[u8], _endianness: Endianness) -> Vec<Self> {
        data.to_vec()
    }
}

impl PixelType for u16 {
    fn pixel_type() -> PixelDataType {
        PixelDataType::Uint16
    }

    fn bits_per_sample() -> (u32, u32) {
        (16, 0)
    }

    fn convert(data: &[u8], endianness: Endianness) -> Vec<Self> {
        let mut buf = vec![u16::default(); data.len() / std::mem::size_of::<u16>()];
        match endianness {
            Endianness::Native => NativeEndian::read_u16_into(data, buf.as_mut_slice()),
            Endianness::Little => LE::read_u16_into(data, buf.as_mut_slice()),
            Endianness::Big => BE::read_u16_into(data, buf.as_mut_slice()),
        }
        buf
    }
}

impl PixelType for f32 {
    fn pixel_type() -> PixelDataType {
        PixelDataType::Float
    }

    // Float representation needs exponent bits
    fn bits_per_sample() -> (u32, u32) {
        (32, 8)
    }

    fn convert(data: &[u8], endianness: Endianness) -> Vec<Self> {
        let mut buf = vec![f32::default(); data.len() / std::mem::size_of::<f32>()];
        match endianness {
            Endianness::Native => NativeEndian::read_f32_into(data, buf.as_mut_slice()),
            Endianness::Little => LE::read_f32_into(data, buf.as_mut_slice()),
            Endianness::Big => BE::read_f32_into(data, buf.as_mut_slice()),
        }
        buf
    }
}

impl PixelType for f16 {
    fn pixel_type() -> PixelDataType {
        PixelDataType::Float16
    }

    fn bits_per_sample() -> (u32, u32) {
        (16, 5)
    }

    fn convert(data: &[u8], endianness: Endianness) -> Vec<Self> {
        data.chunks_exact(std::mem::size_of::<f16>())
            .map(|v| {
                f16::from_bits(match endianness {
                    Endianness::Native => NativeEndian::read_u16(v),
                    Endianness::Little => LE::read_u16(v),
                    Endianness::Big => BE::read_u16(v),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_alignment() {
        let mut format = PixelFormat::new(3, PixelDataType::Uint8);
        assert_eq!(row_stride(5, &format).unwrap(), 15);

        format.align = 4;
        let stride = row_stride(5, &format).unwrap();
        assert_eq!(stride, 16);
        assert_eq!(stride % format.align, 0);

        // Already aligned rows gain no padding.
        assert_eq!(row_stride(4, &format).unwrap(), 12);
    }

    #[test]
    fn last_row_unpadded() {
        let format = PixelFormat {
            num_channels: 3,
            data_type: PixelDataType::Uint8,
            endianness: Endianness::Native,
            align: 4,
        };
        // 3 rows of 15 bytes, stride 16: two padded rows plus one bare row.
        assert_eq!(buffer_size(5, 3, &format).unwrap(), 16 * 2 + 15);
        assert_eq!(buffer_size(5, 0, &format).unwrap(), 0);
    }

    #[test]
    fn size_overflow() {
        let format = PixelFormat::new(4, PixelDataType::Float);
        assert!(matches!(
            buffer_size(u32::MAX, u32::MAX, &format),
            Err(Error::BufferTooLarge)
        ));
    }

    #[test]
    fn default_data_type_from_depth() {
        assert_eq!(
            PixelDataType::from_bit_depth(8, 0).unwrap(),
            PixelDataType::Uint8
        );
        assert_eq!(
            PixelDataType::from_bit_depth(12, 0).unwrap(),
            PixelDataType::Uint16
        );
        assert_eq!(
            PixelDataType::from_bit_depth(16, 5).unwrap(),
            PixelDataType::Float16
        );
        assert_eq!(
            PixelDataType::from_bit_depth(32, 8).unwrap(),
            PixelDataType::Float
        );
        assert!(PixelDataType::from_bit_depth(64, 11).is_err());
    }

    #[test]
    fn sample_conversion() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(u16::convert(&data, Endianness::Big), vec![0x1234, 0x5678]);
        assert_eq!(u16::convert(&data, Endianness::Little), vec![0x3412, 0x7856]);
        assert_eq!(u8::convert(&data, Endianness::Native), data.to_vec());

        let bits = f16::from_f32(0.5).to_bits().to_le_bytes();
        let converted = f16::convert(&bits, Endianness::Little);
        assert_eq!(converted, vec![f16::from_f32(0.5)]);
    }
}
