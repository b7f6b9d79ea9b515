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

//! Utils functions when a decoder or encoder is not needed

/// JXL codestream magic.
pub(crate) const CODESTREAM_MAGIC: [u8; 2] = [0xFF, 0x0A];
/// JXL container magic (an ISO-BMFF `JXL ` signature box).
pub(crate) const CONTAINER_MAGIC: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Result of probing the first bytes of an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signature {
    /// The prefix is too short to decide.
    NotEnoughBytes,
    /// Not a JXL signature.
    Invalid,
    /// A bare JXL codestream.
    Codestream,
    /// A JXL container.
    Container,
    /// A PNG file; recognised explicitly so the caller can suggest
    /// converting it to JXL first.
    Png,
}

/// Check the signature of the input.
///
/// Returns [`Signature::NotEnoughBytes`] while the prefix is still consistent
/// with a signature longer than the data seen so far.
#[must_use]
pub fn check_signature(buf: &[u8]) -> Signature {
    if buf.len() >= 2 && buf[..2] == CODESTREAM_MAGIC {
        return Signature::Codestream;
    }
    if buf.len() >= CONTAINER_MAGIC.len() {
        if buf[..CONTAINER_MAGIC.len()] == CONTAINER_MAGIC {
            return Signature::Container;
        }
    } else if CONTAINER_MAGIC.starts_with(buf) {
        return Signature::NotEnoughBytes;
    }
    if buf.len() >= PNG_MAGIC.len() {
        if buf[..PNG_MAGIC.len()] == PNG_MAGIC {
            return Signature::Png;
        }
    } else if PNG_MAGIC.starts_with(buf) {
        return Signature::NotEnoughBytes;
    }
    if buf.len() < 2 {
        return Signature::NotEnoughBytes;
    }
    Signature::Invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature() {
        assert_eq!(check_signature(&[]), Signature::NotEnoughBytes);
        assert_eq!(check_signature(&[0xFF]), Signature::NotEnoughBytes);
        assert_eq!(check_signature(&[0xFF, 0x0A]), Signature::Codestream);
        assert_eq!(check_signature(&[0; 64]), Signature::Invalid);
        assert_eq!(check_signature(&CONTAINER_MAGIC), Signature::Container);
        assert_eq!(
            check_signature(&CONTAINER_MAGIC[..7]),
            Signature::NotEnoughBytes
        );

        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(check_signature(&png), Signature::Png);
        png.extend_from_slice(&[0; 16]);
        assert_eq!(check_signature(&png), Signature::Png);
        assert_eq!(check_signature(&png[..4]), Signature::NotEnoughBytes);
    }
}
