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

//! Byte sources and the bounded input window handed to the codec.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::errors::{Error, Result};

/// Default buffer cap when the caller passes 0 KiB: 64 MiB.
pub(crate) const DEFAULT_CAP: usize = 64 * 1024 * 1024;
/// Initial allocation for a stream of unknown size.
pub(crate) const DEFAULT_CHUNK: usize = 64 * 1024;

/// A sequential byte source the decoder can read from, and possibly seek.
pub trait Source {
    /// Read up to `buf.len()` bytes; 0 means end of stream.
    ///
    /// # Errors
    /// Underlying IO failure.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Current absolute position, when the source can report one. Captured
    /// at open time as the rewind anchor.
    fn tell(&mut self) -> Option<u64>;

    /// Seek to an absolute position.
    ///
    /// # Errors
    /// [`Error::NotSeekable`] when the source refuses to seek.
    fn seek_to(&mut self, pos: u64) -> Result<()>;

    /// Number of bytes remaining from the current position, when known up
    /// front.
    fn len_hint(&mut self) -> Option<u64>;
}

impl<S: Source + ?Sized> Source for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read(buf)
    }

    fn tell(&mut self) -> Option<u64> {
        (**self).tell()
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        (**self).seek_to(pos)
    }

    fn len_hint(&mut self) -> Option<u64> {
        (**self).len_hint()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read(buf)
    }

    fn tell(&mut self) -> Option<u64> {
        (**self).tell()
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        (**self).seek_to(pos)
    }

    fn len_hint(&mut self) -> Option<u64> {
        (**self).len_hint()
    }
}

/// A file on disk. Knows its size, so the input buffer can be capped to it.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Open `path` for reading.
    ///
    /// # Errors
    /// Underlying IO failure.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl Source for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }

    fn tell(&mut self) -> Option<u64> {
        self.file.stream_position().ok()
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos)).map_err(Error::Io)?;
        Ok(())
    }

    fn len_hint(&mut self) -> Option<u64> {
        let pos = self.file.stream_position().ok()?;
        Some(self.len.saturating_sub(pos))
    }
}

/// Any `Read + Seek` value as a [`Source`].
pub struct SeekSource<R> {
    inner: R,
}

impl<R: Read + Seek> SeekSource<R> {
    /// Wrap a seekable reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Give back the wrapped reader. Its position is indeterminate.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Source for SeekSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }

    fn tell(&mut self) -> Option<u64> {
        self.inner.stream_position().ok()
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos)).map_err(Error::Io)?;
        Ok(())
    }

    fn len_hint(&mut self) -> Option<u64> {
        let pos = self.inner.stream_position().ok()?;
        let end = self.inner.seek(SeekFrom::End(0)).ok()?;
        self.inner.seek(SeekFrom::Start(pos)).ok()?;
        Some(end.saturating_sub(pos))
    }
}

/// A non-seekable reader (a pipe, a socket). Decoding works as long as no
/// second pass over the input is needed; a rewind past buffered data fails
/// with [`Error::NotSeekable`].
pub struct PipeSource<R> {
    inner: R,
}

impl<R: Read> PipeSource<R> {
    /// Wrap a sequential reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Source for PipeSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }

    fn tell(&mut self) -> Option<u64> {
        None
    }

    fn seek_to(&mut self, _pos: u64) -> Result<()> {
        Err(Error::NotSeekable)
    }

    fn len_hint(&mut self) -> Option<u64> {
        None
    }
}

enum Storage<'src> {
    /// Caller-owned byte range; size fixed, always fully buffered.
    Borrowed(&'src [u8]),
    /// Growable window over a stream.
    Owned(Vec<u8>),
}

/// A contiguous byte window into the source, grown and recycled under a
/// fixed cap.
///
/// `offset` is the absolute source position of the window start; while it is
/// 0 the start of the file is still buffered and a rewind costs nothing.
/// `handoff` marks where the codec's current input window begins.
pub(crate) struct InputBuffer<'src> {
    storage: Storage<'src>,
    max: usize,
    len: usize,
    offset: u64,
    handoff: usize,
    eof: bool,
    /// The cap was lowered to a known exact source size.
    exact: bool,
}

impl<'src> InputBuffer<'src> {
    /// Adopt a caller-owned byte range. The whole file is buffered by
    /// construction.
    pub fn from_memory(data: &'src [u8]) -> Self {
        Self {
            max: data.len(),
            len: data.len(),
            storage: Storage::Borrowed(data),
            offset: 0,
            handoff: 0,
            eof: true,
            exact: true,
        }
    }

    /// Prepare a window for a stream source. `max_kib == 0` selects the
    /// 64 MiB default; a known source size below the cap lowers the cap to
    /// the exact size and allocates it fully up front.
    pub fn for_stream(max_kib: usize, len_hint: Option<u64>) -> Self {
        let mut max = if max_kib == 0 {
            DEFAULT_CAP
        } else {
            max_kib * 1024
        };
        let mut exact = false;
        let initial = match len_hint {
            Some(hint) if usize::try_from(hint).is_ok_and(|hint| hint < max) => {
                max = usize::try_from(hint).unwrap_or(max).max(1);
                exact = true;
                max
            }
            _ => DEFAULT_CHUNK.min(max),
        };
        Self {
            storage: Storage::Owned(vec![0; initial]),
            max,
            len: 0,
            offset: 0,
            handoff: 0,
            eof: false,
            exact,
        }
    }

    /// The window to hand to the codec.
    pub fn window(&self) -> &[u8] {
        match &self.storage {
            Storage::Borrowed(data) => &data[self.handoff..self.len],
            Storage::Owned(buf) => &buf[self.handoff..self.len],
        }
    }

    /// Absolute source offset of the window start.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the source has reported end of stream.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    /// Whether every byte of the source sits contiguously in the window.
    pub fn whole_file(&self) -> bool {
        self.eof && self.offset == 0
    }

    /// Initial fill from the stream source.
    pub fn prime(&mut self, src: &mut dyn Source) -> Result<()> {
        self.fill(src)?;
        Ok(())
    }

    /// Refill after the codec reported "need more input".
    ///
    /// `unconsumed` is the byte count returned by the session's input
    /// release. While under the cap the buffer grows and keeps everything it
    /// holds (so the file start stays buffered and rewinds stay free); at
    /// the cap it recycles by dropping the consumed head.
    pub fn replenish(&mut self, unconsumed: usize, src: &mut dyn Source) -> Result<()> {
        self.handoff = self.len.saturating_sub(unconsumed);
        let unprocessed = self.len - self.handoff;
        if unprocessed == self.len && self.len > 0 {
            // A full window the codec could not consume any of.
            return Err(Error::CorruptedStream("codec stalled on input"));
        }

        let Storage::Owned(buf) = &mut self.storage else {
            // A memory window is complete from the start; the codec has no
            // business asking for more.
            return Err(Error::CorruptedStream("input exhausted"));
        };

        let cap = buf.len();
        if cap < self.max {
            let grown = (cap * 2).max(DEFAULT_CHUNK).min(self.max);
            tracing::trace!(cap, grown, "growing input buffer");
            buf.resize(grown, 0);
        } else {
            // Recycle: move the unprocessed tail to the head.
            buf.copy_within(self.handoff..self.len, 0);
            self.offset += self.handoff as u64;
            self.len = unprocessed;
            self.handoff = 0;
        }
        self.fill(src)?;
        Ok(())
    }

    /// Re-expose the buffered start of the file after a codec rewind.
    /// Returns false when the start is no longer buffered and the source
    /// itself must be rewound.
    pub fn rewind_buffered(&mut self) -> bool {
        if self.offset != 0 {
            return false;
        }
        self.handoff = 0;
        true
    }

    /// Forget all buffered data ahead of re-reading a re-seeked source.
    pub fn reset(&mut self) {
        self.len = 0;
        self.offset = 0;
        self.handoff = 0;
        self.eof = false;
    }

    fn fill(&mut self, src: &mut dyn Source) -> Result<usize> {
        let Storage::Owned(buf) = &mut self.storage else {
            return Ok(0);
        };
        let mut total = 0;
        while self.len < buf.len() {
            let n = src.read(&mut buf[self.len..]).map_err(Error::Io)?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.len += n;
            total += n;
        }
        if self.exact && self.len == buf.len() {
            // The buffer was sized to the known source size; no probe read
            // is needed to learn that this is everything.
            self.eof = true;
        }
        Ok(total)
    }
}
