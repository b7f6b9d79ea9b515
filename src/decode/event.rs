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

//! Codec session events and the subscription bitset.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// An event surfaced by [`CodecSession::process`](super::CodecSession::process).
///
/// Bit values of the informative events match the backing library's event
/// mask so a subscription set is a plain bitwise OR.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Processing finished; the whole requested stream was handled.
    Success = 0x1,
    /// The codec failed; the session is unusable until a rewind.
    Error = 0x2,
    /// The input window is exhausted; hand over more bytes.
    NeedMoreInput = 0x4,
    /// The current frame needs an image output buffer before pixels can be
    /// produced.
    NeedImageOutBuffer = 0x8,
    /// The JPEG output buffer is full; release, grow and re-set it.
    JpegNeedMoreOutput = 0x10,
    /// The box output buffer is full; release, grow and re-set it.
    BoxNeedMoreOutput = 0x20,
    /// Basic information is available. One-shot per open.
    BasicInfo = 0x40,
    /// Color profiles are available. One-shot per open.
    ColorEncoding = 0x100,
    /// A frame header is available.
    Frame = 0x400,
    /// The current frame's pixels were fully written to the output buffers.
    FullImage = 0x1000,
    /// JPEG reconstruction data begins; a JPEG output buffer is wanted.
    JpegReconstruction = 0x2000,
    /// A box header is available.
    Box = 0x4000,
}

impl Event {
    /// Whether the event may appear in a subscription set.
    #[must_use]
    pub fn subscribable(self) -> bool {
        EventSet::SUBSCRIBABLE.contains(self)
    }
}

/// A set of [`Event`]s, used both for subscriptions and for
/// `process_until` stop conditions.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSet(u32);

impl EventSet {
    /// The empty set.
    pub const EMPTY: EventSet = EventSet(0);

    /// Events the codec accepts subscriptions for.
    pub const SUBSCRIBABLE: EventSet = EventSet(
        Event::BasicInfo as u32
            | Event::ColorEncoding as u32
            | Event::Frame as u32
            | Event::FullImage as u32
            | Event::JpegReconstruction as u32
            | Event::Box as u32,
    );

    /// A set holding a single event.
    #[must_use]
    pub fn only(event: Event) -> Self {
        EventSet(event as u32)
    }

    /// Whether `event` is in the set.
    #[must_use]
    pub fn contains(self, event: Event) -> bool {
        self.0 & event as u32 != 0
    }

    /// The set with `event` added.
    #[must_use]
    pub fn with(self, event: Event) -> Self {
        EventSet(self.0 | event as u32)
    }

    /// The set with `event` removed.
    #[must_use]
    pub fn without(self, event: Event) -> Self {
        EventSet(self.0 & !(event as u32))
    }

    /// Whether no event is in the set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: EventSet) -> EventSet {
        EventSet(self.0 | rhs.0)
    }
}

impl BitOr<Event> for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: Event) -> EventSet {
        self.with(rhs)
    }
}

impl BitOrAssign<Event> for EventSet {
    fn bitor_assign(&mut self, rhs: Event) {
        *self = self.with(rhs);
    }
}

impl From<Event> for EventSet {
    fn from(event: Event) -> Self {
        EventSet::only(event)
    }
}

impl fmt::Debug for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventSet({:#x})", self.0)
    }
}
