// Copyright 2026 The mdcore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// One of the three interchangeable wire framings.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Protocol {
    Xml,
    MarketFeed,
    Binary,
}

/// Recovers the framing a sender used from the first byte of an inbound
/// buffer (§6.2): `<` is XML, the MarketFeed field separator `0x1C` is
/// MarketFeed, anything else is binary. Returns `None` on an empty buffer.
pub fn detect_protocol(buf: &[u8]) -> Option<Protocol> {
    match buf.first()? {
        b'<' => Some(Protocol::Xml),
        0x1C => Some(Protocol::MarketFeed),
        _ => Some(Protocol::Binary),
    }
}

/// Result of attempting to cut one whole message's span off the front of a
/// growing buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// A complete message occupies `buf[..len]`.
    Complete { len: usize },
    /// Not enough bytes yet. `hint`, when known, is how many additional
    /// bytes the caller should read before retrying -- always available for
    /// binary framing, never for XML, sometimes for MarketFeed.
    NeedMore { hint: Option<usize> },
    /// The framing is inconsistent in a way that cannot be resynchronized;
    /// the caller should drop the connection.
    BadFraming,
}

/// Cuts whole-message spans off a growing byte buffer without copying.
/// Implementations never retain or clone the buffer across calls; each call
/// answers purely from the bytes it was given.
pub trait Framer {
    fn protocol(&self) -> Protocol;

    /// Looks for one complete message at the front of `buf`.
    fn frame(&self, buf: &[u8]) -> FrameOutcome;
}
