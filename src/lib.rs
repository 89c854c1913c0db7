//! # Overview
//!
//! `smfread` is a strict decoder for Standard Midi Files (SMF, `.mid` files).
//! It turns an immutable byte buffer into a validated in-memory tree: a [`Header`](struct.Header.html)
//! and a list of [`Track`](struct.Track.html)s, each one an ordered list of timed events.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use smfread::Smf;
//!
//! # let bytes: &[u8] = &[
//! #     b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96,
//! #     b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00,
//! # ];
//! let smf = Smf::parse(bytes).unwrap();
//!
//! for track in smf.tracks.iter() {
//!     println!("track {} has {} events", track.track_number, track.events.len());
//! }
//! ```
//!
//! When loading a file, the bytes must be owned separately from the `Smf` structure, since
//! events borrow their raw data from the input buffer:
//!
//! ```rust,no_run
//! use std::fs;
//! use smfread::Smf;
//!
//! // Load bytes into a buffer
//! let bytes = fs::read("song.mid").unwrap();
//!
//! // Parse bytes in a separate step
//! let smf = Smf::parse(&bytes).unwrap();
//! ```
//!
//! # Errors
//!
//! Decoding is strict: any malformed event aborts the track it belongs to, since the alignment of
//! every event after it would be unknown.
//! [`Smf::parse`](struct.Smf.html#method.parse) fails the whole file on the first failing track,
//! while [`Smf::parse_partial`](struct.Smf.html#method.parse_partial) keeps the tracks decoded
//! before the failure and hands back the error alongside them.
//!
//! Errors carry a typed [`ErrorKind`](enum.ErrorKind.html) and the byte offset where they were
//! detected.
//!
//! # About features
//!
//! - The `parallel` feature (enabled by default)
//!
//!   Decodes the tracks of large files on the `rayon` thread pool. Track bodies are disjoint
//!   slices of the input, so no synchronization is involved.
//!
//! - The `strict` feature
//!
//!   Rejects files whose track count disagrees with the header, or single-track files with more
//!   than one track. Without it these are only reported through `tracing` warnings.
//!
//! # Lower level building blocks
//!
//! The decoders for each layer are also exposed: [`VariableLengthValue`](struct.VariableLengthValue.html),
//! the channel voice message types (see [`ChannelVoice`](trait.ChannelVoice.html)), the meta
//! event decoder [`MetaEvent::decode`](struct.MetaEvent.html#method.decode), and the standalone
//! [`IntBuilder`](struct.IntBuilder.html) for interpreting raw byte runs as integers.

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// Typed decode errors and their context chains.
#[macro_use]
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{Error, ErrorKind, Result, ResultExt, StdResult},
        io::Cursor,
        primitive::{u14, u2, u24, u4, u7, IntRead, VariableLengthValue},
    };
    pub(crate) use core::{convert::TryFrom, fmt, mem};

    pub(crate) fn bit_range<T>(val: T, range: core::ops::Range<u32>) -> T
    where
        T: From<u8>
            + core::ops::Shr<u32, Output = T>
            + core::ops::Shl<u32, Output = T>
            + core::ops::Not<Output = T>
            + core::ops::BitAnd<Output = T>,
    {
        let mask = !((!T::from(0)) << (range.end - range.start));
        (val >> range.start) & mask
    }
}

mod channel;
mod event;
mod integer;
pub mod io;
mod meta;
mod primitive;
mod riff;
mod smf;

pub use crate::{
    channel::{
        controller_info, decode_left_right, note_name, ChannelEvent, ChannelPressure,
        ChannelVoice, ControlChange, ControllerInfo, Direction, NoteOff, NoteOn, PitchBend,
        PolyphonicAftertouch, ProgramChange, CONTROLLERS, NOTE_NAMES,
    },
    error::{Error, ErrorKind, Result},
    event::{EventKind, TrackEvent},
    integer::{CType, IntBuilder, WideUint},
    meta::{
        EndOfTrack, KeySignature, MetaEvent, MetaMessage, Mode, SequenceNumber, SetTempo,
        SmpteOffset, TextKind, TimeSignature, KEY_NAMES,
    },
    primitive::{ByteOrder, Format, Fps, Timing, VariableLengthValue},
    smf::{parse, EventIter, Header, PartialSmf, Smf, Track, TrackIter},
};

/// Bit-limited integer types used in decoded fields.
pub mod num {
    pub use crate::primitive::{u14, u15, u2, u24, u4, u7};
}

#[cfg(test)]
mod test;
