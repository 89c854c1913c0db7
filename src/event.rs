//! All sort of events and their parsers.

use crate::{channel::ChannelEvent, meta::MetaEvent, prelude::*, primitive::read_varlen_slice};

/// Represents a parsed SMF track event.
///
/// Consists of a delta time (in MIDI ticks relative to the previous event), the exact bytes the
/// event was decoded from and the actual event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TrackEvent<'a> {
    /// How many MIDI ticks after the previous event should this event fire.
    pub delta: u64,
    /// The span of the track chunk this event was decoded from, delta-time included.
    ///
    /// For events using running status this does not include the status byte, since it was never
    /// present in the track.
    pub bytes: &'a [u8],
    /// The type of event along with event-specific data.
    pub kind: EventKind<'a>,
}
impl<'a> TrackEvent<'a> {
    /// The amount of track bytes this event took.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.bytes.len()
    }
}

/// Represents the different kinds of SMF events and their associated data.
///
/// It notably does *not* include the timing of the event; the `TrackEvent` struct is responsible
/// for this.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum EventKind<'a> {
    /// A message associated to a MIDI channel carrying musical data.
    ///
    /// Usually, the bulk of MIDI data is these kind of messages.
    Channel(ChannelEvent),
    /// A meta event, giving extra information for correct playback, like tempo, song name,
    /// lyrics, etc...
    Meta(MetaEvent<'a>),
    /// A System Exclusive message, carrying arbitrary data.
    ///
    /// The data bytes included here do not include the implicit `0xF0` prefix.
    SysEx(&'a [u8]),
    /// An escape sequence, intended to send arbitrary data to the MIDI synthesizer.
    Escape(&'a [u8]),
}
impl<'a> EventKind<'a> {
    /// Read the data bytes of a channel voice message with the given status.
    pub(crate) fn read_channel(status: u8, raw: &mut Cursor<'a>) -> Result<EventKind<'a>> {
        let pos = raw.position();
        let data = raw
            .read(ChannelEvent::data_len(status))
            .context(err_invalid!("truncated channel message"))?;
        let msg = ChannelEvent::decode(status, data).map_err(|err| err.or_at(pos))?;
        Ok(EventKind::Channel(msg))
    }

    /// Read a sysex or escape event, with the cursor right after the status byte.
    pub(crate) fn read_sysex(status: u8, raw: &mut Cursor<'a>) -> Result<EventKind<'a>> {
        Ok(match status {
            0xF0 => EventKind::SysEx(
                read_varlen_slice(raw).context(err_invalid!("failed to read sysex event"))?,
            ),
            _ => EventKind::Escape(
                read_varlen_slice(raw).context(err_invalid!("failed to read escape event"))?,
            ),
        })
    }

    /// Whether this is the end of track meta event.
    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        match self {
            EventKind::Meta(meta) => meta.is_end_of_track(),
            _ => false,
        }
    }
}
