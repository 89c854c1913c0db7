//! Meta events and their decoders.
//!
//! A meta event is framed as `0xFF <type> <length> <payload>`, where `length` is a variable-length
//! value. Each known type byte maps to an entry of a static table holding the payload length the
//! type requires (if fixed) and the function decoding the payload.

use crate::{prelude::*, primitive::Fps};

/// Key names by `signature_index + 7`, from 7 flats to 7 sharps.
pub const KEY_NAMES: [&str; 15] = [
    "Cb", "Fb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];

/// A decoded meta event, along with its framing.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct MetaEvent<'a> {
    /// The meta type byte, following the `0xFF` prefix.
    pub meta_type: u8,
    /// The declared payload length.
    pub length: u64,
    /// The exact payload bytes.
    pub raw_content: &'a [u8],
    pub message: MetaMessage<'a>,
}
impl<'a> MetaEvent<'a> {
    /// Decode a meta event from a cursor placed right after the `0xFF` prefix.
    ///
    /// Fails with `EventLength` if the declared length is not the one the type requires, and with
    /// `UnexpectedEndOfData` if the payload is shorter than declared.
    pub fn decode(raw: &mut Cursor<'a>) -> Result<MetaEvent<'a>> {
        let meta_type = u8::read(raw).context(err_invalid!("failed to read meta event type"))?;
        let len_pos = raw.position();
        let length = VariableLengthValue::read(raw)
            .context(err_invalid!("failed to read meta event length"))?
            .checked_u64("meta event length")
            .map_err(|kind| Error::at(kind, len_pos))?;
        let decoder = MetaDecoder::lookup(meta_type);
        if let Some(expected) = decoder.and_then(|dec| dec.length) {
            ensure!(
                length == expected as u64,
                Error::at(
                    ErrorKind::EventLength {
                        meta_type,
                        expected,
                        found: length,
                    },
                    len_pos
                )
            );
        }
        let content_pos = raw.position();
        let len = usize::try_from(length)
            .map_err(|_| Error::at(err_range!("meta event length", length), len_pos))?;
        let raw_content = raw
            .read(len)
            .context(err_invalid!("truncated meta event payload"))?;
        let message = match decoder {
            Some(dec) => (dec.decode)(meta_type, raw_content)
                .map_err(|kind| Error::at(kind, content_pos))
                .context(err_invalid!(dec.name))?,
            None => MetaMessage::Unknown {
                type_byte: meta_type,
                data: raw_content,
            },
        };
        Ok(MetaEvent {
            meta_type,
            length,
            raw_content,
            message,
        })
    }

    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        matches!(self.message, MetaMessage::EndOfTrack(_))
    }
}

/// The payload of a meta event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MetaMessage<'a> {
    SequenceNumber(SequenceNumber),
    /// Any of the text-bearing meta events.
    Text { kind: TextKind, text: &'a str },
    /// The MIDI channel that the following events are associated with.
    ChannelPrefix(u4),
    /// Number of the MIDI port that this track was intended to be played with.
    MidiPort(u7),
    EndOfTrack(EndOfTrack),
    SetTempo(SetTempo),
    SmpteOffset(SmpteOffset),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    /// Arbitrary data intended for the sequencer.
    SequencerSpecific(&'a [u8]),
    /// A meta event of an unknown type, with its payload.
    Unknown { type_byte: u8, data: &'a [u8] },
}

type DecodeFn = for<'a> fn(u8, &'a [u8]) -> StdResult<MetaMessage<'a>, ErrorKind>;

struct MetaDecoder {
    type_byte: u8,
    /// The payload length this type requires, or `None` for variable-length payloads.
    length: Option<usize>,
    name: &'static str,
    decode: DecodeFn,
}
impl MetaDecoder {
    fn lookup(type_byte: u8) -> Option<&'static MetaDecoder> {
        META_DECODERS
            .binary_search_by_key(&type_byte, |dec| dec.type_byte)
            .ok()
            .map(|idx| &META_DECODERS[idx])
    }
}

macro_rules! meta_decoders {
    {$( $type_byte:expr, $length:expr, $name:expr => $decode:expr; )*} => {
        /// Sorted by type byte.
        static META_DECODERS: &[MetaDecoder] = &[$(
            MetaDecoder {
                type_byte: $type_byte,
                length: $length,
                name: $name,
                decode: $decode,
            },
        )*];
    };
}
meta_decoders! {
    0x00, Some(2), "failed to decode sequence number" => SequenceNumber::decode;
    0x01, None, "failed to decode text event" => decode_text;
    0x02, None, "failed to decode copyright notice" => decode_text;
    0x03, None, "failed to decode track name" => decode_text;
    0x04, None, "failed to decode instrument name" => decode_text;
    0x05, None, "failed to decode lyric" => decode_text;
    0x06, None, "failed to decode marker" => decode_text;
    0x07, None, "failed to decode cue point" => decode_text;
    0x08, None, "failed to decode program name" => decode_text;
    0x09, None, "failed to decode device name" => decode_text;
    0x20, Some(1), "failed to decode channel prefix" => decode_channel_prefix;
    0x21, Some(1), "failed to decode midi port" => decode_midi_port;
    0x2F, Some(0), "failed to decode end of track" => EndOfTrack::decode;
    0x51, Some(3), "failed to decode tempo" => SetTempo::decode;
    0x54, Some(5), "failed to decode smpte offset" => SmpteOffset::decode;
    0x58, Some(4), "failed to decode time signature" => TimeSignature::decode;
    0x59, Some(2), "failed to decode key signature" => KeySignature::decode;
    0x7F, None, "failed to decode sequencer specific event" => decode_sequencer_specific;
}

/// The different kinds of text-bearing meta events.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TextKind {
    /// Arbitrary text associated to an instant.
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    /// Name of the device that this track was intended to be played with.
    DeviceName,
}
impl TextKind {
    pub fn from_type_byte(type_byte: u8) -> Option<TextKind> {
        Some(match type_byte {
            0x01 => TextKind::Text,
            0x02 => TextKind::Copyright,
            0x03 => TextKind::TrackName,
            0x04 => TextKind::InstrumentName,
            0x05 => TextKind::Lyric,
            0x06 => TextKind::Marker,
            0x07 => TextKind::CuePoint,
            0x08 => TextKind::ProgramName,
            0x09 => TextKind::DeviceName,
            _ => return None,
        })
    }

    pub fn type_byte(self) -> u8 {
        match self {
            TextKind::Text => 0x01,
            TextKind::Copyright => 0x02,
            TextKind::TrackName => 0x03,
            TextKind::InstrumentName => 0x04,
            TextKind::Lyric => 0x05,
            TextKind::Marker => 0x06,
            TextKind::CuePoint => 0x07,
            TextKind::ProgramName => 0x08,
            TextKind::DeviceName => 0x09,
        }
    }
}

fn decode_text(type_byte: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
    let kind = TextKind::from_type_byte(type_byte).ok_or(err_invalid!("not a text event"))?;
    if let Some(offset) = data.iter().position(|byte| !byte.is_ascii()) {
        return Err(ErrorKind::EventText {
            byte: data[offset],
            offset,
        });
    }
    let text = core::str::from_utf8(data).map_err(|_| err_invalid!("invalid text"))?;
    Ok(MetaMessage::Text { kind, text })
}

fn decode_channel_prefix(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
    Ok(MetaMessage::ChannelPrefix(u4::check_int(
        data[0],
        "channel prefix",
    )?))
}

fn decode_midi_port(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
    Ok(MetaMessage::MidiPort(u7::check_int(data[0], "midi port")?))
}

fn decode_sequencer_specific(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
    Ok(MetaMessage::SequencerSpecific(data))
}

/// The number of a sequence, or of a pattern in sequential files.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SequenceNumber {
    pub sequence_number: u16,
}
impl SequenceNumber {
    fn decode(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        Ok(MetaMessage::SequenceNumber(SequenceNumber {
            sequence_number: u16::from_be_bytes([data[0], data[1]]),
        }))
    }
}

/// Marks the end of a track. Obligatory as the last event of every track.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct EndOfTrack;
impl EndOfTrack {
    fn decode(_: u8, _: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        Ok(MetaMessage::EndOfTrack(EndOfTrack))
    }
}

/// Amount of microseconds per quarter note.
///
/// Usually appears at the beginning of a track, before any channel events, but there are no
/// guarantees.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SetTempo {
    pub tpqm: u24,
}
impl SetTempo {
    fn decode(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        let tpqm = data
            .iter()
            .fold(0, |acc, &byte| acc << 8 | byte as u32);
        ensure!(tpqm != 0, err_range!("tempo", tpqm));
        Ok(MetaMessage::SetTempo(SetTempo {
            tpqm: u24::from(tpqm),
        }))
    }

    /// Beats (quarter notes) per minute.
    #[inline]
    pub fn tempo_bpm(&self) -> f64 {
        60_000_000.0 / self.tpqm.as_int() as f64
    }
}

/// The starting point of a track, as an SMPTE time.
///
/// The first byte packs the frame rate code in bits 5-6 along with the hours, the top bit is
/// reserved.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SmpteOffset {
    pub rate: Fps,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    /// The frame count within the second, 5 bits.
    ///
    /// Some SMPTE offset layouts name this field `fps`, though it is a count. The rate is `rate`.
    pub frames: u8,
    /// Hundredths of a frame.
    pub fractional_frames: u8,
}
impl SmpteOffset {
    fn decode(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        fn reserved(field: &'static str, byte: u8, free_bits: u32) -> StdResult<u8, ErrorKind> {
            let bits = byte & !((1u8 << free_bits) - 1);
            ensure!(bits == 0, ErrorKind::MalformedReservedBits { field, bits });
            Ok(byte)
        }
        let hour_byte = reserved("hours", data[0], 7)?;
        let rate = Fps::from_code(u2::from(bit_range(hour_byte, 5..7)));
        let hours = bit_range(hour_byte, 0..5);
        let minutes = reserved("minutes", data[1], 6)?;
        let seconds = reserved("seconds", data[2], 6)?;
        let frames = reserved("frames", data[3], 5)?;
        ensure!(hours < 24, err_range!("smpte hours", hours));
        ensure!(minutes < 60, err_range!("smpte minutes", minutes));
        ensure!(seconds < 60, err_range!("smpte seconds", seconds));
        Ok(MetaMessage::SmpteOffset(SmpteOffset {
            rate,
            hours,
            minutes,
            seconds,
            frames,
            fractional_frames: data[4],
        }))
    }
}

/// A time signature, as `numerator / 2^denominator`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TimeSignature {
    pub numerator: u8,
    /// The denominator, as a power-of-two exponent.
    pub denominator: u8,
    /// MIDI clocks per metronome click.
    pub clocks_per_tick: u8,
    /// 32nd notes per quarter note.
    pub notes_per_quarter: u8,
}
impl TimeSignature {
    fn decode(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        Ok(MetaMessage::TimeSignature(TimeSignature {
            numerator: data[0],
            denominator: data[1],
            clocks_per_tick: data[2],
            notes_per_quarter: data[3],
        }))
    }

    /// The actual denominator `2^denominator`, if it fits in a `u32`.
    pub fn denominator_value(&self) -> Option<u32> {
        1u32.checked_shl(self.denominator as u32)
    }
}
impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.denominator_value() {
            Some(den) => write!(f, "{}/{}", self.numerator, den),
            None => write!(f, "{}/2^{}", self.numerator, self.denominator),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// A key signature.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct KeySignature {
    /// Negative numbers indicate an amount of flats, positive numbers an amount of sharps.
    pub signature_index: i8,
    pub major_minor: Mode,
}
impl KeySignature {
    fn decode(_: u8, data: &[u8]) -> StdResult<MetaMessage, ErrorKind> {
        let signature_index = data[0] as i8;
        ensure!(
            (-7..=7).contains(&signature_index),
            err_range!("key signature index", signature_index)
        );
        let major_minor = match data[1] {
            0 => Mode::Major,
            1 => Mode::Minor,
            mode => bail!(err_range!("key signature mode", mode)),
        };
        Ok(MetaMessage::KeySignature(KeySignature {
            signature_index,
            major_minor,
        }))
    }

    /// The name of the major key with this amount of sharps or flats.
    ///
    /// `None` if `signature_index` is outside `-7..=7`, which only hand-built values can be.
    pub fn name(&self) -> Option<&'static str> {
        let idx = self.signature_index.checked_add(7)?;
        KEY_NAMES.get(usize::try_from(idx).ok()?).copied()
    }
}
