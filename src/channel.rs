//! Channel voice messages, the musical payload of a track.

use crate::{prelude::*, primitive::ByteOrder};

/// Note names within an octave, indexed by `note % 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Get the name of a MIDI note number, ignoring the octave.
///
/// Fails with a range error for notes above 127.
pub fn note_name(note: u8) -> Result<&'static str> {
    let note = u7::check_int(note, "note number")?;
    Ok(NOTE_NAMES[(note.as_int() % 12) as usize])
}

/// The amount of significant bytes in a packed message.
fn packed_width(packed: u128) -> usize {
    (128 - packed.leading_zeros() as usize + 7) / 8
}

/// Split a packed message into its status byte and data bytes, checking its width.
fn unpack(packed: u128, data_len: usize) -> Result<(u8, Vec<u8>)> {
    let width = packed_width(packed);
    ensure!(
        width == data_len + 1,
        ErrorKind::Length {
            expected: data_len + 1,
            found: width,
        }
    );
    let bytes = packed.to_be_bytes();
    let msg = &bytes[bytes.len() - width..];
    Ok((msg[0], msg[1..].to_vec()))
}

/// Validate the status and data bytes of a message, yielding the data as 7-bit integers.
fn check_parts(indicator: u8, data_len: usize, status: u8, data: &[u8]) -> Result<[u7; 2]> {
    ensure!(
        status & 0xF0 == indicator,
        ErrorKind::InvalidStatus {
            expected: indicator,
            found: status,
        }
    );
    ensure!(
        data.len() == data_len,
        ErrorKind::Length {
            expected: data_len,
            found: data.len(),
        }
    );
    let mut out = [u7::new(0); 2];
    for (out, &byte) in out.iter_mut().zip(data) {
        *out = u7::check_int(byte, "data byte")?;
    }
    Ok(out)
}

/// The combined status and data bytes, as a single big-endian integer.
fn pack(status: u8, data: &[u8]) -> u32 {
    data.iter()
        .fold(status as u32, |acc, &byte| acc << 8 | byte as u32)
}

/// Shared interface of the channel voice message types.
///
/// Messages can be built from their parts (as the track decoder does) or from a single integer
/// holding the status byte followed by the data bytes, most significant first (`0x903C40` is a
/// note on for note 60 at velocity 64 on channel 0).
pub trait ChannelVoice: Sized {
    /// The high nibble of the status byte identifying this message type.
    const INDICATOR: u8;
    /// The amount of data bytes following the status byte.
    const DATA_LEN: usize;

    /// Build the message from its status byte and data bytes.
    ///
    /// Fails with `InvalidStatus` if the status does not belong to this message type, with
    /// `Length` if the amount of data bytes is wrong, and with `Range` if a data byte has its top
    /// bit set.
    fn from_parts(status: u8, data: &[u8]) -> Result<Self>;

    /// The channel this message is addressed to.
    fn channel_number(&self) -> u4;

    /// The status and data bytes as a single integer.
    fn raw_data(&self) -> u32;

    /// Whether a packed message has the width and status of this message type.
    fn valid(packed: u128) -> bool {
        packed_width(packed) == Self::DATA_LEN + 1
            && (packed >> (8 * Self::DATA_LEN)) as u8 & 0xF0 == Self::INDICATOR
    }

    /// Build the message from a packed integer.
    fn from_packed(packed: u128) -> Result<Self> {
        let (status, data) = unpack(packed, Self::DATA_LEN)?;
        ensure!(
            Self::valid(packed),
            ErrorKind::InvalidStatus {
                expected: Self::INDICATOR,
                found: status,
            }
        );
        Self::from_parts(status, &data)
    }
}

/// Stop playing a note.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct NoteOff {
    pub channel_number: u4,
    pub note_number: u7,
    pub note_name: &'static str,
    /// The velocity with which the key was released.
    pub note_velocity: u7,
    pub raw_data: u32,
}
impl ChannelVoice for NoteOff {
    const INDICATOR: u8 = 0x80;
    const DATA_LEN: usize = 2;

    fn from_parts(status: u8, data: &[u8]) -> Result<NoteOff> {
        let [note, vel] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        Ok(NoteOff {
            channel_number: u4::from(status),
            note_number: note,
            note_name: note_name(note.as_int())?,
            note_velocity: vel,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Start playing a note.
///
/// By convention a velocity of 0 is equivalent to a `NoteOff`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct NoteOn {
    pub channel_number: u4,
    pub note_number: u7,
    pub note_name: &'static str,
    pub note_velocity: u7,
    pub raw_data: u32,
}
impl ChannelVoice for NoteOn {
    const INDICATOR: u8 = 0x90;
    const DATA_LEN: usize = 2;

    fn from_parts(status: u8, data: &[u8]) -> Result<NoteOn> {
        let [note, vel] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        Ok(NoteOn {
            channel_number: u4::from(status),
            note_number: note,
            note_name: note_name(note.as_int())?,
            note_velocity: vel,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Modify the pressure on a note after it has been played.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PolyphonicAftertouch {
    pub channel_number: u4,
    pub note_number: u7,
    pub note_name: &'static str,
    pub pressure: u7,
    pub raw_data: u32,
}
impl ChannelVoice for PolyphonicAftertouch {
    const INDICATOR: u8 = 0xA0;
    const DATA_LEN: usize = 2;

    fn from_parts(status: u8, data: &[u8]) -> Result<PolyphonicAftertouch> {
        let [note, pressure] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        Ok(PolyphonicAftertouch {
            channel_number: u4::from(status),
            note_number: note,
            note_name: note_name(note.as_int())?,
            pressure,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Modify the value of a MIDI controller.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ControlChange {
    pub channel_number: u4,
    /// The controller to modify, see [`controller_info`](fn.controller_info.html).
    pub controller: u7,
    pub value: u7,
    /// For balance and pan controllers, the direction the value points to.
    pub direction: Option<Direction>,
    pub raw_data: u32,
}
impl ControlChange {
    /// Registry information about the modified controller, if it is a known one.
    pub fn info(&self) -> Option<&'static ControllerInfo> {
        controller_info(self.controller.as_int())
    }
}
impl ChannelVoice for ControlChange {
    const INDICATOR: u8 = 0xB0;
    const DATA_LEN: usize = 2;

    fn from_parts(status: u8, data: &[u8]) -> Result<ControlChange> {
        let [controller, value] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        let direction = match controller_info(controller.as_int()).and_then(|info| info.decoder) {
            Some(decode) => Some(decode(value.as_int())?),
            None => None,
        };
        Ok(ControlChange {
            channel_number: u4::from(status),
            controller,
            value,
            direction,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Change the program (also known as instrument) for a channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ProgramChange {
    pub channel_number: u4,
    pub program: u7,
    pub raw_data: u32,
}
impl ChannelVoice for ProgramChange {
    const INDICATOR: u8 = 0xC0;
    const DATA_LEN: usize = 1;

    fn from_parts(status: u8, data: &[u8]) -> Result<ProgramChange> {
        let [program, _] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        Ok(ProgramChange {
            channel_number: u4::from(status),
            program,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Change the pressure of a whole channel at once, without starting new notes.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ChannelPressure {
    pub channel_number: u4,
    pub pressure: u7,
    pub raw_data: u32,
}
impl ChannelVoice for ChannelPressure {
    const INDICATOR: u8 = 0xD0;
    const DATA_LEN: usize = 1;

    fn from_parts(status: u8, data: &[u8]) -> Result<ChannelPressure> {
        let [pressure, _] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        Ok(ChannelPressure {
            channel_number: u4::from(status),
            pressure,
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// Set the pitch bend value for the entire channel.
///
/// A `bend_amount` of `0x0000` indicates full bend downwards, `0x2000` no bend and `0x3FFF` full
/// bend upwards.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PitchBend {
    pub channel_number: u4,
    pub bend_amount: u14,
    pub raw_data: u32,
}
impl PitchBend {
    /// The `bend_amount` that indicates no bend.
    pub const CENTER: u16 = 0x2000;

    /// Returns an int in the range `[-0x2000, 0x1FFF]`.
    #[inline]
    pub fn as_int(&self) -> i16 {
        self.bend_amount.as_int() as i16 - Self::CENTER as i16
    }

    /// Returns an `f32` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.as_int() as f32 * (1.0 / Self::CENTER as f32)
    }

    /// Returns an `f64` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.as_int() as f64 * (1.0 / Self::CENTER as f64)
    }
}
impl ChannelVoice for PitchBend {
    const INDICATOR: u8 = 0xE0;
    const DATA_LEN: usize = 2;

    fn from_parts(status: u8, data: &[u8]) -> Result<PitchBend> {
        let [lsb, msb] = check_parts(Self::INDICATOR, Self::DATA_LEN, status, data)?;
        //Note the little-endian order, contrasting with the default big-endian order of
        //Standard Midi Files
        let bend = (msb.as_int() as u16) << 7 | lsb.as_int() as u16;
        Ok(PitchBend {
            channel_number: u4::from(status),
            bend_amount: u14::from(bend),
            raw_data: pack(status, data),
        })
    }
    fn channel_number(&self) -> u4 {
        self.channel_number
    }
    fn raw_data(&self) -> u32 {
        self.raw_data
    }
}

/// A channel voice message of any type.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ChannelEvent {
    NoteOff(NoteOff),
    NoteOn(NoteOn),
    PolyphonicAftertouch(PolyphonicAftertouch),
    ControlChange(ControlChange),
    ProgramChange(ProgramChange),
    ChannelPressure(ChannelPressure),
    PitchBend(PitchBend),
}
impl ChannelEvent {
    /// The amount of data bytes following a channel voice status byte.
    ///
    /// Returns `0` for statuses that are not channel voice statuses.
    pub fn data_len(status: u8) -> usize {
        const LENGTH_BY_STATUS: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];
        LENGTH_BY_STATUS[(status >> 4) as usize] as usize
    }

    /// Decode a message from its status byte and data bytes.
    pub fn decode(status: u8, data: &[u8]) -> Result<ChannelEvent> {
        Ok(match status >> 4 {
            0x8 => ChannelEvent::NoteOff(NoteOff::from_parts(status, data)?),
            0x9 => ChannelEvent::NoteOn(NoteOn::from_parts(status, data)?),
            0xA => {
                ChannelEvent::PolyphonicAftertouch(PolyphonicAftertouch::from_parts(status, data)?)
            }
            0xB => ChannelEvent::ControlChange(ControlChange::from_parts(status, data)?),
            0xC => ChannelEvent::ProgramChange(ProgramChange::from_parts(status, data)?),
            0xD => ChannelEvent::ChannelPressure(ChannelPressure::from_parts(status, data)?),
            0xE => ChannelEvent::PitchBend(PitchBend::from_parts(status, data)?),
            _ => bail!(err_invalid!("not a channel voice status")),
        })
    }

    /// Decode a message from a packed integer, using its most significant byte as the status.
    pub fn from_packed(packed: u128) -> Result<ChannelEvent> {
        let status = (packed >> (8 * (packed_width(packed).max(1) - 1))) as u8;
        let data_len = Self::data_len(status);
        ensure!(data_len != 0, err_invalid!("not a channel voice status"));
        let (status, data) = unpack(packed, data_len)?;
        Self::decode(status, &data)
    }

    /// The status nibble of this message type, in the high nibble.
    pub fn indicator(&self) -> u8 {
        match self {
            ChannelEvent::NoteOff(_) => NoteOff::INDICATOR,
            ChannelEvent::NoteOn(_) => NoteOn::INDICATOR,
            ChannelEvent::PolyphonicAftertouch(_) => PolyphonicAftertouch::INDICATOR,
            ChannelEvent::ControlChange(_) => ControlChange::INDICATOR,
            ChannelEvent::ProgramChange(_) => ProgramChange::INDICATOR,
            ChannelEvent::ChannelPressure(_) => ChannelPressure::INDICATOR,
            ChannelEvent::PitchBend(_) => PitchBend::INDICATOR,
        }
    }

    pub fn channel_number(&self) -> u4 {
        match self {
            ChannelEvent::NoteOff(msg) => msg.channel_number,
            ChannelEvent::NoteOn(msg) => msg.channel_number,
            ChannelEvent::PolyphonicAftertouch(msg) => msg.channel_number,
            ChannelEvent::ControlChange(msg) => msg.channel_number,
            ChannelEvent::ProgramChange(msg) => msg.channel_number,
            ChannelEvent::ChannelPressure(msg) => msg.channel_number,
            ChannelEvent::PitchBend(msg) => msg.channel_number,
        }
    }

    pub fn raw_data(&self) -> u32 {
        match self {
            ChannelEvent::NoteOff(msg) => msg.raw_data,
            ChannelEvent::NoteOn(msg) => msg.raw_data,
            ChannelEvent::PolyphonicAftertouch(msg) => msg.raw_data,
            ChannelEvent::ControlChange(msg) => msg.raw_data,
            ChannelEvent::ProgramChange(msg) => msg.raw_data,
            ChannelEvent::ChannelPressure(msg) => msg.raw_data,
            ChannelEvent::PitchBend(msg) => msg.raw_data,
        }
    }
}

/// Where a balance or pan value points to.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    Left,
    Center,
    Right,
}
impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Center => "center",
            Direction::Right => "right",
        }
    }
}
impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a balance or pan value: `0..=63` is left, `64` is center and `65..=127` is right.
pub fn decode_left_right(value: u8) -> Result<Direction> {
    Ok(match value {
        0..=63 => Direction::Left,
        64 => Direction::Center,
        65..=127 => Direction::Right,
        _ => bail!(err_range!("left/right value", value)),
    })
}

/// Static information about a MIDI controller number.
#[derive(Copy, Clone, Debug)]
pub struct ControllerInfo {
    pub number: u8,
    pub name: &'static str,
    /// The order in which coarse/fine controller pairs combine.
    pub byte_order: ByteOrder,
    /// Interprets the controller value, for controllers with a meaningful interpretation.
    pub decoder: Option<fn(u8) -> Result<Direction>>,
}

macro_rules! controllers {
    (@decoder) => { None };
    (@decoder $decoder:expr) => { Some($decoder) };
    {$( $num:expr => $name:expr $(, $decoder:expr)? ;)*} => {
        /// The known MIDI controllers, sorted by controller number.
        pub static CONTROLLERS: &[ControllerInfo] = &[$(
            ControllerInfo {
                number: $num,
                name: $name,
                byte_order: ByteOrder::BigEndian,
                decoder: controllers!(@decoder $($decoder)?),
            },
        )*];
    };
}
controllers! {
    0x00 => "Bank Select";
    0x01 => "Modulation Wheel";
    0x02 => "Breath Control";
    0x03 => "undefined";
    0x04 => "Foot Controller";
    0x05 => "Portamento Time";
    0x06 => "Data Entry";
    0x07 => "Channel Volume";
    0x08 => "Balance", decode_left_right;
    0x09 => "undefined";
    0x0A => "Pan", decode_left_right;
    0x0B => "Expression";
    0x0C => "Effect Controller 1";
    0x0D => "Effect Controller 2";
    0x0E => "General Purpose";
    0x0F => "General Purpose";
    0x10 => "General Purpose";
    0x11 => "General Purpose";
    0x12 => "General Purpose";
    0x13 => "General Purpose";
    0x40 => "Damper Pedal";
    0x41 => "Portamento On/Off";
    0x42 => "Sostenuto";
    0x43 => "Soft Pedal";
    0x78 => "All Sound Off";
    0x79 => "Reset All Controllers";
    0x7A => "Local Control";
    0x7B => "All Notes Off";
    0x7C => "Omni Mode Off";
    0x7D => "Omni Mode On";
    0x7E => "Mono Mode On";
    0x7F => "Poly Mode On";
}

/// Look up a controller number in [`CONTROLLERS`](static.CONTROLLERS.html).
pub fn controller_info(number: u8) -> Option<&'static ControllerInfo> {
    CONTROLLERS
        .binary_search_by_key(&number, |info| info.number)
        .ok()
        .map(|idx| &CONTROLLERS[idx])
}
