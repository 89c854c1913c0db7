use crate::{
    io::Cursor,
    num::{u15, u4, u7},
    ChannelEvent, ChannelPressure, ChannelVoice, ControlChange, CType,
    Direction, Error, ErrorKind, EventKind, Format, Fps, Header, IntBuilder, MetaEvent,
    MetaMessage, Mode, NoteOff, NoteOn, PitchBend, ProgramChange, SequenceNumber, Smf,
    SmpteOffset, TextKind, Timing, VariableLengthValue, WideUint, CONTROLLERS, NOTE_NAMES,
};

/// Build a chunk with a big-endian length.
fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn header(format: u16, ntrks: u16, division: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&format.to_be_bytes());
    body.extend_from_slice(&ntrks.to_be_bytes());
    body.extend_from_slice(&division.to_be_bytes());
    chunk(b"MThd", &body)
}

/// Build a whole file, declaring as many tracks as given.
fn smf(format: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
    let mut out = header(format, tracks.len() as u16, division);
    for track in tracks {
        out.extend(chunk(b"MTrk", track));
    }
    out
}

const EOT: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

/// Offset of the first track body in files built by `smf`.
const FIRST_TRACK: usize = 14 + 8;

fn track(events: &[&[u8]]) -> Vec<u8> {
    let mut out: Vec<u8> = events.iter().flat_map(|ev| ev.iter().copied()).collect();
    out.extend_from_slice(&EOT);
    out
}

fn parse_err(raw: &[u8]) -> Error {
    match Smf::parse(raw) {
        Ok(smf) => panic!("expected failure, got {:?}", smf),
        Err(err) => err,
    }
}

mod vlv {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(mut value: u64) -> Vec<u8> {
        let mut out = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value != 0 {
            out.push((value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }
        out.reverse();
        out
    }

    fn read(bytes: &[u8]) -> Result<(u64, usize), Error> {
        let mut cursor = Cursor::new(bytes);
        let vlv = VariableLengthValue::read(&mut cursor)?;
        assert_eq!(vlv.raw_data, &bytes[..vlv.length()]);
        assert_eq!(cursor.position(), vlv.length());
        Ok((vlv.to_u64().unwrap(), vlv.length()))
    }

    #[test]
    fn examples() {
        assert_eq!(read(&[0x84, 0x18]).unwrap(), (536, 2));
        assert_eq!(read(&[0x00]).unwrap(), (0, 1));
        assert_eq!(read(&[0x3C]).unwrap(), (60, 1));
        assert_eq!(read(&[0x81, 0x80, 0x00]).unwrap(), (16384, 3));
        assert_eq!(read(&[0xFF, 0xFF, 0xFF, 0x7F]).unwrap(), (0x0FFF_FFFF, 4));
    }

    #[test]
    fn stops_at_first_final_byte() {
        assert_eq!(read(&[0x81, 0x00, 0x7F, 0x7F]).unwrap(), (128, 2));
    }

    #[test]
    fn accepts_leading_zero_groups() {
        assert_eq!(read(&[0x80, 0x80, 0x01]).unwrap(), (1, 3));
    }

    #[test]
    fn truncated() {
        let bytes = [0x81, 0x82];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = VariableLengthValue::read(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnexpectedEndOfData);
        assert_eq!(err.position(), Some(2));
        //Nothing is consumed on failure
        assert_eq!(cursor.position(), 0);
        assert_eq!(
            read(&[]).unwrap_err().kind(),
            &ErrorKind::UnexpectedEndOfData
        );
    }

    #[test]
    fn wider_than_64_bits() {
        let mut max = vec![0xFFu8; 8];
        max.push(0x7F);
        assert_eq!(read(&max).unwrap(), (i64::max_value() as u64, 9));

        //2^70, eleven bytes
        let mut wide = vec![0x81u8];
        wide.extend_from_slice(&[0x80; 9]);
        wide.push(0x00);
        let mut cursor = Cursor::new(&wide[..]);
        let vlv = VariableLengthValue::read(&mut cursor).unwrap();
        assert_eq!(vlv.length(), 11);
        assert_eq!(vlv.value, 1u128 << 70);
        assert_eq!(vlv.value.bit_len(), 71);
        assert_eq!(vlv.to_u64(), None);
        assert!(cursor.is_empty());

        let mut huge = vec![0xFFu8; 40];
        huge.push(0x7F);
        let vlv = VariableLengthValue::read(&mut Cursor::new(&huge[..])).unwrap();
        assert_eq!(vlv.value.bit_len(), 41 * 7);
    }

    #[test]
    fn wide_delta_time() {
        let mut body = vec![0x81u8];
        body.extend_from_slice(&[0x80; 9]);
        body.extend_from_slice(&[0x00, 0x90, 0x3C, 0x40]);
        body.extend_from_slice(&EOT);
        let err = parse_err(&smf(0, 96, &[&body[..]]));
        assert_eq!(
            err.root_kind(),
            &ErrorKind::Range {
                what: "delta time",
                value: 1i128 << 70
            }
        );
        assert_eq!(err.position(), Some(FIRST_TRACK));
        assert!(err
            .root_kind()
            .to_string()
            .ends_with("out of range: 1180591620717411303424"));
    }

    #[test]
    fn reencode() {
        for &value in &[0, 1, 0x7F, 0x80, 536, 0x3FFF, 0x4000, 0x0FFF_FFFF, u64::max_value() >> 1]
        {
            let encoded = encode(value);
            let mut cursor = Cursor::new(&encoded[..]);
            let vlv = VariableLengthValue::read(&mut cursor).unwrap();
            assert_eq!(vlv.value, value);
            assert_eq!(encode(vlv.to_u64().unwrap()), vlv.raw_data);
        }
    }
}

mod integer {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn both_byte_orders() {
        let int = IntBuilder::new(&[0x01, 0xA4]).unwrap();
        assert_eq!(int.little_endian, 41985u64);
        assert_eq!(int.big_endian, 420u64);
        assert_eq!(int.byte_length, 2);
        assert_eq!(int.c_type, Some(CType::UInt16));
        assert_eq!(int.original_data, vec![0x01, 0xA4]);
        assert_eq!(int.to_string(), "41985LE : 420BE : 0x1a4B");
    }

    #[test]
    fn single_byte() {
        let int = IntBuilder::new(&[0x2A]).unwrap();
        assert_eq!(int.little_endian, 42u64);
        assert_eq!(int.big_endian, 42u64);
        assert_eq!(int.little_endian, int.big_endian);
        assert_eq!(int.c_type, Some(CType::UInt8));
    }

    #[test]
    fn display_keeps_leading_zero_bytes() {
        let int = IntBuilder::new(&[0x00, 0x2A]).unwrap();
        assert_eq!(int.big_endian, 42u64);
        assert_eq!(int.little_endian, 0x2A00u64);
        assert_eq!(int.to_string(), "10752LE : 42BE : 0x02aB");
        assert_eq!(
            IntBuilder::new(&[0x10, 0x00, 0x0F]).unwrap().to_string(),
            "983056LE : 1048591BE : 0x100fB"
        );
    }

    #[test]
    fn empty() {
        assert_eq!(
            IntBuilder::new(&[]).unwrap_err().kind(),
            &ErrorKind::EmptyInteger
        );
    }

    #[test]
    fn classification() {
        let class = |len: usize| IntBuilder::new(&vec![0xFFu8; len]).unwrap().c_type;
        assert_eq!(class(3), Some(CType::UInt32));
        assert_eq!(class(4), Some(CType::UInt32));
        assert_eq!(class(5), Some(CType::UInt64));
        assert_eq!(class(8), Some(CType::UInt64));
        assert_eq!(class(9), None);

        let int = IntBuilder::new(&[0xFF; 8]).unwrap();
        assert_eq!(int.big_endian, u64::max_value());
        assert_eq!(int.big_endian.to_string(), "18446744073709551615");
        let int = IntBuilder::new(&[0xFF; 4]).unwrap();
        assert_eq!(int.little_endian, 4294967295u64);
    }

    #[test]
    fn wider_than_machine_integers() {
        let mut bytes = vec![0u8; 120];
        bytes.extend_from_slice(&999_999_999_999_999_999u64.to_be_bytes());
        let int = IntBuilder::new(&bytes).unwrap();
        assert_eq!(int.byte_length, 128);
        assert_eq!(int.c_type, None);
        assert_eq!(int.big_endian, 999_999_999_999_999_999u64);
        assert_eq!(int.little_endian.to_u128(), None);
        assert_eq!(
            int.little_endian.to_string(),
            "179767638237020898356623490710434418536775593352576159933757128944707257350954536914063245326939442175767480235509437650677415131917209873130951247687383631600519862940215216702259024034572879454308448988996237931693908948093169681562364347544258390966030456380791142075624025472352408185492254992022911320064"
        );
    }

    #[test]
    fn reversed_bytes_swap_interpretations() {
        let bytes = [0x12, 0x00, 0x9A, 0xBC, 0x01];
        let mut reversed = bytes;
        reversed.reverse();
        let int = IntBuilder::new(&bytes).unwrap();
        let rev = IntBuilder::new(&reversed).unwrap();
        assert_eq!(int.big_endian, rev.little_endian);
        assert_eq!(int.little_endian, rev.big_endian);
        assert_eq!(int.big_endian, 0x12_009A_BC01u64);
    }

    #[test]
    fn wide_uint_formatting() {
        assert_eq!(WideUint::from(0u64).to_string(), "0");
        assert!(WideUint::from(0u64).is_zero());
        assert_eq!(format!("{:x}", WideUint::from(0x1A4u64)), "1a4");
        assert_eq!(format!("{:#x}", WideUint::from(0x10_0000_0001u64)), "0x1000000001");
        assert_eq!(WideUint::from(u128::max_value()).bit_len(), 128);
        assert_eq!(
            WideUint::from(u128::max_value()).to_string(),
            u128::max_value().to_string()
        );
    }
}

mod channel {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn note_on() {
        let msg = NoteOn::from_packed(0x900000).unwrap();
        assert_eq!(msg.channel_number.as_int(), 0);
        assert_eq!(msg.note_number.as_int(), 0);
        assert_eq!(msg.note_name, "C");
        assert_eq!(msg.note_velocity.as_int(), 0);
        assert_eq!(msg.raw_data, 9437184);

        let msg = NoteOn::from_packed(0x9B3D7F).unwrap();
        assert_eq!(msg.channel_number.as_int(), 11);
        assert_eq!(msg.note_number.as_int(), 61);
        assert_eq!(msg.note_name, "C#");
        assert_eq!(msg.note_velocity.as_int(), 127);
    }

    #[test]
    fn wrong_status() {
        assert_eq!(
            NoteOn::from_packed(0x290011).unwrap_err().kind(),
            &ErrorKind::InvalidStatus {
                expected: 0x90,
                found: 0x29
            }
        );
        assert!(!NoteOn::valid(0x800000));
        assert!(NoteOff::valid(0x800000));
        assert!(NoteOff::from_packed(0x800000).is_ok());
    }

    #[test]
    fn wrong_width() {
        assert_eq!(
            NoteOn::from_packed(0x123001929391923919).unwrap_err().kind(),
            &ErrorKind::Length {
                expected: 3,
                found: 9
            }
        );
        assert_eq!(
            NoteOn::from_packed(0x1).unwrap_err().kind(),
            &ErrorKind::Length {
                expected: 3,
                found: 1
            }
        );
        assert_eq!(
            ProgramChange::from_packed(0xC10500).unwrap_err().kind(),
            &ErrorKind::Length {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn data_bytes_are_7_bit() {
        assert_eq!(
            NoteOn::from_packed(0x903C80).unwrap_err().kind(),
            &ErrorKind::Range {
                what: "data byte",
                value: 0x80
            }
        );
    }

    #[test]
    fn note_names() {
        for note in 0..128u8 {
            assert_eq!(
                crate::note_name(note).unwrap(),
                NOTE_NAMES[note as usize % 12]
            );
        }
        assert_eq!(crate::note_name(69).unwrap(), "A");
        assert!(matches!(
            crate::note_name(128).unwrap_err().kind(),
            ErrorKind::Range { .. }
        ));
    }

    #[test]
    fn pitch_bend() {
        let center = PitchBend::from_packed(0xE00040).unwrap();
        assert_eq!(center.bend_amount.as_int(), 8192);
        assert_eq!(center.as_int(), 0);
        let max = PitchBend::from_packed(0xE07F7F).unwrap();
        assert_eq!(max.bend_amount.as_int(), 16383);
        assert_eq!(max.as_int(), 0x1FFF);
        let min = PitchBend::from_packed(0xE30000).unwrap();
        assert_eq!(min.bend_amount.as_int(), 0);
        assert_eq!(min.as_f32(), -1.0);
        assert_eq!(min.channel_number.as_int(), 3);
    }

    #[test]
    fn controllers() {
        let balance = ControlChange::from_packed(0xB00840).unwrap();
        assert_eq!(balance.direction, Some(Direction::Center));
        assert_eq!(balance.info().map(|info| info.name), Some("Balance"));
        let pan = ControlChange::from_packed(0xB00A00).unwrap();
        assert_eq!(pan.direction, Some(Direction::Left));
        let pan = ControlChange::from_packed(0xB00A7F).unwrap();
        assert_eq!(pan.direction, Some(Direction::Right));
        let volume = ControlChange::from_packed(0xB00740).unwrap();
        assert_eq!(volume.direction, None);
        assert_eq!(volume.info().map(|info| info.name), Some("Channel Volume"));
        let unknown = ControlChange::from_packed(0xB01440).unwrap();
        assert!(unknown.info().is_none());

        assert_eq!(
            crate::controller_info(0x40).map(|info| info.name),
            Some("Damper Pedal")
        );
        assert!(CONTROLLERS
            .windows(2)
            .all(|pair| pair[0].number < pair[1].number));
    }

    #[test]
    fn left_right() {
        assert_eq!(crate::decode_left_right(0).unwrap(), Direction::Left);
        assert_eq!(crate::decode_left_right(63).unwrap(), Direction::Left);
        assert_eq!(crate::decode_left_right(64).unwrap(), Direction::Center);
        assert_eq!(crate::decode_left_right(65).unwrap(), Direction::Right);
        assert_eq!(crate::decode_left_right(127).unwrap(), Direction::Right);
        assert_eq!(
            crate::decode_left_right(128).unwrap_err().kind(),
            &ErrorKind::Range {
                what: "left/right value",
                value: 128
            }
        );
    }

    #[test]
    fn any_channel_event() {
        match ChannelEvent::from_packed(0x953C64).unwrap() {
            ChannelEvent::NoteOn(msg) => {
                assert_eq!(msg.channel_number.as_int(), 5);
                assert_eq!(msg.note_velocity.as_int(), 100);
            }
            other => panic!("unexpected message {:?}", other),
        }
        let msg = ChannelEvent::from_packed(0xC105).unwrap();
        assert_eq!(msg.indicator(), ProgramChange::INDICATOR);
        assert_eq!(msg.raw_data(), 0xC105);
        assert_eq!(
            ChannelEvent::decode(0xD3, &[0x10]).unwrap(),
            ChannelEvent::ChannelPressure(ChannelPressure {
                channel_number: u4::new(3),
                pressure: u7::new(0x10),
                raw_data: 0xD310,
            })
        );
        assert!(ChannelEvent::from_packed(0xF00000).is_err());
        assert!(ChannelEvent::from_packed(0).is_err());
    }
}

mod meta {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{EndOfTrack, KeySignature, TimeSignature};

    fn decode(bytes: &[u8]) -> Result<MetaEvent, Error> {
        MetaEvent::decode(&mut Cursor::new(bytes))
    }

    fn message(bytes: &[u8]) -> MetaMessage {
        decode(bytes).unwrap().message
    }

    fn root(bytes: &[u8]) -> ErrorKind {
        decode(bytes).unwrap_err().root_kind().clone()
    }

    #[test]
    fn sequence_number() {
        let ev = decode(&[0x00, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(ev.meta_type, 0x00);
        assert_eq!(ev.length, 2);
        assert_eq!(ev.raw_content, &[0x01, 0x02]);
        assert_eq!(
            ev.message,
            MetaMessage::SequenceNumber(SequenceNumber {
                sequence_number: 258
            })
        );
        assert_eq!(
            decode(&[0x00, 0x01, 0x05]).unwrap_err().kind(),
            &ErrorKind::EventLength {
                meta_type: 0x00,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn text() {
        let ev = decode(b"\x03\x05Piano").unwrap();
        assert_eq!(ev.length, 5);
        assert_eq!(ev.raw_content, b"Piano");
        assert_eq!(
            ev.message,
            MetaMessage::Text {
                kind: TextKind::TrackName,
                text: "Piano"
            }
        );
        assert_eq!(
            message(b"\x09\x00"),
            MetaMessage::Text {
                kind: TextKind::DeviceName,
                text: ""
            }
        );
    }

    #[test]
    fn text_must_be_ascii() {
        let err = decode(&[0x01, 0x03, b'a', 0xE9, b'b']).unwrap_err();
        assert_eq!(
            err.root_kind(),
            &ErrorKind::EventText {
                byte: 0xE9,
                offset: 1
            }
        );
        assert_eq!(err.position(), Some(2));
    }

    #[test]
    fn variable_length_prefix() {
        let mut bytes = vec![0x05, 0x81, 0x00];
        bytes.extend_from_slice(&[b'x'; 128]);
        let ev = decode(&bytes).unwrap();
        assert_eq!(ev.length, 128);
        match ev.message {
            MetaMessage::Text { kind, text } => {
                assert_eq!(kind, TextKind::Lyric);
                assert_eq!(text.len(), 128);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn truncated_payload() {
        assert_eq!(
            root(&[0x01, 0x05, b'a']),
            ErrorKind::UnexpectedEndOfData
        );
    }

    #[test]
    fn end_of_track() {
        assert_eq!(message(&[0x2F, 0x00]), MetaMessage::EndOfTrack(EndOfTrack));
        assert!(decode(&[0x2F, 0x00]).unwrap().is_end_of_track());
        assert_eq!(
            decode(&[0x2F, 0x01, 0x00]).unwrap_err().kind(),
            &ErrorKind::EventLength {
                meta_type: 0x2F,
                expected: 0,
                found: 1
            }
        );
    }

    #[test]
    fn tempo() {
        match message(&[0x51, 0x03, 0x07, 0xA1, 0x20]) {
            MetaMessage::SetTempo(tempo) => {
                assert_eq!(tempo.tpqm.as_int(), 500_000);
                assert_eq!(tempo.tempo_bpm(), 120.0);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(
            root(&[0x51, 0x03, 0x00, 0x00, 0x00]),
            ErrorKind::Range {
                what: "tempo",
                value: 0
            }
        );
    }

    #[test]
    fn smpte_offset() {
        assert_eq!(
            message(&[0x54, 0x05, 0x61, 0x02, 0x03, 0x04, 0x05]),
            MetaMessage::SmpteOffset(SmpteOffset {
                rate: Fps::Fps30,
                hours: 1,
                minutes: 2,
                seconds: 3,
                frames: 4,
                fractional_frames: 5,
            })
        );
        match message(&[0x54, 0x05, 0x17, 0x00, 0x00, 0x00, 0x00]) {
            MetaMessage::SmpteOffset(smpte) => {
                assert_eq!(smpte.rate, Fps::Fps24);
                assert_eq!(smpte.hours, 23);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn smpte_reserved_bits() {
        assert_eq!(
            root(&[0x54, 0x05, 0x81, 0x00, 0x00, 0x00, 0x00]),
            ErrorKind::MalformedReservedBits {
                field: "hours",
                bits: 0x80
            }
        );
        assert_eq!(
            root(&[0x54, 0x05, 0x01, 0x40, 0x00, 0x00, 0x00]),
            ErrorKind::MalformedReservedBits {
                field: "minutes",
                bits: 0x40
            }
        );
        assert_eq!(
            root(&[0x54, 0x05, 0x01, 0x00, 0x80, 0x00, 0x00]),
            ErrorKind::MalformedReservedBits {
                field: "seconds",
                bits: 0x80
            }
        );
        assert_eq!(
            root(&[0x54, 0x05, 0x01, 0x00, 0x00, 0x20, 0x00]),
            ErrorKind::MalformedReservedBits {
                field: "frames",
                bits: 0x20
            }
        );
        assert_eq!(
            root(&[0x54, 0x05, 0x18, 0x00, 0x00, 0x00, 0x00]),
            ErrorKind::Range {
                what: "smpte hours",
                value: 24
            }
        );
        assert_eq!(
            decode(&[0x54, 0x04, 0x01, 0x00, 0x00, 0x00]).unwrap_err().kind(),
            &ErrorKind::EventLength {
                meta_type: 0x54,
                expected: 5,
                found: 4
            }
        );
    }

    #[test]
    fn time_signature() {
        match message(&[0x58, 0x04, 0x06, 0x03, 0x24, 0x08]) {
            MetaMessage::TimeSignature(sig) => {
                assert_eq!(
                    sig,
                    TimeSignature {
                        numerator: 6,
                        denominator: 3,
                        clocks_per_tick: 0x24,
                        notes_per_quarter: 8,
                    }
                );
                assert_eq!(sig.to_string(), "6/8");
            }
            other => panic!("unexpected message {:?}", other),
        }
        let huge = TimeSignature {
            numerator: 1,
            denominator: 40,
            clocks_per_tick: 24,
            notes_per_quarter: 8,
        };
        assert_eq!(huge.to_string(), "1/2^40");
    }

    #[test]
    fn key_signature() {
        let key = |index: u8, mode: u8| match message(&[0x59, 0x02, index, mode]) {
            MetaMessage::KeySignature(key) => key,
            other => panic!("unexpected message {:?}", other),
        };
        assert_eq!(key(0xF9, 0).name(), Some("Cb"));
        assert_eq!(key(0, 0).name(), Some("C"));
        assert_eq!(key(7, 0).name(), Some("C#"));
        assert_eq!(
            key(0xFD, 1),
            KeySignature {
                signature_index: -3,
                major_minor: Mode::Minor
            }
        );
        assert_eq!(
            root(&[0x59, 0x02, 0x08, 0x00]),
            ErrorKind::Range {
                what: "key signature index",
                value: 8
            }
        );
        assert_eq!(
            root(&[0x59, 0x02, 0xF8, 0x00]),
            ErrorKind::Range {
                what: "key signature index",
                value: -8
            }
        );
        assert_eq!(
            root(&[0x59, 0x02, 0x00, 0x02]),
            ErrorKind::Range {
                what: "key signature mode",
                value: 2
            }
        );
    }

    #[test]
    fn hand_built_key_signature_has_no_name() {
        for &index in &[8i8, 9, -8, 127, -128] {
            let key = KeySignature {
                signature_index: index,
                major_minor: Mode::Major,
            };
            assert_eq!(key.name(), None);
        }
    }

    #[test]
    fn channel_prefix_and_port() {
        assert_eq!(
            message(&[0x20, 0x01, 0x0F]),
            MetaMessage::ChannelPrefix(u4::new(15))
        );
        assert_eq!(
            root(&[0x20, 0x01, 0x10]),
            ErrorKind::Range {
                what: "channel prefix",
                value: 16
            }
        );
        assert_eq!(message(&[0x21, 0x01, 0x03]), MetaMessage::MidiPort(u7::new(3)));
    }

    #[test]
    fn opaque_payloads() {
        assert_eq!(
            message(&[0x7F, 0x03, 0x00, 0x00, 0x41]),
            MetaMessage::SequencerSpecific(&[0x00, 0x00, 0x41])
        );
        assert_eq!(
            message(&[0x60, 0x02, 0x01, 0x02]),
            MetaMessage::Unknown {
                type_byte: 0x60,
                data: &[0x01, 0x02]
            }
        );
    }
}

mod track {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn running_status() {
        let body = track(&[
            &[0x00, 0x90, 0x3C, 0x40],
            &[0x10, 0x3E, 0x40],
            &[0x10, 0x80, 0x3C, 0x00],
            &[0x00, 0x3E, 0x00],
        ]);
        let raw = smf(0, 96, &[&body[..]]);
        let parsed = Smf::parse(&raw).unwrap();
        let track = &parsed.tracks[0];
        assert_eq!(track.track_number, 0);
        assert_eq!(track.events.len(), 5);
        assert_eq!(track.events[1].bytes, &[0x10, 0x3E, 0x40]);
        assert_eq!(track.events[1].delta, 0x10);
        match track.events[1].kind {
            EventKind::Channel(ChannelEvent::NoteOn(msg)) => {
                assert_eq!(msg.note_number.as_int(), 62);
                assert_eq!(msg.raw_data, 0x903E40);
            }
            ref other => panic!("unexpected event {:?}", other),
        }
        match track.events[3].kind {
            EventKind::Channel(ChannelEvent::NoteOff(msg)) => {
                assert_eq!(msg.note_number.as_int(), 62);
            }
            ref other => panic!("unexpected event {:?}", other),
        }
        assert!(track.events[4].kind.is_end_of_track());
        assert_eq!(track.consumed(), track.length as usize);
        assert_eq!(track.duration_ticks(), 0x20);
    }

    #[test]
    fn consumed_bytes_add_up() {
        let body = track(&[
            b"\x00\xFF\x03\x04Lead",
            &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20],
            &[0x00, 0xC0, 0x05],
            &[0x00, 0xF0, 0x03, 0x7E, 0x7F, 0xF7],
            &[0x83, 0x60, 0x90, 0x3C, 0x40],
            &[0x60, 0x3C, 0x00],
            &[0x00, 0xE0, 0x00, 0x40],
        ]);
        let raw = smf(0, 96, &[&body[..]]);
        let parsed = Smf::parse(&raw).unwrap();
        let track = &parsed.tracks[0];
        assert_eq!(track.events.len(), 8);
        assert_eq!(track.length as usize, body.len());
        assert_eq!(track.consumed(), body.len());
        let concat: Vec<u8> = track
            .events
            .iter()
            .flat_map(|ev| ev.bytes.iter().copied())
            .collect();
        assert_eq!(concat, body);
        assert_eq!(track.events[3].kind, EventKind::SysEx(&[0x7E, 0x7F, 0xF7]));
        assert_eq!(track.events[4].delta, 480);
    }

    #[test]
    fn meta_clears_running_status() {
        let body = track(&[
            &[0x00, 0x90, 0x3C, 0x40],
            &[0x00, 0xFF, 0x01, 0x01, b'a'],
            &[0x00, 0x3C, 0x00],
        ]);
        assert_eq!(
            parse_err(&smf(0, 96, &[&body[..]])).root_kind(),
            &ErrorKind::Invalid("event missing status with no running status active")
        );
    }

    #[test]
    fn sysex_clears_running_status() {
        let body = track(&[
            &[0x00, 0x90, 0x3C, 0x40],
            &[0x00, 0xF7, 0x01, 0xF8],
            &[0x00, 0x3C, 0x00],
        ]);
        assert_eq!(
            parse_err(&smf(0, 96, &[&body[..]])).root_kind(),
            &ErrorKind::Invalid("event missing status with no running status active")
        );
    }

    #[test]
    fn missing_status() {
        let body = track(&[&[0x00, 0x3C, 0x40]]);
        let err = parse_err(&smf(0, 96, &[&body[..]]));
        assert_eq!(
            err.root_kind(),
            &ErrorKind::Invalid("event missing status with no running status active")
        );
        assert_eq!(err.position(), Some(FIRST_TRACK + 1));
    }

    #[test]
    fn data_byte_with_top_bit() {
        let body = track(&[&[0x00, 0x90, 0x3C, 0x80]]);
        let err = parse_err(&smf(0, 96, &[&body[..]]));
        assert_eq!(
            err.root_kind(),
            &ErrorKind::Range {
                what: "data byte",
                value: 0x80
            }
        );
        assert_eq!(err.position(), Some(FIRST_TRACK + 2));
    }

    #[test]
    fn early_end_of_track() {
        let mut body = EOT.to_vec();
        body.extend_from_slice(&[0x00, 0x90, 0x3C, 0x40]);
        assert_eq!(
            parse_err(&smf(0, 96, &[&body[..]])).root_kind(),
            &ErrorKind::Invalid("end of track event before end of track chunk")
        );
    }

    #[test]
    fn missing_end_of_track() {
        assert_eq!(
            parse_err(&smf(0, 96, &[&[0x00, 0x90, 0x3C, 0x40]])).root_kind(),
            &ErrorKind::Invalid("track ended without end of track event")
        );
        assert_eq!(
            parse_err(&smf(0, 96, &[&[]])).root_kind(),
            &ErrorKind::Invalid("track ended without end of track event")
        );
    }

    #[test]
    fn truncated_event() {
        assert_eq!(
            parse_err(&smf(0, 96, &[&[0x00, 0x90, 0x3C]])).root_kind(),
            &ErrorKind::UnexpectedEndOfData
        );
        assert_eq!(
            parse_err(&smf(0, 96, &[&[0x00, 0xFF, 0x03, 0x05, b'a']])).root_kind(),
            &ErrorKind::UnexpectedEndOfData
        );
    }

    #[test]
    fn system_messages() {
        let body = track(&[&[0x00, 0xF2, 0x00, 0x00]]);
        assert_eq!(
            parse_err(&smf(0, 96, &[&body[..]])).root_kind(),
            &ErrorKind::Invalid("standard midi files cannot contain system common events")
        );
        let body = track(&[&[0x00, 0xF8]]);
        assert_eq!(
            parse_err(&smf(0, 96, &[&body[..]])).root_kind(),
            &ErrorKind::Invalid("standard midi files cannot contain system realtime events")
        );
    }

    #[test]
    fn meta_errors_abort_track() {
        let body = track(&[&[0x00, 0xFF, 0x2F, 0x01, 0x00]]);
        let err = parse_err(&smf(0, 96, &[&body[..]]));
        assert_eq!(
            err.root_kind(),
            &ErrorKind::EventLength {
                meta_type: 0x2F,
                expected: 0,
                found: 1
            }
        );
        assert_eq!(err.kind(), &ErrorKind::Invalid("failed to parse track"));
    }

    #[test]
    fn event_iter_fails_once() {
        let raw = smf(0, 96, &[&[0x00, 0x90, 0x3C, 0x40, 0x00, 0x3C]]);
        let (_header, mut tracks) = crate::parse(&raw).unwrap();
        let mut events = tracks.next().unwrap().unwrap();
        assert_eq!(events.track_number(), 0);
        assert!(events.next().unwrap().is_ok());
        assert_eq!(events.running_status(), Some(0x90));
        assert!(events.next().unwrap().is_err());
        assert!(events.next().is_none());
        assert!(tracks.next().is_none());
    }
}

mod file {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_fields() {
        let raw = smf(1, 96, &[&EOT, &EOT]);
        let (header, tracks) = crate::parse(&raw).unwrap();
        assert_eq!(
            header,
            Header {
                length: 6,
                format: Format::Parallel,
                ntrks: 2,
                division: Timing::Metrical(u15::new(96)),
            }
        );
        assert_eq!(tracks.count(), 2);
        let parsed = Smf::parse(&raw).unwrap();
        assert_eq!(parsed.tracks.len(), 2);
        assert_eq!(parsed.tracks[1].track_number, 1);
        assert_eq!(parsed.tracks[1].length, 4);
    }

    #[test]
    fn timecode_division() {
        let raw = smf(0, 0xE728, &[&EOT]);
        let parsed = Smf::parse(&raw).unwrap();
        assert_eq!(parsed.header.division, Timing::Timecode(Fps::Fps25, 40));
        assert_eq!(parsed.header.format, Format::SingleTrack);

        let raw = smf(0, 0xE000, &[&EOT]);
        assert_eq!(
            parse_err(&raw).kind(),
            &ErrorKind::Invalid("invalid smpte fps")
        );
    }

    #[test]
    fn bad_header() {
        assert_eq!(
            parse_err(&smf(3, 96, &[&EOT])).kind(),
            &ErrorKind::Invalid("invalid smf format")
        );

        let mut raw = chunk(b"MThd", &[0, 1, 0, 1, 0, 96, 0]);
        raw.extend(chunk(b"MTrk", &EOT));
        let err = parse_err(&raw);
        assert_eq!(
            err.kind(),
            &ErrorKind::Length {
                expected: 6,
                found: 7
            }
        );
        assert_eq!(err.position(), Some(4));

        let raw = chunk(b"MTrk", &EOT);
        assert_eq!(
            parse_err(&raw).kind(),
            &ErrorKind::Invalid("expected header chunk")
        );
        assert_eq!(
            parse_err(&[]).kind(),
            &ErrorKind::Invalid("no header chunk")
        );
        assert_eq!(
            parse_err(b"MThd\0\0").root_kind(),
            &ErrorKind::UnexpectedEndOfData
        );
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let mut raw = header(0, 1, 96);
        raw.extend(chunk(b"XFIH", &[1, 2, 3]));
        raw.extend(chunk(b"MTrk", &EOT));
        raw.extend(chunk(b"XFKM", &[]));
        let parsed = Smf::parse(&raw).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.tracks[0].track_number, 0);
    }

    #[test]
    fn truncated_chunk() {
        let mut raw = smf(1, 96, &[&EOT]);
        raw.extend_from_slice(b"MTrk\0\0\0\x10\x00\xFF");
        let err = parse_err(&raw);
        assert_eq!(err.root_kind(), &ErrorKind::UnexpectedEndOfData);
        assert_eq!(err.position(), Some(raw.len()));
    }

    #[test]
    fn partial() {
        let good = track(&[&[0x00, 0x90, 0x3C, 0x40]]);
        let raw = smf(1, 96, &[&good[..], &[0x00, 0x90, 0x3C], &EOT]);
        let partial = Smf::parse_partial(&raw).unwrap();
        assert_eq!(partial.tracks.len(), 1);
        assert_eq!(partial.tracks[0].events.len(), 2);
        let err = partial.error.clone().unwrap();
        assert_eq!(err.root_kind(), &ErrorKind::UnexpectedEndOfData);
        assert!(partial.into_result().is_err());
        assert_eq!(parse_err(&raw).root_kind(), &ErrorKind::UnexpectedEndOfData);

        let raw = smf(1, 96, &[&good[..], &EOT]);
        let partial = Smf::parse_partial(&raw).unwrap();
        assert!(partial.error.is_none());
        assert_eq!(partial.into_result().unwrap(), Smf::parse(&raw).unwrap());

        assert!(Smf::parse_partial(&smf(5, 96, &[&EOT])).is_err());
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn lenient_track_count() {
        let mut raw = header(1, 3, 96);
        raw.extend(chunk(b"MTrk", &EOT));
        let parsed = Smf::parse(&raw).unwrap();
        assert_eq!(parsed.header.ntrks, 3);
        assert_eq!(parsed.tracks.len(), 1);

        let raw = smf(0, 96, &[&EOT, &EOT]);
        assert_eq!(Smf::parse(&raw).unwrap().tracks.len(), 2);
    }

    #[cfg(feature = "strict")]
    #[test]
    fn strict_track_count() {
        let mut raw = header(1, 3, 96);
        raw.extend(chunk(b"MTrk", &EOT));
        assert!(Smf::parse(&raw).is_err());
        assert!(Smf::parse_partial(&raw).unwrap().error.is_some());

        let raw = smf(0, 96, &[&EOT, &EOT]);
        assert!(Smf::parse(&raw).is_err());
    }

    fn riff_chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn rmid() {
        let plain = smf(0, 96, &[&track(&[&[0x00, 0xC0, 0x01]])[..]]);
        let mut form = b"RMID".to_vec();
        form.extend(riff_chunk(b"INFO", &[0; 3]));
        form.extend(riff_chunk(b"data", &plain));
        let wrapped = riff_chunk(b"RIFF", &form);
        assert_eq!(Smf::parse(&wrapped).unwrap(), Smf::parse(&plain).unwrap());
    }

    #[test]
    fn many_tracks_keep_file_order() {
        let bodies: Vec<Vec<u8>> = (0..6u8)
            .map(|i| {
                let mut body = vec![0x00, 0xC0 | i, i];
                for _ in 0..300 {
                    body.extend_from_slice(&[0x00, 0x90 | i, 0x3C, 0x40]);
                }
                body.extend_from_slice(&EOT);
                body
            })
            .collect();
        let refs: Vec<&[u8]> = bodies.iter().map(|body| &body[..]).collect();
        let raw = smf(1, 480, &refs);
        let parsed = Smf::parse(&raw).unwrap();
        assert_eq!(parsed.tracks.len(), 6);
        for (i, track) in parsed.tracks.iter().enumerate() {
            assert_eq!(track.track_number, i);
            assert_eq!(track.events.len(), 302);
            assert_eq!(track.consumed(), track.length as usize);
            match track.events[0].kind {
                EventKind::Channel(ChannelEvent::ProgramChange(msg)) => {
                    assert_eq!(msg.program.as_int() as usize, i);
                    assert_eq!(msg.channel_number.as_int() as usize, i);
                }
                ref other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn first_failing_track_wins() {
        let good: Vec<u8> = {
            let mut body = Vec::new();
            for _ in 0..400 {
                body.extend_from_slice(&[0x00, 0x90, 0x3C, 0x40]);
            }
            body.extend_from_slice(&EOT);
            body
        };
        let raw = smf(
            1,
            96,
            &[&good[..], &[0x00, 0x3C], &good[..], &[0x00, 0x90, 0x3C]],
        );
        let partial = Smf::parse_partial(&raw).unwrap();
        assert_eq!(partial.tracks.len(), 1);
        assert_eq!(
            partial.error.unwrap().root_kind(),
            &ErrorKind::Invalid("event missing status with no running status active")
        );
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        assert_eq!(
            Error::at(ErrorKind::UnexpectedEndOfData, 5).to_string(),
            "unexpected end of data (at byte 5)"
        );
        assert_eq!(
            Error::new(ErrorKind::Length {
                expected: 3,
                found: 9
            })
            .to_string(),
            "expected 3 bytes, found 9"
        );
    }

    #[test]
    fn chain() {
        let body = track(&[&[0x00, 0xFF, 0x59, 0x02, 0x09, 0x00]]);
        let err = parse_err(&smf(0, 96, &[&body[..]]));
        let mut kinds = vec![err.kind().clone()];
        let mut src = err.source();
        while let Some(err) = src {
            kinds.push(err.kind().clone());
            src = err.source();
        }
        assert_eq!(
            kinds,
            vec![
                ErrorKind::Invalid("failed to parse track"),
                ErrorKind::Invalid("failed to read meta event"),
                ErrorKind::Invalid("failed to decode key signature"),
                ErrorKind::Range {
                    what: "key signature index",
                    value: 9
                },
            ]
        );
        assert_eq!(err.position(), Some(FIRST_TRACK + 4));
        assert!(format!("{:?}", err).contains("caused by: key signature index out of range: 9"));
    }
}
