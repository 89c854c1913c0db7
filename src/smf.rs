//! The file layer: chunks, the header, track iteration and the per-track event state machine.

use crate::{
    event::{EventKind, TrackEvent},
    meta::MetaEvent,
    prelude::*,
    primitive::{Format, Timing},
    riff,
};
use tracing::{debug, trace, warn};

/// How many bytes of track data must a file have in order to enable multithreaded decoding.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// A fully decoded Standard Midi File.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Smf<'a> {
    pub header: Header,
    pub tracks: Vec<Track<'a>>,
}
impl<'a> Smf<'a> {
    /// Parse a `.mid` file from its raw bytes.
    ///
    /// Fails with the error of the first track (in file order) that fails to decode.
    pub fn parse(raw: &'a [u8]) -> Result<Smf<'a>> {
        let (header, tracks) = parse(raw)?;
        let (tracks, error) = tracks.collect_tracks();
        if let Some(err) = error {
            return Err(err);
        }
        validate_smf(&header, tracks.len())?;
        Ok(Smf { header, tracks })
    }

    /// Parse a `.mid` file, keeping every track decoded before the first failure.
    ///
    /// Only fails if the header itself cannot be read. Otherwise the error that stopped decoding
    /// (if any) is stored along with the tracks.
    pub fn parse_partial(raw: &'a [u8]) -> Result<PartialSmf<'a>> {
        let (header, tracks) = parse(raw)?;
        let (tracks, mut error) = tracks.collect_tracks();
        if error.is_none() {
            error = validate_smf(&header, tracks.len()).err();
        }
        if let Some(err) = &error {
            warn!(tracks = tracks.len(), error = %err, "partially decoded smf");
        }
        Ok(PartialSmf {
            header,
            tracks,
            error,
        })
    }
}

/// The result of [`Smf::parse_partial`](struct.Smf.html#method.parse_partial).
#[derive(Clone, Debug)]
pub struct PartialSmf<'a> {
    pub header: Header,
    /// The tracks decoded before `error` was hit.
    pub tracks: Vec<Track<'a>>,
    pub error: Option<Error>,
}
impl<'a> PartialSmf<'a> {
    /// Convert into a full `Smf`, failing if decoding did not complete.
    pub fn into_result(self) -> Result<Smf<'a>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Smf {
                header: self.header,
                tracks: self.tracks,
            }),
        }
    }
}

fn validate_smf(header: &Header, track_count: usize) -> Result<()> {
    if track_count != header.ntrks as usize {
        if cfg!(feature = "strict") {
            bail!(err_invalid!(
                "file has a different amount of tracks than declared"
            ));
        }
        warn!(
            declared = header.ntrks,
            found = track_count,
            "file has a different amount of tracks than declared"
        );
    }
    if header.format == Format::SingleTrack && track_count != 1 {
        if cfg!(feature = "strict") {
            bail!(err_invalid!("singletrack format file has multiple tracks"));
        }
        warn!(
            found = track_count,
            "singletrack format file has multiple tracks"
        );
    }
    Ok(())
}

/// Parse the header of a `.mid` file and get a lazy iterator over its tracks.
///
/// RMID files are unwrapped transparently.
pub fn parse(raw: &[u8]) -> Result<(Header, TrackIter)> {
    let raw = match riff::unwrap(raw) {
        Ok(smf) => {
            debug!(offset = smf.position(), "unwrapped rmid file");
            smf
        }
        Err(_) => Cursor::new(raw),
    };
    let start = raw.position();
    let mut chunks = ChunkIter::new(raw);
    let header = match chunks.next() {
        Some(chunk) => Header::read(chunk.context(err_invalid!("invalid midi header"))?)?,
        None => bail!(Error::at(err_invalid!("no header chunk"), start)),
    };
    debug!(
        format = ?header.format,
        ntrks = header.ntrks,
        division = ?header.division,
        "read smf header"
    );
    Ok((header, TrackIter::new(chunks, header.ntrks)))
}

#[derive(Copy, Clone, Debug)]
struct ChunkIter<'a> {
    /// Starts at the current index, ends at EOF.
    raw: Cursor<'a>,
}
impl<'a> ChunkIter<'a> {
    fn new(raw: Cursor<'a>) -> ChunkIter<'a> {
        ChunkIter { raw }
    }
}
impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>>;
    fn next(&mut self) -> Option<Result<Chunk<'a>>> {
        if self.raw.is_empty() {
            return None;
        }
        match Chunk::read(&mut self.raw) {
            Ok(chunk) => Some(Ok(chunk)),
            Err(err) => {
                //Ensure `Chunk::read` isn't called again, by moving the cursor to EOF
                //This is to prevent use of corrupted state (such as reading a new chunk from the
                //middle of a malformed one)
                self.raw.read_rest();
                Some(Err(err))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Chunk<'a> {
    id: [u8; 4],
    /// Absolute offset of the chunk id.
    offset: usize,
    body: Cursor<'a>,
}
impl<'a> Chunk<'a> {
    fn read(raw: &mut Cursor<'a>) -> Result<Chunk<'a>> {
        let offset = raw.position();
        let mut id = [0; 4];
        id.copy_from_slice(raw.read(4).context(err_invalid!("failed to read chunk id"))?);
        let len = u32::read(raw).context(err_invalid!("failed to read chunk length"))?;
        let body_pos = raw.position();
        let body = raw
            .read(len as usize)
            .context(err_invalid!("reached eof before chunk ended"))?;
        Ok(Chunk {
            id,
            offset,
            body: Cursor::with_offset(body, body_pos),
        })
    }

    /// The declared length of the chunk body.
    fn length(&self) -> u32 {
        self.body.unread().len() as u32
    }
}

/// The contents of the `MThd` chunk.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    /// The declared length of the header chunk, always 6.
    pub length: u32,
    pub format: Format,
    /// The declared amount of tracks.
    pub ntrks: u16,
    pub division: Timing,
}
impl Header {
    fn read(chunk: Chunk) -> Result<Header> {
        ensure!(
            &chunk.id == b"MThd",
            Error::at(err_invalid!("expected header chunk"), chunk.offset)
        );
        let length = chunk.length();
        ensure!(
            length == 6,
            Error::at(
                ErrorKind::Length {
                    expected: 6,
                    found: length as usize,
                },
                chunk.offset + 4
            )
        );
        let mut raw = chunk.body;
        let format = Format::read(&mut raw)?;
        let ntrks = u16::read(&mut raw)?;
        let division = Timing::read(&mut raw)?;
        Ok(Header {
            length,
            format,
            ntrks,
            division,
        })
    }
}

/// Lazily yields an event iterator per `MTrk` chunk, in file order.
///
/// Chunks of unknown type are skipped.
pub struct TrackIter<'a> {
    chunks: ChunkIter<'a>,
    track_count_hint: u16,
    track_number: usize,
}
impl<'a> TrackIter<'a> {
    fn new(chunks: ChunkIter<'a>, track_count_hint: u16) -> TrackIter<'a> {
        TrackIter {
            chunks,
            track_count_hint,
            track_number: 0,
        }
    }

    /// Get the remaining unread bytes.
    pub fn unread(&self) -> &'a [u8] {
        self.chunks.raw.unread()
    }

    /// Decode every remaining track, stopping at the first failure.
    ///
    /// Returns the tracks decoded before the failure, in file order, along with the failure.
    pub fn collect_tracks(self) -> (Vec<Track<'a>>, Option<Error>) {
        //Find the track boundaries first
        let mut bodies = Vec::with_capacity(self.track_count_hint as usize);
        let mut chunk_err = None;
        for track in self {
            match track {
                Ok(track) => bodies.push(track),
                Err(err) => {
                    chunk_err = Some(err);
                    break;
                }
            }
        }
        let mut tracks = Vec::with_capacity(bodies.len());
        for result in decode_tracks(bodies) {
            match result {
                Ok(track) => tracks.push(track),
                Err(err) => return (tracks, Some(err)),
            }
        }
        (tracks, chunk_err)
    }
}
impl<'a> Iterator for TrackIter<'a> {
    type Item = Result<EventIter<'a>>;

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.track_count_hint as usize, None)
    }

    fn next(&mut self) -> Option<Result<EventIter<'a>>> {
        loop {
            let chunk = match self.chunks.next()? {
                Ok(chunk) => chunk,
                Err(err) => return Some(Err(err).context(err_invalid!("invalid chunk"))),
            };
            match &chunk.id {
                b"MTrk" => {
                    self.track_count_hint = self.track_count_hint.saturating_sub(1);
                    let track = EventIter::new(self.track_number, chunk.body);
                    self.track_number += 1;
                    return Some(Ok(track));
                }
                b"MThd" => {
                    if cfg!(feature = "strict") {
                        return Some(Err(Error::at(
                            err_invalid!("found duplicate header"),
                            chunk.offset,
                        )));
                    }
                    warn!(offset = chunk.offset, "ignoring duplicate header chunk");
                }
                id => {
                    debug!(
                        id = %String::from_utf8_lossy(id),
                        offset = chunk.offset,
                        length = chunk.length(),
                        "skipping unknown chunk"
                    );
                }
            }
        }
    }
}

/// Decode the given track bodies, possibly in parallel.
///
/// Results are in the same order as the input.
fn decode_tracks(bodies: Vec<EventIter>) -> Vec<Result<Track>> {
    //Attempt to use multiple threads if possible and enabled
    #[cfg(feature = "parallel")]
    {
        let total: usize = bodies.iter().map(|track| track.unread().len()).sum();
        if bodies.len() > 1 && total >= PARALLEL_ENABLE_THRESHOLD {
            use rayon::prelude::*;

            debug!(
                tracks = bodies.len(),
                bytes = total,
                "decoding tracks in parallel"
            );
            return bodies
                .into_par_iter()
                .map(EventIter::into_track)
                .collect();
        }
    }
    //Fall back to single-threaded
    bodies.into_iter().map(EventIter::into_track).collect()
}

/// A decoded track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track<'a> {
    /// The 0-based index of this track among the track chunks of the file.
    pub track_number: usize,
    /// The declared length of the track chunk body.
    pub length: u32,
    pub events: Vec<TrackEvent<'a>>,
}
impl<'a> Track<'a> {
    /// The total amount of bytes taken by the events, equal to `length` for decoded tracks.
    pub fn consumed(&self) -> usize {
        self.events.iter().map(TrackEvent::consumed).sum()
    }

    /// The length of the track in ticks, ie. the sum of every delta time.
    pub fn duration_ticks(&self) -> u64 {
        self.events
            .iter()
            .fold(0u64, |acc, ev| acc.saturating_add(ev.delta))
    }
}

/// Where the track decoder stands within an event.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum ParseState {
    /// At the status byte of an event, right after its delta time.
    AwaitingEvent,
    /// After an `0xFF` prefix.
    AwaitingMetaType,
    /// At the first data byte of a channel message without status byte.
    AwaitingRunningStatusData,
    /// Either the end of track was found or an error occurred.
    Done,
}

/// An iterator over the events of a single track.
///
/// Yields an error at most once, after which it stops.
#[derive(Clone, Debug)]
pub struct EventIter<'a> {
    track_number: usize,
    length: u32,
    raw: Cursor<'a>,
    running_status: Option<u8>,
    state: ParseState,
}
impl<'a> EventIter<'a> {
    fn new(track_number: usize, body: Cursor<'a>) -> EventIter<'a> {
        EventIter {
            track_number,
            length: body.unread().len() as u32,
            raw: body,
            running_status: None,
            state: ParseState::AwaitingEvent,
        }
    }

    /// The 0-based index of this track.
    #[inline]
    pub fn track_number(&self) -> usize {
        self.track_number
    }

    /// Get the remaining unread bytes of the track.
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        self.raw.unread()
    }

    /// The status byte a data byte would currently be decoded with.
    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Decode the remaining events into a `Track`.
    pub fn into_track(mut self) -> Result<Track<'a>> {
        let mut events = Vec::with_capacity(self.raw.unread().len() / 3);
        for event in &mut self {
            events.push(event.context(err_invalid!("failed to parse track"))?);
        }
        debug!(
            track_number = self.track_number,
            events = events.len(),
            "decoded track"
        );
        Ok(Track {
            track_number: self.track_number,
            length: self.length,
            events,
        })
    }

    fn read_event(&mut self) -> Result<Option<TrackEvent<'a>>> {
        if self.state == ParseState::Done {
            return Ok(None);
        }
        let start = self.raw;
        ensure!(
            !self.raw.is_empty(),
            Error::at(
                err_invalid!("track ended without end of track event"),
                self.raw.position()
            )
        );
        let delta = VariableLengthValue::read(&mut self.raw)
            .context(err_invalid!("failed to read event deltatime"))?
            .checked_u64("delta time")
            .map_err(|kind| Error::at(kind, start.position()))?;
        let kind = loop {
            let pos = self.raw.position();
            match self.state {
                ParseState::AwaitingEvent => {
                    let status = self
                        .raw
                        .peek()
                        .ok_or_else(|| Error::at(ErrorKind::UnexpectedEndOfData, pos))?;
                    match status {
                        0x00..=0x7F => self.state = ParseState::AwaitingRunningStatusData,
                        0xFF => {
                            self.raw.read_u8()?;
                            self.state = ParseState::AwaitingMetaType;
                        }
                        0x80..=0xEF => {
                            self.raw.read_u8()?;
                            self.running_status = Some(status);
                            break EventKind::read_channel(status, &mut self.raw)?;
                        }
                        0xF0 | 0xF7 => {
                            self.raw.read_u8()?;
                            self.running_status = None;
                            break EventKind::read_sysex(status, &mut self.raw)?;
                        }
                        0xF1..=0xF6 => bail!(Error::at(
                            err_invalid!("standard midi files cannot contain system common events"),
                            pos
                        )),
                        0xF8..=0xFE => bail!(Error::at(
                            err_invalid!(
                                "standard midi files cannot contain system realtime events"
                            ),
                            pos
                        )),
                    }
                }
                ParseState::AwaitingRunningStatusData => {
                    let status = self.running_status.ok_or_else(|| {
                        Error::at(
                            err_invalid!("event missing status with no running status active"),
                            pos,
                        )
                    })?;
                    break EventKind::read_channel(status, &mut self.raw)?;
                }
                ParseState::AwaitingMetaType => {
                    self.running_status = None;
                    break EventKind::Meta(
                        MetaEvent::decode(&mut self.raw)
                            .context(err_invalid!("failed to read meta event"))?,
                    );
                }
                ParseState::Done => return Ok(None),
            }
        };
        self.state = if kind.is_end_of_track() {
            ensure!(
                self.raw.is_empty(),
                Error::at(
                    err_invalid!("end of track event before end of track chunk"),
                    self.raw.position()
                )
            );
            ParseState::Done
        } else {
            ParseState::AwaitingEvent
        };
        let bytes = self.raw.consumed_since(&start);
        trace!(
            track_number = self.track_number,
            offset = start.position(),
            delta,
            len = bytes.len(),
            "decoded event"
        );
        Ok(Some(TrackEvent { delta, bytes, kind }))
    }
}
impl<'a> Iterator for EventIter<'a> {
    type Item = Result<TrackEvent<'a>>;

    #[inline]
    fn next(&mut self) -> Option<Result<TrackEvent<'a>>> {
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                //Ensure `read_event` isn't called again
                //The cursor is left in the middle of a malformed event
                self.state = ParseState::Done;
                Some(Err(err))
            }
        }
    }
}
