//! There's an abomination called RMID, MIDI embedded in a RIFF file.
//! Support for these files is provided by unwrapping the input slice, stripping away the RIFF
//! wrappers around the raw SMF file.

use crate::prelude::*;

/// Iterates over RIFF chunks, which have little-endian lengths and are padded to an even size.
struct ChunkIter<'a>(Cursor<'a>);
impl<'a> Iterator for ChunkIter<'a> {
    type Item = ([u8; 4], Cursor<'a>);
    fn next(&mut self) -> Option<([u8; 4], Cursor<'a>)> {
        if self.0.unread().len() < 8 {
            return None;
        }
        let mut id = [0; 4];
        let mut len = [0; 4];
        id.copy_from_slice(self.0.read(4).ok()?);
        len.copy_from_slice(self.0.read(4).ok()?);
        let len = u32::from_le_bytes(len);
        let pos = self.0.position();
        let data = match self.0.read(len as usize) {
            Ok(data) => data,
            Err(_) => self.0.read_rest(),
        };
        if len % 2 == 1 {
            let _pad = self.0.read(1);
        }
        Some((id, Cursor::with_offset(data, pos)))
    }
}

/// Find the SMF data inside an RMID file.
///
/// The returned cursor keeps the offset of the SMF data within `raw`.
pub fn unwrap(raw: &[u8]) -> Result<Cursor> {
    let (id, mut riff) = ChunkIter(Cursor::new(raw))
        .next()
        .ok_or(err_invalid!("no main riff chunk"))?;
    ensure!(&id == b"RIFF", err_invalid!("invalid main riff chunk"));
    let formtype = riff
        .read(4)
        .context(err_invalid!("failed to read riff formtype"))?;
    ensure!(formtype == b"RMID", err_invalid!("not an rmid riff file"));
    for (id, chunk) in ChunkIter(riff) {
        if &id == b"data" {
            return Ok(chunk);
        }
    }
    bail!(err_invalid!("no rmid data chunk"))
}
