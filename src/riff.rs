//! Reads and writes the `LIST`/`INFO` chunk of the recorder's WAV files.
//!
//! hound takes care of the format and data chunks but skips everything else,
//! so the metadata written by the recorder (analog pins, gain, resolution,
//! conversion and sampling speeds, ...) is pulled out here. The walker only
//! reads chunk heads and seeks over payloads, so the sample data is never
//! loaded twice.
//!
//! An info list looks like this on disk:
//!
//! ```text
//! LIST <size> INFO  PINS <size> A0,A1\0  GAIN <size> 20mV\0 ...
//! ```

use crate::recording::RecordingError;

use nom::{
    bytes::complete::{tag, take},
    combinator::{map, verify},
    multi::many0,
    number::complete::le_u32,
    sequence::{preceded, tuple},
    IResult,
};

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

type ChunkId = [u8; 4];

/// Ordered `(id, text)` entries of an `INFO` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoList {
    entries: Vec<(String, String)>,
}

impl InfoList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text stored under the four-character `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, text)| text.as_str())
    }

    /// Sets or replaces the entry `id`. Ids are truncated or space-padded
    /// to four characters.
    pub fn set(&mut self, id: &str, text: impl Into<String>) {
        let id: String = format!("{:<4}", id).chars().take(4).collect();
        let text = text.into();
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((id, text)),
        }
    }

    /// Builder flavour of [`InfoList::set`].
    pub fn with(mut self, id: &str, text: impl Into<String>) -> Self {
        self.set(id, text);
        self
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries as `(id, text)` pairs, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn chunk_id(b: &[u8]) -> IResult<&[u8], ChunkId> {
    map(take(4usize), |s: &[u8]| [s[0], s[1], s[2], s[3]])(b)
}

fn printable_id(b: &[u8]) -> IResult<&[u8], ChunkId> {
    verify(chunk_id, |id: &ChunkId| {
        id.iter().all(|c| c.is_ascii_alphanumeric() || *c == b' ')
    })(b)
}

fn riff_head(b: &[u8]) -> IResult<&[u8], u32> {
    map(tuple((tag(b"RIFF"), le_u32, tag(b"WAVE"))), |(_, size, _)| size)(b)
}

fn chunk_head(b: &[u8]) -> IResult<&[u8], (ChunkId, u32)> {
    tuple((chunk_id, le_u32))(b)
}

fn sub_chunk(b: &[u8]) -> IResult<&[u8], (ChunkId, &[u8])> {
    let (rest, (id, size)) = tuple((printable_id, le_u32))(b)?;
    let (rest, payload) = take(size as usize)(rest)?;
    let rest = if size % 2 == 1 && !rest.is_empty() {
        &rest[1..]
    } else {
        rest
    };
    Ok((rest, (id, payload)))
}

fn info_entries(b: &[u8]) -> IResult<&[u8], Vec<(ChunkId, &[u8])>> {
    preceded(tag(b"INFO"), many0(sub_chunk))(b)
}

/// Decodes the payload of a `LIST` chunk. Lists of any other type than
/// `INFO` yield `None`.
pub fn parse_info_payload(payload: &[u8]) -> Option<InfoList> {
    let (_rest, entries) = info_entries(payload).ok()?;
    let mut info = InfoList::new();
    for (id, text) in entries {
        let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
        info.set(&latin1(&id), latin1(&text[..end]).trim_end());
    }
    Some(info)
}

/// Walks the chunks of a RIFF/WAVE stream and collects all `INFO` entries.
///
/// Chunks that run past the end of the stream end the walk, since the
/// recorder leaves a bogus data size behind when a recording is cut short.
pub fn read_info<R: Read + Seek>(reader: &mut R) -> Result<InfoList, RecordingError> {
    let mut head = [0u8; 12];
    reader.read_exact(&mut head)?;
    riff_head(&head).map_err(|_| RecordingError::Riff("not a RIFF/WAVE stream".to_owned()))?;

    let end = reader.seek(SeekFrom::End(0))?;
    let mut pos = reader.seek(SeekFrom::Start(12))?;
    let mut info = InfoList::new();
    let mut chunk = [0u8; 8];
    while pos + 8 <= end {
        reader.read_exact(&mut chunk)?;
        let (_, (id, size)) = chunk_head(&chunk)
            .map_err(|_| RecordingError::Riff("bad chunk head".to_owned()))?;
        let size = size as u64;
        let start = pos + 8;
        if start + size > end {
            break;
        }
        if &id == b"LIST" {
            let mut payload = vec![0u8; size as usize];
            reader.read_exact(&mut payload)?;
            if let Some(list) = parse_info_payload(&payload) {
                for (key, text) in list.iter() {
                    info.set(key, text);
                }
            }
        }
        pos = start + size + size % 2;
        reader.seek(SeekFrom::Start(pos))?;
    }
    Ok(info)
}

/// Reads the `INFO` entries of the WAV file at `path`.
pub fn read_info_path(path: impl AsRef<Path>) -> Result<InfoList, RecordingError> {
    let mut file = File::open(path)?;
    read_info(&mut file)
}

/// Encodes `info` as a complete `LIST` chunk.
pub fn encode_info(info: &InfoList) -> Vec<u8> {
    let mut body = b"INFO".to_vec();
    for (id, text) in info.iter() {
        let mut bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        bytes.push(0);
        body.extend_from_slice(&id.as_bytes()[..4]);
        body.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        body.extend_from_slice(&bytes);
        if bytes.len() % 2 == 1 {
            body.push(0);
        }
    }
    let mut chunk = b"LIST".to_vec();
    chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
    chunk.extend_from_slice(&body);
    chunk
}

/// Appends `info` to the end of the WAV file at `path` and fixes up the
/// RIFF size.
pub fn append_info(path: impl AsRef<Path>, info: &InfoList) -> Result<(), RecordingError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut len = file.seek(SeekFrom::End(0))?;
    if len % 2 == 1 {
        file.write_all(&[0])?;
        len += 1;
    }
    let chunk = encode_info(info);
    file.write_all(&chunk)?;
    len += chunk.len() as u64;
    let riff_size = u32::try_from(len - 8)
        .map_err(|_| RecordingError::Riff("file too large for RIFF".to_owned()))?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&riff_size.to_le_bytes())?;
    file.flush()?;
    Ok(())
}
