use std::fmt;

pub const RECORD_PREFIX: &[u8] = b"data:";

/// The payload of one `data: ` line, prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record(Vec<u8>);

impl Record {
    fn from_line(line: &[u8]) -> Option<Self> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = line.strip_prefix(RECORD_PREFIX)?;
        // the field value may be separated by a single space
        let payload = payload.strip_prefix(b" ").unwrap_or(payload);
        Some(Self(payload.to_vec()))
    }

    pub fn payload(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Splits an incoming byte stream into records.
///
/// Bytes after the last newline are kept until the next chunk arrives,
/// so a record may be split at any byte offset, including inside a
/// multi-byte character.
#[derive(Debug, Default)]
pub struct RecordSplitter {
    buffer: Vec<u8>,
}

impl RecordSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Record> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            if let Some(record) = Record::from_line(&self.buffer[start..end]) {
                records.push(record);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        records
    }

    /// Flushes an unterminated last line once the stream has ended.
    pub fn finish(self) -> Option<Record> {
        if self.buffer.is_empty() {
            return None;
        }
        Record::from_line(&self.buffer)
    }
}
