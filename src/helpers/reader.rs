use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;

/// A unified reader over the two workbook sources the driver accepts: a local
/// file path, or an in-memory byte buffer the caller already holds.
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory byte buffer
    Bytes(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local file as a workbook source.
    pub(crate) fn from_path(file_name: &str) -> std::io::Result<UnifiedReader> {
        let file = File::open(file_name)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps an in-memory byte buffer as a workbook source.
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Bytes(Cursor::new(bytes))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Bytes(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Bytes(reader) => reader.seek(pos),
        }
    }
}
