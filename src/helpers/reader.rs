use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

/// A byte stream a workbook can be read from and written back to.
///
/// Implemented for local files and in-memory buffers. `truncate` lets a rewritten
/// package shorter than the original replace it without trailing bytes.
pub trait SourceStream: Read + Write + Seek + Send {
    /// Shrinks or extends the stream to `len` bytes
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl SourceStream for File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

impl SourceStream for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

/// Reads the whole stream from its beginning
pub(crate) fn read_all(stream: &mut dyn SourceStream) -> std::io::Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Replaces the whole content of the stream with `bytes`
pub(crate) fn replace_all(stream: &mut dyn SourceStream, bytes: &[u8]) -> std::io::Result<()> {
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(bytes)?;
    stream.truncate(bytes.len() as u64)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_all_drops_trailing_bytes() {
        let mut stream = Cursor::new(b"0123456789".to_vec());
        replace_all(&mut stream, b"abc").unwrap();
        assert_eq!(read_all(&mut stream).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn file_stream_round_trip() {
        let mut file = tempfile::tempfile().unwrap();
        replace_all(&mut file, b"first version").unwrap();
        replace_all(&mut file, b"second").unwrap();
        assert_eq!(read_all(&mut file).unwrap(), b"second".to_vec());
    }
}
