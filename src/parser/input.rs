//! Character sources the parser reads PTTTL text from

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Read/seek capability over PTTTL source text.
///
/// The parser only ever moves forward with `read`; going back to an earlier
/// position always happens through an explicit `seek`.
pub trait InputSource {
    /// Fetch the next byte of source text, or `None` at end of input
    fn read(&mut self) -> io::Result<Option<u8>>;

    /// Move to an absolute 0-based byte offset.
    ///
    /// Returns `Ok(false)` if the position is outside the source, which the
    /// parser treats the same as end of input.
    fn seek(&mut self, position: u32) -> io::Result<bool>;
}

impl<S: InputSource + ?Sized> InputSource for &mut S {
    fn read(&mut self) -> io::Result<Option<u8>> {
        (**self).read()
    }

    fn seek(&mut self, position: u32) -> io::Result<bool> {
        (**self).seek(position)
    }
}

/// Source text held in memory
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    data: T,
    pos: usize,
}

impl<T: AsRef<[u8]>> MemorySource<T> {
    pub fn new(data: T) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: AsRef<[u8]>> InputSource for MemorySource<T> {
    fn read(&mut self) -> io::Result<Option<u8>> {
        let byte = self.data.as_ref().get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn seek(&mut self, position: u32) -> io::Result<bool> {
        let position = position as usize;
        if position >= self.data.as_ref().len() {
            return Ok(false);
        }
        self.pos = position;
        Ok(true)
    }
}

/// Default size of the [`StreamSource`] read window
pub const STREAM_WINDOW_LEN: usize = 4096;

/// Source text read from any seekable stream (e.g. a `File`), so the whole
/// input never has to be held in memory.
///
/// Bytes are read in windows of [`STREAM_WINDOW_LEN`]. A seek that lands
/// inside the current window only moves the read index; the inner stream is
/// sought only when the target lies outside it.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
    window: Vec<u8>,
    /// Stream offset of `window[0]`
    window_start: u64,
    /// Valid bytes in `window`
    window_len: usize,
    index: usize,
}

impl<R: Read + Seek> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_window(inner, STREAM_WINDOW_LEN)
    }

    pub fn with_window(inner: R, window_len: usize) -> Self {
        Self {
            inner,
            window: vec![0; window_len.max(1)],
            window_start: 0,
            window_len: 0,
            index: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the next window. At end of stream the current window is kept so
    /// later seeks back into it stay in memory.
    fn refill(&mut self) -> io::Result<bool> {
        let n = loop {
            match self.inner.read(&mut self.window) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            return Ok(false);
        }
        self.window_start += self.window_len as u64;
        self.window_len = n;
        self.index = 0;
        Ok(true)
    }
}

impl<R: Read + Seek> InputSource for StreamSource<R> {
    fn read(&mut self) -> io::Result<Option<u8>> {
        if self.index == self.window_len && !self.refill()? {
            return Ok(None);
        }
        let byte = self.window[self.index];
        self.index += 1;
        Ok(Some(byte))
    }

    fn seek(&mut self, position: u32) -> io::Result<bool> {
        let position = position as u64;
        let window_end = self.window_start + self.window_len as u64;
        if (self.window_start..=window_end).contains(&position) {
            self.index = (position - self.window_start) as usize;
            return Ok(true);
        }

        self.inner.seek(SeekFrom::Start(position))?;
        self.window_start = position;
        self.window_len = 0;
        self.index = 0;
        Ok(true)
    }
}

/// First two bytes of every gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress `data` if it starts with [`GZIP_MAGIC`], otherwise return it unchanged
pub fn decompress_if_gzip(data: Vec<u8>) -> io::Result<Vec<u8>> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data);
    }
    let mut decompressed = Vec::new();
    GzDecoder::new(data.as_slice()).read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Source text from a file on disk, gzipped or not.
///
/// Plain files are streamed. Gzip streams cannot seek, so they are
/// decompressed into memory. Detection is by content, not by extension.
#[derive(Debug)]
pub enum FileSource {
    Plain(StreamSource<File>),
    Gzip(MemorySource<Vec<u8>>),
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut magic = Vec::with_capacity(GZIP_MAGIC.len());
        (&mut file)
            .take(GZIP_MAGIC.len() as u64)
            .read_to_end(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        if magic == GZIP_MAGIC {
            let mut data = Vec::new();
            GzDecoder::new(file).read_to_end(&mut data)?;
            Ok(FileSource::Gzip(MemorySource::new(data)))
        } else {
            Ok(FileSource::Plain(StreamSource::new(file)))
        }
    }

    pub fn is_gzip(&self) -> bool {
        matches!(self, FileSource::Gzip(_))
    }
}

impl InputSource for FileSource {
    fn read(&mut self) -> io::Result<Option<u8>> {
        match self {
            FileSource::Plain(src) => src.read(),
            FileSource::Gzip(src) => src.read(),
        }
    }

    fn seek(&mut self, position: u32) -> io::Result<bool> {
        match self {
            FileSource::Plain(src) => src.seek(position),
            FileSource::Gzip(src) => src.seek(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn read_all(src: &mut impl InputSource) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = src.read().unwrap() {
            out.push(b);
        }
        out
    }

    #[test]
    fn test_memory_source_read_and_seek() {
        let mut src = MemorySource::new("abc");
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert_eq!(src.read().unwrap(), Some(b'b'));
        assert!(src.seek(0).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert!(src.seek(2).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'c'));
        assert_eq!(src.read().unwrap(), None);
    }

    #[test]
    fn test_memory_source_seek_past_end() {
        let mut src = MemorySource::new(b"ab".to_vec());
        assert!(!src.seek(2).unwrap());
        assert!(!src.seek(100).unwrap());
        assert_eq!(src.position(), 0);
    }

    /// Cursor that counts how often it is sought
    struct CountingCursor {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl Read for CountingCursor {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for CountingCursor {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    fn counting(data: &[u8]) -> CountingCursor {
        CountingCursor {
            inner: Cursor::new(data.to_vec()),
            seeks: 0,
        }
    }

    #[test]
    fn test_stream_source_seeks_within_window() {
        let mut src = StreamSource::new(counting(b"abcdef"));
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert!(src.seek(4).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'e'));
        assert!(src.seek(1).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'b'));
        assert_eq!(src.get_ref().seeks, 0);
    }

    #[test]
    fn test_stream_source_seeks_outside_window() {
        let mut src = StreamSource::with_window(counting(b"abcdefgh"), 2);
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert!(src.seek(6).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'g'));
        assert_eq!(src.read().unwrap(), Some(b'h'));
        assert_eq!(src.read().unwrap(), None);
        assert!(src.seek(1).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'b'));
        assert_eq!(src.read().unwrap(), Some(b'c'));
        assert_eq!(src.get_ref().seeks, 2);
    }

    #[test]
    fn test_stream_source_keeps_window_at_end() {
        let mut src = StreamSource::new(counting(b"ab"));
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert_eq!(src.read().unwrap(), Some(b'b'));
        assert_eq!(src.read().unwrap(), None);
        assert_eq!(src.read().unwrap(), None);
        assert!(src.seek(0).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'a'));
        assert_eq!(src.get_ref().seeks, 0);
    }

    #[test]
    fn test_interleaved_parse_does_not_seek_stream() {
        let text = "x:b=100:c,d|e,f;g|a;c|d";
        let mut src = StreamSource::new(counting(text.as_bytes()));
        {
            let mut parser = crate::parser::Parser::new(&mut src).unwrap();
            for _ in 0..3 {
                for ch in 0..2 {
                    parser.parse_next(ch).unwrap();
                    parser.parse_next(ch).unwrap();
                }
            }
            assert_eq!(parser.notes(0).count(), 0);
            assert_eq!(parser.notes(1).count(), 0);
        }
        assert_eq!(src.get_ref().seeks, 0);
    }

    #[test]
    fn test_stream_source() {
        let mut src = StreamSource::new(Cursor::new(b"xyz".to_vec()));
        assert_eq!(src.read().unwrap(), Some(b'x'));
        assert!(src.seek(2).unwrap());
        assert_eq!(src.read().unwrap(), Some(b'z'));
        assert_eq!(src.read().unwrap(), None);
    }

    #[test]
    fn test_decompress_if_gzip() {
        assert_eq!(decompress_if_gzip(gzip(b"x:b=100:c")).unwrap(), b"x:b=100:c");
        assert_eq!(decompress_if_gzip(b"x:b=100:c".to_vec()).unwrap(), b"x:b=100:c");
        assert_eq!(decompress_if_gzip(vec![0x1f]).unwrap(), vec![0x1f]);
    }

    #[test]
    fn test_file_source_detects_gzip_by_content() {
        let dir = tempdir().unwrap();

        // gzipped but named like plain text
        let hidden = dir.path().join("song.txt");
        std::fs::write(&hidden, gzip(b"abc")).unwrap();
        let mut src = FileSource::open(&hidden).unwrap();
        assert!(src.is_gzip());
        assert_eq!(read_all(&mut src), b"abc");

        // plain text named like gzip
        let fake = dir.path().join("song.gz");
        std::fs::write(&fake, b"abc").unwrap();
        let mut src = FileSource::open(&fake).unwrap();
        assert!(!src.is_gzip());
        assert_eq!(read_all(&mut src), b"abc");
        assert!(src.seek(1).unwrap());
        assert_eq!(read_all(&mut src), b"bc");
    }

    #[test]
    fn test_file_source_short_files() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(read_all(&mut FileSource::open(&empty).unwrap()), b"");

        let one = dir.path().join("one");
        std::fs::write(&one, [0x1f]).unwrap();
        let mut src = FileSource::open(&one).unwrap();
        assert!(!src.is_gzip());
        assert_eq!(read_all(&mut src), vec![0x1f]);
    }
}
