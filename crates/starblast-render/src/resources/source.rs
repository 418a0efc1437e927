use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one image source *object*.
///
/// Assigned at construction and never reused, so two sources created from
/// byte-identical data still have distinct ids. This is the texture cache
/// key: identity, not content.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SourceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Byte stream an image is decoded from.
///
/// Implemented by asset storage outside the rendering core. `read` may
/// return short counts; `close` must be safe to call at any time.
pub trait ImageSource {
    fn id(&self) -> SourceId;

    /// Human-readable name for diagnostics (a path for file sources).
    fn name(&self) -> &str;

    fn open(&mut self) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self);
}

/// One source shared between every sprite that uses the same texture.
///
/// Sharing the `Rc` is what makes the cache hit: the id travels with the
/// object, and a second sprite holding a clone resolves to the same entry.
pub type SharedSource = Rc<RefCell<dyn ImageSource>>;

/// Wraps a concrete source for sharing across sprites.
pub fn shared<S: ImageSource + 'static>(source: S) -> SharedSource {
    Rc::new(RefCell::new(source))
}

/// Image source backed by a file on disk.
pub struct FileSource {
    id: SourceId,
    path: PathBuf,
    name: String,
    file: Option<File>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            id: SourceId::next(),
            path,
            name,
            file: None,
        }
    }

    /// File length in bytes, without opening the stream.
    pub fn len(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

impl ImageSource for FileSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> io::Result<()> {
        self.file = Some(File::open(&self.path)?);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "source not open")),
        }
    }

    fn close(&mut self) {
        self.file = None;
    }
}

/// Image source backed by an in-memory byte slice (embedded assets, tests).
pub struct MemorySource {
    id: SourceId,
    name: String,
    bytes: Vec<u8>,
    cursor: Option<usize>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: SourceId::next(),
            name: name.into(),
            bytes: bytes.into(),
            cursor: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }
}

impl ImageSource for MemorySource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> io::Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(pos) = self.cursor else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "source not open"));
        };
        let remaining = &self.bytes[pos.min(self.bytes.len())..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.cursor = Some(pos + count);
        Ok(count)
    }

    fn close(&mut self) {
        self.cursor = None;
    }
}

/// `io::Read` adapter so decoders can consume an open [`ImageSource`].
pub(crate) struct SourceReader<'a>(pub &'a mut dyn ImageSource);

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_distinct_identity() {
        let a = MemorySource::new("a", vec![1, 2, 3]);
        let b = MemorySource::new("b", vec![1, 2, 3]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn id_is_stable_for_one_object() {
        let a = MemorySource::new("a", vec![]);
        assert_eq!(a.id(), a.id());
    }

    #[test]
    fn read_before_open_fails() {
        let mut src = MemorySource::new("a", vec![1, 2, 3]);
        assert!(src.read(&mut [0; 2]).is_err());
    }

    #[test]
    fn sequential_reads_until_exhausted() {
        let mut src = MemorySource::new("a", vec![1, 2, 3]);
        src.open().unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(src.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(src.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn file_source_reports_length_and_streams_bytes() {
        let path = std::env::temp_dir().join("starblast-file-source-test.bin");
        std::fs::write(&path, [7u8, 8, 9]).unwrap();

        let mut src = FileSource::new(&path);
        assert_eq!(src.len().unwrap(), 3);

        src.open().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[7, 8, 9]);
        src.close();
        assert!(src.read(&mut buf).is_err());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn close_then_read_fails_again() {
        let mut src = MemorySource::new("a", vec![1]);
        src.open().unwrap();
        src.close();
        assert!(!src.is_open());
        assert!(src.read(&mut [0; 1]).is_err());
    }
}
