//! Line-oriented I/O for interval and chain files
//!
//! Opens plain, gzip (including multi-member BGZF) and bzip2 inputs behind a
//! single `BufRead`, and writes plain or gzip outputs through [`OutputSink`].

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default buffer size for readers and writers (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip or BGZF compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file extension, then magic bytes
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") | Some("bgz") => return Ok(CompressionFormat::Gzip),
        Some("bz2") => return Ok(CompressionFormat::Bzip2),
        _ => {}
    }

    let mut magic = [0u8; 3];
    let mut file = File::open(path)?;
    let bytes_read = file.read(&mut magic)?;

    Ok(sniff_magic(&magic[..bytes_read]))
}

fn sniff_magic(magic: &[u8]) -> CompressionFormat {
    if magic.len() >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        CompressionFormat::Gzip
    } else if magic.starts_with(b"BZh") {
        CompressionFormat::Bzip2
    } else {
        CompressionFormat::Plain
    }
}

/// Open a file for buffered line reading, decoding it as `format`
pub fn open_reader_as(path: &Path, format: CompressionFormat) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    Ok(match format {
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
    })
}

/// Open a file for buffered line reading with automatic format detection
pub fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let format = detect_compression(path)?;
    open_reader_as(path, format)
}

/// Line iterator that reuses a buffer to avoid allocations
///
/// Lines are returned without their `\n` terminator; any `\r` is kept so the
/// raw content can be written back unchanged.
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: String,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next line into the internal buffer
    /// Returns None at EOF, Some(Ok(&str)) on success, Some(Err) on error
    pub fn next_line(&mut self) -> Option<io::Result<&str>> {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                if self.buffer.ends_with('\n') {
                    self.buffer.pop();
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Buffered output file, optionally gzip-compressed
///
/// Dropping a sink flushes it on a best-effort basis; call [`OutputSink::finish`]
/// to observe write errors.
pub enum OutputSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputSink {
    /// Create (truncate) `path`, gzip-encoding when `compressed`
    pub fn create(path: &Path, compressed: bool) -> io::Result<Self> {
        let writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(path)?);
        Ok(if compressed {
            OutputSink::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            OutputSink::Plain(writer)
        })
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, OutputSink::Gzip(_))
    }

    /// Flush all buffered data and close the compression stream
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputSink::Plain(mut writer) => writer.flush(),
            OutputSink::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Plain(writer) => writer.write(buf),
            OutputSink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Plain(writer) => writer.flush(),
            OutputSink::Gzip(encoder) => encoder.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_buffer_size() {
        assert_eq!(DEFAULT_BUFFER_SIZE, 128 * 1024);
    }

    #[test]
    fn test_line_iterator_keeps_cr() -> io::Result<()> {
        let data: &[u8] = b"line1\nline2\r\n\nline4";
        let mut iter = LineIterator::new(data);

        assert_eq!(iter.next_line().unwrap()?, "line1");
        assert_eq!(iter.next_line().unwrap()?, "line2\r");
        assert_eq!(iter.next_line().unwrap()?, "");
        assert_eq!(iter.next_line().unwrap()?, "line4");
        assert!(iter.next_line().is_none());
        Ok(())
    }

    #[test]
    fn test_sniff_magic() {
        assert_eq!(sniff_magic(&[0x1f, 0x8b, 0x08]), CompressionFormat::Gzip);
        assert_eq!(sniff_magic(b"BZh"), CompressionFormat::Bzip2);
        assert_eq!(sniff_magic(b"chr"), CompressionFormat::Plain);
        assert_eq!(sniff_magic(b""), CompressionFormat::Plain);
    }

    #[test]
    fn test_detect_by_extension() -> io::Result<()> {
        // Extension wins without touching the file
        assert_eq!(
            detect_compression(Path::new("does/not/exist.bed.gz"))?,
            CompressionFormat::Gzip
        );
        assert_eq!(
            detect_compression(Path::new("does/not/exist.chain.bz2"))?,
            CompressionFormat::Bzip2
        );
        Ok(())
    }

    #[test]
    fn test_gzip_sink_roundtrip() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.bed");

        let mut sink = OutputSink::create(&path, true)?;
        assert!(sink.is_compressed());
        sink.write_all(b"chr1\t1\t2\n")?;
        sink.finish()?;

        // Magic sniffing picks up gzip even without the extension
        assert_eq!(detect_compression(&path)?, CompressionFormat::Gzip);
        let mut text = String::new();
        open_reader(&path)?.read_to_string(&mut text)?;
        assert_eq!(text, "chr1\t1\t2\n");
        Ok(())
    }

    #[test]
    fn test_multi_member_gzip_is_read_fully() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        for part in [&b"a\n"[..], &b"b\n"[..]] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(part)?;
            temp.write_all(&encoder.finish()?)?;
        }
        temp.flush()?;

        let mut text = String::new();
        open_reader_as(temp.path(), CompressionFormat::Gzip)?.read_to_string(&mut text)?;
        assert_eq!(text, "a\nb\n");
        Ok(())
    }
}
