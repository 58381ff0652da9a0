//! Compressed tabular I/O.
//!
//! KGTK files are tab-delimited with a header row. Files ending in
//! `.gz`, `.bz2`, or `.xz` are transparently (de)compressed as streams.
//! Output rows use Unix line endings with no quoting; tab, newline,
//! carriage-return, and backslash inside values are backslash-escaped.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Stream compression selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Detect compression from a path's extension.
    pub fn of_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            Some("xz") => Self::Xz,
            _ => Self::None,
        }
    }
}

/// Open `path` for reading, decompressing according to its extension.
pub fn open_to_read(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match Compression::of_path(path) {
        Compression::None => Box::new(file),
        Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(file)),
        Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(file)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(file)),
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Open `path` for writing, compressing according to its extension.
pub fn open_to_write(path: &Path) -> io::Result<Box<dyn Write>> {
    let file = File::create(path)?;
    Ok(match Compression::of_path(path) {
        Compression::None => Box::new(BufWriter::new(file)),
        Compression::Gzip => Box::new(BufWriter::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        ))),
        Compression::Bzip2 => Box::new(BufWriter::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::default(),
        ))),
        Compression::Xz => Box::new(BufWriter::new(xz2::write::XzEncoder::new(file, 6))),
    })
}

/// Backslash-escape field separators and line endings inside a value.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.contains(['\t', '\n', '\r', '\\']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Write one tab-delimited row with escaped fields and a Unix line ending.
pub fn write_row<W: Write + ?Sized>(out: &mut W, fields: &[String]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_all(b"\t")?;
        }
        out.write_all(escape_field(field).as_bytes())?;
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_compression_detection() {
        assert_eq!(Compression::of_path(Path::new("graph.tsv")), Compression::None);
        assert_eq!(Compression::of_path(Path::new("graph.tsv.gz")), Compression::Gzip);
        assert_eq!(Compression::of_path(Path::new("graph.tsv.bz2")), Compression::Bzip2);
        assert_eq!(Compression::of_path(Path::new("graph.tsv.xz")), Compression::Xz);
    }

    #[test]
    fn test_escape_field_passthrough() {
        assert!(matches!(escape_field("Hans"), Cow::Borrowed("Hans")));
    }

    #[test]
    fn test_escape_field_separators() {
        assert_eq!(escape_field("a\tb"), "a\\tb");
        assert_eq!(escape_field("a\nb"), "a\\nb");
        assert_eq!(escape_field("a\\b"), "a\\\\b");
        assert_eq!(escape_field("a\rb"), "a\\rb");
    }

    #[test]
    fn test_write_row() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["e11".into(), "Hans\tX".into()]).unwrap();
        assert_eq!(buf, b"e11\tHans\\tX\n");
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv.gz");
        {
            let mut out = open_to_write(&path).unwrap();
            out.write_all(b"node1\tlabel\nHans\tloves\n").unwrap();
            out.flush().unwrap();
        }
        let mut text = String::new();
        open_to_read(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "node1\tlabel\nHans\tloves\n");
    }
}
