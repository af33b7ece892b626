//! `multipart/form-data` body encoding for story uploads.
//!
//! File parts are referenced by path and only opened when the body is
//! sent, so an upload never holds the media file in memory.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// A form being assembled into a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    segments: Vec<Segment>,
}

/// One run of the encoded body: literal bytes, or the contents of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A finished form. Cloning it copies part headers, never file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    segments: Vec<Segment>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("story-boundary-{}", Uuid::new_v4().simple()))
    }

    /// Form with a fixed boundary, for reproducible bodies.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            segments: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the `content-type` header matching this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part(name, None, None);
        self.push_bytes(value.as_bytes());
        self.push_bytes(b"\r\n");
        self
    }

    /// File part streamed from `path` when the body is read.
    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.open_part(name, Some(filename), Some(content_type));
        self.segments.push(Segment::File(path.into()));
        self.push_bytes(b"\r\n");
        self
    }

    /// Close the form.
    pub fn finish(mut self) -> MultipartBody {
        let trailer = format!("--{}--\r\n", self.boundary);
        self.push_bytes(trailer.as_bytes());
        MultipartBody {
            segments: self.segments,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        match self.segments.last_mut() {
            Some(Segment::Bytes(last)) => last.extend_from_slice(bytes),
            _ => self.segments.push(Segment::Bytes(bytes.to_vec())),
        }
    }

    fn open_part(&mut self, name: &str, filename: Option<&str>, content_type: Option<&str>) {
        let mut head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            self.boundary,
            escape_quoted(name)
        );
        if let Some(filename) = filename {
            head.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
        }
        head.push_str("\r\n");
        if let Some(content_type) = content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        head.push_str("\r\n");
        self.push_bytes(head.as_bytes());
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Paths of the file parts, in body order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::File(path) => Some(path.as_path()),
            Segment::Bytes(_) => None,
        })
    }

    /// Open every file part and chain the segments into one reader.
    pub fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        let mut reader: Box<dyn Read + Send> = Box::new(io::empty());
        for segment in &self.segments {
            reader = match segment {
                Segment::Bytes(bytes) => Box::new(reader.chain(Cursor::new(bytes.clone()))),
                Segment::File(path) => Box::new(reader.chain(File::open(path)?)),
            };
        }
        Ok(reader)
    }

    /// Read the whole encoded body into memory.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.reader()?.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Percent-encode the characters that would terminate a quoted header parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(bytes: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        file
    }

    #[test]
    fn encodes_text_and_file_parts() {
        let file = media(b"\x00\x01");
        let body = MultipartForm::with_boundary("XYZ")
            .file("file", "a.jpg", "image/*", file.path())
            .text("caption", "hello")
            .finish()
            .to_vec()
            .unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"file\"; \
              filename=\"a.jpg\"\r\nContent-Type: image/*\r\n\r\n",
        );
        expected.extend_from_slice(b"\x00\x01\r\n");
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nhello\r\n",
        );
        expected.extend_from_slice(b"--XYZ--\r\n");
        assert_eq!(body, expected);
    }

    #[test]
    fn file_contents_stay_on_disk_until_read() {
        let file = media(b"large video payload");
        let body = MultipartForm::with_boundary("B")
            .text("type", "video")
            .file("file", "v.mp4", "video/*", file.path())
            .finish();

        assert_eq!(body.segments().len(), 3);
        assert_eq!(body.files().collect::<Vec<_>>(), vec![file.path()]);
        for segment in body.segments() {
            if let Segment::Bytes(bytes) = segment {
                assert!(!bytes.windows(5).any(|w| w == b"large"));
            }
        }
    }

    #[test]
    fn reader_streams_current_file_contents() {
        let file = media(b"old");
        let body = MultipartForm::with_boundary("B")
            .file("file", "a.jpg", "image/*", file.path())
            .finish();
        std::fs::write(file.path(), b"new").unwrap();
        let text = String::from_utf8(body.to_vec().unwrap()).unwrap();
        assert!(text.contains("\r\n\r\nnew\r\n--B--\r\n"));
    }

    #[test]
    fn missing_file_fails_when_opened() {
        let body = MultipartForm::with_boundary("B")
            .file("file", "gone.jpg", "image/*", "/no/such/story.jpg")
            .finish();
        let err = body.reader().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn quotes_in_filenames_are_escaped() {
        let file = media(b"");
        let body = MultipartForm::with_boundary("B")
            .file("file", "we\"ird.png", "image/*", file.path())
            .finish();
        let text = String::from_utf8(body.to_vec().unwrap()).unwrap();
        assert!(text.contains("filename=\"we%22ird.png\""));
    }

    #[test]
    fn random_boundaries_differ() {
        let a = MultipartForm::new();
        let b = MultipartForm::new();
        assert_ne!(a.boundary(), b.boundary());
        assert!(a
            .content_type()
            .starts_with("multipart/form-data; boundary=story-boundary-"));
    }
}
