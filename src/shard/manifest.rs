//! MD5 manifest
//!
//! `STUB.md5` lists one checksum line per shard file plus a final line
//! for the original input stream, in md5sum's text format: lowercase
//! hex digest, two spaces, base filename (`-` for the stream line).
//! The manifest is advisory; recovery never enforces it.

use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Incrementally written `STUB.md5` file.
pub struct Manifest {
    out: BufWriter<File>,
}

impl Manifest {
    pub fn create(stub: &str) -> Result<Self> {
        let file = File::create(format!("{stub}.md5"))?;
        Ok(Manifest {
            out: BufWriter::new(file),
        })
    }

    /// Append one checksum line. Directory components of `filename`
    /// are stripped so the manifest verifies from the shard directory.
    pub fn record(&mut self, filename: &str, digest: impl AsRef<[u8]>) -> Result<()> {
        writeln!(
            self.out,
            "{}  {}",
            hex::encode(digest),
            base_name(filename)
        )?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Final path component, splitting on either separator.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use md5::{Digest, Md5};
    use std::fs;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("plain"), "plain");
        assert_eq!(base_name("a/b/c00"), "c00");
        assert_eq!(base_name("a\\b\\c00"), "c00");
        assert_eq!(base_name("-"), "-");
    }

    #[test]
    fn test_manifest_format() {
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("set.").to_str().unwrap().to_string();

        let mut manifest = Manifest::create(&stub).unwrap();
        manifest
            .record(&format!("{stub}00"), Md5::digest(b"hello"))
            .unwrap();
        manifest.record("-", Md5::digest(b"")).unwrap();
        manifest.finish().unwrap();

        let text = fs::read_to_string(format!("{stub}.md5")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "5d41402abc4b2a76b9719d911017c592  set.00"
        );
        // md5 of the empty stream
        assert_eq!(lines[1], "d41d8cd98f00b204e9800998ecf8427e  -");
    }
}
