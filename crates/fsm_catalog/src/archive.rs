use std::fs::File;
use std::io::{Read, Seek};

use camino::Utf8Path;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Name of the descriptor entry every mod archive is expected to carry.
pub const DESCRIPTOR_ENTRY: &str = "modDesc.xml";

/// Largest entry extracted into memory.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Upper bound for preallocation; the declared entry size is not trusted.
const PREALLOC_CAP: u64 = 64 * 1024;

/// Read-only view of a mod archive.
///
/// Entries are extracted into memory; nothing is written to disk.
pub struct ModArchive<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ModArchive<File> {
    /// Open the archive at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let file = File::open(path.as_std_path())?;
        Self::new(file)
    }
}

impl<R: Read + Seek> ModArchive<R> {
    /// Create a new archive view from a reader.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// List entry names, with `\` separators normalized to `/`.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(normalize_entry_name).collect()
    }

    /// Read the bytes of `name`.
    ///
    /// The exact name is tried first, then a case-insensitive match against the
    /// normalized entry names. Returns `Ok(None)` when no entry matches and
    /// [`Error::EntryTooLarge`] past [`MAX_ENTRY_BYTES`].
    pub fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        self.read_entry_limited(name, MAX_ENTRY_BYTES)
    }

    fn read_entry_limited(&mut self, name: &str, limit: u64) -> Result<Option<Vec<u8>>> {
        let wanted = normalize_entry_name(name);

        let index = match self.archive.index_for_name(&wanted) {
            Some(index) => Some(index),
            None => {
                let wanted_lower = wanted.to_lowercase();
                (0..self.archive.len()).find(|&i| {
                    self.archive
                        .name_for_index(i)
                        .is_some_and(|n| normalize_entry_name(n).to_lowercase() == wanted_lower)
                })
            }
        };

        let Some(index) = index else {
            return Ok(None);
        };

        let file = self.archive.by_index(index)?;
        if file.is_dir() {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(file.size().min(PREALLOC_CAP) as usize);
        file.take(limit + 1).read_to_end(&mut data)?;
        if data.len() as u64 > limit {
            return Err(Error::EntryTooLarge {
                name: wanted,
                limit,
            });
        }
        Ok(Some(data))
    }

    /// Read the `modDesc.xml` descriptor.
    pub fn read_descriptor(&mut self) -> Result<Vec<u8>> {
        self.read_entry(DESCRIPTOR_ENTRY)?
            .ok_or(Error::MissingDescriptor)
    }
}

/// Normalize an archive entry name: forward slashes, no leading `./` or `/`.
pub fn normalize_entry_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    let mut trimmed = name.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn create_test_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_entry_exact_and_case_insensitive() {
        let data = create_test_archive(&[
            ("modDesc.xml", b"<modDesc/>"),
            ("Store/Icon_Tractor.PNG", b"png"),
        ]);
        let mut archive = ModArchive::new(Cursor::new(data)).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(
            archive.read_entry("modDesc.xml").unwrap().as_deref(),
            Some(&b"<modDesc/>"[..])
        );
        assert_eq!(
            archive.read_entry("store/icon_tractor.png").unwrap().as_deref(),
            Some(&b"png"[..])
        );
        assert_eq!(
            archive.read_entry(".\\Store\\Icon_Tractor.PNG").unwrap().as_deref(),
            Some(&b"png"[..])
        );
        assert!(archive.read_entry("missing.dds").unwrap().is_none());
    }

    /// Overwrite the uncompressed size recorded in the central directory.
    fn patch_declared_size(data: &mut [u8], declared: u64) {
        let cd = data
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .expect("central directory header");
        let name_len = u16::from_le_bytes([data[cd + 28], data[cd + 29]]) as usize;
        let extra_len = u16::from_le_bytes([data[cd + 30], data[cd + 31]]) as usize;
        let size32 = u32::from_le_bytes([data[cd + 24], data[cd + 25], data[cd + 26], data[cd + 27]]);

        if size32 != u32::MAX {
            let declared = declared.min(u64::from(u32::MAX - 1)) as u32;
            data[cd + 24..cd + 28].copy_from_slice(&declared.to_le_bytes());
            return;
        }

        let mut pos = cd + 46 + name_len;
        let end = pos + extra_len;
        while pos + 4 <= end {
            let id = u16::from_le_bytes([data[pos], data[pos + 1]]);
            let len = u16::from_le_bytes([data[pos + 2], data[pos + 3]]) as usize;
            if id == 0x0001 {
                data[pos + 4..pos + 12].copy_from_slice(&declared.to_le_bytes());
                return;
            }
            pos += 4 + len;
        }
        panic!("zip64 extra field not found");
    }

    #[test]
    fn test_huge_declared_size_does_not_preallocate() {
        let payload = b"<modDesc><title>Liar</title></modDesc>";
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(true);
        zip.start_file("modDesc.xml", options).unwrap();
        zip.write_all(payload).unwrap();
        let mut data = zip.finish().unwrap().into_inner();
        patch_declared_size(&mut data, 0x7FFF_FFFF_FFFF_FF00);

        // Either the archive is rejected or the real bytes come back; the
        // process must not abort on allocation.
        let Ok(mut archive) = ModArchive::new(Cursor::new(data)) else {
            return;
        };
        match archive.read_descriptor() {
            Ok(bytes) => assert_eq!(bytes, payload),
            Err(Error::MissingDescriptor) => panic!("descriptor entry not found"),
            Err(_) => {}
        }
    }

    #[test]
    fn test_entry_over_limit_is_an_error() {
        let data = create_test_archive(&[("modDesc.xml", &[b'x'; 32])]);
        let mut archive = ModArchive::new(Cursor::new(data)).unwrap();

        let result = archive.read_entry_limited("modDesc.xml", 8);
        assert!(matches!(
            result,
            Err(Error::EntryTooLarge { ref name, limit: 8 }) if name == "modDesc.xml"
        ));
        assert_eq!(
            archive.read_entry_limited("modDesc.xml", 32).unwrap().map(|d| d.len()),
            Some(32)
        );
    }

    #[test]
    fn test_missing_descriptor() {
        let data = create_test_archive(&[("readme.txt", b"hello")]);
        let mut archive = ModArchive::new(Cursor::new(data)).unwrap();

        let result = archive.read_descriptor();
        assert!(matches!(result, Err(Error::MissingDescriptor)));
    }

    #[test]
    fn test_empty_archive_has_no_descriptor() {
        let data = create_test_archive(&[]);
        let mut archive = ModArchive::new(Cursor::new(data)).unwrap();

        assert!(archive.is_empty());
        assert!(matches!(
            archive.read_descriptor(),
            Err(Error::MissingDescriptor)
        ));
    }

    #[test]
    fn test_not_an_archive() {
        let result = ModArchive::new(Cursor::new(b"definitely not a zip file".to_vec()));
        assert!(matches!(result, Err(Error::Zip(_))));
    }

    #[test]
    fn test_normalize_entry_name() {
        assert_eq!(normalize_entry_name("./store/icon.dds"), "store/icon.dds");
        assert_eq!(normalize_entry_name("store\\icon.dds"), "store/icon.dds");
        assert_eq!(normalize_entry_name("/icon.dds"), "icon.dds");
    }
}
