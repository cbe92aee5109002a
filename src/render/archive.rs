//! Read-only ZIP access for finished ePub archives.
//!
//! Entries are listed from the central directory. Stored and deflated
//! entries can be read back; CRC-32 is checked on every read. ZIP64 and
//! encrypted archives are rejected.

use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_DIRECTORY_SIG: u32 = 0x0605_4b50;
const END_OF_DIRECTORY_LEN: usize = 22;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;
const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATED: u16 = 8;

/// One central directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: String,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub size: u64,
    local_offset: u64,
}

impl ZipEntry {
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

#[derive(Debug, Clone)]
pub struct ZipArchive<'a> {
    bytes: &'a [u8],
    entries: Vec<ZipEntry>,
}

impl<'a> ZipArchive<'a> {
    /// Parse the central directory of `bytes`
    pub fn parse(bytes: &'a [u8]) -> Result<Self, String> {
        let eocd = find_end_of_directory(bytes).ok_or("no end of central directory record")?;
        let count = u16_at(bytes, eocd + 10).ok_or("truncated directory record")? as usize;
        let dir_size = u32_at(bytes, eocd + 12).ok_or("truncated directory record")?;
        let dir_offset = u32_at(bytes, eocd + 16).ok_or("truncated directory record")?;
        if count == usize::from(u16::MAX) || dir_offset == u32::MAX || dir_size == u32::MAX {
            return Err("ZIP64 archives are not supported".to_string());
        }

        let mut entries = Vec::with_capacity(count);
        let mut at = dir_offset as usize;
        for index in 0..count {
            if u32_at(bytes, at) != Some(CENTRAL_HEADER_SIG) {
                return Err(format!("central directory entry {} is corrupt", index));
            }
            let field = |offset: usize| u16_at(bytes, at + offset).ok_or("truncated entry");
            let word = |offset: usize| u32_at(bytes, at + offset).ok_or("truncated entry");
            let flags = field(8)?;
            let method = field(10)?;
            let crc32 = word(16)?;
            let compressed_size = word(20)?;
            let size = word(24)?;
            let name_len = field(28)? as usize;
            let extra_len = field(30)? as usize;
            let comment_len = field(32)? as usize;
            let local_offset = word(42)?;
            if flags & 1 != 0 {
                return Err(format!("entry {} is encrypted", index));
            }
            let name_start = at + CENTRAL_HEADER_LEN;
            let name = bytes
                .get(name_start..name_start + name_len)
                .ok_or("truncated entry name")?;
            entries.push(ZipEntry {
                name: String::from_utf8_lossy(name).into_owned(),
                method,
                crc32,
                compressed_size: u64::from(compressed_size),
                size: u64::from(size),
                local_offset: u64::from(local_offset),
            });
            at = name_start + name_len + extra_len + comment_len;
        }
        Ok(Self { bytes, entries })
    }

    /// Entries in central directory order
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entry at the start of the file, which is what readers sniff
    pub fn first_entry(&self) -> Option<&ZipEntry> {
        self.entries.iter().min_by_key(|e| e.local_offset)
    }

    /// Uncompressed contents of `name`, or `None` when there is no such entry
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, String> {
        match self.entry(name) {
            Some(entry) => self.read_entry(entry).map(Some),
            None => Ok(None),
        }
    }

    pub fn read_entry(&self, entry: &ZipEntry) -> Result<Vec<u8>, String> {
        let at = entry.local_offset as usize;
        if u32_at(self.bytes, at) != Some(LOCAL_HEADER_SIG) {
            return Err(format!("{}: bad local header", entry.name));
        }
        let name_len = u16_at(self.bytes, at + 26).ok_or("truncated local header")? as usize;
        let extra_len = u16_at(self.bytes, at + 28).ok_or("truncated local header")? as usize;
        let start = at + LOCAL_HEADER_LEN + name_len + extra_len;
        let data = self
            .bytes
            .get(start..start + entry.compressed_size as usize)
            .ok_or_else(|| format!("{}: data runs past the end of the archive", entry.name))?;

        let contents = match entry.method {
            METHOD_STORED => data.to_vec(),
            METHOD_DEFLATED => {
                let mut out = Vec::with_capacity(entry.size as usize);
                DeflateDecoder::new(data)
                    .take(entry.size + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| format!("{}: {}", entry.name, e))?;
                out
            }
            other => return Err(format!("{}: unsupported compression method {}", entry.name, other)),
        };
        if contents.len() as u64 != entry.size {
            return Err(format!(
                "{}: expected {} bytes, got {}",
                entry.name,
                entry.size,
                contents.len()
            ));
        }
        let mut crc = Crc::new();
        crc.update(&contents);
        if crc.sum() != entry.crc32 {
            return Err(format!("{}: CRC mismatch", entry.name));
        }
        Ok(contents)
    }
}

fn find_end_of_directory(bytes: &[u8]) -> Option<usize> {
    let last = bytes.len().checked_sub(END_OF_DIRECTORY_LEN)?;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last)
        .rev()
        .find(|&at| u32_at(bytes, at) == Some(END_OF_DIRECTORY_SIG))
}

fn u16_at(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
