//! The public entry point: `P4kArchive` parses an archive's central
//! directory once at load and hands out per-entry readers lazily, mirroring
//! `libforge::DataCore::load`'s borrowed-view convention.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use binrw::{BinRead, BinReaderExt};
use libcommon::ByteView;
use log::{debug, warn};

use crate::crypto;
use crate::decompress::EntryDecoder;
use crate::entry::{read_central_directory_entry, P4kEntry};
use crate::error::{Error, Result};
use crate::zip::{self, EndOfCentralDirectory, LocalFileHeader};

/// A cooperative cancellation signal for long-running archive-wide
/// operations (§5: "any long operation... must honour a cooperative
/// cancellation signal checked between records/entries"). `extract_all`
/// polls this between entries; partial output already written stays on
/// disk.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

impl<F: Fn() -> bool> CancelSignal for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Never cancels; the default for callers that don't need to interrupt an
/// extraction in progress.
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A parsed P4K/ZIP archive: its central directory, indexed by name, ready
/// to open individual entries on demand. Nothing but the directory itself is
/// read at load; entry bytes are only touched when [`P4kArchive::open_entry`]
/// is called.
pub struct P4kArchive<'d> {
    view: ByteView<'d>,
    key: [u8; 16],
    entries: Vec<P4kEntry>,
    by_name: HashMap<String, usize>,
}

/// Summarises one [`P4kArchive::extract_all`] run: which entries were
/// written to disk, and which were skipped or failed without aborting the
/// rest of the traversal (§7: "a decrypt or decompress failure of one P4K
/// entry must not abort the whole archive traversal").
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: Vec<String>,
    pub skipped: Vec<(String, String)>,
    pub cancelled: bool,
}

impl<'d> P4kArchive<'d> {
    /// Parses `view`'s end-of-central-directory record and walks its
    /// central directory, decrypting nothing yet. `key` is used only when an
    /// entry is later opened and turns out to need it.
    pub fn load(view: ByteView<'d>, key: [u8; 16]) -> Result<Self> {
        let (eocd, eocd_offset) = EndOfCentralDirectory::find(view.as_slice())?;

        let mut entries = Vec::with_capacity(eocd.central_dir_records_total as usize);
        let mut by_name = HashMap::with_capacity(eocd.central_dir_records_total as usize);

        let dir_start = eocd.central_dir_offset as usize;
        let dir_end = dir_start
            .checked_add(eocd.central_dir_size as usize)
            .filter(|&end| end <= eocd_offset)
            .ok_or_else(|| Error::truncated("central directory runs past end of central directory record"))?;
        let dir = view.subslice(dir_start, dir_end - dir_start)?;

        let mut cursor = binrw::io::Cursor::new(dir.as_slice());
        for _ in 0..eocd.central_dir_records_total {
            let signature = cursor.read_le::<u32>()?;
            if signature != zip::CENTRAL_DIR_SIGNATURE {
                return Err(Error::truncated("central directory record signature mismatch"));
            }
            let entry = read_central_directory_entry(&mut cursor)?;
            by_name.insert(entry.name.clone(), entries.len());
            entries.push(entry);
        }

        debug!("loaded P4K archive: {} entries", entries.len());
        Ok(Self { view, key, entries, by_name })
    }

    #[must_use]
    pub fn entries(&self) -> &[P4kEntry] {
        &self.entries
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&P4kEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Every entry's filename, in central-directory order (`namelist()` in
    /// `examples/original_source/scdatatools/p4k.py`).
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Glob match over entry filenames, case-insensitive with backslashes
    /// normalised to `/`, the same convention `libforge::RecordIndex`'s
    /// filename search uses.
    #[must_use]
    pub fn search(&self, pattern: &str) -> Vec<&P4kEntry> {
        let pattern = glob::Pattern::new(&normalize_path(pattern).to_lowercase());
        let Ok(pattern) = pattern else { return Vec::new() };
        self.entries.iter().filter(|e| pattern.matches(&normalize_path(&e.name).to_lowercase())).collect()
    }

    /// Looks an entry up by its exact archive path and opens it, the
    /// single-name counterpart to [`P4kArchive::search`]'s glob matching
    /// (§4.8: "`extract(entry or glob, dest_dir)`"). `Error::NotFound` if no
    /// entry has that name.
    pub fn open_by_name(&self, name: &str) -> Result<P4kEntryReader<'d>> {
        let entry = self.by_name(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.open_entry(entry)
    }

    /// Opens `entry` for sequential reading: validates its local header,
    /// decrypts if the central directory marked it encrypted, and wraps the
    /// result in the decompressor matching its `compress_type`.
    ///
    /// State machine (§4.8): `Opened → (Decrypting?) → Decompressing → EOF`;
    /// every byte is produced by one forward pass through this function's
    /// returned reader, never revisited.
    pub fn open_entry(&self, entry: &P4kEntry) -> Result<P4kEntryReader<'d>> {
        let header_start = entry.header_offset as usize;
        let magic: [u8; 4] = self
            .view
            .subslice(header_start, 4)?
            .as_slice()
            .try_into()
            .expect("subslice of length 4");
        if magic != zip::LOCAL_HEADER_MAGIC && magic != zip::STOCK_LOCAL_HEADER_MAGIC {
            return Err(Error::BadLocalHeader {
                offset: entry.header_offset,
                reason: "signature did not match PK\\x03\\x14 or PK\\x03\\x04".to_string(),
            });
        }

        let fixed = self.view.subslice(header_start + 4, LocalFileHeader::SIZE)?;
        let mut cursor = binrw::io::Cursor::new(fixed.as_slice());
        let local = LocalFileHeader::read(&mut cursor)?;
        zip::check_supported_flags(local.flags)?;

        let data_offset = header_start
            + 4
            + LocalFileHeader::SIZE
            + local.file_name_length as usize
            + local.extra_field_length as usize;
        let ciphertext = self.view.subslice(data_offset, entry.compress_size as usize)?;

        let inner: Box<dyn Read + 'd> = if entry.encrypted {
            let mut buf = ciphertext.as_slice().to_vec();
            crypto::decrypt(&self.key, &mut buf)?;
            Box::new(EntryDecoder::new(entry.compress_type, std::io::Cursor::new(buf))?)
        } else {
            Box::new(EntryDecoder::new(entry.compress_type, ciphertext.as_slice())?)
        };

        Ok(P4kEntryReader { inner })
    }

    /// Opens every entry matching `pattern` (via [`P4kArchive::search`]) and
    /// writes it under `dest_dir`, preserving the entry's own directory
    /// structure. Stops early (without discarding files already written) if
    /// `cancel` reports cancellation between entries; an entry that fails to
    /// open or decode is recorded in the summary and does not abort the rest
    /// of the traversal.
    pub fn extract_all(
        &self,
        pattern: &str,
        dest_dir: &Path,
        cancel: &dyn CancelSignal,
    ) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();
        for entry in self.search(pattern) {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            match self.extract_one(entry, dest_dir) {
                Ok(()) => summary.extracted.push(entry.name.clone()),
                Err(err) => {
                    warn!("skipping {}: {err}", entry.name);
                    summary.skipped.push((entry.name.clone(), err.to_string()));
                }
            }
        }
        Ok(summary)
    }

    fn extract_one(&self, entry: &P4kEntry, dest_dir: &Path) -> Result<()> {
        zip::check_supported_flags(entry.flags)?;
        let dest = dest_dir.join(normalize_path(&entry.name));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut reader = self.open_entry(entry)?;
        let mut out = fs::File::create(&dest)?;
        std::io::copy(&mut reader, &mut out)?;
        Ok(())
    }
}

/// A sequential reader over one decoded entry's plaintext bytes. Borrows
/// from the archive's memory map for an unencrypted entry, or owns a
/// decrypted buffer for an encrypted one; either way it reads forward only.
pub struct P4kEntryReader<'d> {
    inner: Box<dyn Read + 'd>,
}

impl Read for P4kEntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
