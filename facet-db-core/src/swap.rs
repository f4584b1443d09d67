//! Swap file format for evicted selection lists.
//!
//! A swap file holds the leaf entries of one list (composites stay resident)
//! in slot order. It is private to the process and deleted on rehydrate,
//! `dispose()`, or drop.
//!
//! ## Layout
//!
//! ```text
//! header (16 bytes, little-endian):
//!   magic "FSW1" | version u8 | flags u8 (bit0 = zstd) | reserved u16 | record_count u64
//! record stream (raw or one zstd frame):
//!   slot u32 | kind u8 | present u8 | state u32 | level i32 | measure f64
//!   | formatter_id u32 | format_id u32 | strings...
//! ```
//!
//! `present` flags which of label, value, original label, and measure label
//! follow as `u32` length-prefixed UTF-8 (in that order). The original label
//! is written only when it differs from the label. Format ids index the two
//! per-pass dictionaries ([`SwapDicts`]) kept in memory while swapped;
//! `u32::MAX` means "none".

use crate::config::SelectionCacheConfig;
use crate::format::{composite_id, formatter_id, FormatIndex, FormatterDict, NO_FORMAT_ID};
use crate::node::{NodeKind, SelectionNode, ValueNode};
use crate::state::ValueState;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes of a swap file header.
pub const SWAP_MAGIC: [u8; 4] = *b"FSW1";

/// Current swap format version.
pub const SWAP_VERSION: u8 = 1;

/// Fixed header length in bytes.
pub const SWAP_HEADER_LEN: usize = 16;

const SWAP_FLAG_ZSTD: u8 = 1 << 0;

/// Fixed-width prefix of every record.
const RECORD_FIXED_LEN: usize = 30;

const HAS_LABEL: u8 = 1 << 0;
const HAS_VALUE: u8 = 1 << 1;
const HAS_ORIGINAL: u8 = 1 << 2;
const HAS_MEASURE_LABEL: u8 = 1 << 3;

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

#[derive(Debug, Clone, Copy)]
struct SwapHeader {
    flags: u8,
    record_count: u64,
}

impl SwapHeader {
    fn write_to(&self, buf: &mut [u8; SWAP_HEADER_LEN]) {
        buf[0..4].copy_from_slice(&SWAP_MAGIC);
        buf[4] = SWAP_VERSION;
        buf[5] = self.flags;
        buf[6..8].fill(0); // reserved
        buf[8..16].copy_from_slice(&self.record_count.to_le_bytes());
    }

    fn read_from(buf: &[u8; SWAP_HEADER_LEN]) -> io::Result<Self> {
        if buf[0..4] != SWAP_MAGIC {
            return Err(invalid_data("swap: invalid magic bytes"));
        }
        if buf[4] != SWAP_VERSION {
            return Err(invalid_data(format!("swap: unsupported version {}", buf[4])));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&buf[8..16]);
        Ok(Self {
            flags: buf[5],
            record_count: u64::from_le_bytes(count),
        })
    }
}

// ============================================================================
// Dictionaries
// ============================================================================

/// The two format dictionaries captured by one swap pass.
///
/// Kept in memory while the list is swapped out and discarded on rehydrate.
#[derive(Debug, Default)]
pub struct SwapDicts {
    pub formatters: FormatterDict,
    pub formats: FormatIndex,
}

// ============================================================================
// SwapRecord
// ============================================================================

/// One swapped leaf: its slot in the list plus its value fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecord {
    pub slot: u32,
    pub kind: NodeKind,
    pub label: Option<String>,
    pub value: Option<String>,
    /// Present only when different from `label`.
    pub original_label: Option<String>,
    pub state: u32,
    pub level: i32,
    pub measure_value: f64,
    pub measure_label: Option<String>,
    pub formatter_id: u32,
    pub format_id: u32,
}

impl SwapRecord {
    /// Encode a resident entry. Composites are not swapped and yield `None`.
    ///
    /// Fails with `InvalidData` when the slot does not fit the on-disk `u32`.
    pub fn from_node(
        slot: usize,
        node: &SelectionNode,
        dicts: &mut SwapDicts,
    ) -> io::Result<Option<Self>> {
        if !node.is_swappable_leaf() {
            return Ok(None);
        }
        let slot = u32::try_from(slot)
            .map_err(|_| invalid_data(format!("swap: slot {} exceeds u32", slot)))?;
        let v = node.value_node();
        let original_label = match (v.original_label(), v.label()) {
            (Some(orig), Some(label)) if orig == label => None,
            (orig, _) => orig.map(str::to_string),
        };
        Ok(Some(Self {
            slot,
            kind: node.kind(),
            label: v.label().map(str::to_string),
            value: v.value().map(str::to_string),
            original_label,
            state: v.state().bits(),
            level: v.level(),
            measure_value: v.measure_value(),
            measure_label: v.measure_label().map(str::to_string),
            formatter_id: formatter_id(&mut dicts.formatters, v.default_format()),
            format_id: composite_id(&mut dicts.formats, v.format()),
        }))
    }

    /// Rebuild the entry, resolving format ids through `dicts`.
    pub fn into_node(self, dicts: &SwapDicts) -> io::Result<(usize, SelectionNode)> {
        let mut v = ValueNode::default();
        let original = self.original_label.or_else(|| self.label.clone());
        v.set_label_raw(self.label);
        v.set_original_label(original);
        v.set_value(self.value);
        v.set_state(ValueState::from_bits(self.state));
        v.set_level(self.level);
        v.set_measure_value(self.measure_value);
        v.set_measure_label(self.measure_label);
        if self.formatter_id != NO_FORMAT_ID {
            let f = dicts.formatters.resolve(self.formatter_id).ok_or_else(|| {
                invalid_data(format!("swap: unknown formatter id {}", self.formatter_id))
            })?;
            v.set_default_format(Some(f.clone()));
        }
        if self.format_id != NO_FORMAT_ID {
            let f = dicts.formats.resolve(self.format_id).ok_or_else(|| {
                invalid_data(format!("swap: unknown format id {}", self.format_id))
            })?;
            v.set_format(Some(f.clone()));
        }
        let node = match self.kind {
            NodeKind::Leaf => SelectionNode::Leaf(v),
            NodeKind::UpperExclusiveEnd => SelectionNode::UpperExclusiveEnd(v),
            NodeKind::Composite => {
                return Err(invalid_data("swap: composite record in swap file"));
            }
        };
        Ok((self.slot as usize, node))
    }

    fn write_le(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        let mut present = 0u8;
        let strings = [
            (HAS_LABEL, &self.label),
            (HAS_VALUE, &self.value),
            (HAS_ORIGINAL, &self.original_label),
            (HAS_MEASURE_LABEL, &self.measure_label),
        ];
        for (bit, s) in &strings {
            if s.is_some() {
                present |= bit;
            }
        }
        buf.extend_from_slice(&self.slot.to_le_bytes());
        buf.push(self.kind.code());
        buf.push(present);
        buf.extend_from_slice(&self.state.to_le_bytes());
        buf.extend_from_slice(&self.level.to_le_bytes());
        buf.extend_from_slice(&self.measure_value.to_le_bytes());
        buf.extend_from_slice(&self.formatter_id.to_le_bytes());
        buf.extend_from_slice(&self.format_id.to_le_bytes());
        for (_, s) in strings {
            if let Some(s) = s {
                let len = u32::try_from(s.len()).map_err(|_| {
                    invalid_data(format!("swap: string of {} bytes exceeds u32", s.len()))
                })?;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }

    fn read_le<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut fixed = [0u8; RECORD_FIXED_LEN];
        r.read_exact(&mut fixed)?;
        let u32_at = |at: usize| u32::from_le_bytes([fixed[at], fixed[at + 1], fixed[at + 2], fixed[at + 3]]);

        let kind = NodeKind::from_code(fixed[4])
            .ok_or_else(|| invalid_data(format!("swap: unknown node kind {}", fixed[4])))?;
        let present = fixed[5];
        let mut measure = [0u8; 8];
        measure.copy_from_slice(&fixed[14..22]);

        let mut read_opt = |bit: u8| -> io::Result<Option<String>> {
            if present & bit == 0 {
                return Ok(None);
            }
            read_string(&mut *r).map(Some)
        };
        let label = read_opt(HAS_LABEL)?;
        let value = read_opt(HAS_VALUE)?;
        let original_label = read_opt(HAS_ORIGINAL)?;
        let measure_label = read_opt(HAS_MEASURE_LABEL)?;

        Ok(Self {
            slot: u32_at(0),
            kind,
            label,
            value,
            original_label,
            state: u32_at(6),
            level: u32_at(10) as i32,
            measure_value: f64::from_le_bytes(measure),
            measure_label,
            formatter_id: u32_at(22),
            format_id: u32_at(26),
        })
    }
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let mut len = [0u8; 4];
    r.read_exact(&mut len)?;
    let mut bytes = vec![0u8; u32::from_le_bytes(len) as usize];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| invalid_data(format!("swap: invalid UTF-8: {}", e)))
}

// ============================================================================
// SwapWriter
// ============================================================================

/// Options for writing one swap file.
#[derive(Debug, Clone, Copy)]
pub struct SwapWriteOptions {
    pub compress_zstd: bool,
    pub zstd_level: i32,
}

impl From<&SelectionCacheConfig> for SwapWriteOptions {
    fn from(config: &SelectionCacheConfig) -> Self {
        Self {
            compress_zstd: config.compress_swap,
            zstd_level: config.zstd_level,
        }
    }
}

/// Append-only writer for one swap file.
pub struct SwapWriter {
    inner: SwapWriterInner,
    path: PathBuf,
    record_count: u64,
    flags: u8,
    scratch: Vec<u8>,
}

enum SwapWriterInner {
    Raw(BufWriter<std::fs::File>),
    Zstd(zstd::stream::write::Encoder<'static, std::fs::File>),
}

impl SwapWriter {
    /// Create (or truncate) the swap file at `path`, creating its directory.
    pub fn create(path: impl Into<PathBuf>, options: SwapWriteOptions) -> io::Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = std::fs::File::create(&path)?;
        let flags = if options.compress_zstd {
            SWAP_FLAG_ZSTD
        } else {
            0
        };

        // Placeholder header; record_count is rewritten on finish.
        let mut header_buf = [0u8; SWAP_HEADER_LEN];
        SwapHeader {
            flags,
            record_count: 0,
        }
        .write_to(&mut header_buf);
        file.write_all(&header_buf)?;

        let inner = if options.compress_zstd {
            let mut enc = zstd::stream::write::Encoder::new(file, options.zstd_level)?;
            enc.include_checksum(true)?;
            SwapWriterInner::Zstd(enc)
        } else {
            SwapWriterInner::Raw(BufWriter::with_capacity(64 * 1024, file))
        };

        Ok(Self {
            inner,
            path,
            record_count: 0,
            flags,
            scratch: Vec::with_capacity(128),
        })
    }

    pub fn push(&mut self, record: &SwapRecord) -> io::Result<()> {
        self.scratch.clear();
        record.write_le(&mut self.scratch)?;
        match &mut self.inner {
            SwapWriterInner::Raw(w) => w.write_all(&self.scratch)?,
            SwapWriterInner::Zstd(w) => w.write_all(&self.scratch)?,
        }
        self.record_count += 1;
        Ok(())
    }

    #[inline]
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, rewrite the header with the final count, and sync to disk.
    pub fn finish(self) -> io::Result<SwapFileInfo> {
        let mut file = match self.inner {
            SwapWriterInner::Raw(mut w) => {
                w.flush()?;
                w.into_inner().map_err(|e| e.into_error())?
            }
            SwapWriterInner::Zstd(w) => w.finish()?,
        };

        file.seek(SeekFrom::Start(0))?;
        let mut header_buf = [0u8; SWAP_HEADER_LEN];
        SwapHeader {
            flags: self.flags,
            record_count: self.record_count,
        }
        .write_to(&mut header_buf);
        file.write_all(&header_buf)?;
        file.sync_all()?;

        let byte_len = file.metadata()?.len();
        Ok(SwapFileInfo {
            path: self.path,
            record_count: self.record_count,
            byte_len,
        })
    }
}

/// Metadata about a completed swap file.
#[derive(Debug, Clone)]
pub struct SwapFileInfo {
    pub path: PathBuf,
    pub record_count: u64,
    pub byte_len: u64,
}

// ============================================================================
// SwapReader
// ============================================================================

/// Sequential reader for swap files.
pub struct SwapReader {
    inner: SwapReaderInner,
    remaining: u64,
}

enum SwapReaderInner {
    Raw(io::BufReader<std::fs::File>),
    Zstd(io::BufReader<zstd::stream::read::Decoder<'static, io::BufReader<std::fs::File>>>),
}

impl std::fmt::Debug for SwapReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapReader")
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl SwapReader {
    /// Open a swap file. `record_count` must match the count written.
    pub fn open(path: impl AsRef<Path>, record_count: u64) -> io::Result<Self> {
        let mut file = std::fs::File::open(path.as_ref())?;
        let mut header_buf = [0u8; SWAP_HEADER_LEN];
        file.read_exact(&mut header_buf)?;
        let header = SwapHeader::read_from(&header_buf)?;
        if header.record_count != record_count {
            return Err(invalid_data(format!(
                "swap header record_count mismatch: header={}, expected={}",
                header.record_count, record_count
            )));
        }

        let inner = if header.flags & SWAP_FLAG_ZSTD != 0 {
            let dec = zstd::stream::read::Decoder::new(file)?;
            SwapReaderInner::Zstd(io::BufReader::with_capacity(64 * 1024, dec))
        } else {
            SwapReaderInner::Raw(io::BufReader::with_capacity(64 * 1024, file))
        };
        Ok(Self {
            inner,
            remaining: record_count,
        })
    }

    /// Read the next record, or `None` once all records are consumed.
    pub fn next_record(&mut self) -> io::Result<Option<SwapRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let record = match &mut self.inner {
            SwapReaderInner::Raw(r) => SwapRecord::read_le(r)?,
            SwapReaderInner::Zstd(r) => SwapRecord::read_le(r)?,
        };
        self.remaining -= 1;
        Ok(Some(record))
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for SwapReader {
    type Item = io::Result<SwapRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let r = self.remaining as usize;
        (r, Some(r))
    }
}

/// Write every swappable entry of `slots` to `path`.
///
/// Returns the file info (record count 0 if nothing was swappable) and the
/// dictionaries built for this pass. On error the caller removes the file.
pub(crate) fn write_slots(
    path: &Path,
    slots: &[Option<SelectionNode>],
    options: SwapWriteOptions,
) -> io::Result<(SwapFileInfo, SwapDicts)> {
    let mut dicts = SwapDicts::default();
    let mut writer = SwapWriter::create(path, options)?;
    for (slot, node) in slots.iter().enumerate() {
        let Some(node) = node else {
            continue;
        };
        if let Some(record) = SwapRecord::from_node(slot, node, &mut dicts)? {
            writer.push(&record)?;
        }
    }
    Ok((writer.finish()?, dicts))
}

/// Read every record of a swap file and resolve it into `(slot, node)` pairs.
pub(crate) fn read_slots(
    path: &Path,
    record_count: u64,
    dicts: &SwapDicts,
) -> io::Result<Vec<(usize, SelectionNode)>> {
    let reader = SwapReader::open(path, record_count)?;
    let mut out = Vec::with_capacity(record_count as usize);
    for record in reader {
        out.push(record?.into_node(dicts)?);
    }
    Ok(out)
}
