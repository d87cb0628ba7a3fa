//! Archive: an ordered cover set of containers, the rate/payload metadata,
//! and the matrix-embedding operations (`pack`/`unpack`) that tie them
//! together.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::container::{Container, Source};
use crate::error::{ArchiveError, FillOutcome, Result};
use crate::matrix::CheckMatrix;

/// Rate and payload-length metadata for an archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveMeta {
    /// Matrix-embedding rate, `1..=24`. `0` means "not yet chosen".
    pub k: u8,
    /// Payload length in bytes.
    pub msg_size: u64,
}

/// Coefficient counts across the whole cover set, gathered by `analyze`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCapacity {
    /// Count of coefficients with `|c| > 1`.
    pub full: usize,
    /// Count of coefficients with `|c| == 1` (one modification from zero).
    pub shrinkable: usize,
}

/// A coefficient's address within the archive: which container, which block
/// of its first component, which of the block's 64 positions.
#[derive(Debug, Clone, Copy)]
struct CoeffLoc {
    container_idx: usize,
    block_index: usize,
    coeff_id: usize,
}

/// An ordered cover set plus the metadata needed to embed into or extract
/// from it.
pub struct Archive {
    containers: Vec<Container>,
    meta: ArchiveMeta,
    capacity: ArchiveCapacity,
    filled: usize,
    used: usize,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive {
    pub fn new() -> Self {
        Archive { containers: Vec::new(), meta: ArchiveMeta::default(), capacity: ArchiveCapacity::default(), filled: 0, used: 0 }
    }

    pub fn size(&self) -> usize {
        self.containers.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn meta(&self) -> ArchiveMeta {
        self.meta
    }

    pub fn capacity(&self) -> ArchiveCapacity {
        self.capacity
    }

    /// Explicitly set the embedding rate, bypassing auto-selection.
    pub fn set_k(&mut self, k: u8) {
        self.meta.k = k;
    }

    /// Set the payload length `unpack` should recover. Normally read from an
    /// archive header; exposed directly for callers that already know it.
    pub fn set_msg_size(&mut self, msg_size: u64) {
        self.meta.msg_size = msg_size;
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Append a file-backed container. Its source is bound immediately.
    pub fn append_file<P: Into<PathBuf>>(&mut self, path: P) {
        self.containers.push(Container::from_file(path));
        self.filled += 1;
    }

    /// Append a memory-backed container, sharing ownership of `buffer` with
    /// the caller so it can observe the bytes `close_keep` writes.
    pub fn append_mem(&mut self, buffer: Rc<RefCell<Vec<u8>>>) {
        self.containers.push(Container::from_memory(buffer));
        self.filled += 1;
    }

    /// Bind an incoming source to the first still-unbound container whose
    /// fingerprint matches its content. Duplicate fingerprints are bound in
    /// first-come first-served order.
    pub fn fill_by_hash(&mut self, source: Source) -> Result<FillOutcome> {
        let bytes = match &source {
            Source::File(path) => std::fs::read(path)?,
            Source::Memory(buffer) => buffer.borrow().clone(),
        };
        let digest = md5::compute(&bytes).0;

        let slot = self.containers.iter().position(|c| !c.is_bound() && c.fingerprint() == Some(digest));

        match slot {
            Some(idx) => {
                self.containers[idx].bind(source);
                self.filled += 1;
                log::debug!("fill_by_hash: bound slot {} ({}/{})", idx, self.filled, self.containers.len());

                if self.filled == self.containers.len() {
                    Ok(FillOutcome::Complete)
                } else {
                    Ok(FillOutcome::Filled)
                }
            }
            None => Ok(FillOutcome::NotFound),
        }
    }

    /// Serialize all `size` fingerprints in insertion order.
    pub fn export_order(&self) -> Result<Vec<u8>> {
        self.export_fingerprints(self.containers.len())
    }

    /// Serialize only the first `used` fingerprints (the containers actually
    /// touched by the last `pack`).
    pub fn export_order_used(&self) -> Result<Vec<u8>> {
        self.export_fingerprints(self.used)
    }

    fn export_fingerprints(&self, count: usize) -> Result<Vec<u8>> {
        let mut blob = Vec::with_capacity(count * 16);
        for container in &self.containers[..count] {
            let fp = container.fingerprint().ok_or_else(|| ArchiveError::WrongArgs {
                reason: "container has no fingerprint yet (not closed-keep)".to_string(),
            })?;
            blob.extend_from_slice(&fp);
        }
        Ok(blob)
    }

    /// Replace the container list with fingerprint-only placeholders read
    /// from a manifest blob, one per 16 bytes. Clears `filled`.
    pub fn import_order(&mut self, blob: &[u8]) -> Result<()> {
        if blob.len() % 16 != 0 {
            return Err(ArchiveError::WrongArgs { reason: format!("manifest blob length {} is not a multiple of 16", blob.len()) });
        }

        self.containers = blob
            .chunks_exact(16)
            .map(|chunk| {
                let mut fp = [0u8; 16];
                fp.copy_from_slice(chunk);
                Container::from_fingerprint(fp)
            })
            .collect();
        self.filled = 0;
        self.used = 0;

        Ok(())
    }

    /// Count `full`/`shrinkable` coefficients across every container's first
    /// component. Requires every container to be bound to a source.
    pub fn analyze(&mut self) -> Result<()> {
        self.require_filled()?;

        let mut full = 0usize;
        let mut shrinkable = 0usize;

        for container in self.containers.iter_mut() {
            container.open()?;
            {
                let coefficients = container.coefficients().expect("active container has coefficients");
                for &c in &coefficients.data {
                    match c.unsigned_abs() {
                        0 => {}
                        1 => shrinkable += 1,
                        _ => full += 1,
                    }
                }
            }
            container.close_discard()?;
        }

        self.capacity = ArchiveCapacity { full, shrinkable };
        log::debug!("analyze: full={} shrinkable={}", full, shrinkable);

        Ok(())
    }

    fn require_filled(&self) -> Result<()> {
        if self.filled != self.containers.len() {
            return Err(ArchiveError::NotComplete { filled: self.filled, size: self.containers.len() });
        }
        Ok(())
    }

    /// Advance `container_idx` (opening containers as needed) until the next
    /// non-zero coefficient is found, returning its address. Zero
    /// coefficients are silently skipped, as the iterator itself never does.
    fn next_nonzero(&mut self, container_idx: &mut usize) -> Result<CoeffLoc> {
        loop {
            if *container_idx >= self.containers.len() {
                return Err(ArchiveError::CapacityExceeded { required: 1, available: 0 });
            }

            if !self.containers[*container_idx].is_active() {
                self.containers[*container_idx].open()?;
            }

            let exhausted = self.containers[*container_idx].cursor().expect("active has cursor").is_exhausted();
            if exhausted {
                *container_idx += 1;
                continue;
            }

            let (value, loc) = {
                let container = &self.containers[*container_idx];
                let cursor = container.cursor().unwrap();
                let plane = container.coefficients().unwrap();
                (cursor.get(plane), CoeffLoc { container_idx: *container_idx, block_index: cursor.block_index(), coeff_id: cursor.coeff_id() })
            };

            self.containers[*container_idx].cursor_mut().unwrap().next();

            if value != 0 {
                return Ok(loc);
            }
        }
    }

    fn collect_n_nonzero(&mut self, container_idx: &mut usize, n: usize) -> Result<Vec<CoeffLoc>> {
        let mut locations = Vec::with_capacity(n);
        for _ in 0..n {
            locations.push(self.next_nonzero(container_idx)?);
        }
        Ok(locations)
    }

    fn coeff_at(&self, loc: CoeffLoc) -> i16 {
        self.containers[loc.container_idx].coefficients().unwrap().block(loc.block_index)[loc.coeff_id]
    }

    fn set_coeff_at(&mut self, loc: CoeffLoc, value: i16) {
        self.containers[loc.container_idx].coefficients_mut().unwrap().block_mut(loc.block_index)[loc.coeff_id] = value;
    }

    /// Finalize every not-yet-finalized container with an index strictly
    /// less than `up_to`, in order.
    fn catch_up(&mut self, finalized_up_to: &mut usize, up_to: usize) -> Result<()> {
        while *finalized_up_to < up_to {
            self.containers[*finalized_up_to].close_keep()?;
            self.used += 1;
            *finalized_up_to += 1;
        }
        Ok(())
    }

    /// Embed `data` across the cover set using matrix embedding at
    /// `meta.k` (auto-selected via [`calc_k`] if `k == 0`).
    pub fn pack(&mut self, data: &[u8]) -> Result<()> {
        self.require_filled()?;
        self.meta.msg_size = data.len() as u64;
        self.used = 0;

        if data.is_empty() {
            return Ok(());
        }

        if self.containers.is_empty() {
            return Err(ArchiveError::CapacityExceeded { required: data.len() * 8, available: 0 });
        }

        if self.meta.k == 0 {
            if self.capacity.full == 0 && self.capacity.shrinkable == 0 {
                self.analyze()?;
            }
            self.meta.k = calc_k(&self.capacity, self.meta.msg_size);
        }

        let k = self.meta.k;
        let matrix = CheckMatrix::new(k);
        let n = matrix.n();

        let mut container_idx = 0usize;
        let mut finalized_up_to = 0usize;
        let total_bits = data.len() * 8;
        let mut bit_pos = 0usize;

        while bit_pos < total_bits {
            let kword = read_kword(data, bit_pos, k, total_bits);

            let mut locations = self.collect_n_nonzero(&mut container_idx, n).map_err(insufficient_capacity(bit_pos))?;

            loop {
                let values: Vec<i16> = locations.iter().map(|&l| self.coeff_at(l)).collect();
                let hash = matrix.hash(&values);
                let s = matrix.modification_index(hash, kword);

                if s == 0 {
                    break;
                }

                let idx = s - 1;
                let loc = locations[idx];
                let v = self.coeff_at(loc);
                let new_v = if v > 0 { v - 1 } else { v + 1 };
                self.set_coeff_at(loc, new_v);

                if new_v != 0 {
                    break;
                }

                locations.remove(idx);
                let extra = self.next_nonzero(&mut container_idx).map_err(insufficient_capacity(bit_pos))?;
                locations.push(extra);
            }

            self.catch_up(&mut finalized_up_to, container_idx)?;
            bit_pos += k as usize;
        }

        self.containers[container_idx].close_keep()?;
        self.used += 1;

        Ok(())
    }

    /// Extract `msg_size` bytes from the cover set, the dual read-only pass
    /// to [`Archive::pack`].
    pub fn unpack(&mut self) -> Result<Vec<u8>> {
        self.require_filled()?;

        if self.meta.k == 0 {
            return Err(ArchiveError::WrongArgs { reason: "archive has no rate (k); import a header first".to_string() });
        }

        let msg_size = self.meta.msg_size as usize;
        if msg_size == 0 {
            return Ok(Vec::new());
        }

        let matrix = CheckMatrix::new(self.meta.k);
        let n = matrix.n();

        let mut output = vec![0u8; msg_size];
        let total_bits = msg_size * 8;
        let mut bit_pos = 0usize;
        let mut container_idx = 0usize;
        let mut finalized_up_to = 0usize;

        while bit_pos < total_bits {
            let locations = self.collect_n_nonzero(&mut container_idx, n).map_err(|e| match e {
                ArchiveError::CapacityExceeded { .. } => {
                    ArchiveError::EmbeddingFailed { reason: "cover set exhausted before message was fully recovered".to_string(), bytes_written: bit_pos / 8 }
                }
                other => other,
            })?;

            let values: Vec<i16> = locations.iter().map(|&l| self.coeff_at(l)).collect();
            let kword = matrix.hash(&values);
            write_kword(&mut output, bit_pos, kword, self.meta.k, total_bits);

            while finalized_up_to < container_idx {
                self.containers[finalized_up_to].close_discard()?;
                finalized_up_to += 1;
            }

            bit_pos += self.meta.k as usize;
        }

        self.containers[container_idx].close_discard()?;

        Ok(output)
    }
}

fn insufficient_capacity(bit_pos: usize) -> impl FnOnce(ArchiveError) -> ArchiveError {
    move |e| match e {
        ArchiveError::CapacityExceeded { .. } => {
            ArchiveError::EmbeddingFailed { reason: "cover set ran out of non-zero coefficients during pack".to_string(), bytes_written: bit_pos / 8 }
        }
        other => other,
    }
}

/// Assemble one `k`-bit word from `data`, LSB-of-byte first, bytes in
/// ascending order, starting at bit offset `bit_pos`. Bits past `total_bits`
/// (the last, partial word) are treated as zero padding.
fn read_kword(data: &[u8], bit_pos: usize, k: u8, total_bits: usize) -> usize {
    let mut kword = 0usize;
    for b in 0..k as usize {
        let bit_idx = bit_pos + b;
        if bit_idx < total_bits {
            let byte = data[bit_idx / 8];
            let bit = (byte >> (bit_idx % 8)) & 1;
            kword |= (bit as usize) << b;
        }
    }
    kword
}

/// Inverse of [`read_kword`]: scatter the low `k` bits of `kword` into
/// `output` at bit offset `bit_pos`, ignoring bits past `total_bits`.
fn write_kword(output: &mut [u8], bit_pos: usize, kword: usize, k: u8, total_bits: usize) {
    for b in 0..k as usize {
        let bit_idx = bit_pos + b;
        if bit_idx < total_bits && (kword >> b) & 1 == 1 {
            output[bit_idx / 8] |= 1 << (bit_idx % 8);
        }
    }
}

/// `capacity_at(k) = full + 2*shrinkable/k`, the expected number of usable
/// coefficients at rate `k` once shrinkage losses are modeled.
fn capacity_at(capacity: &ArchiveCapacity, k: u8) -> f64 {
    capacity.full as f64 + 2.0 * capacity.shrinkable as f64 / k as f64
}

/// Smallest `k` in `1..=24` where the embedding rate fits the per-coefficient
/// rate of that `k`, clamped to `>= 1` (the raw formula's `k - 1` can
/// otherwise yield `0`, which would make `n = 2^k - 1` divide by zero
/// downstream).
pub fn calc_k(capacity: &ArchiveCapacity, msg_size: u64) -> u8 {
    let bits = (msg_size * 8) as f64;

    for k in 1u8..=24 {
        let cap = capacity_at(capacity, k);
        let embedding_rate = bits / cap;
        let per_coeff_rate = k as f64 / ((1u64 << k) - 1) as f64;

        if embedding_rate <= per_coeff_rate {
            return (k.saturating_sub(1)).max(1);
        }
    }

    24
}
