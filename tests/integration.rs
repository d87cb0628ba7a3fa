mod common;

use std::fs;

use f5archive::{Archive, FillOutcome, Source};
use tempfile::tempdir;

use common::single_block_jpeg_bytes;

/// Property 1 (round-trip) across a two-container cover set, plus S3 (order
/// export/import binds covers back to the right slots by fingerprint).
#[test]
fn pack_unpack_roundtrip_across_two_covers_and_order_reimport() {
    let dir = tempdir().unwrap();
    let path_a = dir.path().join("a.jpg");
    let path_b = dir.path().join("b.jpg");
    fs::write(&path_a, single_block_jpeg_bytes(&[3, -1, 2, 0, 4, 1, -2])).unwrap();
    fs::write(&path_b, single_block_jpeg_bytes(&[2, 1, -3, 0, 1, -1, 2])).unwrap();

    let mut archive = Archive::new();
    archive.append_file(path_a.clone());
    archive.append_file(path_b.clone());
    archive.set_k(1);

    let payload = b"hi".to_vec();
    archive.pack(&payload).unwrap();
    assert_eq!(archive.used(), 2);

    let order = archive.export_order_used().unwrap();
    assert_eq!(order.len(), 32); // two 16-byte MD5 fingerprints

    // S3: a fresh archive re-learns the manifest and binds covers back to
    // their slots by fingerprint, regardless of the order candidates arrive.
    let mut reader = Archive::new();
    reader.import_order(&order).unwrap();
    assert_eq!(reader.filled(), 0);

    let outcome_b = reader.fill_by_hash(Source::File(path_b.clone())).unwrap();
    assert_eq!(outcome_b, FillOutcome::Filled);
    let outcome_a = reader.fill_by_hash(Source::File(path_a.clone())).unwrap();
    assert_eq!(outcome_a, FillOutcome::Complete);

    reader.set_k(1);
    reader.set_msg_size(payload.len() as u64);

    let recovered = reader.unpack().unwrap();
    assert_eq!(recovered, payload);
}

/// S4: a candidate whose fingerprint matches no manifest slot is reported
/// NotFound and leaves `filled` unchanged.
#[test]
fn fill_by_hash_rejects_unrecognized_cover() {
    let dir = tempdir().unwrap();
    let path_a = dir.path().join("a.jpg");
    let path_stray = dir.path().join("stray.jpg");
    fs::write(&path_a, single_block_jpeg_bytes(&[3, -1, 2, 0, 4, 1, -2])).unwrap();
    fs::write(&path_stray, single_block_jpeg_bytes(&[1, 1, 1, 0, 1, 1, 1])).unwrap();

    let mut archive = Archive::new();
    archive.append_file(path_a.clone());
    archive.set_k(1);
    archive.pack(&[0x01]).unwrap();
    let order = archive.export_order_used().unwrap();

    let mut reader = Archive::new();
    reader.import_order(&order).unwrap();

    let outcome = reader.fill_by_hash(Source::File(path_stray)).unwrap();
    assert_eq!(outcome, FillOutcome::NotFound);
    assert_eq!(reader.filled(), 0);

    let outcome = reader.fill_by_hash(Source::File(path_a)).unwrap();
    assert_eq!(outcome, FillOutcome::Complete);
    assert_eq!(reader.filled(), 1);
}

/// S5: a payload far beyond the cover set's capacity fails `pack` rather
/// than silently truncating or panicking, and leaves the source files
/// untouched since nothing was ever closed-keep.
#[test]
fn pack_reports_capacity_exhaustion_without_partial_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.jpg");
    let original = single_block_jpeg_bytes(&[3, -1, 2, 0, 4, 1, -2]);
    fs::write(&path, &original).unwrap();

    let mut archive = Archive::new();
    archive.append_file(path.clone());
    archive.set_k(1);

    let huge_payload = vec![0xAAu8; 256];
    let result = archive.pack(&huge_payload);
    assert!(result.is_err());

    let on_disk = fs::read(&path).unwrap();
    assert_eq!(on_disk, original);
}

/// Analyze populates capacity counts a caller can feed into `calc_k`.
#[test]
fn analyze_reports_nonzero_capacity_for_a_populated_cover() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.jpg");
    fs::write(&path, single_block_jpeg_bytes(&[3, -1, 2, 0, 4, 1, -2])).unwrap();

    let mut archive = Archive::new();
    archive.append_file(path);

    archive.analyze().unwrap();
    let capacity = archive.capacity();
    assert!(capacity.full + capacity.shrinkable > 0);
}
