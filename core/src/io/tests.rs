//! Tests for the byte-stream providers

use super::*;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

// ============================================================================
// Stream helpers
// ============================================================================

#[test]
fn test_little_endian_helpers() {
    let bytes = vec![0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff, 0xfe, 0xff, 0xff, 0xff];
    let mut stream = ReadStream::new(Cursor::new(bytes));
    assert_eq!(stream.read_u8(), Some(0x01));
    assert_eq!(stream.read_u16(), Some(0x1234));
    assert_eq!(stream.read_u32(), Some(0x12345678));
    assert_eq!(stream.read_i8(), Some(-1));
    assert_eq!(stream.read_i32(), Some(-2));
    assert!(stream.at_end());
    assert_eq!(stream.read_u8(), None);
}

#[test]
fn test_short_read_is_absent() {
    let mut stream = ReadStream::new(Cursor::new(vec![0xaa, 0xbb, 0xcc]));
    assert_eq!(stream.read_u32(), None);
}

#[test]
fn test_at_end_does_not_consume() {
    let mut stream = ReadStream::new(Cursor::new(vec![7u8, 9u8]));
    assert!(!stream.at_end());
    assert!(!stream.at_end());
    assert_eq!(stream.read_u8(), Some(7));
    assert!(!stream.at_end());
    let mut buf = [0u8; 4];
    assert_eq!(stream.read_bytes(&mut buf), Some(1));
    assert_eq!(buf[0], 9);
    assert!(stream.at_end());
}

#[test]
fn test_write_helpers_round_trip_bytes() {
    let provider = MemoryIoProvider::new();
    {
        let mut stream = provider.open_for_write("out.bin").unwrap();
        stream.write_u16(0xbeef).unwrap();
        stream.write_i32(-3).unwrap();
        stream.write_i16(-2).unwrap();
        stream.finish().unwrap();
    }
    assert_eq!(
        provider.get("out.bin").unwrap(),
        vec![0xef, 0xbe, 0xfd, 0xff, 0xff, 0xff, 0xfe, 0xff]
    );
}

#[test]
fn test_read_stream_rejects_writes() {
    let mut stream = ReadStream::new(Cursor::new(Vec::new()));
    assert_eq!(stream.write_bytes(b"x"), None);
}

// ============================================================================
// Providers
// ============================================================================

#[test]
fn test_memory_provider_full_file() {
    let provider = MemoryIoProvider::new();
    assert!(provider.load_full_file("missing").is_none());
    assert!(provider.write_full_file("maps/a.json", b"{}"));
    assert_eq!(provider.load_full_file("maps/a.json").unwrap(), b"{}");
    assert_eq!(provider.paths(), vec!["maps/a.json".to_string()]);
}

#[test]
fn test_path_join() {
    assert_eq!(join_resource_path("", "game.map"), "game.map");
    assert_eq!(join_resource_path("maps/x/", "game.map"), "maps/x/game.map");
    assert_eq!(join_resource_path("maps", "/ttypes.ttp"), "maps/ttypes.ttp");
}

#[test]
fn test_fs_provider_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FsIoProvider::new(dir.path());
    assert!(provider.make_directory("multiplay/maps/2c-test"));
    assert!(provider.write_full_file("multiplay/maps/2c-test/game.map", b"map data"));
    assert_eq!(
        provider.load_full_file("multiplay/maps/2c-test/game.map").unwrap(),
        b"map data"
    );
    assert!(dir.path().join("multiplay/maps/2c-test/game.map").exists());
}

#[test]
fn test_fs_provider_refuses_escape() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FsIoProvider::new(dir.path());
    assert!(provider.open_for_read("../outside").is_none());
    assert!(provider.open_for_write("/etc/passwd").is_none());
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_zip_provider_reads_entries() {
    let archive = build_zip(&[
        ("multiplay/maps/4c-rush/game.map", b"map "),
        ("multiplay/maps/4c-rush/struct.json", b"{}"),
    ]);
    let provider = ZipIoProvider::from_bytes(archive).unwrap();
    assert_eq!(provider.find_map_folder().as_deref(), Some("multiplay/maps/4c-rush"));

    let mut stream = provider
        .open_for_read("multiplay/maps/4c-rush/game.map")
        .unwrap();
    assert_eq!(stream.read_array::<4>(), Some(*b"map "));
    assert!(stream.at_end());

    assert!(provider.open_for_read("multiplay/maps/4c-rush/droid.json").is_none());
    assert!(provider.open_for_write("anything").is_none());
}

#[test]
fn test_entry_capacity_is_capped() {
    assert_eq!(archive::entry_capacity(0), 0);
    assert_eq!(archive::entry_capacity(4096), 4096);
    assert_eq!(archive::entry_capacity(u64::from(u32::MAX)), 8 * 1024 * 1024);
}

#[test]
fn test_zip_entry_with_forged_size() {
    let mut bytes = build_zip(&[("maps/a/game.map", b"map ")]);
    // Claim a 2 GiB uncompressed size in the local and central headers.
    let forged = 0x7fff_ffffu32.to_le_bytes();
    bytes[22..26].copy_from_slice(&forged);
    let central = bytes.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
    bytes[central + 24..central + 28].copy_from_slice(&forged);

    let provider = ZipIoProvider::from_bytes(bytes).unwrap();
    if let Some(data) = provider.load_full_file("maps/a/game.map") {
        assert_eq!(data, b"map ");
    }
}
