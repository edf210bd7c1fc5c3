//! End-to-end scenarios exercising the public facade across modules.

use assert_fs::prelude::*;
use predicates::prelude::*;
use safe_file::{ErrorKind, SafeFile};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn full_lifecycle_on_one_facade_instance() {
    let temp = assert_fs::TempDir::new().unwrap();
    let target = temp.child("state/current.bin");
    target.touch().unwrap();
    let path = target.path().to_str().unwrap().to_string();

    let mut safe = SafeFile::new();

    // Write, read back, overwrite, read again.
    assert!(safe.write(&path, b"generation-1").unwrap());
    assert_eq!(
        safe.read(&path).unwrap().as_deref(),
        Some(b"generation-1".as_slice())
    );

    assert!(safe.write(&path, b"generation-2").unwrap());
    assert_eq!(
        safe.read(&path).unwrap().as_deref(),
        Some(b"generation-2".as_slice())
    );
    assert!(!safe.has_error());

    // Delete, then confirm idempotence and a clean error slot.
    assert!(safe.delete(&path).unwrap());
    target.assert(predicate::path::missing());
    assert!(safe.delete(&path).unwrap());
    assert!(!safe.has_error());
}

#[test]
fn failures_flow_through_the_error_slot_and_back_out() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("absent.bin");
    let path = missing.path().to_str().unwrap().to_string();

    let mut safe = SafeFile::new();

    // Quiet mode: sentinel plus inspectable state.
    let data = safe.read(&path).unwrap();
    assert!(data.is_none());
    assert!(safe.has_error());
    let recorded = safe.last_error();
    assert_eq!(recorded.kind(), ErrorKind::UnreadableFile);
    assert!(!recorded.report().is_empty());

    // Exception mode: the same failure comes back as an error value.
    safe.set_exception_mode(true);
    let err = safe.read(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreadableFile);

    // A successful operation clears the slot again.
    safe.set_exception_mode(false);
    assert!(safe.write(&path, b"now it exists").unwrap());
    assert!(!safe.has_error());
    missing.assert(predicate::path::exists());
}

#[test]
fn independent_facades_serialize_on_the_same_target() {
    let temp = assert_fs::TempDir::new().unwrap();
    let target = temp.child("shared.bin");
    let path = Arc::new(target.path().to_str().unwrap().to_string());

    let num_threads = 6;
    let payload_len = 32 * 1024;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let payload = vec![b'A' + thread_id as u8; payload_len];
                let mut safe = SafeFile::new();
                let _ = safe.write(&path, &payload);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Whoever renamed last won outright; mixtures are impossible.
    let content = std::fs::read(target.path()).unwrap();
    assert_eq!(content.len(), payload_len);
    assert!(content.iter().all(|byte| *byte == content[0]));

    // No temp siblings survive the storm.
    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn malformed_paths_never_reach_the_filesystem() {
    let mut safe = SafeFile::new();

    for bad in ["", "   ", "relative/x.txt", "ftp://host/x", "/../escape"] {
        let data = safe.read(bad).unwrap();
        assert!(data.is_none(), "read of {bad:?} should fail");
        assert_eq!(
            safe.last_error().kind(),
            ErrorKind::BadPathOrFile,
            "read of {bad:?} should report a bad path"
        );

        assert!(!safe.write(bad, b"data").unwrap());
        assert_eq!(safe.last_error().kind(), ErrorKind::BadPathOrFile);
    }
}
