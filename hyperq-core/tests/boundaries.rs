use hyperq_core::Handle;

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", &uuid::Uuid::new_v4().simple().to_string()[..16])
}

#[test]
fn message_that_cannot_ever_fit_is_rejected_without_blocking() {
    let name = unique_name("bd-too-large");
    // The creator rounds any requested capacity up to the system page
    // size (`segment.rs`'s `round_up_to_page`), so the real capacity may
    // be much larger than 16; size the payload off `handle.capacity()`
    // rather than the literal request.
    let handle = Handle::open(&name, 16).unwrap();
    let payload = vec![0u8; handle.capacity() as usize + 1];
    let err = handle.put(&payload).unwrap_err();
    assert!(matches!(err, hyperq_core::HyperQError::MessageTooLarge { .. }));
}

#[test]
fn empty_and_full_and_size_track_occupancy() {
    let name = unique_name("bd-introspection");
    let handle = Handle::open(&name, 32).unwrap();

    assert!(handle.empty().unwrap());
    assert!(!handle.full().unwrap());
    assert_eq!(handle.size().unwrap(), 0);

    handle.put(&[1u8; 10]).unwrap();
    assert!(!handle.empty().unwrap());
    assert_eq!(handle.size().unwrap(), 14);

    handle.get().unwrap();
    assert!(handle.empty().unwrap());
    assert_eq!(handle.size().unwrap(), 0);
}

#[test]
fn clear_discards_queued_frames() {
    let name = unique_name("bd-clear");
    let handle = Handle::open(&name, 4096).unwrap();

    handle.put(b"one").unwrap();
    handle.put(b"two").unwrap();
    assert!(!handle.empty().unwrap());

    handle.clear().unwrap();
    assert!(handle.empty().unwrap());
    assert_eq!(handle.size().unwrap(), 0);
}

#[test]
fn exact_capacity_frame_fits_with_nothing_else_queued() {
    let name = unique_name("bd-exact-fit");
    // Requested capacity is rounded up to the page size by the creator;
    // derive the exact-fit payload length from the real capacity.
    let handle = Handle::open(&name, 20).unwrap();
    let capacity = handle.capacity();
    let payload = vec![7u8; (capacity - 4) as usize]; // 4-byte prefix + payload == capacity
    handle.put(&payload).unwrap();
    assert!(handle.full().unwrap());
    assert_eq!(handle.get().unwrap(), payload);
}

#[test]
fn one_byte_over_exact_fit_is_rejected() {
    let name = unique_name("bd-one-over");
    let handle = Handle::open(&name, 20).unwrap();
    let capacity = handle.capacity();
    // capacity - 4 is the largest payload that fits; one byte more must not.
    let err = handle.put(&vec![7u8; (capacity - 3) as usize]).unwrap_err();
    assert!(matches!(err, hyperq_core::HyperQError::MessageTooLarge { .. }));
}

#[test]
fn fill_to_full_with_small_messages_then_drain_counts_match() {
    let name = unique_name("bd-fill-drain");
    let handle = Handle::open(&name, 4096).unwrap();
    let capacity = handle.capacity();
    let frame_len = 4 + 12u64; // 12-byte payload, 4-byte prefix
    let mut sent = 0u64;
    while handle.size().unwrap() + frame_len <= capacity {
        handle.put(&[0x5Au8; 12]).unwrap();
        sent += 1;
    }
    assert!(handle.full().unwrap());
    for _ in 0..sent {
        assert_eq!(handle.get().unwrap(), vec![0x5Au8; 12]);
    }
    assert!(handle.empty().unwrap());
    assert_eq!(handle.size().unwrap(), 0);
}

#[test]
fn many_small_frames_wrap_the_ring_multiple_times() {
    let name = unique_name("bd-many-wraps");
    // Requested capacity is rounded up to the page size; derive the
    // number of put/get round trips from the real capacity so `tail`
    // actually wraps several times rather than just advancing a few
    // hundred bytes into a multi-KiB buffer.
    let handle = Handle::open(&name, 64).unwrap();
    let capacity = handle.capacity();
    let frame_len = 8u64; // 4-byte prefix + 4-byte payload
    let rounds = (capacity / frame_len) * 3 + 5;
    for round in 0..rounds as u32 {
        let payload = round.to_le_bytes();
        handle.put(&payload).unwrap();
        assert_eq!(handle.get().unwrap(), payload);
    }
}
