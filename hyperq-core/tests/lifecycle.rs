use hyperq_core::{Handle, Provenance};

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", &uuid::Uuid::new_v4().simple().to_string()[..16])
}

#[test]
fn opening_a_new_name_reports_creator_provenance() {
    let name = unique_name("lc-creator");
    let handle = Handle::open(&name, 4096).unwrap();
    assert_eq!(handle.provenance(), Provenance::Creator);
}

#[test]
fn opening_an_existing_name_reports_attacher_provenance() {
    let name = unique_name("lc-attacher");
    let first = Handle::open(&name, 4096).unwrap();
    let second = Handle::open(&name, 4096).unwrap();
    assert_eq!(first.provenance(), Provenance::Creator);
    assert_eq!(second.provenance(), Provenance::Attacher);
}

#[test]
fn segment_is_unlinked_after_the_last_handle_drops() {
    let name = unique_name("lc-unlink");
    {
        let first = Handle::open(&name, 4096).unwrap();
        let second = Handle::open(&name, 4096).unwrap();
        drop(second);
        drop(first);
    }
    // The name is now free: opening it again creates rather than attaches.
    let fresh = Handle::open(&name, 4096).unwrap();
    assert_eq!(fresh.provenance(), Provenance::Creator);
}

#[test]
fn state_survives_across_attach_detach_cycles() {
    let name = unique_name("lc-state-survives");
    {
        let first = Handle::open(&name, 4096).unwrap();
        first.put(b"still here").unwrap();
    }
    // first detached (and, being the only handle, unlinked the segment)
    // so this creates a brand-new, empty segment under the same name.
    let second = Handle::open(&name, 4096).unwrap();
    assert!(second.empty().unwrap());
}

#[test]
fn anonymous_segments_get_distinct_generated_names() {
    let a = Handle::create_anonymous(4096).unwrap();
    let b = Handle::create_anonymous(4096).unwrap();
    assert_ne!(a.name(), b.name());
}

#[test]
fn zero_capacity_is_rejected() {
    let name = unique_name("lc-zero-cap");
    assert!(Handle::open(&name, 0).is_err());
}

#[test]
fn name_over_length_limit_is_rejected() {
    let long = "x".repeat(31);
    assert!(Handle::open(&long, 4096).is_err());
}
