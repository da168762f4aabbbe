use hyperq::Queue;

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", &uuid::Uuid::new_v4().simple().to_string()[..16])
}

#[test]
fn open_put_get_roundtrips_through_the_facade() {
    let name = unique_name("facade-basic");
    let queue = Queue::open(&name, 4096).unwrap();
    queue.put(b"payload").unwrap();
    assert_eq!(queue.get().unwrap(), b"payload");
}

#[test]
fn len_and_is_empty_agree_with_underlying_engine() {
    let name = unique_name("facade-len");
    let queue = Queue::open(&name, 4096).unwrap();
    assert!(queue.is_empty().unwrap());
    assert_eq!(queue.len().unwrap(), 0);

    queue.put(b"abc").unwrap();
    assert!(!queue.is_empty().unwrap());
    assert_eq!(queue.len().unwrap(), 7); // 4-byte prefix + 3 payload bytes
}

#[test]
fn anonymous_queues_have_distinct_names() {
    let a = Queue::create_anonymous(4096).unwrap();
    let b = Queue::create_anonymous(4096).unwrap();
    assert_ne!(a.name(), b.name());
}
