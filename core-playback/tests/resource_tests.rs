use bridge_traits::{MemoryBundle, ResourceBundle};
use core_playback::{PlaybackError, Resource, ResourceSource};
use mockall::mock;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

mock! {
    Bundle {}

    impl ResourceBundle for Bundle {
        fn open(&self, name: &str) -> bridge_traits::error::Result<bytes::Bytes>;
        fn contains(&self, name: &str) -> bool;
        fn size(&self, name: &str) -> bridge_traits::error::Result<u64>;
        fn list(&self) -> Vec<String>;
    }
}

#[test]
fn test_open_reads_bundle_bytes() {
    let bundle = MemoryBundle::new().with_resource("data/blob.bin", (0u8..=99).collect::<Vec<_>>());
    let resource = Resource::open(&bundle, "data/blob.bin").unwrap();

    assert_eq!(resource.size(), 100);
    assert_eq!(resource.remaining(), 100);

    let mut source = ResourceSource::new(resource);
    let mut head = [0u8; 10];
    assert_eq!(source.read(&mut head).unwrap(), 10);
    assert_eq!(head[9], 9);
    assert_eq!(source.tell(), 10);
}

#[test]
fn test_bundle_failures_map_to_unavailable() {
    let mut bundle = MockBundle::new();
    bundle
        .expect_open()
        .times(1)
        .returning(|name| Err(bridge_traits::BridgeError::OperationFailed(format!("{name} is locked"))));

    let err = Resource::open(&bundle, "locked.ogg").unwrap_err();
    match err {
        PlaybackError::ResourceUnavailable { name, reason } => {
            assert_eq!(name, "locked.ogg");
            assert!(reason.contains("locked"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(Resource::open(&MemoryBundle::new(), "nothing").unwrap_err().is_load_failure());
}

#[test]
fn test_seek_semantics() {
    let mut source = ResourceSource::new(Resource::from_bytes("r", vec![7u8; 50]));

    assert_eq!(source.seek(SeekFrom::End(-10)).unwrap(), 40);
    assert_eq!(source.seek(SeekFrom::Current(5)).unwrap(), 45);

    let err = source.seek(SeekFrom::Current(-100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(source.tell(), 45);

    assert_eq!(source.seek(SeekFrom::Start(500)).unwrap(), 50);
    let mut buf = [0u8; 8];
    assert_eq!(source.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_read_to_end_and_close() {
    let mut source = ResourceSource::new(Resource::from_bytes("r", b"hello world".to_vec()));
    source.seek(SeekFrom::Start(6)).unwrap();

    let mut rest = String::new();
    source.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "world");

    let resource = source.close();
    assert_eq!(resource.remaining(), 0);
    assert_eq!(resource.name(), "r");
}
