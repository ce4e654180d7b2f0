// Failure paths must not leak file descriptors. Kept in its own test binary
// with a single test so no other test opens descriptors concurrently.

#![allow(clippy::unwrap_used)] // Test code: unwrap is acceptable

#[cfg(target_os = "linux")]
#[test]
fn test_failures_release_descriptors() {
    use carryon_runtime::launch::{DirectCreate, ShellOpen};
    use carryon_runtime::{
        Extractor, Image, LaunchStrategy, Parameters, PayloadStore, WaitMode, read_parameters,
    };
    use std::fs;
    use tempfile::TempDir;
    use utils::trailer::Directory;
    use utils::{Manifest, PASSENGER, PayloadBundle};

    fn open_fds() -> usize {
        fs::read_dir("/proc/self/fd").unwrap().count()
    }

    let dir = TempDir::new().unwrap();
    let image = Image::from_bundle(
        &PayloadBundle::new(Manifest::default())
            .with_payload(PASSENGER, b"payload".to_vec())
            .to_bytes()
            .unwrap(),
    );
    let store = PayloadStore::new(&image);
    let payload = store.acquire(PASSENGER).unwrap();

    let mut bad_trailer = b"body".to_vec();
    bad_trailer.extend_from_slice(&Directory { size: 1, offset: 999 }.to_bytes());
    let bad_trailer_path = dir.path().join("bad-trailer");
    fs::write(&bad_trailer_path, bad_trailer).unwrap();

    let not_a_dir = dir.path().join("file");
    fs::write(&not_a_dir, b"x").unwrap();

    let before = open_fds();

    assert!(store.acquire("missing").is_err());
    assert!(read_parameters(&dir.path().join("missing")).is_err());
    assert!(read_parameters(&bad_trailer_path).unwrap().is_empty());
    assert!(
        Extractor::new("PASS")
            .with_temp_dir(dir.path().join("missing"))
            .extract(&payload)
            .is_err()
    );
    assert!(
        Extractor::new("PASS")
            .with_temp_dir(&not_a_dir)
            .extract(&payload)
            .is_err()
    );
    assert!(
        DirectCreate
            .launch(&dir.path().join("missing"), &Parameters::empty(), WaitMode::Dispatch)
            .is_err()
    );
    assert!(
        ShellOpen
            .launch(&dir.path().join("missing"), &Parameters::empty(), WaitMode::Exit)
            .is_err()
    );
    assert!(
        ShellOpen
            .launch(&dir.path().join("missing"), &Parameters::empty(), WaitMode::Dispatch)
            .is_err()
    );

    assert_eq!(open_fds(), before);
}
