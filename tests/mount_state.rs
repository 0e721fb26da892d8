//! Filesystem-state scenarios exercised without a real kernel mount (spec.md
//! §8 scenarios 3, 4, 5) — `fuser::Filesystem` itself can't be driven here
//! without root/FUSE support, so these go straight at `fs_state::MountState`,
//! which is where all the POSIX-callback logic actually lives.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use image::{ImageFormat, RgbImage};
use tempfile::tempdir;

use stego::fs_state::MountState;

fn write_cover(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |_, _| image::Rgb([0u8, 0, 0]));
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

#[test]
fn empty_container_mount_starts_with_no_files() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("blank.png");
    write_cover(&image_path, 64, 64);

    let state = MountState::open(&image_path).unwrap();
    assert_eq!(state.readdir_names().count(), 0);
}

#[test]
fn create_write_read_against_a_freshly_opened_mount() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("blank.png");
    write_cover(&image_path, 64, 64);

    let mut state = MountState::open(&image_path).unwrap();
    state.create("a", 0o644).unwrap();
    state.write("a", b"abc", 0).unwrap();
    assert_eq!(state.read("a", 3, 0).unwrap(), b"abc");
}

#[test]
fn mount_of_an_image_produced_by_hide_exposes_hidden_file() {
    let dir = tempdir().unwrap();
    let cover = dir.path().join("cover.png");
    let secret = dir.path().join("secret.bin");
    let stego = dir.path().join("stego.png");

    write_cover(&cover, 100, 100);
    let payload = vec![0x42u8; 100];
    std::fs::write(&secret, &payload).unwrap();
    stego::hide_extract::hide(&cover, &secret, &stego).unwrap();

    let state = MountState::open(&stego).unwrap();
    let names: Vec<&str> = state.readdir_names().collect();
    assert_eq!(names, vec!["hidden_file"]);
    assert_eq!(state.get("hidden_file").unwrap().size, 100);
    assert_eq!(state.read("hidden_file", 100, 0).unwrap(), payload);
}

#[test]
fn concurrent_writers_to_non_overlapping_offsets_are_linearizable() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("blank.png");
    write_cover(&image_path, 512, 512);

    let mut state = MountState::open(&image_path).unwrap();
    state.create("a", 0o644).unwrap();
    // Pre-size the file so both threads' offsets are within bounds up front;
    // `write` only ever grows `size`, never shrinks it.
    state.write("a", &vec![0u8; 16_000], 0).unwrap();

    let state = Arc::new(Mutex::new(state));
    let mut handles = Vec::new();

    for t in 0..2u64 {
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for i in 0..1000u64 {
                let offset = t * 8000 + i * 8;
                let value = (t * 1_000_000 + i).to_be_bytes();
                state.lock().unwrap().write("a", &value, offset).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let state = state.lock().unwrap();
    for t in 0..2u64 {
        for i in 0..1000u64 {
            let offset = t * 8000 + i * 8;
            let expect = (t * 1_000_000 + i).to_be_bytes();
            assert_eq!(state.read("a", 8, offset).unwrap(), expect);
        }
    }
}
