//! End-to-end hide/extract scenarios (spec.md §8 scenarios 1, 2, 6).

use std::path::Path;

use image::{ImageFormat, RgbImage};
use tempfile::tempdir;

fn write_cover(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

#[test]
fn hide_then_extract_roundtrips_bytes_and_extension() {
    let dir = tempdir().unwrap();
    let cover = dir.path().join("cover.png");
    let secret = dir.path().join("hello.txt");
    let stego = dir.path().join("stego.png");

    write_cover(&cover, 128, 128);
    std::fs::write(&secret, b"hello world").unwrap();

    stego::hide_extract::hide(&cover, &secret, &stego).unwrap();

    let extracted = stego::hide_extract::extract(&stego).unwrap();
    assert_eq!(extracted.data, b"hello world");
    assert_eq!(extracted.extension, b"txt");

    let out_img = image::open(&stego).unwrap().into_rgb8();
    assert_eq!(out_img.dimensions(), (128, 128));
}

#[test]
fn hide_rejects_secret_that_exceeds_capacity_and_writes_no_output() {
    let dir = tempdir().unwrap();
    let cover = dir.path().join("cover.png");
    let secret = dir.path().join("secret.bin");
    let output = dir.path().join("stego.png");

    write_cover(&cover, 16, 16); // 96 bytes capacity
    std::fs::write(&secret, vec![0u8; 200]).unwrap();

    let err = stego::hide_extract::hide(&cover, &secret, &output);
    assert!(err.is_err());
    assert!(!output.exists());
}

#[test]
fn extract_on_image_with_no_magic_reports_invalid_stego_image() {
    let dir = tempdir().unwrap();
    let cover = dir.path().join("cover.png");
    write_cover(&cover, 32, 32);

    let err = stego::hide_extract::extract(&cover).unwrap_err();
    assert!(matches!(err, stego::StegoError::InvalidStegoImage));
}

#[test]
fn extension_with_no_dot_produces_bare_output_path() {
    let dir = tempdir().unwrap();
    let cover = dir.path().join("cover.png");
    let secret = dir.path().join("noext");
    let stego = dir.path().join("stego.png");

    write_cover(&cover, 64, 64);
    std::fs::write(&secret, b"abc").unwrap();

    stego::hide_extract::hide(&cover, &secret, &stego).unwrap();
    let extracted = stego::hide_extract::extract(&stego).unwrap();
    assert!(extracted.extension.is_empty());

    let output = stego::hide_extract::extract_output_path(&dir.path().join("out"), &extracted.extension);
    assert_eq!(output, dir.path().join("out"));
}
