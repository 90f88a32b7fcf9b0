//! Failure paths of the generic writer and reader.

use imagefile_core::{Color4b, Image, PixelFormat};
use imagefile_io::{GenericImageFileWriter, IoError, WriteOptions, read, write};

fn rgba(size: usize) -> Image {
    let mut image = Image::new(size, size, size, size, 4, PixelFormat::UInt8).expect("image");
    image.clear(Color4b::new(50, 100, 150, 42));
    image
}

#[test]
fn unknown_extension_on_write_creates_no_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image.xyz");

    let err = write(&path, &rgba(4)).unwrap_err();
    assert!(err.is_unsupported_format(), "{err}");
    assert!(!path.exists());
}

#[test]
fn unknown_extension_on_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image.xyz");
    std::fs::write(&path, b"BM not really").expect("write");

    let err = read(&path).unwrap_err();
    assert!(err.is_unsupported_format(), "{err}");
}

#[test]
fn corrupt_files_are_decode_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cases: [(&str, &[u8]); 6] = [
        ("bad.png", b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\x00"),
        ("bad.jpg", b"\xff\xd8\xff\xe0\x00\x10JFIF"),
        ("bad.exr", b"\x76\x2f\x31\x01\x02\x00\x00\x00"),
        ("bad.tif", b"II\x2a\x00\xff\xff\x00\x00"),
        ("bad.hdr", b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 4 +X 4\n\x02"),
        ("bad.bmp", b"BM\x00\x00\x00\x00"),
    ];
    for (name, bytes) in cases {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect(name);
        let err = read(&path).unwrap_err();
        assert!(err.is_decode_error(), "{name}: {err}");
    }
}

#[test]
fn truncated_files_are_decode_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = rgba(16);

    for name in ["cut.bmp", "cut.png", "cut.hdr"] {
        let path = dir.path().join(name);
        write(&path, &image).expect(name);
        let bytes = std::fs::read(&path).expect(name);
        std::fs::write(&path, &bytes[..bytes.len() / 2]).expect(name);

        let err = read(&path).unwrap_err();
        assert!(err.is_decode_error(), "{name}: {err}");
    }
}

#[test]
fn single_image_formats_reject_two() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = rgba(4);

    for name in ["two.bmp", "two.png", "two.jpg", "two.hdr"] {
        let path = dir.path().join(name);
        let mut writer = GenericImageFileWriter::new(&path);
        writer.append_image(&image).append_image(&image);
        let err = writer.write().unwrap_err();
        assert!(matches!(err, IoError::UnsupportedOperation(_)), "{name}: {err}");
        assert!(!path.exists(), "{name}");
    }
}

#[test]
fn unsupported_layouts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gray = Image::new(4, 4, 4, 4, 2, PixelFormat::UInt8).expect("image");
    let err = write(dir.path().join("gray.exr"), &gray).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedPixelLayout(_)), "{err}");

    let options = WriteOptions::default().with_output_format(PixelFormat::Half);
    let mut writer = GenericImageFileWriter::with_options(dir.path().join("half.png"), options);
    let image = rgba(4);
    writer.append_image(&image);
    let err = writer.write().unwrap_err();
    assert!(matches!(err, IoError::UnsupportedPixelLayout(_)), "{err}");
    assert!(!dir.path().join("half.png").exists());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = read(dir.path().join("absent.exr")).unwrap_err();
    assert!(matches!(err, IoError::Io(_)), "{err}");
}
