use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF, ImageICC};
use std::path::Path;

use super::MetadataCopier;
use crate::error::{Error, Result};

/// In-process metadata copy for JPEG → JPEG.
///
/// Replaces the destination's APP1 EXIF and ICC profile segments with the
/// source's. Tags stored elsewhere (XMP, IPTC) are not carried over.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCopier;

fn load_jpeg(path: &Path) -> Result<Jpeg> {
    let bytes = std::fs::read(path).map_err(|e| Error::fs(path, e))?;
    Jpeg::from_bytes(Bytes::from(bytes))
        .map_err(|e| Error::MetadataCopy(format!("{} is not a JPEG: {e}", path.display())))
}

impl MetadataCopier for NativeCopier {
    fn name(&self) -> &str {
        "native"
    }

    fn copy_all_metadata(&mut self, source: &Path, destination: &Path) -> Result<()> {
        let original = load_jpeg(source)?;
        let mut edited = load_jpeg(destination)?;

        edited.set_exif(original.exif());
        edited.set_icc_profile(original.icc_profile());

        let mut out = Vec::new();
        edited
            .encoder()
            .write_to(&mut out)
            .map_err(|e| Error::MetadataCopy(format!("failed to rebuild JPEG: {e}")))?;
        std::fs::write(destination, out).map_err(|e| Error::fs(destination, e))?;

        log::debug!(
            "Copied EXIF/ICC from {} to {}",
            source.display(),
            destination.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn tiny_jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    // Minimal little-endian TIFF header with an empty IFD0.
    const TIFF: &[u8] = b"II*\x00\x08\x00\x00\x00\x00\x00\x00\x00\x00\x00";

    fn jpeg_with_exif(path: &Path) {
        let mut jpeg = Jpeg::from_bytes(Bytes::from(tiny_jpeg())).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(TIFF)));
        let mut out = Vec::new();
        jpeg.encoder().write_to(&mut out).unwrap();
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn copies_exif_segment() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.jpg");
        let dst = dir.path().join("out.jpg");
        jpeg_with_exif(&src);
        std::fs::write(&dst, tiny_jpeg()).unwrap();

        NativeCopier.copy_all_metadata(&src, &dst).unwrap();

        let out = load_jpeg(&dst).unwrap();
        assert_eq!(out.exif().as_deref(), Some(TIFF));
    }

    #[test]
    fn destination_stays_decodable() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.jpg");
        let dst = dir.path().join("out.jpg");
        jpeg_with_exif(&src);
        std::fs::write(&dst, tiny_jpeg()).unwrap();

        NativeCopier.copy_all_metadata(&src, &dst).unwrap();

        let decoded = image::open(&dst).unwrap();
        assert_eq!(decoded.width(), 4);
    }

    #[test]
    fn missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("out.jpg");
        std::fs::write(&dst, tiny_jpeg()).unwrap();

        let err = NativeCopier
            .copy_all_metadata(&dir.path().join("gone.jpg"), &dst)
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn non_jpeg_destination_fails() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.jpg");
        let dst = dir.path().join("out.jpg");
        jpeg_with_exif(&src);
        std::fs::write(&dst, b"not an image").unwrap();

        let err = NativeCopier.copy_all_metadata(&src, &dst).unwrap_err();
        assert!(matches!(err, Error::MetadataCopy(_)));
    }
}
