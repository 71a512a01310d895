// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decoding with EXIF orientation neutralised, lossless
// quarter-turn rotation, long-side scaling and encoding. Operates on in-memory
// images using the `image` crate.
//
// The EXIF block of a decoded file is kept (with its orientation tag reset,
// since the pixels are already upright) and re-embedded when writing JPEG.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation as ExifOrientation;
use image::{ColorType, DynamicImage, GrayImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader};
use tracing::{debug, info, instrument};
use upright_core::Orientation;
use upright_core::error::UprightError;

/// JPEG quality used when writing a corrected page back to disk.
pub const JPEG_QUALITY: u8 = 95;

/// Image pipeline operating on a single in-memory page.
///
/// Every transformation consumes `self` and returns a new `ImageProcessor`
/// wrapping a fresh buffer, so candidate renderings never share pixels.
///
/// ```ignore
/// let page = ImageProcessor::open("scan.jpg")?
///     .fit_within(1600)
///     .rotate(Orientation::Deg90);
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// Raw EXIF (TIFF) block of the source file, orientation tag cleared.
    exif: Option<Vec<u8>>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path, applying its EXIF orientation so the
    /// pixels match what a viewer would display.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, UprightError> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| {
                UprightError::ImageError(format!("failed to open {}: {}", path.display(), err))
            })?;
        let (image, exif) = decode_upright(reader)
            .map_err(|err| UprightError::ImageError(format!("{}: {}", path.display(), err)))?;
        info!(
            width = image.width(),
            height = image.height(),
            exif = exif.is_some(),
            "Image loaded"
        );
        Ok(Self { image, exif })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.), applying
    /// any EXIF orientation.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, UprightError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| UprightError::ImageError(format!("failed to sniff image: {}", err)))?;
        let (image, exif) = decode_upright(reader)?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image, exif })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image, exif: None }
    }

    /// Attach an EXIF block to be written with JPEG output. Any orientation
    /// tag in it is reset to "no transform".
    pub fn with_exif_metadata(mut self, mut exif: Vec<u8>) -> Self {
        let _ = ExifOrientation::remove_from_exif_chunk(&mut exif);
        self.exif = Some(exif);
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// EXIF block carried over from the source, if any.
    pub fn exif_metadata(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    /// 8-bit luma copy of the current image.
    pub fn to_luma(&self) -> GrayImage {
        self.image.to_luma8()
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate clockwise by a quarter-turn multiple. Lossless.
    pub fn rotate(self, orientation: Orientation) -> Self {
        Self {
            image: rotated(&self.image, orientation),
            exif: self.exif,
        }
    }

    /// Downscale (bilinear) so the long side is at most `max_side`. Smaller
    /// images are returned untouched.
    pub fn fit_within(self, max_side: u32) -> Self {
        let long_side = self.image.width().max(self.image.height());
        if long_side <= max_side || long_side == 0 {
            return self;
        }
        self.scale_long_side(max_side)
    }

    /// Upscale (bilinear) so the long side is at least `min_side`. Larger
    /// images are returned untouched.
    pub fn enlarge_to(self, min_side: u32) -> Self {
        let long_side = self.image.width().max(self.image.height());
        if long_side >= min_side || long_side == 0 {
            return self;
        }
        self.scale_long_side(min_side)
    }

    fn scale_long_side(self, target: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        let scale = target as f64 / w.max(h) as f64;
        let new_w = ((w as f64 * scale) as u32).max(1);
        let new_h = ((h as f64 * scale) as u32).max(1);
        debug!(from_w = w, from_h = h, new_w, new_h, "Rescaling image");
        Self {
            image: self
                .image
                .resize_exact(new_w, new_h, FilterType::Triangle),
            exif: self.exif,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, UprightError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// Grayscale pages stay single-channel; everything else becomes RGB. The
    /// carried EXIF block, if any, is embedded.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, UprightError> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        if let Some(exif) = &self.exif {
            encoder.set_exif_metadata(exif.clone()).map_err(|err| {
                UprightError::ImageError(format!("cannot embed EXIF: {}", err))
            })?;
        }
        let result = match self.image.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                self.image.to_luma8().write_with_encoder(encoder)
            }
            _ => self.image.to_rgb8().write_with_encoder(encoder),
        };
        result.map_err(|err| UprightError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the extension;
    /// JPEGs are written at [`JPEG_QUALITY`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), UprightError> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path).map_err(|err| {
            UprightError::UnsupportedImage(format!("{}: {}", path.display(), err))
        })?;
        let bytes = match format {
            ImageFormat::Jpeg => self.to_jpeg_bytes(JPEG_QUALITY)?,
            other => encode_to_format(&self.image, other)?,
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Fresh buffer rotated clockwise by `orientation`.
pub fn rotated(image: &DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Deg0 => image.clone(),
        Orientation::Deg90 => image.rotate90(),
        Orientation::Deg180 => image.rotate180(),
        Orientation::Deg270 => image.rotate270(),
    }
}

/// Decode through the reader's decoder so the EXIF orientation tag can be
/// read and applied before the pixels reach the engine. Returns the EXIF
/// block too, with its orientation reset to match the upright pixels.
fn decode_upright<R: BufRead + Seek>(
    reader: ImageReader<R>,
) -> Result<(DynamicImage, Option<Vec<u8>>), UprightError> {
    let mut decoder = reader
        .into_decoder()
        .map_err(|err| UprightError::ImageError(format!("failed to decode image: {}", err)))?;
    let exif_orientation = decoder
        .orientation()
        .map_err(|err| UprightError::ImageError(format!("failed to read orientation: {}", err)))?;
    // Unreadable metadata costs the EXIF block, not the page.
    let exif = match decoder.exif_metadata() {
        Ok(exif) => exif.map(|mut chunk| {
            let _ = ExifOrientation::remove_from_exif_chunk(&mut chunk);
            chunk
        }),
        Err(err) => {
            debug!(error = %err, "EXIF block unreadable; dropping it");
            None
        }
    };
    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|err| UprightError::ImageError(format!("failed to decode image: {}", err)))?;
    image.apply_orientation(exif_orientation);
    Ok((image, exif))
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, UprightError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        UprightError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn marked_page() -> DynamicImage {
        // 4x2 page with a single dark pixel in the top-left corner.
        let mut img = GrayImage::from_pixel(4, 2, Luma([255u8]));
        img.put_pixel(0, 0, Luma([0u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn rotate_90_moves_top_left_to_top_right() {
        let out = ImageProcessor::from_dynamic(marked_page())
            .rotate(Orientation::Deg90)
            .to_luma();
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(out.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn rotate_270_moves_top_left_to_bottom_left() {
        let out = ImageProcessor::from_dynamic(marked_page())
            .rotate(Orientation::Deg270)
            .to_luma();
        assert_eq!(out.get_pixel(0, 3).0[0], 0);
    }

    #[test]
    fn rotated_leaves_source_untouched() {
        let source = marked_page();
        let flipped = rotated(&source, Orientation::Deg180);
        assert_eq!(flipped.to_luma8().get_pixel(3, 1).0[0], 0);
        assert_eq!(source.to_luma8().get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn fit_within_keeps_aspect() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(3200, 1600));
        let out = ImageProcessor::from_dynamic(img).fit_within(1600);
        assert_eq!((out.width(), out.height()), (1600, 800));
    }

    #[test]
    fn fit_within_ignores_small_images() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(300, 200));
        let out = ImageProcessor::from_dynamic(img).fit_within(1600);
        assert_eq!((out.width(), out.height()), (300, 200));
    }

    #[test]
    fn enlarge_to_scales_up_short_pages() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(450, 300));
        let out = ImageProcessor::from_dynamic(img).enlarge_to(900);
        assert_eq!((out.width(), out.height()), (900, 600));
    }

    #[test]
    fn png_round_trip_through_bytes() {
        let bytes = ImageProcessor::from_dynamic(marked_page())
            .to_png_bytes()
            .expect("encode");
        let decoded = ImageProcessor::from_bytes(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
        assert_eq!(decoded.to_luma().get_pixel(0, 0).0[0], 0);
    }

    /// Little-endian TIFF block: Make = "ACM", Orientation = `orientation`.
    fn exif_block(orientation: u8) -> Vec<u8> {
        let mut chunk = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, 0x02, 0x00];
        chunk.extend_from_slice(&[0x0F, 0x01, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00]);
        chunk.extend_from_slice(b"ACM\0");
        chunk.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
        chunk.extend_from_slice(&[orientation, 0x00, 0x00, 0x00]);
        chunk.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        chunk
    }

    fn jpeg_with_exif(page: &DynamicImage, exif: Vec<u8>) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, 95);
        encoder.set_exif_metadata(exif).expect("exif");
        page.to_luma8().write_with_encoder(encoder).expect("encode");
        buffer
    }

    fn read_exif(path: &Path) -> Option<Vec<u8>> {
        ImageReader::open(path)
            .expect("open")
            .with_guessed_format()
            .expect("sniff")
            .into_decoder()
            .expect("decoder")
            .exif_metadata()
            .expect("exif")
    }

    #[test]
    fn exif_orientation_applied_and_cleared() {
        // 6 = rotate 90 clockwise to display.
        let bytes = jpeg_with_exif(&marked_page(), exif_block(6));
        let decoded = ImageProcessor::from_bytes(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (2, 4));

        let exif = decoded.exif_metadata().expect("exif kept");
        assert_eq!(
            ExifOrientation::from_exif_chunk(exif),
            Some(ExifOrientation::NoTransforms)
        );
        assert!(exif.windows(3).any(|w| w == b"ACM"));
    }

    #[test]
    fn jpeg_save_keeps_other_exif_tags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scan.jpg");
        std::fs::write(&path, jpeg_with_exif(&marked_page(), exif_block(6))).expect("write");

        ImageProcessor::open(&path)
            .expect("open")
            .rotate(Orientation::Deg180)
            .save(&path)
            .expect("save");

        let exif = read_exif(&path).expect("exif survives rewrite");
        assert!(exif.windows(3).any(|w| w == b"ACM"), "Make tag lost");
        assert_eq!(
            ExifOrientation::from_exif_chunk(&exif),
            Some(ExifOrientation::NoTransforms)
        );
        // Orientation was baked in once; reopening must not turn it again.
        let reopened = ImageProcessor::open(&path).expect("reopen");
        assert_eq!((reopened.width(), reopened.height()), (2, 4));
    }

    #[test]
    fn attached_exif_has_orientation_reset() {
        let processor = ImageProcessor::from_dynamic(marked_page()).with_exif_metadata(exif_block(8));
        let exif = processor.exif_metadata().expect("exif");
        assert_eq!(
            ExifOrientation::from_exif_chunk(exif),
            Some(ExifOrientation::NoTransforms)
        );
    }

    #[test]
    fn grayscale_jpeg_stays_single_channel() {
        let bytes = ImageProcessor::from_dynamic(marked_page())
            .to_jpeg_bytes(JPEG_QUALITY)
            .expect("encode");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.color(), ColorType::L8);
    }

    #[test]
    fn colour_jpeg_written_as_rgb() {
        let colour = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let bytes = ImageProcessor::from_dynamic(colour)
            .to_jpeg_bytes(JPEG_QUALITY)
            .expect("encode");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(ImageProcessor::from_bytes(b"not an image").is_err());
    }
}
