use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageError};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::buffer::PixelBuffer;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot read input image {}", .path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode input image{}", describe(.path))]
    Decode {
        path: Option<PathBuf>,
        #[source]
        source: ImageError,
    },
    #[error("cannot write output image {}", .path.display())]
    OutputIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot encode output image {}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

fn describe(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default()
}

/// Reads and decodes an image file, guessing the format from its contents.
pub fn load_image(path: impl AsRef<Path>) -> Result<PixelBuffer, CodecError> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| CodecError::InputUnavailable { path: path.to_path_buf(), source })?;
    let decoded = reader
        .decode()
        .map_err(|source| CodecError::Decode { path: Some(path.to_path_buf()), source })?;
    Ok(PixelBuffer::from_dynamic(&decoded))
}

pub fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
    let decoded = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)
        .and_then(|r| r.decode())
        .map_err(|source| CodecError::Decode { path: None, source })?;
    Ok(PixelBuffer::from_dynamic(&decoded))
}

/// Encodes as baseline JPEG at the encoder's default quality. JPEG has no alpha
/// channel, so it is dropped.
pub fn encode_jpeg(buffer: &PixelBuffer) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgba8(buffer.as_rgba_image().clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes).encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    Ok(bytes)
}

pub fn save_jpeg(path: impl AsRef<Path>, buffer: &PixelBuffer) -> Result<(), CodecError> {
    let path = path.as_ref();
    let bytes = encode_jpeg(buffer).map_err(|source| CodecError::Encode { path: path.to_path_buf(), source })?;
    let output_err = |source| CodecError::OutputIo { path: path.to_path_buf(), source };
    let mut writer = BufWriter::new(File::create(path).map_err(output_err)?);
    writer.write_all(&bytes).and_then(|_| writer.flush()).map_err(output_err)?;
    Ok(())
}
