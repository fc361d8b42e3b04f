//! Image storage on S3
//!
//! Uploads are re-encoded to JPEG and stored content-addressed at
//! `images/{user_id}/{sha256}.jpg`; reads go through presigned GET URLs.

use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::presigning::PresigningConfig;
use image::codecs::jpeg::JpegEncoder;
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};

/// Maximum upload size (20MB)
pub const MAX_FILE_SIZE: usize = 20 * 1024 * 1024;

const JPEG_QUALITY: u8 = 85;

const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

const PRESIGNED_URL_TTL: Duration = Duration::from_secs(3600);

pub fn image_key(user_id: &str, hash: &str) -> String {
    format!("images/{user_id}/{hash}.jpg")
}

/// 64 lowercase or uppercase hex characters
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// Check size and file extension of an upload
pub fn validate_upload(filename: &str, data: &[u8]) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::new(ErrorCode::NoFileProvided));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::with_message(
            ErrorCode::FileTooLarge,
            format!("File too large: {} bytes (max {MAX_FILE_SIZE})", data.len()),
        ));
    }

    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(AppError::with_message(
            ErrorCode::UnsupportedFileFormat,
            format!("Unsupported format: {ext}. Supported: png, jpg, jpeg, webp"),
        ));
    }
    Ok(())
}

/// Decode any supported image and re-encode it as JPEG
pub fn compress_to_jpeg(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory(data).map_err(|e| {
        AppError::with_message(ErrorCode::InvalidImageFile, format!("Invalid image: {e}"))
    })?;

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    img.to_rgb8().write_with_encoder(encoder).map_err(|e| {
        AppError::with_message(
            ErrorCode::InternalError,
            format!("Image compression failed: {e}"),
        )
    })?;
    Ok(buffer)
}

pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Clone)]
pub struct ImageStorage {
    client: S3Client,
    bucket: String,
}

impl ImageStorage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Store an encoded JPEG; same content yields the same key
    pub async fn put(&self, user_id: &str, hash: &str, jpeg: Vec<u8>) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(image_key(user_id, hash))
            .body(jpeg.into())
            .content_type("image/jpeg")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(hash = %hash, error = %e, "S3 upload failed");
                AppError::new(ErrorCode::FileStorageFailed)
            })?;
        Ok(())
    }

    pub async fn presigned_url(&self, user_id: &str, hash: &str) -> Result<String, AppError> {
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_TTL).map_err(|e| {
            tracing::error!(error = %e, "Failed to create presigning config");
            AppError::new(ErrorCode::InternalError)
        })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(image_key(user_id, hash))
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!(hash = %hash, error = %e, "Failed to generate presigned URL");
                AppError::new(ErrorCode::InternalError)
            })?;
        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 40, 40]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("a.PNG", b"x").is_ok());
        assert_eq!(
            validate_upload("a.gif", b"x").unwrap_err().code,
            ErrorCode::UnsupportedFileFormat
        );
        assert_eq!(
            validate_upload("a.png", b"").unwrap_err().code,
            ErrorCode::NoFileProvided
        );
        let big = vec![0u8; MAX_FILE_SIZE + 1];
        assert_eq!(
            validate_upload("a.png", &big).unwrap_err().code,
            ErrorCode::FileTooLarge
        );
    }

    #[test]
    fn test_compress_png_to_jpeg() {
        let jpeg = compress_to_jpeg(&tiny_png()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_garbage_is_invalid_image() {
        assert_eq!(
            compress_to_jpeg(b"not an image").unwrap_err().code,
            ErrorCode::InvalidImageFile
        );
    }

    #[test]
    fn test_hash_and_key() {
        let hash = content_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(is_valid_hash(&hash));
        assert!(!is_valid_hash("../etc/passwd"));
        assert_eq!(image_key("u1", &hash), format!("images/u1/{hash}.jpg"));
    }
}
