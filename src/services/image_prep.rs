use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};

use crate::config::PreprocessPolicy;
use crate::error::AnalysisError;
use crate::models::EncodedImage;

/// Convert raw PNG/JPEG bytes into the base64 PNG string the estimation
/// payload embeds. A decode failure is terminal for the submission.
pub fn prepare_image(
    bytes: &[u8],
    policy: &PreprocessPolicy,
) -> Result<EncodedImage, AnalysisError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) | Ok(ImageFormat::Jpeg) => {}
        Ok(other) => {
            return Err(AnalysisError::Decode(format!(
                "unsupported image format {:?}, expected PNG or JPEG",
                other
            )));
        }
        Err(err) => return Err(AnalysisError::Decode(err.to_string())),
    }

    let decoded = image::load_from_memory(bytes)?;
    log::debug!(
        "📸 Decoded upload: {}x{} ({} bytes)",
        decoded.width(),
        decoded.height(),
        bytes.len()
    );

    let prepared = if policy.normalize {
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        if rgb.width() > policy.max_dimension || rgb.height() > policy.max_dimension {
            rgb.resize(policy.max_dimension, policy.max_dimension, FilterType::Triangle)
        } else {
            rgb
        }
    } else {
        decoded
    };

    let mut buffer = Cursor::new(Vec::new());
    prepared.write_to(&mut buffer, ImageFormat::Png)?;

    let png_base64 = general_purpose::STANDARD.encode(buffer.get_ref());
    log::debug!("🔄 Base64 encoded size: {} bytes", png_base64.len());

    Ok(EncodedImage {
        png_base64,
        width: prepared.width(),
        height: prepared.height(),
    })
}
