use anyhow::{Result, anyhow};
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat};

const JPEG_QUALITY: u8 = 90;

/// Re-encode an uploaded image as a baseline RGB JPEG.
///
/// The label detector rejects progressive JPEGs and several container formats,
/// so every image is normalized before it is handed over.
pub fn to_baseline_jpeg(data: &[u8]) -> Result<Vec<u8>> {
    let img =
        image::load_from_memory(data).map_err(|e| anyhow!("Failed to decode image: {}", e))?;

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    rgb.write_to(
        &mut std::io::Cursor::new(&mut out),
        ImageOutputFormat::Jpeg(JPEG_QUALITY),
    )
    .map_err(|e| anyhow!("Failed to encode JPEG: {}", e))?;
    Ok(out)
}

/// Run the re-encode off the async executor
pub async fn to_baseline_jpeg_blocking(data: Bytes) -> Result<Bytes> {
    let jpeg = tokio::task::spawn_blocking(move || to_baseline_jpeg(&data)).await??;
    Ok(Bytes::from(jpeg))
}
