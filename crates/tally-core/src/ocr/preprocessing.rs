//! Image normalization before recognition.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tracing::debug;

/// Shrink `image` so its longer side is at most `max_dimension`.
///
/// Aspect ratio is preserved and images already within bounds are returned
/// unchanged; this never upscales.
pub fn resize_to_max_dimension(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let longer = width.max(height);

    if max_dimension == 0 || longer <= max_dimension {
        return image.clone();
    }

    let scale = max_dimension as f32 / longer as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    debug!(
        "Resizing image {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
