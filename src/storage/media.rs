use std::path::Path;

use image::ImageFormat;
use log::{debug, error, info};
use tokio::fs;
use uuid::Uuid;

use crate::{
    constants::RECIPE_IMAGE_DIR,
    error::{Error, HtmlError},
};

/// Fully decodes an upload and returns its format. Only JPEG, PNG, GIF,
/// WebP and BMP images are accepted.
pub fn decode_image(data: &[u8]) -> Option<ImageFormat> {
    let format = image::guess_format(data).ok()?;
    image_extension(format)?;

    match image::load_from_memory_with_format(data, format) {
        Ok(_) => Some(format),
        Err(e) => {
            debug!("Rejected {format:?} upload: {e}");
            None
        }
    }
}

pub fn image_extension(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Bmp => Some("bmp"),
        _ => None,
    }
}

/// Media-relative path for a new recipe image, `uploads/recipe/<uuid>.<ext>`.
pub fn recipe_image_path(format: ImageFormat) -> String {
    format!(
        "{RECIPE_IMAGE_DIR}/{}.{}",
        Uuid::new_v4(),
        image_extension(format).unwrap_or("img")
    )
}

/// Writes an uploaded recipe image below `media_root` and returns its
/// media-relative path.
pub async fn save_recipe_image(
    media_root: &Path,
    format: ImageFormat,
    data: &[u8],
) -> Result<String, Error> {
    let relative = recipe_image_path(format);
    let target = media_root.join(&relative);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            error!("Failed to create media directory {}: {e}", parent.display());
            HtmlError::InternalError.default()
        })?;
    }

    fs::write(&target, data).await.map_err(|e| {
        error!("Failed to write {}: {e}", target.display());
        HtmlError::InternalError.default()
    })?;
    info!("Stored recipe image {relative} ({} bytes)", data.len());

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::DynamicImage;

    use super::*;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut Cursor::new(&mut data), format)
            .unwrap();
        data
    }

    #[test]
    fn decodes_common_formats() {
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
            assert_eq!(decode_image(&encode(format)), Some(format));
        }
    }

    #[test]
    fn rejects_header_only_and_truncated_images() {
        let png = encode(ImageFormat::Png);

        assert!(decode_image(&png[..16]).is_none());
        assert!(decode_image(&png[..png.len() / 2]).is_none());
    }

    #[test]
    fn rejects_non_images() {
        assert!(decode_image(b"notanimage").is_none());
        assert!(decode_image(b"").is_none());
    }

    #[test]
    fn rejects_formats_outside_the_allow_list() {
        let tiff = encode(ImageFormat::Tiff);

        assert!(decode_image(&tiff).is_none());
    }

    #[test]
    fn image_paths_are_unique() {
        let first = recipe_image_path(ImageFormat::Png);
        let second = recipe_image_path(ImageFormat::Png);

        assert!(first.starts_with("uploads/recipe/"));
        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
        assert!(recipe_image_path(ImageFormat::Jpeg).ends_with(".jpg"));
    }

    #[tokio::test]
    async fn saves_below_media_root() {
        let root = std::env::temp_dir().join(format!("recipe-api-media-{}", Uuid::new_v4()));
        let png = encode(ImageFormat::Png);
        let relative = save_recipe_image(&root, ImageFormat::Png, &png).await.unwrap();

        let stored = fs::read(root.join(&relative)).await.unwrap();
        assert_eq!(stored, png);

        fs::remove_dir_all(&root).await.unwrap();
    }
}
