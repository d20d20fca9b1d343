//! Image type detection for uploads.

use std::path::Path;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

/// MIME type for an image file name, by extension.
pub fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Preferred file extension for an image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(_, m)| *m == mime)
        .map(|(e, _)| *e)
}

/// Effective image MIME type of an upload, or `None` if it is not an image.
///
/// A declared `image/*` type wins; otherwise the file name's extension decides.
pub fn image_mime(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
    match declared.map(|d| d.trim().to_ascii_lowercase()) {
        Some(d) if d.starts_with("image/") => Some(d),
        Some(d) if !d.is_empty() && d != "application/octet-stream" => None,
        _ => filename
            .and_then(mime_from_filename)
            .map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_filename() {
        assert_eq!(mime_from_filename("scan.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_filename("rx.png"), Some("image/png"));
        assert_eq!(mime_from_filename("notes.txt"), None);
        assert_eq!(mime_from_filename("noext"), None);
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Some("image/png"), None).as_deref(), Some("image/png"));
        assert_eq!(image_mime(Some("text/plain"), Some("rx.png")), None);
        assert_eq!(
            image_mime(Some("application/octet-stream"), Some("rx.webp")).as_deref(),
            Some("image/webp")
        );
        assert_eq!(image_mime(None, Some("rx.jpeg")).as_deref(), Some("image/jpeg"));
        assert_eq!(image_mime(None, None), None);
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_mime("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for_mime("image/x-unknown"), None);
    }
}
