/// Extensions accepted when the declared content type says nothing useful.
pub const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".jpeg"];

/// Decides whether an inbound file is an image.
///
/// The declared content type wins when it mentions `image`; otherwise the file
/// name must end with a known extension, compared case-insensitively.
pub fn is_image(content_type: Option<&str>, file_name: &str) -> bool {
    if content_type.is_some_and(|ct| ct.contains("image")) {
        return true;
    }

    let lowered = file_name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}
