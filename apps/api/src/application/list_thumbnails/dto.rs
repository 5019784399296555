use crate::domain::image::value_objects::ThumbnailUrlEntry;

/// Browser-ready links, in the store's enumeration order.
pub fn render_links(entries: &[ThumbnailUrlEntry]) -> Vec<String> {
    entries.iter().map(ThumbnailUrlEntry::href).collect()
}
