pub mod image_thumbnailer;
pub mod traits;
