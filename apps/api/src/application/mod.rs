pub mod deadline;
pub mod list_thumbnails;
pub mod upload_image;
