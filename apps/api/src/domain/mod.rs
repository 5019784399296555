pub mod image;
pub mod storage;
