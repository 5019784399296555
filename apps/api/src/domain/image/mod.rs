pub mod errors;
pub mod upload_policy;
pub mod value_objects;
