pub mod azure_blob_service;
pub mod constants;
pub mod sas;
pub mod shared_key_signer;
pub mod traits;
pub mod xml;
