pub mod credential_resolver;
pub mod imds_token_source;
pub mod traits;
