use lazy_static::lazy_static;
use std::{fmt, str::FromStr};
use validator::Validate;

lazy_static! {
    static ref ACCOUNT_NAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-z0-9]+$").unwrap();
    static ref CONTAINER_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9](?:[a-z0-9]|-[a-z0-9])+$").unwrap();
}

/// Where originals and thumbnails live, and how to reach them.
///
/// A missing `thumbnail_container` switches thumbnail generation off; it is
/// not an error.
#[derive(Clone, Validate)]
pub struct StorageConfig {
    #[validate(length(min = 3, max = 24), regex(path = *ACCOUNT_NAME_REGEX))]
    pub account_name: String,

    pub account_key: Option<String>,

    #[validate(length(min = 3, max = 63), regex(path = *CONTAINER_NAME_REGEX))]
    pub image_container: String,

    #[validate(length(min = 3, max = 63), regex(path = *CONTAINER_NAME_REGEX))]
    pub thumbnail_container: Option<String>,
}

impl StorageConfig {
    pub fn new(
        account_name: String,
        account_key: Option<String>,
        image_container: String,
        thumbnail_container: Option<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let config = Self {
            account_name,
            account_key: account_key.filter(|k| !k.trim().is_empty()),
            image_container,
            thumbnail_container: thumbnail_container.filter(|c| !c.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Account key, if one was configured and is not blank.
    pub fn usable_account_key(&self) -> Option<&str> {
        self.account_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn thumbnails_enabled(&self) -> bool {
        self.thumbnail_container.is_some()
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("image_container", &self.image_container)
            .field("thumbnail_container", &self.thumbnail_container)
            .finish()
    }
}

/// How thumbnail links are handed to browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Read-only, container-scoped SAS valid for one hour.
    #[default]
    Signed,
    /// Bare blob URL; only works when the container allows public reads.
    Plain,
}

impl FromStr for LinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signed" | "sas" => Ok(Self::Signed),
            "plain" | "public" => Ok(Self::Plain),
            other => Err(format!("unknown link mode '{}', expected signed or plain", other)),
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed => f.write_str("signed"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

/// Encoding used for generated thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailFormat {
    #[default]
    Png,
    /// Keep the source format when the codec can write it, PNG otherwise.
    Source,
}

impl FromStr for ThumbnailFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "source" => Ok(Self::Source),
            other => Err(format!(
                "unknown thumbnail format '{}', expected png or source",
                other
            )),
        }
    }
}
