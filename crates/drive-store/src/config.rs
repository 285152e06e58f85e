use std::fmt::Debug;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Builder for [`DriveConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DriveConfigBuilder {
    access_token: String,
    api_base: Option<String>,
}

impl DriveConfigBuilder {
    /// Creates a builder with an OAuth access token that carries the
    /// `https://www.googleapis.com/auth/drive` scope.
    #[inline]
    pub fn with_access_token<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: None,
        }
    }

    /// Sets a custom API base, e.g. a local emulator.
    #[inline]
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> DriveConfig {
        let api_base = self
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        DriveConfig {
            access_token: self.access_token,
            api_base: api_base.trim_end_matches('/').to_owned(),
        }
    }
}

impl Debug for DriveConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfigBuilder")
            .field("access_token", &"<deducted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Configuration for [`crate::DriveStore`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DriveConfig {
    pub(crate) access_token: String,
    pub(crate) api_base: String,
}

impl DriveConfig {
    #[inline]
    pub(crate) fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    #[inline]
    pub(crate) fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.api_base)
    }
}

impl Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("access_token", &"<deducted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}
