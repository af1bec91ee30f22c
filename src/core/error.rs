use std::path::PathBuf;

/// Result type alias for testopia-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for testopia-sync.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The selected registry installation does not exist or is incomplete.
    #[error("Invalid Testopia installation: {0}")]
    Installation(String),

    /// Authentication against the registry failed.
    #[error("Login failed: {0}")]
    Login(String),

    /// A registry call failed or returned an XML-RPC fault.
    #[error("Registry error: {0}")]
    Registry(String),

    /// A single report file could not be parsed.
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Workspace scanning or remote collection failed.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// A build step could not be executed.
    #[error("Build step error: {0}")]
    Step(String),

    /// Structurally invalid XML (unbalanced or empty document).
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// Missing required configuration field.
    #[error("Missing required configuration field: {0}")]
    MissingConfig(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidConfig { field: String, value: String },

    /// Feature not enabled.
    #[error("Feature '{0}' is not enabled. Enable it in Cargo.toml features.")]
    FeatureNotEnabled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML tokenizer error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid include pattern.
    #[error("Invalid include pattern: {0}")]
    Glob(#[from] globset::Error),

    /// Invalid regular expression.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Directory traversal error.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// HTTP transport error (when the xmlrpc feature is enabled).
    #[cfg(feature = "xmlrpc")]
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an installation error.
    pub fn installation(msg: impl Into<String>) -> Self {
        Error::Installation(msg.into())
    }

    /// Create a login error.
    pub fn login(msg: impl Into<String>) -> Self {
        Error::Login(msg.into())
    }

    /// Create a registry error.
    pub fn registry(msg: impl Into<String>) -> Self {
        Error::Registry(msg.into())
    }

    /// Create a parse error for a report file.
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a workspace error.
    pub fn workspace(msg: impl Into<String>) -> Self {
        Error::Workspace(msg.into())
    }

    /// Create a build step error.
    pub fn step(msg: impl Into<String>) -> Self {
        Error::Step(msg.into())
    }

    /// Create a malformed XML error.
    pub fn malformed_xml(msg: impl Into<String>) -> Self {
        Error::MalformedXml(msg.into())
    }

    /// Create a feature not enabled error.
    pub fn feature_not_enabled(feature: impl Into<String>) -> Self {
        Error::FeatureNotEnabled(feature.into())
    }

    /// Whether this error must abort the whole run.
    ///
    /// Everything else is recovered at the narrowest scope and downgrades the
    /// build to unstable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Installation(_)
                | Error::Login(_)
                | Error::Config(_)
                | Error::MissingConfig(_)
                | Error::InvalidConfig { .. }
        )
    }
}
