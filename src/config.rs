use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FIELD: &str = "image";
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "/images";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Directory the `images` destination is resolved against.
    pub upload_root: PathBuf,
    pub field_name: String,
    pub max_upload_size: usize,
    pub reject_unsupported_mime: bool,
    pub public_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_root: PathBuf::from("."),
            field_name: DEFAULT_FIELD.to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            reject_unsupported_mime: true,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Blank or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            port: value("UPLOAD_PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            upload_root: value("UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_root),
            field_name: value("UPLOAD_FIELD").unwrap_or(defaults.field_name),
            max_upload_size: value("MAX_UPLOAD_SIZE")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.max_upload_size),
            reject_unsupported_mime: value("REJECT_UNSUPPORTED_MIME")
                .and_then(|value| parse_bool(&value))
                .unwrap_or(defaults.reject_unsupported_mime),
            public_base_url: value("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
