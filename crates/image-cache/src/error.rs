//! Error types for the image cache binary and setup

use std::fmt;

#[derive(Debug)]
pub enum ImageCacheError {
    Config(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ImageCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageCacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ImageCacheError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ImageCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageCacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageCacheError {
    fn from(err: std::io::Error) -> Self {
        ImageCacheError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ImageCacheError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ImageCacheError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ImageCacheError {
    fn from(err: serde_json::Error) -> Self {
        ImageCacheError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ImageCacheError::Config("no URLs given".to_string());
        assert_eq!(format!("{}", err), "Configuration error: no URLs given");
    }

    #[test]
    fn test_io_error_display() {
        let err = ImageCacheError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "urls.txt",
        ));
        assert!(format!("{}", err).starts_with("IO error:"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = ImageCacheError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
