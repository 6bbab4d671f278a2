//! Error types for the broadcaster

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Invalid channel id: {0}")]
    InvalidChannelId(String),

    #[error("Unrecognized date/time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Schedule time is in the past")]
    TimeInPast,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<teloxide::RequestError> for Error {
    fn from(err: teloxide::RequestError) -> Self {
        Error::TelegramError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_error() {
        let err = Error::ConfigError("missing bot token".to_string());
        assert!(err.to_string().contains("Config error"));
        assert!(err.to_string().contains("missing bot token"));
    }

    #[test]
    fn test_error_display_telegram_error() {
        let err = Error::TelegramError("flood wait".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Telegram API error"));
        assert!(msg.contains("flood wait"));
    }

    #[test]
    fn test_error_display_invalid_channel_id() {
        let err = Error::InvalidChannelId("not-a-channel".to_string());
        assert!(err.to_string().contains("Invalid channel id"));
        assert!(err.to_string().contains("not-a-channel"));
    }

    #[test]
    fn test_error_display_invalid_time_format() {
        let err = Error::InvalidTimeFormat("tomorrow at noon".to_string());
        assert!(err.to_string().contains("Unrecognized date/time format"));
        assert!(err.to_string().contains("tomorrow at noon"));
    }

    #[test]
    fn test_error_display_time_in_past() {
        let err = Error::TimeInPast;
        assert!(err.to_string().contains("in the past"));
    }

    #[test]
    fn test_error_display_serialization_error() {
        let err = Error::SerializationError("invalid JSON".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Serialization error"));
        assert!(msg.contains("invalid JSON"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_io_various_kinds() {
        let kinds = [
            std::io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::TimedOut,
        ];

        for kind in kinds {
            let io_err = std::io::Error::new(kind, "test");
            let err: Error = io_err.into();
            assert!(matches!(err, Error::IoError(_)));
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<i32>("[not, a, number]").unwrap_err();
        let err: Error = yaml_err.into();

        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_error_debug_impl() {
        let err = Error::TimeInPast;
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("TimeInPast"));
    }

    #[test]
    fn test_error_all_variants_debug() {
        let variants: Vec<Error> = vec![
            Error::ConfigError("config".to_string()),
            Error::TelegramError("telegram".to_string()),
            Error::InvalidChannelId("channel".to_string()),
            Error::InvalidTimeFormat("time".to_string()),
            Error::TimeInPast,
            Error::SerializationError("serial".to_string()),
        ];

        for err in variants {
            let debug_str = format!("{:?}", err);
            assert!(!debug_str.is_empty());
        }
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::TimeInPast);
        assert!(result.is_err());
    }

    #[test]
    fn test_result_map() {
        let result: Result<i32> = Ok(10);
        let mapped = result.map(|x| x * 2);
        assert_eq!(mapped.unwrap(), 20);
    }

    #[test]
    fn test_result_unwrap_or_else() {
        let result: Result<i32> = Err(Error::TimeInPast);
        let value = result.unwrap_or_else(|_| 42);
        assert_eq!(value, 42);
    }
}
