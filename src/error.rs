// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

/// All errors that can occur in the powermax-lan-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum PowermaxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A requested byte range has not been downloaded yet. Always retryable:
    /// callers treat this as "try again after more settings data arrives",
    /// never as zero-filled data.
    #[error("settings data not yet downloaded (page {page:#04X}, bytes {start}..={end})")]
    MissingData { page: u8, start: usize, end: usize },

    /// A code read from the panel memory is outside the known tables
    /// (panel type, sensor type, zone-name index). Degrades the single
    /// affected field, never a whole decode pass.
    #[error("unrecognized {what} code {code:#04X}")]
    UnrecognizedCode { what: &'static str, code: u8 },

    #[error("connection to the panel lost")]
    Disconnected,

    #[error("no reply from panel within {0:?}")]
    ResponseTimeout(std::time::Duration),

    #[error("connection attempts exhausted after {attempts} tries")]
    ConnectRetriesExhausted { attempts: u32 },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("internal channel closed")]
    ChannelClosed,
}

impl PowermaxError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PowermaxError::Io(_)
                | PowermaxError::MissingData { .. }
                | PowermaxError::Disconnected
                | PowermaxError::ResponseTimeout(_)
                | PowermaxError::ChannelClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, PowermaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_is_retryable() {
        let e = PowermaxError::MissingData { page: 0x19, start: 0, end: 15 };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_configuration_is_terminal() {
        let e = PowermaxError::Configuration("serial port or ip/port required".into());
        assert!(!e.is_retryable());
    }
}
