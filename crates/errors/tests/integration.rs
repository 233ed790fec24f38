//! Integration tests for error types

#[cfg(test)]
mod tests {
    use dlmon_errors::*;

    #[test]
    fn test_error_conversion() {
        let ledger_err = LedgerError::unknown(EntityKind::Process, 7);
        let err: Error = ledger_err.into();
        assert!(matches!(err, Error::Ledger(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::duplicate(EntityKind::Resource, "R3");
        assert_eq!(err.to_string(), "resource already registered: R3");

        let err = MonitorError::InvalidInterval { interval_ms: 0 };
        assert_eq!(err.to_string(), "invalid monitor interval: 0ms");
    }

    #[test]
    fn test_error_clone() {
        let err = RecoveryError::UnknownVictim { id: "P9".into() };
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn test_user_facing_codes() {
        let err: Error = MonitorError::AlreadyRunning.into();
        assert_eq!(err.user_code(), Some("monitor.already_running"));
        assert!(err.user_hint().is_some());
        assert!(!err.is_retryable());

        let err: Error = MonitorError::TickFailed {
            message: "boom".into(),
        }
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.user_code(), Some("error.io"));
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("not = [valid");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Config(ConfigError::ParseError { .. })));
    }
}
