#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Guild id is not configured (set guild_id in config.toml or SOT_GUILD)")]
    MissingGuild,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session polling stopped after {cycles} cycle(s): {reason}")]
    PollStopped { cycles: u64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_missing_guild() {
        let err = AppError::MissingGuild;
        assert_eq!(
            err.to_string(),
            "Guild id is not configured (set guild_id in config.toml or SOT_GUILD)"
        );
    }

    #[test]
    fn test_display_invalid_config() {
        let err = AppError::InvalidConfig("poll.interval_secs must be > 0".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: poll.interval_secs must be > 0"
        );
    }

    #[test]
    fn test_display_poll_stopped() {
        let err = AppError::PollStopped {
            cycles: 12,
            reason: "remote returned 403".into(),
        };
        assert_eq!(
            err.to_string(),
            "Session polling stopped after 12 cycle(s): remote returned 403"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
