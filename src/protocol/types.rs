//! phx42 message kinds and well-known parameter names

use std::fmt;

/// Message kinds the engine knows how to act on.
///
/// The wire carries free-form type tokens; anything that does not map to
/// a kind here still parses fine and is simply ignored by the session
/// dispatcher, keeping the engine forward-compatible with newer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Heartbeat / liveness check.
    Heartbeat,
    /// FID reading carrying the calibrated PPM concentration.
    FidReadings,
    /// Firmware version report (and the request for one).
    FirmwareVersion,
    /// Periodic telemetry rate configuration.
    TelemetryRate,
    /// Periodic report enable/disable configuration.
    PeriodicReport,
    /// Device clock set command.
    SetTime,
    /// Igniter control.
    Ignite,
    /// Spontaneous device error report.
    SpontaneousError,
    /// Device error report.
    Error,
    /// Flameout shutdown notification.
    Shutdown,
}

impl MessageKind {
    /// Map a wire type token to a known kind, case-insensitively.
    ///
    /// Returns `None` for tokens this engine does not act on.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let kind = match token.to_ascii_uppercase().as_str() {
            "CHEK" => Self::Heartbeat,
            "FIDR" => Self::FidReadings,
            "VERS" => Self::FirmwareVersion,
            "TRPT" => Self::TelemetryRate,
            "PRPT" => Self::PeriodicReport,
            "TIME" => Self::SetTime,
            "AIGS" => Self::Ignite,
            "SERR" => Self::SpontaneousError,
            "EROR" => Self::Error,
            "SHUT" => Self::Shutdown,
            _ => return None,
        };
        Some(kind)
    }

    /// The wire token for this kind.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Heartbeat => "CHEK",
            Self::FidReadings => "FIDR",
            Self::FirmwareVersion => "VERS",
            Self::TelemetryRate => "TRPT",
            Self::PeriodicReport => "PRPT",
            Self::SetTime => "TIME",
            Self::Ignite => "AIGS",
            Self::SpontaneousError => "SERR",
            Self::Error => "EROR",
            Self::Shutdown => "SHUT",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Well-known parameter names used by the setup sequence and dispatcher.
pub mod param {
    /// Calibrated PPM concentration on FIDR readings.
    pub const CALPPM: &str = "CALPPM";
    /// Major firmware version on VERS reports.
    pub const MAJOR: &str = "MAJOR";
    /// Minor firmware version on VERS reports.
    pub const MINOR: &str = "MINOR";
    /// Error code on SERR/EROR reports.
    pub const CODE: &str = "CODE";
    /// Milliseconds on TRPT, clock text on TIME.
    pub const MS: &str = "MS";
    /// Report type selector on PRPT.
    pub const TYPE: &str = "TYPE";
    /// Enable flag on PRPT.
    pub const EN: &str = "EN";
    /// Fire flag on AIGS.
    pub const GO: &str = "GO";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_token_roundtrip() {
        let kinds = [
            MessageKind::Heartbeat,
            MessageKind::FidReadings,
            MessageKind::FirmwareVersion,
            MessageKind::Shutdown,
        ];

        for kind in kinds {
            assert_eq!(MessageKind::from_token(kind.token()), Some(kind));
        }
    }

    #[test]
    fn test_kind_from_token_is_case_insensitive() {
        assert_eq!(
            MessageKind::from_token("chek"),
            Some(MessageKind::Heartbeat)
        );
        assert_eq!(
            MessageKind::from_token("Fidr"),
            Some(MessageKind::FidReadings)
        );
    }

    #[test]
    fn test_unknown_token_maps_to_none() {
        assert_eq!(MessageKind::from_token("BATT"), None);
        assert_eq!(MessageKind::from_token(""), None);
    }
}
