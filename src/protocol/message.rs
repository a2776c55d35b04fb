//! phx42 message implementation

use std::collections::BTreeMap;

use super::{EncodeError, HOST_TO_UNIT_TAG, MessageKind, UNIT_TO_HOST_TAG};

/// Direction of a message, carried as a fixed 4-character tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host application to analyzer (`ZUzu`).
    HostToUnit,
    /// Analyzer to host application (`YTyt`).
    UnitToHost,
}

impl Direction {
    /// The wire tag for this direction.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::HostToUnit => HOST_TO_UNIT_TAG,
            Self::UnitToHost => UNIT_TO_HOST_TAG,
        }
    }

    /// Classify a wire tag, case-insensitively.
    ///
    /// Deliberately permissive: anything that is not the unit-to-host
    /// literal is recorded as host-to-unit, matching observed firmware
    /// traffic. Unknown tags are never rejected.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case(UNIT_TO_HOST_TAG) {
            Self::UnitToHost
        } else {
            Self::HostToUnit
        }
    }
}

/// Third field of a protocol line.
///
/// The grammar carries either a parameter list or a free-form extra
/// token there, never both, so the two are one tagged variant rather
/// than two nullable fields. A fourth field may trail a parameter list
/// on inbound lines; only the parser produces that form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// No third field.
    #[default]
    Empty,
    /// `NAME=VALUE` pairs, comma-joined on the wire. Keys are unique;
    /// on parse the last occurrence of a duplicate name wins.
    Params {
        /// The parameter map.
        params: BTreeMap<String, String>,
        /// Fourth-field token following a parameter list, if any.
        trailing: Option<String>,
    },
    /// Opaque trailing token.
    Extra(String),
}

/// One unit of protocol exchange, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    direction: Direction,
    message_type: String,
    payload: Payload,
}

impl Message {
    pub(super) fn from_parts(
        direction: Direction,
        message_type: String,
        payload: Payload,
    ) -> Self {
        Self {
            direction,
            message_type,
            payload,
        }
    }

    /// Create a host-to-unit command with no payload.
    #[must_use]
    pub fn command(kind: MessageKind) -> Self {
        Self::from_parts(Direction::HostToUnit, kind.token().to_owned(), Payload::Empty)
    }

    /// Create a host-to-unit command carrying parameters.
    ///
    /// An empty map collapses to no payload at all, so the encoded line
    /// never carries an empty third field.
    #[must_use]
    pub fn command_with_params(kind: MessageKind, params: BTreeMap<String, String>) -> Self {
        let payload = if params.is_empty() {
            Payload::Empty
        } else {
            Payload::Params {
                params,
                trailing: None,
            }
        };
        Self::from_parts(Direction::HostToUnit, kind.token().to_owned(), payload)
    }

    /// Build a host-to-unit message from a free-form type token and
    /// optional payload fields.
    ///
    /// This mirrors the collaborator-facing send signature; supplying
    /// both `params` and `extra` is a caller error because the wire
    /// grammar's third field holds one or the other.
    pub fn to_unit(
        message_type: impl Into<String>,
        params: Option<BTreeMap<String, String>>,
        extra: Option<String>,
    ) -> Result<Self, EncodeError> {
        let message_type = message_type.into();
        if message_type.is_empty() {
            return Err(EncodeError::EmptyType);
        }

        let payload = match (params, extra) {
            (Some(_), Some(_)) => {
                return Err(EncodeError::ConflictingPayload { message_type });
            }
            (Some(params), None) if !params.is_empty() => Payload::Params {
                params,
                trailing: None,
            },
            (None, Some(extra)) => Payload::Extra(extra),
            _ => Payload::Empty,
        };

        Ok(Self::from_parts(Direction::HostToUnit, message_type, payload))
    }

    /// Get message direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Get the raw type token.
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Map the type token to a known kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_token(&self.message_type)
    }

    /// Get the payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Get the parameter map, if the payload carries one.
    #[must_use]
    pub fn params(&self) -> Option<&BTreeMap<String, String>> {
        match &self.payload {
            Payload::Params { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Look up a parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params()?.get(name).map(String::as_str)
    }

    /// Check whether a parameter is present.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Get the extra token, if the payload carries one.
    ///
    /// Covers both the extra-only form and the fourth field trailing a
    /// parameter list on inbound lines.
    #[must_use]
    pub fn extra(&self) -> Option<&str> {
        match &self.payload {
            Payload::Extra(extra) => Some(extra),
            Payload::Params {
                trailing: Some(trailing),
                ..
            } => Some(trailing),
            _ => None,
        }
    }

    /// Encode to a terminated wire line.
    #[must_use]
    pub fn encode(&self) -> String {
        super::encode(self)
    }

    /// Parse a wire line (with or without its terminator).
    pub fn parse(line: &str) -> Result<Self, super::ParseError> {
        super::decode(line)
    }
}
