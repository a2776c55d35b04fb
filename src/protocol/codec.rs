//! phx42 line codec (encode/decode)
//!
//! Stateless translation between [`Message`] values and terminated wire
//! lines. Framing (finding line boundaries in the byte stream) lives in
//! [`crate::session::FrameReader`].

use std::collections::BTreeMap;

use super::{Direction, Message, ParseError, Payload, TERMINATOR};

/// Encode a message to a terminated wire line.
///
/// # Format
///
/// ```text
/// <TAG> <TYPE>[ <NAME1=VALUE1,NAME2=VALUE2,...>][ <EXTRA>]\r\n
/// ```
///
/// Parameter order follows the map's iteration order: stable within one
/// call, not contractual across the wire. The terminator is appended
/// exactly once.
#[must_use]
pub fn encode(message: &Message) -> String {
    let mut line = String::new();

    line.push_str(message.direction().tag());
    line.push(' ');
    line.push_str(message.message_type());

    match message.payload() {
        Payload::Empty => {}
        Payload::Params { params, trailing } => {
            line.push(' ');
            let mut first = true;
            for (name, value) in params {
                if !first {
                    line.push(',');
                }
                first = false;
                line.push_str(name);
                line.push('=');
                line.push_str(value);
            }
            if let Some(trailing) = trailing {
                line.push(' ');
                line.push_str(trailing);
            }
        }
        Payload::Extra(extra) => {
            line.push(' ');
            line.push_str(extra);
        }
    }

    line.push_str(TERMINATOR);
    line
}

/// Decode a wire line into a message.
///
/// Accepts the line with or without its trailing terminator; the framing
/// reader strips it before handing lines over. The line is split on
/// single spaces into at most four fields: tag, type, parameter list or
/// extra token, and an optional trailing token after a parameter list.
///
/// # Errors
///
/// - [`ParseError::Truncated`] when the tag or type field is missing.
/// - [`ParseError::MalformedParameter`] when a comma-delimited segment
///   of the parameter field does not split into exactly one
///   `NAME=VALUE` pair.
///
/// Direction tags are matched permissively: anything other than the
/// unit-to-host literal decodes as host-to-unit. Type tokens are not
/// validated against a whitelist; unknown types parse fine and are
/// ignored downstream.
pub fn decode(line: &str) -> Result<Message, ParseError> {
    let line = line.strip_suffix(TERMINATOR).unwrap_or(line);

    let mut fields = line.splitn(4, ' ');
    let tag = fields.next().unwrap_or_default();
    let message_type = fields.next().unwrap_or_default();

    if tag.is_empty() || message_type.is_empty() {
        return Err(ParseError::Truncated {
            line: line.to_owned(),
        });
    }

    let direction = Direction::from_tag(tag);

    let payload = match fields.next() {
        None => Payload::Empty,
        Some("") => Payload::Empty,
        Some(field3) if field3.contains('=') => {
            let params = decode_params(field3)?;
            let trailing = fields.next().filter(|t| !t.is_empty()).map(str::to_owned);
            Payload::Params { params, trailing }
        }
        // A bare third field is the whole extra token; the fourth field
        // is only consulted after a parameter list.
        Some(field3) => Payload::Extra(field3.to_owned()),
    };

    Ok(Message::from_parts(
        direction,
        message_type.to_owned(),
        payload,
    ))
}

fn decode_params(field: &str) -> Result<BTreeMap<String, String>, ParseError> {
    let mut params = BTreeMap::new();

    for segment in field.split(',') {
        let pieces: Vec<&str> = segment.split('=').collect();
        if pieces.len() != 2 {
            return Err(ParseError::MalformedParameter {
                segment: segment.to_owned(),
            });
        }
        // Last write wins on duplicate names.
        params.insert(pieces[0].to_owned(), pieces[1].to_owned());
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageKind;

    fn params_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn test_decode_fid_reading() {
        let msg = decode("YTyt FIDR CALPPM=12.3,TEMP=20\r\n").unwrap();

        assert_eq!(msg.direction(), Direction::UnitToHost);
        assert_eq!(msg.message_type(), "FIDR");
        assert_eq!(msg.param("CALPPM"), Some("12.3"));
        assert_eq!(msg.param("TEMP"), Some("20"));
        assert_eq!(msg.params().unwrap().len(), 2);
        assert_eq!(msg.extra(), None);
    }

    #[test]
    fn test_decode_extra_only() {
        let msg = decode("YTyt SHUT flameout-detected\r\n").unwrap();

        assert_eq!(msg.message_type(), "SHUT");
        assert_eq!(msg.extra(), Some("flameout-detected"));
        assert_eq!(msg.params(), None);
    }

    #[test]
    fn test_decode_without_terminator() {
        let msg = decode("YTyt CHEK").unwrap();
        assert_eq!(msg.message_type(), "CHEK");
        assert_eq!(*msg.payload(), Payload::Empty);
    }

    #[test]
    fn test_decode_trailing_token_after_params() {
        let msg = decode("YTyt SERR CODE=7 sensor-fault\r\n").unwrap();

        assert_eq!(msg.param("CODE"), Some("7"));
        assert_eq!(msg.extra(), Some("sensor-fault"));
    }

    #[test]
    fn test_decode_tag_only_is_truncated() {
        let result = decode("ZUzu");
        assert!(matches!(result, Err(ParseError::Truncated { .. })));
    }

    #[test]
    fn test_decode_empty_line_is_truncated() {
        assert!(matches!(decode(""), Err(ParseError::Truncated { .. })));
        assert!(matches!(decode("\r\n"), Err(ParseError::Truncated { .. })));
    }

    #[test]
    fn test_decode_malformed_parameter() {
        let result = decode("YTyt CHEK A=B=C\r\n");
        assert!(matches!(
            result,
            Err(ParseError::MalformedParameter { segment }) if segment == "A=B=C"
        ));
    }

    #[test]
    fn test_decode_duplicate_parameter_last_wins() {
        let msg = decode("YTyt FIDR CALPPM=1,CALPPM=2\r\n").unwrap();
        assert_eq!(msg.param("CALPPM"), Some("2"));
        assert_eq!(msg.params().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_unknown_tag_defaults_to_host_to_unit() {
        let msg = decode("ABCD CHEK\r\n").unwrap();
        assert_eq!(msg.direction(), Direction::HostToUnit);

        let msg = decode("ytyt CHEK\r\n").unwrap();
        assert_eq!(msg.direction(), Direction::UnitToHost);
    }

    #[test]
    fn test_encode_command() {
        let msg = Message::command(MessageKind::Heartbeat);
        assert_eq!(encode(&msg), "ZUzu CHEK\r\n");
    }

    #[test]
    fn test_encode_params() {
        let msg = Message::command_with_params(
            MessageKind::PeriodicReport,
            params_of(&[("TYPE", "FIDR"), ("EN", "1")]),
        );
        // BTreeMap order: EN before TYPE.
        assert_eq!(encode(&msg), "ZUzu PRPT EN=1,TYPE=FIDR\r\n");
    }

    #[test]
    fn test_encode_extra() {
        let msg = Message::to_unit("SHUT", None, Some("now".to_owned())).unwrap();
        assert_eq!(encode(&msg), "ZUzu SHUT now\r\n");
    }

    #[test]
    fn test_roundtrip_params_only() {
        let original = Message::command_with_params(
            MessageKind::TelemetryRate,
            params_of(&[("MS", "1000")]),
        );
        let decoded = decode(&encode(&original)).unwrap();

        assert_eq!(decoded.message_type(), original.message_type());
        assert_eq!(decoded.params(), original.params());
        assert_eq!(decoded.extra(), None);
    }

    #[test]
    fn test_roundtrip_extra_only() {
        let original = Message::to_unit("SHUT", None, Some("halt".to_owned())).unwrap();
        let decoded = decode(&encode(&original)).unwrap();

        assert_eq!(decoded.message_type(), "SHUT");
        assert_eq!(decoded.extra(), Some("halt"));
    }

    #[test]
    fn test_terminator_appended_exactly_once() {
        let msg = Message::command(MessageKind::Heartbeat);
        let twice = format!("{}{}", encode(&msg), encode(&msg));

        let lines: Vec<&str> = twice.split_terminator(TERMINATOR).collect();
        assert_eq!(lines, vec!["ZUzu CHEK", "ZUzu CHEK"]);
        for line in lines {
            assert_eq!(decode(line).unwrap().message_type(), "CHEK");
        }
    }

    // Property-based tests
    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        // Uppercase type tokens like the firmware uses.
        fn type_strategy() -> impl Strategy<Value = String> {
            "[A-Z]{2,6}"
        }

        // Names and values must avoid the structural characters
        // (space, comma, '=') to stay in the well-formed grammar.
        fn param_token_strategy() -> impl Strategy<Value = String> {
            "[A-Za-z0-9._-]{1,12}"
        }

        fn params_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
            prop::collection::btree_map(param_token_strategy(), param_token_strategy(), 1..6)
        }

        proptest! {
            /// Property: params-only messages roundtrip as a set of pairs.
            #[test]
            fn prop_roundtrip_params(ty in type_strategy(), params in params_strategy()) {
                let original = Message::to_unit(ty, Some(params), None).unwrap();
                let decoded = decode(&encode(&original)).unwrap();

                prop_assert_eq!(decoded.message_type(), original.message_type());
                prop_assert_eq!(decoded.params(), original.params());
                prop_assert_eq!(decoded.extra(), None);
            }

            /// Property: extra-only messages roundtrip verbatim.
            #[test]
            fn prop_roundtrip_extra(ty in type_strategy(), extra in param_token_strategy()) {
                let original = Message::to_unit(ty, None, Some(extra.clone())).unwrap();
                let decoded = decode(&encode(&original)).unwrap();

                prop_assert_eq!(decoded.message_type(), original.message_type());
                prop_assert_eq!(decoded.extra(), Some(extra.as_str()));
            }

            /// Property: a well-formed N-parameter field yields exactly N pairs.
            #[test]
            fn prop_param_count_preserved(params in params_strategy()) {
                let field = params
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let line = format!("YTyt FIDR {field}");

                let decoded = decode(&line).unwrap();
                prop_assert_eq!(decoded.params().unwrap().len(), params.len());
            }

            /// Property: encoding always ends in exactly one terminator.
            #[test]
            fn prop_single_terminator(ty in type_strategy(), extra in param_token_strategy()) {
                let encoded = encode(&Message::to_unit(ty, None, Some(extra)).unwrap());
                prop_assert!(encoded.ends_with(TERMINATOR));
                prop_assert_eq!(encoded.matches(TERMINATOR).count(), 1);
            }

            /// Property: arbitrary garbage never panics the decoder.
            #[test]
            fn prop_decode_never_panics(line in "\\PC{0,64}") {
                let _ = decode(&line);
            }
        }
    }
}
