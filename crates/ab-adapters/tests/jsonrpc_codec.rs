use ab_adapters::jsonrpc::{decode_response, encode_notification, encode_request, IdGenerator};
use ab_domain::error::Error;

#[test]
fn encode_request_appends_trailing_newline() {
    let line = encode_request(1, "turn/interrupt", None);
    assert!(line.ends_with('\n'));
    assert!(line.contains("\"id\":1"));
}

#[test]
fn encode_notification_has_no_id() {
    let line = encode_notification("session/cancel", None);
    assert!(!line.contains("\"id\""));
}

#[test]
fn id_generator_is_monotonic() {
    let ids = IdGenerator::new();
    let a = ids.next();
    let b = ids.next();
    let c = ids.next();
    assert!(a < b);
    assert!(b < c);
}

#[test]
fn decode_response_rejects_wrong_jsonrpc_version() {
    let line = r#"{"jsonrpc":"1.0","id":1,"result":{}}"#;
    let err = decode_response(line).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[test]
fn decode_response_accepts_valid_frame() {
    let line = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
    let resp = decode_response(line).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.error.is_none());
}
