//! Span context paths

use lumen_ottl::{Error, Value};
use opentelemetry_proto::tonic::trace::v1::{span, status, Span};

mod test_support;
use test_support::*;

fn run(statements: &[&str]) -> Span {
    let mut record = span();
    let mut ancestry = Ancestry::default();
    run_span(statements, &mut record, &mut ancestry)
        .unwrap_or_else(|e| panic!("statements failed: {}", e));
    record
}

#[test]
fn test_name_kind_and_times() {
    let record = run(&[
        r#"set(name, "GET /api/users/{id}") where kind == SPAN_KIND_SERVER"#,
        "set(kind, SPAN_KIND_CLIENT)",
        "set(end_time_unix_nano, 5000)",
        r#"set(attributes["duration"], end_time_unix_nano)"#,
    ]);

    assert_eq!(record.name, "GET /api/users/{id}");
    assert_eq!(record.kind, span::SpanKind::Client as i32);
    assert_eq!(record.end_time_unix_nano, 5000);
    assert_eq!(attribute(&record.attributes, "duration"), Value::Int(5000));
}

#[test]
fn test_status_members() {
    let record = run(&[
        "set(status.code, STATUS_CODE_ERROR) where status.code == STATUS_CODE_OK",
        r#"set(status.message, "upstream timeout")"#,
        r#"set(attributes["status"], status)"#,
    ]);

    let status = record.status.as_ref().unwrap();
    assert_eq!(status.code, status::StatusCode::Error as i32);
    assert_eq!(status.message, "upstream timeout");

    let Value::Map(map) = attribute(&record.attributes, "status") else {
        panic!("expected status map");
    };
    assert_eq!(map.get("code"), Some(&Value::Int(2)));
}

#[test]
fn test_status_created_on_write() {
    let mut record = span();
    record.status = None;
    let mut ancestry = Ancestry::default();
    run_span(
        &[
            r#"set(attributes["before"], status.code)"#,
            "set(status.code, STATUS_CODE_OK)",
        ],
        &mut record,
        &mut ancestry,
    )
    .unwrap();
    assert_eq!(attribute(&record.attributes, "before"), Value::Nil);
    assert_eq!(record.status.map(|s| s.code), Some(1));
}

#[test]
fn test_trace_state_members() {
    let record = run(&[
        r#"set(attributes["vendor"], trace_state["vendor"])"#,
        r#"set(trace_state["other"], "2")"#,
        r#"set(trace_state["new"], "x")"#,
    ]);

    assert_eq!(attribute(&record.attributes, "vendor"), Value::string("abc"));
    assert_eq!(record.trace_state, "new=x,vendor=abc,other=2");
}

#[test]
fn test_trace_state_entry_write_preserves_formatting() {
    let mut record = span();
    record.trace_state = "rojo=00f067aa0ba902b7, congo=t61rcWkgMzE".to_string();
    let expected = record.clone();
    let mut ancestry = Ancestry::default();

    run_span(
        &[
            r#"set(trace_state["congo"], trace_state["congo"])"#,
            r#"set(trace_state["rojo"], trace_state["rojo"])"#,
        ],
        &mut record,
        &mut ancestry,
    )
    .unwrap();
    assert_eq!(record, expected);

    run_span(&[r#"set(trace_state["congo"], "v2")"#], &mut record, &mut ancestry).unwrap();
    assert_eq!(record.trace_state, "rojo=00f067aa0ba902b7, congo=v2");
}

#[test]
fn test_whole_trace_state() {
    let record = run(&[r#"set(trace_state, "a=1")"#]);
    assert_eq!(record.trace_state, "a=1");
}

#[test]
fn test_ids_and_parent() {
    let record = run(&[
        "set(parent_span_id, span_id)",
        r#"set(attributes["trace"], trace_id.string)"#,
        r#"set(span_id.string, "")"#,
    ]);
    assert_eq!(record.parent_span_id, span_id());
    assert!(record.span_id.is_empty());
    assert_eq!(
        attribute(&record.attributes, "trace"),
        Value::string("0102030405060708090a0b0c0d0e0f10")
    );
}

#[test]
fn test_wrong_width_hex_id_is_an_error() {
    let mut record = span();
    let mut ancestry = Ancestry::default();
    let err = run_span(
        &[r#"set(span_id.string, "0102")"#],
        &mut record,
        &mut ancestry,
    )
    .unwrap_err();
    assert!(err.to_string().contains("must be 8 bytes"));
}

#[test]
fn test_events_round_trip_and_edit() {
    let record = run(&[
        r#"set(cache["events"], events)"#,
        "set(events, [])",
        r#"set(attributes["events_empty"], events)"#,
        r#"set(events, cache["events"])"#,
    ]);

    assert_eq!(record.events, span().events);
    assert_eq!(
        attribute(&record.attributes, "events_empty"),
        Value::List(vec![])
    );
}

#[test]
fn test_malformed_event_list_is_ignored() {
    let record = run(&[r#"set(events, ["not an event"])"#]);
    assert_eq!(record.events, span().events);
}

#[test]
fn test_attribute_editors_on_span() {
    let mut record = span();
    record.attributes.push(str_kv("http.url", "https://example.com/a?token=secret"));
    record.attributes.push(str_kv("db.password", "hunter2"));
    record.attributes.push(str_kv("db.user", "app"));
    let mut ancestry = Ancestry::default();

    run_span(
        &[
            r#"delete_matching_keys(attributes, "password$")"#,
            r#"replace_pattern(attributes["http.url"], "token=[^&]+", "token=***")"#,
            r#"set(attributes["method_lower"], ConvertCase(attributes["http.method"], "lower"))"#,
        ],
        &mut record,
        &mut ancestry,
    )
    .unwrap();

    assert_eq!(attribute(&record.attributes, "db.password"), Value::Nil);
    assert_eq!(attribute(&record.attributes, "db.user"), Value::string("app"));
    assert_eq!(
        attribute(&record.attributes, "http.url"),
        Value::string("https://example.com/a?token=***")
    );
    assert_eq!(
        attribute(&record.attributes, "method_lower"),
        Value::string("get")
    );
}

#[test]
fn test_span_symbols() {
    let engine = span_engine();
    assert!(engine.parse_statement("set(kind, SPAN_KIND_CONSUMER)").is_ok());
    assert_eq!(
        engine
            .parse_statement("set(severity_number, SEVERITY_NUMBER_INFO)")
            .unwrap_err(),
        Error::InvalidPath {
            path: "severity_number".into(),
            segment: "severity_number".into(),
        }
    );
    assert_eq!(
        engine
            .parse_statement("set(kind, SEVERITY_NUMBER_INFO)")
            .unwrap_err(),
        Error::SymbolNotFound("SEVERITY_NUMBER_INFO".into())
    );
}

#[test]
fn test_unknown_span_paths() {
    for text in [
        "set(status.reason, 1)",
        r#"set(status["code"], 1)"#,
        "set(parent_id, 1)",
        "set(kind.name, 1)",
        r#"set(events["x"], 1)"#,
    ] {
        assert!(
            matches!(span_engine().parse_statement(text), Err(Error::InvalidPath { .. })),
            "{} should not resolve",
            text
        );
    }
}
