//! Line formatter tests

use chrono::{TimeDelta, TimeZone};

use super::*;

fn at() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 10, 14, 3, 7).unwrap() + TimeDelta::milliseconds(123)
}

fn formatter(level: Option<StreamLevel>, benchmark: bool) -> LineFormatter {
    LineFormatter::new(level.as_ref(), "web-1", 4711, benchmark)
}

// ============================================================================
// File lines
// ============================================================================

#[test]
fn test_file_line_with_named_level() {
    let line = formatter(Some("info".into()), false).file_line(&at(), r#"{"a":1}"#);
    assert_eq!(
        line,
        "{\"level\":\"info\",\"logTime\":\"2024-03-10T14:03:07.123\",\"hostname\":\"web-1\",\"pid\":4711,\"message\":{\"a\":1}}\n"
    );
}

#[test]
fn test_file_line_with_numeric_level() {
    let line = formatter(Some(3u64.into()), false).file_line(&at(), "\"x\"");
    assert!(line.starts_with("{\"level\":3,\"logTime\":"));
}

#[test]
fn test_file_line_with_fractional_level() {
    let line = formatter(Some(2.5f64.into()), false).file_line(&at(), "\"x\"");
    assert!(line.starts_with("{\"level\":2.5,\"logTime\":"));
}

#[test]
fn test_zero_level_is_written() {
    let line = formatter(Some(0u64.into()), false).file_line(&at(), "1");
    assert!(line.starts_with("{\"level\":0,"));
}

#[test]
fn test_file_line_without_level() {
    let line = formatter(None, false).file_line(&at(), "\"hi\"");
    assert!(line.starts_with("{\"logTime\":\"2024-03-10T14:03:07.123\","));
    assert!(line.ends_with(",\"message\":\"hi\"}\n"));
}

#[test]
fn test_benchmark_omits_metadata() {
    let line = formatter(Some("debug".into()), true).file_line(&at(), "\"hi\"");
    assert_eq!(line, "{\"level\":\"debug\",\"message\":\"hi\"}\n");
}

#[test]
fn test_hostname_and_level_are_escaped() {
    let f = LineFormatter::new(Some(&StreamLevel::from("a\"b")), "host\"x", 1, false);
    let line = f.file_line(&at(), "null");
    assert!(line.contains(r#""level":"a\"b","#));
    assert!(line.contains(r#""hostname":"host\"x","#));
}

#[test]
fn test_line_is_valid_json() {
    let line = formatter(Some("info".into()), false).file_line(&at(), r#"{"k":[1,2]}"#);
    let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(value["level"], "info");
    assert_eq!(value["pid"], 4711);
    assert_eq!(value["message"]["k"][1], 2);
}

// ============================================================================
// Raw terminal lines
// ============================================================================

#[test]
fn test_raw_line_uses_epoch_millis() {
    let now = at();
    let line = formatter(None, false).raw_line(&now, "\"x\"");
    let expected = format!("\"logTime\":\"{}\",", now.timestamp_millis());
    assert!(line.contains(&expected), "{line}");
    assert!(!line.contains('\x1b'));
}

#[test]
fn test_raw_benchmark_line() {
    let line = formatter(None, true).raw_line(&at(), "\"x\"");
    assert_eq!(line, "{\"message\":\"x\"}\n");
}

// ============================================================================
// Terminal lines
// ============================================================================

#[test]
fn test_plain_terminal_line_matches_file_line() {
    let f = formatter(Some("info".into()), false);
    let now = at();
    assert_eq!(
        f.terminal_line(&now, "1", &TerminalStyle::plain()),
        f.file_line(&now, "1")
    );
}

#[test]
fn test_colored_terminal_line() {
    let f = formatter(None, true);
    let style = TerminalStyle::new(Some(TerminalColor::Red), Some(TerminalColor::BrightBlue));
    assert!(!style.is_plain());

    let line = f.terminal_line(&at(), "\"x\"", &style);
    assert!(line.starts_with('\x1b'), "{line:?}");
    assert!(line.contains("{\"message\":\"x\"}"));
    assert!(line.ends_with("\x1b[0m\n"), "{line:?}");
}

#[test]
fn test_text_color_only() {
    let style = TerminalStyle::new(Some(TerminalColor::Green), None);
    let line = formatter(None, true).terminal_line(&at(), "1", &style);
    assert!(line.contains("\x1b[32m"), "{line:?}");
}

#[test]
fn test_current_hostname_not_empty() {
    assert!(!current_hostname().is_empty());
}
