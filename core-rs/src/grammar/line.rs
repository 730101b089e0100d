/**
 * line.rs
 * Tokenizer for one line of the registry state file
 *
 * Shape of a line:
 *   [ws] NAME ws PORT [ws ADDR[,ADDR...]] [ws] [# comment]
 *
 * - NAME: ASCII letters, digits, '_', '.', '-'
 * - PORT: decimal digits that fit into u16 (leading zeros allowed)
 * - ADDR: NAME characters plus ':'; empty entries are dropped
 *
 * Dump writes the canonical form `name\tport\taddr1,addr2\n`.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{PaldError, Result};
use crate::registry::ServiceRecord;

/// Outcome of tokenizing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A complete service definition
    Service(ServiceRecord),
    /// Nothing but whitespace and possibly a `#` comment
    BlankOrComment,
    /// Anything else, with a human readable reason
    Malformed(String),
}

const WS: &str = r"[ \t\n\r\f]";

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("name pattern compiles"));

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("address pattern compiles"));

static ADDRESS_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:,-]+$").expect("address list pattern compiles"));

static PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("port pattern compiles"));

// No control characters, no '#', no leading or trailing whitespace
static RECORDABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s#\p{Cc}](?:[^#\p{Cc}]*[^\s#\p{Cc}])?$").expect("recordable name pattern compiles")
});

static BLANK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{WS}*$")).expect("blank pattern compiles"));

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{WS}*(?P<name>[A-Za-z0-9_.-]+){WS}+(?P<port>[0-9]+)(?:{WS}+(?P<addrs>[A-Za-z0-9_.:,-]+))?{WS}*$"
    ))
    .expect("line pattern compiles")
});

/// Check that a name survives a dump/load cycle unchanged
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Check that an address survives a dump/load cycle unchanged
pub fn is_valid_address(addr: &str) -> bool {
    ADDRESS_RE.is_match(addr)
}

/// Check that a name can be written without breaking the line and field
/// structure of a dump: non-empty, no control characters (tabs and line
/// breaks included), no `#`, no surrounding whitespace.
///
/// Wider than [`is_valid_name`]: `"svc 0"` is recordable, but reads back
/// as name `svc`.
pub fn is_recordable_name(name: &str) -> bool {
    RECORDABLE_NAME_RE.is_match(name)
}

/// Split a comma separated address list, dropping empty entries
pub fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Name the first field that keeps `body` from matching the line pattern
fn diagnose(body: &str) -> String {
    let mut fields = body.split(is_space).filter(|f| !f.is_empty());

    let name = match fields.next() {
        Some(name) => name,
        None => return "missing service name".to_string(),
    };
    if !NAME_RE.is_match(name) {
        return format!("invalid service name {:?}", name);
    }

    match fields.next() {
        None => return "missing port".to_string(),
        Some(port) if !PORT_RE.is_match(port) => return format!("invalid port {:?}", port),
        Some(_) => {}
    }

    if let Some(list) = fields.next() {
        if !ADDRESS_LIST_RE.is_match(list) {
            return format!("invalid address list {:?}", list);
        }
    }

    match fields.next() {
        Some(extra) => format!("unexpected {:?} after the address list", extra),
        None => "unrecognized service line".to_string(),
    }
}

/// Tokenize one line (without its terminator)
pub fn tokenize(line: &str) -> ParsedLine {
    let body = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };

    if BLANK_RE.is_match(body) {
        return ParsedLine::BlankOrComment;
    }

    let caps = match LINE_RE.captures(body) {
        Some(caps) => caps,
        None => return ParsedLine::Malformed(diagnose(body)),
    };

    let name = &caps["name"];
    let digits = &caps["port"];
    let port = match digits.parse::<u16>() {
        Ok(port) => port,
        Err(_) => {
            return ParsedLine::Malformed(format!(
                "port {} does not fit into a 16-bit unsigned integer",
                digits
            ))
        }
    };
    let addresses = caps
        .name("addrs")
        .map(|m| split_addresses(m.as_str()))
        .unwrap_or_default();

    ParsedLine::Service(ServiceRecord::new(name, port, addresses))
}

/// Parse a line that must hold a service definition.
///
/// Blank and comment-only lines are rejected here because their port field
/// is empty; `Registry::load` tokenizes lines itself and skips them instead.
pub fn parse_service(line: &str) -> Result<ServiceRecord> {
    match tokenize(line) {
        ParsedLine::Service(svc) => Ok(svc),
        ParsedLine::BlankOrComment => Err(PaldError::MalformedLine {
            line: 1,
            content: line.to_string(),
            reason: "missing service name and port".to_string(),
        }),
        ParsedLine::Malformed(reason) => Err(PaldError::MalformedLine {
            line: 1,
            content: line.to_string(),
            reason,
        }),
    }
}

/// Canonical persisted form of a record, including the newline
pub fn format_line(svc: &ServiceRecord) -> String {
    format!("{}\n", svc)
}
