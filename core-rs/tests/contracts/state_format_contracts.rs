//! State File Format Contract Tests
//!
//! The state file is read back on every restart and is meant to be readable
//! and editable by people. These tests fix its exact shape.

use pald_core::grammar::{self, ParsedLine};
use pald_core::{PaldError, Registry, ServiceRecord};

fn dump_to_string(reg: &Registry) -> String {
    let mut out = Vec::new();
    reg.dump(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// WHY: One record per line: name, TAB, port, TAB, comma separated addresses
/// REASON: Line oriented text survives grep, diff and hand edits
/// BREAKS: Every state file written by earlier versions
/// SACRIFICES: If this fails, existing installs lose their registrations
#[test]
fn dump_writes_tab_separated_lines() {
    let reg = Registry::new(0, 10).unwrap();

    reg.alloc("svc 0", &[]).unwrap();
    assert_eq!(dump_to_string(&reg), "svc 0\t0\t\n");

    reg.alloc("svc 1", &["127.0.0.1", "::1"]).unwrap();
    assert_eq!(dump_to_string(&reg), "svc 0\t0\t\nsvc 1\t1\t127.0.0.1,::1\n");
}

/// WHY: Records come out in ascending port order
/// REASON: Dumps of equal registries must be byte-identical
/// BREAKS: Change detection on the state file
/// SACRIFICES: If this fails, every write shuffles the file
#[test]
fn dump_is_sorted_by_port() {
    let reg = Registry::new(100, 110).unwrap();
    reg.fix(9000, "zeta", &[]).unwrap();
    reg.alloc("alpha", &[]).unwrap();
    reg.fix(50, "mid", &["h1"]).unwrap();

    assert_eq!(dump_to_string(&reg), "mid\t50\th1\nalpha\t100\t\nzeta\t9000\t\n");
}

/// WHY: Any run of whitespace separates fields on input
/// REASON: People align columns with spaces when editing by hand
/// BREAKS: Loading hand-edited state files
/// SACRIFICES: If this fails, a reformatted file no longer loads
#[test]
fn parser_accepts_space_runs() {
    let svc = grammar::parse_service("pald  1001  127.0.0.1,::1").unwrap();
    assert_eq!(svc, ServiceRecord::new("pald", 1001, ["127.0.0.1", "::1"]));

    assert!(matches!(
        grammar::parse_service("pald"),
        Err(PaldError::MalformedLine { .. })
    ));
}

/// WHY: Blank lines and `#` comments are ignored on load
/// REASON: Operators annotate state files
/// BREAKS: Annotated state files
/// SACRIFICES: If this fails, a comment stops the daemon from starting
#[test]
fn load_skips_blank_and_comment_lines() {
    let text = "# pinned by ops\n\nweb\t8080\t0.0.0.0\n   \napi 8081 # trailing comment\n";
    assert_eq!(grammar::tokenize("# pinned by ops"), ParsedLine::BlankOrComment);

    let reg = Registry::new(49201, 49299).unwrap();
    reg.load(text.as_bytes()).unwrap();

    assert_eq!(reg.len(), 2);
    assert_eq!(reg.lookup("web").unwrap(), (8080, vec!["0.0.0.0".to_string()]));
    assert_eq!(reg.lookup("api").unwrap(), (8081, Vec::new()));
}

/// WHY: What was dumped loads back into an equal registry
/// REASON: The file is the only memory the daemon has across restarts
/// BREAKS: Every restart
/// SACRIFICES: If this fails, restarts reshuffle ports
#[test]
fn dump_then_load_restores_registry() {
    let original = Registry::new(0, 10).unwrap();
    original.alloc("svc_0", &[]).unwrap();
    original.alloc("svc_1", &["127.0.0.1", "::1"]).unwrap();
    original.fix(443, "tls", &["10.0.0.7"]).unwrap();

    let text = dump_to_string(&original);

    let restored = Registry::new(0, 10).unwrap();
    restored.load(text.as_bytes()).unwrap();
    assert!(original.equal(&restored));
    assert_eq!(dump_to_string(&restored), text);
}
