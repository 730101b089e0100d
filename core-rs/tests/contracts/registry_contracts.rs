//! Registry Contract Tests
//!
//! These tests pin down INVARIANTS of the port registry that callers rely on.
//! Every test documents why the rule exists and what breaks without it.

use pald_core::{PaldError, Registry};
use std::collections::HashSet;

/// WHY: A name maps to exactly one port and a port to exactly one name
/// REASON: Services find each other by name; two owners of a port means two
///         processes fighting over one socket
/// BREAKS: Every client that trusts `get`
/// SACRIFICES: If this fails, the registry can hand out duplicates
#[test]
fn names_and_ports_stay_one_to_one() {
    let reg = Registry::new(100, 120).unwrap();

    for i in 0..15 {
        reg.alloc(&format!("svc_{}", i), &[]).unwrap();
    }
    reg.fix(5000, "pinned", &["10.0.0.1"]).unwrap();
    for port in [101, 103, 107, 5000] {
        reg.forget(port);
    }
    for i in 15..19 {
        reg.alloc(&format!("svc_{}", i), &[]).unwrap();
    }
    assert!(reg.fix(104, "svc_2", &[]).is_err());

    let records = reg.records();
    let names: HashSet<_> = records.iter().map(|r| r.name.clone()).collect();
    let ports: HashSet<_> = records.iter().map(|r| r.port).collect();
    assert_eq!(names.len(), records.len(), "duplicate name in {:?}", records);
    assert_eq!(ports.len(), records.len(), "duplicate port in {:?}", records);

    for record in &records {
        assert_eq!(reg.lookup(&record.name).unwrap().0, record.port);
    }
}

/// WHY: Dynamic allocation only hands out ports inside the pool
/// REASON: Operators size the pool to stay clear of well-known services
/// BREAKS: Hosts where ports outside the pool belong to something else
/// SACRIFICES: If this fails, pald may shadow an unrelated service
#[test]
fn dynamic_ports_stay_inside_pool() {
    let reg = Registry::new(49201, 49205).unwrap();
    reg.fix(49203, "pinned_inside", &[]).unwrap();
    reg.fix(80, "pinned_outside", &[]).unwrap();

    let mut allocated = Vec::new();
    loop {
        match reg.alloc(&format!("dyn_{}", allocated.len()), &[]) {
            Ok(port) => allocated.push(port),
            Err(PaldError::NoPortsAvailable { from, to }) => {
                assert_eq!((from, to), (49201, 49205));
                break;
            }
            Err(e) => panic!("unexpected error {}", e),
        }
    }

    assert_eq!(allocated, vec![49201, 49202, 49204, 49205]);
}

/// WHY: The lowest released port is handed out first
/// REASON: Restarted services tend to get their old port back, which keeps
///         firewall rules and bookmarks valid
/// BREAKS: Port stability across service restarts
/// SACRIFICES: If this fails, ports drift upward until the pool is exhausted
#[test]
fn released_ports_are_reused_lowest_first() {
    let reg = Registry::new(0, 3).unwrap();
    for name in ["a", "b", "c", "d"] {
        reg.alloc(name, &[]).unwrap();
    }
    assert!(matches!(reg.alloc("e", &[]), Err(PaldError::NoPortsAvailable { .. })));

    reg.forget(2);
    reg.forget(1);
    assert_eq!(reg.alloc("e", &[]).unwrap(), 1);
    assert_eq!(reg.alloc("f", &[]).unwrap(), 2);
}

/// WHY: Releasing a port is idempotent
/// REASON: Clients retry `del` after timeouts without knowing if it landed
/// BREAKS: Retry loops in deployment scripts
/// SACRIFICES: If this fails, a harmless retry turns into an error
#[test]
fn forget_is_idempotent() {
    let reg = Registry::new(10, 20).unwrap();
    reg.alloc("a", &[]).unwrap();

    reg.forget(10);
    reg.forget(10);
    reg.forget(65535);

    assert!(reg.is_empty());
    assert_eq!(reg.alloc("a", &[]).unwrap(), 10);
}

/// WHY: Conflicts name what collided
/// REASON: An operator has to know whether to pick another name or another port
/// BREAKS: Diagnosability of failed `set` requests
/// SACRIFICES: If this fails, all conflicts look the same
#[test]
fn conflicts_report_what_collided() {
    let reg = Registry::new(10, 20).unwrap();
    reg.fix(15, "a", &[]).unwrap();
    reg.fix(16, "b", &[]).unwrap();

    assert!(matches!(reg.fix(17, "a", &[]), Err(PaldError::NameTaken(n)) if n == "a"));
    assert!(matches!(reg.fix(15, "c", &[]), Err(PaldError::PortTaken(15))));
    assert!(matches!(
        reg.fix(16, "b", &[]),
        Err(PaldError::NameAndPortTaken { port: 16, .. })
    ));
    assert!(matches!(reg.alloc("a", &[]), Err(PaldError::NameTaken(_))));

    // None of the failures changed anything
    assert_eq!(reg.len(), 2);
}

/// WHY: A state file that fails to parse leaves the registry untouched
/// REASON: Half-loaded state would let the daemon hand out ports that the
///         unread part of the file still assigns
/// BREAKS: Recovery after a hand-edited or truncated state file
/// SACRIFICES: If this fails, one typo silently loses registrations
#[test]
fn failed_load_changes_nothing() {
    let reg = Registry::new(0, 10).unwrap();
    reg.alloc("existing", &[]).unwrap();
    let before = reg.records();

    let result = reg.load("new_one\t5\t\nbroken line here\n".as_bytes());

    match result {
        Err(PaldError::MalformedLine { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected MalformedLine, got {:?}", other),
    }
    assert_eq!(reg.records(), before);
    assert!(reg.lookup("new_one").is_err());
}
