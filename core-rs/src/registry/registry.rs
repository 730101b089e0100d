/**
 * registry.rs
 * In-memory port registry with dynamic and fixed allocation
 *
 * Every record lives in two indexes at once:
 * - by_name: symbolic name -> record
 * - by_port: port number   -> record (ordered, so dumps come out sorted)
 *
 * Allocation strategy:
 * - Dynamic ports come from [pool_min, pool_max]
 * - The scan starts at next_hint and never wraps around
 * - next_hint starts at pool_min, is never advanced by allocation and is
 *   lowered by forget() to the released port, so freed ports are reused first
 * - Fixed ports may be anywhere in the 16-bit space
 *
 * Locking: one reader/writer lock. lookup/dump read, everything else writes.
 */

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::sync::Arc;

use crate::errors::{PaldError, Result};
use crate::grammar::{self, ParsedLine};
use crate::registry::ServiceRecord;

#[derive(Clone, Default)]
struct Indexes {
    by_name: HashMap<String, Arc<ServiceRecord>>,
    by_port: BTreeMap<u16, Arc<ServiceRecord>>,
}

impl Indexes {
    fn with_capacity(capacity: usize) -> Self {
        Indexes {
            by_name: HashMap::with_capacity(capacity),
            by_port: BTreeMap::new(),
        }
    }

    /// Insert a record, first evicting whatever holds its name or its port
    fn insert_replacing(&mut self, svc: ServiceRecord) {
        if let Some(old) = self.by_name.remove(&svc.name) {
            self.by_port.remove(&old.port);
        }
        if let Some(old) = self.by_port.remove(&svc.port) {
            self.by_name.remove(&old.name);
        }
        self.insert(svc);
    }

    fn insert(&mut self, svc: ServiceRecord) {
        let svc = Arc::new(svc);
        self.by_name.insert(svc.name.clone(), Arc::clone(&svc));
        self.by_port.insert(svc.port, svc);
    }
}

/// Reject records whose dump would not load back
fn check_record(name: &str, addresses: &[&str]) -> Result<()> {
    if !grammar::is_recordable_name(name) {
        return Err(PaldError::InvalidName(name.to_string()));
    }
    if let Some(bad) = addresses.iter().find(|a| !grammar::is_valid_address(a)) {
        return Err(PaldError::InvalidAddress(bad.to_string()));
    }
    Ok(())
}

struct State {
    index: Indexes,
    next_hint: u16,
}

/// Port registry - the single source of truth for name/port assignments
pub struct Registry {
    pool_min: u16,
    pool_max: u16,
    state: RwLock<State>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("pool_min", &self.pool_min)
            .field("pool_max", &self.pool_max)
            .field("next_hint", &state.next_hint)
            .field("services", &state.index.by_port.values().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry allocating dynamic ports from `[min, max]`
    ///
    /// # Errors
    /// `InvalidRange` if `min > max`
    pub fn new(min: u16, max: u16) -> Result<Self> {
        if min > max {
            return Err(PaldError::InvalidRange { min, max });
        }

        Ok(Registry {
            pool_min: min,
            pool_max: max,
            state: RwLock::new(State {
                index: Indexes::with_capacity(100),
                next_hint: min,
            }),
        })
    }

    /// Dynamic pool bounds, inclusive
    pub fn bounds(&self) -> (u16, u16) {
        (self.pool_min, self.pool_max)
    }

    /// Where the next dynamic allocation starts scanning
    pub fn next_hint(&self) -> u16 {
        self.state.read().next_hint
    }

    pub fn len(&self) -> usize {
        self.state.read().index.by_port.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_port(&self, port: u16) -> bool {
        self.state.read().index.by_port.contains_key(&port)
    }

    /// Snapshot of all records in ascending port order
    pub fn records(&self) -> Vec<ServiceRecord> {
        self.state
            .read()
            .index
            .by_port
            .values()
            .map(|svc| ServiceRecord::clone(svc))
            .collect()
    }

    /// Look up a service by its symbolic name
    ///
    /// # Returns
    /// The port and the addresses registered with it
    pub fn lookup(&self, name: &str) -> Result<(u16, Vec<String>)> {
        let state = self.state.read();
        state
            .index
            .by_name
            .get(name)
            .map(|svc| (svc.port, svc.addresses.clone()))
            .ok_or_else(|| PaldError::NotFound(name.to_string()))
    }

    /// Register a service on the lowest free port at or above the cursor
    ///
    /// # Errors
    /// - `InvalidName` / `InvalidAddress` if the record could not be stored
    /// - `NameTaken` if the name is already registered
    /// - `NoPortsAvailable` if `[next_hint, pool_max]` is fully occupied
    pub fn alloc(&self, name: &str, addresses: &[&str]) -> Result<u16> {
        check_record(name, addresses)?;
        let mut state = self.state.write();

        if state.index.by_name.contains_key(name) {
            return Err(PaldError::NameTaken(name.to_string()));
        }

        let from = state.next_hint;
        let port = (from..=self.pool_max)
            .find(|p| !state.index.by_port.contains_key(p))
            .ok_or(PaldError::NoPortsAvailable {
                from,
                to: self.pool_max,
            })?;

        state
            .index
            .insert(ServiceRecord::new(name, port, addresses.iter().copied()));
        tracing::debug!(name, port, "allocated dynamic port");

        Ok(port)
    }

    /// Register a service on an explicit port, inside or outside the pool
    ///
    /// # Errors
    /// `InvalidName` / `InvalidAddress` as for [`Registry::alloc`];
    /// `NameTaken`, `PortTaken`, or `NameAndPortTaken` when both collide
    pub fn fix(&self, port: u16, name: &str, addresses: &[&str]) -> Result<()> {
        check_record(name, addresses)?;
        let mut state = self.state.write();

        let name_taken = state.index.by_name.contains_key(name);
        let port_taken = state.index.by_port.contains_key(&port);

        match (name_taken, port_taken) {
            (true, true) => Err(PaldError::NameAndPortTaken {
                name: name.to_string(),
                port,
            }),
            (true, false) => Err(PaldError::NameTaken(name.to_string())),
            (false, true) => Err(PaldError::PortTaken(port)),
            (false, false) => {
                state
                    .index
                    .insert(ServiceRecord::new(name, port, addresses.iter().copied()));
                tracing::debug!(name, port, "fixed port");
                Ok(())
            }
        }
    }

    /// Release a port. Releasing a free port is not an error.
    pub fn forget(&self, port: u16) {
        let mut state = self.state.write();

        if let Some(svc) = state.index.by_port.remove(&port) {
            state.index.by_name.remove(&svc.name);
            tracing::debug!(name = %svc.name, port, "released port");
        }

        if port < state.next_hint {
            state.next_hint = port;
        }
    }

    /// Write every record, one line each, in ascending port order
    ///
    /// The read lock is held until the writer is flushed, so the output is
    /// always a consistent snapshot.
    ///
    /// # Returns
    /// Number of bytes written
    pub fn dump<W: Write>(&self, w: W) -> Result<usize> {
        let state = self.state.read();
        let mut buf = BufWriter::new(w);
        let mut wrote = 0;

        for svc in state.index.by_port.values() {
            let line = grammar::format_line(svc);
            buf.write_all(line.as_bytes())?;
            wrote += line.len();
        }

        buf.flush()?;
        Ok(wrote)
    }

    /// Read records from `r` and merge them into the registry
    ///
    /// Blank and comment-only lines are skipped. A loaded record replaces any
    /// existing record holding the same name or the same port. The merge is
    /// staged and only becomes visible when every line parsed, so a failure
    /// leaves the registry untouched.
    ///
    /// # Errors
    /// - `MalformedLine` for the first line that is not a service definition
    /// - `Io` if reading fails (including invalid UTF-8)
    pub fn load<R: Read>(&self, r: R) -> Result<()> {
        let mut state = self.state.write();
        let mut staged = state.index.clone();
        let mut loaded = 0usize;

        for (idx, line) in BufReader::new(r).lines().enumerate() {
            let line = line?;
            match grammar::tokenize(&line) {
                ParsedLine::Service(svc) => {
                    staged.insert_replacing(svc);
                    loaded += 1;
                }
                ParsedLine::BlankOrComment => continue,
                ParsedLine::Malformed(reason) => {
                    return Err(PaldError::MalformedLine {
                        line: idx + 1,
                        content: line,
                        reason,
                    });
                }
            }
        }

        state.index = staged;
        tracing::debug!(loaded, total = state.index.by_port.len(), "loaded registry");
        Ok(())
    }

    /// Compare bounds, cursor and the full set of records
    ///
    /// `other` is read after a snapshot of `self` is taken, not atomically
    /// with it.
    pub fn equal(&self, other: &Registry) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }

        if self.pool_min != other.pool_min || self.pool_max != other.pool_max {
            return false;
        }

        // Never hold both locks: a queued writer on either side would block
        // the second read and two crossed calls could wait on each other.
        let (next_hint, by_port) = {
            let mine = self.state.read();
            (mine.next_hint, mine.index.by_port.clone())
        };
        let theirs = other.state.read();

        // by_name mirrors by_port, so comparing one index is enough
        next_hint == theirs.next_hint && by_port == theirs.index.by_port
    }
}
