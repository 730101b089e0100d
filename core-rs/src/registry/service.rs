/**
 * service.rs
 * A single registered service: symbolic name, port and addresses
 *
 * Records are shared between the name index and the port index of the
 * registry and are never mutated once stored. Replacing a port's occupant
 * means forgetting the port and registering again.
 */

use std::fmt;

/// One registered service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRecord {
    pub name: String,
    pub port: u16,
    pub addresses: Vec<String>,
}

impl ServiceRecord {
    /// Create a record, keeping the address order as given
    pub fn new<N, I, A>(name: N, port: u16, addresses: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        ServiceRecord {
            name: name.into(),
            port,
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma-joined address list, empty when there are no addresses
    pub fn joined_addresses(&self) -> String {
        self.addresses.join(",")
    }
}

/// Renders the persisted form without the line terminator:
/// `name\tport\taddr1,addr2`
impl fmt::Display for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.name, self.port, self.joined_addresses())
    }
}
