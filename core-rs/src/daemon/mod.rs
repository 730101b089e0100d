// Daemon Module - Reusable daemon implementation
//
// The `pald` binary is a thin wrapper: it builds a DaemonConfig from the
// config file and command line, then hands it to PortDaemon. Integration
// tests drive the same type on an ephemeral port.

pub mod port_daemon;

pub use port_daemon::PortDaemon;
