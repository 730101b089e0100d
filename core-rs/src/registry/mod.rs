/**
 * registry module
 * Name <-> port assignments with dynamic pool allocation
 */

#[allow(clippy::module_inception)]
mod registry;
mod service;

pub use registry::Registry;
pub use service::ServiceRecord;
