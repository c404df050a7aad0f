// Domain-driven module structure for the container log monitor.

// Core infrastructure
pub mod conf;
pub mod docker;
pub mod remote;
pub mod source;

// Domain modules
pub mod engine;
pub mod event;
pub mod notify;
pub mod runtime;
pub mod sched;
