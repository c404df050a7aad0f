//! Runtime module: process lifecycle, boot, and the monitoring loop.

pub mod boot;
pub mod run;

pub use boot::App;
