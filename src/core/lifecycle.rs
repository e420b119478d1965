//! Start/stop capability shared by appenders, layouts and writers

use super::error::Result;

/// Components that must be configured and started before use
///
/// `start` either leaves the component fully usable or returns the reason it
/// could not start; a component that failed to start stays stopped and is
/// skipped by the dispatch path.
pub trait LifeCycle {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_started(&self) -> bool;
}
