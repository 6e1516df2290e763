//! Integration tests for lookout CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior. None
//! of them reach a remote host: they stop at validation, preconditions,
//! dry runs, or the local resource store.

mod resource_command;
