//! Unit tests for configuration loading and precedence.
//!
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, author, notifier and state path resolution
//! - `loading`: End-to-end loading from environment and CLI arguments
//! - `validation`: Range and consistency checks

mod helpers;
