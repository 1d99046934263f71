//! Integration tests for Service Bay.
//!
//! The tests in `tests/` exercise the allocation core and the inventory
//! service's request handling through their public APIs, without a database.
//!
//! ```bash
//! cargo test -p service-bay-integration-tests
//! ```
