//! Test suites for the Prepper server.

mod support;
