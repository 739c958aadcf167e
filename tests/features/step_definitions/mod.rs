//! Step definitions for Cucumber scenarios
