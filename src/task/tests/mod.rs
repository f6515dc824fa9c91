//! Unit tests for the task bounded context.

mod dispatch_tests;
