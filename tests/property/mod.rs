//! Property-based tests for merge and pricing invariants

mod merge_properties;
mod pricing_properties;
