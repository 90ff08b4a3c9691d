//! Integration tests - full translation from query model to SQL command
//!
//! These tests run the preparer and the SQL generator together against a small
//! cooking-domain catalog and compare the exact generated text and parameters.

mod common;
mod query_model_json_tests;
mod set_operation_tests;
mod sub_query_tests;
mod where_condition_tests;
