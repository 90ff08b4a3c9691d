//! Unit tests - configuration and catalog loading from the environment and files

mod catalog_file_tests;
mod config_env_tests;
