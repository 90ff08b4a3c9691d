use std::env;
use std::io::Write;

use relq::config::{CliConfig, ConfigError, TranslatorConfig};
use relq::resolution::SingleRowCapPolicy;
use serial_test::serial;

const VARS: [&str; 4] = [
    "RELQ_UNIFORM_SINGLE_ROW_CAP",
    "RELQ_PARAMETER_PREFIX",
    "RELQ_TABLE_ALIAS_PREFIX",
    "RELQ_SUB_STATEMENT_ALIAS_PREFIX",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = TranslatorConfig::from_env().unwrap();
    assert_eq!(config, TranslatorConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    env::set_var("RELQ_UNIFORM_SINGLE_ROW_CAP", "false");
    env::set_var("RELQ_PARAMETER_PREFIX", "$");
    env::set_var("RELQ_TABLE_ALIAS_PREFIX", "tab");
    env::set_var("RELQ_SUB_STATEMENT_ALIAS_PREFIX", "sub");

    let config = TranslatorConfig::from_env().unwrap();
    clear_env();

    assert!(!config.uniform_single_row_cap);
    assert_eq!(config.parameter_prefix, "$");
    assert_eq!(config.table_alias_prefix, "tab");
    assert_eq!(config.sub_statement_alias_prefix, "sub");
    assert_eq!(
        config.single_row_cap_policy(),
        SingleRowCapPolicy::PreserveSentinel
    );
}

#[test]
#[serial]
fn test_from_env_rejects_unparsable_flag() {
    clear_env();
    env::set_var("RELQ_UNIFORM_SINGLE_ROW_CAP", "sometimes");
    let result = TranslatorConfig::from_env();
    clear_env();

    match result {
        Err(ConfigError::Parse { field, value, .. }) => {
            assert_eq!(field, "RELQ_UNIFORM_SINGLE_ROW_CAP");
            assert_eq!(value, "sometimes");
        }
        other => panic!("Expected a parse error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_from_env_rejects_clashing_prefixes() {
    clear_env();
    env::set_var("RELQ_SUB_STATEMENT_ALIAS_PREFIX", "t");
    let result = TranslatorConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::AliasPrefixClash(table, sub)) if table == "t" && sub == "t"));
}

#[test]
#[serial]
fn test_from_env_rejects_prefix_extending_the_other() {
    clear_env();
    env::set_var("RELQ_SUB_STATEMENT_ALIAS_PREFIX", "t1");
    let result = TranslatorConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::AliasPrefixClash(table, sub)) if table == "t" && sub == "t1"));
}

#[test]
fn test_from_cli_rejects_invalid_alias_prefix() {
    let result = TranslatorConfig::from_cli(CliConfig {
        preserve_sentinel_limit: false,
        parameter_prefix: "@".to_string(),
        table_alias_prefix: "1t".to_string(),
        sub_statement_alias_prefix: "q".to_string(),
    });
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_from_yaml_file_fills_missing_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "parameter_prefix: \":\"\nuniform_single_row_cap: false").unwrap();

    let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.parameter_prefix, ":");
    assert!(!config.uniform_single_row_cap);
    assert_eq!(config.table_alias_prefix, "t");
    assert_eq!(config.sub_statement_alias_prefix, "q");
}

#[test]
fn test_from_yaml_file_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "parameter_prefix: \"p\"").unwrap();

    assert!(matches!(
        TranslatorConfig::from_yaml_file(file.path()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_from_missing_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = TranslatorConfig::from_yaml_file(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::Parse { field, .. }) if field == "yaml_file"));
}
