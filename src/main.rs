use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relq::{config, MappingCatalog, QueryModel, QueryTranslator};

/// relq - translate a JSON query model into parameterized SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML mapping catalog (entity types to tables and columns)
    #[arg(long)]
    catalog: PathBuf,

    /// JSON query model file, or `-` to read standard input
    #[arg(long, default_value = "-")]
    query: String,

    /// YAML translator configuration; environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep non-sentinel row limits when a single-value sub-query becomes a table
    #[arg(long)]
    preserve_sentinel_limit: bool,

    /// Parameter placeholder prefix
    #[arg(long)]
    parameter_prefix: Option<String>,

    /// Physical table alias prefix
    #[arg(long)]
    table_alias_prefix: Option<String>,

    /// Sub-statement table alias prefix
    #[arg(long)]
    sub_statement_alias_prefix: Option<String>,

    /// Print the resolved statement tree as JSON before the SQL
    #[arg(long)]
    dump_statement: bool,
}

impl Cli {
    /// Layers command-line overrides on top of a base configuration.
    fn cli_config(&self, base: &config::TranslatorConfig) -> config::CliConfig {
        config::CliConfig {
            preserve_sentinel_limit: self.preserve_sentinel_limit || !base.uniform_single_row_cap,
            parameter_prefix: self
                .parameter_prefix
                .clone()
                .unwrap_or_else(|| base.parameter_prefix.clone()),
            table_alias_prefix: self
                .table_alias_prefix
                .clone()
                .unwrap_or_else(|| base.table_alias_prefix.clone()),
            sub_statement_alias_prefix: self
                .sub_statement_alias_prefix
                .clone()
                .unwrap_or_else(|| base.sub_statement_alias_prefix.clone()),
        }
    }
}

fn read_query(source: &str) -> Result<QueryModel> {
    let json = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read query model from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read query model from {}", source))?
    };
    serde_json::from_str(&json).context("Query model is not valid JSON")
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => config::TranslatorConfig::from_yaml_file(path)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?,
        None => config::TranslatorConfig::from_env().context("Invalid environment configuration")?,
    };
    let config = config::TranslatorConfig::from_cli(cli.cli_config(&base))
        .context("Invalid command-line configuration")?;

    let catalog = MappingCatalog::from_yaml_file(&cli.catalog)
        .with_context(|| format!("Failed to load catalog {}", cli.catalog.display()))?;
    relq::debug_println!("Loaded {} entity types", catalog.len());

    let query = read_query(&cli.query)?;
    let translator = QueryTranslator::new(catalog).with_config(config);

    if cli.dump_statement {
        let statement = translator.prepare(&query)?;
        println!("{}", serde_json::to_string_pretty(statement.as_ref())?);
    }

    let command = translator.translate(&query).map_err(|e| {
        log::warn!("Translation failed ({}): {}", e.category(), e);
        e
    })?;

    println!("{}", command.text);
    println!("{}", serde_json::to_string_pretty(&command.parameters)?);
    Ok(())
}
