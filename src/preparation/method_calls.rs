/// Method-call transformers
///
/// Maps method names from the query language to SQL expressions. A call with
/// no registered transformer can only be evaluated in memory.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::statement_model::{BinaryOperator, ExprRef, SqlExpr, SqlLiteral};

/// A method call whose receiver and arguments are already resolved.
#[derive(Debug, Clone)]
pub struct MethodCallParts {
    pub method: String,
    pub object: Option<ExprRef>,
    pub args: Vec<ExprRef>,
    pub result_type: String,
}

pub trait MethodCallTransformer: Send + Sync {
    fn transform(&self, call: MethodCallParts) -> Result<ExprRef, TranslationError>;
}

impl<F> MethodCallTransformer for F
where
    F: Fn(MethodCallParts) -> Result<ExprRef, TranslationError> + Send + Sync,
{
    fn transform(&self, call: MethodCallParts) -> Result<ExprRef, TranslationError> {
        self(call)
    }
}

#[derive(Clone, Default)]
pub struct MethodCallTransformerRegistry {
    transformers: HashMap<String, Arc<dyn MethodCallTransformer>>,
}

impl fmt::Debug for MethodCallTransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("MethodCallTransformerRegistry")
            .field("methods", &names)
            .finish()
    }
}

impl MethodCallTransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the string transformers.
    pub fn create_default() -> Self {
        let mut registry = Self::new();
        for (name, transformer) in DEFAULT_TRANSFORMERS.iter() {
            registry.register(*name, transformer.clone());
        }
        registry
    }

    /// Registers `transformer` for `method`, replacing any earlier registration.
    pub fn register(&mut self, method: impl Into<String>, transformer: Arc<dyn MethodCallTransformer>) {
        let method = method.into();
        if self.transformers.contains_key(&method) {
            log::debug!("Replacing method call transformer for '{}'", method);
        }
        self.transformers.insert(method, transformer);
    }

    pub fn register_many<I, S>(&mut self, methods: I, transformer: Arc<dyn MethodCallTransformer>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for method in methods {
            self.register(method, transformer.clone());
        }
    }

    pub fn get_item(&self, method: &str) -> Option<Arc<dyn MethodCallTransformer>> {
        self.transformers.get(method).cloned()
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_TRANSFORMERS: Vec<(&'static str, Arc<dyn MethodCallTransformer>)> = vec![
        entry("Contains", transform_contains),
        entry("StartsWith", transform_starts_with),
        entry("EndsWith", transform_ends_with),
        entry("Like", transform_like),
        entry("ToUpper", transform_to_upper),
        entry("ToLower", transform_to_lower),
        entry("Trim", transform_trim),
        entry("Substring", transform_substring),
        entry("Replace", transform_replace),
        entry("IndexOf", transform_index_of),
        entry("Remove", transform_remove),
    ];
}

fn entry<T: MethodCallTransformer + 'static>(
    name: &'static str,
    transformer: T,
) -> (&'static str, Arc<dyn MethodCallTransformer>) {
    let transformer: Arc<dyn MethodCallTransformer> = Arc::new(transformer);
    (name, transformer)
}

fn expect_args(call: &MethodCallParts, counts: &[usize]) -> Result<(), TranslationError> {
    if counts.contains(&call.args.len()) {
        Ok(())
    } else {
        Err(TranslationError::unsupported(format!(
            "The method '{}' is not supported with {} argument(s).",
            call.method,
            call.args.len()
        )))
    }
}

fn receiver(call: &MethodCallParts) -> Result<ExprRef, TranslationError> {
    call.object.clone().ok_or_else(|| {
        TranslationError::unsupported(format!(
            "The method '{}' must be called on an instance.",
            call.method
        ))
    })
}

fn int_literal(value: i64) -> ExprRef {
    SqlExpr::literal(SqlLiteral::Integer(value))
}

fn unary_function(call: MethodCallParts, function: &str) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[0])?;
    let object = receiver(&call)?;
    Ok(SqlExpr::function(function, vec![object], call.result_type))
}

fn transform_to_upper(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    unary_function(call, "UPPER")
}

fn transform_to_lower(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    unary_function(call, "LOWER")
}

/// x.Trim() -> LTRIM(RTRIM(x))
fn transform_trim(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[0])?;
    let object = receiver(&call)?;
    let rtrim = SqlExpr::function("RTRIM", vec![object], "string");
    Ok(SqlExpr::function("LTRIM", vec![rtrim], "string"))
}

fn transform_replace(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[2])?;
    let object = receiver(&call)?;
    Ok(SqlExpr::function(
        "REPLACE",
        vec![object, call.args[0].clone(), call.args[1].clone()],
        "string",
    ))
}

/// x.IndexOf(s) -> CHARINDEX(s, x) - 1
fn transform_index_of(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[1])?;
    let object = receiver(&call)?;
    let position = SqlExpr::function("CHARINDEX", vec![call.args[0].clone(), object], "int");
    Ok(SqlExpr::binary(BinaryOperator::Subtract, position, int_literal(1)))
}

/// x.Contains(s) -> x LIKE '%s%'
fn transform_contains(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    like_pattern(call, "%", "%")
}

fn transform_starts_with(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    like_pattern(call, "", "%")
}

fn transform_ends_with(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    like_pattern(call, "%", "")
}

/// `[`, `%` and `_` are LIKE wildcards and are bracket-escaped.
pub fn escape_like_pattern(text: &str) -> String {
    text.replace('[', "[[]")
        .replace('%', "[%]")
        .replace('_', "[_]")
}

fn like_pattern(call: MethodCallParts, prefix: &str, suffix: &str) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[1])?;
    let object = receiver(&call)?;
    let argument = &call.args[0];

    let pattern = match argument.as_ref() {
        SqlExpr::Literal(SqlLiteral::String(text)) => SqlExpr::literal(SqlLiteral::String(
            format!("{}{}{}", prefix, escape_like_pattern(text), suffix),
        )),
        SqlExpr::Literal(SqlLiteral::Null) => {
            return Err(TranslationError::unsupported(format!(
                "The argument of '{}' must not be null.",
                call.method
            )))
        }
        _ => {
            // Escape at run time: REPLACE(REPLACE(REPLACE(x, '[', '[[]'), '%', '[%]'), '_', '[_]')
            let mut escaped = argument.clone();
            for (wildcard, replacement) in [("[", "[[]"), ("%", "[%]"), ("_", "[_]")] {
                escaped = SqlExpr::function(
                    "REPLACE",
                    vec![
                        escaped,
                        SqlExpr::literal(SqlLiteral::String(wildcard.to_string())),
                        SqlExpr::literal(SqlLiteral::String(replacement.to_string())),
                    ],
                    "string",
                );
            }
            let mut pattern = escaped;
            if !prefix.is_empty() {
                pattern = SqlExpr::binary(
                    BinaryOperator::Add,
                    SqlExpr::literal(SqlLiteral::String(prefix.to_string())),
                    pattern,
                );
            }
            if !suffix.is_empty() {
                pattern = SqlExpr::binary(
                    BinaryOperator::Add,
                    pattern,
                    SqlExpr::literal(SqlLiteral::String(suffix.to_string())),
                );
            }
            pattern
        }
    };
    Ok(SqlExpr::binary(BinaryOperator::Like, object, pattern))
}

/// `Like(x, pattern)` or `x.Like(pattern)`; the pattern is used verbatim.
fn transform_like(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    match (&call.object, call.args.as_slice()) {
        (Some(object), [pattern]) => Ok(SqlExpr::binary(
            BinaryOperator::Like,
            object.clone(),
            pattern.clone(),
        )),
        (None, [object, pattern]) => Ok(SqlExpr::binary(
            BinaryOperator::Like,
            object.clone(),
            pattern.clone(),
        )),
        _ => Err(TranslationError::unsupported(format!(
            "The method '{}' is not supported with {} argument(s).",
            call.method,
            call.args.len()
        ))),
    }
}

/// x.Substring(start [, length]) -> SUBSTRING(x, start + 1, length | LEN(x)).
/// Query-language indexes are 0-based, SQL's are 1-based.
fn transform_substring(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[1, 2])?;
    let object = receiver(&call)?;
    let start = SqlExpr::binary(BinaryOperator::Add, call.args[0].clone(), int_literal(1));
    let length = match call.args.get(1) {
        Some(length) => length.clone(),
        None => SqlExpr::function("LEN", vec![object.clone()], "int"),
    };
    Ok(SqlExpr::function("SUBSTRING", vec![object, start, length], "string"))
}

/// x.Remove(start [, count]) -> STUFF(x, start + 1, count | LEN(x), '')
fn transform_remove(call: MethodCallParts) -> Result<ExprRef, TranslationError> {
    expect_args(&call, &[1, 2])?;
    let object = receiver(&call)?;
    let start = SqlExpr::binary(BinaryOperator::Add, call.args[0].clone(), int_literal(1));
    let count = match call.args.get(1) {
        Some(count) => count.clone(),
        None => SqlExpr::function("LEN", vec![object.clone()], "int"),
    };
    Ok(SqlExpr::function(
        "STUFF",
        vec![
            object,
            start,
            count,
            SqlExpr::literal(SqlLiteral::String(String::new())),
        ],
        "string",
    ))
}
