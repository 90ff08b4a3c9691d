use serde::Serialize;

/// One bound value of a generated command. `name` occurs in the command text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandParameter {
    pub name: String,
    pub value: serde_json::Value,
}

/// Generated SQL text plus its parameters, in the order their placeholders
/// appear in the text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCommand {
    pub text: String,
    pub parameters: Vec<CommandParameter>,
}

/// Accumulates command text and parameters during generation.
#[derive(Debug, Clone)]
pub struct SqlCommandBuilder {
    text: String,
    parameters: Vec<CommandParameter>,
    parameter_prefix: String,
}

impl SqlCommandBuilder {
    pub fn new(parameter_prefix: impl Into<String>) -> Self {
        SqlCommandBuilder {
            text: String::new(),
            parameters: Vec::new(),
            parameter_prefix: parameter_prefix.into(),
        }
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Appends `[identifier]`, doubling any closing bracket inside it.
    pub fn append_identifier(&mut self, identifier: &str) {
        self.text.push('[');
        self.text.push_str(&identifier.replace(']', "]]"));
        self.text.push(']');
    }

    /// Appends `[table].[column]`.
    pub fn append_column(&mut self, table_alias: &str, column: &str) {
        self.append_identifier(table_alias);
        self.text.push('.');
        self.append_identifier(column);
    }

    /// Registers a new parameter and returns its placeholder. Equal values are
    /// not shared; every call gets the next number, starting at 1.
    pub fn add_parameter(&mut self, value: serde_json::Value) -> String {
        let name = format!("{}{}", self.parameter_prefix, self.parameters.len() + 1);
        log::trace!("Parameter {} = {}", name, value);
        self.parameters.push(CommandParameter {
            name: name.clone(),
            value,
        });
        name
    }

    /// Registers a parameter and appends its placeholder to the text.
    pub fn append_parameter(&mut self, value: serde_json::Value) {
        let name = self.add_parameter(value);
        self.text.push_str(&name);
    }

    pub fn get_command_text(&self) -> &str {
        &self.text
    }

    pub fn get_command(self) -> SqlCommand {
        SqlCommand {
            text: self.text,
            parameters: self.parameters,
        }
    }
}
