use super::output::CompileError;

/// Shown for an error that carries nothing usable.
pub const UNKNOWN_ERROR_MESSAGE: &str =
    "There were errors, but your render engine did not return a valid message";

impl CompileError {
    /// Human readable text of this error.
    ///
    /// The pre-formatted message wins, then the raw message, then a message
    /// synthesized from the line and tag name.
    pub fn display_message(&self) -> String {
        if let Some(formatted) = &self.formatted_message {
            return formatted.clone();
        }

        if let Some(message) = &self.message {
            return message.clone();
        }

        match (self.line, &self.tag_name) {
            (Some(line), Some(tag_name)) => {
                format!("An error occurred on line {line}:<{tag_name}>")
            }
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Joins the errors with a blank line, keeping their order.
pub fn format_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(CompileError::display_message)
        .collect::<Vec<_>>()
        .join("\n\n")
}
