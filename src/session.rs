//! Session context injected into the controller.

use serde_json::Value;

/// Identifies the project conversation that outbound messages belong to.
///
/// Immutable once constructed. The server accepts whatever JSON type its
/// project keys use, so the id is carried as a raw JSON value.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionContext {
    project_id: Value,
}

impl SessionContext {
    #[must_use]
    pub fn new(project_id: Value) -> Self {
        Self { project_id }
    }

    /// Build a context from a command-line value.
    ///
    /// Valid JSON (`3`, `"3"`, `{"k":1}`) is kept as parsed; anything else is
    /// taken as a plain string, so `--project-id alpha` works unquoted.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let project_id = serde_json::from_str::<Value>(trimmed)
            .unwrap_or_else(|_| Value::String(trimmed.to_owned()));
        Self { project_id }
    }

    #[must_use]
    pub fn project_id(&self) -> &Value {
        &self.project_id
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
