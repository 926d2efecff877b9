use serde::{Deserialize, Serialize};

/// Outcome of validating an import payload.
///
/// Errors block the import; warnings are advisory and travel with the
/// imported document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub(crate) fn error(
        &mut self,
        message: impl Into<String>,
    ) {
        self.errors.push(message.into());
    }

    pub(crate) fn warn(
        &mut self,
        message: impl Into<String>,
    ) {
        self.warnings.push(message.into());
    }

    pub(crate) fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }
}
