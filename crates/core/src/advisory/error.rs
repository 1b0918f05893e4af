use std::fmt;

/// Carries what went wrong talking to an external provider, including the raw body
/// when one was received, so callers can log it next to the failure.
#[derive(Debug, Clone)]
pub struct ProviderDiagnosticsError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for ProviderDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for ProviderDiagnosticsError {}
