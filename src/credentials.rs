use std::fmt;

/// Per-provider API keys supplied by the caller at invocation time.
///
/// Keys are request-scoped and never persisted or logged; the `Debug`
/// impl only reports which keys are present.
#[derive(Clone, Default)]
pub struct Credentials {
    gemini_api_key: Option<String>,
    ideogram_api_key: Option<String>,
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads keys from the process environment. Call this at the
    /// composition point (server startup), not inside core logic.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env_key("GEMINI_API_KEY"),
            ideogram_api_key: env_key("IDEOGRAM_API_KEY"),
            openai_api_key: env_key("OPENAI_API_KEY"),
            anthropic_api_key: env_key("ANTHROPIC_API_KEY"),
        }
    }

    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = non_empty(key.into());
        self
    }

    pub fn with_ideogram_api_key(mut self, key: impl Into<String>) -> Self {
        self.ideogram_api_key = non_empty(key.into());
        self
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = non_empty(key.into());
        self
    }

    pub fn with_anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = non_empty(key.into());
        self
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref()
    }

    pub fn ideogram_api_key(&self) -> Option<&str> {
        self.ideogram_api_key.as_deref()
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.anthropic_api_key.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &self.gemini_api_key.is_some())
            .field("ideogram_api_key", &self.ideogram_api_key.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("anthropic_api_key", &self.anthropic_api_key.is_some())
            .finish()
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}
