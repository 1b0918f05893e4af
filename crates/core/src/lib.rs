pub mod advisory;
pub mod domain;
pub mod error;
pub mod projection;
pub mod quote;
pub mod registry;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod summary;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub advisory_base_url: Option<String>,
        pub quote_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub series_fixture_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                advisory_base_url: non_empty_env("ADVISORY_BASE_URL"),
                quote_url: non_empty_env("QUOTE_URL"),
                sentry_dsn: non_empty_env("SENTRY_DSN"),
                series_fixture_path: non_empty_env("SERIES_FIXTURE_PATH"),
            })
        }

        pub fn require_advisory_base_url(&self) -> anyhow::Result<&str> {
            self.advisory_base_url
                .as_deref()
                .context("ADVISORY_BASE_URL is required")
        }

        pub fn require_quote_url(&self) -> anyhow::Result<&str> {
            self.quote_url.as_deref().context("QUOTE_URL is required")
        }
    }

    fn non_empty_env(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

}
