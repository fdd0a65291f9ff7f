//! Environment-sourced connection settings for the hosted backend.

pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// Project endpoint URL and public anon key.
///
/// Values are read once at startup and are deliberately not validated here:
/// a missing or malformed value surfaces as an error on the first remote
/// call, not as a startup check.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub url: String,
    pub anon_key: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Ok(v) = std::env::var(SUPABASE_URL_ENV) {
            settings.url = v;
        }
        if let Ok(v) = std::env::var(SUPABASE_ANON_KEY_ENV) {
            settings.anon_key = v;
        }

        settings
    }
}
