use std::env;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// Seconds between background SLA breach sweeps.
    pub breach_scan_interval_secs: u64,
    /// Staff reply on an `open` ticket auto-transitions it to `in_progress`.
    pub auto_progress_on_staff_reply: bool,
    /// Anthropic API key; absent means the assist seam runs as a no-op.
    pub claude_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let breach_scan_interval_secs = env::var("BREACH_SCAN_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        let auto_progress_on_staff_reply = env::var("AUTO_PROGRESS_ON_STAFF_REPLY")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let claude_api_key = env::var("CLAUDE_API_KEY").ok().filter(|v| !v.is_empty());

        Config {
            database_url,
            frontend_origin,
            breach_scan_interval_secs,
            auto_progress_on_staff_reply,
            claude_api_key,
        }
    }
}
