//! Rate Limit Tracking
//!
//! Tracks rate limits reported in API responses and decides how long the
//! next call has to wait.

use chrono::DateTime;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Values above this are treated as unix timestamps rather than deltas
const EPOCH_THRESHOLD_SECS: u64 = 1_000_000_000;

/// Header names a service uses to report its limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Remaining calls in the current window
    pub remaining: String,

    /// When the current window resets (delta seconds, epoch seconds or "1m30s")
    pub reset: String,

    /// Wait hint sent alongside a 429
    pub retry_after: String,
}

impl Default for RateLimitHeaders {
    fn default() -> Self {
        Self {
            remaining: "x-ratelimit-remaining".to_string(),
            reset: "x-ratelimit-reset".to_string(),
            retry_after: "retry-after".to_string(),
        }
    }
}

/// Rate limit info for a single category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Remaining requests in current window
    pub remaining: Option<u32>,

    /// When the rate limit resets
    pub reset_at: Option<Instant>,

    /// Last known retry-after duration
    pub retry_after: Option<Duration>,
}

/// Tracks rate limit status per limit category
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    categories: RwLock<HashMap<String, RateLimitState>>,
}

impl RateLimitTracker {
    /// Create a new rate limit tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update rate limit info from response headers
    pub fn update_from_response(
        &self,
        category: &str,
        headers: &HeaderMap,
        names: &RateLimitHeaders,
    ) {
        let remaining = header_str(headers, &names.remaining).and_then(|s| s.parse::<u32>().ok());
        let reset = header_str(headers, &names.reset).and_then(parse_reset_value);

        if remaining.is_none() && reset.is_none() {
            return;
        }

        let mut categories = self.categories.write();
        let info = categories.entry(category.to_string()).or_default();

        if let Some(n) = remaining {
            info.remaining = Some(n);
        }
        if let Some(wait) = reset {
            info.reset_at = Instant::now().checked_add(wait);
        }
    }

    /// Record that the category is exhausted for `wait`
    pub fn mark_exhausted(&self, category: &str, wait: Duration) {
        let mut categories = self.categories.write();
        let info = categories.entry(category.to_string()).or_default();

        info.remaining = Some(0);
        info.retry_after = Some(wait);
        info.reset_at = Instant::now().checked_add(wait);
    }

    /// Check if we should wait before making a request
    ///
    /// Only an exhausted counter with a reset still in the future blocks;
    /// a reset that already passed lets the call through immediately.
    pub fn should_wait(&self, category: &str) -> Option<Duration> {
        let categories = self.categories.read();
        let info = categories.get(category)?;

        if info.remaining != Some(0) {
            return None;
        }

        let reset_at = info.reset_at?;
        let now = Instant::now();
        if now < reset_at {
            Some(reset_at - now)
        } else {
            None
        }
    }

    /// Current state for a category
    pub fn state(&self, category: &str) -> Option<RateLimitState> {
        self.categories.read().get(category).cloned()
    }

    /// Clear rate limit info for a category
    pub fn clear(&self, category: &str) {
        self.categories.write().remove(category);
    }

    /// Read the wait hint from a rate limit response
    pub fn retry_after_from_headers(headers: &HeaderMap, names: &RateLimitHeaders) -> Option<Duration> {
        header_str(headers, &names.retry_after)
            .and_then(parse_reset_value)
            .or_else(|| header_str(headers, &names.reset).and_then(parse_reset_value))
    }

    /// Detect if a response indicates a rate limit error
    pub fn is_rate_limit_error(status: u16, body: &str) -> bool {
        // HTTP 429 Too Many Requests
        if status == 429 {
            return true;
        }

        // Some APIs return 400 or 403 with rate limit messages
        if status < 400 {
            return false;
        }
        let lower_body = body.to_lowercase();
        lower_body.contains("rate limit")
            || lower_body.contains("rate_limit")
            || lower_body.contains("too many requests")
            || lower_body.contains("quota exceeded")
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Parse a reset/retry-after value into the time left until it elapses
fn parse_reset_value(s: &str) -> Option<Duration> {
    if let Ok(secs) = s.parse::<u64>() {
        if secs < EPOCH_THRESHOLD_SECS {
            return Some(Duration::from_secs(secs));
        }
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        return Some(Duration::from_secs(secs.saturating_sub(now)));
    }

    // Negative, NaN and out of range values are ignored
    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    // HTTP-date form of Retry-After
    if let Ok(at) = DateTime::parse_from_rfc2822(s) {
        let now = chrono::Utc::now();
        return Some((at.with_timezone(&chrono::Utc) - now).to_std().unwrap_or(Duration::ZERO));
    }

    parse_duration_string(s)
}

/// Parse a duration string like "1m30s" or "2h" into a Duration
fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    // Handle milliseconds first
    if let Some(stripped) = s.strip_suffix("ms") {
        return stripped.parse::<u64>().ok().map(Duration::from_millis);
    }

    // Try complex format first (e.g., "1m30s", "2h30m")
    if s.contains('h') || (s.contains('m') && s.contains('s')) {
        let mut total_secs = 0u64;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
            } else if !current_num.is_empty() {
                if let Ok(n) = current_num.parse::<u64>() {
                    let unit = match c {
                        'h' => 3600,
                        'm' => 60,
                        's' => 1,
                        _ => 0,
                    };
                    total_secs = total_secs.saturating_add(n.saturating_mul(unit));
                }
                current_num.clear();
            }
        }

        if total_secs > 0 {
            return Some(Duration::from_secs(total_secs));
        }
    }

    // Simple cases - single unit
    if let Some(stripped) = s.strip_suffix('s') {
        return stripped
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    }
    if let Some(stripped) = s.strip_suffix('m') {
        return stripped
            .parse::<u64>()
            .ok()
            .map(|mins| Duration::from_secs(mins.saturating_mul(60)));
    }

    None
}
