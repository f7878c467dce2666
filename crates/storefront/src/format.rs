//! Shared formatting and page utilities.
//!
//! Currency and dates follow the `es-CL` locale the storefront is served in:
//! `.` groups thousands, `,` separates decimals, dates are `dd-mm-yyyy`.

use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime};
use rand::Rng;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::task::AbortHandle;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_PREFIX: &str = "ferramas_";
const ID_LENGTH: usize = 9;

/// Format an amount as Chilean pesos, e.g. `$1.234.567` or `$1.234,5`.
///
/// At most three fraction digits are kept and trailing zeros are dropped.
#[must_use]
pub fn format_currency(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (digits.as_str(), None),
    };

    let grouped = group_thousands(int_part);
    match frac_part {
        Some(frac) => format!("${sign}{grouped},{frac}"),
        None => format!("${sign}{grouped}"),
    }
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Format an amount with exactly `places` decimals (`toFixed` semantics).
#[must_use]
pub fn format_fixed(value: Decimal, places: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded.to_string()
}

/// Format a timestamp as `dd-mm-yyyy, HH:MM`.
#[must_use]
pub fn format_date(value: &NaiveDateTime) -> String {
    value.format("%d-%m-%Y, %H:%M").to_string()
}

/// Parse a server timestamp and format it with [`format_date`].
///
/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM[:SS]`; returns `None` for anything
/// else so callers can show the raw value.
#[must_use]
pub fn format_date_str(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(format_date(&parsed.naive_local()));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|parsed| format_date(&parsed))
}

/// Escape text the way assigning `textContent` and reading `innerHTML` does.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Read a cookie value from a `document.cookie` style string.
///
/// Values are percent-decoded; a value that does not decode is returned raw.
#[must_use]
pub fn get_cookie(cookies: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| {
            cookie
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|raw| {
            urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), std::borrow::Cow::into_owned)
        })
}

/// Convert a string into a URL-friendly slug.
///
/// Spanish accented vowels, `ñ` and `ç` are folded to ASCII; every other
/// non-alphanumeric run becomes a single `-`.
#[must_use]
pub fn to_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        let folded = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => c,
            _ => '-',
        };
        if folded == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(folded);
    }
    slug.trim_matches('-').to_string()
}

/// Truncate `text` to `max_chars` characters, appending `...` when cut.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim())
}

/// Loose email syntax check (`something@domain.tld`).
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Generate a short random element id, e.g. `ferramas_k3j9x0a1b`.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ID_ALPHABET.len());
            char::from(ID_ALPHABET.get(idx).copied().unwrap_or(b'0'))
        })
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

/// Trailing-edge debounce: only the last call within `wait` runs.
///
/// Must be used from within a Tokio runtime. Dropping the debouncer cancels
/// the pending call.
#[derive(Debug)]
pub struct Debouncer {
    wait: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `f`, replacing any call still waiting.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let wait = self.wait;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            f();
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_format_currency_groups_thousands() {
        assert_eq!(format_currency(Decimal::from(0)), "$0");
        assert_eq!(format_currency(Decimal::from(999)), "$999");
        assert_eq!(format_currency(Decimal::from(3500)), "$3.500");
        assert_eq!(format_currency(Decimal::from(1_234_567)), "$1.234.567");
    }

    #[test]
    fn test_format_currency_fractions() {
        assert_eq!(format_currency(Decimal::new(12345, 1)), "$1.234,5");
        assert_eq!(format_currency(Decimal::new(10_000, 2)), "$100");
        assert_eq!(format_currency(Decimal::new(12_3456, 4)), "$12,346");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(Decimal::from(-1500)), "$-1.500");
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(Decimal::from(3500), 2), "3500.00");
        assert_eq!(format_fixed(Decimal::new(1005, 3), 2), "1.01");
        assert_eq!(format_fixed(Decimal::new(12345, 3), 2), "12.35");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(format_date(&date), "07-03-2026, 09:05");
    }

    #[test]
    fn test_format_date_str() {
        assert_eq!(
            format_date_str("2026-03-07T09:05:00-03:00").as_deref(),
            Some("07-03-2026, 09:05")
        );
        assert_eq!(
            format_date_str("2026-03-07 18:30:12").as_deref(),
            Some("07-03-2026, 18:30")
        );
        assert_eq!(format_date_str("ayer"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Martillo & Clavos</b>"),
            "&lt;b&gt;Martillo &amp; Clavos&lt;/b&gt;"
        );
        assert_eq!(escape_html("\"comillas\""), "\"comillas\"");
    }

    #[test]
    fn test_get_cookie() {
        let cookies = "sessionid=abc; csrftoken=tok%20en; other=1";
        assert_eq!(get_cookie(cookies, "csrftoken").as_deref(), Some("tok en"));
        assert_eq!(get_cookie(cookies, "sessionid").as_deref(), Some("abc"));
        assert_eq!(get_cookie(cookies, "missing"), None);
        assert_eq!(get_cookie("", "csrftoken"), None);
    }

    #[test]
    fn test_get_cookie_requires_exact_name() {
        let cookies = "csrftoken_old=stale; csrftoken=fresh";
        assert_eq!(get_cookie(cookies, "csrftoken").as_deref(), Some("fresh"));
    }

    #[test]
    fn test_to_slug() {
        assert_eq!(to_slug("Taladro Percutor Bosch"), "taladro-percutor-bosch");
        assert_eq!(to_slug("  Pintura Látex 1/4 Galón  "), "pintura-latex-1-4-galon");
        assert_eq!(to_slug("Ñandú & Cía."), "nandu-cia");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Martillo", 20), "Martillo");
        assert_eq!(truncate_text("Martillo de carpintero", 9), "Martillo...");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("cliente@ferramas.cl"));
        assert!(!is_valid_email("cliente@ferramas"));
        assert!(!is_valid_email("cli ente@ferramas.cl"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert!(id.starts_with("ferramas_"));
        assert_eq!(id.len(), "ferramas_".len() + 9);
        assert_ne!(generate_id(), generate_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_only_last_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(300));

        for i in 1..=3 {
            let calls = Arc::clone(&calls);
            let last = Arc::clone(&last);
            debouncer.call(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let counter = Arc::clone(&calls);
        debouncer.call(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
