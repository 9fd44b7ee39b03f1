pub mod handlers;
pub mod middleware;
pub mod routes;

use serde::Deserialize;

use crate::tts::{SynthesisRequest, DEFAULT_OUTPUT_FORMAT, DEFAULT_VOICE};

/// Query string of `/api/tts`.
#[derive(Debug, Default, Deserialize)]
pub struct TtsQuery {
    pub t: Option<String>,
    pub v: Option<String>,
    pub r: Option<String>,
    pub p: Option<String>,
    pub o: Option<String>,
    pub d: Option<String>,
}

/// Numeric query values follow JavaScript `Number(x) || 0`: decimal,
/// exponent, `0x`/`0o`/`0b` integers and `Infinity` are accepted; anything
/// missing or unparseable counts as zero.
fn number_or_zero(value: Option<&str>) -> f64 {
    value
        .and_then(parse_js_number)
        .filter(|n| !n.is_nan())
        .unwrap_or(0.0)
}

fn parse_js_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let digits = value
            .strip_prefix(prefix)
            .or_else(|| value.strip_prefix(&prefix.to_ascii_uppercase()[..]));
        if let Some(digits) = digits {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return None;
            }
            return u128::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }

    match value {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    // Rust also accepts `inf`, `nan` and friends, which JavaScript does not.
    if value
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }

    value.parse().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<TtsQuery> for SynthesisRequest {
    fn from(query: TtsQuery) -> Self {
        Self {
            rate: number_or_zero(query.r.as_deref()),
            pitch: number_or_zero(query.p.as_deref()),
            wants_download: query.d.as_deref() == Some("true"),
            text: query.t.unwrap_or_default(),
            voice_name: non_empty(query.v).unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            output_format: non_empty(query.o)
                .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),
        }
    }
}

/// Query string of `/api/voices`.
#[derive(Debug, Default, Deserialize)]
pub struct VoicesQuery {
    /// Locale substring filter.
    pub l: Option<String>,
    /// `0` for HTML fragments, `1` for a name map, anything else for full records.
    pub f: Option<String>,
}
