use serde::{Deserialize, Serialize};

use super::ssml::escape_xml;

/// A voice record as returned by the speech service's voice list.
///
/// Only the fields used for filtering and formatting are typed; the rest
/// are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voice {
    #[serde(rename = "ShortName")]
    pub short_name: String,
    #[serde(rename = "LocalName", default)]
    pub local_name: String,
    #[serde(rename = "Locale", default)]
    pub locale: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Voice {
    /// `<option>` fragment for HTML voice pickers.
    pub fn to_html_option(&self) -> String {
        format!(
            "<option value='{}'>{} ({})</option>",
            escape_xml(&self.short_name),
            escape_xml(&self.local_name),
            escape_xml(&self.locale)
        )
    }
}

/// Keeps voices whose locale contains `filter`, ignoring case.
/// An empty filter keeps everything.
pub fn filter_by_locale(voices: Vec<Voice>, filter: &str) -> Vec<Voice> {
    let filter = filter.to_lowercase();
    if filter.is_empty() {
        return voices;
    }
    voices
        .into_iter()
        .filter(|v| v.locale.to_lowercase().contains(&filter))
        .collect()
}

pub fn html_options(voices: &[Voice]) -> String {
    voices
        .iter()
        .map(Voice::to_html_option)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Short name to local display name, in list order.
pub fn name_map(voices: &[Voice]) -> serde_json::Map<String, serde_json::Value> {
    voices
        .iter()
        .map(|v| (v.short_name.clone(), serde_json::Value::from(v.local_name.clone())))
        .collect()
}
