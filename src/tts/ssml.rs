/// Escapes the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Builds the SSML document sent to the speech endpoint.
///
/// `xml:lang` is the first dash-separated segment of the voice name
/// (`zh-CN-XiaoxiaoNeural` -> `zh`). Rate and pitch are written as given.
pub fn build_ssml(text: &str, voice_name: &str, rate: f64, pitch: f64) -> String {
    let lang = voice_name.split('-').next().unwrap_or_default();

    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{}'>\
         <voice name='{}'>\
         <prosody rate='{}' pitch='{}'>{}</prosody>\
         </voice>\
         </speak>",
        escape_xml(lang),
        escape_xml(voice_name),
        js_number(rate),
        js_number(pitch),
        escape_xml(text),
    )
}

/// Renders a number the way JavaScript prints it for the common cases.
fn js_number(value: f64) -> String {
    if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}
