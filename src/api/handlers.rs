use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{TtsQuery, VoicesQuery};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::ssml::escape_xml;
use crate::tts::voice::{filter_by_locale, html_options, name_map};
use crate::tts::{SynthesisRequest, SynthesizedAudio};

const JSON_UTF8: &str = "application/json; charset=utf-8";

impl IntoResponse for SynthesizedAudio {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, self.bytes).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, self.content_type);

        if let Some(filename) = self.filename {
            let disposition = format!("attachment; filename=\"{}\"", filename);
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }

        response
    }
}

pub async fn tts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TtsQuery>,
) -> Result<SynthesizedAudio, AppError> {
    state.tts.synthesize(SynthesisRequest::from(query)).await
}

pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoicesQuery>,
) -> Result<Response, AppError> {
    let voices = state.tts.list_voices().await?;
    let voices = filter_by_locale(voices, query.l.as_deref().unwrap_or_default());

    let response = match query.f.as_deref() {
        Some("0") => (
            [(header::CONTENT_TYPE, "application/html; charset=utf-8")],
            html_options(&voices),
        )
            .into_response(),
        Some("1") => {
            ([(header::CONTENT_TYPE, JSON_UTF8)], Json(name_map(&voices))).into_response()
        }
        _ => ([(header::CONTENT_TYPE, JSON_UTF8)], Json(voices)).into_response(),
    };

    Ok(response)
}

/// Usage page served for every path without a handler.
pub async fn help(headers: HeaderMap) -> Html<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let base_url = format!("http://{}", escape_xml(host));

    Html(format!(
        r#"
    <ol>
        <li> /api/tts?t=[text]&v=[voice]&r=[rate]&p=[pitch]&o=[outputFormat]&d=[true|false] <a href="{base}/api/tts?t=hello, world&v=zh-CN-XiaoxiaoNeural&r=0&p=0&o=audio-24khz-48kbitrate-mono-mp3">try it</a> </li>
        <li> /api/voices?l=[locale, e.g. zh|zh-CN]&f=[format, 0|1|empty] <a href="{base}/api/voices?l=zh&f=1">try it</a> </li>
    </ol>
    "#,
        base = base_url
    ))
}
