use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::any,
    Router,
};
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::handlers;
use super::middleware::{preflight, require_token, ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE};
use crate::config::Config;
use crate::tts::TtsService;

pub struct AppState {
    pub config: Config,
    pub tts: TtsService,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/tts", any(handlers::tts))
        .route("/voices", any(handlers::list_voices));

    // Layers run bottom-up: CORS headers wrap everything, then preflight,
    // then the shared-secret check.
    Router::new()
        .nest("/api", api_routes)
        .fallback(handlers::help)
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(middleware::from_fn(preflight))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::tests::{mount_endpoint, test_config};
    use crate::tts::voice::tests::sample_voices;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(config: Config) -> Router {
        let tts = TtsService::new(&config).unwrap();
        create_router(Arc::new(AppState { config, tts }))
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn mount_speech(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/cognitiveservices/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x01, 0x02]))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_tts_returns_audio() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        mount_speech(&server).await;

        let response = get(
            app(test_config(&server)),
            "/api/tts?t=hello&v=zh-CN-XiaoxiaoNeural&r=0&p=0&o=audio-24khz-48kbitrate-mono-mp3&d=false",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "audio-24khz-48kbitrate-mono-mp3");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
        assert_eq!(body_bytes(response).await, vec![0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_tts_download_sets_disposition() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        mount_speech(&server).await;

        let response = get(app(test_config(&server)), "/api/tts?t=hello&d=true").await;

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        let digits = disposition
            .strip_prefix("attachment; filename=\"speech_")
            .and_then(|d| d.strip_suffix(".mp3\""))
            .unwrap();
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_tts_empty_text_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = get(app(test_config(&server)), "/api/tts?t=").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_tts_upstream_failure_is_500() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        Mock::given(method("POST"))
            .and(path("/cognitiveservices/v1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let response = get(app(test_config(&server)), "/api/tts?t=hello").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_voices_formats() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/cognitiveservices/voices/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "ShortName": "zh-CN-XiaoxiaoNeural", "LocalName": "晓晓", "Locale": "zh-CN" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let app = app(test_config(&server));

        let response = get(app.clone(), "/api/voices?f=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(
            String::from_utf8(body_bytes(response).await).unwrap(),
            r#"{"zh-CN-XiaoxiaoNeural":"晓晓"}"#
        );

        let response = get(app.clone(), "/api/voices?f=0").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/html; charset=utf-8"
        );
        assert_eq!(
            String::from_utf8(body_bytes(response).await).unwrap(),
            "<option value='zh-CN-XiaoxiaoNeural'>晓晓 (zh-CN)</option>"
        );

        let response = get(app, "/api/voices").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body[0]["ShortName"], "zh-CN-XiaoxiaoNeural");
    }

    #[tokio::test]
    async fn test_voices_locale_filter() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/cognitiveservices/voices/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_voices()))
            .mount(&server)
            .await;

        let response = get(app(test_config(&server)), "/api/voices?l=en&f=1").await;

        assert_eq!(
            String::from_utf8(body_bytes(response).await).unwrap(),
            r#"{"en-US-JennyNeural":"Jenny"}"#
        );
    }

    #[tokio::test]
    async fn test_help_page() {
        let response = get(app(Config::default()), "/anything").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("/api/tts?t="));
        assert!(body.contains("/api/voices?l=zh&f=1"));
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let response = app(Config::default())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/tts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-auth-token");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET,HEAD,POST,OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[tokio::test]
    async fn test_options_echoes_requested_headers_without_token() {
        let config = Config {
            auth_token: Some("s3cret".into()),
            ..Config::default()
        };
        let response = app(config)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/voices")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-auth-token, content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "x-auth-token, content-type"
        );
    }

    #[tokio::test]
    async fn test_wrong_token_is_rejected_before_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = Config {
            auth_token: Some("s3cret".into()),
            ..test_config(&server)
        };
        let response = app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/tts?t=hello")
                    .header("x-auth-token", "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let config = Config {
            auth_token: Some("s3cret".into()),
            ..Config::default()
        };
        let response = get(app(config), "/").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_matching_token_on_custom_header() {
        let server = MockServer::start().await;
        mount_endpoint(&server).await;
        mount_speech(&server).await;

        let config = Config {
            auth_token: Some("s3cret".into()),
            auth_header: "x-api-key".into(),
            ..test_config(&server)
        };
        let response = app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/tts?t=hello")
                    .header("X-Api-Key", "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
