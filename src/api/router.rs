//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Layers (outermost → innermost): CORS → Audit → Body limit → Handler

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router with every endpoint under `/api/`.
///
/// `cors_origins` may contain `*`; an empty list disables CORS headers.
pub fn api_router(ctx: ApiContext, cors_origins: &[String]) -> Router {
    let max_upload_bytes = ctx.max_upload_bytes;

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    // Static segments (`upload`, `onboarding`) win over the params beside them.
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/reports/upload", post(endpoints::reports::upload))
        .route("/reports/:owner_id", get(endpoints::reports::list))
        .route("/users/onboarding", post(endpoints::users::onboarding))
        .route("/users/:owner_id", get(endpoints::users::profile))
        .route(
            "/users/:owner_id/profile",
            patch(endpoints::users::update_profile),
        )
        .route("/privacy/explanation", post(endpoints::privacy::explain))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    let app = Router::new().nest("/api", routes);
    match cors_layer(cors_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        }))
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::db::{PersistenceGateway, SqliteGateway};
    use crate::pipeline::extraction::{
        DocumentExtractor, MockExtractor, MockTextGenerator, TextGenerator,
    };
    use crate::pipeline::schema::SchemaRegistry;

    const GLUCOSE_95: &str = r#"{"medicalProfile":{"labResults":[{"testName":"Glucose","value":"95","unit":"mg/dL","flag":"Normal"}]}}"#;
    const GLUCOSE_110: &str = r#"{"medicalProfile":{"labResults":[{"testName":"Glucose","value":"110","unit":"mg/dL","flag":"High"}]}}"#;
    const BOUNDARY: &str = "medprofile-test-boundary";

    fn test_store() -> Arc<dyn PersistenceGateway> {
        Arc::new(SqliteGateway::in_memory().unwrap())
    }

    fn test_ctx(
        store: Arc<dyn PersistenceGateway>,
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn TextGenerator>,
    ) -> ApiContext {
        ApiContext::new(
            Arc::new(SchemaRegistry::builtin().unwrap()),
            store,
            extractor,
            generator,
            Duration::from_millis(500),
        )
    }

    fn app_with(store: Arc<dyn PersistenceGateway>, extraction_output: &str) -> Router {
        api_router(
            test_ctx(
                store,
                Arc::new(MockExtractor::new(extraction_output)),
                Arc::new(MockTextGenerator::new("<h3>Privacy</h3>")),
            ),
            &[],
        )
    }

    fn app() -> Router {
        app_with(test_store(), GLUCOSE_95)
    }

    struct FilePart<'a> {
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    }

    fn upload_request(owner: Option<&str>, schema: Option<&str>, file: Option<FilePart<'_>>) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        let mut text_part = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        if let Some(owner) = owner {
            text_part("ownerId", owner);
        }
        if let Some(schema) = schema {
            text_part("schema", schema);
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"user-file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.filename, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/reports/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn pdf(filename: &str) -> FilePart<'_> {
        FilePart {
            filename,
            content_type: "application/pdf",
            bytes: b"%PDF-1.7 complete blood count",
        }
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn onboard(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/users/onboarding",
                json!({
                    "emailId": email,
                    "password": "long-enough-secret",
                    "firstName": "Asha",
                    "lastName": "Rao",
                    "userType": "patient"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        json["data"]["id"].as_str().unwrap().to_string()
    }

    // ── health / routing ────────────────────────────────

    #[tokio::test]
    async fn health_lists_registered_schemas() {
        let response = app().oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["schemas"], json!(["medical_report@1", "diabetes@1"]));
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let response = app().oneshot(get_request("/api/nonexistent/a/b")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let app = api_router(
            test_ctx(
                test_store(),
                Arc::new(MockExtractor::new(GLUCOSE_95)),
                Arc::new(MockTextGenerator::new("ok")),
            ),
            &["http://localhost:3000".to_string()],
        );
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/health")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    // ── reports ─────────────────────────────────────────

    #[tokio::test]
    async fn upload_without_file_is_400() {
        let response = app()
            .oneshot(upload_request(Some("U1"), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "No file uploaded.");
    }

    #[tokio::test]
    async fn upload_without_owner_is_400() {
        let response = app()
            .oneshot(upload_request(None, None, Some(pdf("cbc.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_creates_then_replaces_report() {
        let store = test_store();

        let response = app_with(store.clone(), GLUCOSE_95)
            .oneshot(upload_request(Some("U1"), None, Some(pdf("cbc_2024.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = response_json(response).await;
        assert_eq!(first["message"], "Success");
        assert_eq!(first["data"]["ownerId"], "U1");
        assert_eq!(first["data"]["reportIdentity"], "cbc_2024.pdf");
        assert_eq!(first["data"]["schema"], "medical_report@1");
        assert_eq!(first["data"]["medicalProfile"]["labResults"][0]["value"], "95");

        let response = app_with(store.clone(), GLUCOSE_110)
            .oneshot(upload_request(Some("U1"), None, Some(pdf("cbc_2024.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let second = response_json(response).await;

        let labs = &second["data"]["medicalProfile"]["labResults"];
        assert_eq!(labs.as_array().unwrap().len(), 1);
        assert_eq!(labs[0]["value"], "110");
        assert_eq!(labs[0]["flag"], "High");

        let response = app_with(store, GLUCOSE_110)
            .oneshot(get_request("/api/reports/U1"))
            .await
            .unwrap();
        let listed = response_json(response).await;
        assert_eq!(listed["data"], json!([second["data"].clone()]));
    }

    #[tokio::test]
    async fn upload_over_body_limit_is_413() {
        let extractor = Arc::new(MockExtractor::new(GLUCOSE_95));
        let app = api_router(
            test_ctx(test_store(), extractor.clone(), Arc::new(MockTextGenerator::new("ok")))
                .with_max_upload_bytes(256),
            &[],
        );
        let mut bytes = b"%PDF-1.7 ".to_vec();
        bytes.resize(4096, b'x');
        let big = FilePart {
            filename: "scan.pdf",
            content_type: "application/pdf",
            bytes: &bytes,
        };

        let response = app
            .oneshot(upload_request(Some("U1"), None, Some(big)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn upload_without_multipart_content_type_is_json_400() {
        let response = app()
            .oneshot(json_request("POST", "/api/reports/upload", json!({"ownerId": "U1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn upload_extraction_failure_is_500_and_persists_nothing() {
        let store = test_store();
        let app = api_router(
            test_ctx(
                store.clone(),
                Arc::new(MockExtractor::failing("connection refused")),
                Arc::new(MockTextGenerator::new("ok")),
            ),
            &[],
        );

        let response = app
            .clone()
            .oneshot(upload_request(Some("U1"), None, Some(pdf("cbc.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "EXTRACTION_FAILED");

        let response = app.oneshot(get_request("/api/reports/U1")).await.unwrap();
        assert_eq!(response_json(response).await["data"], json!([]));
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_media_type() {
        let extractor = Arc::new(MockExtractor::new(GLUCOSE_95));
        let app = api_router(
            test_ctx(test_store(), extractor.clone(), Arc::new(MockTextGenerator::new("ok"))),
            &[],
        );
        let png = FilePart {
            filename: "scan.png",
            content_type: "image/png",
            bytes: b"\x89PNG\r\n\x1a\n",
        };
        let response = app
            .oneshot(upload_request(Some("U1"), None, Some(png)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn upload_with_unknown_schema_is_400() {
        let response = app()
            .oneshot(upload_request(Some("U1"), Some("cardiology"), Some(pdf("cbc.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn diabetes_upload_lands_in_its_own_collection() {
        let store = test_store();
        let app = app_with(
            store,
            r#"{"patientInfo":{"fullName":"Asha Rao"},"clinicalSummary":{"diabetesType":"Type 2"}}"#,
        );

        let response = app
            .clone()
            .oneshot(upload_request(Some("U1"), Some("diabetes"), Some(pdf("hba1c.pdf"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["data"]["schema"], "diabetes@1");
        assert_eq!(json["data"]["patientInfo"]["fullName"], "Asha Rao");

        let general = response_json(app.clone().oneshot(get_request("/api/reports/U1")).await.unwrap()).await;
        assert_eq!(general["data"], json!([]));
        let diabetes = response_json(
            app.oneshot(get_request("/api/reports/U1?schema=diabetes"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(diabetes["data"].as_array().unwrap().len(), 1);
    }

    // ── users ───────────────────────────────────────────

    #[tokio::test]
    async fn onboarding_then_profile_hides_password() {
        let app = app();
        let id = onboard(&app, "Asha@Example.com").await;

        let response = app
            .oneshot(get_request(&format!("/api/users/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["data"]["emailId"], "asha@example.com");
        assert_eq!(json["data"]["role"], "patient");
        assert!(json["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_onboarding_is_409() {
        let app = app();
        onboard(&app, "asha@example.com").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/users/onboarding",
                json!({
                    "emailId": "ASHA@example.com",
                    "password": "another-secret",
                    "firstName": "A",
                    "lastName": "R"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "An account with this email already exists.");
    }

    #[tokio::test]
    async fn onboarding_validates_input() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/users/onboarding",
                json!({"emailId": "a@b", "password": "short"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "Invalid Data");
        assert!(json["error"]["details"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn profile_update_applies_only_permitted_paths() {
        let app = app();
        let id = onboard(&app, "asha@example.com").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/users/{id}/profile"),
                json!({
                    "accountSettings": {"notifications": {"email": true}, "password": "x"},
                    "emailId": "evil@example.com"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["data"]["accountSettings"]["notifications"]["email"], true);
        assert_eq!(json["data"]["emailId"], "asha@example.com");
        assert!(json["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn profile_update_with_only_protected_fields_is_400() {
        let app = app();
        let id = onboard(&app, "asha@example.com").await;

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/api/users/{id}/profile"),
                json!({"password": "new-password", "role": "doctor"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NO_VALID_FIELDS");
    }

    #[tokio::test]
    async fn malformed_json_bodies_get_the_error_envelope() {
        let app = app();
        let id = onboard(&app, "asha@example.com").await;

        let broken = Request::builder()
            .method("PATCH")
            .uri(format!("/api/users/{id}/profile"))
            .header("Content-Type", "application/json")
            .body(Body::from("{\"personalInfo\": "))
            .unwrap();
        let untyped = Request::builder()
            .method("POST")
            .uri("/api/users/onboarding")
            .body(Body::from("emailId=a@b.com"))
            .unwrap();
        let wrong_type = json_request(
            "POST",
            "/api/privacy/explanation",
            json!({"profileVisibility": "Public", "dataSharing": "None", "researchParticipation": "yes"}),
        );

        for request in [broken, untyped, wrong_type] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = response_json(response).await;
            assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        }
    }

    #[tokio::test]
    async fn profile_update_for_unknown_user_is_404() {
        let response = app()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/users/{}/profile", uuid::Uuid::new_v4()),
                json!({"personalInfo": {"phone": "555-0100"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_for_malformed_id_is_400() {
        let response = app().oneshot(get_request("/api/users/not-a-uuid")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ── privacy explanation ─────────────────────────────

    #[tokio::test]
    async fn explanation_returns_sanitized_markup() {
        let app = api_router(
            test_ctx(
                test_store(),
                Arc::new(MockExtractor::new(GLUCOSE_95)),
                Arc::new(MockTextGenerator::new(
                    "<h3>Visibility</h3><p>Only <span>colleagues</span></p><br>",
                )),
            ),
            &[],
        );
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/privacy/explanation",
                json!({"profileVisibility": "Colleagues", "dataSharing": "Limited"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["message"], "Success");
        assert_eq!(json["data"], "<h3>Visibility</h3>Only <span>colleagues</span><br/>");
    }

    #[tokio::test]
    async fn explanation_requires_settings() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/privacy/explanation",
                json!({"researchParticipation": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "Missing required settings information.");
    }

    #[tokio::test]
    async fn explanation_generation_failure_is_500() {
        let app = api_router(
            test_ctx(
                test_store(),
                Arc::new(MockExtractor::new(GLUCOSE_95)),
                Arc::new(MockTextGenerator::failing("quota exceeded")),
            ),
            &[],
        );
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/privacy/explanation",
                json!({"profileVisibility": "Public", "dataSharing": "None"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(
            json["error"]["message"],
            "Failed to generate explanation from AI service."
        );
    }
}
