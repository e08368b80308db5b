pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::contact::handlers::handle_contact_submit;
use crate::export::handlers::handle_export_resume;
use crate::state::AppState;
use crate::tenant::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Tenant pages
        .route("/api/v1/tenants", get(handlers::handle_list_tenants))
        .route("/api/v1/tenants/:key/home", get(handlers::handle_home))
        .route("/api/v1/tenants/:key/resume", get(handlers::handle_resume))
        .route(
            "/api/v1/tenants/:key/portfolio",
            get(handlers::handle_portfolio),
        )
        .route("/api/v1/tenants/:key/contact", get(handlers::handle_contact))
        .route("/api/v1/links", get(handlers::handle_links))
        // Resume export
        .route(
            "/api/v1/tenants/:key/resume/export",
            post(handle_export_resume),
        )
        // Contact form
        .route("/api/v1/contact", post(handle_contact_submit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::export::pipeline::tests::{harness, RasterBehavior};
    use crate::export::ResumeExporter;
    use crate::mail_client::{ContactMessage, MailError, MailTransport};
    use crate::tenant::{CompanyDataResolver, JsonDirSource};

    const TEMPLATE: &str = "<html><head><style>p{margin:0}</style></head><body><p>{{userProfile.name}}</p></body></html>";

    #[derive(Default)]
    struct RecordingMail {
        sent: Mutex<Vec<ContactMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingMail {
        async fn submit(&self, message: &ContactMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Exhausted { retries: 3 });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn write_tenant(dir: &Path, key: &str, value: Value) {
        std::fs::write(dir.join(format!("{key}.json")), value.to_string()).unwrap();
    }

    fn data_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_tenant(
            dir.path(),
            "default",
            json!({"companyName": "Portfolio", "userProfile": {"name": "Ada Lovelace"}}),
        );
        write_tenant(
            dir.path(),
            "acme",
            json!({
                "companyName": "Acme",
                "userProfile": {"name": "Ada Lovelace", "contactEmail": "ada@example.com"},
                "positions": [{"id": "p1", "name": "Analyst", "dateStarted": "2020-01-01"}],
                "resumeTemplate": TEMPLATE
            }),
        );
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        dir
    }

    fn app(dir: &TempDir, mail: Option<Arc<dyn MailTransport>>) -> Router {
        let resolver = CompanyDataResolver::new(Arc::new(JsonDirSource::new(dir.path())));
        let exporter = ResumeExporter::new(harness(RasterBehavior::Pdf, 0, false).deps);
        build_router(AppState {
            resolver,
            exporter,
            mail,
        })
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn export_request(key: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/tenants/{key}/resume/export"));
        if let Some(session) = session {
            builder = builder.header("x-session-id", session);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn contact_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = data_dir();
        let response = send(app(&dir, None), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_tenants_hides_default() {
        let dir = data_dir();
        let response = send(app(&dir, None), get("/api/v1/tenants")).await;
        let body = json_body(response).await;
        assert_eq!(body["tenants"], json!(["acme", "broken"]));
        assert_eq!(body["default"], "default");
    }

    #[tokio::test]
    async fn test_resume_page_for_known_tenant() {
        let dir = data_dir();
        let response = send(app(&dir, None), get("/api/v1/tenants/acme/resume")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["company_name"], "Acme");
        assert_eq!(body["work_history"][0]["date_range"], "Jan 2020 - Present");
        assert_eq!(body["has_template"], true);
    }

    #[tokio::test]
    async fn test_links_follow_company_segment() {
        let dir = data_dir();
        let body = json_body(send(app(&dir, None), get("/api/v1/links?path=/acme/resume")).await).await;
        assert_eq!(body["company"], "acme");
        assert_eq!(body["links"]["portfolio"], "/acme/portfolio");

        let body = json_body(send(app(&dir, None), get("/api/v1/links?path=/resume")).await).await;
        assert!(body["company"].is_null());
        assert_eq!(body["links"]["portfolio"], "/portfolio");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tenants_are_not_found() {
        let dir = data_dir();
        for uri in [
            "/api/v1/tenants/ghost/home",
            "/api/v1/tenants/broken/portfolio",
            "/api/v1/tenants/..%2Fsecret/contact",
        ] {
            let response = send(app(&dir, None), get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["error"]["code"], "NOT_FOUND");
            assert_eq!(body["error"]["message"], "Company not found");
        }
    }

    #[tokio::test]
    async fn test_export_returns_pdf_attachment() {
        let dir = data_dir();
        let response = send(app(&dir, None), export_request("acme", Some("s1"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Ada_Lovelace_Resume.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_export_without_template_is_unprocessable() {
        let dir = data_dir();
        let response = send(app(&dir, None), export_request("default", Some("s1"))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Resume template not found");
    }

    #[tokio::test]
    async fn test_export_requires_session_header() {
        let dir = data_dir();
        let response = send(app(&dir, None), export_request("acme", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contact_submission_is_mailed() {
        let dir = data_dir();
        let mail = Arc::new(RecordingMail::default());
        let response = send(
            app(&dir, Some(mail.clone() as Arc<dyn MailTransport>)),
            contact_request(json!({
                "name": "Grace",
                "email": "grace@example.com",
                "subject": "Hello",
                "message": "Let's talk"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(mail.sent.lock().unwrap()[0].name, "Grace");
    }

    #[tokio::test]
    async fn test_contact_validation_and_transport_errors() {
        let dir = data_dir();
        let valid = json!({
            "name": "Grace",
            "email": "grace@example.com",
            "subject": "Hello",
            "message": "Let's talk"
        });

        let mut blank = valid.clone();
        blank["message"] = json!("  ");
        let response = send(
            app(&dir, Some(Arc::new(RecordingMail::default()) as Arc<dyn MailTransport>)),
            contact_request(blank),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(app(&dir, None), contact_request(valid.clone())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let failing: Arc<dyn MailTransport> = Arc::new(RecordingMail {
            fail: true,
            ..Default::default()
        });
        let response = send(app(&dir, Some(failing)), contact_request(valid)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "MAIL_ERROR");
    }
}
