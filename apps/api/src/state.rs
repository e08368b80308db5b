use std::sync::Arc;

use crate::export::ResumeExporter;
use crate::mail_client::MailTransport;
use crate::tenant::CompanyDataResolver;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub resolver: CompanyDataResolver,
    pub exporter: ResumeExporter,
    /// `None` when no mail API is configured; the contact endpoint answers 503.
    pub mail: Option<Arc<dyn MailTransport>>,
}
