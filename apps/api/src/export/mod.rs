// Resume export: template engine, isolation, rendering surface, rasterizer and
// the per-session state machine tying them together.
// Template rendering is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod engine;
pub mod handlers;
pub mod isolate;
pub mod page;
pub mod pipeline;
pub mod rasterizer;
pub mod surface;

use std::sync::Arc;

use crate::config::Config;

pub use engine::{BuiltinEngineProvider, EngineHandle};
pub use page::default_page_config;
pub use pipeline::{ExportDeps, ExportError, ResumeExporter, SettlePolicy};
pub use rasterizer::CommandRasterizer;
pub use surface::TempDirSurfaceFactory;

/// Collaborators for the running service: temp-dir surfaces converted by the
/// configured HTML-to-PDF binary. Temp-dir surfaces cannot observe loading,
/// so the settle budget is spent inside the rasterizer.
pub fn command_export_deps(config: &Config) -> ExportDeps {
    ExportDeps {
        engine: EngineHandle::new(Arc::new(BuiltinEngineProvider::new(
            config.template_partials_dir.clone(),
        ))),
        surfaces: Arc::new(TempDirSurfaceFactory::new(config.export_work_dir.clone())),
        rasterizer: Arc::new(CommandRasterizer::new(&config.rasterizer_bin)),
        page: default_page_config(),
        settle: SettlePolicy::default(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use crate::export::pipeline::tests::resume_bundle;
    use crate::export::pipeline::{ExportOutcome, ExportPipeline};

    /// Stand-in converter: records its arguments and writes a minimal PDF to
    /// the last one.
    fn write_stub_converter(dir: &Path) -> String {
        let bin = dir.join("fake-wkhtmltopdf");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > {}\nfor last; do :; done\nprintf '%%PDF-1.4 stub' > \"$last\"\n",
            dir.join("args.txt").display()
        );
        std::fs::write(&bin, script).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        bin.display().to_string()
    }

    #[tokio::test]
    async fn test_command_deps_pass_settle_budget_to_converter() {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let bin = write_stub_converter(tools.path());
        let config = Config::from_lookup(|key| match key {
            "RASTERIZER_BIN" => Some(bin.clone()),
            "EXPORT_WORK_DIR" => Some(work.path().display().to_string()),
            _ => None,
        })
        .unwrap();
        let deps = command_export_deps(&config);

        let bundle = resume_bundle(Some("<html><body><p>{{userProfile.name}}</p></body></html>"));
        let outcome = ExportPipeline::default()
            .export(&deps, &bundle)
            .await
            .unwrap();
        let ExportOutcome::Ready(pdf) = outcome else {
            panic!("expected a pdf");
        };
        assert!(pdf.bytes.starts_with(b"%PDF"));

        let args = std::fs::read_to_string(tools.path().join("args.txt")).unwrap();
        assert!(args.contains("--javascript-delay 1000"), "args: {args}");
        assert!(args.contains("--viewport-size 850x1100"), "args: {args}");
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }
}
