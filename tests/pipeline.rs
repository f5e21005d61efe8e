//! Whole-pipeline tests against deterministic collaborators.
//!
//! `StubModel` answers `NOTE:<label>` for every image and
//! `SUMMARY:<joined notes>` for the aggregation call; `StubPdf` pretends every
//! PDF has a fixed number of pages. No model backend or pdfium is needed.

use async_trait::async_trait;
use edgequake_digest::{
    digest, digest_with, inspect_with, DigestConfig, DigestError, DigestProgressCallback,
    FailurePolicy, ImageAnalyzer, ModelError, PageRenderer, RasterUnit, UnitError,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct StubModel {
    /// Labels whose analysis fails.
    failing: HashSet<String>,
    /// Make later units answer faster than earlier ones.
    reverse_latency: bool,
    seen: Mutex<Vec<String>>,
}

impl StubModel {
    fn failing(labels: &[&str]) -> Self {
        Self {
            failing: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageAnalyzer for StubModel {
    async fn analyze(&self, unit: &RasterUnit) -> Result<String, ModelError> {
        let label = unit.label.to_string();
        let position = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(label.clone());
            seen.len() as u64
        };
        if self.reverse_latency {
            tokio::time::sleep(Duration::from_millis(200 / position)).await;
        }
        if self.failing.contains(&label) {
            return Err(ModelError::Backend(format!("model crashed on {label}")));
        }
        Ok(format!("NOTE:{label}"))
    }

    async fn summarize(&self, notes: &str) -> Result<String, ModelError> {
        Ok(format!("SUMMARY:{notes}"))
    }
}

struct StubPdf {
    pages: usize,
    corrupt: HashSet<String>,
}

impl StubPdf {
    fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            corrupt: HashSet::new(),
        }
    }

    fn check(&self, path: &Path) -> Result<(), DigestError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if self.corrupt.contains(&name) {
            return Err(DigestError::PdfOpenFailed {
                path: path.to_path_buf(),
                detail: "trailer not found".into(),
            });
        }
        Ok(())
    }
}

impl PageRenderer for StubPdf {
    fn page_count(&self, path: &Path) -> Result<usize, DigestError> {
        self.check(path)?;
        Ok(self.pages)
    }

    fn render_pages(&self, path: &Path) -> Result<Vec<Vec<u8>>, DigestError> {
        self.check(path)?;
        Ok((0..self.pages).map(|i| vec![0x89, b'P', i as u8]).collect())
    }
}

struct Workspace {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    fn new(files: &[&str]) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("edgequake_digest=debug")
            .with_test_writer()
            .try_init();

        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("data");
        let output = tmp.path().join("Output");
        std::fs::create_dir(&input).unwrap();
        for name in files {
            std::fs::write(input.join(name), name.as_bytes()).unwrap();
        }
        Self {
            _tmp: tmp,
            input,
            output,
        }
    }

    fn config(&self) -> DigestConfig {
        DigestConfig::builder()
            .input_dir(&self.input)
            .output_dir(&self.output)
            .build()
            .unwrap()
    }

    fn report_path(&self) -> PathBuf {
        self.output.join("final_summary.md")
    }
}

async fn run(
    config: &DigestConfig,
    model: StubModel,
    pdf: StubPdf,
) -> Result<edgequake_digest::DigestOutput, DigestError> {
    digest_with(config, Arc::new(model), Arc::new(pdf)).await
}

// ── End-to-end scenario ──────────────────────────────────────────────────────

#[tokio::test]
async fn image_then_two_page_pdf_produces_exact_report() {
    let ws = Workspace::new(&["a.png", "b.pdf"]);
    let out = run(&ws.config(), StubModel::default(), StubPdf::with_pages(2))
        .await
        .expect("digest should succeed");

    let expected = "# MASTER SUMMARY\n\nSUMMARY:--- a.png ---\nNOTE:a.png\n--- b.pdf Page 1 ---\nNOTE:b.pdf (Page 1)\n--- b.pdf Page 2 ---\nNOTE:b.pdf (Page 2)";
    assert_eq!(std::fs::read_to_string(ws.report_path()).unwrap(), expected);
    assert_eq!(out.report, expected);
    assert_eq!(out.report_path, ws.report_path());
    assert_eq!(out.stats.total_files, 2);
    assert_eq!(out.stats.total_units, 3);
    assert_eq!(out.stats.failed_units, 0);
}

// ── Early exits ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_folder_writes_nothing() {
    let ws = Workspace::new(&[]);
    let config = DigestConfig::builder()
        .input_dir(ws.input.join("nope"))
        .output_dir(&ws.output)
        .build()
        .unwrap();

    let err = run(&config, StubModel::default(), StubPdf::with_pages(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::InputDirMissing { .. }), "got {err}");
    assert!(!ws.report_path().exists());
}

#[tokio::test]
async fn folder_without_eligible_files_writes_nothing() {
    let ws = Workspace::new(&["notes.txt", "photo.jpeg", "scan.tiff"]);
    let model = StubModel::default();

    let err = digest_with(&ws.config(), Arc::new(model), Arc::new(StubPdf::with_pages(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::NoInputFiles { .. }), "got {err}");
    assert!(!ws.report_path().exists());
    // The output folder itself is created before files are listed.
    assert!(ws.output.is_dir());
}

#[tokio::test]
async fn empty_folder_is_reported_before_the_provider_is_built() {
    let ws = Workspace::new(&["notes.txt"]);
    let config = DigestConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .provider_name("no-such-provider")
        .build()
        .unwrap();

    let err = digest(&config).await.unwrap_err();
    assert!(matches!(err, DigestError::NoInputFiles { .. }), "got {err}");
    assert!(ws.output.is_dir(), "output folder is created before listing");
    assert!(!ws.report_path().exists());
}

#[tokio::test]
async fn missing_folder_is_reported_before_the_provider_is_built() {
    let ws = Workspace::new(&[]);
    let config = DigestConfig::builder()
        .input_dir(ws.input.join("nope"))
        .output_dir(&ws.output)
        .provider_name("no-such-provider")
        .build()
        .unwrap();

    let err = digest(&config).await.unwrap_err();
    assert!(matches!(err, DigestError::InputDirMissing { .. }), "got {err}");
    assert!(!ws.output.exists());
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_become_numbered_notes() {
    let ws = Workspace::new(&["deck.PDF"]);
    let out = run(&ws.config(), StubModel::default(), StubPdf::with_pages(4))
        .await
        .unwrap();

    let labels: Vec<String> = out.notes.iter().map(|n| n.label.to_string()).collect();
    assert_eq!(
        labels,
        vec![
            "deck.PDF (Page 1)",
            "deck.PDF (Page 2)",
            "deck.PDF (Page 3)",
            "deck.PDF (Page 4)"
        ]
    );
}

#[tokio::test]
async fn single_image_note_has_bare_label() {
    let ws = Workspace::new(&["chart.jpg"]);
    let out = run(&ws.config(), StubModel::default(), StubPdf::with_pages(9))
        .await
        .unwrap();

    assert_eq!(out.notes.len(), 1);
    assert_eq!(out.notes[0].label.page, None);
    assert_eq!(out.notes[0].render(), "--- chart.jpg ---\nNOTE:chart.jpg");
}

#[tokio::test]
async fn corrupt_pdf_aborts_by_default() {
    let ws = Workspace::new(&["a.png", "broken.pdf"]);
    let pdf = StubPdf {
        pages: 1,
        corrupt: ["broken.pdf".to_string()].into_iter().collect(),
    };

    let err = run(&ws.config(), StubModel::default(), pdf).await.unwrap_err();
    assert!(matches!(err, DigestError::PdfOpenFailed { .. }), "got {err}");
    assert!(!ws.report_path().exists());
}

#[tokio::test]
async fn corrupt_pdf_is_skipped_under_degrade() {
    let ws = Workspace::new(&["a.png", "broken.pdf", "c.png"]);
    let config = DigestConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .extraction_failure(FailurePolicy::Degrade)
        .build()
        .unwrap();
    let pdf = StubPdf {
        pages: 1,
        corrupt: ["broken.pdf".to_string()].into_iter().collect(),
    };

    let out = run(&config, StubModel::default(), pdf).await.unwrap();
    assert_eq!(out.notes.len(), 3);
    assert_eq!(out.notes[1].label.to_string(), "broken.pdf");
    assert!(out.notes[1].text.starts_with("Error: PDF '"));
    assert!(matches!(
        out.notes[1].error,
        Some(UnitError::ExtractionFailed { .. })
    ));
    assert_eq!(out.stats.skipped_files, 1);
    assert_eq!(out.stats.total_units, 2);
    assert_eq!(out.notes[2].text, "NOTE:c.png");
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn notes_follow_discovery_then_page_order() {
    // Created in reverse to make sure order comes from the names, not the
    // directory listing.
    let ws = Workspace::new(&["f2.png", "f1.pdf"]);
    let out = run(&ws.config(), StubModel::default(), StubPdf::with_pages(2))
        .await
        .unwrap();

    let summary = &out.summary;
    let p1 = summary.find("--- f1.pdf Page 1 ---").unwrap();
    let p2 = summary.find("--- f1.pdf Page 2 ---").unwrap();
    let img = summary.find("--- f2.png ---").unwrap();
    assert!(p1 < p2 && p2 < img, "unexpected order in {summary}");
}

#[tokio::test]
async fn concurrent_run_matches_sequential_run() {
    let ws = Workspace::new(&["a.png", "b.pdf", "c.jpg", "d.pdf"]);

    let sequential = run(&ws.config(), StubModel::default(), StubPdf::with_pages(3))
        .await
        .unwrap();

    let config = DigestConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .concurrency(4)
        .build()
        .unwrap();
    let model = StubModel {
        reverse_latency: true,
        ..Default::default()
    };
    let concurrent = run(&config, model, StubPdf::with_pages(3)).await.unwrap();

    assert_eq!(concurrent.report, sequential.report);
    assert_eq!(concurrent.notes.len(), 8);
}

// ── Model failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn one_failing_unit_does_not_abort_the_run() {
    let ws = Workspace::new(&["a.png", "b.pdf"]);
    let model = StubModel::failing(&["b.pdf (Page 1)"]);

    let out = run(&ws.config(), model, StubPdf::with_pages(2)).await.unwrap();
    let report = std::fs::read_to_string(ws.report_path()).unwrap();

    assert!(report.contains("--- a.png ---\nNOTE:a.png"));
    assert!(report.contains("--- b.pdf Page 1 ---\nError: model crashed on b.pdf (Page 1)"));
    assert!(report.contains("--- b.pdf Page 2 ---\nNOTE:b.pdf (Page 2)"));
    assert_eq!(report.matches("Error: ").count(), 1);
    assert_eq!(out.stats.failed_units, 1);
    assert_eq!(out.stats.total_units, 3);
}

#[tokio::test]
async fn failing_unit_aborts_under_fail_fast() {
    let ws = Workspace::new(&["a.png", "b.png"]);
    let config = DigestConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .model_failure(FailurePolicy::FailFast)
        .build()
        .unwrap();

    let err = run(&config, StubModel::failing(&["b.png"]), StubPdf::with_pages(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::ModelFailed { .. }), "got {err}");
    assert!(!ws.report_path().exists());
}

// ── Output handling ──────────────────────────────────────────────────────────

#[tokio::test]
async fn rerun_overwrites_previous_report() {
    let ws = Workspace::new(&["a.png", "b.png", "c.png"]);
    run(&ws.config(), StubModel::default(), StubPdf::with_pages(1))
        .await
        .unwrap();
    let first = std::fs::read_to_string(ws.report_path()).unwrap();

    std::fs::remove_file(ws.input.join("b.png")).unwrap();
    std::fs::remove_file(ws.input.join("c.png")).unwrap();
    let second = run(&ws.config(), StubModel::default(), StubPdf::with_pages(1))
        .await
        .unwrap();

    let on_disk = std::fs::read_to_string(ws.report_path()).unwrap();
    assert_eq!(on_disk, second.report);
    assert_eq!(on_disk, "# MASTER SUMMARY\n\nSUMMARY:--- a.png ---\nNOTE:a.png");
    assert!(first.len() > on_disk.len());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl DigestProgressCallback for Events {
    fn on_output_dir_created(&self, _path: &Path) {
        self.0.lock().unwrap().push("mkdir".into());
    }
    fn on_run_start(&self, total_files: usize) {
        self.0.lock().unwrap().push(format!("files {total_files}"));
    }
    fn on_unit_start(&self, label: &str) {
        self.0.lock().unwrap().push(format!("reading {label}"));
    }
    fn on_unit_error(&self, label: &str, _error: &str) {
        self.0.lock().unwrap().push(format!("failed {label}"));
    }
    fn on_summary_start(&self, note_count: usize) {
        self.0.lock().unwrap().push(format!("summary {note_count}"));
    }
    fn on_report_written(&self, path: &Path, _summary_len: usize) {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.0.lock().unwrap().push(format!("saved {name}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_pipeline_order() {
    let ws = Workspace::new(&["a.png", "b.pdf"]);
    let events = Arc::new(Events::default());
    let config = DigestConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .progress_callback(events.clone())
        .build()
        .unwrap();

    run(&config, StubModel::failing(&["a.png"]), StubPdf::with_pages(1))
        .await
        .unwrap();

    assert_eq!(
        *events.0.lock().unwrap(),
        vec![
            "mkdir",
            "files 2",
            "reading a.png",
            "failed a.png",
            "reading b.pdf (Page 1)",
            "summary 2",
            "saved final_summary.md",
        ]
    );
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inspect_lists_units_without_touching_output() {
    let ws = Workspace::new(&["a.png", "b.pdf", "skip.txt"]);
    let files = inspect_with(&ws.config(), Arc::new(StubPdf::with_pages(5)))
        .await
        .unwrap();

    let summary: Vec<(String, String, usize)> = files
        .into_iter()
        .map(|f| (f.file_name, f.kind, f.units))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a.png".to_string(), "png".to_string(), 1),
            ("b.pdf".to_string(), "pdf".to_string(), 5),
        ]
    );
    assert!(!ws.output.exists());
}
