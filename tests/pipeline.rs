//! Page pipeline behaviour against in-process fakes.
//!
//! No PDF library and no network: see `common/mod.rs`.

mod common;

use common::{block, config, pipeline, FakeLoader, FakeTransport, Ocr, PDF_BYTES};
use futures::StreamExt;
use pdf2notes::{
    CancelHandle, FailurePolicy, NotesError, NotesProgressCallback, PageError, PageSelection,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, OnceLock};

fn texts(script: &[(usize, &str)]) -> Arc<FakeTransport> {
    Arc::new(FakeTransport::new(
        script.iter().map(|&(p, t)| (p, Ocr::text(t))),
    ))
}

// ── Combined notes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_pages_contribute_nothing() {
    let t = texts(&[(1, "alpha"), (2, ""), (3, "gamma"), (4, "  \n ")]);
    let p = pipeline(config().build().unwrap(), FakeLoader::new(4), &t);

    let html = p.process_page_by_page(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(html, format!("{}{}", block(1, "alpha"), block(3, "gamma")));
    assert!(!html.contains("Page 2"));
    assert_eq!(t.ocr_calls.load(Ordering::SeqCst), 4);
    assert_eq!(t.generation_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn output_records_every_page() {
    let t = texts(&[(1, "alpha"), (2, ""), (3, "gamma")]);
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3), &t);

    let out = p.process(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(out.pages.len(), 3);
    assert_eq!(
        out.pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(out.pages[1].is_empty_page());
    assert_eq!(out.pages[2].recognized_text, "gamma");
    assert_eq!(out.stats.total_pages, 3);
    assert_eq!(out.stats.noted_pages, 2);
    assert_eq!(out.stats.empty_pages, 1);
    assert_eq!(out.stats.failed_pages, 0);
}

#[tokio::test]
async fn page_selection_limits_work() {
    let t = Arc::new(FakeTransport::with_pages(5));
    let cfg = config().pages(PageSelection::Range(2, 3)).build().unwrap();
    let p = pipeline(cfg, FakeLoader::new(5), &t);

    let html = p.process_page_by_page(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(
        html,
        format!("{}{}", block(2, "text of page 2"), block(3, "text of page 3"))
    );
    assert_eq!(t.ocr_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn selection_outside_document_is_rejected() {
    let t = Arc::new(FakeTransport::with_pages(2));
    let cfg = config().pages(PageSelection::Single(9)).build().unwrap();
    let p = pipeline(cfg, FakeLoader::new(2), &t);

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();
    assert!(matches!(err, NotesError::PageOutOfRange { total: 2, .. }));
    assert_eq!(t.total_calls(), 0);
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_run_sequentially_by_default() {
    let t = Arc::new(FakeTransport::with_pages(4).staggered());
    let p = pipeline(config().build().unwrap(), FakeLoader::new(4), &t);

    p.process(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(*t.ocr_order.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn concurrent_pages_keep_page_order() {
    let t = Arc::new(FakeTransport::with_pages(6).staggered());
    let cfg = config().concurrency(4).build().unwrap();
    let p = pipeline(cfg, FakeLoader::new(6), &t);

    let html = p.process_page_by_page(PDF_BYTES.to_vec()).await.unwrap();

    let expected: String = (1..=6)
        .map(|i| block(i, &format!("text of page {i}")))
        .collect();
    assert_eq!(html, expected);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ocr_failure_aborts_the_run() {
    let t = Arc::new(FakeTransport::new([
        (1, Ocr::text("alpha")),
        (2, Ocr::Status(500)),
        (3, Ocr::text("gamma")),
    ]));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3), &t);

    let err = p.process_page_by_page(PDF_BYTES.to_vec()).await.unwrap_err();

    assert!(matches!(err, NotesError::PageFailed { page: 2, .. }), "got {err}");
    assert!(matches!(
        err.root_cause(),
        NotesError::Upstream {
            status: Some(500),
            ..
        }
    ));
    assert_eq!(t.ocr_calls.load(Ordering::SeqCst), 2, "page 3 must not start");
    assert_eq!(t.generation_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generation_failure_aborts_the_run() {
    let t = Arc::new(FakeTransport::with_pages(3).failing_generation_for("Page 1:"));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3), &t);

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();

    let NotesError::PageFailed { page, source } = &err else {
        panic!("expected PageFailed, got {err}");
    };
    assert_eq!(*page, 1);
    assert!(matches!(**source, NotesError::GenerationFailed { .. }));
    assert!(err.to_string().contains("Page 1"));
    assert_eq!(t.ocr_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn render_failure_names_the_page() {
    let t = Arc::new(FakeTransport::with_pages(3));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3).failing_render(2), &t);

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();

    assert_eq!(err.page(), Some(2));
    assert!(matches!(
        err.root_cause(),
        NotesError::RasterisationFailed { page: 2, .. }
    ));
}

#[tokio::test]
async fn keep_going_records_failed_pages() {
    let t = Arc::new(FakeTransport::new([
        (1, Ocr::text("alpha")),
        (2, Ocr::Status(503)),
        (3, Ocr::text("gamma")),
    ]));
    let cfg = config()
        .failure_policy(FailurePolicy::SkipFailedPages)
        .build()
        .unwrap();
    let p = pipeline(cfg, FakeLoader::new(3), &t);

    let out = p.process(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(out.html, format!("{}{}", block(1, "alpha"), block(3, "gamma")));
    assert_eq!(out.stats.failed_pages, 1);
    assert_eq!(out.stats.noted_pages, 2);
    assert!(matches!(
        out.pages[1].error,
        Some(PageError::OcrFailed { page: 2, .. })
    ));
}

#[tokio::test]
async fn keep_going_still_fails_when_every_page_fails() {
    let t = Arc::new(FakeTransport::new([(1, Ocr::Status(500)), (2, Ocr::Status(500))]));
    let cfg = config()
        .failure_policy(FailurePolicy::SkipFailedPages)
        .build()
        .unwrap();
    let p = pipeline(cfg, FakeLoader::new(2), &t);

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();
    assert!(matches!(err, NotesError::AllPagesFailed { total: 2, .. }));
}

// ── Input checks ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_text_is_rejected_before_any_request() {
    let t = Arc::new(FakeTransport::with_pages(1));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(1), &t);

    let err = p.generator().generate_notes("  \n").await.unwrap_err();

    assert!(matches!(err, NotesError::InvalidInput { .. }));
    assert_eq!(t.total_calls(), 0);
}

#[tokio::test]
async fn non_pdf_bytes_are_rejected_before_any_request() {
    let t = Arc::new(FakeTransport::with_pages(1));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(1), &t);

    let err = p.process(b"<html>".to_vec()).await.unwrap_err();

    assert!(matches!(err, NotesError::NotAPdf { .. }));
    assert_eq!(t.total_calls(), 0);
}

#[tokio::test]
async fn inspect_makes_no_requests() {
    let t = Arc::new(FakeTransport::with_pages(7));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(7), &t);

    let info = p.inspect(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(info.page_count, 7);
    assert_eq!(info.byte_len, PDF_BYTES.len());
    assert_eq!(t.total_calls(), 0);
}

// ── OCR-only pass ────────────────────────────────────────────────────────────

#[tokio::test]
async fn recognize_pages_concatenates_text() {
    let t = texts(&[(1, "alpha"), (2, ""), (3, "gamma")]);
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3), &t);
    let doc = p.load(PDF_BYTES.to_vec()).await.unwrap();

    let text = p.recognize_pages(doc.as_ref(), &[1, 2, 3], 1.5).await.unwrap();

    assert_eq!(text, "alpha\n\n\n\ngamma\n\n");
    assert_eq!(t.generation_calls.load(Ordering::SeqCst), 0);
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_before_start_does_nothing() {
    let t = Arc::new(FakeTransport::with_pages(3));
    let p = pipeline(config().build().unwrap(), FakeLoader::new(3), &t);
    p.cancel_handle().cancel();

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();

    assert!(matches!(err, NotesError::Cancelled { page: 1 }));
    assert_eq!(t.total_calls(), 0);
}

/// Cancels the run as soon as the first page completes.
#[derive(Default)]
struct CancelAfterFirst {
    handle: OnceLock<CancelHandle>,
}

impl NotesProgressCallback for CancelAfterFirst {
    fn on_page_complete(&self, _page_num: usize, _total: usize, _html_len: usize) {
        if let Some(h) = self.handle.get() {
            h.cancel();
        }
    }
}

#[tokio::test]
async fn cancel_stops_before_the_next_page() {
    let t = Arc::new(FakeTransport::with_pages(3));
    let cb = Arc::new(CancelAfterFirst::default());
    let cfg = config()
        .failure_policy(FailurePolicy::SkipFailedPages)
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let p = pipeline(cfg, FakeLoader::new(3), &t);
    cb.handle.set(p.cancel_handle()).ok();

    let err = p.process(PDF_BYTES.to_vec()).await.unwrap_err();

    assert!(matches!(err, NotesError::Cancelled { page: 2 }), "got {err}");
    assert_eq!(t.ocr_calls.load(Ordering::SeqCst), 1);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl NotesProgressCallback for Recorder {
    fn on_run_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
        self.events.lock().unwrap().push(format!("done {page_num}"));
    }
    fn on_page_skipped(&self, page_num: usize, _total: usize) {
        self.events.lock().unwrap().push(format!("skip {page_num}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("error {page_num}"));
    }
    fn on_run_complete(&self, total_pages: usize, noted_pages: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("end {noted_pages}/{total_pages}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_run() {
    let t = Arc::new(FakeTransport::new([
        (1, Ocr::text("alpha")),
        (2, Ocr::text("")),
        (3, Ocr::Status(500)),
    ]));
    let rec = Arc::new(Recorder::default());
    let cfg = config()
        .failure_policy(FailurePolicy::SkipFailedPages)
        .progress_callback(rec.clone())
        .build()
        .unwrap();
    let p = pipeline(cfg, FakeLoader::new(3), &t);

    p.process(PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(
        *rec.events.lock().unwrap(),
        vec!["start 3", "done 1", "skip 2", "error 3", "end 1/3"]
    );
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_pages_in_order_and_continues_past_errors() {
    let t = Arc::new(
        FakeTransport::new([
            (1, Ocr::text("alpha")),
            (2, Ocr::Status(500)),
            (3, Ocr::text("gamma")),
        ])
        .staggered(),
    );
    let cfg = config().concurrency(3).build().unwrap();
    let p = pipeline(cfg, FakeLoader::new(3), &t);

    let items: Vec<_> = p
        .process_stream(PDF_BYTES.to_vec())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().page_num, 1);
    assert!(matches!(
        items[1],
        Err(NotesError::PageFailed { page: 2, .. })
    ));
    let third = items[2].as_ref().unwrap();
    assert_eq!(third.html_block().unwrap(), block(3, "gamma"));
}
