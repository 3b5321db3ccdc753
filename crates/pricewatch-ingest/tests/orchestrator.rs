//! Integration tests for `Orchestrator::run_once` against wiremock listings
//! and an in-memory sink.

use std::sync::Mutex;
use std::time::Duration;

use pricewatch_core::{
    ExtractorKind, PairReport, PairStatus, ReconcileOutcome, RunSummary, ScrapePair, ScrapeResult,
};
use pricewatch_ingest::{BatchSink, Orchestrator, RunFilter, RunObserver};
use pricewatch_scraper::{FetchPolicy, PageFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Jumia catalog page with one card per entry; `None` omits the price node.
fn jumia_page(prices: &[Option<u32>]) -> String {
    let cards: String = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let price = price
                .map(|p| format!(r#"<div class="prc">KSh {p}</div>"#))
                .unwrap_or_default();
            format!(
                r#"<article class="prd _fb col c-prd">
                     <a class="core" href="/phone-{i}.html" data-name="Phone {i}">
                       <div class="info"><h3 class="name">Phone {i}</h3>{price}</div>
                     </a>
                   </article>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"row\">{cards}</div></body></html>")
}

fn kilimall_page(ids: &[u32]) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="product-item">
                     <a class="product-link" href="/item/{id}.html">
                       <p class="product-title">TV {id}</p>
                     </a>
                     <div class="product-price">KSh 12,{id:03}</div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body>{cards}</body></html>")
}

fn jumia_phones(base_url: &str) -> ScrapePair {
    ScrapePair {
        platform: "Jumia".to_owned(),
        base_url: base_url.to_owned(),
        category: "Mobile Phones".to_owned(),
        slug: "mobile-phones/".to_owned(),
        extractor: ExtractorKind::JumiaCatalog,
        page_cap: 3,
    }
}

fn kilimall_tvs(base_url: &str) -> ScrapePair {
    ScrapePair {
        platform: "Kilimall".to_owned(),
        base_url: base_url.to_owned(),
        category: "Televisions".to_owned(),
        slug: "category/television".to_owned(),
        extractor: ExtractorKind::Kilimall,
        page_cap: 1,
    }
}

async fn mount(server: &MockServer, route: &str, page: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Jumia phones: page 1 has 10 cards, 3 without a price; page 2 is empty.
async fn mount_jumia(server: &MockServer) {
    let prices = [
        Some(100),
        None,
        Some(200),
        Some(300),
        None,
        Some(400),
        Some(500),
        None,
        Some(600),
        Some(700),
    ];
    mount(server, "/mobile-phones/", "1", 200, jumia_page(&prices)).await;
    mount(server, "/mobile-phones/", "2", 200, jumia_page(&[])).await;
}

fn orchestrator<S: BatchSink>(
    pairs: Vec<ScrapePair>,
    sink: S,
) -> Orchestrator<S, RecordingObserver> {
    let fetcher = PageFetcher::new(Duration::from_secs(5), Vec::new())
        .expect("failed to build PageFetcher");
    Orchestrator::new(pairs, fetcher, FetchPolicy::immediate(2), "KES", sink)
        .with_observer(RecordingObserver::default())
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("sink unavailable")]
struct SinkDown;

#[derive(Default)]
struct MemorySink {
    fail_reconcile_for: Option<&'static str>,
    fail_ledger: bool,
    batches: Mutex<Vec<(String, String, Vec<ScrapeResult>)>>,
    opened: Mutex<Vec<bool>>,
    recorded: Mutex<Vec<PairReport>>,
    closed: Mutex<Vec<RunSummary>>,
}

impl BatchSink for MemorySink {
    type Error = SinkDown;

    async fn open_run(&self, dry_run: bool) -> Result<i64, SinkDown> {
        if self.fail_ledger {
            return Err(SinkDown);
        }
        let mut opened = self.opened.lock().unwrap();
        opened.push(dry_run);
        Ok(i64::try_from(opened.len()).unwrap())
    }

    async fn reconcile(
        &self,
        platform: &str,
        category: &str,
        results: &[ScrapeResult],
    ) -> Result<ReconcileOutcome, SinkDown> {
        if self.fail_reconcile_for == Some(platform) {
            return Err(SinkDown);
        }
        self.batches.lock().unwrap().push((
            platform.to_owned(),
            category.to_owned(),
            results.to_vec(),
        ));
        Ok(ReconcileOutcome {
            created: u32::try_from(results.len()).unwrap(),
            ..ReconcileOutcome::default()
        })
    }

    async fn record_pair(&self, _run_id: i64, report: &PairReport) -> Result<(), SinkDown> {
        self.recorded.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn close_run(&self, _run_id: i64, summary: &RunSummary) -> Result<(), SinkDown> {
        self.closed.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RunObserver for RecordingObserver {
    fn run_started(&self, run_id: Option<i64>, pairs: usize, dry_run: bool) {
        self.events
            .lock()
            .unwrap()
            .push(format!("run_started:{run_id:?}:{pairs}:{dry_run}"));
    }

    fn pair_finished(&self, report: &PairReport) {
        self.events
            .lock()
            .unwrap()
            .push(format!("pair:{}:{}", report.platform, report.status));
    }

    fn ledger_failed(&self, stage: &'static str, _error: &(dyn std::error::Error + 'static)) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ledger_failed:{stage}"));
    }

    fn run_finished(&self, _run_id: Option<i64>, summary: &RunSummary) {
        self.events
            .lock()
            .unwrap()
            .push(format!("run_finished:{}", summary.pairs_attempted));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_items_are_skipped_and_counted() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;

    let orch = orchestrator(vec![jumia_phones(&server.uri())], MemorySink::default());
    let summary = orch.run_once(&RunFilter::default()).await;

    assert_eq!(summary.products_seen, 7);
    assert_eq!(summary.created, 7);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.pairs_failed, 0);

    let batches = orch.sink().batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let (platform, category, results) = &batches[0];
    assert_eq!(platform, "Jumia");
    assert_eq!(category, "Mobile Phones");
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["Phone 0", "Phone 2", "Phone 3", "Phone 5", "Phone 6", "Phone 8", "Phone 9"]
    );
}

#[tokio::test]
async fn fetch_failure_is_isolated_to_its_pair() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;
    mount(&server, "/category/television", "1", 500, String::new()).await;

    let pairs = vec![kilimall_tvs(&server.uri()), jumia_phones(&server.uri())];
    let orch = orchestrator(pairs, MemorySink::default());
    let summary = orch.run_once(&RunFilter::default()).await;

    assert_eq!(summary.pairs_attempted, 2);
    assert_eq!(summary.pairs_failed, 1);
    assert_eq!(summary.created, 7);
    assert!(!summary.all_failed());

    let failed = &summary.pairs[0];
    assert_eq!(failed.platform, "Kilimall");
    assert_eq!(failed.status, PairStatus::Failed);
    let error = failed.error.as_deref().unwrap();
    assert!(error.contains("fetch failed"), "got: {error}");
    assert_eq!(summary.pairs[1].status, PairStatus::Succeeded);

    assert_eq!(summary.by_platform["Kilimall"].pairs_failed, 1);
    assert_eq!(summary.by_platform["Jumia"].created, 7);
}

#[tokio::test]
async fn reconcile_failure_is_isolated_to_its_pair() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;
    mount(&server, "/category/television", "1", 200, kilimall_page(&[1, 2])).await;

    let sink = MemorySink {
        fail_reconcile_for: Some("Jumia"),
        ..MemorySink::default()
    };
    let pairs = vec![jumia_phones(&server.uri()), kilimall_tvs(&server.uri())];
    let orch = orchestrator(pairs, sink);
    let summary = orch.run_once(&RunFilter::default()).await;

    let jumia = &summary.pairs[0];
    assert_eq!(jumia.status, PairStatus::Failed);
    assert_eq!(jumia.products_seen, 7);
    assert_eq!(jumia.error.as_deref(), Some("reconcile failed: sink unavailable"));

    let kilimall = &summary.pairs[1];
    assert_eq!(kilimall.status, PairStatus::Succeeded);
    assert_eq!(kilimall.outcome.created, 2);
    assert_eq!(summary.created, 2);
}

#[tokio::test]
async fn dry_run_never_reconciles() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;

    let orch = orchestrator(vec![jumia_phones(&server.uri())], MemorySink::default());
    let summary = orch
        .run_once(&RunFilter {
            dry_run: true,
            ..RunFilter::default()
        })
        .await;

    assert_eq!(summary.products_seen, 7);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.pairs[0].status, PairStatus::DryRun);
    assert!(orch.sink().batches.lock().unwrap().is_empty());
    assert_eq!(*orch.sink().opened.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn ledger_records_every_pair_and_closes_run() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;
    mount(&server, "/category/television", "1", 503, String::new()).await;

    let pairs = vec![jumia_phones(&server.uri()), kilimall_tvs(&server.uri())];
    let orch = orchestrator(pairs, MemorySink::default());
    let summary = orch.run_once(&RunFilter::default()).await;

    let recorded = orch.sink().recorded.lock().unwrap();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].platform, "Jumia");
    assert_eq!(recorded[1].status, PairStatus::Failed);

    let closed = orch.sink().closed.lock().unwrap();
    assert_eq!(closed.as_slice(), &[summary]);
}

#[tokio::test]
async fn all_pairs_failing_is_reported_not_raised() {
    let server = MockServer::start().await;
    mount(&server, "/mobile-phones/", "1", 500, String::new()).await;
    mount(&server, "/category/television", "1", 500, String::new()).await;

    let pairs = vec![jumia_phones(&server.uri()), kilimall_tvs(&server.uri())];
    let orch = orchestrator(pairs, MemorySink::default());
    let summary = orch.run_once(&RunFilter::default()).await;

    assert!(summary.all_failed());
    assert_eq!(summary.created, 0);
    assert!(orch.sink().batches.lock().unwrap().is_empty());
    assert_eq!(orch.sink().closed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn ledger_outage_does_not_stop_the_run() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;

    let sink = MemorySink {
        fail_ledger: true,
        ..MemorySink::default()
    };
    let orch = orchestrator(vec![jumia_phones(&server.uri())], sink);
    let summary = orch.run_once(&RunFilter::default()).await;

    assert_eq!(summary.created, 7);
    assert!(orch.sink().recorded.lock().unwrap().is_empty());
    assert!(orch.sink().closed.lock().unwrap().is_empty());

    assert_eq!(
        orch.observer().events(),
        [
            "ledger_failed:open_run",
            "run_started:None:1:false",
            "pair:Jumia:succeeded",
            "run_finished:1",
        ]
    );
}

#[tokio::test]
async fn filter_selects_pairs_in_configured_order() {
    let server = MockServer::start().await;
    mount_jumia(&server).await;
    mount(&server, "/category/television", "1", 200, kilimall_page(&[7])).await;

    let pairs = vec![jumia_phones(&server.uri()), kilimall_tvs(&server.uri())];
    let orch = orchestrator(pairs, MemorySink::default());
    let summary = orch
        .run_once(&RunFilter {
            platform: Some("kilimall".to_owned()),
            ..RunFilter::default()
        })
        .await;

    assert_eq!(summary.pairs_attempted, 1);
    assert_eq!(summary.pairs[0].platform, "Kilimall");
    assert_eq!(orch.observer().events()[0], "run_started:Some(1):1:false");
}

#[tokio::test]
async fn empty_selection_opens_no_run() {
    let orch = orchestrator(
        vec![jumia_phones("http://127.0.0.1:9")],
        MemorySink::default(),
    );
    let summary = orch
        .run_once(&RunFilter {
            category: Some("Laptops".to_owned()),
            ..RunFilter::default()
        })
        .await;

    assert_eq!(summary, RunSummary::default());
    assert!(orch.sink().opened.lock().unwrap().is_empty());
    assert!(orch.observer().events().is_empty());
}
