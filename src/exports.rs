//! Export resolution: which visualizations have a static fallback, and
//! making sure the ones a page embeds do.
//!
//! Rendering a chart export is the slowest step of a page bake; a single
//! visualization can take seconds in the external renderer. This module
//! skips renders whose output is already current and never renders the same
//! export twice at once.
//!
//! # Design
//!
//! ## The exports directory is the table
//!
//! Exports live in one directory, one file per export, named by
//! [`naming::export_file_name`](crate::naming::export_file_name):
//!
//! ```text
//! exports/
//! ├── co2-emissions_v12_850x600.svg
//! ├── co2-emissions_v11_850x600.svg     ← superseded, ignored
//! └── gdp-3f2a9c01b7de_v4_850x600.svg
//! ```
//!
//! [`ExportStore::lookup_all`] lists the directory and keeps the highest
//! version per key. Nothing else is persisted.
//!
//! ## Keys
//!
//! An embed reference maps to a key through [`export_key`]: the last path
//! segment of the URL (the chart slug), plus `-` and a 12-hex-char SHA-256
//! prefix of the query string when there is one. The same chart embedded
//! with different query parameters (tab, country selection) gets its own
//! export.
//!
//! ## Freshness
//!
//! An export is current when the table holds the key at a version greater or
//! equal to the chart's current config version (versions only grow). Stale
//! or missing exports are rendered through the [`ExportRenderer`].
//!
//! ## In-flight de-duplication
//!
//! Each `(key, version)` being rendered owns a shared [`OnceCell`]. The
//! first caller drives the render inside `get_or_init`; every concurrent
//! caller, from the same page or another, awaits the same cell. The map lock
//! is only held to fetch the cell. A slot is dropped once it resolves, and
//! the directory is checked again before each render, so a finished export
//! is never rendered twice and a failed one is retried by the next bake.
//!
//! ## Bounded waits
//!
//! The render itself, not each wait on it, is capped by the store's render
//! timeout: all waiters on a slot see the same timed-out outcome and the
//! render is dropped. A page whose export does not arrive in time is baked
//! without it.

use crate::collab::{ChartStore, CmsError, ExportRenderer, RenderRequest};
use crate::links::{last_segment, split_url};
use crate::naming::parse_export_file_name;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Number of hex chars of the query hash appended to a key.
const QUERY_HASH_LEN: usize = 12;

/// Default cap on waiting for one export.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ExportStoreError {
    #[error("chart store unavailable: {0}")]
    Upstream(#[from] CmsError),
}

/// A rendered export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub key: String,
    /// Public URL of the export file.
    pub url: String,
    pub version: u64,
    pub width: u32,
    pub height: u32,
}

/// Current exports by key. At most one record per key: the highest version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    records: BTreeMap<String, ExportRecord>,
}

impl ExportTable {
    /// Insert a record unless a newer version is already present.
    pub fn insert(&mut self, record: ExportRecord) {
        match self.records.get(&record.key) {
            Some(existing) if existing.version >= record.version => {}
            _ => {
                self.records.insert(record.key.clone(), record);
            }
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&ExportRecord> {
        self.records.get(key)
    }

    /// Export for an embed reference, if one has been rendered.
    pub fn get(&self, reference: &str) -> Option<&ExportRecord> {
        self.records.get(&export_key(reference)?)
    }

    /// Exports for the given references, keyed by reference. References
    /// without an export are left out.
    pub fn resolve(&self, references: &[String]) -> BTreeMap<String, ExportRecord> {
        references
            .iter()
            .filter_map(|r| self.get(r).map(|rec| (r.clone(), rec.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportRecord> {
        self.records.values()
    }
}

/// Export key for an embed reference; `None` when the URL has no path
/// segment to name it by.
pub fn export_key(reference: &str) -> Option<String> {
    let parts = split_url(reference);
    let slug = last_segment(parts.path)?;
    Some(match parts.query {
        Some(query) => format!("{}-{}", slug, hash_query(query)),
        None => slug.to_string(),
    })
}

/// Chart slug an embed reference points at.
pub fn chart_slug(reference: &str) -> Option<&str> {
    last_segment(split_url(reference).path)
}

/// Truncated SHA-256 of a query string, as hex.
fn hash_query(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(QUERY_HASH_LEN);
    hex
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderOutcome {
    Rendered,
    Failed(String),
    TimedOut,
}

/// What happened to one reference during [`ExportStore::ensure_rendered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStatus {
    /// Rendered during this call (or by a concurrent caller we waited on).
    Rendered,
    UpToDate,
    Failed,
    /// Not a known chart, or no slug in the URL.
    Unknown,
    TimedOut,
}

/// Outcome counts for one `ensure_rendered` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnsureReport {
    pub rendered: u32,
    pub up_to_date: u32,
    pub failed: u32,
    pub unknown: u32,
    pub timed_out: u32,
}

impl EnsureReport {
    pub fn record(&mut self, status: RefStatus) {
        match status {
            RefStatus::Rendered => self.rendered += 1,
            RefStatus::UpToDate => self.up_to_date += 1,
            RefStatus::Failed => self.failed += 1,
            RefStatus::Unknown => self.unknown += 1,
            RefStatus::TimedOut => self.timed_out += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.rendered + self.up_to_date + self.failed + self.unknown + self.timed_out
    }

    /// References that end up without a current export.
    pub fn missing(&self) -> u32 {
        self.failed + self.unknown + self.timed_out
    }
}

impl fmt::Display for EnsureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "no embeds");
        }
        write!(
            f,
            "{} current, {} rendered ({} total)",
            self.up_to_date,
            self.rendered,
            self.total()
        )?;
        if self.missing() > 0 {
            write!(
                f,
                "; missing: {} failed, {} unknown, {} timed out",
                self.failed, self.unknown, self.timed_out
            )?;
        }
        Ok(())
    }
}

type Slot = (String, u64);

/// Read-through store over the exports directory.
pub struct ExportStore<R> {
    dir: PathBuf,
    base_url: String,
    renderer: R,
    render_timeout: Duration,
    in_flight: Mutex<HashMap<Slot, Arc<OnceCell<RenderOutcome>>>>,
}

impl<R: ExportRenderer> ExportStore<R> {
    /// `base_url` is the public prefix export files are served under.
    pub fn new(dir: impl Into<PathBuf>, base_url: &str, renderer: R) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            renderer,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Current export table. A missing or unreadable directory is an empty
    /// table.
    pub async fn lookup_all(&self) -> ExportTable {
        let mut table = ExportTable::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return table,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list exports");
                return table;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "export listing cut short");
                    break;
                }
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            match parse_export_file_name(name) {
                Some(parsed) => table.insert(ExportRecord {
                    url: format!("{}/{}", self.base_url, name),
                    key: parsed.key,
                    version: parsed.version,
                    width: parsed.width,
                    height: parsed.height,
                }),
                None => tracing::debug!(file = name, "skipping non-export file"),
            }
        }

        table
    }

    /// Make sure every reference has a current export.
    ///
    /// References are handled concurrently; one failing render never stops
    /// the others. Only an unreachable chart store is an error.
    pub async fn ensure_rendered<C: ChartStore>(
        &self,
        charts: &C,
        references: &[String],
    ) -> Result<EnsureReport, ExportStoreError> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = references
            .iter()
            .map(String::as_str)
            .filter(|r| seen.insert(*r))
            .collect();

        let mut report = EnsureReport::default();
        if unique.is_empty() {
            return Ok(report);
        }

        let table = self.lookup_all().await;
        let statuses = join_all(
            unique
                .into_iter()
                .map(|reference| self.ensure_one(charts, &table, reference)),
        )
        .await;

        for status in statuses {
            report.record(status?);
        }
        tracing::info!(%report, "exports ensured");
        Ok(report)
    }

    async fn ensure_one<C: ChartStore>(
        &self,
        charts: &C,
        table: &ExportTable,
        reference: &str,
    ) -> Result<RefStatus, CmsError> {
        let (Some(key), Some(slug)) = (export_key(reference), chart_slug(reference)) else {
            tracing::debug!(reference, "embed has no chart slug");
            return Ok(RefStatus::Unknown);
        };

        let Some(version) = charts.chart_version(slug).await? else {
            tracing::debug!(reference, slug, "embed points at an unknown chart");
            return Ok(RefStatus::Unknown);
        };

        if table.get_key(&key).is_some_and(|r| r.version >= version) {
            return Ok(RefStatus::UpToDate);
        }

        let request = RenderRequest {
            reference: reference.to_string(),
            key,
            version,
            out_dir: self.dir.clone(),
        };
        Ok(self.render_once(request).await)
    }

    /// Render through the shared per-slot cell.
    async fn render_once(&self, request: RenderRequest) -> RefStatus {
        let slot: Slot = (request.key.clone(), request.version);
        let cell = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(in_flight.entry(slot.clone()).or_default())
        };

        let outcome = cell.get_or_init(|| self.bounded(&request)).await.clone();
        self.forget(&slot, &cell);

        match outcome {
            RenderOutcome::Rendered => RefStatus::Rendered,
            RenderOutcome::Failed(_) => RefStatus::Failed,
            RenderOutcome::TimedOut => RefStatus::TimedOut,
        }
    }

    /// One render, capped by the render timeout. Every waiter on the slot
    /// sees the same outcome; a render cut off here is dropped, which kills
    /// a [`CommandRenderer`](crate::collab::CommandRenderer) child.
    async fn bounded(&self, request: &RenderRequest) -> RenderOutcome {
        match tokio::time::timeout(self.render_timeout, self.trigger(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    key = %request.key,
                    timeout_secs = self.render_timeout.as_secs_f64(),
                    "export render timed out, baking without it"
                );
                RenderOutcome::TimedOut
            }
        }
    }

    async fn trigger(&self, request: &RenderRequest) -> RenderOutcome {
        // Another bake may have finished this export since our table was read.
        if self
            .lookup_all()
            .await
            .get_key(&request.key)
            .is_some_and(|r| r.version >= request.version)
        {
            tracing::debug!(key = %request.key, "export appeared while waiting");
            return RenderOutcome::Rendered;
        }

        tracing::info!(key = %request.key, version = request.version, "rendering export");
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create exports dir");
            return RenderOutcome::Failed(e.to_string());
        }
        match self.renderer.render(request).await {
            Ok(()) => RenderOutcome::Rendered,
            Err(e) => {
                tracing::warn!(key = %request.key, error = %e, "export render failed");
                RenderOutcome::Failed(e.to_string())
            }
        }
    }

    /// Drop a resolved slot, unless another caller has already replaced it.
    /// The directory stays the only record of finished renders.
    fn forget(&self, slot: &Slot, cell: &Arc<OnceCell<RenderOutcome>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(slot).is_some_and(|c| Arc::ptr_eq(c, cell)) {
            in_flight.remove(slot);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::CommandRenderer;
    use crate::naming::export_file_name;
    use crate::test_helpers::{MockCharts, RecordingRenderer};
    use std::fs;
    use tempfile::TempDir;

    fn grapher(slug: &str) -> String {
        format!("https://example.org/grapher/{slug}")
    }

    fn touch_export(dir: &Path, key: &str, version: u64) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(export_file_name(key, version, 850, 600)), "<svg/>").unwrap();
    }

    // =========================================================================
    // Keys
    // =========================================================================

    #[test]
    fn key_is_slug_without_query() {
        assert_eq!(export_key(&grapher("gdp")).as_deref(), Some("gdp"));
        assert_eq!(export_key("/grapher/gdp/").as_deref(), Some("gdp"));
    }

    #[test]
    fn key_includes_query_hash() {
        let a = export_key(&grapher("gdp?tab=map")).unwrap();
        let b = export_key(&grapher("gdp?tab=chart")).unwrap();
        assert!(a.starts_with("gdp-"));
        assert_eq!(a.len(), "gdp-".len() + QUERY_HASH_LEN);
        assert_ne!(a, b);
        assert_eq!(a, export_key(&grapher("gdp?tab=map")).unwrap());
    }

    #[test]
    fn key_missing_for_root_url() {
        assert_eq!(export_key("https://example.org/"), None);
    }

    // =========================================================================
    // ExportTable
    // =========================================================================

    fn record(key: &str, version: u64) -> ExportRecord {
        ExportRecord {
            key: key.into(),
            url: format!("/exports/{key}_v{version}_850x600.svg"),
            version,
            width: 850,
            height: 600,
        }
    }

    #[test]
    fn table_keeps_highest_version() {
        let mut t = ExportTable::default();
        t.insert(record("gdp", 2));
        t.insert(record("gdp", 5));
        t.insert(record("gdp", 3));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get_key("gdp").unwrap().version, 5);
    }

    #[test]
    fn table_resolve_skips_missing() {
        let mut t = ExportTable::default();
        t.insert(record("gdp", 1));
        let refs = vec![grapher("gdp"), grapher("co2-emissions")];
        let resolved = t.resolve(&refs);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key(&grapher("gdp")));
    }

    // =========================================================================
    // lookup_all
    // =========================================================================

    #[tokio::test]
    async fn lookup_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = ExportStore::new(tmp.path().join("nope"), "/exports", RecordingRenderer::new());
        assert!(store.lookup_all().await.is_empty());
    }

    #[tokio::test]
    async fn lookup_indexes_directory() {
        let tmp = TempDir::new().unwrap();
        touch_export(tmp.path(), "gdp", 3);
        touch_export(tmp.path(), "gdp", 4);
        touch_export(tmp.path(), "co2", 1);
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let store = ExportStore::new(tmp.path(), "/exports/", RecordingRenderer::new());
        let table = store.lookup_all().await;

        assert_eq!(table.len(), 2);
        let gdp = table.get(&grapher("gdp")).unwrap();
        assert_eq!(gdp.version, 4);
        assert_eq!(gdp.url, "/exports/gdp_v4_850x600.svg");
    }

    // =========================================================================
    // ensure_rendered
    // =========================================================================

    #[tokio::test]
    async fn renders_missing_and_skips_current() {
        let tmp = TempDir::new().unwrap();
        touch_export(tmp.path(), "gdp", 2);
        let charts = MockCharts::with_versions(&[("gdp", 2), ("co2", 7)]);
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        let report = store
            .ensure_rendered(&charts, &[grapher("gdp"), grapher("co2")])
            .await
            .unwrap();

        assert_eq!(report.up_to_date, 1);
        assert_eq!(report.rendered, 1);
        assert_eq!(store.renderer().calls(), vec!["co2@7"]);
        assert_eq!(store.lookup_all().await.get(&grapher("co2")).unwrap().version, 7);
    }

    #[tokio::test]
    async fn stale_version_is_rerendered() {
        let tmp = TempDir::new().unwrap();
        touch_export(tmp.path(), "gdp", 2);
        let charts = MockCharts::with_versions(&[("gdp", 3)]);
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        let report = store.ensure_rendered(&charts, &[grapher("gdp")]).await.unwrap();

        assert_eq!(report.rendered, 1);
        assert_eq!(store.lookup_all().await.get_key("gdp").unwrap().version, 3);
    }

    #[tokio::test]
    async fn duplicate_references_render_once() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("gdp", 1)]);
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        let refs = vec![grapher("gdp"), grapher("gdp"), grapher("gdp")];
        let report = store.ensure_rendered(&charts, &refs).await.unwrap();

        assert_eq!(report.total(), 1);
        assert_eq!(store.renderer().calls().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_overlapping_calls_render_each_key_once() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("a", 1), ("b", 1), ("c", 1)]);
        let store = ExportStore::new(
            tmp.path(),
            "/exports",
            RecordingRenderer::new().with_delay(Duration::from_millis(50)),
        );

        let first = vec![grapher("a"), grapher("b")];
        let second = vec![grapher("b"), grapher("c"), grapher("a")];
        let (r1, r2) = tokio::join!(
            store.ensure_rendered(&charts, &first),
            store.ensure_rendered(&charts, &second),
        );
        r1.unwrap();
        r2.unwrap();

        let mut calls = store.renderer().calls();
        calls.sort();
        assert_eq!(calls, vec!["a@1", "b@1", "c@1"]);
    }

    #[tokio::test]
    async fn failure_does_not_stop_other_references() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("bad", 1), ("good", 1)]);
        let store = ExportStore::new(
            tmp.path(),
            "/exports",
            RecordingRenderer::new().failing("bad"),
        );

        let report = store
            .ensure_rendered(&charts, &[grapher("bad"), grapher("good")])
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.rendered, 1);
        let table = store.lookup_all().await;
        assert!(table.get(&grapher("bad")).is_none());
        assert!(table.get(&grapher("good")).is_some());
        assert_eq!(store.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn failed_render_is_retried_by_next_call() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("bad", 1)]);
        let store = ExportStore::new(
            tmp.path(),
            "/exports",
            RecordingRenderer::new().failing("bad"),
        );

        store.ensure_rendered(&charts, &[grapher("bad")]).await.unwrap();
        store.ensure_rendered(&charts, &[grapher("bad")]).await.unwrap();

        assert_eq!(store.renderer().calls().len(), 2);
    }

    #[tokio::test]
    async fn unknown_chart_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[]);
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        let report = store
            .ensure_rendered(&charts, &[grapher("nope"), "https://example.org/".into()])
            .await
            .unwrap();

        assert_eq!(report.unknown, 2);
        assert!(store.renderer().calls().is_empty());
    }

    #[tokio::test]
    async fn hung_render_times_out() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("slow", 1), ("fast", 1)]);
        let store = ExportStore::new(
            tmp.path(),
            "/exports",
            RecordingRenderer::new().hanging("slow"),
        )
        .with_render_timeout(Duration::from_millis(50));

        let report = store
            .ensure_rendered(&charts, &[grapher("slow"), grapher("fast")])
            .await
            .unwrap();

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.rendered, 1);
        assert!(store.lookup_all().await.get(&grapher("slow")).is_none());
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_timed_out_render() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("slow", 1)]);
        let store = ExportStore::new(
            tmp.path(),
            "/exports",
            RecordingRenderer::new().hanging("slow"),
        )
        .with_render_timeout(Duration::from_millis(50));

        let refs = vec![grapher("slow")];
        let (r1, r2) = tokio::join!(
            store.ensure_rendered(&charts, &refs),
            store.ensure_rendered(&charts, &refs),
        );

        assert_eq!(r1.unwrap().timed_out, 1);
        assert_eq!(r2.unwrap().timed_out, 1);
        assert_eq!(store.renderer().calls(), vec!["slow@1"]);
        assert_eq!(store.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn resolved_slots_are_dropped_and_deleted_exports_rerendered() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("gdp", 2)]);
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        store.ensure_rendered(&charts, &[grapher("gdp")]).await.unwrap();
        assert_eq!(store.in_flight_len(), 0);

        fs::remove_file(tmp.path().join(export_file_name("gdp", 2, 850, 600))).unwrap();
        let report = store.ensure_rendered(&charts, &[grapher("gdp")]).await.unwrap();

        assert_eq!(report.rendered, 1);
        assert_eq!(store.renderer().calls(), vec!["gdp@2", "gdp@2"]);
        assert!(store.lookup_all().await.get_key("gdp").is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_command_is_killed() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::with_versions(&[("gdp", 1)]);
        // sh -c '<script>' argv0 reference key version out_dir
        let script = r#"echo start >> "$4/render.log"; sleep 1; echo done >> "$4/render.log""#;
        let renderer =
            CommandRenderer::new(&["sh".into(), "-c".into(), script.into(), "sh".into()]).unwrap();
        let store = ExportStore::new(tmp.path(), "/exports", renderer)
            .with_render_timeout(Duration::from_millis(200));

        for _ in 0..2 {
            let report = store.ensure_rendered(&charts, &[grapher("gdp")]).await.unwrap();
            assert_eq!(report.timed_out, 1);
        }
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let log = fs::read_to_string(tmp.path().join("render.log")).unwrap();
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["start", "start"]);
    }

    #[tokio::test]
    async fn unreachable_chart_store_is_upstream_error() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::unavailable();
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());

        let err = store
            .ensure_rendered(&charts, &[grapher("gdp")])
            .await
            .unwrap_err();
        assert!(matches!(err, ExportStoreError::Upstream(_)));
    }

    #[tokio::test]
    async fn no_references_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let charts = MockCharts::unavailable();
        let store = ExportStore::new(tmp.path(), "/exports", RecordingRenderer::new());
        let report = store.ensure_rendered(&charts, &[]).await.unwrap();
        assert_eq!(report, EnsureReport::default());
    }

    // =========================================================================
    // EnsureReport
    // =========================================================================

    #[test]
    fn report_display_empty() {
        assert_eq!(EnsureReport::default().to_string(), "no embeds");
    }

    #[test]
    fn report_display_all_good() {
        let r = EnsureReport {
            rendered: 2,
            up_to_date: 3,
            ..Default::default()
        };
        assert_eq!(r.to_string(), "3 current, 2 rendered (5 total)");
    }

    #[test]
    fn report_display_with_missing() {
        let r = EnsureReport {
            rendered: 1,
            failed: 1,
            timed_out: 1,
            ..Default::default()
        };
        assert_eq!(
            r.to_string(),
            "0 current, 1 rendered (3 total); missing: 1 failed, 0 unknown, 1 timed out"
        );
    }
}
