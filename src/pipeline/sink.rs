//! The concurrent fan-in sink.
//!
//! Sources push raw grammar lines into a bounded ingress channel; a fixed
//! worker pool decodes, normalizes, deduplicates and persists them into the
//! bucket tree under the output root. `flush` waits for quiescence, `close`
//! drains and releases the writers.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::categorize::{self, Category};
use crate::pipeline::dedup::DedupIndex;
use crate::pipeline::event::{self, Event};
use crate::pipeline::normalize;
use crate::pipeline::writer::{OpenMode, WriterPool};
use crate::records::cert::CertRecord;
use crate::records::dns::DnsRecord;

const INGRESS_CAPACITY: usize = 1024;

/// Bucket files, relative to the output root.
pub(crate) mod bucket {
    use crate::categorize::Category;

    pub const CERTS: &str = "certs/certs.passive";
    pub const DNS: &str = "dns/dns.active";

    pub fn variant(active: bool) -> &'static str {
        if active {
            "active"
        } else {
            "passive"
        }
    }

    pub fn domains(active: bool) -> String {
        format!("domains/domains.{}", variant(active))
    }

    pub fn routes(active: bool) -> String {
        format!("routes/routes.{}", variant(active))
    }

    pub fn meta(active: bool) -> String {
        format!("meta.{}", variant(active))
    }

    pub fn category_file(cat: Category, active: bool) -> String {
        let dir = cat.dir_name();
        format!("routes/{dir}/{dir}.{}", variant(active))
    }
}

// Buckets common enough to open at construction; the rest materialize on
// first write.
const EAGER_BUCKETS: &[&str] = &[
    "domains/domains.passive",
    "domains/domains.active",
    "routes/routes.passive",
    "routes/routes.active",
    "routes/js/js.passive",
    "routes/js/js.active",
    "routes/html/html.active",
    "certs/certs.passive",
    "meta.passive",
    "meta.active",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SinkStats {
    /// Lines accepted on the ingress channel.
    pub received: u64,
    /// Records appended to bucket files.
    pub written: u64,
}

/// Cloneable producer handle over the sink ingress.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<String>,
    state: Arc<SinkState>,
}

impl SinkHandle {
    /// Queue one raw line. Lines sent after close are dropped.
    pub async fn send(&self, line: impl Into<String>) {
        self.state.received.fetch_add(1, Ordering::Relaxed);
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(line.into()).await.is_err() {
            self.state.line_done();
        }
    }
}

pub struct Sink {
    state: Arc<SinkState>,
    tx: mpsc::Sender<String>,
    rx: Option<mpsc::Receiver<String>>,
    workers: Vec<JoinHandle<()>>,
}

impl Sink {
    /// Create the output tree and eager writers. Failure here is fatal to the
    /// run; writers already opened are released before the error is returned.
    pub fn new(
        outdir: &Path,
        active_mode: bool,
        scope: Option<&str>,
        mode: OpenMode,
    ) -> anyhow::Result<Self> {
        let writers = WriterPool::open(outdir, mode, EAGER_BUCKETS)?;
        let scope = scope.and_then(normalize::normalize_domain);
        let (tx, rx) = mpsc::channel(INGRESS_CAPACITY);
        Ok(Self {
            state: Arc::new(SinkState {
                writers,
                seen: DedupIndex::new(),
                scope,
                active_mode,
                pending: AtomicU64::new(0),
                notify: Notify::new(),
                received: AtomicU64::new(0),
                written: AtomicU64::new(0),
            }),
            tx,
            rx: Some(rx),
            workers: Vec::new(),
        })
    }

    /// Launch the worker pool. Idempotent: later calls are no-ops.
    pub fn start(&mut self, workers: usize) {
        let rx = match self.rx.take() {
            Some(rx) => Arc::new(Mutex::new(rx)),
            None => return,
        };
        for id in 0..workers.max(1) {
            let rx = rx.clone();
            let state = self.state.clone();
            self.workers.push(tokio::spawn(async move {
                loop {
                    let line = { rx.lock().await.recv().await };
                    match line {
                        Some(l) => {
                            state.process(&l);
                            state.line_done();
                        }
                        None => break,
                    }
                }
                tracing::trace!(worker = id, "sink worker drained");
            }));
        }
    }

    /// A producer handle over the ingress channel.
    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            tx: self.tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Wait until no line is queued or in flight. Everything sent before the
    /// call is on disk when it returns.
    pub async fn flush(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.state.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
        if let Err(e) = self.state.writers.flush_all() {
            tracing::warn!(error = %e, "flush could not reach every bucket");
        }
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            received: self.state.received.load(Ordering::Relaxed),
            written: self.state.written.load(Ordering::Relaxed),
        }
    }

    /// Close the ingress, drain the workers and release every writer.
    /// Producer handles must be dropped first or the drain never finishes.
    pub async fn close(self) -> anyhow::Result<()> {
        let Sink {
            state,
            tx,
            rx,
            mut workers,
        } = self;
        drop(tx);
        drop(rx);
        for worker in workers.drain(..) {
            let _ = worker.await;
        }
        state.writers.close()?;
        Ok(())
    }
}

struct SinkState {
    writers: WriterPool,
    seen: DedupIndex,
    scope: Option<String>,
    active_mode: bool,
    pending: AtomicU64,
    notify: Notify,
    received: AtomicU64,
    written: AtomicU64,
}

impl SinkState {
    fn line_done(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    fn process(&self, raw: &str) {
        let line = event::decode(raw);
        if line.active && !self.active_mode {
            tracing::debug!("active-marked line during a passive run");
        }
        match line.event {
            Event::Empty => {}
            Event::Meta(text) => self.write_meta(line.active, &text),
            Event::Rdap(entry) => self.write_meta(line.active, &format!("rdap: {entry}")),
            Event::Js(url) => self.ingest_js(line.active, &url),
            Event::Html(url) => self.ingest_html(line.active, &url),
            Event::Cert(payload) => self.ingest_cert(&payload),
            Event::Dns(payload) => self.ingest_dns(&payload),
            Event::Domain(body) => self.ingest_domain(line.active, &body),
            Event::Route(body) => self.ingest_route(line.active, &body),
        }
    }

    /// Append, logging instead of failing: one broken bucket must not stall
    /// the others.
    fn append(&self, bucket: &str, value: &str) {
        match self.writers.append(bucket, value) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => tracing::warn!(bucket, error = %e, "bucket write failed, continuing"),
        }
    }

    /// Dedup gate plus append. Returns true when the value was new.
    fn dedup_append(&self, bucket: &str, value: &str) -> bool {
        if !self.seen.insert(bucket, value) {
            return false;
        }
        self.append(bucket, value);
        true
    }

    fn write_meta(&self, active: bool, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.dedup_append(&bucket::meta(active), text);
    }

    fn ingest_js(&self, active: bool, url: &str) {
        let base = normalize::canonical_url(normalize::first_token(url));
        if base.is_empty() {
            return;
        }
        if self.seen.insert(&bucket::category_file(Category::Js, false), &base) {
            self.append(&bucket::category_file(Category::Js, false), &base);
            if active {
                self.append(&bucket::category_file(Category::Js, true), url.trim());
            }
        }
    }

    fn ingest_html(&self, active: bool, url: &str) {
        let base = normalize::canonical_url(normalize::first_token(url));
        if base.is_empty() {
            return;
        }
        if active {
            self.dedup_append(&bucket::category_file(Category::Html, true), url.trim());
        } else {
            self.dedup_append(&bucket::category_file(Category::Html, false), &base);
        }
    }

    fn ingest_cert(&self, payload: &str) {
        let rec = match CertRecord::parse(payload) {
            Ok(rec) => rec,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparseable cert record");
                return;
            }
        };
        let key = rec.identity_key();
        if key.trim_matches('|').is_empty() {
            return;
        }
        if !self.seen.insert(bucket::CERTS, &key) {
            return;
        }
        match rec.canonical_json() {
            Ok(json) => self.append(bucket::CERTS, &json),
            Err(e) => tracing::debug!(error = %e, "cert record did not serialize"),
        }
    }

    fn ingest_dns(&self, payload: &str) {
        let rec = match DnsRecord::parse(payload) {
            Ok(rec) => rec,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparseable dns record");
                return;
            }
        };
        if rec.host.is_empty() || rec.value.is_empty() {
            return;
        }
        if !self.seen.insert(bucket::DNS, &rec.identity_key()) {
            return;
        }
        match rec.canonical_json() {
            Ok(json) => self.append(bucket::DNS, &json),
            Err(e) => tracing::debug!(error = %e, "dns record did not serialize"),
        }
    }

    fn ingest_domain(&self, active: bool, body: &str) {
        // crt.sh name lists arrive comma-packed; split before validation
        let token = normalize::first_token(body);
        for part in token.split(',') {
            let domain = match normalize::normalize_domain(part) {
                Some(d) => d,
                None => continue,
            };
            if !self.in_scope(&domain) {
                tracing::trace!(%domain, "outside run scope, dropped");
                continue;
            }
            self.dedup_append(&bucket::domains(active), &domain);
        }
    }

    fn ingest_route(&self, active: bool, body: &str) {
        let body = body.trim();
        let base = normalize::canonical_url(normalize::first_token(body));
        if base.is_empty() {
            return;
        }
        if active {
            // active observations seed the passive inventory with the bare URL
            self.dedup_append(&bucket::routes(false), &base);
            self.dedup_append(&bucket::routes(true), body);
        } else {
            self.dedup_append(&bucket::routes(false), &base);
        }

        if active && !categorize_active_route(body) {
            return;
        }
        let value = if active { body } else { base.as_str() };
        for cat in categorize::detect(&base) {
            self.dedup_append(&bucket::category_file(cat, active), value);
        }
    }

    fn in_scope(&self, domain: &str) -> bool {
        let scope = match &self.scope {
            Some(s) => s,
            None => return true,
        };
        if domain == scope {
            return true;
        }
        domain.len() > scope.len()
            && domain.ends_with(scope.as_str())
            && domain.as_bytes()[domain.len() - scope.len() - 1] == b'.'
    }
}

/// Error results stay out of the category buckets; lines without a status
/// bracket are still categorized.
fn categorize_active_route(body: &str) -> bool {
    match normalize::route_status(body) {
        Some(0) => false,
        Some(status) if status >= 400 => false,
        _ => true,
    }
}
