// src/traversal/session.rs
//! Paginated, depth-aware walk over the pages of a space.
//!
//! The traversal is an explicit state machine:
//!
//! ```text
//! Idle ──start──▶ FetchingBatch ──ok──▶ Draining ──exhausted──▶ FetchingBatch | Done
//!                       │                   │
//!                       └──error──▶ Failed ◀┘ (page cap)
//! ```
//!
//! Records are handed out one at a time; a new batch is requested only when
//! the buffer runs dry. No retries happen here, the transport owns those.

use super::cursor::{DepthPolicy, TraversalCursor};
use super::report::{Termination, TraversalReport, TraversalStats};
use crate::api::{BatchRequest, BatchScope, WikiRepository};
use crate::error::AppError;
use crate::model::{PageRecord, PageToken};
use crate::types::PageId;
use futures::Stream;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Idle,
    FetchingBatch,
    Draining,
    Done,
    Failed,
}

/// A single walk over a space. Owns its cursor state; nothing is shared
/// between traversals.
pub struct SpaceTraversal<'r, R: WikiRepository + ?Sized> {
    repo: &'r R,
    cursor: TraversalCursor,
    state: TraversalState,
    scope: BatchScope,
    token: Option<PageToken>,
    buffer: VecDeque<PageRecord>,
    /// Parents whose children an `all` traversal has yet to list.
    pending_parents: VecDeque<PageId>,
    seen: HashSet<PageId>,
    stats: TraversalStats,
    /// An error raised part-way through `next_batch`, reported on the
    /// following call so the records before it are not lost.
    deferred: Option<AppError>,
}

impl<'r, R: WikiRepository + ?Sized> SpaceTraversal<'r, R> {
    pub fn new(repo: &'r R, cursor: TraversalCursor) -> Self {
        let scope = Self::initial_scope(&cursor);
        Self {
            repo,
            cursor,
            state: TraversalState::Idle,
            scope,
            token: None,
            buffer: VecDeque::new(),
            pending_parents: VecDeque::new(),
            seen: HashSet::new(),
            stats: TraversalStats::default(),
            deferred: None,
        }
    }

    fn initial_scope(cursor: &TraversalCursor) -> BatchScope {
        match (cursor.depth(), cursor.anchor()) {
            (DepthPolicy::Space, _) => BatchScope::Space,
            (DepthPolicy::Root, _) | (DepthPolicy::All, None) => BatchScope::Root,
            (_, Some(anchor)) => BatchScope::Children(anchor.clone()),
            // Rejected by TraversalCursor::new.
            (DepthPolicy::Children, None) => BatchScope::Root,
        }
    }

    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    pub fn cursor(&self) -> &TraversalCursor {
        &self.cursor
    }

    /// Resets counters and buffers and moves to `FetchingBatch`.
    pub fn start(&mut self) {
        self.scope = Self::initial_scope(&self.cursor);
        self.token = None;
        self.buffer.clear();
        self.pending_parents.clear();
        self.seen.clear();
        self.stats = TraversalStats::default();
        self.deferred = None;
        self.state = TraversalState::FetchingBatch;
        log::debug!(
            "Starting {} traversal of space {}",
            self.cursor.depth(),
            self.cursor.space()
        );
    }

    /// The next record, fetching a batch if the buffer is empty.
    ///
    /// `Ok(None)` once the traversal is done. A remote failure is returned
    /// once, wrapped in `RemoteFetch` with the number of records already
    /// yielded; afterwards the traversal reports `Ok(None)`.
    pub async fn next_record(&mut self) -> Result<Option<PageRecord>, AppError> {
        self.advance(None).await
    }

    /// The remainder of the current batch, fetching a new one if needed.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<PageRecord>>, AppError> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }

        let Some(first) = self.next_record().await? else {
            return Ok(None);
        };
        let mut batch = vec![first];
        while self.state == TraversalState::Draining && !self.buffer.is_empty() {
            match self.next_record().await {
                Ok(Some(record)) => batch.push(record),
                Ok(None) => break,
                Err(e) => {
                    self.deferred = Some(e);
                    break;
                }
            }
        }
        Ok(Some(batch))
    }

    /// Runs the traversal to the end, checking `cancel` before every batch
    /// fetch. Never fails: errors end up in the report's termination along
    /// with the records gathered before them.
    pub async fn collect(&mut self, cancel: &CancellationToken) -> TraversalReport {
        self.start();
        let mut records = Vec::new();
        let termination = loop {
            match self.advance(Some(cancel)).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break Termination::Completed,
                Err(AppError::Cancelled { retrieved }) => {
                    log::info!("Traversal cancelled after {} page(s)", retrieved);
                    break Termination::Cancelled;
                }
                Err(e) => break Termination::Failed(e),
            }
        };

        TraversalReport {
            records,
            stats: self.stats,
            termination,
        }
    }

    /// The traversal as a lazy stream of records.
    ///
    /// The stream ends after the last record, or after yielding the error
    /// that stopped it (including `Cancelled`).
    pub fn into_stream(
        mut self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<PageRecord, AppError>> + 'r {
        self.start();
        futures::stream::unfold((self, cancel), |(mut traversal, cancel)| async move {
            match traversal.advance(Some(&cancel)).await {
                Ok(Some(record)) => Some((Ok(record), (traversal, cancel))),
                Ok(None) => None,
                Err(e) => Some((Err(e), (traversal, cancel))),
            }
        })
    }

    async fn advance(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<PageRecord>, AppError> {
        loop {
            match self.state {
                TraversalState::Idle => self.start(),
                TraversalState::FetchingBatch => {
                    if cancel.is_some_and(CancellationToken::is_cancelled) {
                        self.state = TraversalState::Done;
                        return Err(AppError::Cancelled {
                            retrieved: self.stats.records_yielded,
                        });
                    }
                    self.fetch_batch().await?;
                }
                TraversalState::Draining => {
                    if let Some(record) = self.buffer.pop_front() {
                        if let Some(record) = self.accept(record)? {
                            return Ok(Some(record));
                        }
                    } else {
                        self.state = self.after_drain();
                    }
                }
                TraversalState::Done | TraversalState::Failed => return Ok(None),
            }
        }
    }

    async fn fetch_batch(&mut self) -> Result<(), AppError> {
        let request = BatchRequest {
            space: self.cursor.space().clone(),
            scope: self.scope.clone(),
            limit: self.cursor.batch_size(),
            token: self.token.take(),
        };

        match self.repo.fetch_batch(&request).await {
            Ok(batch) => {
                self.stats.batches_fetched += 1;
                log::debug!(
                    "Batch {} returned {} page(s){}",
                    self.stats.batches_fetched,
                    batch.records.len(),
                    if batch.next.is_some() { ", more available" } else { "" }
                );
                self.token = batch.next;
                self.buffer.extend(batch.records);
                self.state = TraversalState::Draining;
                Ok(())
            }
            Err(e) => {
                self.state = TraversalState::Failed;
                self.buffer.clear();
                log::warn!(
                    "Traversal failed after {} page(s): {}",
                    self.stats.records_yielded,
                    e
                );
                Err(AppError::RemoteFetch {
                    retrieved: self.stats.records_yielded,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Applies the page cap and duplicate filter to a drained record.
    fn accept(&mut self, record: PageRecord) -> Result<Option<PageRecord>, AppError> {
        if !self.seen.insert(record.id().clone()) {
            self.stats.duplicates_skipped += 1;
            log::debug!("Skipping page {} already yielded", record.id());
            return Ok(None);
        }

        if let Some(limit) = self.cursor.max_pages() {
            if self.stats.records_yielded >= limit {
                self.state = TraversalState::Failed;
                self.buffer.clear();
                return Err(AppError::TraversalLimitExceeded { limit });
            }
        }

        if self.cursor.depth() == DepthPolicy::All {
            self.pending_parents.push_back(record.id().clone());
        }
        self.stats.records_yielded += 1;
        Ok(Some(record))
    }

    /// Where to go once the buffer is empty: the next page of the current
    /// listing, the next hierarchy level, or done.
    fn after_drain(&mut self) -> TraversalState {
        if self.token.is_some() {
            return TraversalState::FetchingBatch;
        }
        if self.cursor.depth() == DepthPolicy::All {
            if let Some(parent) = self.pending_parents.pop_front() {
                self.scope = BatchScope::Children(parent);
                return TraversalState::FetchingBatch;
            }
        }
        log::debug!(
            "Traversal done: {} page(s) in {} batch(es)",
            self.stats.records_yielded,
            self.stats.batches_fetched
        );
        TraversalState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtlassianErrorCode;
    use crate::model::{PageBatch, PageDraft, PageUpdate};
    use crate::types::SpaceKey;
    use futures::StreamExt;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory wiki: listings keyed by scope, paged by offset.
    #[derive(Default)]
    struct MockWiki {
        listings: HashMap<BatchScope, Vec<PageRecord>>,
        /// Fail the Nth fetch (1-based).
        fail_on: Option<usize>,
        requests: Mutex<Vec<BatchRequest>>,
    }

    impl MockWiki {
        fn with_root(count: usize) -> Self {
            let mut wiki = Self::default();
            wiki.listings
                .insert(BatchScope::Root, (1..=count).map(|n| page(n, None)).collect());
            wiki
        }

        fn sizes(&self) -> Vec<usize> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.limit)
                .collect()
        }

        fn fetches(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    fn page(n: usize, parent: Option<usize>) -> PageRecord {
        PageRecord::new(
            PageId::parse(&n.to_string()).unwrap(),
            format!("Page {n}"),
            SpaceKey::new("DOCS").unwrap(),
            1,
            format!("<p>{n}</p>"),
        )
        .with_parent(parent.map(|p| PageId::parse(&p.to_string()).unwrap()))
    }

    #[async_trait::async_trait]
    impl WikiRepository for MockWiki {
        async fn fetch_page(&self, id: &PageId) -> Result<PageRecord, AppError> {
            Err(AppError::NotFound(id.to_string()))
        }

        async fn fetch_page_by_title(&self, _: &SpaceKey, title: &str) -> Result<PageRecord, AppError> {
            Err(AppError::NotFound(title.to_string()))
        }

        async fn fetch_batch(&self, request: &BatchRequest) -> Result<PageBatch, AppError> {
            let call = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if self.fail_on == Some(call) {
                return Err(AppError::RemoteService {
                    code: AtlassianErrorCode::Forbidden,
                    message: "no access".to_string(),
                    status: reqwest::StatusCode::FORBIDDEN,
                    url: "mock".to_string(),
                });
            }

            let all = self.listings.get(&request.scope).cloned().unwrap_or_default();
            let start = request.token.as_ref().map(PageToken::offset).unwrap_or(0);
            let records: Vec<_> = all.iter().skip(start).take(request.limit).cloned().collect();
            let end = start + records.len();
            let next = (end < all.len()).then(|| PageToken::from_offset(end));
            Ok(PageBatch { records, next })
        }

        async fn create_page(&self, _: &PageDraft) -> Result<PageRecord, AppError> {
            unimplemented!()
        }

        async fn update_page(&self, _: &PageUpdate) -> Result<PageRecord, AppError> {
            unimplemented!()
        }

        async fn current_user(&self) -> Result<Value, AppError> {
            Ok(Value::Null)
        }
    }

    fn cursor(depth: DepthPolicy, batch_size: usize) -> TraversalCursor {
        TraversalCursor::new(SpaceKey::new("DOCS").unwrap(), depth, None, batch_size).unwrap()
    }

    #[tokio::test]
    async fn pages_through_root_in_ceil_batches() {
        let wiki = MockWiki::with_root(130);
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 50));

        let mut sizes = Vec::new();
        while let Some(batch) = traversal.next_batch().await.unwrap() {
            sizes.push(batch.len());
        }

        assert_eq!(sizes, vec![50, 50, 30]);
        assert_eq!(wiki.fetches(), 3);
        assert_eq!(wiki.sizes(), vec![50, 50, 50]);
        assert_eq!(traversal.state(), TraversalState::Done);
    }

    #[tokio::test]
    async fn records_arrive_in_server_order() {
        let wiki = MockWiki::with_root(7);
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 3));
        let report = traversal.collect(&CancellationToken::new()).await;

        assert!(report.is_complete());
        let ids: Vec<_> = report.records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(report.stats.batches_fetched, 3);
    }

    #[tokio::test]
    async fn batches_are_fetched_lazily() {
        let wiki = MockWiki::with_root(10);
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 5));

        assert_eq!(traversal.state(), TraversalState::Idle);
        assert!(traversal.next_record().await.unwrap().is_some());
        assert_eq!(wiki.fetches(), 1);
        for _ in 0..4 {
            traversal.next_record().await.unwrap();
        }
        assert_eq!(wiki.fetches(), 1);
        traversal.next_record().await.unwrap();
        assert_eq!(wiki.fetches(), 2);
    }

    #[tokio::test]
    async fn remote_failure_keeps_partial_records() {
        let mut wiki = MockWiki::with_root(130);
        wiki.fail_on = Some(2);
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 50));
        let report = traversal.collect(&CancellationToken::new()).await;

        assert_eq!(report.records.len(), 50);
        assert_eq!(traversal.state(), TraversalState::Failed);
        match report.termination {
            Termination::Failed(AppError::RemoteFetch { retrieved, source }) => {
                assert_eq!(retrieved, 50);
                assert_eq!(source.remote_code(), Some(&AtlassianErrorCode::Forbidden));
            }
            other => panic!("unexpected termination: {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_walks_hierarchy_breadth_first() {
        let mut wiki = MockWiki::default();
        wiki.listings
            .insert(BatchScope::Root, vec![page(1, None), page(2, None)]);
        wiki.listings.insert(
            BatchScope::Children(PageId::parse("1").unwrap()),
            vec![page(3, Some(1)), page(4, Some(1))],
        );
        wiki.listings.insert(
            BatchScope::Children(PageId::parse("3").unwrap()),
            vec![page(5, Some(3))],
        );

        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::All, 10));
        let report = traversal.collect(&CancellationToken::new()).await;

        let ids: Vec<_> = report.records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        // Root plus one listing per yielded page.
        assert_eq!(report.stats.batches_fetched, 6);
    }

    #[tokio::test]
    async fn all_stops_at_page_cap() {
        let wiki = MockWiki::with_root(30);
        let mut traversal =
            SpaceTraversal::new(&wiki, cursor(DepthPolicy::All, 10).with_max_pages(25));
        let report = traversal.collect(&CancellationToken::new()).await;

        assert_eq!(report.records.len(), 25);
        assert!(matches!(
            report.termination,
            Termination::Failed(AppError::TraversalLimitExceeded { limit: 25 })
        ));
    }

    #[tokio::test]
    async fn cap_is_not_exceeded_when_exactly_reached() {
        let wiki = MockWiki::with_root(20);
        let mut traversal =
            SpaceTraversal::new(&wiki, cursor(DepthPolicy::All, 10).with_max_pages(20));
        let report = traversal.collect(&CancellationToken::new()).await;
        assert!(report.is_complete());
        assert_eq!(report.records.len(), 20);
    }

    #[tokio::test]
    async fn space_listing_is_flat_and_uncapped() {
        let mut wiki = MockWiki::default();
        wiki.listings.insert(
            BatchScope::Space,
            (1..=2_400).map(|n| page(n, None)).collect(),
        );
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Space, 250));
        let report = traversal.collect(&CancellationToken::new()).await;

        assert!(report.is_complete());
        assert_eq!(report.records.len(), 2_400);
        assert_eq!(wiki.fetches(), 10);
        assert!(wiki
            .requests
            .lock()
            .unwrap()
            .iter()
            .all(|r| r.scope == BatchScope::Space));
    }

    #[tokio::test]
    async fn cancellation_takes_effect_before_first_fetch() {
        let wiki = MockWiki::with_root(10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 5));
        let report = traversal.collect(&cancel).await;

        assert!(matches!(report.termination, Termination::Cancelled));
        assert!(report.records.is_empty());
        assert_eq!(wiki.fetches(), 0);
    }

    #[tokio::test]
    async fn cancellation_waits_for_batch_boundary() {
        let wiki = MockWiki::with_root(10);
        let cancel = CancellationToken::new();
        let traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 4));
        let mut stream = Box::pin(traversal.into_stream(cancel.clone()));

        assert!(stream.next().await.unwrap().is_ok());
        cancel.cancel();
        // The rest of the first batch still drains.
        for _ in 0..3 {
            assert!(stream.next().await.unwrap().is_ok());
        }
        assert!(matches!(
            stream.next().await,
            Some(Err(AppError::Cancelled { retrieved: 4 }))
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(wiki.fetches(), 1);
    }

    #[tokio::test]
    async fn empty_space_finishes_after_one_fetch() {
        let wiki = MockWiki::default();
        let mut traversal = SpaceTraversal::new(&wiki, cursor(DepthPolicy::Root, 50));
        assert!(traversal.next_batch().await.unwrap().is_none());
        assert_eq!(wiki.fetches(), 1);
        assert_eq!(traversal.state(), TraversalState::Done);
    }
}
