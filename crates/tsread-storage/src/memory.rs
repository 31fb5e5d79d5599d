//! In-memory storage engine.
//!
//! Holds series in a shared `Vec` and answers every `Store` request by
//! filtering, slicing and partitioning them on the fly. Cursors hand out
//! fixed-size batches so multi-chunk streaming is exercised. Every cursor,
//! result set and group cursor it opens is counted in a `ResourceLedger`,
//! which lets tests assert exactly-once release.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tsread_core::id::{BucketId, OrgId};
use tsread_core::schema::{DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL};
use tsread_core::stats::ScanStatistics;

use crate::cursor::{ArrayCursor, Cursor, CursorValue, TimestampArray};
use crate::error::{Result, StorageError};
use crate::guard::Closable;
use crate::predicate::{ComparisonOp, LogicalOp, Node, Predicate};
use crate::request::{
    Group, ReadFilterRequest, ReadRequest, ReadSource, TagKeysRequest, TagValuesRequest,
    TimestampRange,
};
use crate::result_set::{GroupCursor, GroupResultSet, ResultSet, StringIterator};
use crate::store::Store;
use crate::tags::{Tags, FIELD_ALIAS, FIELD_KEY_TAG_KEY, MEASUREMENT_ALIAS, MEASUREMENT_TAG_KEY};

const DEFAULT_BATCH_SIZE: usize = 1000;

/// Points of one series. `Nil` models a series that has no cursor at all.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Nil,
    Integer(TimestampArray<i64>),
    Float(TimestampArray<f64>),
    Unsigned(TimestampArray<u64>),
    Boolean(TimestampArray<bool>),
    String(TimestampArray<String>),
}

impl SeriesData {
    fn timestamps(&self) -> &[i64] {
        match self {
            SeriesData::Nil => &[],
            SeriesData::Integer(a) => &a.timestamps,
            SeriesData::Float(a) => &a.timestamps,
            SeriesData::Unsigned(a) => &a.timestamps,
            SeriesData::Boolean(a) => &a.timestamps,
            SeriesData::String(a) => &a.timestamps,
        }
    }

    fn has_points_in(&self, range: &TimestampRange) -> bool {
        self.timestamps()
            .iter()
            .any(|t| *t >= range.start && *t < range.end)
    }

    fn sorted(self) -> Self {
        match self {
            SeriesData::Nil => SeriesData::Nil,
            SeriesData::Integer(a) => SeriesData::Integer(sort_by_time(a)),
            SeriesData::Float(a) => SeriesData::Float(sort_by_time(a)),
            SeriesData::Unsigned(a) => SeriesData::Unsigned(sort_by_time(a)),
            SeriesData::Boolean(a) => SeriesData::Boolean(sort_by_time(a)),
            SeriesData::String(a) => SeriesData::String(sort_by_time(a)),
        }
    }
}

fn sort_by_time<T>(a: TimestampArray<T>) -> TimestampArray<T> {
    let mut pairs: Vec<(i64, T)> = a.timestamps.into_iter().zip(a.values).collect();
    pairs.sort_by_key(|(t, _)| *t);
    pairs.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemSeries {
    pub org_id: OrgId,
    pub bucket_id: BucketId,
    pub tags: Tags,
    pub data: SeriesData,
    /// When set, the series' cursor fails with this message after its last point.
    pub cursor_error: Option<String>,
}

impl MemSeries {
    pub fn new(org_id: OrgId, bucket_id: BucketId, tags: Tags, data: SeriesData) -> Self {
        Self {
            org_id,
            bucket_id,
            tags,
            data,
            cursor_error: None,
        }
    }

    pub fn with_cursor_error(mut self, msg: impl Into<String>) -> Self {
        self.cursor_error = Some(msg.into());
        self
    }
}

/// Open/close accounting for every resource a `MemStore` hands out.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    opened: AtomicUsize,
    closed: AtomicUsize,
    double_closed: AtomicUsize,
}

impl ResourceLedger {
    fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn record_close(&self, already_closed: bool) {
        if already_closed {
            self.double_closed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resources opened but not (yet) closed.
    pub fn outstanding(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    /// `close` calls on something already closed.
    pub fn double_closed(&self) -> usize {
        self.double_closed.load(Ordering::SeqCst)
    }
}

/// A request as received, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    Read(ReadRequest),
    GroupRead(ReadRequest),
    ReadFilter(ReadFilterRequest),
    TagKeys(TagKeysRequest),
    TagValues(TagValuesRequest),
}

#[derive(Debug, Default)]
struct Faults {
    request_error: Option<String>,
    result_set_error: Option<String>,
    nil_result_sets: bool,
}

/// Thread-safe in-memory storage engine.
#[derive(Clone)]
pub struct MemStore {
    series: Arc<Mutex<Vec<MemSeries>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    faults: Arc<Mutex<Faults>>,
    ledger: Arc<ResourceLedger>,
    batch_size: usize,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            series: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
            ledger: Arc::new(ResourceLedger::default()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Points handed out per cursor step (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn insert(&self, mut series: MemSeries) {
        series.data = series.data.sorted();
        lock(&self.series).push(series);
    }

    pub fn len(&self) -> usize {
        lock(&self.series).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.series).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.series).clear();
    }

    pub fn ledger(&self) -> Arc<ResourceLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Make every subsequent request fail with `msg`.
    pub fn fail_requests(&self, msg: impl Into<String>) {
        lock(&self.faults).request_error = Some(msg.into());
    }

    /// Make every subsequent result set report `msg` from `err()`.
    pub fn fail_result_sets(&self, msg: impl Into<String>) {
        lock(&self.faults).result_set_error = Some(msg.into());
    }

    /// Answer reads with `Ok(None)` regardless of the data.
    pub fn return_nil_result_sets(&self) {
        lock(&self.faults).nil_result_sets = true;
    }

    fn begin(&self, cancel: &CancellationToken, req: RecordedRequest) -> Result<()> {
        lock(&self.requests).push(req);
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        match &lock(&self.faults).request_error {
            Some(msg) => Err(StorageError::Engine(msg.clone())),
            None => Ok(()),
        }
    }

    fn nil_result_sets(&self) -> bool {
        lock(&self.faults).nil_result_sets
    }

    fn result_set_error(&self) -> Option<StorageError> {
        lock(&self.faults)
            .result_set_error
            .clone()
            .map(StorageError::Engine)
    }

    /// Series of `source` matching `predicate`, ordered by tags.
    fn select(&self, source: &ReadSource, predicate: Option<&Predicate>) -> Result<Vec<MemSeries>> {
        let all = lock(&self.series);
        let mut out = Vec::new();
        for s in all
            .iter()
            .filter(|s| s.org_id == source.org_id && s.bucket_id == source.bucket_id)
        {
            if let Some(p) = predicate {
                if !eval(&p.root, &s.tags)? {
                    continue;
                }
            }
            out.push(s.clone());
        }
        out.sort_by(|a, b| a.tags.cmp(&b.tags));
        Ok(out)
    }

    fn cursor_opts(&self, range: TimestampRange) -> CursorOpts {
        CursorOpts {
            range,
            descending: false,
            points_limit: 0,
            batch_size: self.batch_size,
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_limits(series: Vec<MemSeries>, offset: i64, limit: i64) -> Vec<MemSeries> {
    let skipped = series.into_iter().skip(offset.max(0) as usize);
    if limit > 0 {
        skipped.take(limit as usize).collect()
    } else {
        skipped.collect()
    }
}

fn is_reserved(key: &str) -> bool {
    key == DEFAULT_START_COL_LABEL || key == DEFAULT_STOP_COL_LABEL
}

fn eval(node: &Node, tags: &Tags) -> Result<bool> {
    match node {
        Node::Logical { op, children } => {
            for child in children {
                let hit = eval(child, tags)?;
                match op {
                    LogicalOp::And if !hit => return Ok(false),
                    LogicalOp::Or if hit => return Ok(true),
                    _ => {}
                }
            }
            Ok(*op == LogicalOp::And)
        }
        Node::Comparison { op, left, right } => match (left.as_ref(), right.as_ref()) {
            (Node::TagRef(key), Node::StringLiteral(want)) => {
                let got = tags.get(key).unwrap_or("");
                Ok(match op {
                    ComparisonOp::Equal => got == want,
                    ComparisonOp::NotEqual => got != want,
                    ComparisonOp::Lt => got < want.as_str(),
                    ComparisonOp::Lte => got <= want.as_str(),
                    ComparisonOp::Gt => got > want.as_str(),
                    ComparisonOp::Gte => got >= want.as_str(),
                    ComparisonOp::StartsWith => got.starts_with(want.as_str()),
                })
            }
            (l, r) => Err(StorageError::Unsupported(format!(
                "comparison {op:?} between {l:?} and {r:?}"
            ))),
        },
        Node::BooleanLiteral(b) => Ok(*b),
        other => Err(StorageError::Unsupported(format!(
            "predicate node {other:?}"
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
struct CursorOpts {
    range: TimestampRange,
    descending: bool,
    points_limit: i64,
    batch_size: usize,
}

fn window<T: Clone>(a: &TimestampArray<T>, opts: &CursorOpts) -> TimestampArray<T> {
    let mut pairs: Vec<(i64, T)> = a
        .timestamps
        .iter()
        .zip(&a.values)
        .filter(|(t, _)| **t >= opts.range.start && **t < opts.range.end)
        .map(|(t, v)| (*t, v.clone()))
        .collect();
    if opts.descending {
        pairs.reverse();
    }
    if opts.points_limit > 0 {
        pairs.truncate(opts.points_limit as usize);
    }
    pairs.into_iter().collect()
}

fn open_cursor(
    series: &MemSeries,
    opts: &CursorOpts,
    ledger: &Arc<ResourceLedger>,
) -> Option<Cursor> {
    let err = series.cursor_error.clone();
    let cursor = match &series.data {
        SeriesData::Nil => return None,
        SeriesData::Integer(a) => {
            Cursor::Integer(MemCursor::boxed(window(a, opts), opts, err, ledger))
        }
        SeriesData::Float(a) => {
            Cursor::Float(MemCursor::boxed(window(a, opts), opts, err, ledger))
        }
        SeriesData::Unsigned(a) => {
            Cursor::Unsigned(MemCursor::boxed(window(a, opts), opts, err, ledger))
        }
        SeriesData::Boolean(a) => {
            Cursor::Boolean(MemCursor::boxed(window(a, opts), opts, err, ledger))
        }
        SeriesData::String(a) => {
            Cursor::String(MemCursor::boxed(window(a, opts), opts, err, ledger))
        }
    };
    Some(cursor)
}

struct MemCursor<T> {
    points: TimestampArray<T>,
    pos: usize,
    batch_size: usize,
    error: Option<String>,
    stats: ScanStatistics,
    closed: bool,
    ledger: Arc<ResourceLedger>,
}

impl<T: CursorValue> MemCursor<T> {
    fn boxed(
        points: TimestampArray<T>,
        opts: &CursorOpts,
        error: Option<String>,
        ledger: &Arc<ResourceLedger>,
    ) -> Box<dyn ArrayCursor<T>> {
        ledger.record_open();
        Box::new(Self {
            points,
            pos: 0,
            batch_size: opts.batch_size,
            error,
            stats: ScanStatistics::default(),
            closed: false,
            ledger: Arc::clone(ledger),
        })
    }
}

impl<T: CursorValue> ArrayCursor<T> for MemCursor<T> {
    fn next(&mut self) -> Result<Option<TimestampArray<T>>> {
        if self.closed {
            return Err(StorageError::Cursor("read from closed cursor".into()));
        }
        let len = self.points.len();
        if self.pos >= len {
            return match self.error.take() {
                Some(msg) => Err(StorageError::Cursor(msg)),
                None => Ok(None),
            };
        }
        let end = (self.pos + self.batch_size).min(len);
        let timestamps = self.points.timestamps[self.pos..end].to_vec();
        let values = self.points.values[self.pos..end].to_vec();
        self.stats.scanned_values += (end - self.pos) as u64;
        self.stats.scanned_bytes += values.iter().map(CursorValue::scanned_bytes).sum::<u64>();
        self.pos = end;
        Ok(Some(TimestampArray::new(timestamps, values)))
    }

    fn close(&mut self) {
        self.ledger.record_close(self.closed);
        self.closed = true;
    }

    fn stats(&self) -> ScanStatistics {
        self.stats
    }
}

/// Shared series-walking state of result sets and group cursors.
struct SeriesWalk {
    pending: VecDeque<MemSeries>,
    current: Option<MemSeries>,
    cursor_taken: bool,
    no_tags: Tags,
    opts: CursorOpts,
    ledger: Arc<ResourceLedger>,
}

impl SeriesWalk {
    fn new(series: Vec<MemSeries>, opts: CursorOpts, ledger: &Arc<ResourceLedger>) -> Self {
        Self {
            pending: series.into(),
            current: None,
            cursor_taken: false,
            no_tags: Tags::default(),
            opts,
            ledger: Arc::clone(ledger),
        }
    }

    fn next(&mut self) -> bool {
        self.current = self.pending.pop_front();
        self.cursor_taken = false;
        self.current.is_some()
    }

    fn cursor(&mut self) -> Option<Cursor> {
        if self.cursor_taken {
            return None;
        }
        self.cursor_taken = true;
        let series = self.current.as_ref()?;
        open_cursor(series, &self.opts, &self.ledger)
    }

    fn tags(&self) -> &Tags {
        self.current.as_ref().map_or(&self.no_tags, |s| &s.tags)
    }
}

struct MemResultSet {
    walk: SeriesWalk,
    err: Option<StorageError>,
    closed: bool,
}

impl MemResultSet {
    fn boxed(walk: SeriesWalk, err: Option<StorageError>) -> Box<dyn ResultSet> {
        walk.ledger.record_open();
        Box::new(Self {
            walk,
            err,
            closed: false,
        })
    }
}

impl Closable for MemResultSet {
    fn close(&mut self) {
        self.walk.ledger.record_close(self.closed);
        self.closed = true;
    }
}

impl ResultSet for MemResultSet {
    fn next(&mut self) -> bool {
        !self.closed && self.walk.next()
    }

    fn cursor(&mut self) -> Option<Cursor> {
        self.walk.cursor()
    }

    fn tags(&self) -> &Tags {
        self.walk.tags()
    }

    fn err(&self) -> Option<StorageError> {
        self.err.clone()
    }
}

struct GroupSpec {
    keys: Vec<String>,
    kv: Vec<String>,
    series: Vec<MemSeries>,
}

struct MemGroupCursor {
    keys: Vec<String>,
    kv: Vec<String>,
    walk: SeriesWalk,
    closed: bool,
}

impl Closable for MemGroupCursor {
    fn close(&mut self) {
        self.walk.ledger.record_close(self.closed);
        self.closed = true;
    }
}

impl GroupCursor for MemGroupCursor {
    fn next(&mut self) -> bool {
        !self.closed && self.walk.next()
    }

    fn cursor(&mut self) -> Option<Cursor> {
        self.walk.cursor()
    }

    fn tags(&self) -> &Tags {
        self.walk.tags()
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn partition_key_vals(&self) -> &[String] {
        &self.kv
    }
}

struct MemGroupResultSet {
    groups: VecDeque<GroupSpec>,
    opts: CursorOpts,
    ledger: Arc<ResourceLedger>,
    err: Option<StorageError>,
    closed: bool,
}

impl Closable for MemGroupResultSet {
    fn close(&mut self) {
        self.ledger.record_close(self.closed);
        self.closed = true;
    }
}

impl GroupResultSet for MemGroupResultSet {
    fn next(&mut self) -> Option<Box<dyn GroupCursor>> {
        if self.closed {
            return None;
        }
        let spec = self.groups.pop_front()?;
        self.ledger.record_open();
        Some(Box::new(MemGroupCursor {
            keys: spec.keys,
            kv: spec.kv,
            walk: SeriesWalk::new(spec.series, self.opts, &self.ledger),
            closed: false,
        }))
    }

    fn err(&self) -> Option<StorageError> {
        self.err.clone()
    }
}

fn partition(req: &ReadRequest, series: Vec<MemSeries>) -> Result<Vec<GroupSpec>> {
    match req.group {
        Group::None => {
            if series.is_empty() {
                return Ok(Vec::new());
            }
            let keys: BTreeSet<String> = series
                .iter()
                .flat_map(|s| s.tags.keys().map(str::to_string))
                .collect();
            Ok(vec![GroupSpec {
                keys: keys.into_iter().collect(),
                kv: Vec::new(),
                series: apply_limits(series, req.series_offset, req.series_limit),
            }])
        }
        Group::By => {
            let keys: Vec<String> = req
                .group_keys
                .iter()
                .filter(|k| !is_reserved(k))
                .cloned()
                .collect();
            let mut parts: BTreeMap<Vec<String>, Vec<MemSeries>> = BTreeMap::new();
            for s in series {
                let kv = req
                    .group_keys
                    .iter()
                    .map(|k| {
                        if is_reserved(k) {
                            String::new()
                        } else {
                            s.tags.get(k).unwrap_or_default().to_string()
                        }
                    })
                    .collect();
                parts.entry(kv).or_default().push(s);
            }
            Ok(parts
                .into_iter()
                .map(|(kv, series)| GroupSpec {
                    keys: keys.clone(),
                    kv,
                    series: apply_limits(series, req.series_offset, req.series_limit),
                })
                .collect())
        }
        Group::Except | Group::All => Err(StorageError::Unsupported(format!(
            "group read with mode {:?}",
            req.group
        ))),
    }
}

impl Store for MemStore {
    fn get_source(&self, org_id: OrgId, bucket_id: BucketId) -> ReadSource {
        ReadSource { org_id, bucket_id }
    }

    fn read(
        &self,
        cancel: &CancellationToken,
        req: &ReadRequest,
    ) -> Result<Option<Box<dyn ResultSet>>> {
        self.begin(cancel, RecordedRequest::Read(req.clone()))?;
        let series = self.select(&req.read_source, req.predicate.as_ref())?;
        if series.is_empty() || self.nil_result_sets() {
            return Ok(None);
        }
        let series = apply_limits(series, req.series_offset, req.series_limit);
        debug!(series = series.len(), no_points = req.hints.no_points(), "mem store read");
        let opts = CursorOpts {
            descending: req.descending,
            points_limit: req.points_limit,
            ..self.cursor_opts(req.range)
        };
        Ok(Some(MemResultSet::boxed(
            SeriesWalk::new(series, opts, &self.ledger),
            self.result_set_error(),
        )))
    }

    fn group_read(
        &self,
        cancel: &CancellationToken,
        req: &ReadRequest,
    ) -> Result<Option<Box<dyn GroupResultSet>>> {
        self.begin(cancel, RecordedRequest::GroupRead(req.clone()))?;
        let series = self.select(&req.read_source, req.predicate.as_ref())?;
        let groups = partition(req, series)?;
        if groups.is_empty() || self.nil_result_sets() {
            return Ok(None);
        }
        debug!(groups = groups.len(), no_points = req.hints.no_points(), "mem store group read");
        let opts = CursorOpts {
            descending: req.descending,
            points_limit: req.points_limit,
            ..self.cursor_opts(req.range)
        };
        self.ledger.record_open();
        Ok(Some(Box::new(MemGroupResultSet {
            groups: groups.into(),
            opts,
            ledger: Arc::clone(&self.ledger),
            err: self.result_set_error(),
            closed: false,
        })))
    }

    fn read_filter(
        &self,
        cancel: &CancellationToken,
        req: &ReadFilterRequest,
    ) -> Result<Option<Box<dyn ResultSet>>> {
        self.begin(cancel, RecordedRequest::ReadFilter(req.clone()))?;
        let series = self.select(&req.read_source, req.predicate.as_ref())?;
        if series.is_empty() || self.nil_result_sets() {
            return Ok(None);
        }
        debug!(series = series.len(), "mem store read filter");
        Ok(Some(MemResultSet::boxed(
            SeriesWalk::new(series, self.cursor_opts(req.range), &self.ledger),
            self.result_set_error(),
        )))
    }

    fn tag_keys(&self, cancel: &CancellationToken, req: &TagKeysRequest) -> Result<StringIterator> {
        self.begin(cancel, RecordedRequest::TagKeys(req.clone()))?;
        let keys: BTreeSet<String> = self
            .select(&req.tags_source, req.predicate.as_ref())?
            .into_iter()
            .filter(|s| s.data.has_points_in(&req.range))
            .flat_map(|s| s.tags.keys().map(str::to_string).collect::<Vec<_>>())
            .collect();
        Ok(Box::new(keys.into_iter()))
    }

    fn tag_values(
        &self,
        cancel: &CancellationToken,
        req: &TagValuesRequest,
    ) -> Result<StringIterator> {
        self.begin(cancel, RecordedRequest::TagValues(req.clone()))?;
        let key = match req.tag_key.as_str() {
            MEASUREMENT_TAG_KEY => MEASUREMENT_ALIAS,
            FIELD_KEY_TAG_KEY => FIELD_ALIAS,
            other => other,
        };
        let values: BTreeSet<String> = self
            .select(&req.tags_source, req.predicate.as_ref())?
            .into_iter()
            .filter(|s| s.data.has_points_in(&req.range))
            .filter_map(|s| s.tags.get(key).map(str::to_string))
            .collect();
        Ok(Box::new(values.into_iter()))
    }
}
