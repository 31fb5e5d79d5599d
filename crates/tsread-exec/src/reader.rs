//! Read coordinators.
//!
//! Each entry point returns a `TableIterator`; nothing touches storage until
//! `run` is called. A run issues exactly one storage request, then walks the
//! result set: derive the key, build the table, hand it to the consumer, wait
//! for its producer to finish (or the call to be cancelled), close it and add
//! its statistics. At most one table is open at a time.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use tsread_core::bounds::Bounds;
use tsread_core::config::ReaderConfig;
use tsread_core::group_key::{GroupKey, GroupMode};
use tsread_core::id::{BucketId, OrgId};
use tsread_core::schema::{ColMeta, DataType, DEFAULT_VALUE_COL_LABEL};
use tsread_core::stats::ScanStatistics;
use tsread_core::types::{Column, ColumnValues, RowBatch};
use tsread_storage::{
    Aggregate, AggregateType, Group, GroupResultSet, Guarded, Predicate, PredicateCompiler,
    ReadFilterRequest, ReadRequest, ReadSource, ResultSet, Store, StringIterator, TagKeysRequest,
    TagValuesRequest, TimestampRange,
};
use tsread_storage::tags::{FIELD_ALIAS, FIELD_KEY_TAG_KEY, MEASUREMENT_ALIAS, MEASUREMENT_TAG_KEY};
use tsread_table::{
    build_group_table, build_series_table, group_has_points, group_key_for_group,
    group_key_for_series, has_points, no_points_group_table, no_points_series_table,
    BuildContext, ReadTable, TableError, TableHandle,
};

use crate::aggregate::{convert_group_mode, determine_aggregate_method};
use crate::consumer::TableConsumer;
use crate::descriptor::{ReadFilterSpec, ReadSpec, ReadTagKeysSpec, ReadTagValuesSpec};
use crate::error::Result;
use crate::metrics::record_scan;

/// A prepared read. `run` performs it, delivering every table to `consumer`.
#[async_trait]
pub trait TableIterator: Send {
    /// Returns `Ok(())` when the call was cancelled.
    async fn run(&mut self, consumer: &mut dyn TableConsumer) -> Result<()>;

    /// Scan statistics summed over every table released so far.
    fn statistics(&self) -> ScanStatistics;
}

/// Entry point of the read path over one storage engine.
pub struct StoreReader<C> {
    store: Arc<dyn Store>,
    compiler: Arc<C>,
    config: ReaderConfig,
}

impl<C: PredicateCompiler + 'static> StoreReader<C> {
    pub fn new(store: Arc<dyn Store>, compiler: C) -> Self {
        Self {
            store,
            compiler: Arc::new(compiler),
            config: ReaderConfig::default(),
        }
    }

    pub fn with_config(store: Arc<dyn Store>, compiler: C, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            compiler: Arc::new(compiler),
            config,
        })
    }

    /// Reader configured from `TSREAD_*` environment variables.
    pub fn from_env(store: Arc<dyn Store>, compiler: C) -> Result<Self> {
        Self::with_config(store, compiler, ReaderConfig::from_env())
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn call(&self, cancel: &CancellationToken, bounds: Bounds) -> Call<C> {
        Call {
            store: Arc::clone(&self.store),
            compiler: Arc::clone(&self.compiler),
            config: self.config.clone(),
            cancel: cancel.clone(),
            bounds,
            stats: ScanStatistics::default(),
        }
    }

    /// Bounded read, grouped per `spec.group_mode`.
    pub fn read(
        &self,
        cancel: &CancellationToken,
        spec: ReadSpec<C::Expr>,
        bounds: Bounds,
    ) -> ReadIterator<C> {
        ReadIterator {
            call: self.call(cancel, bounds),
            spec,
        }
    }

    /// One table per matching series.
    pub fn read_filter(
        &self,
        cancel: &CancellationToken,
        spec: ReadFilterSpec<C::Expr>,
        bounds: Bounds,
    ) -> FilterIterator<C> {
        FilterIterator {
            call: self.call(cancel, bounds),
            spec,
        }
    }

    /// One single-column table listing tag keys.
    pub fn read_tag_keys(
        &self,
        cancel: &CancellationToken,
        spec: ReadTagKeysSpec<C::Expr>,
        bounds: Bounds,
    ) -> TagKeysIterator<C> {
        TagKeysIterator {
            call: self.call(cancel, bounds),
            spec,
        }
    }

    /// One single-column table listing the values of `spec.tag_key`.
    pub fn read_tag_values(
        &self,
        cancel: &CancellationToken,
        spec: ReadTagValuesSpec<C::Expr>,
        bounds: Bounds,
    ) -> TagValuesIterator<C> {
        TagValuesIterator {
            call: self.call(cancel, bounds),
            spec,
        }
    }
}

/// Everything one call needs, plus its running statistics.
struct Call<C> {
    store: Arc<dyn Store>,
    compiler: Arc<C>,
    config: ReaderConfig,
    cancel: CancellationToken,
    bounds: Bounds,
    stats: ScanStatistics,
}

impl<C: PredicateCompiler> Call<C> {
    fn compile(&self, expr: Option<&C::Expr>) -> Result<Option<Predicate>> {
        Ok(expr.map(|e| self.compiler.compile(e)).transpose()?)
    }

    fn source(&self, org_id: OrgId, bucket_id: BucketId) -> ReadSource {
        self.store.get_source(org_id, bucket_id)
    }

    fn range(&self) -> TimestampRange {
        TimestampRange {
            start: self.bounds.start,
            end: self.bounds.stop,
        }
    }

    /// Hand a table to the consumer and release it. Returns `false` once the
    /// call has been cancelled. A consumer error is returned as is.
    async fn deliver(
        &mut self,
        mut table: TableHandle,
        consumer: &mut dyn TableConsumer,
    ) -> Result<bool> {
        let Some(read_table) = table.take_table() else {
            trace!(key = %table.key(), "skipping empty table");
            self.stats += table.close().await?;
            return Ok(true);
        };
        trace!(key = %table.key(), fingerprint = %table.key().fingerprint(), "delivering table");
        if let Err(e) = consumer.consume(read_table).await {
            warn!(error = %e, "table consumer failed");
            table.cancel();
            match table.close().await {
                Ok(stats) => self.stats += stats,
                Err(close_err) => {
                    warn!(error = %close_err, "closing table after consumer failure")
                }
            }
            return Err(e);
        }
        let cancelled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => true,
            _ = table.done() => false,
        };
        if cancelled {
            debug!(key = %table.key(), "read cancelled");
            table.cancel();
        }
        self.stats += table.close().await?;
        Ok(!cancelled)
    }

    async fn handle_read(
        &mut self,
        rs: Box<dyn ResultSet>,
        mode: GroupMode,
        group_keys: &[String],
        consumer: &mut dyn TableConsumer,
    ) -> Result<()> {
        let mut rs = Guarded::new(rs);
        let cancel = self.cancel.clone();
        let ctx = BuildContext {
            bounds: self.bounds,
            buffer: self.config.table_buffer,
            cancel: &cancel,
        };
        while rs.next() {
            let Some(cursor) = rs.cursor() else {
                trace!(tags = ?rs.tags(), "series has no cursor");
                continue;
            };
            let cursor = Guarded::new(cursor);
            let key = group_key_for_series(rs.tags(), mode, group_keys, &self.bounds)?;
            let table = build_series_table(cursor.into_inner(), rs.tags(), key, &ctx)?;
            if !self.deliver(table, consumer).await? {
                return Ok(());
            }
        }
        finish(rs)
    }

    async fn handle_read_no_points(
        &mut self,
        rs: Box<dyn ResultSet>,
        mode: GroupMode,
        group_keys: &[String],
        consumer: &mut dyn TableConsumer,
    ) -> Result<()> {
        let mut rs = Guarded::new(rs);
        while rs.next() {
            if !has_points(rs.cursor())? {
                trace!(tags = ?rs.tags(), "series has no points");
                continue;
            }
            let key = group_key_for_series(rs.tags(), mode, group_keys, &self.bounds)?;
            let table = no_points_series_table(rs.tags(), key);
            if !self.deliver(table, consumer).await? {
                return Ok(());
            }
        }
        finish(rs)
    }

    async fn handle_group_read(
        &mut self,
        rs: Box<dyn GroupResultSet>,
        group_keys: &[String],
        consumer: &mut dyn TableConsumer,
    ) -> Result<()> {
        let mut rs = Guarded::new(rs);
        let cancel = self.cancel.clone();
        let ctx = BuildContext {
            bounds: self.bounds,
            buffer: self.config.table_buffer,
            cancel: &cancel,
        };
        while let Some(gc) = rs.next() {
            let key = group_key_for_group(gc.partition_key_vals(), group_keys, &self.bounds);
            let table = build_group_table(gc, key, &ctx)?;
            if !self.deliver(table, consumer).await? {
                return Ok(());
            }
        }
        finish_group(rs)
    }

    async fn handle_group_read_no_points(
        &mut self,
        rs: Box<dyn GroupResultSet>,
        group_keys: &[String],
        consumer: &mut dyn TableConsumer,
    ) -> Result<()> {
        let mut rs = Guarded::new(rs);
        while let Some(gc) = rs.next() {
            let mut gc = Guarded::new(gc);
            if !group_has_points(&mut **gc)? {
                trace!(kv = ?gc.partition_key_vals(), "group has no points");
                continue;
            }
            let key = group_key_for_group(gc.partition_key_vals(), group_keys, &self.bounds);
            let table = no_points_group_table(gc.keys(), key);
            let more = self.deliver(table, consumer).await?;
            gc.close();
            if !more {
                return Ok(());
            }
        }
        finish_group(rs)
    }
}

fn finish(rs: Guarded<Box<dyn ResultSet>>) -> Result<()> {
    let err = rs.err();
    rs.close();
    match err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn finish_group(rs: Guarded<Box<dyn GroupResultSet>>) -> Result<()> {
    let err = rs.err();
    rs.close();
    match err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Drain `values` into one `_value` string column and deliver it, whole,
/// as a table with an empty group key. The consumer owns the table.
async fn deliver_strings(
    values: StringIterator,
    capacity: usize,
    consumer: &mut dyn TableConsumer,
) -> Result<()> {
    let mut column = Vec::with_capacity(capacity);
    column.extend(values);
    let rows = RowBatch {
        columns: vec![Column::new(
            DEFAULT_VALUE_COL_LABEL,
            ColumnValues::Utf8(column),
        )],
    };
    let cols = vec![ColMeta::new(DEFAULT_VALUE_COL_LABEL, DataType::Utf8)];
    consumer
        .consume(ReadTable::materialized(GroupKey::empty(), cols, Some(rows)))
        .await
}

/// Query-facing tag key to the key the storage engine stores.
pub fn storage_tag_key(key: &str) -> &str {
    match key {
        MEASUREMENT_ALIAS => MEASUREMENT_TAG_KEY,
        FIELD_ALIAS => FIELD_KEY_TAG_KEY,
        other => other,
    }
}

pub struct ReadIterator<C: PredicateCompiler> {
    call: Call<C>,
    spec: ReadSpec<C::Expr>,
}

impl<C: PredicateCompiler> ReadIterator<C> {
    async fn execute(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let spec = &self.spec;
        if spec.group_mode == GroupMode::Except {
            return Err(TableError::UnsupportedGroupMode(spec.group_mode).into());
        }
        let aggregate = determine_aggregate_method(&spec.aggregate_method)?;
        let predicate = self.call.compile(spec.predicate.as_ref())?;

        let mut req = ReadRequest::new(
            self.call.source(spec.org_id, spec.bucket_id),
            self.call.range(),
        );
        req.predicate = predicate;
        req.descending = spec.descending;
        req.group = convert_group_mode(spec.group_mode);
        req.group_keys = spec.group_keys.clone();
        req.series_limit = spec.series_limit;
        req.series_offset = spec.series_offset;
        req.points_limit = spec.points_limit;
        if aggregate != AggregateType::None {
            req.aggregate = Some(Aggregate { kind: aggregate });
        }
        let no_points = spec.is_no_points();
        if no_points {
            req.hints.set_no_points();
        }
        debug!(
            org = %spec.org_id,
            bucket = %spec.bucket_id,
            group = ?req.group,
            aggregate = aggregate.as_str_name(),
            no_points,
            "read"
        );

        if req.group == Group::All {
            let Some(rs) = self.call.store.read(&self.call.cancel, &req)? else {
                return Ok(());
            };
            if no_points {
                self.call
                    .handle_read_no_points(rs, spec.group_mode, &spec.group_keys, consumer)
                    .await
            } else {
                self.call
                    .handle_read(rs, spec.group_mode, &spec.group_keys, consumer)
                    .await
            }
        } else {
            let Some(rs) = self.call.store.group_read(&self.call.cancel, &req)? else {
                return Ok(());
            };
            if no_points {
                self.call
                    .handle_group_read_no_points(rs, &spec.group_keys, consumer)
                    .await
            } else {
                self.call
                    .handle_group_read(rs, &spec.group_keys, consumer)
                    .await
            }
        }
    }
}

#[async_trait]
impl<C: PredicateCompiler + 'static> TableIterator for ReadIterator<C> {
    async fn run(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let result = self.execute(consumer).await;
        record_scan("read", self.call.stats);
        result
    }

    fn statistics(&self) -> ScanStatistics {
        self.call.stats
    }
}

pub struct FilterIterator<C: PredicateCompiler> {
    call: Call<C>,
    spec: ReadFilterSpec<C::Expr>,
}

impl<C: PredicateCompiler> FilterIterator<C> {
    async fn execute(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let req = ReadFilterRequest {
            read_source: self.call.source(self.spec.org_id, self.spec.bucket_id),
            predicate: self.call.compile(self.spec.predicate.as_ref())?,
            range: self.call.range(),
        };
        debug!(org = %self.spec.org_id, bucket = %self.spec.bucket_id, "read filter");
        let Some(rs) = self.call.store.read_filter(&self.call.cancel, &req)? else {
            return Ok(());
        };
        self.call
            .handle_read(rs, GroupMode::All, &[], consumer)
            .await
    }
}

#[async_trait]
impl<C: PredicateCompiler + 'static> TableIterator for FilterIterator<C> {
    async fn run(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let result = self.execute(consumer).await;
        record_scan("read_filter", self.call.stats);
        result
    }

    fn statistics(&self) -> ScanStatistics {
        self.call.stats
    }
}

pub struct TagKeysIterator<C: PredicateCompiler> {
    call: Call<C>,
    spec: ReadTagKeysSpec<C::Expr>,
}

#[async_trait]
impl<C: PredicateCompiler + 'static> TableIterator for TagKeysIterator<C> {
    async fn run(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let req = TagKeysRequest {
            tags_source: self.call.source(self.spec.org_id, self.spec.bucket_id),
            predicate: self.call.compile(self.spec.predicate.as_ref())?,
            range: self.call.range(),
        };
        debug!(org = %self.spec.org_id, bucket = %self.spec.bucket_id, "read tag keys");
        let keys = self.call.store.tag_keys(&self.call.cancel, &req)?;
        deliver_strings(keys, self.call.config.tag_values_capacity, consumer).await
    }

    fn statistics(&self) -> ScanStatistics {
        self.call.stats
    }
}

pub struct TagValuesIterator<C: PredicateCompiler> {
    call: Call<C>,
    spec: ReadTagValuesSpec<C::Expr>,
}

#[async_trait]
impl<C: PredicateCompiler + 'static> TableIterator for TagValuesIterator<C> {
    async fn run(&mut self, consumer: &mut dyn TableConsumer) -> Result<()> {
        let req = TagValuesRequest {
            tags_source: self.call.source(self.spec.org_id, self.spec.bucket_id),
            predicate: self.call.compile(self.spec.predicate.as_ref())?,
            range: self.call.range(),
            tag_key: storage_tag_key(&self.spec.tag_key).to_string(),
        };
        debug!(
            org = %self.spec.org_id,
            bucket = %self.spec.bucket_id,
            tag_key = %self.spec.tag_key,
            "read tag values"
        );
        let values = self.call.store.tag_values(&self.call.cancel, &req)?;
        deliver_strings(values, self.call.config.tag_values_capacity, consumer).await
    }

    fn statistics(&self) -> ScanStatistics {
        self.call.stats
    }
}
