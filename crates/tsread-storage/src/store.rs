//! The storage-engine collaborator consumed by the read coordinators.

use tokio_util::sync::CancellationToken;
use tsread_core::id::{BucketId, OrgId};

use crate::error::Result;
use crate::request::{ReadFilterRequest, ReadRequest, ReadSource, TagKeysRequest, TagValuesRequest};
use crate::result_set::{GroupResultSet, ResultSet, StringIterator};

/// Storage engine entry points.
///
/// `Ok(None)` from a read means there is nothing to iterate; callers treat it
/// as success with zero tables. `cancel` is the caller's cancellation token
/// and may be observed by long-running implementations.
pub trait Store: Send + Sync {
    fn get_source(&self, org_id: OrgId, bucket_id: BucketId) -> ReadSource;

    fn read(&self, cancel: &CancellationToken, req: &ReadRequest)
        -> Result<Option<Box<dyn ResultSet>>>;

    fn group_read(
        &self,
        cancel: &CancellationToken,
        req: &ReadRequest,
    ) -> Result<Option<Box<dyn GroupResultSet>>>;

    fn read_filter(
        &self,
        cancel: &CancellationToken,
        req: &ReadFilterRequest,
    ) -> Result<Option<Box<dyn ResultSet>>>;

    fn tag_keys(&self, cancel: &CancellationToken, req: &TagKeysRequest) -> Result<StringIterator>;

    fn tag_values(&self, cancel: &CancellationToken, req: &TagValuesRequest)
        -> Result<StringIterator>;
}
