//! Result-set iterators returned by the storage engine.

use crate::cursor::Cursor;
use crate::error::StorageError;
use crate::guard::Closable;
use crate::tags::Tags;

/// Single-pass iterator over `(tags, cursor)` pairs, one per series.
///
/// Not safe for use by more than one read loop.
pub trait ResultSet: Closable + Send {
    /// Advance to the next series. Returns `false` once exhausted.
    fn next(&mut self) -> bool;

    /// Take the cursor of the current series. `None` means no data for this
    /// series/field combination. Ownership moves to the caller.
    fn cursor(&mut self) -> Option<Cursor>;

    /// Tags of the current series.
    fn tags(&self) -> &Tags;

    /// Sticky error, readable after `next` returned `false`.
    fn err(&self) -> Option<StorageError>;
}

/// One partition of a grouped read.
pub trait GroupCursor: Closable + Send {
    /// Advance to the next series of the partition.
    fn next(&mut self) -> bool;

    fn cursor(&mut self) -> Option<Cursor>;

    fn tags(&self) -> &Tags;

    /// Tag keys that become the group table's columns, in declared order.
    fn keys(&self) -> &[String];

    /// Partition values, aligned by index with the request's group keys.
    fn partition_key_vals(&self) -> &[String];
}

/// Outer iterator of a grouped read: one `GroupCursor` per partition.
pub trait GroupResultSet: Closable + Send {
    fn next(&mut self) -> Option<Box<dyn GroupCursor>>;

    fn err(&self) -> Option<StorageError>;
}

/// Flat string sequence returned by tag-keys and tag-values requests.
pub type StringIterator = Box<dyn Iterator<Item = String> + Send>;
