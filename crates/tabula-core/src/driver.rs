pub mod operation;
pub use operation::Operation;

mod response;
pub use response::{Response, Rows};

use crate::{async_trait, schema::db::Schema, Result};

use std::{fmt::Debug, sync::Arc};
use url::Url;

/// Opens store handles.
///
/// A driver is given the connection URL of the store endpoint and the
/// table-mapping snapshot the handle serves. Every handle it returns is
/// owned by exactly one access context and is released when dropped.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Open a connection to the store at `url`, resolving tables through
    /// `schema`.
    async fn connect(&self, url: &Url, schema: Arc<Schema>) -> Result<Box<dyn Connection>>;
}

/// A store handle bound to one table-mapping snapshot.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// The table-mapping snapshot the connection was opened with.
    fn schema(&self) -> &Arc<Schema>;

    /// Execute a database operation
    async fn exec(&mut self, op: Operation) -> Result<Response>;

    /// Creates the snapshot's tables that do not exist yet.
    async fn push_schema(&mut self) -> Result<()>;
}
