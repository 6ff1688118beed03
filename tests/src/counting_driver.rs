use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tabula::driver::Driver;
use tokio::sync::Notify;
use tabula_core::{
    async_trait,
    driver::{Connection, Operation, Response},
    schema::db::Schema,
    Error, Result,
};
use url::Url;

/// A driver wrapper that counts the connections it opens and closes and
/// logs every operation executed through them.
#[derive(Debug)]
pub struct CountingDriver {
    inner: Box<dyn Driver>,
    stats: Arc<Stats>,
}

/// Shared between a [`CountingDriver`] and the test holding it.
#[derive(Debug, Default)]
pub struct Stats {
    opened: AtomicUsize,
    closed: AtomicUsize,

    /// When set, the next connect fails without reaching the inner driver
    fail_next_connect: AtomicBool,

    /// When set, the next connect waits for [`Stats::release_connect`]
    hold_next_connect: AtomicBool,
    held: Notify,
    released: Notify,

    /// Log of all operations executed through this driver
    ops_log: Mutex<Vec<DriverOp>>,
}

#[derive(Debug, Clone)]
pub struct DriverOp {
    pub url: String,
    pub operation: Operation,

    /// `None` if the operation failed
    pub response: Option<Response>,
}

impl CountingDriver {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            inner: driver,
            stats: Arc::default(),
        }
    }

    /// Get a handle on the counters and the operations log
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }
}

impl Stats {
    /// Connections opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Connections closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn open(&self) -> usize {
        self.opened() - self.closed()
    }

    /// Makes the next connect fail with a driver error.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// Makes the next connect wait until [`release_connect`] is called.
    ///
    /// [`release_connect`]: Self::release_connect
    pub fn hold_next_connect(&self) {
        self.hold_next_connect.store(true, Ordering::SeqCst);
    }

    /// Waits until a held connect has started.
    pub async fn connect_held(&self) {
        self.held.notified().await;
    }

    pub fn release_connect(&self) {
        self.released.notify_one();
    }

    pub fn ops(&self) -> Vec<DriverOp> {
        self.ops_log.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Driver for CountingDriver {
    async fn connect(&self, url: &Url, schema: Arc<Schema>) -> Result<Box<dyn Connection>> {
        if self.stats.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(Error::driver(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection to {url} refused"),
            )));
        }

        if self.stats.hold_next_connect.swap(false, Ordering::SeqCst) {
            self.stats.held.notify_one();
            self.stats.released.notified().await;
        }

        let inner = self.inner.connect(url, schema).await?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(CountingConnection {
            url: url.to_string(),
            inner,
            stats: self.stats.clone(),
        }))
    }
}

#[derive(Debug)]
struct CountingConnection {
    url: String,

    /// The underlying connection that actually executes operations
    inner: Box<dyn Connection>,

    stats: Arc<Stats>,
}

#[async_trait]
impl Connection for CountingConnection {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    async fn exec(&mut self, operation: Operation) -> Result<Response> {
        let operation_clone = operation.clone();
        let response = self.inner.exec(operation).await;

        self.stats.ops_log.lock().unwrap().push(DriverOp {
            url: self.url.clone(),
            operation: operation_clone,
            response: response.as_ref().ok().cloned(),
        });

        response
    }

    async fn push_schema(&mut self) -> Result<()> {
        self.inner.push_schema().await
    }
}

impl Drop for CountingConnection {
    fn drop(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}
