//! An in-memory store for Tabula.
//!
//! Databases are named by the connection URL, e.g. `memory://blogging`, and
//! live as long as the [`Memory`] driver that created them. Every
//! connection to the same name sees the same tables.

mod database;
pub use database::Database;

mod error;
pub use error::MemoryError;

use database::{Rows, Undo};

use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tabula_core::{
    async_trait,
    driver::{
        operation::{Operation, Transaction},
        Driver, Response,
    },
    schema::db::Schema,
    stmt, Error, Result,
};
use tracing::debug;
use url::Url;

/// URL scheme served by the in-memory driver.
pub const SCHEME: &str = "memory";

#[derive(Debug, Default, Clone)]
pub struct Memory {
    databases: Arc<Mutex<HashMap<String, Arc<Mutex<Database>>>>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the database named `name`, creating it if needed.
    pub fn database(&self, name: &str) -> Arc<Mutex<Database>> {
        lock(&self.databases)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Database::new(name))))
            .clone()
    }

    /// Stored records of `table` in database `name`, or `None` if the table
    /// does not exist.
    pub fn records(&self, name: &str, table: &str) -> Option<Vec<stmt::ValueRecord>> {
        lock(&self.database(name)).records(table)
    }

    /// Names of the tables in database `name`.
    pub fn table_names(&self, name: &str) -> Vec<String> {
        lock(&self.database(name))
            .table_names()
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Driver for Memory {
    async fn connect(
        &self,
        url: &Url,
        schema: Arc<Schema>,
    ) -> Result<Box<dyn tabula_core::Connection>> {
        let name = database_name(url)?;
        let database = self.database(&name);

        debug!(database = %name, tables = schema.tables.len(), "memory connection opened");

        Ok(Box::new(Connection {
            name,
            database,
            schema,
            transaction: None,
        }))
    }
}

fn database_name(url: &Url) -> Result<String> {
    if url.scheme() != SCHEME {
        return Err(Error::invalid_connection_url(format!(
            "connection URL does not have a `{SCHEME}` scheme; url={url}"
        )));
    }

    let name = format!(
        "{}{}",
        url.host_str().unwrap_or_default(),
        url.path().trim_matches('/')
    );

    if name.is_empty() {
        return Err(Error::invalid_connection_url(format!(
            "connection URL does not name a database; url={url}"
        )));
    }

    Ok(name)
}

/// A connection to one in-memory database.
///
/// Writes made inside a transaction are applied at once and logged;
/// rollback undoes the logged writes only. Transactions are not isolated
/// from other connections to the same database.
#[derive(Debug)]
pub struct Connection {
    name: String,
    database: Arc<Mutex<Database>>,
    schema: Arc<Schema>,

    /// Undo log of the open transaction
    transaction: Option<Vec<Undo>>,
}

#[async_trait]
impl tabula_core::Connection for Connection {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    async fn exec(&mut self, op: Operation) -> Result<Response> {
        let mut database = lock(&self.database);
        let schema = &self.schema;
        let transaction = &mut self.transaction;

        let response = match op {
            Operation::Insert(op) => {
                let table = schema.table(op.table);
                table
                    .check_record(&op.record)
                    .map_err(MemoryError::RecordMismatch)?;

                let rows = database.rows_mut(table)?;
                if rows.contains_key(&op.key) {
                    return Err(MemoryError::DuplicateKey {
                        table: table.name.clone(),
                        key: op.key,
                    }
                    .into());
                }

                if let Some(log) = transaction.as_mut() {
                    log.push(Undo::Remove {
                        table: table.name.clone(),
                        key: op.key.clone(),
                    });
                }

                rows.insert(op.key, op.record);
                Response::count(1)
            }
            Operation::UpdateByKey(op) => {
                let table = schema.table(op.table);
                table
                    .check_record(&op.record)
                    .map_err(MemoryError::RecordMismatch)?;

                match database.rows_mut(table)?.get_mut(&op.key) {
                    Some(stored) => {
                        let record = mem::replace(stored, op.record);

                        if let Some(log) = transaction.as_mut() {
                            log.push(Undo::Restore {
                                table: table.name.clone(),
                                key: op.key,
                                record,
                            });
                        }

                        Response::count(1)
                    }
                    None => Response::count(0),
                }
            }
            Operation::DeleteByKey(op) => {
                let table = schema.table(op.table);
                let rows = database.rows_mut(table)?;
                let mut count = 0;

                for key in &op.keys {
                    let Some((index, key, record)) = rows.shift_remove_full(key) else {
                        continue;
                    };

                    if let Some(log) = transaction.as_mut() {
                        log.push(Undo::Reinsert {
                            table: table.name.clone(),
                            index,
                            key,
                            record,
                        });
                    }

                    count += 1;
                }

                Response::count(count)
            }
            Operation::GetByKey(op) => {
                let rows = database.rows(schema.table(op.table))?;
                Response::values(
                    op.keys
                        .iter()
                        .filter_map(|key| rows.get(key).cloned())
                        .collect(),
                )
            }
            Operation::QueryTable(op) => {
                let rows: &Rows = database.rows(schema.table(op.table))?;
                Response::values(rows.values().cloned().collect())
            }
            Operation::Transaction(Transaction::Start) => {
                if transaction.is_some() {
                    return Err(MemoryError::NestedTransaction.into());
                }
                *transaction = Some(vec![]);
                Response::count(0)
            }
            Operation::Transaction(Transaction::Commit) => {
                if transaction.take().is_none() {
                    return Err(MemoryError::NoTransaction.into());
                }
                Response::count(0)
            }
            Operation::Transaction(Transaction::Rollback) => {
                let Some(log) = transaction.take() else {
                    return Err(MemoryError::NoTransaction.into());
                };
                database.undo(log);
                Response::count(0)
            }
        };

        Ok(response)
    }

    async fn push_schema(&mut self) -> Result<()> {
        let mut database = lock(&self.database);

        for table in &self.schema.tables {
            if database.create_table(table) {
                debug!(database = %self.name, table = %table.name, "table created");
            }
        }

        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(log) = self.transaction.take() {
            debug!(database = %self.name, "rolling back unfinished transaction");
            lock(&self.database).undo(log);
        }

        debug!(database = %self.name, "memory connection closed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
