//! Access contexts: the per-session unit of work.

mod identity_map;
pub use identity_map::{EntityState, Resolution};
use identity_map::{resolve_delete, IdentityMap, Instance};

use crate::{
    catalog::Catalog,
    generation::{CacheKey, Generation},
    rule::RuleSet,
    Model, Session, TableMapping,
};
use tabula_core::{
    driver::{
        operation::{self, Transaction},
        Connection,
    },
    schema::{app::ModelId, Schema},
    stmt, Error, Result,
};

use std::{
    any::Any,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use url::Url;

/// A store context bound to one rule set and one generation.
///
/// The context owns exactly one store connection and the set of entities it
/// tracks. Its generation, rule set and compiled schema never change after
/// construction: remapping builds a new context instead.
pub struct AccessContext {
    session: Session,
    cache_key: CacheKey,
    rules: Arc<RuleSet>,
    schema: Arc<Schema>,
    catalog: Arc<Catalog>,
    url: Url,
    connection: Option<Box<dyn Connection>>,
    tracked: IdentityMap,
}

impl AccessContext {
    pub(crate) fn new(
        session: Session,
        cache_key: CacheKey,
        rules: Arc<RuleSet>,
        schema: Arc<Schema>,
        catalog: Arc<Catalog>,
        url: Url,
        connection: Box<dyn Connection>,
    ) -> Self {
        debug!(
            %session,
            generation = %cache_key.generation,
            url = %url,
            "access context created"
        );

        Self {
            session,
            cache_key,
            rules,
            schema,
            catalog,
            url,
            connection: Some(connection),
            tracked: IdentityMap::default(),
        }
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn generation(&self) -> Generation {
        self.cache_key.generation
    }

    pub fn cache_key(&self) -> CacheKey {
        self.cache_key
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The store endpoint the connection was opened against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_disposed(&self) -> bool {
        self.connection.is_none()
    }

    /// Number of tracked entities.
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// The physical table `M` resolves to in this context.
    pub fn table_name<M: Model>(&self) -> Result<TableMapping> {
        let model = self.catalog.model_id_of::<M>()?;
        Ok(self.schema.table_mapping(model))
    }

    /// The physical table of every registered entity type in this context.
    pub fn table_names(&self) -> Vec<TableMapping> {
        self.schema.table_mappings()
    }

    /// Pending change of a tracked instance.
    pub fn state_of<M: Model>(&self, model: &Arc<M>) -> Option<EntityState> {
        let instance: Instance = model.clone();
        self.tracked.state_of(&instance)
    }

    /// Starts tracking `model` as a new entity. It is inserted on the next
    /// [`save`](Self::save).
    pub fn add<M: Model>(&mut self, model: M) -> Result<Arc<M>> {
        let model_id = self.catalog.model_id_of::<M>()?;
        let model = Arc::new(model);
        let key = self.key_of(model_id, &model)?;

        if self.tracked.get(model_id, &key).is_some() {
            return Err(Error::identity_conflict(M::NAME, key));
        }

        let record = model.to_record();
        self.tracked
            .track(model_id, key, model.clone(), record, EntityState::Added);
        Ok(model)
    }

    /// Adds `model` and saves immediately.
    pub async fn create<M: Model>(&mut self, model: M) -> Result<Arc<M>> {
        let model = self.add(model)?;
        self.save().await?;
        Ok(model)
    }

    /// Finds an entity by primary key: the tracked instance if there is one,
    /// otherwise the stored record.
    pub async fn get<M: Model>(&mut self, key: impl Into<stmt::Key>) -> Result<Option<Arc<M>>> {
        let model_id = self.catalog.model_id_of::<M>()?;
        let key = key.into();

        if let Some(entry) = self.tracked.get(model_id, &key) {
            if entry.state == EntityState::Deleted {
                return Ok(None);
            }
            return Ok(Some(downcast(entry.instance.clone())?));
        }

        let table = self.schema.table_id_for(model_id);
        let records = self
            .connection()?
            .exec(
                operation::GetByKey {
                    table,
                    keys: vec![key.clone()],
                }
                .into(),
            )
            .await?
            .into_values()?;

        match records.into_iter().next() {
            Some(record) => Ok(Some(self.attach::<M>(model_id, key, record)?)),
            None => Ok(None),
        }
    }

    /// Every stored entity of `M`. Instances already tracked are returned
    /// as tracked; entities marked for deletion are skipped.
    pub async fn all<M: Model>(&mut self) -> Result<Vec<Arc<M>>> {
        let model_id = self.catalog.model_id_of::<M>()?;
        let table = self.schema.table_id_for(model_id);

        let records = self
            .connection()?
            .exec(operation::QueryTable { table }.into())
            .await?
            .into_values()?;

        let mut models = Vec::with_capacity(records.len());

        for record in records {
            let key = self.catalog.model(model_id).key_of(&record);

            match self.tracked.get(model_id, &key) {
                Some(entry) if entry.state == EntityState::Deleted => {}
                Some(entry) => models.push(downcast(entry.instance.clone())?),
                None => models.push(self.attach::<M>(model_id, key, record)?),
            }
        }

        Ok(models)
    }

    pub async fn filter<M: Model>(
        &mut self,
        predicate: impl Fn(&M) -> bool,
    ) -> Result<Vec<Arc<M>>> {
        let mut models = self.all::<M>().await?;
        models.retain(|model| predicate(&**model));
        Ok(models)
    }

    pub async fn count<M: Model>(&mut self, predicate: impl Fn(&M) -> bool) -> Result<usize> {
        Ok(self.filter(predicate).await?.len())
    }

    pub async fn order_by<M: Model, K: Ord>(
        &mut self,
        key: impl Fn(&M) -> K,
        ascending: bool,
    ) -> Result<Vec<Arc<M>>> {
        let mut models = self.all::<M>().await?;
        sort(&mut models, key, ascending);
        Ok(models)
    }

    /// One page of the entities matching `predicate`, ordered ascending by
    /// `key`. Pages are numbered from 1; page 0 is treated as page 1.
    pub async fn page<M: Model, K: Ord>(
        &mut self,
        page_size: usize,
        page_index: usize,
        predicate: impl Fn(&M) -> bool,
        key: impl Fn(&M) -> K,
    ) -> Result<Vec<Arc<M>>> {
        let mut models = self.filter(predicate).await?;
        sort(&mut models, key, true);

        let skip = page_index.max(1).saturating_sub(1).saturating_mul(page_size);
        Ok(models.into_iter().skip(skip).take(page_size).collect())
    }

    /// Replaces the entity with `model`'s primary key. The replacement is
    /// written on the next [`save`](Self::save).
    ///
    /// If another instance tracks the key, the slot moves to `model`.
    pub fn update<M: Model>(&mut self, model: M) -> Result<Arc<M>> {
        let model_id = self.catalog.model_id_of::<M>()?;
        let model = Arc::new(model);
        let key = self.key_of(model_id, &model)?;

        let state = match self.tracked.get(model_id, &key).map(|entry| entry.state) {
            Some(EntityState::Added) => EntityState::Added,
            _ => EntityState::Modified,
        };

        let record = model.to_record();
        self.tracked
            .rebind(model_id, key, model.clone(), record, state);
        Ok(model)
    }

    /// Marks one tracked entity of `M` for removal on behalf of `model`.
    ///
    /// When a different instance is already tracked under `model`'s primary
    /// key, that instance is the one marked and the result is
    /// [`Resolution::ByKey`].
    pub fn delete<M: Model>(&mut self, model: impl Into<Arc<M>>) -> Result<Resolution> {
        let model_id = self.catalog.model_id_of::<M>()?;
        let model: Arc<M> = model.into();
        let instance: Instance = model;

        let resolution = resolve_delete(
            &mut self.tracked,
            model_id,
            M::NAME,
            &instance,
            self.catalog.key_descriptor(model_id),
        )?;

        debug!(
            session = %self.session,
            entity = M::NAME,
            ?resolution,
            "entity marked for deletion"
        );
        Ok(resolution)
    }

    /// Writes every pending change in one store transaction and returns the
    /// number of affected rows. On failure the transaction is rolled back
    /// and the pending changes stay pending.
    pub async fn save(&mut self) -> Result<u64> {
        let session = self.session;
        let pending = self
            .tracked
            .pending()
            .map(|((model, key), entry)| -> operation::Operation {
                let table = self.schema.table_id_for(*model);
                let key = key.clone();
                match entry.state {
                    EntityState::Added => operation::Insert {
                        table,
                        key,
                        record: entry.record.clone(),
                    }
                    .into(),
                    EntityState::Modified => operation::UpdateByKey {
                        table,
                        key,
                        record: entry.record.clone(),
                    }
                    .into(),
                    _ => operation::DeleteByKey {
                        table,
                        keys: vec![key],
                    }
                    .into(),
                }
            })
            .collect::<Vec<operation::Operation>>();

        if pending.is_empty() {
            return Ok(0);
        }

        let connection = self.connection()?;
        connection.exec(Transaction::Start.into()).await?;

        match exec_all(connection, pending).await {
            Ok(count) => {
                connection.exec(Transaction::Commit.into()).await?;
                self.tracked.accept_changes();
                debug!(%session, count, "changes saved");
                Ok(count)
            }
            Err(err) => {
                if let Err(rollback) = connection.exec(Transaction::Rollback.into()).await {
                    warn!(%session, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Creates the context's physical tables in the store if they do not
    /// exist yet.
    pub async fn push_schema(&mut self) -> Result<()> {
        self.connection()?.push_schema().await
    }

    /// Releases the store connection and forgets tracked entities. Safe to
    /// call more than once.
    pub fn dispose(&mut self) {
        if let Some(connection) = self.connection.take() {
            drop(connection);
            self.tracked.clear();
            debug!(
                session = %self.session,
                generation = %self.cache_key.generation,
                "access context disposed"
            );
        }
    }

    fn connection(&mut self) -> Result<&mut dyn Connection> {
        match &mut self.connection {
            Some(connection) => Ok(connection.as_mut()),
            None => Err(Error::context_closed(format!(
                "context of session {} is disposed",
                self.session
            ))),
        }
    }

    fn key_of<M: Model>(&self, model_id: ModelId, model: &Arc<M>) -> Result<stmt::Key> {
        let instance: &(dyn Any + Send + Sync) = &**model;
        self.catalog
            .key_descriptor(model_id)
            .key_of(instance)
            .ok_or_else(|| {
                tabula_core::err!("cannot read the primary key of `{}`", M::NAME)
            })
    }

    fn attach<M: Model>(
        &mut self,
        model_id: ModelId,
        key: stmt::Key,
        record: stmt::ValueRecord,
    ) -> Result<Arc<M>> {
        let model = Arc::new(M::load(record.clone())?);
        self.tracked
            .track(model_id, key, model.clone(), record, EntityState::Unchanged);
        Ok(model)
    }
}

impl Drop for AccessContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessContext")
            .field("session", &self.session)
            .field("generation", &self.cache_key.generation)
            .field("url", &self.url.as_str())
            .field("disposed", &self.is_disposed())
            .field("tracked", &self.tracked.len())
            .finish()
    }
}

async fn exec_all(
    connection: &mut dyn Connection,
    operations: Vec<operation::Operation>,
) -> Result<u64> {
    let mut count = 0;

    for op in operations {
        let name = op.name();
        let affected = connection.exec(op).await?.into_count()?;

        if affected == 0 && name != "insert" {
            return Err(Error::record_not_found(format!(
                "{name} affected no rows"
            )));
        }

        count += affected;
    }

    Ok(count)
}

fn downcast<M: Model>(instance: Instance) -> Result<Arc<M>> {
    instance
        .downcast::<M>()
        .map_err(|_| tabula_core::err!("tracked instance is not a `{}`", M::NAME))
}

fn sort<M, K: Ord>(models: &mut [Arc<M>], key: impl Fn(&M) -> K, ascending: bool) {
    if ascending {
        models.sort_by_key(|model| key(&**model));
    } else {
        models.sort_by_key(|model| std::cmp::Reverse(key(&**model)));
    }
}

/// A shared handle to a session's [`AccessContext`].
///
/// Operations go through [`lock`](Self::lock), which serializes them. Once
/// the handle is retired by a remap, store swap or close, `lock` fails with
/// a context-closed error and the context is disposed.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    session: Session,
    cache_key: CacheKey,
    url: Url,
    rules: Arc<RuleSet>,
    schema: Arc<Schema>,
    retired: AtomicBool,
    cx: Mutex<AccessContext>,
}

impl Context {
    pub(crate) fn new(cx: AccessContext) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                session: cx.session,
                cache_key: cx.cache_key,
                url: cx.url.clone(),
                rules: cx.rules.clone(),
                schema: cx.schema.clone(),
                retired: AtomicBool::new(false),
                cx: Mutex::new(cx),
            }),
        }
    }

    pub fn session(&self) -> Session {
        self.inner.session
    }

    pub fn generation(&self) -> Generation {
        self.inner.cache_key.generation
    }

    pub fn cache_key(&self) -> CacheKey {
        self.inner.cache_key
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.inner.rules
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// The physical table of every registered entity type in this context.
    pub fn table_names(&self) -> Vec<TableMapping> {
        self.inner.schema.table_mappings()
    }

    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::Acquire)
    }

    /// Waits for exclusive access to the context.
    pub async fn lock(&self) -> Result<MutexGuard<'_, AccessContext>> {
        let mut cx = self.inner.cx.lock().await;

        if self.is_retired() {
            cx.dispose();
            return Err(Error::context_closed(format!(
                "context of session {} was replaced or closed",
                self.inner.session
            )));
        }

        Ok(cx)
    }

    /// Retires the handle and disposes the context, unless an operation is
    /// still running on it. A busy context is disposed when that operation's
    /// handle next locks it or when the last handle is dropped.
    pub(crate) fn retire(&self) {
        if self.inner.retired.swap(true, Ordering::AcqRel) {
            return;
        }

        match self.inner.cx.try_lock() {
            Ok(mut cx) => cx.dispose(),
            Err(_) => warn!(
                session = %self.inner.session,
                generation = %self.inner.cache_key.generation,
                "retired context is still in use; disposal deferred"
            ),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("session", &self.inner.session)
            .field("generation", &self.inner.cache_key.generation)
            .field("url", &self.inner.url.as_str())
            .field("retired", &self.is_retired())
            .finish()
    }
}
