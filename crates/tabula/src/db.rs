mod builder;
pub use builder::Builder;

use crate::{
    cache::SchemaCache,
    catalog::Catalog,
    generation::{CacheKey, ContextTypeId, Generation, GenerationCounter},
    registry::{self, Lookup, Registry},
    rule::{EntityType, MappingRule, RuleSet},
    AccessContext, Context, EntityState, Model, Resolution, Session, TableMapping,
};
use tabula_core::{
    driver::Driver,
    schema::{self, app::ModelId, Schema},
    stmt, Error, Result,
};

use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;
use url::Url;

/// Entry point to the data access layer.
///
/// A `Db` owns the registered entity types, the current mapping rules and
/// generation, the schema cache and one [`AccessContext`] per
/// [`Session`]. Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    catalog: Arc<Catalog>,
    driver: Box<dyn Driver>,
    default_url: Url,
    table_name_prefix: Option<String>,
    context_type: ContextTypeId,
    generations: GenerationCounter,

    /// The remap lock. Guards the current rule set; the generation counter
    /// is only incremented while it is held.
    current: Mutex<Arc<RuleSet>>,

    cache: SchemaCache,
    registry: Registry,
}

/// Where a remap opens its store connection.
enum Endpoint {
    /// The session's current endpoint
    Session,

    /// A new endpoint replacing the session's
    Swap(Url),
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn new(
        catalog: Catalog,
        driver: Box<dyn Driver>,
        default_url: Url,
        table_name_prefix: Option<String>,
    ) -> Result<Db> {
        let shared = Shared {
            catalog: Arc::new(catalog),
            driver,
            default_url,
            table_name_prefix,
            context_type: ContextTypeId::new(),
            generations: GenerationCounter::new(),
            current: Mutex::new(Arc::new(RuleSet::default())),
            cache: SchemaCache::default(),
            registry: Registry::default(),
        };

        // Compile the default mapping up front so registration mistakes
        // surface here.
        let generation = shared.generations.current();
        shared.cache.get_or_compile(shared.cache_key(generation), || {
            shared.compile(&IndexMap::new())
        })?;

        Ok(Db {
            shared: Arc::new(shared),
        })
    }

    /// The current generation of the global mapping state.
    pub fn generation(&self) -> Generation {
        self.shared.snapshot().0
    }

    /// The store endpoint new sessions connect to.
    pub fn default_url(&self) -> &Url {
        &self.shared.default_url
    }

    /// The current mapping of one entity type.
    pub fn resolve_table_name<M: Model>(&self) -> Result<TableMapping> {
        self.resolve_table_name_of(EntityType::of::<M>())
    }

    pub fn resolve_table_name_of(&self, entity: EntityType) -> Result<TableMapping> {
        let model = self.shared.catalog.model_id(&entity)?;
        Ok(self.shared.current_schema()?.table_mapping(model))
    }

    /// The current mapping of every registered entity type, in registration
    /// order.
    pub fn resolve_table_names(&self) -> Result<Vec<TableMapping>> {
        Ok(self.shared.current_schema()?.table_mappings())
    }

    /// Installs `rules` as the global mapping and gives `session` a fresh
    /// context built under the next generation. Returns the table each rule
    /// resolved to, in rule order.
    ///
    /// Nothing changes if any rule names an unregistered entity type or
    /// resolves to an invalid table, or if the session is closed. Other
    /// sessions keep their contexts, and with them the mapping they were
    /// built under.
    pub async fn remap(
        &self,
        session: Session,
        rules: impl IntoIterator<Item = MappingRule>,
    ) -> Result<Vec<TableMapping>> {
        self.remap_at(session, Endpoint::Session, RuleSet::new(rules))
            .await
    }

    /// Remaps a single entity type.
    pub async fn remap_one(&self, session: Session, rule: MappingRule) -> Result<TableMapping> {
        self.remap(session, [rule])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| tabula_core::err!("remap resolved no table"))
    }

    /// Replaces the session's store endpoint and remaps in one step.
    pub async fn remap_store(
        &self,
        session: Session,
        url: &str,
        rules: impl IntoIterator<Item = MappingRule>,
    ) -> Result<Vec<TableMapping>> {
        let parsed = Url::parse(url)
            .map_err(|err| Error::from(err).context(Error::connection_swap(url)))?;
        self.remap_at(session, Endpoint::Swap(parsed), RuleSet::new(rules))
            .await
    }

    async fn remap_at(
        &self,
        session: Session,
        endpoint: Endpoint,
        rules: RuleSet,
    ) -> Result<Vec<TableMapping>> {
        let shared = &self.shared;

        let (url, swap) = match endpoint {
            Endpoint::Session => match shared.registry.lookup(session) {
                Lookup::Open(cx) => (cx.url().clone(), false),
                Lookup::Closed => return Err(registry::closed(session)),
                Lookup::Absent => (shared.default_url.clone(), false),
            },
            Endpoint::Swap(_) if shared.registry.is_closed(session) => {
                return Err(registry::closed(session))
            }
            Endpoint::Swap(url) => (url, true),
        };

        // Validate and compile before touching shared state.
        let resolved = shared.resolve(&rules)?;
        let schema = Arc::new(shared.compile(&resolved)?);

        let connection = match shared.driver.connect(&url, schema.db.clone()).await {
            Ok(connection) => connection,
            Err(err) if swap => return Err(err.context(Error::connection_swap(url.as_str()))),
            Err(err) => return Err(err),
        };

        let rules = Arc::new(rules);

        let (generation, schema) = {
            let mut current = shared.lock_current();

            // The session may have been closed or moved to another store
            // while connecting. Both happen under the remap lock only.
            match shared.registry.lookup(session) {
                Lookup::Closed => return Err(registry::closed(session)),
                Lookup::Open(cx) if !swap && *cx.url() != url => {
                    return Err(registry::replaced(session))
                }
                _ => {}
            }

            let generation = shared.generations.increment();
            *current = rules.clone();

            let key = shared.cache_key(generation);
            let schema = shared.cache.insert(key, schema);
            shared.cache.evict_superseded(generation);

            let cx = AccessContext::new(
                session,
                key,
                rules,
                schema.clone(),
                shared.catalog.clone(),
                url,
                connection,
            );
            shared.registry.publish(session, Context::new(cx));

            (generation, schema)
        };

        let mappings = resolved
            .keys()
            .map(|model| schema.table_mapping(*model))
            .collect::<Vec<_>>();

        info!(
            %session,
            %generation,
            tables = ?mappings.iter().map(|m| m.table_name.as_str()).collect::<Vec<_>>(),
            "remapped"
        );

        Ok(mappings)
    }

    /// Points the session's context at a different store endpoint, keeping
    /// its generation and rule set.
    ///
    /// If the new endpoint cannot be reached, the previous context stays in
    /// place and the error is a connection-swap error.
    pub async fn change_store(&self, session: Session, url: &str) -> Result<()> {
        let shared = &self.shared;
        let swap_failed = |err: Error| err.context(Error::connection_swap(url));

        let previous = self.current(session).await?;
        let parsed = Url::parse(url).map_err(|err| swap_failed(err.into()))?;

        let connection = shared
            .driver
            .connect(&parsed, previous.schema().db.clone())
            .await
            .map_err(swap_failed)?;

        let cx = AccessContext::new(
            session,
            previous.cache_key(),
            previous.rules().clone(),
            previous.schema().clone(),
            shared.catalog.clone(),
            parsed,
            connection,
        );

        {
            let _current = shared.lock_current();
            shared
                .registry
                .replace(session, &previous, Context::new(cx))
                .map_err(swap_failed)?;
        }

        info!(%session, %url, generation = %previous.generation(), "store changed");
        Ok(())
    }

    /// Returns the session's context, creating a default one if the session
    /// has none. Reopens a closed session.
    pub async fn context(&self, session: Session) -> Result<Context> {
        match self.shared.registry.lookup(session) {
            Lookup::Open(cx) => Ok(cx),
            Lookup::Closed | Lookup::Absent => self.open_default(session, true).await,
        }
    }

    /// Returns the session's context, creating a default one if the session
    /// has none yet. Fails if the session was closed.
    pub async fn current(&self, session: Session) -> Result<Context> {
        match self.shared.registry.lookup(session) {
            Lookup::Open(cx) => Ok(cx),
            Lookup::Closed => Err(registry::closed(session)),
            Lookup::Absent => self.open_default(session, false).await,
        }
    }

    /// Disposes the session's context. Further operations fail with a
    /// context-closed error until [`context`](Self::context) reopens the
    /// session. Closing twice, or closing a session that has no context,
    /// is a no-op.
    pub fn close(&self, session: Session) {
        let _current = self.shared.lock_current();
        self.shared.registry.close(session);
    }

    /// Disposes the session's context, if any, and forgets the session.
    /// A released session is not closed: its next operation creates a
    /// fresh context.
    pub fn release(&self, session: Session) {
        let _current = self.shared.lock_current();
        self.shared.registry.release(session);
    }

    pub fn is_closed(&self, session: Session) -> bool {
        self.shared.registry.is_closed(session)
    }

    /// Number of sessions with an open or closed context.
    pub fn session_count(&self) -> usize {
        self.shared.registry.len()
    }

    async fn open_default(&self, session: Session, reopen: bool) -> Result<Context> {
        let shared = &self.shared;
        let (generation, rules) = shared.snapshot();
        let key = shared.cache_key(generation);

        let schema = shared.cache.get_or_compile(key, || {
            shared.compile(&shared.resolve(&rules)?)
        })?;

        let connection = shared
            .driver
            .connect(&shared.default_url, schema.db.clone())
            .await?;

        let cx = Context::new(AccessContext::new(
            session,
            key,
            rules,
            schema,
            shared.catalog.clone(),
            shared.default_url.clone(),
            connection,
        ));

        shared.registry.insert_if_absent(session, cx, reopen)
    }

    /// Creates the physical tables of the session's context in its store.
    pub async fn push_schema(&self, session: Session) -> Result<()> {
        self.current(session).await?.lock().await?.push_schema().await
    }

    /// The table `M` resolves to in the session's context.
    pub async fn table_name<M: Model>(&self, session: Session) -> Result<TableMapping> {
        self.current(session).await?.lock().await?.table_name::<M>()
    }

    pub async fn add<M: Model>(&self, session: Session, model: M) -> Result<Arc<M>> {
        self.current(session).await?.lock().await?.add(model)
    }

    pub async fn create<M: Model>(&self, session: Session, model: M) -> Result<Arc<M>> {
        self.current(session).await?.lock().await?.create(model).await
    }

    pub async fn get<M: Model>(
        &self,
        session: Session,
        key: impl Into<stmt::Key>,
    ) -> Result<Option<Arc<M>>> {
        self.current(session).await?.lock().await?.get(key).await
    }

    pub async fn all<M: Model>(&self, session: Session) -> Result<Vec<Arc<M>>> {
        self.current(session).await?.lock().await?.all().await
    }

    pub async fn filter<M: Model>(
        &self,
        session: Session,
        predicate: impl Fn(&M) -> bool,
    ) -> Result<Vec<Arc<M>>> {
        self.current(session)
            .await?
            .lock()
            .await?
            .filter(predicate)
            .await
    }

    pub async fn count<M: Model>(
        &self,
        session: Session,
        predicate: impl Fn(&M) -> bool,
    ) -> Result<usize> {
        self.current(session)
            .await?
            .lock()
            .await?
            .count(predicate)
            .await
    }

    pub async fn order_by<M: Model, K: Ord>(
        &self,
        session: Session,
        key: impl Fn(&M) -> K,
        ascending: bool,
    ) -> Result<Vec<Arc<M>>> {
        self.current(session)
            .await?
            .lock()
            .await?
            .order_by(key, ascending)
            .await
    }

    pub async fn page<M: Model, K: Ord>(
        &self,
        session: Session,
        page_size: usize,
        page_index: usize,
        predicate: impl Fn(&M) -> bool,
        key: impl Fn(&M) -> K,
    ) -> Result<Vec<Arc<M>>> {
        self.current(session)
            .await?
            .lock()
            .await?
            .page(page_size, page_index, predicate, key)
            .await
    }

    pub async fn update<M: Model>(&self, session: Session, model: M) -> Result<Arc<M>> {
        self.current(session).await?.lock().await?.update(model)
    }

    pub async fn delete<M: Model>(
        &self,
        session: Session,
        model: impl Into<Arc<M>>,
    ) -> Result<Resolution> {
        self.current(session).await?.lock().await?.delete(model)
    }

    pub async fn save(&self, session: Session) -> Result<u64> {
        self.current(session).await?.lock().await?.save().await
    }

    pub async fn state_of<M: Model>(
        &self,
        session: Session,
        model: &Arc<M>,
    ) -> Result<Option<EntityState>> {
        Ok(self.current(session).await?.lock().await?.state_of(model))
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.shared.driver)
            .field("default_url", &self.shared.default_url.as_str())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Shared {
    fn lock_current(&self) -> MutexGuard<'_, Arc<RuleSet>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current generation and the rule set it was installed with.
    fn snapshot(&self) -> (Generation, Arc<RuleSet>) {
        let current = self.lock_current();
        (self.generations.current(), current.clone())
    }

    fn cache_key(&self, generation: Generation) -> CacheKey {
        CacheKey::compose(self.context_type, generation)
    }

    fn current_schema(&self) -> Result<Arc<Schema>> {
        let (generation, rules) = self.snapshot();
        self.cache.get_or_compile(self.cache_key(generation), || {
            self.compile(&self.resolve(&rules)?)
        })
    }

    fn resolve(&self, rules: &RuleSet) -> Result<IndexMap<ModelId, String>> {
        rules.resolve(&self.catalog, self.table_name_prefix.as_deref())
    }

    fn compile(&self, tables: &IndexMap<ModelId, String>) -> Result<Schema> {
        let mut builder = schema::Builder::new();

        if let Some(prefix) = &self.table_name_prefix {
            builder.table_name_prefix(prefix);
        }

        for (model, table_name) in tables {
            builder.table_name(*model, table_name.clone());
        }

        builder.build(self.catalog.app.clone())
    }
}
