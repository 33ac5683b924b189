//! Typed object loading
//!
//! [`ObjectsLoader`] resolves identifiers to fully typed entities. Every
//! load goes through the same pipeline: the type's default options (unless
//! explicit options are given), the caller filter merged over the default
//! filter, an include spec split into inline and limited ("late")
//! associations, one store fetch, the late association load, join data
//! reconciliation and finally recursive hydration (see [`crate::hydration`]).

use leafpress_content::{
    Contain, ContentStore, FetchQuery, Filter, ObjectEntity, ObjectId, ObjectType, Page, ReadScope, StatusLevel,
};
use std::sync::Arc;

use crate::config::{AutoHydrate, LoaderConfig};
use crate::error::{LoaderError, LoaderResult};
use crate::join_data;
use crate::query::LazyObjects;
use crate::type_config::{LoadOptions, TypeConfigResolver};

/// Request-scoped settings of a load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadContext {
    /// Translation language
    pub lang: Option<String>,
    /// Replaces the configured auto-hydrate map
    pub hydrate: Option<AutoHydrate>,
    /// Replaces the configured status level
    pub status_level: Option<StatusLevel>,
}

impl LoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_string());
        self
    }

    pub fn hydrate(mut self, hydrate: AutoHydrate) -> Self {
        self.hydrate = Some(hydrate);
        self
    }

    /// Disable automatic hydration for this load
    pub fn no_hydrate(self) -> Self {
        self.hydrate(AutoHydrate::new())
    }

    pub fn status_level(mut self, status_level: StatusLevel) -> Self {
        self.status_level = Some(status_level);
        self
    }
}

/// A [`LoadContext`] resolved against the loader configuration
#[derive(Debug, Clone)]
pub(crate) struct Run {
    pub(crate) read: ReadScope,
    pub(crate) auto_hydrate: AutoHydrate,
}

/// A prepared fetch, ready to execute
#[derive(Debug, Clone)]
pub(crate) struct FetchPlan {
    pub(crate) query: FetchQuery,
    pub(crate) late: Vec<Contain>,
    /// Every included association, reconciled after the fetch
    pub(crate) associations: Vec<String>,
}

/// Loads typed objects and their configured associations from a content store
#[derive(Clone)]
pub struct ObjectsLoader {
    store: Arc<dyn ContentStore>,
    config: Arc<LoaderConfig>,
    resolver: Arc<TypeConfigResolver>,
}

impl std::fmt::Debug for ObjectsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsLoader")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl ObjectsLoader {
    /// Validates the configuration against the store's type registry
    pub fn new(store: Arc<dyn ContentStore>, config: LoaderConfig) -> LoaderResult<Self> {
        let resolver = TypeConfigResolver::new(&config, store.object_types())?;
        tracing::debug!(
            configured_types = config.get_objects().len(),
            auto_hydrate = config.get_auto_hydrate().len(),
            "objects loader ready"
        );
        Ok(Self {
            store,
            config: Arc::new(config),
            resolver: Arc::new(resolver),
        })
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TypeConfigResolver {
        &self.resolver
    }

    /// Default options of a type, inherited along the type hierarchy
    pub fn default_options(&self, object_type: &str) -> LoaderResult<LoadOptions> {
        let registry = self.store.object_types();
        Ok(self.resolver.default_options(registry, registry.get(object_type)?))
    }

    /// Load one object of `object_type` by id or uname
    pub async fn load_object(
        &self,
        id_or_uname: &str,
        object_type: &str,
        options: Option<LoadOptions>,
        ctx: &LoadContext,
    ) -> LoaderResult<ObjectEntity> {
        let object_type = self.store.object_type(object_type)?.clone();
        let id = self.store.resolve_id(id_or_uname).await?;
        self.load_single(&object_type, id, options, 1, &self.run(ctx)).await
    }

    /// Load one object through its concrete type, whatever it is
    pub async fn load_full_object(&self, id_or_uname: &str, ctx: &LoadContext) -> LoaderResult<ObjectEntity> {
        let id = self.store.resolve_id(id_or_uname).await?;
        self.load_full_object_by_id(id, &self.run(ctx)).await
    }

    /// Lazily load every object of `object_type` matching `filter`
    pub fn load_objects(
        &self,
        filter: Filter,
        object_type: &str,
        options: Option<LoadOptions>,
        ctx: &LoadContext,
    ) -> LoaderResult<LazyObjects> {
        let object_type = self.store.object_type(object_type)?.clone();
        let run = self.run(ctx);
        let plan = self.prepare(&object_type, filter, options, &run)?;
        Ok(LazyObjects::new(self.clone(), plan, run))
    }

    /// Objects related to `id_or_uname` through `association`, as concrete
    /// hydrated entities carrying the edge attributes in `relation`
    pub async fn load_related_objects(
        &self,
        id_or_uname: &str,
        object_type: &str,
        association: &str,
        filter: Filter,
        ctx: &LoadContext,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        let run = self.run(ctx);
        let object_type = self.store.object_type(object_type)?.clone();
        let owner = self.store.resolve_id(id_or_uname).await?;
        let query = FetchQuery::new(&object_type.name)
            .conditions(filter.conditions()?)
            .scope(run.read.clone());

        let related = self.store.fetch_related(owner, association, &query).await?;
        tracing::debug!(owner, association, related = related.len(), "related objects fetched");
        self.rehydrate(related, 1, &run).await
    }

    /// Convert base records, possibly of mixed types, into concrete hydrated entities
    pub async fn hydrate_objects(&self, objects: Vec<ObjectEntity>, ctx: &LoadContext) -> LoaderResult<Vec<ObjectEntity>> {
        self.to_concrete_types(objects, 1, ctx).await
    }

    pub(crate) fn run(&self, ctx: &LoadContext) -> Run {
        Run {
            read: ReadScope::new(
                ctx.status_level.unwrap_or(*self.config.get_status_level()),
                ctx.lang.as_deref(),
            ),
            auto_hydrate: ctx
                .hydrate
                .clone()
                .unwrap_or_else(|| self.config.get_auto_hydrate().clone()),
        }
    }

    pub(crate) fn prepare(
        &self,
        object_type: &ObjectType,
        mut filter: Filter,
        options: Option<LoadOptions>,
        run: &Run,
    ) -> LoaderResult<FetchPlan> {
        let options = options
            .unwrap_or_else(|| self.resolver.default_options(self.store.object_types(), object_type));
        filter.merge_defaults(&options.filter);

        let (inline, late) = options.include.partition();
        let query = FetchQuery::new(&object_type.name)
            .conditions(filter.conditions()?)
            .contain(inline)
            .scope(run.read.clone());

        Ok(FetchPlan {
            query,
            late,
            associations: options.include.association_names(),
        })
    }

    /// Fetch, late-load, reconcile and hydrate at `depth`
    pub(crate) async fn execute(
        &self,
        plan: &FetchPlan,
        page: Option<Page>,
        depth: u32,
        run: &Run,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        let query = plan.query.clone().page(page.or(plan.query.page));
        let mut objects = self.store.fetch_many(&query).await?;
        if !plan.late.is_empty() && !objects.is_empty() {
            self.store
                .load_association_into(&mut objects, &plan.late, &query.scope)
                .await?;
        }
        for object in objects.iter_mut() {
            join_data::reconcile(object, &plan.associations);
        }
        tracing::debug!(
            object_type = %query.object_type,
            results = objects.len(),
            depth,
            "objects loaded"
        );
        self.hydrate_level(objects, depth, run).await
    }

    pub(crate) async fn load_multi(
        &self,
        object_type: &ObjectType,
        filter: Filter,
        options: Option<LoadOptions>,
        depth: u32,
        run: &Run,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        let plan = self.prepare(object_type, filter, options, run)?;
        self.execute(&plan, None, depth, run).await
    }

    /// Concrete object of an already resolved id
    pub(crate) async fn load_full_object_by_id(&self, id: ObjectId, run: &Run) -> LoaderResult<ObjectEntity> {
        let base = self
            .store
            .fetch_by_ids("objects", &[id], &run.read)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LoaderError::not_found(format!("object {}", id)))?;
        let object_type = self.store.object_type(&base.object_type)?.clone();
        self.load_single(&object_type, id, None, 1, run).await
    }

    pub(crate) async fn load_single(
        &self,
        object_type: &ObjectType,
        id: ObjectId,
        options: Option<LoadOptions>,
        depth: u32,
        run: &Run,
    ) -> LoaderResult<ObjectEntity> {
        self.load_multi(object_type, Filter::by_ids(&[id]), options, depth, run)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LoaderError::not_found(format!("{} {}", object_type.singular, id)))
    }
}
