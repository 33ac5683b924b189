//! Lazy, cached result of [`ObjectsLoader::load_objects`]

use leafpress_content::{ObjectEntity, Page};
use tokio::sync::OnceCell;

use crate::error::{LoaderError, LoaderResult};
use crate::objects::{FetchPlan, ObjectsLoader, Run};

/// A prepared object query
///
/// Nothing is fetched until the results are first requested. The first
/// traversal runs one store query plus hydration and caches the entities;
/// every later traversal reads the cache.
#[derive(Debug)]
pub struct LazyObjects {
    loader: ObjectsLoader,
    plan: FetchPlan,
    run: Run,
    page: Option<Page>,
    results: OnceCell<Vec<ObjectEntity>>,
}

impl LazyObjects {
    pub(crate) fn new(loader: ObjectsLoader, plan: FetchPlan, run: Run) -> Self {
        Self {
            loader,
            plan,
            run,
            page: None,
            results: OnceCell::new(),
        }
    }

    /// Concrete type the query loads
    pub fn object_type(&self) -> &str {
        &self.plan.query.object_type
    }

    pub fn is_executed(&self) -> bool {
        self.results.initialized()
    }

    /// The loaded entities, executing the query on first use
    pub async fn all(&self) -> LoaderResult<&[ObjectEntity]> {
        let results = self
            .results
            .get_or_try_init(|| self.loader.execute(&self.plan, self.page, 1, &self.run))
            .await?;
        Ok(results.as_slice())
    }

    pub async fn into_vec(self) -> LoaderResult<Vec<ObjectEntity>> {
        self.all().await?;
        Ok(self.results.into_inner().unwrap_or_default())
    }

    /// Number of matching objects, ignoring pagination; nothing is hydrated
    pub async fn count(&self) -> LoaderResult<usize> {
        Ok(self.loader.store().count(&self.plan.query).await?)
    }

    /// A new, unexecuted query over one page of the results
    pub fn page(&self, page: usize, limit: usize) -> LazyObjects {
        LazyObjects {
            loader: self.loader.clone(),
            plan: self.plan.clone(),
            run: self.run.clone(),
            page: Some(Page::new(page, limit)),
            results: OnceCell::new(),
        }
    }

    pub async fn first(&self) -> LoaderResult<Option<ObjectEntity>> {
        Ok(self.all().await?.first().cloned())
    }

    pub async fn first_or_fail(&self) -> LoaderResult<ObjectEntity> {
        self.first()
            .await?
            .ok_or_else(|| LoaderError::not_found(format!("no {} matching the query", self.object_type())))
    }
}
