//! Depth-bounded recursive hydration
//!
//! Objects fetched through an association are base records. Hydration
//! re-fetches them through their concrete type, in one batched load per
//! type, and recurses into the associations configured in the auto-hydrate
//! map. An association is expanded on objects loaded at `depth` when its
//! configured depth is unlimited or strictly greater than `depth`; the
//! re-fetched objects are loaded at `depth + 1`, so recursion always ends.
//! Unlimited associations stop at `unlimited_depth_cap`, which also bounds
//! cyclic data.

use futures::future::{BoxFuture, FutureExt};
use leafpress_content::{Association, Filter, JoinData, ObjectEntity, ObjectId};
use std::collections::{HashMap, HashSet};

use crate::config::HydrateDepth;
use crate::error::{LoaderError, LoaderResult};
use crate::join_data;
use crate::objects::{LoadContext, ObjectsLoader, Run};

/// Owner position and shape of one drained association slot
struct Slot {
    index: usize,
    single: bool,
    len: usize,
}

impl ObjectsLoader {
    /// Re-load a mixed batch through the concrete types, keeping input order
    ///
    /// Ids shared by several entries are fetched once and appear at each of
    /// their positions. Records that are no longer visible are dropped.
    pub async fn to_concrete_types(
        &self,
        objects: Vec<ObjectEntity>,
        depth: u32,
        ctx: &LoadContext,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        self.rehydrate(objects, depth, &self.run(ctx)).await
    }

    pub(crate) async fn rehydrate(
        &self,
        objects: Vec<ObjectEntity>,
        depth: u32,
        run: &Run,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        if objects.is_empty() {
            return Ok(objects);
        }
        let loaded = self.load_concrete(&objects, depth, run).await?;
        Ok(objects
            .iter()
            .filter_map(|original| match loaded.get(&original.id) {
                Some(concrete) => Some(with_relation(concrete.clone(), original.join_data.as_ref())),
                None => {
                    tracing::debug!(id = original.id, "object vanished while re-loading");
                    None
                }
            })
            .collect())
    }

    /// One batched load per type (first-seen order), chunked by `max_batch_size`
    pub(crate) fn load_concrete<'a>(
        &'a self,
        objects: &'a [ObjectEntity],
        depth: u32,
        run: &'a Run,
    ) -> BoxFuture<'a, LoaderResult<HashMap<ObjectId, ObjectEntity>>> {
        async move {
            let mut seen = HashSet::new();
            let mut groups: Vec<(&str, Vec<ObjectId>)> = Vec::new();
            for object in objects.iter().filter(|o| seen.insert(o.id)) {
                match groups.iter_mut().find(|(name, _)| *name == object.object_type) {
                    Some((_, ids)) => ids.push(object.id),
                    None => groups.push((object.object_type.as_str(), vec![object.id])),
                }
            }

            let batch_size = (*self.config().get_max_batch_size()).max(1);
            let mut loaded = HashMap::with_capacity(seen.len());
            for (type_name, ids) in groups {
                let object_type = self.store().object_type(type_name)?.clone();
                for chunk in ids.chunks(batch_size) {
                    let results = self
                        .load_multi(&object_type, Filter::by_ids(chunk), None, depth, run)
                        .await?;
                    loaded.extend(results.into_iter().map(|entity| (entity.id, entity)));
                }
            }
            Ok(loaded)
        }
        .boxed()
    }

    /// Expand every eligible association of a batch loaded at `depth`
    pub(crate) fn hydrate_level<'a>(
        &'a self,
        mut objects: Vec<ObjectEntity>,
        depth: u32,
        run: &'a Run,
    ) -> BoxFuture<'a, LoaderResult<Vec<ObjectEntity>>> {
        async move {
            for association in self.eligible(&objects, depth, run) {
                self.hydrate_association(&mut objects, &association, depth, run)
                    .await?;
            }
            for object in objects.iter_mut() {
                object.mark_clean();
            }
            Ok(objects)
        }
        .boxed()
    }

    fn eligible(&self, objects: &[ObjectEntity], depth: u32, run: &Run) -> Vec<String> {
        let cap = *self.config().get_unlimited_depth_cap();
        run.auto_hydrate
            .iter()
            .filter(|(name, _)| {
                objects
                    .iter()
                    .any(|o| o.association(name).is_some_and(|a| !a.is_empty()))
            })
            .filter_map(|(name, max)| match max {
                HydrateDepth::Unlimited if depth >= cap => {
                    tracing::warn!(association = %name, depth, cap, "unlimited hydration stopped at depth cap");
                    None
                }
                max if max.allows(depth) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Re-load the related entities of one association across the whole batch
    async fn hydrate_association(
        &self,
        objects: &mut [ObjectEntity],
        association: &str,
        depth: u32,
        run: &Run,
    ) -> LoaderResult<()> {
        let mut slots = Vec::new();
        let mut items = Vec::new();
        for (index, object) in objects.iter_mut().enumerate() {
            match object.take_association(association) {
                Some(Association::One(entity)) => {
                    slots.push(Slot { index, single: true, len: 1 });
                    items.push(*entity);
                }
                Some(Association::Many(list)) if !list.is_empty() => {
                    slots.push(Slot {
                        index,
                        single: false,
                        len: list.len(),
                    });
                    items.extend(list);
                }
                Some(empty) => object.set_association(association, empty),
                None => {}
            }
        }

        let loaded = self.load_concrete(&items, depth + 1, run).await?;
        tracing::debug!(
            association,
            depth = depth + 1,
            related = items.len(),
            distinct = loaded.len(),
            "association hydrated"
        );

        let mut items = items.into_iter();
        for slot in slots {
            let owner = &mut objects[slot.index];
            let originals: Vec<ObjectEntity> = items.by_ref().take(slot.len).collect();
            let hydrated = if slot.single {
                let original = &originals[0];
                let concrete = loaded.get(&original.id).cloned().ok_or_else(|| {
                    LoaderError::not_found(format!(
                        "{} {} of object {}",
                        association, original.id, owner.id
                    ))
                })?;
                Association::One(Box::new(with_relation(concrete, original.join_data.as_ref())))
            } else {
                Association::Many(
                    originals
                        .iter()
                        .filter_map(|original| {
                            let concrete = loaded.get(&original.id).cloned();
                            if concrete.is_none() {
                                tracing::debug!(association, id = original.id, "related object vanished");
                            }
                            concrete.map(|c| with_relation(c, original.join_data.as_ref()))
                        })
                        .collect(),
                )
            };
            owner.set_association(association, hydrated);
        }
        Ok(())
    }
}

fn with_relation(mut entity: ObjectEntity, join: Option<&JoinData>) -> ObjectEntity {
    if let Some(join) = join {
        join_data::set_relation(&mut entity, join);
    }
    entity
}
