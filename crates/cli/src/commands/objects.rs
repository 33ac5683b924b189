use serde_json::{json, Value};

use super::{parse_filters, Session};

pub async fn list(
    session: &Session,
    object_type: &str,
    filters: &[String],
    page: Option<usize>,
    limit: usize,
    count: bool,
) -> anyhow::Result<Value> {
    let filter = parse_filters(filters)?;
    let query = session
        .loader
        .load_objects(filter, object_type, None, &session.ctx)?;

    if count {
        return Ok(json!({ "count": query.count().await? }));
    }

    let objects = match page {
        Some(page) => query.page(page, limit).into_vec().await?,
        None => query.into_vec().await?,
    };
    tracing::info!(object_type, loaded = objects.len(), "objects loaded");
    Ok(serde_json::to_value(objects)?)
}

pub async fn related(
    session: &Session,
    id: &str,
    association: &str,
    object_type: &str,
    filters: &[String],
) -> anyhow::Result<Value> {
    let filter = parse_filters(filters)?;
    let objects = session
        .loader
        .load_related_objects(id, object_type, association, filter, &session.ctx)
        .await?;
    tracing::info!(association, loaded = objects.len(), "related objects loaded");
    Ok(serde_json::to_value(objects)?)
}
