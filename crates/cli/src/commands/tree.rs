use leafpress_loader::TreeLoader;
use serde_json::Value;

use super::Session;

pub async fn path(session: &Session, path: &str, relative_to: Option<&str>) -> anyhow::Result<Value> {
    let relative_to = session.resolve_optional(relative_to).await?;
    let tree = TreeLoader::new(session.loader.clone());
    let chain = tree.load_object_path(path, relative_to, &session.ctx).await?;
    Ok(serde_json::to_value(chain)?)
}

pub async fn paths(
    session: &Session,
    id: &str,
    relative_to: Option<&str>,
    via: Option<&str>,
    canonical: bool,
) -> anyhow::Result<Value> {
    let id = session.resolve_id(id).await?;
    let relative_to = session.resolve_optional(relative_to).await?;
    let tree = TreeLoader::new(session.loader.clone());

    if canonical {
        return Ok(serde_json::to_value(tree.canonical_path(id, relative_to).await?)?);
    }
    let via = session.resolve_optional(via).await?;
    Ok(serde_json::to_value(tree.get_viable_paths(id, relative_to, via).await?)?)
}
