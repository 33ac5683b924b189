use leafpress_loader::LoadOptions;
use serde_json::Value;

use super::Session;

pub async fn run(
    session: &Session,
    id: &str,
    object_type: Option<&str>,
    include: Option<&str>,
) -> anyhow::Result<Value> {
    let object = match (object_type, include) {
        (None, None) => session.loader.load_full_object(id, &session.ctx).await?,
        (object_type, include) => {
            let object_type = object_type.unwrap_or("objects");
            let options = include.map(|spec| LoadOptions::new().include(spec)).transpose()?;
            session
                .loader
                .load_object(id, object_type, options, &session.ctx)
                .await?
        }
    };
    tracing::info!(id = object.id, object_type = %object.object_type, "object loaded");
    Ok(serde_json::to_value(object)?)
}
