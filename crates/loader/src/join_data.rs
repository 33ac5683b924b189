//! Copies edge attributes of related entities onto their `relation` field

use leafpress_content::{JoinData, ObjectEntity};

/// Set `relation` from non-empty join data, leaving the entity clean
pub fn set_relation(entity: &mut ObjectEntity, join: &JoinData) {
    if join.is_empty() {
        return;
    }
    entity.set_relation(join.clone());
    entity.set_dirty("relation", false);
}

/// Apply [`set_relation`] to every entity held by the listed associations
pub fn reconcile(entity: &mut ObjectEntity, associations: &[String]) {
    for name in associations {
        let Some(association) = entity.association_mut(name) else {
            continue;
        };
        for related in association.entities_mut() {
            if let Some(join) = related.join_data.clone() {
                set_relation(related, &join);
            }
        }
    }
}
