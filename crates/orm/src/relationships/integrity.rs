//! Referential integrity - foreign key writes on both sides of an association
//!
//! Everything here works on stored records only. Existence of every target
//! is checked before the first write, so a failed call leaves the store
//! untouched. Within one call the old inverse references are always cleared
//! before the new ones are set.

use tracing::{debug, trace};

use super::foreign_key::{stored_references, stored_value};
use super::metadata::Association;
use super::ModelIdentifier;
use crate::db::{normalize_id, Record};
use crate::error::{ModelError, ModelResult};
use crate::schema::Schema;

/// Make `targets` the full membership of `owner`'s association
pub(crate) fn replace(
    schema: &Schema,
    owner: &ModelIdentifier,
    association: &Association,
    targets: &[ModelIdentifier],
) -> ModelResult<()> {
    let mut unique: Vec<ModelIdentifier> = Vec::with_capacity(targets.len());
    for target in targets {
        if !unique.contains(target) {
            unique.push(target.clone());
        }
    }
    if association.is_belongs_to() && unique.len() > 1 {
        return Err(ModelError::InvalidOperation(format!(
            "{}.{} is a belongs-to association and takes a single model",
            association.owner(),
            association.key()
        )));
    }
    for target in &unique {
        if !association.can_target(&target.model_name) {
            return Err(ModelError::InvalidOperation(format!(
                "{}.{} cannot reference a {} model",
                association.owner(),
                association.key(),
                target.model_name
            )));
        }
        if schema.record(target)?.is_none() {
            return Err(ModelError::not_found(&target.model_name, &target.id));
        }
    }
    if schema.record(owner)?.is_none() {
        return Err(ModelError::not_found(&owner.model_name, &owner.id));
    }

    let current = references(schema, owner, association)?;
    for previous in current.iter().filter(|previous| !unique.contains(previous)) {
        unlink_inverse(schema, owner, association, previous)?;
    }

    write_references(schema, owner, association, &unique)?;

    for target in &unique {
        link_inverse(schema, owner, association, target)?;
    }

    debug!(
        "Set {}.{} of {} to [{}]",
        association.owner(),
        association.key(),
        owner,
        unique
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

/// Remove every stored reference to `destroyed`
pub(crate) fn disassociate_dependents(schema: &Schema, destroyed: &ModelIdentifier) -> ModelResult<()> {
    let registry = schema.registry();
    for association in registry.dependent_associations_for(&destroyed.model_name) {
        let collection = registry.collection_name(association.owner())?;
        let holders: Vec<String> = schema
            .db()
            .collection(collection)?
            .where_fn(|record| {
                stored_references(association, record.get(association.foreign_key())).contains(destroyed)
            })
            .iter()
            .filter_map(|record| record.get("id").and_then(normalize_id))
            .collect();

        for id in holders {
            let holder = ModelIdentifier::new(association.owner(), id);
            remove_reference(schema, &holder, association, destroyed)?;
        }
    }
    debug!("Cleared every reference to {}", destroyed);
    Ok(())
}

fn references(
    schema: &Schema,
    holder: &ModelIdentifier,
    association: &Association,
) -> ModelResult<Vec<ModelIdentifier>> {
    Ok(schema
        .record(holder)?
        .map(|record| stored_references(association, record.get(association.foreign_key())))
        .unwrap_or_default())
}

fn write_references(
    schema: &Schema,
    holder: &ModelIdentifier,
    association: &Association,
    references: &[ModelIdentifier],
) -> ModelResult<()> {
    let mut attrs = Record::new();
    attrs.insert(
        association.foreign_key().to_string(),
        stored_value(association, references),
    );
    schema.update_record(holder, &attrs)?;
    trace!(
        "Wrote {}.{} = {}",
        holder,
        association.foreign_key(),
        attrs[association.foreign_key()]
    );
    Ok(())
}

/// Drop `reference` from `holder`'s association, if the holder still exists
fn remove_reference(
    schema: &Schema,
    holder: &ModelIdentifier,
    association: &Association,
    reference: &ModelIdentifier,
) -> ModelResult<()> {
    if schema.record(holder)?.is_none() {
        return Ok(());
    }
    let current = references(schema, holder, association)?;
    if !current.contains(reference) {
        return Ok(());
    }
    let remaining: Vec<ModelIdentifier> = current.into_iter().filter(|r| r != reference).collect();
    write_references(schema, holder, association, &remaining)
}

/// `owner` no longer references `target`: drop `owner` from the target's inverse
fn unlink_inverse(
    schema: &Schema,
    owner: &ModelIdentifier,
    association: &Association,
    target: &ModelIdentifier,
) -> ModelResult<()> {
    match schema.registry().inverse_for(association, &target.model_name) {
        Some(inverse) => remove_reference(schema, target, inverse, owner),
        None => Ok(()),
    }
}

/// `owner` now references `target`: point the target's inverse at `owner`
fn link_inverse(
    schema: &Schema,
    owner: &ModelIdentifier,
    association: &Association,
    target: &ModelIdentifier,
) -> ModelResult<()> {
    let registry = schema.registry();
    let Some(inverse) = registry.inverse_for(association, &target.model_name) else {
        return Ok(());
    };

    let mut current = references(schema, target, inverse)?;
    if inverse.is_belongs_to() {
        if current.first() == Some(owner) {
            return Ok(());
        }
        // The target moves away from its previous holder.
        if let Some(previous) = current.first() {
            if let Some(back) = registry.inverse_for(inverse, &previous.model_name) {
                remove_reference(schema, previous, back, target)?;
            }
        }
        write_references(schema, target, inverse, std::slice::from_ref(owner))
    } else {
        if current.contains(owner) {
            return Ok(());
        }
        current.push(owner.clone());
        write_references(schema, target, inverse, &current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::ModelDefinition;
    use crate::relationships::Association;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .model("user", ModelDefinition::new().has_many("posts"))
            .model("post", ModelDefinition::new().belongs_to("user"))
            .build()
            .unwrap()
    }

    fn user(id: &str) -> ModelIdentifier {
        ModelIdentifier::new("user", id)
    }

    fn post(id: &str) -> ModelIdentifier {
        ModelIdentifier::new("post", id)
    }

    #[test]
    fn test_replace_writes_both_sides() {
        let schema = schema();
        for _ in 0..2 {
            schema.create("user", ()).unwrap();
            schema.create("post", ()).unwrap();
        }
        let posts = schema.association_for("user", "posts").unwrap().clone();

        replace(&schema, &user("1"), &posts, &[post("1"), post("2"), post("1")]).unwrap();
        assert_eq!(
            schema.db().dump(),
            json!({
                "users": [{ "id": "1", "postIds": ["1", "2"] }, { "id": "2", "postIds": [] }],
                "posts": [{ "id": "1", "userId": "1" }, { "id": "2", "userId": "1" }]
            })
        );

        // post 2 moves to user 2 and leaves user 1
        replace(&schema, &user("2"), &posts, &[post("2")]).unwrap();
        assert_eq!(
            schema.db().dump()["users"],
            json!([{ "id": "1", "postIds": ["1"] }, { "id": "2", "postIds": ["2"] }])
        );

        replace(&schema, &user("1"), &posts, &[]).unwrap();
        assert_eq!(
            schema.db().dump()["posts"],
            json!([{ "id": "1", "userId": null }, { "id": "2", "userId": "2" }])
        );
    }

    #[test]
    fn test_replace_validates_before_writing() {
        let schema = schema();
        schema.create("user", ()).unwrap();
        schema.create("post", ()).unwrap();
        let before = schema.db().dump();
        let posts = schema.association_for("user", "posts").unwrap().clone();

        let err = replace(&schema, &user("1"), &posts, &[post("1"), post("7")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
        assert_eq!(schema.db().dump(), before);

        let err = replace(&schema, &user("1"), &posts, &[user("1")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_disassociate_dependents_clears_one_way_references() {
        let schema = Schema::builder()
            .model("user", ModelDefinition::new())
            .model(
                "post",
                ModelDefinition::new().association("author", Association::belongs_to().model("user")),
            )
            .build()
            .unwrap();
        schema.create("user", ()).unwrap();
        schema.create("post", json!({ "authorId": "1" })).unwrap();
        schema.create("post", json!({ "authorId": "1" })).unwrap();

        disassociate_dependents(&schema, &user("1")).unwrap();
        assert_eq!(
            schema.db().dump()["posts"],
            json!([{ "id": "1", "authorId": null }, { "id": "2", "authorId": null }])
        );
    }
}
