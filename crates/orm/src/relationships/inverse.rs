//! Inverse Resolution - pairs every association with its back-reference
//!
//! Resolution runs once, when the schema is built. The result maps
//! `(owner, key, concrete target)` to the key of the inverse association on
//! the target model. Polymorphic associations are resolved separately for
//! each concrete model they may point at.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use super::metadata::{Association, InverseSpec};
use crate::error::{ModelError, ModelResult};

/// Associations of every registered model, keyed by model name then key
pub(crate) type AssociationMap = IndexMap<String, IndexMap<String, Association>>;

/// `(owner, key, concrete target)` of an association side
pub(crate) type InverseKey = (String, String, String);

/// Resolved inverse keys
pub(crate) type InverseIndex = HashMap<InverseKey, String>;

/// Resolve the inverse of every association in `models`
pub(crate) fn resolve_inverses(models: &AssociationMap) -> ModelResult<InverseIndex> {
    let mut index = InverseIndex::new();

    for (owner, associations) in models {
        for association in associations.values() {
            let mut resolved_any = false;

            for target in concrete_targets(association, models) {
                if let Some(inverse) = resolve_for_target(association, target, models)? {
                    debug!(
                        "Resolved inverse of {}.{} on {} to '{}'",
                        owner,
                        association.key(),
                        target,
                        inverse.key()
                    );
                    index.insert(
                        (owner.clone(), association.key().to_string(), target.to_string()),
                        inverse.key().to_string(),
                    );
                    resolved_any = true;
                }
            }

            if let InverseSpec::Named(name) = association.inverse_spec() {
                if !resolved_any {
                    return Err(ModelError::Configuration(format!(
                        "{}.{} names '{}' as its inverse, but no model it can reference declares an association with that key",
                        owner,
                        association.key(),
                        name
                    )));
                }
            }
        }
    }

    check_symmetry(&index)?;
    Ok(index)
}

fn concrete_targets<'a>(association: &'a Association, models: &'a AssociationMap) -> Vec<&'a str> {
    match association.target() {
        Some(target) => vec![target],
        None => models.keys().map(String::as_str).collect(),
    }
}

fn resolve_for_target<'a>(
    association: &Association,
    target: &str,
    models: &'a AssociationMap,
) -> ModelResult<Option<&'a Association>> {
    let owner = association.owner();
    let Some(target_associations) = models.get(target) else {
        return Err(ModelError::UnknownModel(target.to_string()));
    };

    match association.inverse_spec() {
        InverseSpec::None => Ok(None),
        InverseSpec::Named(name) => {
            let Some(inverse) = target_associations.get(name) else {
                // A polymorphic association only needs the inverse on the
                // models that declare it.
                if association.is_polymorphic() {
                    return Ok(None);
                }
                return Err(ModelError::Configuration(format!(
                    "{}.{} names '{}' as its inverse, but the {} model has no such association",
                    owner,
                    association.key(),
                    name,
                    target
                )));
            };

            if !inverse.can_target(owner) {
                return Err(ModelError::Configuration(format!(
                    "{}.{} names {}.{} as its inverse, but {}.{} does not reference the {} model",
                    owner,
                    association.key(),
                    target,
                    name,
                    target,
                    name,
                    owner
                )));
            }

            match inverse.inverse_spec() {
                InverseSpec::Auto => Ok(Some(inverse)),
                InverseSpec::Named(back) if back == association.key() => Ok(Some(inverse)),
                InverseSpec::Named(back) => Err(ModelError::Configuration(format!(
                    "{}.{} names {}.{} as its inverse, but {}.{} names '{}' as its own inverse",
                    owner,
                    association.key(),
                    target,
                    name,
                    target,
                    name,
                    back
                ))),
                InverseSpec::None => Err(ModelError::Configuration(format!(
                    "{}.{} names {}.{} as its inverse, but {}.{} is declared without an inverse",
                    owner,
                    association.key(),
                    target,
                    name,
                    target,
                    name
                ))),
            }
        }
        InverseSpec::Auto => {
            let mut candidates: Vec<&Association> = target_associations
                .values()
                .filter(|candidate| candidate.can_target(owner))
                .filter(|candidate| match candidate.inverse_spec() {
                    InverseSpec::Named(back) => back == association.key(),
                    InverseSpec::Auto => !association.is_polymorphic() && !candidate.is_polymorphic(),
                    InverseSpec::None => false,
                })
                .collect();

            if candidates.iter().any(|candidate| names(candidate, association)) {
                candidates.retain(|candidate| names(candidate, association));
            }

            if owner == target {
                let others: Vec<&Association> = candidates
                    .iter()
                    .copied()
                    .filter(|candidate| !candidate.same_as(association))
                    .collect();
                if !others.is_empty() {
                    candidates = others;
                }
            }

            match candidates.as_slice() {
                [] => Ok(None),
                [inverse] => Ok(Some(*inverse)),
                many => Err(ModelError::Configuration(format!(
                    "The inverse of {}.{} on the {} model is ambiguous: found {}. Name the inverse explicitly on one side",
                    owner,
                    association.key(),
                    target,
                    many.iter()
                        .map(|candidate| format!("'{}'", candidate.key()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))),
            }
        }
    }
}

fn names(candidate: &Association, association: &Association) -> bool {
    matches!(candidate.inverse_spec(), InverseSpec::Named(back) if back == association.key())
}

fn check_symmetry(index: &InverseIndex) -> ModelResult<()> {
    for ((owner, key, target), inverse) in index {
        let back = index.get(&(target.clone(), inverse.clone(), owner.clone()));
        if back != Some(key) {
            return Err(ModelError::Configuration(format!(
                "{}.{} resolves to {}.{} as its inverse, but {}.{} resolves to {}",
                owner,
                key,
                target,
                inverse,
                target,
                inverse,
                match back {
                    Some(back) => format!("{}.{}", owner, back),
                    None => "no inverse".to_string(),
                }
            )));
        }
    }
    Ok(())
}
