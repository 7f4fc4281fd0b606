//! Association handles - kind-tagged access to one association of one model

use crate::error::ModelResult;
use crate::model::Model;

use super::{Association, AssociationKind, BelongsTo, HasMany};

/// Either kind of association handle, as returned by [`Model::association`]
#[derive(Debug, Clone, Copy)]
pub enum AssociationHandle<'a> {
    BelongsTo(BelongsTo<'a>),
    HasMany(HasMany<'a>),
}

impl<'a> AssociationHandle<'a> {
    pub fn association(&self) -> &'a Association {
        match self {
            AssociationHandle::BelongsTo(handle) => handle.association(),
            AssociationHandle::HasMany(handle) => handle.association(),
        }
    }

    pub fn kind(&self) -> AssociationKind {
        self.association().kind()
    }

    pub fn key(&self) -> &'a str {
        self.association().key()
    }

    /// Current members as a list: zero or one for belongs-to
    pub fn models(&self) -> ModelResult<Vec<Model>> {
        match self {
            AssociationHandle::BelongsTo(handle) => Ok(handle.get()?.into_iter().collect()),
            AssociationHandle::HasMany(handle) => Ok(handle.get()?.into_vec()),
        }
    }

    pub fn as_belongs_to(&self) -> Option<&BelongsTo<'a>> {
        match self {
            AssociationHandle::BelongsTo(handle) => Some(handle),
            AssociationHandle::HasMany(_) => None,
        }
    }

    pub fn as_has_many(&self) -> Option<&HasMany<'a>> {
        match self {
            AssociationHandle::HasMany(handle) => Some(handle),
            AssociationHandle::BelongsTo(_) => None,
        }
    }
}
