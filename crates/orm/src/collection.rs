//! Collection - ordered, deduplicated sets of models
//!
//! Returned by has-many accessors and schema queries. A collection is a
//! materialized snapshot: reading an association again builds a new one from
//! the current foreign key state.

use std::cmp::Ordering;
use std::ops::Index;

use crate::error::ModelResult;
use crate::model::{Attrs, Model};
use crate::relationships::ModelIdentifier;

#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// `None` for polymorphic collections holding several model types
    model_name: Option<String>,
    models: Vec<Model>,
}

impl Collection {
    /// Build a collection, dropping repeated records
    pub fn new(model_name: Option<String>, models: Vec<Model>) -> Self {
        let mut collection = Self {
            model_name,
            models: Vec::with_capacity(models.len()),
        };
        for model in models {
            collection.add(model);
        }
        collection
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn first(&self) -> Option<&Model> {
        self.models.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    /// Ids of the saved members, in order
    pub fn ids(&self) -> Vec<String> {
        self.models.iter().filter_map(Model::id).collect()
    }

    /// Type-tagged ids of the saved members, in order
    pub fn identifiers(&self) -> Vec<ModelIdentifier> {
        self.models.iter().filter_map(Model::identifier).collect()
    }

    pub fn includes(&self, model: &Model) -> bool {
        self.models.iter().any(|member| member.same_record(model))
    }

    pub fn filter<F>(&self, predicate: F) -> Collection
    where
        F: Fn(&Model) -> bool,
    {
        Collection {
            model_name: self.model_name.clone(),
            models: self.models.iter().filter(|m| predicate(*m)).cloned().collect(),
        }
    }

    pub fn sort_by<F>(&self, compare: F) -> Collection
    where
        F: FnMut(&Model, &Model) -> Ordering,
    {
        let mut models = self.models.clone();
        models.sort_by(compare);
        Collection {
            model_name: self.model_name.clone(),
            models,
        }
    }

    /// Members `begin..end`, clamped to the collection bounds
    pub fn slice(&self, begin: usize, end: Option<usize>) -> Collection {
        let end = end.unwrap_or(self.models.len()).min(self.models.len());
        let begin = begin.min(end);
        Collection {
            model_name: self.model_name.clone(),
            models: self.models[begin..end].to_vec(),
        }
    }

    /// Append a model unless it is already a member
    pub fn add(&mut self, model: Model) -> &mut Self {
        if !self.includes(&model) {
            self.models.push(model);
        }
        self
    }

    pub fn remove(&mut self, model: &Model) -> &mut Self {
        self.models.retain(|member| !member.same_record(model));
        self
    }

    /// Append every member of `other` that is not already present
    pub fn merge(&mut self, other: Collection) -> &mut Self {
        if self.model_name != other.model_name {
            self.model_name = None;
        }
        for model in other.models {
            self.add(model);
        }
        self
    }

    /// Update every member with `attrs` and save it
    pub fn update(&self, attrs: impl Into<Attrs>) -> ModelResult<()> {
        let attrs: Attrs = attrs.into();
        self.models
            .iter()
            .try_for_each(|model| model.update(attrs.clone()))
    }

    pub fn save(&self) -> ModelResult<()> {
        self.models.iter().try_for_each(Model::save)
    }

    pub fn destroy(&self) -> ModelResult<()> {
        self.models.iter().try_for_each(Model::destroy)
    }

    pub fn reload(&self) -> ModelResult<()> {
        self.models.iter().try_for_each(Model::reload)
    }

    pub fn into_vec(self) -> Vec<Model> {
        self.models
    }
}

impl Index<usize> for Collection {
    type Output = Model;

    fn index(&self, index: usize) -> &Model {
        &self.models[index]
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
