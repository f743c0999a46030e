//! Component snapshots for the delta engine.
//!
//! A [`ComponentSnapshot`] captures a component and all of its generations
//! as loaded from one repository. Two snapshots of the same component,
//! typically taken before and after a reload, can be diffed directly.

use std::sync::Arc;

use serde_json::Value;
use tessera_delta::{
    diff_root, Association, ComparisonOptions, DeltaOptions, DiffObject, ModelObjectDelta, Targets,
};
use tessera_repo::{Component, Generation, Repository};

use crate::error::SdkResult;

/// Association label of a snapshot's generations.
pub const GENERATIONS: &str = "generations";

/// A component with its materialized generations.
#[derive(Clone, Debug)]
pub struct ComponentSnapshot {
    component: Arc<Component>,
    generations: Vec<GenerationSnapshot>,
}

/// One generation inside a [`ComponentSnapshot`].
#[derive(Clone, Debug)]
pub struct GenerationSnapshot(Arc<Generation>);

impl ComponentSnapshot {
    pub fn new(component: Arc<Component>, generations: Vec<Arc<Generation>>) -> Self {
        Self {
            component,
            generations: generations.into_iter().map(GenerationSnapshot).collect(),
        }
    }

    /// Snapshot `component_id` as `repository` currently resolves it.
    pub fn load(repository: &Repository, component_id: &str) -> SdkResult<Option<Self>> {
        let Some(component) = repository.component(component_id)? else {
            return Ok(None);
        };
        let generations = repository.generations(component_id)?;
        Ok(Some(Self::new(component, generations)))
    }

    pub fn component(&self) -> &Arc<Component> {
        &self.component
    }

    pub fn generations(&self) -> impl Iterator<Item = &Arc<Generation>> + '_ {
        self.generations.iter().map(|g| &g.0)
    }

    /// Options matching generations by id, the default for snapshots.
    pub fn delta_options() -> DeltaOptions {
        DeltaOptions::keyed_by("id")
    }

    /// Diff this snapshot (the original) against `reference`.
    pub fn diff<'a>(
        &'a self,
        reference: &'a ComponentSnapshot,
        options: &dyn ComparisonOptions,
    ) -> ModelObjectDelta<'a> {
        diff_root(Some(self), Some(reference), options)
    }
}

impl GenerationSnapshot {
    pub fn generation(&self) -> &Arc<Generation> {
        &self.0
    }
}

impl DiffObject for ComponentSnapshot {
    fn type_name(&self) -> &str {
        self.component.type_name.as_deref().unwrap_or("Component")
    }

    fn properties(&self) -> Vec<(&str, Value)> {
        let c = &self.component;
        let mut props = vec![
            ("id", Value::from(c.id.as_str())),
            ("qualifiedName", Value::from(c.qualified_name.as_str())),
            ("kindId", Value::from(c.kind_id.as_str())),
            ("versionId", Value::from(c.version_id.as_str())),
            (
                "validTo",
                c.valid_to.map_or(Value::Null, |d| Value::from(d.to_string())),
            ),
        ];
        props.extend(c.properties.iter().map(|(k, v)| (k.as_str(), v.clone())));
        props
    }

    fn associations(&self) -> Vec<Association<'_>> {
        let targets = self.generations.iter().map(|g| g as &dyn DiffObject).collect();
        vec![Association::composition(GENERATIONS, Targets::ToMany(targets))]
    }
}

impl DiffObject for GenerationSnapshot {
    fn type_name(&self) -> &str {
        "Generation"
    }

    fn properties(&self) -> Vec<(&str, Value)> {
        let g = &self.0;
        let mut props = vec![
            ("id", Value::from(g.id.as_str())),
            ("validFrom", Value::from(g.valid_from.to_string())),
        ];
        props.extend(g.properties.iter().map(|(k, v)| (k.as_str(), v.clone())));
        props
    }
}
