use std::collections::HashMap;

use fxtoggle_api::{EffectRuntime, UniformVariable};
use tracing::trace;

use crate::ConstantType;

/// Annotation naming the group constant a uniform is fed from.
const SOURCE_ANNOTATION: &str = "source";

/// Runtime uniforms fed from group constants, keyed by constant name.
#[derive(Debug, Default, Clone)]
pub struct UniformRegistry {
    entries: HashMap<String, (ConstantType, Vec<UniformVariable>)>,
}

impl UniformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the runtime's uniforms carrying a `source` annotation.
    pub fn reload(&mut self, runtime: &dyn EffectRuntime) {
        self.entries.clear();

        for variable in runtime.uniform_variables() {
            let Some(name) = runtime.uniform_annotation_string(variable, SOURCE_ANNOTATION) else {
                continue;
            };
            let Some(ty) = ConstantType::classify(runtime.uniform_type(variable)) else {
                trace!(?variable, %name, "uniform type not supported as constant source");
                continue;
            };
            self.insert(name, ty, variable);
        }
    }

    /// Register `variable` under `name`. A variable whose type disagrees with the first one
    /// registered under that name is ignored.
    pub fn insert(&mut self, name: String, ty: ConstantType, variable: UniformVariable) -> bool {
        match self.entries.get_mut(&name) {
            Some((existing, vars)) if *existing == ty => {
                vars.push(variable);
                true
            }
            Some((existing, _)) => {
                trace!(%name, %existing, requested = %ty, "conflicting uniform type ignored");
                false
            }
            None => {
                self.entries.insert(name, (ty, vec![variable]));
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<(ConstantType, &[UniformVariable])> {
        self.entries
            .get(name)
            .map(|(ty, vars)| (*ty, vars.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fxtoggle_api::test_utils::{MockDevice, MockRuntime};
    use fxtoggle_api::{Format, UniformTypeInfo};

    use super::*;

    const FLOAT: UniformTypeInfo = UniformTypeInfo {
        format: Format::R32Float,
        rows: 1,
        columns: 1,
        array_length: 0,
    };
    const INT: UniformTypeInfo = UniformTypeInfo {
        format: Format::R32Sint,
        rows: 1,
        columns: 1,
        array_length: 0,
    };

    #[test]
    fn reload_groups_by_source_and_rejects_type_conflicts() {
        let runtime = MockRuntime::new(Arc::new(MockDevice::new()), 1920, 1080);
        let a = runtime.add_uniform(Some("fov"), FLOAT);
        let b = runtime.add_uniform(Some("fov"), FLOAT);
        let _conflict = runtime.add_uniform(Some("fov"), INT);
        let _unannotated = runtime.add_uniform(None, FLOAT);
        let _array = runtime.add_uniform(
            Some("bones"),
            UniformTypeInfo {
                array_length: 8,
                ..FLOAT
            },
        );

        let mut registry = UniformRegistry::new();
        registry.reload(&runtime);

        assert_eq!(registry.len(), 1);
        let (ty, vars) = registry.get("fov").unwrap();
        assert_eq!(ty, ConstantType::Float);
        assert_eq!(vars, &[a, b]);
        assert!(registry.get("bones").is_none());
    }
}
