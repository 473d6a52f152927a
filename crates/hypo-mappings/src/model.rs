//! The in-memory mapping model: a tree of obfuscated-to-deobfuscated name
//! associations for classes, members and method parameters.
//!
//! Nested classes resolve through `$`-joined internal names
//! (`a/Outer$Inner`); inner mappings are keyed by simple name. All child
//! collections are ordered maps so iteration (and serialization) is
//! deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSet {
    top_level: BTreeMap<String, ClassMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    pub fn top_level_mappings(&self) -> impl Iterator<Item = &ClassMapping> {
        self.top_level.values()
    }

    /// Resolve a class mapping by full internal name (`a/Outer$Inner`).
    pub fn get_class(&self, name: &str) -> Option<&ClassMapping> {
        let (top, rest) = split_top(name);
        let mut current = self.top_level.get(top)?;
        if let Some(rest) = rest {
            for segment in rest.split('$') {
                current = current.inner_class(segment)?;
            }
        }
        Some(current)
    }

    pub fn get_class_mut(&mut self, name: &str) -> Option<&mut ClassMapping> {
        let (top, rest) = split_top(name);
        let mut current = self.top_level.get_mut(top)?;
        if let Some(rest) = rest {
            for segment in rest.split('$') {
                current = current.inner_classes.get_mut(segment)?;
            }
        }
        Some(current)
    }

    /// Resolve or create the whole chain down to `name`.
    pub fn get_or_create_class(&mut self, name: &str) -> &mut ClassMapping {
        let (top, rest) = split_top(name);
        let mut current = self
            .top_level
            .entry(top.to_string())
            .or_insert_with(|| ClassMapping::new(top));
        if let Some(rest) = rest {
            for segment in rest.split('$') {
                current = current
                    .inner_classes
                    .entry(segment.to_string())
                    .or_insert_with(|| ClassMapping::new(segment));
            }
        }
        current
    }

    /// Remove a class mapping (and its subtree) by full internal name.
    pub fn remove_class(&mut self, name: &str) -> Option<ClassMapping> {
        match name.rsplit_once('$') {
            None => self.top_level.remove(name),
            Some((parent, simple)) => self.get_class_mut(parent)?.inner_classes.remove(simple),
        }
    }

    /// Every mapped class's full internal name, depth-first into inner
    /// mappings, in deterministic order.
    pub fn class_names(&self) -> Vec<String> {
        fn collect(mapping: &ClassMapping, full: &str, out: &mut Vec<String>) {
            out.push(full.to_string());
            for (simple, inner) in &mapping.inner_classes {
                collect(inner, &format!("{full}${simple}"), out);
            }
        }
        let mut out = Vec::new();
        for (name, mapping) in &self.top_level {
            collect(mapping, name, &mut out);
        }
        out
    }
}

fn split_top(name: &str) -> (&str, Option<&str>) {
    match name.split_once('$') {
        Some((top, rest)) => (top, Some(rest)),
        None => (name, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    /// Full internal name for top-level classes, simple name for inner ones.
    obfuscated_name: String,
    deobfuscated_name: Option<String>,
    inner_classes: BTreeMap<String, ClassMapping>,
    fields: BTreeMap<String, FieldMapping>,
    methods: BTreeMap<String, MethodMapping>,
}

impl ClassMapping {
    pub fn new(obfuscated_name: impl Into<String>) -> Self {
        Self {
            obfuscated_name: obfuscated_name.into(),
            deobfuscated_name: None,
            inner_classes: BTreeMap::new(),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn obfuscated_name(&self) -> &str {
        &self.obfuscated_name
    }

    pub fn deobfuscated_name(&self) -> Option<&str> {
        self.deobfuscated_name.as_deref()
    }

    pub fn set_deobfuscated_name(&mut self, name: Option<String>) {
        self.deobfuscated_name = name;
    }

    pub fn inner_class(&self, simple_name: &str) -> Option<&ClassMapping> {
        self.inner_classes.get(simple_name)
    }

    pub fn get_or_create_inner_class(&mut self, simple_name: &str) -> &mut ClassMapping {
        self.inner_classes
            .entry(simple_name.to_string())
            .or_insert_with(|| ClassMapping::new(simple_name))
    }

    pub fn inner_class_mappings(&self) -> impl Iterator<Item = &ClassMapping> {
        self.inner_classes.values()
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn get_or_create_field(
        &mut self,
        name: &str,
        descriptor: Option<&str>,
    ) -> &mut FieldMapping {
        let field = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| FieldMapping::new(name));
        if field.descriptor.is_none() {
            field.descriptor = descriptor.map(str::to_string);
        }
        field
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldMapping> {
        self.fields.remove(name)
    }

    pub fn field_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.values()
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodMapping> {
        self.methods.get(&method_key(name, descriptor))
    }

    pub fn method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut MethodMapping> {
        self.methods.get_mut(&method_key(name, descriptor))
    }

    pub fn get_or_create_method(&mut self, name: &str, descriptor: &str) -> &mut MethodMapping {
        self.methods
            .entry(method_key(name, descriptor))
            .or_insert_with(|| MethodMapping::new(name, descriptor))
    }

    pub fn remove_method(&mut self, name: &str, descriptor: &str) -> Option<MethodMapping> {
        self.methods.remove(&method_key(name, descriptor))
    }

    pub fn method_mappings(&self) -> impl Iterator<Item = &MethodMapping> {
        self.methods.values()
    }
}

fn method_key(name: &str, descriptor: &str) -> String {
    format!("{name}{descriptor}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    obfuscated_name: String,
    descriptor: Option<String>,
    deobfuscated_name: Option<String>,
}

impl FieldMapping {
    pub fn new(obfuscated_name: impl Into<String>) -> Self {
        Self {
            obfuscated_name: obfuscated_name.into(),
            descriptor: None,
            deobfuscated_name: None,
        }
    }

    pub fn obfuscated_name(&self) -> &str {
        &self.obfuscated_name
    }

    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn deobfuscated_name(&self) -> Option<&str> {
        self.deobfuscated_name.as_deref()
    }

    pub fn set_deobfuscated_name(&mut self, name: Option<String>) {
        self.deobfuscated_name = name;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMapping {
    obfuscated_name: String,
    descriptor: String,
    deobfuscated_name: Option<String>,
    parameters: BTreeMap<usize, ParameterMapping>,
}

impl MethodMapping {
    pub fn new(obfuscated_name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            obfuscated_name: obfuscated_name.into(),
            descriptor: descriptor.into(),
            deobfuscated_name: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn obfuscated_name(&self) -> &str {
        &self.obfuscated_name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn deobfuscated_name(&self) -> Option<&str> {
        self.deobfuscated_name.as_deref()
    }

    pub fn set_deobfuscated_name(&mut self, name: Option<String>) {
        self.deobfuscated_name = name;
    }

    pub fn parameter(&self, index: usize) -> Option<&ParameterMapping> {
        self.parameters.get(&index)
    }

    pub fn set_parameter(&mut self, index: usize, deobfuscated_name: impl Into<String>) {
        self.parameters.insert(
            index,
            ParameterMapping {
                index,
                deobfuscated_name: deobfuscated_name.into(),
            },
        );
    }

    pub fn remove_parameter(&mut self, index: usize) -> Option<ParameterMapping> {
        self.parameters.remove(&index)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &ParameterMapping> {
        self.parameters.values()
    }

    pub(crate) fn copy_from(&mut self, source: &MethodMapping) {
        self.deobfuscated_name = source.deobfuscated_name.clone();
        self.parameters = source.parameters.clone();
    }
}

/// A method parameter mapping, by declaration index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub index: usize,
    pub deobfuscated_name: String,
}
