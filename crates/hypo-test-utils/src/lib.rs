#![forbid(unsafe_code)]

//! In-memory fixtures for exercising providers, hydration and mappings
//! without real class files.
//!
//! [`MemoryRoot`] serves each class's internal name as its "bytes";
//! [`MapDecoder`] turns those bytes back into registered [`ClassData`] and
//! counts decode invocations so tests can assert the at-most-once cache
//! contract.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use hypo_core::{
    ClassDecoder, ClassProvider, ClassReference, ClassRoot, ContextConfig, CoreError,
    HypoContext, Result,
};
use hypo_model::ClassData;

#[derive(Debug, Default)]
pub struct MemoryRoot {
    classes: BTreeMap<String, Vec<u8>>,
}

impl MemoryRoot {
    pub fn new(class_names: impl IntoIterator<Item = String>) -> Self {
        let mut classes = BTreeMap::new();
        for name in class_names {
            classes.insert(format!("{name}.class"), name.into_bytes());
        }
        Self { classes }
    }
}

impl ClassRoot for MemoryRoot {
    fn display_name(&self) -> String {
        "memory".to_string()
    }

    fn read_class(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.classes.get(file_name).cloned())
    }

    fn enumerate(&self) -> Result<Vec<ClassReference>> {
        Ok(self
            .classes
            .keys()
            .map(|file_name| ClassReference {
                file_name: file_name.clone(),
                class_name: file_name.trim_end_matches(".class").to_string(),
            })
            .collect())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MapDecoder {
    classes: Mutex<HashMap<String, ClassData>>,
    decodes: AtomicUsize,
}

impl MapDecoder {
    pub fn new(classes: impl IntoIterator<Item = ClassData>) -> Self {
        let classes = classes
            .into_iter()
            .map(|data| (data.name.clone(), data))
            .collect();
        Self {
            classes: Mutex::new(classes),
            decodes: AtomicUsize::new(0),
        }
    }

    /// How many times `decode` ran, across all threads.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl ClassDecoder for MapDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Option<ClassData>> {
        let name = std::str::from_utf8(bytes)
            .map_err(|err| CoreError::Precondition(format!("fixture bytes: {err}")))?;
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(self.classes.lock().get(name).cloned())
    }
}

/// A provider serving exactly `classes`, backed by a [`MemoryRoot`] and a
/// shared [`MapDecoder`].
pub fn provider_for(
    classes: impl IntoIterator<Item = ClassData>,
    decoder: &Arc<MapDecoder>,
) -> ClassProvider {
    let names: Vec<String> = {
        let data: Vec<ClassData> = classes.into_iter().collect();
        let mut map = decoder.classes.lock();
        let names = data.iter().map(|c| c.name.clone()).collect();
        for class in data {
            map.insert(class.name.clone(), class);
        }
        names
    };
    ClassProvider::new(
        vec![Box::new(MemoryRoot::new(names))],
        Arc::clone(decoder) as Arc<dyn ClassDecoder>,
    )
}

/// A ready-to-use context over in-memory core and context classes.
///
/// Built with `require_full_classpath` off, so fixtures need not model the
/// JDK: unresolved references (like `java/lang/Object`) fold to absent.
pub fn context_for(
    core: impl IntoIterator<Item = ClassData>,
    context: impl IntoIterator<Item = ClassData>,
) -> HypoContext {
    let decoder = Arc::new(MapDecoder::default());
    let config = ContextConfig {
        require_full_classpath: false,
        ..ContextConfig::default()
    };
    let mut builder = HypoContext::builder()
        .with_config(config)
        .with_provider(provider_for(core, &decoder));
    let context: Vec<ClassData> = context.into_iter().collect();
    if !context.is_empty() {
        builder = builder.with_context_provider(provider_for(context, &decoder));
    }
    match builder.build() {
        Ok(ctx) => ctx,
        Err(err) => panic!("failed to build fixture context: {err}"),
    }
}
