//! Class provisioning: roots + decoder + an at-most-once decode cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use hypo_model::{ClassData, ClassRecord};

use crate::error::{CoreError, Result};
use crate::root::{ClassReference, ClassRoot};

/// The decoder boundary: raw class-file bytes in, structural data out.
///
/// Byte-level decoding is an external concern; implementations are expected
/// to wrap an existing bytecode library. `Ok(None)` means the bytes do not
/// describe a class this decoder models.
pub trait ClassDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Option<ClassData>>;
}

/// Per-record post-decode hook, installed by the context. Its sole job is
/// back-linking the record to its provider and setting the context flag.
pub type Decorator = Box<dyn Fn(&ClassRecord) + Send + Sync>;

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(0);

/// Strip a leading `/` and a `.class` suffix; this is the decode-cache key.
pub fn normalize_class_name(name: &str) -> &str {
    let name = name.strip_prefix('/').unwrap_or(name);
    name.strip_suffix(".class").unwrap_or(name)
}

type CacheSlot = Arc<OnceCell<Option<Arc<ClassRecord>>>>;

/// Resolves class names to decoded records across an ordered list of roots.
///
/// The cache guarantees at most one decode per normalized name, even under
/// parallel lookups: each name owns a once-cell slot, and the decode runs
/// inside `get_or_try_init` without holding the cache lock. A `None` slot
/// value is the absent sentinel, so repeated misses stay O(1).
pub struct ClassProvider {
    id: u64,
    roots: Vec<Box<dyn ClassRoot>>,
    decoder: Arc<dyn ClassDecoder>,
    is_context: AtomicBool,
    decorator: OnceCell<Decorator>,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl ClassProvider {
    pub fn new(roots: Vec<Box<dyn ClassRoot>>, decoder: Arc<dyn ClassDecoder>) -> Self {
        Self {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
            roots,
            decoder,
            is_context: AtomicBool::new(false),
            decorator: OnceCell::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Context providers are classpath-only: they resolve lookups but are not
    /// iterated as hydration/completion subjects.
    pub fn is_context_provider(&self) -> bool {
        self.is_context.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_context(&self) {
        self.is_context.store(true, Ordering::Relaxed);
    }

    /// Install the per-record decorator. Returns false when one is already
    /// installed.
    pub fn install_decorator(&self, decorator: Decorator) -> bool {
        self.decorator.set(decorator).is_ok()
    }

    /// Resolve a class by name (accepts `pkg/Name`, `/pkg/Name` and
    /// `pkg/Name.class` spellings).
    pub fn find_class(&self, name: &str) -> Result<Option<Arc<ClassRecord>>> {
        let decorator = self.decorator.get().ok_or_else(|| {
            CoreError::precondition("provider used before its decorator was installed")
        })?;
        let normalized = normalize_class_name(name);
        let slot = {
            let mut cache = self.cache.lock();
            cache
                .entry(normalized.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let record = slot.get_or_try_init(|| self.decode_class(normalized, decorator))?;
        Ok(record.clone())
    }

    fn decode_class(
        &self,
        normalized: &str,
        decorator: &Decorator,
    ) -> Result<Option<Arc<ClassRecord>>> {
        let file_name = format!("{normalized}.class");
        for root in &self.roots {
            let Some(bytes) = root.read_class(&file_name)? else {
                continue;
            };
            debug!(class = normalized, root = %root.display_name(), "decoding class");
            let data = self
                .decoder
                .decode(&bytes)
                .map_err(|err| CoreError::Decode {
                    class_name: normalized.to_string(),
                    source: Box::new(err),
                })?;
            let Some(data) = data else {
                return Ok(None);
            };
            let record = Arc::new(ClassRecord::new(data));
            decorator(&record);
            return Ok(Some(record));
        }
        Ok(None)
    }

    /// Enumerate every class reachable from this provider's roots, first root
    /// winning on duplicates.
    pub fn all_classes(&self) -> Result<Vec<ClassReference>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for root in &self.roots {
            for reference in root.enumerate()? {
                if seen.insert(reference.class_name.clone()) {
                    out.push(reference);
                }
            }
        }
        Ok(out)
    }

    pub fn close(&self) -> Result<()> {
        let failures: Vec<CoreError> = self
            .roots
            .iter()
            .filter_map(|root| root.close().err())
            .collect();
        CoreError::aggregate_close(failures)
    }
}

impl std::fmt::Debug for ClassProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassProvider")
            .field("id", &self.id)
            .field("roots", &self.roots.len())
            .field("is_context", &self.is_context_provider())
            .finish()
    }
}

/// Several providers behaving as one: first-wins lookup, concatenated
/// enumeration, aggregated close.
#[derive(Debug, Default)]
pub struct ProviderSet {
    providers: Vec<Arc<ClassProvider>>,
}

impl ProviderSet {
    pub fn new(providers: Vec<Arc<ClassProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<ClassProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn find_class(&self, name: &str) -> Result<Option<Arc<ClassRecord>>> {
        for provider in &self.providers {
            if let Some(record) = provider.find_class(name)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    pub fn all_classes(&self) -> Result<Vec<ClassReference>> {
        let mut out = Vec::new();
        for provider in &self.providers {
            out.extend(provider.all_classes()?);
        }
        Ok(out)
    }

    pub fn close(&self) -> Result<()> {
        let failures: Vec<CoreError> = self
            .providers
            .iter()
            .filter_map(|provider| provider.close().err())
            .collect();
        CoreError::aggregate_close(failures)
    }
}
