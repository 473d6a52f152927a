//! Sources of class bytes: directory trees, archives (jar/jmod) and the host
//! runtime's module image.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use zip::ZipArchive;

use crate::error::{CoreError, Result};

/// A class found while enumerating a root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassReference {
    /// Path within the root (`pkg/Name.class`).
    pub file_name: String,
    /// Normalized internal name (`pkg/Name`).
    pub class_name: String,
}

impl ClassReference {
    fn from_file_name(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let class_name = file_name
            .strip_suffix(".class")
            .unwrap_or(&file_name)
            .trim_start_matches('/')
            .to_string();
        Self {
            file_name,
            class_name,
        }
    }
}

/// The capability a provider consumes: get class bytes by file name,
/// enumerate everything, close.
pub trait ClassRoot: Send + Sync {
    /// A human-readable identifier for diagnostics.
    fn display_name(&self) -> String;

    /// Read the bytes of `pkg/Name.class`. `Ok(None)` when the root does not
    /// contain the file.
    fn read_class(&self, file_name: &str) -> Result<Option<Vec<u8>>>;

    /// Enumerate every class file in this root, in stable order.
    fn enumerate(&self) -> Result<Vec<ClassReference>>;

    fn close(&self) -> Result<()>;
}

/// `module-info`/`package-info` pseudo-classes are lookup-able but never
/// enumerated as analysis subjects.
fn is_ignored_class(class_name: &str) -> bool {
    class_name == "module-info"
        || class_name == "package-info"
        || class_name.ends_with("/package-info")
        || class_name.ends_with("/module-info")
}

/// A directory tree of class files (`<dir>/pkg/Name.class`).
#[derive(Debug)]
pub struct DirectoryRoot {
    dir: PathBuf,
}

impl DirectoryRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ClassRoot for DirectoryRoot {
    fn display_name(&self) -> String {
        self.dir.display().to_string()
    }

    fn read_class(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(file_name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn enumerate(&self) -> Result<Vec<ClassReference>> {
        // WalkDir does not guarantee ordering; sort for determinism.
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension() != Some(OsStr::new("class")) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.dir)
                .unwrap_or_else(|_| entry.path());
            let file_name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let reference = ClassReference::from_file_name(file_name);
            if !is_ignored_class(&reference.class_name) {
                out.push(reference);
            }
        }
        out.sort();
        Ok(out)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Jar,
    /// JMODs place class files under a `classes/` prefix.
    Jmod,
}

/// A zip-backed root (jar or jmod).
pub struct ArchiveRoot {
    path: PathBuf,
    kind: ArchiveKind,
    archive: Mutex<Option<ZipArchive<File>>>,
}

impl ArchiveRoot {
    pub fn open(path: impl Into<PathBuf>, kind: ArchiveKind) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            path,
            kind,
            archive: Mutex::new(Some(archive)),
        })
    }

    fn entry_name(&self, file_name: &str) -> String {
        match self.kind {
            ArchiveKind::Jar => file_name.to_string(),
            ArchiveKind::Jmod => format!("classes/{file_name}"),
        }
    }
}

impl ClassRoot for ArchiveRoot {
    fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_class(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let mut guard = self.archive.lock();
        let archive = guard
            .as_mut()
            .ok_or_else(|| CoreError::precondition("archive root already closed"))?;
        let result = match archive.by_name(&self.entry_name(file_name)) {
            Ok(mut entry) => {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        };
        result
    }

    fn enumerate(&self) -> Result<Vec<ClassReference>> {
        let mut guard = self.archive.lock();
        let archive = guard
            .as_mut()
            .ok_or_else(|| CoreError::precondition("archive root already closed"))?;
        let mut out = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if !entry.is_file() {
                continue;
            }
            let name = entry.name().to_owned();
            if !name.ends_with(".class") {
                continue;
            }
            let file_name = match self.kind {
                ArchiveKind::Jar => {
                    // Multi-release variants are not analysis subjects.
                    if name.starts_with("META-INF/") {
                        continue;
                    }
                    name
                }
                ArchiveKind::Jmod => match name.strip_prefix("classes/") {
                    Some(rest) => rest.to_string(),
                    None => continue,
                },
            };
            let reference = ClassReference::from_file_name(file_name);
            if !is_ignored_class(&reference.class_name) {
                out.push(reference);
            }
        }
        out.sort();
        Ok(out)
    }

    fn close(&self) -> Result<()> {
        *self.archive.lock() = None;
        Ok(())
    }
}

impl std::fmt::Debug for ArchiveRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRoot")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The host runtime's module image: every module of the JDK under
/// `$JAVA_HOME`, readable by resource path.
///
/// Modern JDKs ship packaged modules under `jmods/`; some distributions only
/// ship an exploded `modules/` tree, which is handled as a fallback.
pub struct JdkImageRoot {
    java_home: PathBuf,
    modules: BTreeMap<String, Box<dyn ClassRoot>>,
}

impl JdkImageRoot {
    pub fn from_java_home(java_home: impl Into<PathBuf>) -> Result<Self> {
        let java_home = java_home.into();
        let mut modules: BTreeMap<String, Box<dyn ClassRoot>> = BTreeMap::new();

        let jmods = java_home.join("jmods");
        let exploded = java_home.join("modules");
        if jmods.is_dir() {
            for entry in std::fs::read_dir(&jmods)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension() != Some(OsStr::new("jmod")) {
                    continue;
                }
                let module = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                modules.insert(module, Box::new(ArchiveRoot::open(path, ArchiveKind::Jmod)?));
            }
        } else if exploded.is_dir() {
            for entry in std::fs::read_dir(&exploded)? {
                let entry = entry?;
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let module = path
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                modules.insert(module, Box::new(DirectoryRoot::new(path)));
            }
        } else {
            return Err(CoreError::precondition(format!(
                "no `jmods/` or `modules/` under {}",
                java_home.display()
            )));
        }

        Ok(Self { java_home, modules })
    }

    /// Build from the `JAVA_HOME` environment variable.
    pub fn from_env() -> Result<Self> {
        let java_home = std::env::var_os("JAVA_HOME")
            .ok_or_else(|| CoreError::precondition("JAVA_HOME is not set"))?;
        Self::from_java_home(PathBuf::from(java_home))
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl ClassRoot for JdkImageRoot {
    fn display_name(&self) -> String {
        format!("jdk:{}", self.java_home.display())
    }

    fn read_class(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        for root in self.modules.values() {
            if let Some(bytes) = root.read_class(file_name)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    fn enumerate(&self) -> Result<Vec<ClassReference>> {
        let mut out = Vec::new();
        for root in self.modules.values() {
            out.extend(root.enumerate()?);
        }
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn close(&self) -> Result<()> {
        let failures: Vec<CoreError> = self
            .modules
            .values()
            .filter_map(|root| root.close().err())
            .collect();
        CoreError::aggregate_close(failures)
    }
}

impl std::fmt::Debug for JdkImageRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdkImageRoot")
            .field("java_home", &self.java_home)
            .field("modules", &self.modules.len())
            .finish()
    }
}

/// Path-based root selection: directories become [`DirectoryRoot`]s, `.jmod`
/// files jmod archives, everything else a jar-layout archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSpec {
    Directory(PathBuf),
    Jar(PathBuf),
    Jmod(PathBuf),
}

impl RootSpec {
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            RootSpec::Directory(path)
        } else if path.extension() == Some(OsStr::new("jmod")) {
            RootSpec::Jmod(path)
        } else {
            RootSpec::Jar(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            RootSpec::Directory(p) | RootSpec::Jar(p) | RootSpec::Jmod(p) => p,
        }
    }

    pub fn open(&self) -> Result<Box<dyn ClassRoot>> {
        Ok(match self {
            RootSpec::Directory(p) => Box::new(DirectoryRoot::new(p.clone())),
            RootSpec::Jar(p) => Box::new(ArchiveRoot::open(p.clone(), ArchiveKind::Jar)?),
            RootSpec::Jmod(p) => Box::new(ArchiveRoot::open(p.clone(), ArchiveKind::Jmod)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_class(dir: &Path, file_name: &str, bytes: &[u8]) {
        let path = dir.join(file_name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn directory_root_reads_and_enumerates() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "pkg/Name.class", b"pkg/Name");
        write_class(dir.path(), "pkg/inner/Other.class", b"pkg/inner/Other");
        write_class(dir.path(), "module-info.class", b"module-info");
        write_class(dir.path(), "notes.txt", b"not a class");

        let root = DirectoryRoot::new(dir.path());
        assert_eq!(
            root.read_class("pkg/Name.class").unwrap(),
            Some(b"pkg/Name".to_vec())
        );
        assert_eq!(root.read_class("pkg/Missing.class").unwrap(), None);

        let classes = root.enumerate().unwrap();
        assert_eq!(
            classes.iter().map(|c| c.class_name.as_str()).collect::<Vec<_>>(),
            vec!["pkg/Name", "pkg/inner/Other"]
        );
    }

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn jar_root_skips_meta_inf_variants() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_archive(
            &jar,
            &[
                ("pkg/Name.class", b"pkg/Name".as_slice()),
                ("META-INF/versions/9/pkg/Name.class", b"v9".as_slice()),
                ("module-info.class", b"module-info".as_slice()),
            ],
        );

        let root = ArchiveRoot::open(&jar, ArchiveKind::Jar).unwrap();
        let classes = root.enumerate().unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].class_name, "pkg/Name");
        assert_eq!(
            root.read_class("pkg/Name.class").unwrap(),
            Some(b"pkg/Name".to_vec())
        );

        root.close().unwrap();
        assert!(root.read_class("pkg/Name.class").is_err());
    }

    #[test]
    fn jmod_root_strips_classes_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let jmod = dir.path().join("java.base.jmod");
        write_archive(
            &jmod,
            &[
                ("classes/java/lang/Object.class", b"java/lang/Object".as_slice()),
                ("classes/module-info.class", b"module-info".as_slice()),
                ("conf/security.policy", b"".as_slice()),
            ],
        );

        let root = ArchiveRoot::open(&jmod, ArchiveKind::Jmod).unwrap();
        let classes = root.enumerate().unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].class_name, "java/lang/Object");
        assert_eq!(
            root.read_class("java/lang/Object.class").unwrap(),
            Some(b"java/lang/Object".to_vec())
        );
    }

    #[test]
    fn jdk_image_root_enumerates_modules() {
        let home = tempfile::tempdir().unwrap();
        let jmods = home.path().join("jmods");
        std::fs::create_dir_all(&jmods).unwrap();
        write_archive(
            &jmods.join("java.base.jmod"),
            &[("classes/java/lang/Object.class", b"java/lang/Object".as_slice())],
        );
        write_archive(
            &jmods.join("java.sql.jmod"),
            &[("classes/java/sql/Driver.class", b"java/sql/Driver".as_slice())],
        );

        let root = JdkImageRoot::from_java_home(home.path()).unwrap();
        assert_eq!(
            root.module_names().collect::<Vec<_>>(),
            vec!["java.base", "java.sql"]
        );
        let classes = root.enumerate().unwrap();
        assert_eq!(classes.len(), 2);
        assert!(root
            .read_class("java/sql/Driver.class")
            .unwrap()
            .is_some());
    }

    #[test]
    fn root_spec_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RootSpec::detect(dir.path()),
            RootSpec::Directory(_)
        ));
        assert!(matches!(
            RootSpec::detect(dir.path().join("a.jmod")),
            RootSpec::Jmod(_)
        ));
        assert!(matches!(
            RootSpec::detect(dir.path().join("a.jar")),
            RootSpec::Jar(_)
        ));
    }
}
