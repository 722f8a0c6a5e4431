//! Plugin options described by JSON manifests on disk.
//!
//! A namespace `a.b` maps to the directory `<root>/a/b/`. Every `*.json`
//! file there is an [`OptionManifest`]; its options are offered to commands
//! that list the namespace, in file-name order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use optloom::{Error, OptionFactory, OptionRegistry, OptionSpec, factory, value};
use optloom_metadata::{OPTION_MANIFEST_FORMAT_VERSION, OptionManifest, OptionMeta};

/// Build a parser option from its serialized description.
pub fn option_from_meta(meta: &OptionMeta) -> optloom::Result<OptionSpec> {
    let mut builder = OptionSpec::builder()
        .short_circuit(meta.short_circuit)
        .help(meta.help.clone());
    if let Some(short) = &meta.short {
        builder = builder.short(short.clone());
    }
    if let Some(long) = &meta.long {
        builder = builder.long(long.clone());
    }
    if let Some(dest) = &meta.dest {
        builder = builder.dest(dest.clone());
    }
    if let Some(nargs) = &meta.nargs {
        builder = builder.arity(nargs.parse()?);
    }
    if let Some(action) = &meta.action {
        builder = builder.action(action.parse()?);
    }
    if let Some(name) = &meta.value_type {
        let coerce = value::by_name(name)
            .ok_or_else(|| Error::Declaration(format!("unknown value type {name:?}")))?;
        builder = builder.coerce(coerce);
    }
    if let Some(default) = &meta.default {
        builder = builder.default_value(default.clone());
    }
    if let Some(constant) = &meta.constant {
        builder = builder.constant(constant.clone());
    }
    builder.build()
}

/// Option registry backed by a directory tree of option manifests.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> anyhow::Result<PathBuf> {
        if !is_valid_namespace(namespace) {
            bail!("invalid namespace '{namespace}'");
        }
        Ok(namespace
            .split('.')
            .fold(self.root.clone(), |dir, segment| dir.join(segment)))
    }

    fn read_metas(&self, namespace: &str) -> anyhow::Result<Vec<OptionMeta>> {
        let dir = self.namespace_dir(namespace)?;
        if !dir.is_dir() {
            tracing::debug!(namespace, dir = %dir.display(), "namespace directory not found");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to read namespace directory: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut metas = Vec::new();
        for path in files {
            let manifest = read_manifest(&path)?;
            tracing::debug!(
                namespace,
                path = %path.display(),
                options = manifest.options.len(),
                "loaded option manifest"
            );
            metas.extend(manifest.options);
        }
        Ok(metas)
    }
}

fn read_manifest(path: &Path) -> anyhow::Result<OptionManifest> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read option manifest: {}", path.display()))?;
    let manifest: OptionManifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse option manifest: {}", path.display()))?;
    if manifest.format_version != OPTION_MANIFEST_FORMAT_VERSION {
        bail!(
            "unsupported option manifest format-version {} in {} (expected {})",
            manifest.format_version,
            path.display(),
            OPTION_MANIFEST_FORMAT_VERSION
        );
    }
    Ok(manifest)
}

impl OptionRegistry for DirectoryRegistry {
    fn load(&self, namespace: &str) -> optloom::Result<Vec<OptionFactory>> {
        let metas = self
            .read_metas(namespace)
            .map_err(|e| Error::Registry(format!("{e:#}")))?;
        Ok(metas
            .into_iter()
            .map(|meta| factory(move || option_from_meta(&meta)))
            .collect())
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use optloom::{Action, Arity, DefaultValue};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before UNIX_EPOCH")
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("optloom-plugins-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    fn meta(value: serde_json::Value) -> OptionMeta {
        serde_json::from_value(value).expect("valid option meta")
    }

    #[test]
    fn converts_every_field() {
        let spec = option_from_meta(&meta(json!({
            "short": "-l",
            "long": "--level",
            "nargs": "2",
            "action": "append",
            "type": "int",
            "default": [0],
            "help": "Levels.",
        })))
        .unwrap();
        assert_eq!(spec.short(), Some("-l"));
        assert_eq!(spec.dest(), Some("level"));
        assert_eq!(spec.arity(), Arity::Exactly(2));
        assert_eq!(spec.action(), Action::Append);
        assert_eq!(spec.coerce().name(), "int");
        assert!(matches!(spec.default_value(), DefaultValue::Value(v) if *v == json!([0])));
        assert_eq!(spec.help(), "Levels.");
    }

    #[test]
    fn bad_metadata_is_a_declaration_error() {
        for bad in [
            json!({"long": "--x", "type": "complex"}),
            json!({"long": "--x", "action": "count"}),
            json!({"long": "--x", "nargs": "+"}),
            json!({"long": "x"}),
            json!({"help": "positional without dest"}),
        ] {
            let err = option_from_meta(&meta(bad.clone())).unwrap_err();
            assert!(matches!(err, Error::Declaration(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn loads_manifests_in_file_name_order() {
        let root = make_temp_dir("order");
        let dir = root.join("app").join("logging");
        fs::create_dir_all(&dir).unwrap();
        let write = |name: &str, long: &str| {
            let manifest = OptionManifest::new(vec![meta(json!({"long": long}))]);
            fs::write(dir.join(name), manifest.to_json_bytes()).unwrap();
        };
        write("b.json", "--second");
        write("a.json", "--first");
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let registry = DirectoryRegistry::new(&root);
        let names: Vec<_> = registry
            .load("app.logging")
            .unwrap()
            .iter()
            .map(|f| f().unwrap().spec().to_string())
            .collect();
        assert_eq!(names, ["--first", "--second"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_namespace_is_empty() {
        let root = make_temp_dir("missing");
        let registry = DirectoryRegistry::new(&root);
        assert!(registry.load("nothing.here").unwrap().is_empty());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let registry = DirectoryRegistry::new("/nonexistent");
        for ns in ["", "a..b", "App", "../up", "a/b"] {
            match registry.load(ns) {
                Err(Error::Registry(msg)) => assert!(msg.contains("invalid namespace"), "{msg}"),
                Err(other) => panic!("{ns}: expected Registry, got: {other:?}"),
                Ok(_) => panic!("{ns}: expected Registry error"),
            }
        }
    }

    #[test]
    fn unparsable_manifest_is_a_registry_error() {
        let root = make_temp_dir("broken");
        let dir = root.join("app");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.json"), "{ not json").unwrap();
        fs::write(
            root.join("app").join("old.json"),
            r#"{"format-version": 9, "options": []}"#,
        )
        .unwrap();

        match DirectoryRegistry::new(&root).load("app") {
            Err(Error::Registry(msg)) => assert!(msg.contains("bad.json"), "{msg}"),
            Err(other) => panic!("expected Registry, got: {other:?}"),
            Ok(_) => panic!("expected Registry error"),
        }
        fs::remove_file(dir.join("bad.json")).unwrap();
        match DirectoryRegistry::new(&root).load("app") {
            Err(Error::Registry(msg)) => assert!(msg.contains("format-version 9"), "{msg}"),
            Err(other) => panic!("expected Registry, got: {other:?}"),
            Ok(_) => panic!("expected Registry error"),
        }
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn invalid_option_fails_at_instantiation() {
        let root = make_temp_dir("late");
        let dir = root.join("app");
        fs::create_dir_all(&dir).unwrap();
        let manifest = OptionManifest::new(vec![meta(json!({"long": "--x", "type": "nope"}))]);
        fs::write(dir.join("x.json"), manifest.to_json_bytes()).unwrap();

        let factories = DirectoryRegistry::new(&root).load("app").unwrap();
        assert_eq!(factories.len(), 1);
        assert!(matches!(factories[0](), Err(Error::Declaration(_))));
        let _ = fs::remove_dir_all(&root);
    }
}
