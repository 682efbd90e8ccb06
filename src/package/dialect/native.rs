//! Native `ermine.json` dialect
//!
//! A structured JSON document. Dependency entries without an explicit
//! `url` are resolved by name+tag against the public package index.

use crate::actions;
use crate::error::{ErmineError, ErmineResult};
use crate::package::config::{BuildVar, Compiler, Dep, PackageConfig};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Parse an `ermine.json` document into a normalized config
pub fn parse(content: &str, default_name: &str) -> ErmineResult<PackageConfig> {
    let doc: Value = serde_json::from_str(content).map_err(|e| {
        ErmineError::config(PathBuf::from("ermine.json"), format!("invalid JSON: {}", e))
    })?;
    let obj = doc.as_object().ok_or_else(|| {
        ErmineError::config(PathBuf::from("ermine.json"), "document is not an object")
    })?;

    let name = str_key(obj, "name").unwrap_or_else(|| default_name.to_string());
    let compiler = match str_key(obj, "compiler").as_deref() {
        Some("erlang.mk") | Some("erlang_mk") => Compiler::ErlangMk,
        _ => Compiler::Erlc,
    };
    let mut config = PackageConfig::with_defaults(name, compiler);

    config.fullname = str_key(obj, "fullname");
    config.app_vsn = str_key(obj, "app_vsn");
    config.tag = str_key(obj, "tag");
    config.branch = str_key(obj, "branch");
    config.url = str_key(obj, "url");

    config.drop_unknown_deps = bool_key(obj, "drop_unknown_deps", config.drop_unknown_deps);
    config.with_source = bool_key(obj, "with_source", config.with_source);
    config.link_all = bool_key(obj, "link_all", config.link_all);
    config.rescan_deps = bool_key(obj, "rescan_deps", config.rescan_deps);
    config.auto_build_order = bool_key(obj, "auto_build_order", config.auto_build_order);
    config.override_conf = bool_key(obj, "override", config.override_conf);
    config.disable_prebuild = bool_key(obj, "disable_prebuild", config.disable_prebuild);
    config.compare_versions = bool_key(obj, "compare_versions", config.compare_versions);

    config.erlang_versions = string_list(obj, "erlang");
    config.build_vars = parse_build_vars(obj.get("build_vars"))?;
    config.c_build_vars = parse_build_vars(obj.get("c_build_vars"))?;
    config.deps = parse_deps(obj.get("deps"))?;
    config.test_deps = parse_deps(obj.get("test_deps"))?;

    config.prebuild = parse_phase(obj.get("prebuild"))?;
    config.install = parse_phase(obj.get("install"))?;
    config.uninstall = parse_phase(obj.get("uninstall"))?;

    Ok(config)
}

/// Export a normalized config back into the native document shape.
///
/// `parse(export(c))` reproduces `c` field-for-field; this is what gets
/// embedded at the root of a package archive.
pub fn export(config: &PackageConfig) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(config.name));
    if config.compiler == Compiler::ErlangMk {
        obj.insert("compiler".into(), json!("erlang.mk"));
    }

    for (key, value) in [
        ("fullname", &config.fullname),
        ("app_vsn", &config.app_vsn),
        ("tag", &config.tag),
        ("branch", &config.branch),
        ("url", &config.url),
    ] {
        if let Some(v) = value {
            obj.insert(key.into(), json!(v));
        }
    }

    obj.insert("drop_unknown_deps".into(), json!(config.drop_unknown_deps));
    obj.insert("with_source".into(), json!(config.with_source));
    obj.insert("link_all".into(), json!(config.link_all));
    obj.insert("rescan_deps".into(), json!(config.rescan_deps));
    obj.insert("auto_build_order".into(), json!(config.auto_build_order));
    obj.insert("override".into(), json!(config.override_conf));
    obj.insert("disable_prebuild".into(), json!(config.disable_prebuild));
    obj.insert("compare_versions".into(), json!(config.compare_versions));

    if !config.erlang_versions.is_empty() {
        obj.insert("erlang".into(), json!(config.erlang_versions));
    }
    if !config.build_vars.is_empty() {
        obj.insert("build_vars".into(), export_build_vars(&config.build_vars));
    }
    if !config.c_build_vars.is_empty() {
        obj.insert(
            "c_build_vars".into(),
            export_build_vars(&config.c_build_vars),
        );
    }
    if !config.deps.is_empty() {
        obj.insert("deps".into(), export_deps(&config.deps));
    }
    if !config.test_deps.is_empty() {
        obj.insert("test_deps".into(), export_deps(&config.test_deps));
    }

    for (key, steps) in [
        ("prebuild", &config.prebuild),
        ("install", &config.install),
        ("uninstall", &config.uninstall),
    ] {
        if !steps.is_empty() {
            let exported: Vec<Value> = steps.iter().map(|a| a.export()).collect();
            obj.insert(key.into(), Value::Array(exported));
        }
    }

    Value::Object(obj)
}

fn str_key(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

fn bool_key(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Build vars are a flat list of bare flags (`"BAZ"`) and single-key
/// objects (`{"FOO": "qux"}`).
fn parse_build_vars(value: Option<&Value>) -> ErmineResult<Vec<BuildVar>> {
    let Some(arr) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut vars = Vec::with_capacity(arr.len());
    for entry in arr {
        match entry {
            Value::String(flag) => vars.push(BuildVar::Flag(flag.clone())),
            Value::Object(obj) if obj.len() == 1 => {
                let (k, v) = obj.iter().next().expect("checked len above");
                let v = v.as_str().ok_or_else(|| {
                    ErmineError::config(
                        PathBuf::from("ermine.json"),
                        format!("build var {} value must be a string", k),
                    )
                })?;
                vars.push(BuildVar::KeyValue(k.clone(), v.to_string()));
            }
            other => {
                return Err(ErmineError::config(
                    PathBuf::from("ermine.json"),
                    format!("invalid build var entry: {}", other),
                ))
            }
        }
    }
    Ok(vars)
}

fn export_build_vars(vars: &[BuildVar]) -> Value {
    Value::Array(
        vars.iter()
            .map(|v| match v {
                BuildVar::Flag(k) => json!(k),
                BuildVar::KeyValue(k, v) => json!({ k: v }),
            })
            .collect(),
    )
}

/// Dep entries: `{name, url?, tag?, branch?}`. No `url` means resolve by
/// name+tag against the public index.
fn parse_deps(value: Option<&Value>) -> ErmineResult<Vec<Dep>> {
    let Some(arr) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut deps = Vec::with_capacity(arr.len());
    for entry in arr {
        let obj = entry.as_object().ok_or_else(|| {
            ErmineError::config(
                PathBuf::from("ermine.json"),
                format!("dep entry is not an object: {}", entry),
            )
        })?;
        let name = str_key(obj, "name").ok_or_else(|| {
            ErmineError::config(PathBuf::from("ermine.json"), "dep entry missing 'name'")
        })?;
        let tag = str_key(obj, "tag");
        let branch = str_key(obj, "branch");

        let dep = match str_key(obj, "url") {
            Some(url) => Dep::vcs(&name, url, tag, branch).ok_or_else(|| {
                ErmineError::config(
                    PathBuf::from("ermine.json"),
                    format!("dep {} needs a tag or branch", name),
                )
            })?,
            None => {
                let tag = tag.ok_or_else(|| {
                    ErmineError::config(
                        PathBuf::from("ermine.json"),
                        format!("index dep {} needs a tag", name),
                    )
                })?;
                Dep::index(&name, tag)
            }
        };
        deps.push(dep);
    }
    Ok(deps)
}

fn export_deps(deps: &[Dep]) -> Value {
    use crate::package::config::{DepSource, VersionSelector};

    Value::Array(
        deps.iter()
            .map(|dep| {
                let mut obj = Map::new();
                obj.insert("name".into(), json!(dep.name));
                if let DepSource::Vcs { url } = &dep.source {
                    obj.insert("url".into(), json!(url));
                }
                match &dep.selector {
                    VersionSelector::Tag(t) => obj.insert("tag".into(), json!(t)),
                    VersionSelector::Branch(b) => obj.insert("branch".into(), json!(b)),
                };
                Value::Object(obj)
            })
            .collect(),
    )
}

fn parse_phase(value: Option<&Value>) -> ErmineResult<Vec<actions::Action>> {
    let Some(arr) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    actions::parse_steps(arr)
}
