//! erlang.mk Makefile dialect
//!
//! Extracts `DEPS` (space-separated names) with per-dep `dep_<name>`
//! variables holding `<name> <url> <tag>`, the `PROJECT_VERSION`, and
//! compiler flags from `ERLC_OPTS`. `$(VAR)` and `$VAR` references are
//! resolved against the parsed variable table.
//!
//! Flag extraction has two code paths on purpose: the structured variable
//! table first, then a manual line scan for `ERLC_OPTS` when the table
//! lacks the key (`+=` accumulation lines never make it into the table).

use crate::error::{ErmineError, ErmineResult};
use crate::package::config::{BuildVar, Compiler, Dep, PackageConfig};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Parse a source tree's Makefile into a normalized config
pub fn parse(dir: &Path, default_name: &str) -> ErmineResult<PackageConfig> {
    let makefile = dir.join("Makefile");
    let content = std::fs::read_to_string(&makefile)
        .map_err(|e| ErmineError::io(format!("reading {}", makefile.display()), e))?;

    let table = parse_variable_table(&content);
    let mut config = PackageConfig::with_defaults(default_name, Compiler::ErlangMk);

    config.app_vsn = table.get("PROJECT_VERSION").cloned();
    config.deps = parse_deps(&table)?;
    config.build_vars = parse_erlc_opts(&content, &table)?;

    Ok(config)
}

/// Parse plain `VAR = value` assignments (also `:=` and `?=`) into a
/// variable table. `+=` lines are deliberately left out; they are only
/// reachable through the manual scan fallback.
fn parse_variable_table(content: &str) -> HashMap<String, String> {
    let mut table = HashMap::new();

    for line in content.lines() {
        let line = line.trim_end();
        if line.starts_with('\t') || line.trim_start().starts_with('#') {
            continue;
        }
        let Some(eq) = line.find('=') else { continue };
        if eq == 0 {
            continue;
        }

        let (raw_name, raw_value) = line.split_at(eq);
        let name = raw_name.trim_end_matches([':', '?']).trim();
        if name.is_empty() || name.ends_with('+') || name.contains(char::is_whitespace) {
            continue;
        }

        let value = raw_value[1..].trim().to_string();
        table.insert(name.to_string(), value);
    }

    table
}

/// `DEPS = cowboy lager` plus `dep_cowboy = cowboy <url> <tag>` per dep
fn parse_deps(table: &HashMap<String, String>) -> ErmineResult<Vec<Dep>> {
    let Some(declared) = table.get("DEPS") else {
        return Ok(Vec::new());
    };

    let mut deps = Vec::new();
    for name in declared.split_whitespace() {
        let var = format!("dep_{}", name);
        let Some(spec) = table.get(&var) else {
            warn!("Dep {} not specified", var);
            continue;
        };

        let fields: Vec<&str> = spec.split_whitespace().collect();
        let [dep_name, url, tag] = fields.as_slice() else {
            return Err(ErmineError::config(
                "Makefile",
                format!("malformed {}: expected '<name> <url> <tag>', got '{}'", var, spec),
            ));
        };

        let dep = Dep::vcs(*dep_name, *url, Some((*tag).to_string()), None)
            .expect("tag is always present here");
        deps.push(dep);
    }

    Ok(deps)
}

/// Extract `-D` build vars from ERLC_OPTS. Structured table first, manual
/// line scan as the fallback when the table lacks the key.
fn parse_erlc_opts(
    content: &str,
    table: &HashMap<String, String>,
) -> ErmineResult<Vec<BuildVar>> {
    if let Some(opts) = table.get("ERLC_OPTS") {
        let args: Vec<&str> = opts.split_whitespace().collect();
        return erl_opts_to_vars(&args, table);
    }

    // Manual scan: first ERLC_OPTS line, tokens after the name and operator
    for line in content.lines() {
        if line.starts_with("ERLC_OPTS") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let args = if tokens.len() > 2 { &tokens[2..] } else { &[][..] };
            return erl_opts_to_vars(args, table);
        }
    }

    Ok(Vec::new())
}

/// Turn `-D` arguments into build vars, resolving variable references
fn erl_opts_to_vars(
    args: &[&str],
    table: &HashMap<String, String>,
) -> ErmineResult<Vec<BuildVar>> {
    let mut vars = Vec::new();

    for arg in args {
        let Some(var) = arg.strip_prefix("-D") else {
            continue;
        };

        match var.split_once('=') {
            Some((k, v)) => {
                let k = resolve_var(k, table)?;
                let v = resolve_var(v, table)?;
                vars.push(BuildVar::KeyValue(k, v));
            }
            None => vars.push(BuildVar::Flag(resolve_var(var, table)?)),
        }
    }

    Ok(vars)
}

/// Resolve `$(NAME)` and `$NAME` against the variable table. A reference
/// to a variable the table does not hold is a fatal config error.
fn resolve_var(var: &str, table: &HashMap<String, String>) -> ErmineResult<String> {
    let Some(reference) = var.strip_prefix('$') else {
        return Ok(var.to_string());
    };

    let name = reference
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(reference);

    table
        .get(name)
        .cloned()
        .ok_or_else(|| ErmineError::UnresolvedVar(name.to_string()))
}
