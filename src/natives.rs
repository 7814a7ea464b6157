//! Host primitives exposed into script scope.
//!
//! Two globals are installed before any script code runs: `fs` (directory
//! listing, existence checks, path joining/splitting) and `env`
//! (environment get/set). Composite results are built as [`Value`]s and
//! cross the boundary through the marshaller like everything else.

use std::path::{Path, PathBuf};

use mlua::{Lua, Variadic};

use crate::script::{register_module, value_to_lua};
use crate::value::{IntoValue, Key, Value};

/// Register the `fs` and `env` modules on a fresh interpreter.
///
/// # Errors
///
/// Propagates interpreter allocation failures.
pub fn register_all(lua: &Lua) -> mlua::Result<()> {
    register_module(
        lua,
        "fs",
        vec![
            ("list", lua.create_function(fs_list)?),
            ("exists", lua.create_function(fs_exists)?),
            ("join", lua.create_function(fs_join)?),
            ("split", lua.create_function(fs_split)?),
        ],
    )?;
    register_module(
        lua,
        "env",
        vec![
            ("get", lua.create_function(env_get)?),
            ("set", lua.create_function(env_set)?),
        ],
    )
}

/// `fs.list(dir)` → sorted sequence of entry names.
fn fs_list(lua: &Lua, dir: String) -> mlua::Result<mlua::Value> {
    let entries = std::fs::read_dir(&dir).map_err(mlua::Error::external)?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    value_to_lua(lua, &names.into_value())
}

/// `fs.exists(path)` → bool.
fn fs_exists(_lua: &Lua, path: String) -> mlua::Result<bool> {
    Ok(Path::new(&path).exists())
}

/// `fs.join(part, ...)` → joined path with `~` expanded to the home
/// directory.
fn fs_join(_lua: &Lua, parts: Variadic<String>) -> mlua::Result<String> {
    let mut joined = PathBuf::new();
    for part in parts.iter() {
        joined.push(part);
    }
    let joined = joined.to_string_lossy().to_string();
    Ok(shellexpand::tilde(&joined).to_string())
}

/// `fs.split(path)` → `{ dir, name, ext }`.
fn fs_split(lua: &Lua, path: String) -> mlua::Result<mlua::Value> {
    let path = Path::new(&path);
    let mut parts = std::collections::BTreeMap::new();
    parts.insert(
        Key::Str("dir".to_string()),
        Value::Str(path.parent().map_or_else(String::new, |p| {
            p.to_string_lossy().to_string()
        })),
    );
    parts.insert(
        Key::Str("name".to_string()),
        Value::Str(path.file_stem().map_or_else(String::new, |s| {
            s.to_string_lossy().to_string()
        })),
    );
    parts.insert(
        Key::Str("ext".to_string()),
        Value::Str(path.extension().map_or_else(String::new, |s| {
            s.to_string_lossy().to_string()
        })),
    );
    value_to_lua(lua, &Value::Map(parts))
}

/// `env.get(name)` → value or nil.
fn env_get(_lua: &Lua, name: String) -> mlua::Result<Option<String>> {
    Ok(std::env::var(&name).ok())
}

/// `env.set(name, value)`.
fn env_set(_lua: &Lua, (name, value): (String, String)) -> mlua::Result<()> {
    std::env::set_var(name, value);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::script::ScriptEngine;
    use crate::value::Value;
    use std::collections::BTreeMap;

    #[test]
    fn test_fs_exists_from_script() {
        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.probe = function(path) return fs.exists(path) end
            return M
            ",
        )
        .unwrap();
        let hit: Option<bool> = engine.call("probe", &[Value::Str("/".to_string())]);
        assert_eq!(hit, Some(true));
        let miss: Option<bool> =
            engine.call("probe", &[Value::Str("/definitely/not/here".to_string())]);
        assert_eq!(miss, Some(false));
    }

    #[test]
    fn test_fs_list_from_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();

        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.ls = function(dir) return fs.list(dir) end
            return M
            ",
        )
        .unwrap();
        let names: Option<Vec<String>> = engine.call(
            "ls",
            &[Value::Str(dir.path().to_string_lossy().to_string())],
        );
        assert_eq!(names, Some(vec!["a.txt".to_string(), "b.txt".to_string()]));
    }

    #[test]
    fn test_fs_join_expands_home() {
        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.join = function(a, b) return fs.join(a, b) end
            return M
            ",
        )
        .unwrap();
        let joined: Option<String> = engine.call(
            "join",
            &[Value::Str("~".to_string()), Value::Str("store".to_string())],
        );
        let joined = joined.unwrap();
        assert!(joined.ends_with("/store"));
        assert!(!joined.starts_with('~'));
    }

    #[test]
    fn test_fs_split_from_script() {
        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.split = function(path) return fs.split(path) end
            return M
            ",
        )
        .unwrap();
        let parts: Option<BTreeMap<String, String>> =
            engine.call("split", &[Value::Str("/tmp/store/sk.lua".to_string())]);
        let parts = parts.unwrap();
        assert_eq!(parts.get("dir").map(String::as_str), Some("/tmp/store"));
        assert_eq!(parts.get("name").map(String::as_str), Some("sk"));
        assert_eq!(parts.get("ext").map(String::as_str), Some("lua"));
    }

    #[test]
    fn test_env_round_trip_from_script() {
        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.roundtrip = function(name, value)
                env.set(name, value)
                return env.get(name)
            end
            return M
            ",
        )
        .unwrap();
        let echoed: Option<String> = engine.call(
            "roundtrip",
            &[
                Value::Str("SK_NATIVES_TEST".to_string()),
                Value::Str("42".to_string()),
            ],
        );
        assert_eq!(echoed, Some("42".to_string()));
    }

    #[test]
    fn test_env_get_missing_is_nil() {
        let engine = ScriptEngine::from_source(
            r"
            local M = {}
            M.probe = function(name) return env.get(name) == nil end
            return M
            ",
        )
        .unwrap();
        let is_nil: Option<bool> = engine.call(
            "probe",
            &[Value::Str("SK_NATIVES_TEST_UNSET_VAR".to_string())],
        );
        assert_eq!(is_nil, Some(true));
    }
}
