//! Embedded Lua engine.
//!
//! Owns exactly one interpreter for the process lifetime; the interpreter
//! is torn down by `Drop` on every exit path. The loaded script must return
//! a module table whose fields are the exported subcommand handlers; calls
//! cross the boundary through the [`Value`](crate::value::Value) model in
//! both directions.

use std::collections::BTreeMap;
use std::path::Path;

use mlua::{Lua, MultiValue, Table};
use tracing::error;

use crate::errors::{Error, Result};
use crate::natives;
use crate::value::{FromValue, Key, Value, ValueError};

pub struct ScriptEngine {
    lua: Lua,
    module: Table,
}

impl ScriptEngine {
    /// Load a script file. The store directory is appended to
    /// `package.path` so scripts can `require` sibling modules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read and
    /// [`Error::Lua`] when top-level execution fails or the script does not
    /// return a module table.
    pub fn load_file(path: &Path) -> Result<ScriptEngine> {
        let lua = new_interpreter()?;

        if let Some(dir) = path.parent() {
            let patch = format!(
                "package.path = package.path .. ';{0}/?.lua;{0}/?/init.lua'",
                dir.display()
            );
            lua.load(patch).exec()?;
        }

        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;

        ScriptEngine::eval_module(lua, &source, &path.display().to_string())
    }

    /// Load a script from an in-memory string (tests and embedding).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ScriptEngine::load_file`], minus file I/O.
    pub fn from_source(source: &str) -> Result<ScriptEngine> {
        ScriptEngine::eval_module(new_interpreter()?, source, "chunk")
    }

    fn eval_module(lua: Lua, source: &str, name: &str) -> Result<ScriptEngine> {
        let module: Table = lua.load(source).set_name(format!("@{name}")).eval()?;
        Ok(ScriptEngine { lua, module })
    }

    /// The module's `doc` field, if the script declares one.
    #[must_use]
    pub fn doc_string(&self) -> Option<String> {
        match self.module.get::<mlua::Value>("doc") {
            Ok(mlua::Value::String(s)) => Some(s.to_string_lossy().to_string()),
            _ => None,
        }
    }

    /// Whether the module exports a function under `name`.
    #[must_use]
    pub fn exports(&self, name: &str) -> bool {
        matches!(
            self.module.get::<mlua::Value>(name),
            Ok(mlua::Value::Function(_))
        )
    }

    /// Call an exported function with marshalled arguments.
    ///
    /// Returns `None` (after logging a diagnostic) when the function does
    /// not exist, when it raises, or when its result does not convert into
    /// `T`. The caller decides whether "no result" is fatal.
    pub fn call<T: FromValue>(&self, name: &str, args: &[Value]) -> Option<T> {
        let field = match self.module.get::<mlua::Value>(name) {
            Ok(field) => field,
            Err(e) => {
                error!("lua: {e}");
                return None;
            }
        };

        let mlua::Value::Function(func) = field else {
            error!("lua: no member function: {name}");
            return None;
        };

        let lua_args = match args
            .iter()
            .map(|arg| value_to_lua(&self.lua, arg))
            .collect::<mlua::Result<MultiValue>>()
        {
            Ok(lua_args) => lua_args,
            Err(e) => {
                error!("lua: {e}");
                return None;
            }
        };

        let result: mlua::Value = match func.call(lua_args) {
            Ok(result) => result,
            Err(e) => {
                error!("lua: {e}");
                return None;
            }
        };

        match lua_to_value(&result).and_then(|value| T::from_value(&value)) {
            Ok(converted) => Some(converted),
            Err(e) => {
                error!("lua: {e}");
                None
            }
        }
    }
}

fn new_interpreter() -> Result<Lua> {
    let lua = Lua::new();
    natives::register_all(&lua)?;
    Ok(lua)
}

/// Install a locally constructed name→function table as a global module.
///
/// # Errors
///
/// Propagates interpreter allocation failures.
pub fn register_module(lua: &Lua, name: &str, entries: Vec<(&str, mlua::Function)>) -> mlua::Result<()> {
    let table = lua.create_table()?;
    for (key, func) in entries {
        table.set(key, func)?;
    }
    lua.globals().set(name, table)
}

/// Render a host value as a Lua value. Sequences become 1-based
/// integer-keyed tables, the only sequence shape Lua has.
pub(crate) fn value_to_lua(lua: &Lua, value: &Value) -> mlua::Result<mlua::Value> {
    match value {
        Value::Bool(b) => Ok(mlua::Value::Boolean(*b)),
        Value::Integer(i) => Ok(mlua::Value::Integer(*i)),
        Value::Float(f) => Ok(mlua::Value::Number(*f)),
        Value::Str(s) => Ok(mlua::Value::String(lua.create_string(s)?)),
        Value::Seq(items) => {
            let table = lua.create_table()?;
            for (index, item) in items.iter().enumerate() {
                table.set(index as i64 + 1, value_to_lua(lua, item)?)?;
            }
            Ok(mlua::Value::Table(table))
        }
        Value::Map(map) => {
            let table = lua.create_table()?;
            for (key, item) in map {
                match key {
                    Key::Integer(i) => table.set(*i, value_to_lua(lua, item)?)?,
                    Key::Str(s) => table.set(s.as_str(), value_to_lua(lua, item)?)?,
                }
            }
            Ok(mlua::Value::Table(table))
        }
    }
}

/// Read a Lua value back into the value model. Tables come back as
/// mappings; integer-keyed mappings are accepted by sequence targets during
/// unmarshalling.
pub(crate) fn lua_to_value(value: &mlua::Value) -> std::result::Result<Value, ValueError> {
    match value {
        mlua::Value::Boolean(b) => Ok(Value::Bool(*b)),
        mlua::Value::Integer(i) => Ok(Value::Integer(*i)),
        mlua::Value::Number(f) => Ok(Value::Float(*f)),
        mlua::Value::String(s) => Ok(Value::Str(s.to_string_lossy().to_string())),
        mlua::Value::Table(table) => {
            let mut map = BTreeMap::new();
            for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
                let (key, item) = pair.map_err(|e| ValueError::Unsupported(e.to_string()))?;
                let key = match key {
                    mlua::Value::Integer(i) => Key::Integer(i),
                    mlua::Value::String(s) => Key::Str(s.to_string_lossy().to_string()),
                    other => {
                        return Err(ValueError::Unsupported(format!(
                            "table key of type {}",
                            other.type_name()
                        )))
                    }
                };
                map.insert(key, lua_to_value(&item)?);
            }
            Ok(Value::Map(map))
        }
        other => Err(ValueError::Unsupported(other.type_name().to_string())),
    }
}
