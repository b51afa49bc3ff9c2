//! Rhai-scripted predicates and formula templates.
//!
//! Predicates are Rhai expressions evaluated with the cell bound as `value`;
//! templates are expressions evaluated with the 1-based row bound as `row`.
//!
//! Conventions:
//! - Helper names are ALL CAPS (e.g. `LOWER`, `IS_EMPTY`), like spreadsheet built-ins.
//! - Numbers with no fractional part are bound as integers, everything else as floats.
//! - Formula cells are bound as their `=` text.
//! - Comparing mismatched types (text or an empty cell against a number) is
//!   `false`, not an error. Use `IS_NUMBER(value)` or `IS_EMPTY(value)` to tell
//!   such rows apart.

use std::sync::Arc;

use rhai::{AST, Dynamic, Engine, Scope};

use crate::engine::{CellValue, FormulaTemplate, Predicate, column_letters};
use crate::error::{EngineError, Result};

/// Create a Rhai engine with the copycull helpers registered.
pub fn create_engine() -> Engine {
    let mut engine = Engine::new();
    register_builtins(&mut engine);
    engine
}

fn register_builtins(engine: &mut Engine) {
    engine.register_fn("LOWER", |s: &str| -> String { s.to_lowercase() });
    engine.register_fn("UPPER", |s: &str| -> String { s.to_uppercase() });
    engine.register_fn("TRIM", |s: &str| -> String { s.trim().to_string() });
    engine.register_fn("CONTAINS", |s: &str, needle: &str| -> bool { s.contains(needle) });
    engine.register_fn("STARTS_WITH", |s: &str, prefix: &str| -> bool {
        s.starts_with(prefix)
    });
    engine.register_fn("IS_EMPTY", |v: Dynamic| -> bool {
        v.is_unit() || v.clone().into_string().is_ok_and(|s| s.is_empty())
    });
    engine.register_fn("IS_NUMBER", |v: Dynamic| -> bool {
        v.is::<i64>() || v.is::<f64>()
    });
    engine.register_fn("COL", |n: i64| -> String {
        u32::try_from(n).map(column_letters).unwrap_or_default()
    });
}

/// Convert a cell value into the Rhai value scripts see.
pub fn to_dynamic(value: &CellValue) -> Dynamic {
    match value {
        CellValue::Empty => Dynamic::UNIT,
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Dynamic::from(*n as i64)
        }
        CellValue::Number(n) => Dynamic::from(*n),
        CellValue::Text(s) => Dynamic::from(s.clone()),
        CellValue::Bool(b) => Dynamic::from(*b),
        CellValue::Formula(f) => Dynamic::from(format!("={}", f)),
    }
}

/// Boolean coercion of a script result: booleans as is, numbers when non-zero,
/// strings and arrays when non-empty, `()` as false, anything else as true.
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(n) = value.as_int() {
        return n != 0;
    }
    if let Ok(n) = value.as_float() {
        return n != 0.0;
    }
    if let Ok(s) = value.clone().into_string() {
        return !s.is_empty();
    }
    if let Ok(arr) = value.clone().into_array() {
        return !arr.is_empty();
    }
    true
}

fn compile(engine: &Engine, source: &str) -> Result<AST> {
    engine
        .compile_expression(source)
        .map_err(|e| EngineError::ScriptCompile(format!("{}: {}", source, e)))
}

/// A predicate written as a Rhai expression over `value`, e.g. `value >= 10`.
pub struct RhaiPredicate {
    engine: Arc<Engine>,
    ast: AST,
    source: String,
}

impl RhaiPredicate {
    /// Compile once; the same AST is evaluated for every row.
    pub fn compile(engine: Arc<Engine>, source: &str) -> Result<Self> {
        let ast = compile(&engine, source)?;
        Ok(RhaiPredicate {
            engine,
            ast,
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Predicate for RhaiPredicate {
    fn test(&self, value: &CellValue) -> std::result::Result<bool, String> {
        let mut scope = Scope::new();
        scope.push_dynamic("value", to_dynamic(value));
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map(|result| is_truthy(&result))
            .map_err(|e| e.to_string())
    }
}

/// A formula template written as a Rhai expression over `row`,
/// e.g. `"=C" + row + "*E" + row`.
pub struct RhaiTemplate {
    engine: Arc<Engine>,
    ast: AST,
}

impl RhaiTemplate {
    pub fn compile(engine: Arc<Engine>, source: &str) -> Result<Self> {
        let ast = compile(&engine, source)?;
        Ok(RhaiTemplate { engine, ast })
    }
}

impl FormulaTemplate for RhaiTemplate {
    fn render(&self, row: u32) -> std::result::Result<String, String> {
        let mut scope = Scope::new();
        scope.push("row", row as i64);
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|e| e.to_string())?;
        if result.is_unit() {
            return Err("template produced no value".to_string());
        }
        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<Engine> {
        Arc::new(create_engine())
    }

    #[test]
    fn test_predicate_compares_numbers() {
        let p = RhaiPredicate::compile(engine(), "value >= 10").unwrap();
        assert_eq!(p.test(&CellValue::Number(12.0)), Ok(true));
        assert_eq!(p.test(&CellValue::Number(9.5)), Ok(false));
        assert_eq!(p.test(&CellValue::Number(10.0)), Ok(true));
    }

    #[test]
    fn test_predicate_on_text_and_helpers() {
        let p = RhaiPredicate::compile(engine(), r#"LOWER(value) == "widgets""#).unwrap();
        assert_eq!(p.test(&CellValue::Text("Widgets".into())), Ok(true));

        let empty = RhaiPredicate::compile(engine(), "IS_EMPTY(value)").unwrap();
        assert_eq!(empty.test(&CellValue::Empty), Ok(true));
        assert_eq!(empty.test(&CellValue::Text(String::new())), Ok(true));
        assert_eq!(empty.test(&CellValue::Number(0.0)), Ok(false));
    }

    #[test]
    fn test_predicate_result_is_coerced() {
        let p = RhaiPredicate::compile(engine(), "value").unwrap();
        assert_eq!(p.test(&CellValue::Number(0.0)), Ok(false));
        assert_eq!(p.test(&CellValue::Number(3.0)), Ok(true));
        assert_eq!(p.test(&CellValue::Text(String::new())), Ok(false));
        assert_eq!(p.test(&CellValue::Text("x".into())), Ok(true));
        assert_eq!(p.test(&CellValue::Empty), Ok(false));
        assert_eq!(p.test(&CellValue::Bool(true)), Ok(true));
    }

    #[test]
    fn test_predicate_runtime_error_is_reported() {
        let p = RhaiPredicate::compile(engine(), "NO_SUCH_HELPER(value)").unwrap();
        assert!(p.test(&CellValue::Number(1.0)).is_err());

        let p = RhaiPredicate::compile(engine(), "value / 0 == 1").unwrap();
        assert!(p.test(&CellValue::Number(4.0)).is_err());
    }

    #[test]
    fn test_predicate_mismatched_types_compare_false() {
        let p = RhaiPredicate::compile(engine(), "value > 1").unwrap();
        assert_eq!(p.test(&CellValue::Text("abc".into())), Ok(false));

        let p = RhaiPredicate::compile(engine(), "value >= 10").unwrap();
        assert_eq!(p.test(&CellValue::Empty), Ok(false));
    }

    #[test]
    fn test_compile_error() {
        let err = RhaiPredicate::compile(engine(), "value >=").err().unwrap();
        assert!(matches!(err, EngineError::ScriptCompile(_)));
    }

    #[test]
    fn test_template_renders_row() {
        let t = RhaiTemplate::compile(engine(), r#""=C" + row + "*E" + row"#).unwrap();
        assert_eq!(t.render(7).unwrap(), "=C7*E7");

        let col = RhaiTemplate::compile(engine(), r#""=" + COL(row) + "1""#).unwrap();
        assert_eq!(col.render(28).unwrap(), "=AB1");
    }

    #[test]
    fn test_template_without_value_fails() {
        let t = RhaiTemplate::compile(engine(), "()").unwrap();
        assert!(t.render(1).is_err());
    }
}
