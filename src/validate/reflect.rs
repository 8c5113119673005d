//! Schema reflection over a loaded contract class.
//!
//! [`SchemaReflector`] is the SDK's reflection entry point as seen by the
//! validator: given a contract class it either returns the schema or fails
//! with a typed error. [`SdkReflector`] derives the schema from declarations,
//! mapping annotations to the SDK's schema types.

use genvm_lint_common::{ClassDecl, ContractModule, MethodDecl, ParamKind};
use log::trace;
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::host::{HostCapabilities, HostError};
use super::sandbox::LoadedContract;

/// Bytes probed from each storage slot.
const SLOT_PROBE_LEN: u32 = 32;

/// Reflection failure.
#[derive(Debug, Error)]
pub enum ReflectError {
    /// The SDK rejected a type. The message carries `'line': N` when the
    /// offending declaration is known.
    #[error("{message}")]
    Type {
        /// SDK error text.
        message: String,
    },
    /// A host binding failed while reflecting.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Produces the schema for a contract class.
pub trait SchemaReflector {
    /// Reflects over `class` in `contract`.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError`] when the schema cannot be produced.
    fn get_schema(
        &self,
        contract: &LoadedContract,
        class: &ClassDecl,
        host: &dyn HostCapabilities,
    ) -> Result<Value, ReflectError>;
}

/// Declaration-driven reflector matching the SDK's schema shape.
///
/// The schema has a `ctor` entry with `params` and `kwparams`, and a
/// `methods` object keyed by method name in declaration order. Every method
/// carries `params`, `kwparams`, `readonly`, and `ret`; write methods also
/// carry `payable`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SdkReflector;

impl SchemaReflector for SdkReflector {
    fn get_schema(
        &self,
        contract: &LoadedContract,
        class: &ClassDecl,
        host: &dyn HostCapabilities,
    ) -> Result<Value, ReflectError> {
        let types = TypeMapper {
            module: contract.module(),
        };

        for field in class.fields() {
            types
                .storage_type(field.annotation())
                .map_err(|detail| located(&detail, field.name(), field.line()))?;
            let probe = host.storage_read(field.name(), 0, SLOT_PROBE_LEN)?;
            trace!("probed slot {} ({} bytes)", field.name(), probe.len());
        }

        let ctor = match class.method("__init__") {
            Some(init) => signature(&types, init)?,
            None => json!({"params": [], "kwparams": {}}),
        };

        let mut methods = Map::new();
        for method in class.methods() {
            let Some(marker) = method.marker() else {
                continue;
            };
            let mut entry = signature(&types, method)?;
            let ret = match method.returns() {
                Some(annotation) => types
                    .param_type(annotation)
                    .map_err(|detail| located(&detail, method.name(), method.line()))?,
                None => json!("any"),
            };
            if let Value::Object(fields) = &mut entry {
                fields.insert("readonly".to_owned(), json!(marker.readonly));
                if !marker.readonly {
                    fields.insert("payable".to_owned(), json!(marker.payable));
                }
                fields.insert("ret".to_owned(), ret);
            }
            methods.insert(method.name().to_owned(), entry);
        }

        Ok(json!({"ctor": ctor, "methods": methods}))
    }
}

fn signature(types: &TypeMapper<'_>, method: &MethodDecl) -> Result<Value, ReflectError> {
    let mut params = Vec::new();
    let mut kwparams = Map::new();
    for param in method.params() {
        let at = |detail: &str| located(detail, param.name(), method.line());
        if matches!(param.kind(), ParamKind::VarArgs | ParamKind::VarKeywords) {
            return Err(at("variadic parameters are not supported"));
        }
        let annotation = param
            .annotation()
            .ok_or_else(|| at("missing type annotation"))?;
        let ty = types.param_type(annotation).map_err(|detail| at(&detail))?;
        if param.kind() == ParamKind::KeywordOnly {
            kwparams.insert(param.name().to_owned(), ty);
        } else {
            params.push(json!([param.name(), ty]));
        }
    }
    Ok(json!({"params": params, "kwparams": kwparams}))
}

fn located(detail: &str, name: &str, line: usize) -> ReflectError {
    ReflectError::Type {
        message: format!("{detail} {{'name': '{name}', 'line': {line}}}"),
    }
}

struct TypeMapper<'m> {
    module: &'m ContractModule,
}

impl TypeMapper<'_> {
    fn param_type(&self, annotation: &str) -> Result<Value, String> {
        self.map(annotation, false)
    }

    fn storage_type(&self, annotation: &str) -> Result<Value, String> {
        self.map(annotation, true)
    }

    fn map(&self, annotation: &str, storage: bool) -> Result<Value, String> {
        let expr = unquote(annotation.trim());
        let alternatives = split_top_level(expr, '|');
        if alternatives.len() > 1 {
            let mapped = alternatives
                .iter()
                .map(|alternative| self.map(alternative, storage))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(json!({"$or": mapped}));
        }

        let (head, args) = split_generic(expr).ok_or_else(|| format!("malformed type '{expr}'"))?;
        let name = head.rsplit('.').next().unwrap_or(head);
        let arg = |index: usize| -> Result<Value, String> {
            args.get(index).map_or_else(
                || Ok(json!("any")),
                |inner| self.map(inner, storage),
            )
        };

        match name {
            "dict" | "Dict" if storage => Err("use TreeMap instead of dict in storage".to_owned()),
            "list" | "List" if storage => Err("use DynArray instead of list in storage".to_owned()),
            "str" => Ok(json!("string")),
            "bool" => Ok(json!("bool")),
            "bytes" => Ok(json!("bytes")),
            "Address" => Ok(json!("address")),
            "None" => Ok(json!("null")),
            "Any" => Ok(json!("any")),
            "int" | "bigint" => Ok(json!("int")),
            sized if is_sized_int(sized) => Ok(json!("int")),
            "list" | "List" | "DynArray" | "Array" | "Sequence" | "MutableSequence" => {
                Ok(json!([arg(0)?]))
            }
            "dict" | "Dict" | "TreeMap" | "Mapping" | "MutableMapping" => {
                Ok(json!({"$dict": arg(1)?}))
            }
            "Optional" => Ok(json!({"$or": [arg(0)?, "null"]})),
            "Union" => {
                let mapped = args
                    .iter()
                    .map(|inner| self.map(inner, storage))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({"$or": mapped}))
            }
            declared if self.module.class(declared).is_some() => Ok(json!({"$ref": declared})),
            _ => Err(format!("unsupported type '{expr}'")),
        }
    }
}

fn unquote(expr: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|&quote| expr.strip_prefix(quote)?.strip_suffix(quote))
        .map_or(expr, str::trim)
}

fn is_sized_int(name: &str) -> bool {
    let Some(bits) = name.strip_prefix(['u', 'i']) else {
        return false;
    };
    bits.parse::<u16>()
        .is_ok_and(|width| width % 8 == 0 && (8..=256).contains(&width))
        && !bits.starts_with('0')
}

/// Splits `Name[a, b]` into `("Name", ["a", "b"])`.
fn split_generic(expr: &str) -> Option<(&str, Vec<&str>)> {
    let Some(open) = expr.find('[') else {
        return Some((expr, Vec::new()));
    };
    let inner = expr.get(open + 1..)?.strip_suffix(']')?;
    let args = split_top_level(inner, ',')
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .collect();
    Some((expr.get(..open)?.trim(), args))
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if ch == separator && depth == 0 => {
                parts.push(text.get(start..index).unwrap_or_default().trim());
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text.get(start..).unwrap_or_default().trim());
    parts
}

#[cfg(test)]
#[path = "reflect_tests.rs"]
mod tests;
