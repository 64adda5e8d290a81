//! Annotation normalization.
//!
//! A parameter's declared [`TypeSpec`] is resolved into an ordered list of
//! candidate coercers plus a handful of parsing attributes (presence flag,
//! token arity, required override, implicit choices). Resolution walks the
//! annotation depth-first; the depth counter exists only so diagnostics
//! can say where in a compound annotation resolution gave up.

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::value::Value;

/// A fallible `string -> value` constructor. The error text is only used
/// for diagnostics; coercion failure simply moves on to the next
/// candidate.
pub type CoerceFn = Arc<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>;

#[derive(Clone)]
pub struct Coercer {
    /// Identity for deduplication and for invalid-value messages.
    pub name: String,
    func: CoerceFn,
}

impl Coercer {
    pub fn new(name: impl Into<String>, func: CoerceFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn apply(&self, raw: &str) -> std::result::Result<Value, String> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercer").field("name", &self.name).finish()
    }
}

/// The annotation algebra a parameter can declare.
#[derive(Clone)]
pub enum TypeSpec {
    /// No coercion: the raw token passes through as a string.
    Any,
    Str,
    Int,
    Float,
    /// At the top level: a zero-token presence flag. Nested inside a
    /// compound it degrades to a true/false token coercer.
    Bool,
    /// An enumeration: coerced as a string, its values become the
    /// parameter's choice set unless one was declared explicitly.
    Enum { name: String, values: Vec<String> },
    /// A restricted set of literal string values.
    Literal(Vec<String>),
    List(Box<TypeSpec>),
    Optional(Box<TypeSpec>),
    Required(Box<TypeSpec>),
    Union(Vec<TypeSpec>),
    /// A caller-supplied constructor.
    Custom { name: String, parse: CoerceFn },
    /// An erased/opaque marker: resolves to pass-through.
    Opaque(String),
    /// A marker that is recognized but cannot be synthesized into a CLI
    /// argument; resolution fails at setup time.
    Unsupported(String),
}

impl TypeSpec {
    pub fn custom(
        name: impl Into<String>,
        parse: impl Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        TypeSpec::Custom {
            name: name.into(),
            parse: Arc::new(parse),
        }
    }

    pub fn literal<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        TypeSpec::Literal(values.into_iter().map(Into::into).collect())
    }

    fn label(&self) -> String {
        match self {
            TypeSpec::Any => "any".into(),
            TypeSpec::Str => "str".into(),
            TypeSpec::Int => "int".into(),
            TypeSpec::Float => "float".into(),
            TypeSpec::Bool => "bool".into(),
            TypeSpec::Enum { name, .. } => name.clone(),
            TypeSpec::Literal(values) => format!("literal[{}]", values.join(", ")),
            TypeSpec::List(inner) => format!("list[{}]", inner.label()),
            TypeSpec::Optional(inner) => format!("optional[{}]", inner.label()),
            TypeSpec::Required(inner) => format!("required[{}]", inner.label()),
            TypeSpec::Union(members) => {
                let labels: Vec<String> = members.iter().map(|m| m.label()).collect();
                format!("union[{}]", labels.join(" | "))
            }
            TypeSpec::Custom { name, .. } => name.clone(),
            TypeSpec::Opaque(name) => name.clone(),
            TypeSpec::Unsupported(name) => name.clone(),
        }
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({})", self.label())
    }
}

/// The outcome of resolving an annotation.
#[derive(Debug, Clone, Default)]
pub struct ResolvedType {
    /// Ordered candidate coercers; empty means pass-through. Order is the
    /// coercion priority: first success wins.
    pub coercers: Vec<Coercer>,
    /// Zero-token flag (top-level bool): presence toggles the value.
    pub presence_flag: bool,
    /// Accepts any number of tokens (list annotation).
    pub many: bool,
    /// `Some(false)` for optional, `Some(true)` for a required wrapper.
    pub required: Option<bool>,
    /// Implicit choice set contributed by an enumeration annotation.
    pub choices: Option<Vec<String>>,
}

pub fn coerce_int(raw: &str) -> std::result::Result<Value, String> {
    raw.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| e.to_string())
}

pub fn coerce_float(raw: &str) -> std::result::Result<Value, String> {
    raw.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| e.to_string())
}

pub fn coerce_str(raw: &str) -> std::result::Result<Value, String> {
    Ok(Value::Str(raw.to_string()))
}

pub fn coerce_bool_token(raw: &str) -> std::result::Result<Value, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        other => Err(format!("not a boolean: {other}")),
    }
}

/// Resolves an annotation into its candidate-coercer list and attributes.
pub fn resolve(spec: &TypeSpec) -> std::result::Result<ResolvedType, ConfigError> {
    let mut out = ResolvedType::default();
    resolve_into(spec, &mut out, 0)?;
    Ok(out)
}

fn push_coercer(out: &mut ResolvedType, coercer: Coercer) {
    // Duplicates are removed by identity; the first occurrence keeps its
    // position, which is the coercion priority.
    if out.coercers.iter().all(|c| c.name != coercer.name) {
        out.coercers.push(coercer);
    }
}

fn resolve_into(
    spec: &TypeSpec,
    out: &mut ResolvedType,
    depth: usize,
) -> std::result::Result<(), ConfigError> {
    match spec {
        TypeSpec::Any | TypeSpec::Opaque(_) => {}

        TypeSpec::Str => push_coercer(out, Coercer::new("str", Arc::new(coerce_str))),
        TypeSpec::Int => push_coercer(out, Coercer::new("int", Arc::new(coerce_int))),
        TypeSpec::Float => push_coercer(out, Coercer::new("float", Arc::new(coerce_float))),

        TypeSpec::Bool => {
            if depth == 0 {
                out.presence_flag = true;
            } else {
                push_coercer(out, Coercer::new("bool", Arc::new(coerce_bool_token)));
            }
        }

        TypeSpec::Enum { name, values } => {
            if depth == 0 && out.choices.is_none() {
                out.choices = Some(values.clone());
            }
            push_coercer(out, Coercer::new(name.clone(), Arc::new(coerce_str)));
        }

        TypeSpec::Literal(values) => {
            let allowed = values.clone();
            let label = spec.label();
            let func: CoerceFn = Arc::new(move |raw| {
                if allowed.iter().any(|v| v == raw) {
                    Ok(Value::Str(raw.to_string()))
                } else {
                    Err(format!("value must be one of [{}]", allowed.join(", ")))
                }
            });
            push_coercer(out, Coercer::new(label, func));
        }

        TypeSpec::List(inner) => {
            out.many = true;
            resolve_into(inner, out, depth + 1)?;
        }

        TypeSpec::Required(inner) => {
            out.required = Some(true);
            resolve_into(inner, out, depth + 1)?;
        }

        TypeSpec::Optional(inner) => {
            // The null member of the underlying union is dropped; the
            // inner type carries the coercion.
            if out.required.is_none() {
                out.required = Some(false);
            }
            resolve_into(inner, out, depth + 1)?;
        }

        TypeSpec::Union(members) => {
            for member in members {
                resolve_into(member, out, depth + 1)?;
            }
        }

        TypeSpec::Custom { name, parse } => {
            push_coercer(out, Coercer::new(name.clone(), parse.clone()));
        }

        TypeSpec::Unsupported(name) => {
            return Err(ConfigError::UnsupportedAnnotation {
                name: name.clone(),
                depth,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_annotation_passes_through() {
        let resolved = resolve(&TypeSpec::Any).unwrap();
        assert!(resolved.coercers.is_empty());
        assert!(!resolved.presence_flag);
    }

    #[test]
    fn plain_types_are_singletons() {
        let resolved = resolve(&TypeSpec::Int).unwrap();
        assert_eq!(resolved.coercers.len(), 1);
        assert_eq!(resolved.coercers[0].apply("42"), Ok(Value::Int(42)));
        assert!(resolved.coercers[0].apply("nope").is_err());
    }

    #[test]
    fn top_level_bool_is_a_presence_flag() {
        let resolved = resolve(&TypeSpec::Bool).unwrap();
        assert!(resolved.presence_flag);
        assert!(resolved.coercers.is_empty());
    }

    #[test]
    fn nested_bool_consumes_a_token() {
        let resolved = resolve(&TypeSpec::Union(vec![TypeSpec::Bool, TypeSpec::Int])).unwrap();
        assert!(!resolved.presence_flag);
        assert_eq!(resolved.coercers[0].apply("yes"), Ok(Value::Bool(true)));
    }

    #[test]
    fn enum_populates_choices() {
        let spec = TypeSpec::Enum {
            name: "level".into(),
            values: vec!["low".into(), "high".into()],
        };
        let resolved = resolve(&spec).unwrap();
        assert_eq!(
            resolved.choices,
            Some(vec!["low".to_string(), "high".to_string()])
        );
        assert_eq!(
            resolved.coercers[0].apply("low"),
            Ok(Value::Str("low".into()))
        );
    }

    #[test]
    fn literal_validates_membership() {
        let resolved = resolve(&TypeSpec::literal(["a", "b"])).unwrap();
        assert_eq!(resolved.coercers[0].apply("a"), Ok(Value::Str("a".into())));
        assert!(resolved.coercers[0].apply("c").is_err());
    }

    #[test]
    fn list_unwraps_and_accepts_many() {
        let resolved = resolve(&TypeSpec::List(Box::new(TypeSpec::Int))).unwrap();
        assert!(resolved.many);
        assert_eq!(resolved.coercers[0].apply("3"), Ok(Value::Int(3)));
    }

    #[test]
    fn optional_is_never_required() {
        let resolved = resolve(&TypeSpec::Optional(Box::new(TypeSpec::Int))).unwrap();
        assert_eq!(resolved.required, Some(false));
        assert_eq!(resolved.coercers.len(), 1);
    }

    #[test]
    fn required_wrapper_wins_over_default() {
        let resolved = resolve(&TypeSpec::Required(Box::new(TypeSpec::Str))).unwrap();
        assert_eq!(resolved.required, Some(true));
    }

    #[test]
    fn union_preserves_declaration_order() {
        let resolved = resolve(&TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Str])).unwrap();
        let names: Vec<&str> = resolved.coercers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["int", "str"]);

        let swapped = resolve(&TypeSpec::Union(vec![TypeSpec::Str, TypeSpec::Int])).unwrap();
        let names: Vec<&str> = swapped.coercers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["str", "int"]);
    }

    #[test]
    fn union_deduplicates_by_identity_first_wins() {
        let spec = TypeSpec::Union(vec![
            TypeSpec::Int,
            TypeSpec::Str,
            TypeSpec::Int,
            TypeSpec::Union(vec![TypeSpec::Str, TypeSpec::Float]),
        ]);
        let resolved = resolve(&spec).unwrap();
        let names: Vec<&str> = resolved.coercers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["int", "str", "float"]);
    }

    #[test]
    fn nested_optional_list_combines_attributes() {
        let spec = TypeSpec::Optional(Box::new(TypeSpec::List(Box::new(TypeSpec::Float))));
        let resolved = resolve(&spec).unwrap();
        assert_eq!(resolved.required, Some(false));
        assert!(resolved.many);
        assert_eq!(resolved.coercers[0].name, "float");
    }

    #[test]
    fn unsupported_marker_fails_at_setup() {
        let err = resolve(&TypeSpec::Unsupported("file-type".into()));
        assert!(matches!(
            err,
            Err(ConfigError::UnsupportedAnnotation { .. })
        ));
        // Depth is reported for nested failures.
        let err = resolve(&TypeSpec::Union(vec![
            TypeSpec::Int,
            TypeSpec::Unsupported("file-type".into()),
        ]));
        match err {
            Err(ConfigError::UnsupportedAnnotation { depth, .. }) => assert_eq!(depth, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
