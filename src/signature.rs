//! Declarative callable signatures.
//!
//! Rust has no runtime reflection over function parameters, so the
//! signature of a callable is declared through a builder: parameters in
//! declaration order, each with a kind, an annotation, and an optional
//! default, plus the callable's doc string. The builder is the single
//! source the rest of the pipeline (type resolution, flag generation,
//! parser registration, dispatch reassembly) works from.

use crate::docs::{self, DocInfo};
use crate::error::ConfigError;
use crate::flags::normalize;
use crate::types::TypeSpec;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VariadicPositional,
    KeywordOnly,
    /// Representable so the dispatcher can reject it by name; never
    /// synthesized into an argument.
    VariadicKeyword,
}

impl ParamKind {
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::PositionalOnly => "positional-only",
            ParamKind::PositionalOrKeyword => "positional-or-keyword",
            ParamKind::VariadicPositional => "variadic-positional",
            ParamKind::KeywordOnly => "keyword-only",
            ParamKind::VariadicKeyword => "variadic-keyword",
        }
    }

    pub fn is_positional(self) -> bool {
        matches!(
            self,
            ParamKind::PositionalOnly
                | ParamKind::PositionalOrKeyword
                | ParamKind::VariadicPositional
        )
    }
}

/// One declared parameter. The name is fixed at construction.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    pub kind: ParamKind,
    pub annotation: TypeSpec,
    pub default: Option<Value>,
    pub help: Option<String>,
    /// Suppressed from help, usage, and required-group listings.
    pub hidden: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotation: TypeSpec::Any,
            default: None,
            help: None,
            hidden: false,
        }
    }

    pub fn positional_only(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::PositionalOnly)
    }

    pub fn positional_or_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::PositionalOrKeyword)
    }

    pub fn variadic_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VariadicPositional)
    }

    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    pub fn variadic_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VariadicKeyword)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(mut self, spec: TypeSpec) -> Self {
        self.annotation = spec;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// The introspected description of one callable: normalized name, ordered
/// parameters, and parsed documentation. Immutable once built.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    name: String,
    params: Vec<Parameter>,
    doc: DocInfo,
}

impl FunctionInfo {
    pub fn builder(name: impl Into<String>) -> FunctionInfoBuilder {
        FunctionInfoBuilder {
            name: name.into(),
            params: Vec::new(),
            doc: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn doc(&self) -> &DocInfo {
        &self.doc
    }

    pub fn short_description(&self) -> Option<&str> {
        self.doc.short_description.as_deref()
    }
}

pub struct FunctionInfoBuilder {
    name: String,
    params: Vec<Parameter>,
    doc: Option<String>,
}

impl FunctionInfoBuilder {
    /// Attaches the callable's raw doc string; parsed at build time.
    pub fn doc(mut self, raw: impl Into<String>) -> Self {
        self.doc = Some(raw.into());
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Validates the declaration and produces an immutable
    /// [`FunctionInfo`]. Parameter names must be unique and at most one
    /// variadic positional may appear.
    pub fn build(self) -> Result<FunctionInfo, ConfigError> {
        let mut seen = std::collections::HashSet::new();
        let mut variadic = false;
        for param in &self.params {
            if !seen.insert(param.name().to_string()) {
                return Err(ConfigError::DuplicateParameter(param.name().to_string()));
            }
            if param.kind == ParamKind::VariadicPositional {
                if variadic {
                    return Err(ConfigError::ExtraVariadicPositional(
                        param.name().to_string(),
                    ));
                }
                variadic = true;
            }
        }

        let doc = docs::parse(self.doc.as_deref().unwrap_or(""));
        let mut params = self.params;
        for param in &mut params {
            if param.help.is_none() {
                param.help = doc.param_help(param.name()).map(str::to_string);
            }
        }

        Ok(FunctionInfo {
            name: normalize(&self.name, '_'),
            params,
            doc,
        })
    }
}
