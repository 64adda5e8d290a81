//! The colorized argument parser.
//!
//! Built by composition rather than by subclassing a host parser: the
//! parser owns its tokenizer, its argument registry, and its help
//! renderer (see `help.rs`). Three capabilities distinguish it from a
//! plain parser:
//!
//! - multi-candidate coercion: a parameter's resolved type may carry
//!   several candidate constructors, tried left-to-right per token;
//! - colorized usage/help with ANSI-aware wrapping;
//! - recursive `@file` argument expansion.
//!
//! Life cycle: register arguments, then parse once. [`Parser::try_parse`]
//! never touches the process; [`Parser::parse`] reports user errors on
//! stderr with the usage line and exits with code 2.

use std::collections::{HashMap, HashSet};

use colored::Colorize;

use crate::error::{ConfigError, UsageError, USAGE_EXIT_CODE};
use crate::flags::{generate_flags, normalize_snake_case, reserved_defaults, FlagMode};
use crate::help::HelpColors;
use crate::signature::{ParamKind, Parameter};
use crate::types::{resolve, ResolvedType};
use crate::value::Value;

/// Token arity of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// Presence flag: consumes no value token.
    Zero,
    One,
    ZeroOrMore,
}

/// One registered argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub(crate) dest: String,
    /// Option flags; empty for a positional slot.
    pub(crate) flags: Vec<String>,
    pub(crate) metavar: String,
    pub(crate) resolved: ResolvedType,
    pub(crate) nargs: Nargs,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
    pub(crate) help: Option<String>,
    /// Suppressed from help and from required-group listings.
    pub(crate) hidden: bool,
}

impl ArgSpec {
    pub(crate) fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    /// How the argument is named in error messages.
    pub(crate) fn display_name(&self) -> String {
        if self.is_positional() {
            self.metavar.clone()
        } else {
            self.flags.join("/")
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MutexGroup {
    pub members: Vec<usize>,
    pub required: bool,
}

/// Parsed result: parameter name to coerced value, plus the selected
/// sub-command when parsing in sub-command mode.
#[derive(Debug, Default)]
pub struct Namespace {
    values: HashMap<String, Value>,
    selected: Option<String>,
}

impl Namespace {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}

/// Outcome of a non-exiting parse.
#[derive(Debug)]
pub enum Parsed {
    Args(Namespace),
    /// `--help` was requested; the rendered help text is returned.
    Help(String),
}

pub(crate) struct SubParser {
    pub name: String,
    pub parser: Parser,
    pub help: Option<String>,
}

pub struct Parser {
    pub(crate) prog: String,
    pub(crate) description: Option<String>,
    pub(crate) epilog: Option<String>,
    pub(crate) colors: HelpColors,
    pub(crate) width: Option<usize>,
    pub(crate) fromfile_prefix: Option<char>,
    pub(crate) specs: Vec<ArgSpec>,
    pub(crate) groups: Vec<MutexGroup>,
    pub(crate) subs: Vec<SubParser>,
    reserved: HashSet<String>,
}

impl Parser {
    pub fn new(prog: impl Into<String>) -> Self {
        Self {
            prog: prog.into(),
            description: None,
            epilog: None,
            colors: HelpColors::default(),
            width: None,
            fromfile_prefix: None,
            specs: Vec::new(),
            groups: Vec::new(),
            subs: Vec::new(),
            reserved: reserved_defaults(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn epilog(mut self, text: impl Into<String>) -> Self {
        self.epilog = Some(text.into());
        self
    }

    pub fn colors(mut self, colors: HelpColors) -> Self {
        self.colors = colors;
        self
    }

    /// Fixed wrap width for usage and help; defaults to the terminal.
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Enables `@file` argument expansion with the given prefix char.
    pub fn fromfile_prefix(mut self, prefix: char) -> Self {
        self.fromfile_prefix = Some(prefix);
        self
    }

    /// Registers one argument synthesized from a declared parameter.
    ///
    /// Positional-only, variadic-positional, and defaultless
    /// positional-or-keyword parameters become positional slots; the rest
    /// become options with generated flags. The reserved-flags set lives
    /// on the parser and is mutated here.
    pub fn add_parameter(&mut self, param: &Parameter) -> Result<(), ConfigError> {
        let resolved = resolve(&param.annotation)?;

        let positional = !resolved.presence_flag
            && match param.kind {
                ParamKind::PositionalOnly | ParamKind::VariadicPositional => true,
                ParamKind::PositionalOrKeyword => {
                    param.default.is_none() && resolved.required != Some(false)
                }
                _ => false,
            };

        let spec = if positional {
            let flags = generate_flags(param.name(), FlagMode::Bare, &mut self.reserved)?;
            let metavar = flags[0].clone();
            let nargs = if param.kind == ParamKind::VariadicPositional || resolved.many {
                Nargs::ZeroOrMore
            } else {
                Nargs::One
            };
            let required = match resolved.required {
                Some(r) => r,
                None => param.default.is_none() && nargs == Nargs::One,
            };
            ArgSpec {
                dest: param.name().to_string(),
                flags: Vec::new(),
                metavar,
                resolved,
                nargs,
                required,
                default: param.default.clone(),
                help: param.help.clone(),
                hidden: param.hidden,
            }
        } else {
            let flags = generate_flags(param.name(), FlagMode::Dashed, &mut self.reserved)?;
            let nargs = if resolved.presence_flag {
                Nargs::Zero
            } else if resolved.many {
                Nargs::ZeroOrMore
            } else {
                Nargs::One
            };
            let default = param.default.clone().or_else(|| {
                if nargs == Nargs::Zero {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            });
            // A defaulted option is never required unless a required
            // wrapper says otherwise.
            let required = resolved.required.unwrap_or(false);
            ArgSpec {
                dest: param.name().to_string(),
                metavar: normalize_snake_case(param.name(), '_').to_uppercase(),
                flags,
                resolved,
                nargs,
                required,
                default,
                help: param.help.clone(),
                hidden: param.hidden,
            }
        };
        tracing::debug!(dest = %spec.dest, flags = ?spec.flags, "registered argument");
        self.specs.push(spec);
        Ok(())
    }

    /// Declares that at most one of the named arguments may be supplied
    /// with a non-default value; with `required`, exactly one must be.
    pub fn add_mutually_exclusive(
        &mut self,
        dests: &[&str],
        required: bool,
    ) -> Result<(), ConfigError> {
        let mut members = Vec::with_capacity(dests.len());
        for dest in dests {
            let idx = self
                .specs
                .iter()
                .position(|s| s.dest == *dest)
                .ok_or_else(|| ConfigError::UnknownGroupMember(dest.to_string()))?;
            members.push(idx);
        }
        self.groups.push(MutexGroup { members, required });
        Ok(())
    }

    pub(crate) fn add_subparser(&mut self, name: impl Into<String>, parser: Parser, help: Option<String>) {
        self.subs.push(SubParser {
            name: name.into(),
            parser,
            help,
        });
    }

    /// Parses without touching the process: user errors come back as
    /// [`UsageError`], `--help` comes back as rendered text.
    pub fn try_parse(&self, argv: &[String]) -> Result<Parsed, UsageError> {
        let tokens = self.expand_argfiles(argv)?;
        if !self.subs.is_empty() {
            return self.parse_with_subs(&tokens);
        }
        self.parse_tokens(&tokens)
    }

    /// Parses, reporting any user error on stderr (usage line plus one
    /// colorized error line) and exiting with code 2. `--help` prints to
    /// stdout and exits 0.
    pub fn parse(&self, argv: &[String]) -> Namespace {
        match self.try_parse(argv) {
            Ok(Parsed::Args(ns)) => ns,
            Ok(Parsed::Help(text)) => {
                println!("{text}");
                std::process::exit(0);
            }
            Err(err) => report_usage_error(&err),
        }
    }

    pub(crate) fn usage_error(&self, message: impl Into<String>) -> UsageError {
        UsageError::new(&self.prog, message, self.render_usage())
    }

    fn expand_argfiles(&self, args: &[String]) -> Result<Vec<String>, UsageError> {
        let Some(prefix) = self.fromfile_prefix else {
            return Ok(args.to_vec());
        };
        let mut out = Vec::new();
        for arg in args {
            // A bare prefix token names no file; it stays a literal argument.
            match arg.strip_prefix(prefix) {
                Some(path) if !path.is_empty() => {
                    let content = std::fs::read_to_string(path)
                        .map_err(|e| self.usage_error(format!("{path}: {e}")))?;
                    let lines: Vec<String> = content
                        .lines()
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect();
                    out.extend(self.expand_argfiles(&lines)?);
                }
                _ => out.push(arg.clone()),
            }
        }
        Ok(out)
    }

    fn parse_with_subs(&self, tokens: &[String]) -> Result<Parsed, UsageError> {
        for (i, token) in tokens.iter().enumerate() {
            if token == "--help" || token == "-h" {
                return Ok(Parsed::Help(self.render_help()));
            }
            if looks_like_option(token) {
                return Err(self.usage_error(format!("unrecognized arguments: {token}")));
            }
            let Some(sub) = self.subs.iter().find(|s| s.name == *token) else {
                let names: Vec<String> =
                    self.subs.iter().map(|s| format!("'{}'", s.name)).collect();
                return Err(self.usage_error(format!(
                    "invalid choice: '{token}' (choose from {})",
                    names.join(", ")
                )));
            };
            tracing::debug!(command = %sub.name, "selected sub-command");
            return match sub.parser.try_parse(&tokens[i + 1..]) {
                Ok(Parsed::Args(mut ns)) => {
                    ns.selected = Some(sub.name.clone());
                    Ok(Parsed::Args(ns))
                }
                other => other,
            };
        }
        Err(self.usage_error("the following arguments are required: command"))
    }

    fn parse_tokens(&self, tokens: &[String]) -> Result<Parsed, UsageError> {
        let mut flag_map: HashMap<&str, usize> = HashMap::new();
        for (idx, spec) in self.specs.iter().enumerate() {
            for flag in &spec.flags {
                flag_map.insert(flag.as_str(), idx);
            }
        }

        let mut ns = Namespace::default();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut non_default: Vec<usize> = Vec::new();
        let mut pos_tokens: Vec<String> = Vec::new();
        let mut only_positional = false;

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if !only_positional && token == "--" {
                only_positional = true;
                i += 1;
                continue;
            }
            if only_positional || !looks_like_option(token) {
                pos_tokens.push(token.clone());
                i += 1;
                continue;
            }

            let (flag, inline) = split_inline(token);
            if flag == "--help" || flag == "-h" {
                return Ok(Parsed::Help(self.render_help()));
            }
            let Some(&idx) = flag_map.get(flag) else {
                return Err(self.usage_error(format!("unrecognized arguments: {token}")));
            };
            let spec = &self.specs[idx];
            let value = match spec.nargs {
                Nargs::Zero => {
                    if let Some(extra) = inline {
                        return Err(self.usage_error(format!(
                            "argument {}: ignored explicit argument '{extra}'",
                            spec.display_name()
                        )));
                    }
                    Value::Bool(true)
                }
                Nargs::One => {
                    let raw = match inline {
                        Some(v) => v.to_string(),
                        None => {
                            i += 1;
                            tokens
                                .get(i)
                                .filter(|t| only_positional || !looks_like_option(t))
                                .cloned()
                                .ok_or_else(|| {
                                    self.usage_error(format!(
                                        "argument {}: expected one argument",
                                        spec.display_name()
                                    ))
                                })?
                        }
                    };
                    let value = self.coerce(spec, &raw)?;
                    self.check_choice(spec, &value, &raw)?;
                    value
                }
                Nargs::ZeroOrMore => {
                    let mut raws: Vec<String> = Vec::new();
                    if let Some(v) = inline {
                        raws.push(v.to_string());
                    } else {
                        while let Some(next) = tokens.get(i + 1) {
                            if next == "--" || looks_like_option(next) {
                                break;
                            }
                            raws.push(next.clone());
                            i += 1;
                        }
                    }
                    let mut items = Vec::with_capacity(raws.len());
                    for raw in &raws {
                        let value = self.coerce(spec, raw)?;
                        self.check_choice(spec, &value, raw)?;
                        items.push(value);
                    }
                    Value::List(items)
                }
            };
            self.record(idx, value, &mut ns, &mut seen, &mut non_default);
            i += 1;
        }

        self.assign_positionals(&pos_tokens, &mut ns, &mut seen, &mut non_default)?;
        self.apply_defaults_and_required(&mut ns, &seen)?;
        self.check_groups(&non_default)?;
        Ok(Parsed::Args(ns))
    }

    fn record(
        &self,
        idx: usize,
        value: Value,
        ns: &mut Namespace,
        seen: &mut HashSet<usize>,
        non_default: &mut Vec<usize>,
    ) {
        let spec = &self.specs[idx];
        seen.insert(idx);
        let is_default = spec.default.as_ref() == Some(&value);
        if !is_default && !non_default.contains(&idx) {
            non_default.push(idx);
        }
        ns.set(&spec.dest, value);
    }

    fn assign_positionals(
        &self,
        pos_tokens: &[String],
        ns: &mut Namespace,
        seen: &mut HashSet<usize>,
        non_default: &mut Vec<usize>,
    ) -> Result<(), UsageError> {
        let pos_specs: Vec<usize> = (0..self.specs.len())
            .filter(|&i| self.specs[i].is_positional())
            .collect();

        let mut ti = 0;
        for (j, &si) in pos_specs.iter().enumerate() {
            let spec = &self.specs[si];
            match spec.nargs {
                Nargs::One => {
                    if ti < pos_tokens.len() {
                        let raw = &pos_tokens[ti];
                        ti += 1;
                        let value = self.coerce(spec, raw)?;
                        self.check_choice(spec, &value, raw)?;
                        self.record(si, value, ns, seen, non_default);
                    }
                }
                Nargs::ZeroOrMore => {
                    // Leave enough tokens for the single-token positionals
                    // still to come.
                    let singles_after = pos_specs[j + 1..]
                        .iter()
                        .filter(|&&k| self.specs[k].nargs == Nargs::One)
                        .count();
                    let available = pos_tokens.len().saturating_sub(ti);
                    let take = available.saturating_sub(singles_after);
                    let mut items = Vec::with_capacity(take);
                    for raw in &pos_tokens[ti..ti + take] {
                        let value = self.coerce(spec, raw)?;
                        self.check_choice(spec, &value, raw)?;
                        items.push(value);
                    }
                    ti += take;
                    self.record(si, Value::List(items), ns, seen, non_default);
                }
                Nargs::Zero => {}
            }
        }

        if ti < pos_tokens.len() {
            return Err(self.usage_error(format!(
                "unrecognized arguments: {}",
                pos_tokens[ti..].join(" ")
            )));
        }
        Ok(())
    }

    fn apply_defaults_and_required(
        &self,
        ns: &mut Namespace,
        seen: &HashSet<usize>,
    ) -> Result<(), UsageError> {
        let mut missing: Vec<String> = Vec::new();
        for (idx, spec) in self.specs.iter().enumerate() {
            if seen.contains(&idx) {
                continue;
            }
            if spec.required {
                missing.push(spec.display_name());
                continue;
            }
            let value = match &spec.default {
                // String defaults go through the same coercion ladder as
                // supplied tokens, but only now that we know the argument
                // was not given.
                Some(Value::Str(s)) if !spec.resolved.coercers.is_empty() => {
                    self.coerce(spec, s)?
                }
                Some(v) => v.clone(),
                None => match spec.nargs {
                    Nargs::Zero => Value::Bool(false),
                    Nargs::ZeroOrMore => Value::List(Vec::new()),
                    Nargs::One => Value::None,
                },
            };
            ns.set(&spec.dest, value);
        }
        if !missing.is_empty() {
            return Err(self.usage_error(format!(
                "the following arguments are required: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    fn check_groups(&self, non_default: &[usize]) -> Result<(), UsageError> {
        for group in &self.groups {
            let present: Vec<usize> = group
                .members
                .iter()
                .copied()
                .filter(|m| non_default.contains(m))
                .collect();
            if present.len() > 1 {
                return Err(self.usage_error(format!(
                    "argument {}: not allowed with argument {}",
                    self.specs[present[1]].display_name(),
                    self.specs[present[0]].display_name()
                )));
            }
            if group.required && present.is_empty() {
                let names: Vec<String> = group
                    .members
                    .iter()
                    .filter(|&&m| !self.specs[m].hidden)
                    .map(|&m| self.specs[m].display_name())
                    .collect();
                return Err(self.usage_error(format!(
                    "one of the arguments {} is required",
                    names.join(" ")
                )));
            }
        }
        Ok(())
    }

    /// Multi-candidate coercion: candidates are tried left-to-right and
    /// the first success wins. When every candidate fails, the error
    /// names the first candidate's type.
    fn coerce(&self, spec: &ArgSpec, raw: &str) -> Result<Value, UsageError> {
        if spec.resolved.coercers.is_empty() {
            return Ok(Value::Str(raw.to_string()));
        }
        for coercer in &spec.resolved.coercers {
            if let Ok(value) = coercer.apply(raw) {
                return Ok(value);
            }
        }
        Err(self.usage_error(format!(
            "argument {}: invalid {} value: '{raw}'",
            spec.display_name(),
            spec.resolved.coercers[0].name
        )))
    }

    fn coerce_quiet(&self, spec: &ArgSpec, raw: &str) -> Option<Value> {
        spec.resolved
            .coercers
            .iter()
            .find_map(|c| c.apply(raw).ok())
    }

    /// Choice literals are passed through the same coercion ladder as the
    /// input, so both sides are compared in the coerced domain.
    fn check_choice(&self, spec: &ArgSpec, value: &Value, raw: &str) -> Result<(), UsageError> {
        let Some(choices) = &spec.resolved.choices else {
            return Ok(());
        };
        let mut allowed: Vec<Value> = choices.iter().map(|c| Value::Str(c.clone())).collect();
        for choice in choices {
            if let Some(coerced) = self.coerce_quiet(spec, choice) {
                if !allowed.contains(&coerced) {
                    allowed.push(coerced);
                }
            }
        }
        if allowed.contains(value) {
            return Ok(());
        }
        let listing: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
        Err(self.usage_error(format!(
            "argument {}: invalid choice: '{raw}' (choose from {})",
            spec.display_name(),
            listing.join(", ")
        )))
    }
}

/// Reports a usage error the way the exiting entry points do: the usage
/// block on stderr, one colorized error line, then exit code 2.
pub(crate) fn report_usage_error(err: &UsageError) -> ! {
    eprint!("{}", err.usage);
    eprintln!(
        "{}: {}{} {}",
        err.prog,
        "error".red(),
        ":".bright_red(),
        err.message
    );
    std::process::exit(USAGE_EXIT_CODE);
}

pub(crate) fn looks_like_option(token: &str) -> bool {
    let mut chars = token.chars();
    if chars.next() != Some('-') {
        return false;
    }
    match chars.next() {
        // A lone "-" or a negative number is a positional value.
        None => false,
        Some(c) => !(c.is_ascii_digit() || c == '.'),
    }
}

fn split_inline(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((flag, value)) => (flag, Some(value)),
        None => (token, None),
    }
}
