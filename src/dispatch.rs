//! Command dispatch.
//!
//! A [`Command`] pairs a declared signature with a handler closure. The
//! dispatcher synthesizes a parser from the signatures, parses argv,
//! reassembles the parsed values into call arguments, and invokes the
//! handler. One command runs in single mode; several run in sub-command
//! mode, each under its own name with its own parser.
//!
//! Handlers may be synchronous or hand back a future; futures are driven
//! to completion on the calling thread.

use std::future::Future;
use std::pin::Pin;

use futures::executor::block_on;

use crate::error::{ConfigError, DynError, Result, RunError};
use crate::help::HelpColors;
use crate::parser::{report_usage_error, Namespace, Parsed, Parser};
use crate::signature::{FunctionInfo, ParamKind};
use crate::value::Value;

/// Call arguments reassembled from a parse: positional values in
/// declaration order with variadics spread flat, the rest keyed by
/// parameter name.
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = std::result::Result<(), DynError>>>>;

/// What a handler hands back: finished, or a future still to drive.
pub enum Outcome {
    Ready,
    Pending(HandlerFuture),
}

impl Outcome {
    pub fn pending(
        fut: impl Future<Output = std::result::Result<(), DynError>> + 'static,
    ) -> Self {
        Outcome::Pending(Box::pin(fut))
    }
}

type Handler = Box<dyn Fn(CallArgs) -> std::result::Result<Outcome, DynError>>;

/// A declared signature paired with the closure that implements it.
pub struct Command {
    info: FunctionInfo,
    handler: Handler,
}

impl Command {
    pub fn new(
        info: FunctionInfo,
        handler: impl Fn(CallArgs) -> std::result::Result<Outcome, DynError> + 'static,
    ) -> Self {
        Self {
            info,
            handler: Box::new(handler),
        }
    }

    /// Convenience for a fully synchronous handler.
    pub fn sync(
        info: FunctionInfo,
        handler: impl Fn(CallArgs) -> std::result::Result<(), DynError> + 'static,
    ) -> Self {
        Self::new(info, move |args| handler(args).map(|()| Outcome::Ready))
    }

    pub fn info(&self) -> &FunctionInfo {
        &self.info
    }
}

/// How a run ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run {
    Completed,
    /// `--help` was requested; the handler did not run.
    HelpShown,
}

enum Mode {
    Single(Command),
    /// Sub-commands with the names they run under.
    Multi(Vec<(String, Command)>),
}

/// The dispatcher: commands plus presentation settings.
pub struct Argonize {
    mode: Mode,
    prog: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
    colors: HelpColors,
    width: Option<usize>,
    fromfile_prefix: Option<char>,
}

impl Argonize {
    /// Single-command mode: the callable's parameters become the whole
    /// argument surface.
    pub fn new(command: Command) -> Self {
        Self::with_mode(Mode::Single(command))
    }

    /// Sub-command mode: each callable runs under its own name.
    pub fn commands(commands: Vec<Command>) -> Self {
        Self::with_mode(Mode::Multi(
            commands
                .into_iter()
                .map(|c| (c.info.name().to_string(), c))
                .collect(),
        ))
    }

    /// Sub-command mode with explicit names overriding the callables'
    /// own.
    pub fn named(commands: Vec<(String, Command)>) -> Self {
        Self::with_mode(Mode::Multi(commands))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            prog: None,
            description: None,
            epilog: None,
            colors: HelpColors::default(),
            width: None,
            fromfile_prefix: None,
        }
    }

    /// Program name shown in usage and errors; defaults to argv[0]'s
    /// file name.
    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
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

    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Enables `@file` argument expansion.
    pub fn fromfile_prefix(mut self, prefix: char) -> Self {
        self.fromfile_prefix = Some(prefix);
        self
    }

    /// Parses the process arguments and runs the matching handler. User
    /// errors are reported on stderr and exit the process with code 2;
    /// `--help` prints to stdout. Setup and handler errors come back to
    /// the caller.
    pub fn run(&self) -> Result<Run> {
        let argv: Vec<String> = std::env::args().skip(1).collect();
        self.run_from(&argv)
    }

    /// Like [`run`](Self::run) with explicit arguments.
    pub fn run_from(&self, argv: &[String]) -> Result<Run> {
        match self.try_run_from(argv) {
            Err(RunError::Usage(err)) => report_usage_error(&err),
            Ok(Run::HelpShown) => std::process::exit(0),
            other => other,
        }
    }

    /// Fully non-exiting variant: usage errors come back as
    /// [`RunError::Usage`] and `--help` prints and returns
    /// [`Run::HelpShown`].
    pub fn try_run_from(&self, argv: &[String]) -> Result<Run> {
        let parser = self.build_parser()?;
        match parser.try_parse(argv)? {
            Parsed::Help(text) => {
                println!("{text}");
                Ok(Run::HelpShown)
            }
            Parsed::Args(ns) => self.dispatch(&ns),
        }
    }

    fn prog_name(&self) -> String {
        if let Some(prog) = &self.prog {
            return prog.clone();
        }
        std::env::args()
            .next()
            .as_deref()
            .map(std::path::Path::new)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string())
    }

    fn build_parser(&self) -> std::result::Result<Parser, ConfigError> {
        let prog = self.prog_name();
        match &self.mode {
            Mode::Single(command) => {
                let description = self
                    .description
                    .clone()
                    .or_else(|| command.info.short_description().map(str::to_string));
                self.configure(Parser::new(prog), description, command)
            }
            Mode::Multi(commands) => {
                let mut top = Parser::new(&prog);
                if let Some(desc) = &self.description {
                    top = top.description(desc.clone());
                }
                if let Some(epilog) = &self.epilog {
                    top = top.epilog(epilog.clone());
                }
                top = top.colors(self.colors.clone());
                if let Some(width) = self.width {
                    top = top.width(width);
                }
                if let Some(prefix) = self.fromfile_prefix {
                    top = top.fromfile_prefix(prefix);
                }
                for (name, command) in commands {
                    let description = command.info.short_description().map(str::to_string);
                    let sub = self.configure(
                        Parser::new(format!("{prog} {name}")),
                        description.clone(),
                        command,
                    )?;
                    top.add_subparser(name.clone(), sub, description);
                }
                Ok(top)
            }
        }
    }

    fn configure(
        &self,
        mut parser: Parser,
        description: Option<String>,
        command: &Command,
    ) -> std::result::Result<Parser, ConfigError> {
        if let Some(desc) = description {
            parser = parser.description(desc);
        }
        if let Some(epilog) = &self.epilog {
            parser = parser.epilog(epilog.clone());
        }
        parser = parser.colors(self.colors.clone());
        if let Some(width) = self.width {
            parser = parser.width(width);
        }
        if let Some(prefix) = self.fromfile_prefix {
            parser = parser.fromfile_prefix(prefix);
        }
        for param in command.info.params() {
            if param.kind == ParamKind::VariadicKeyword {
                return Err(ConfigError::UnsupportedParameter {
                    name: param.name().to_string(),
                    kind: param.kind.label(),
                });
            }
            parser.add_parameter(param)?;
        }
        Ok(parser)
    }

    fn dispatch(&self, ns: &Namespace) -> Result<Run> {
        let command = match &self.mode {
            Mode::Single(command) => command,
            Mode::Multi(commands) => {
                let Some(selected) = ns.selected() else {
                    return Err(RunError::NoMatchingCommand(String::new()));
                };
                commands
                    .iter()
                    .find(|(name, _)| name == selected)
                    .map(|(_, c)| c)
                    .ok_or_else(|| RunError::NoMatchingCommand(selected.to_string()))?
            }
        };
        tracing::debug!(command = %command.info.name(), "dispatching");
        let args = reassemble(&command.info, ns);
        match (command.handler)(args).map_err(RunError::Handler)? {
            Outcome::Ready => Ok(Run::Completed),
            Outcome::Pending(fut) => {
                block_on(fut).map_err(RunError::Handler)?;
                Ok(Run::Completed)
            }
        }
    }
}

/// Parses the process arguments for one command and runs it.
pub fn argonize(command: Command) -> Result<Run> {
    Argonize::new(command).run()
}

/// Parses the process arguments against several named commands and runs
/// the selected one.
pub fn argonize_commands(commands: Vec<Command>) -> Result<Run> {
    Argonize::commands(commands).run()
}

fn reassemble(info: &FunctionInfo, ns: &Namespace) -> CallArgs {
    let mut args = CallArgs::default();
    for param in info.params() {
        let value = ns.get(param.name()).cloned().unwrap_or(Value::None);
        match param.kind {
            ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => {
                args.positional.push(value)
            }
            ParamKind::VariadicPositional => match value {
                Value::List(items) => args.positional.extend(items),
                Value::None => {}
                other => args.positional.push(other),
            },
            ParamKind::KeywordOnly => args.keyword.push((param.name().to_string(), value)),
            ParamKind::VariadicKeyword => {}
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Parameter;
    use crate::types::TypeSpec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn variadic_keyword_is_rejected_at_setup() {
        let info = FunctionInfo::builder("f")
            .param(Parameter::variadic_keyword("extras"))
            .build()
            .unwrap();
        let app = Argonize::new(Command::sync(info, |_| Ok(()))).prog("f").width(80);
        let err = app.try_run_from(&argv(&[])).unwrap_err();
        assert!(matches!(
            err,
            RunError::Config(ConfigError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn handler_errors_pass_through_unmodified() {
        let info = FunctionInfo::builder("f").build().unwrap();
        let app = Argonize::new(Command::sync(info, |_| Err("boom".into())))
            .prog("f")
            .width(80);
        let err = app.try_run_from(&argv(&[])).unwrap_err();
        match err {
            RunError::Handler(inner) => assert_eq!(inner.to_string(), "boom"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn usage_errors_do_not_invoke_the_handler() {
        let called = Rc::new(RefCell::new(false));
        let flag = called.clone();
        let info = FunctionInfo::builder("f")
            .param(Parameter::positional_only("a").annotation(TypeSpec::Int))
            .build()
            .unwrap();
        let app = Argonize::new(Command::sync(info, move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        }))
        .prog("f")
        .width(80);
        let err = app.try_run_from(&argv(&["notanumber"])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
        assert!(!*called.borrow());
    }

    #[test]
    fn reassembly_orders_positionals_and_spreads_variadics() {
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let info = FunctionInfo::builder("f")
            .param(Parameter::positional_only("first").annotation(TypeSpec::Int))
            .param(
                Parameter::variadic_positional("rest")
                    .annotation(TypeSpec::List(Box::new(TypeSpec::Int))),
            )
            .param(
                Parameter::keyword_only("label")
                    .annotation(TypeSpec::Str)
                    .default("none"),
            )
            .build()
            .unwrap();
        let app = Argonize::new(Command::sync(info, move |args| {
            *sink.borrow_mut() = Some((args.positional.clone(), args.keyword.clone()));
            Ok(())
        }))
        .prog("f")
        .width(80);

        let run = app
            .try_run_from(&argv(&["1", "2", "3", "--label", "x"]))
            .unwrap();
        assert_eq!(run, Run::Completed);
        let (positional, keyword) = seen.borrow().clone().unwrap();
        assert_eq!(
            positional,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_eq!(keyword, vec![("label".to_string(), Value::Str("x".into()))]);
    }

    #[test]
    fn async_handlers_run_to_completion() {
        let done = Rc::new(RefCell::new(false));
        let flag = done.clone();
        let info = FunctionInfo::builder("f").build().unwrap();
        let app = Argonize::new(Command::new(info, move |_| {
            let flag = flag.clone();
            Ok(Outcome::pending(async move {
                *flag.borrow_mut() = true;
                Ok(())
            }))
        }))
        .prog("f")
        .width(80);
        assert_eq!(app.try_run_from(&argv(&[])).unwrap(), Run::Completed);
        assert!(*done.borrow());
    }

    #[test]
    fn only_the_selected_subcommand_runs() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = |name: &str, log: Rc<RefCell<Vec<String>>>| {
            let tag = name.to_string();
            let info = FunctionInfo::builder(name)
                .param(Parameter::positional_only("x").annotation(TypeSpec::Int))
                .build()
                .unwrap();
            Command::sync(info, move |args| {
                log.borrow_mut()
                    .push(format!("{tag}:{:?}", args.positional));
                Ok(())
            })
        };
        let app = Argonize::commands(vec![
            make("add", log.clone()),
            make("sub", log.clone()),
        ])
        .prog("tool")
        .width(80);

        assert_eq!(
            app.try_run_from(&argv(&["add", "7"])).unwrap(),
            Run::Completed
        );
        assert_eq!(log.borrow().as_slice(), ["add:[Int(7)]"]);

        let err = app.try_run_from(&argv(&["mul", "7"])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn explicit_names_override_callable_names() {
        let info = FunctionInfo::builder("original").build().unwrap();
        let app = Argonize::named(vec![(
            "alias".to_string(),
            Command::sync(info, |_| Ok(())),
        )])
        .prog("tool")
        .width(80);
        assert_eq!(app.try_run_from(&argv(&["alias"])).unwrap(), Run::Completed);
        let err = app.try_run_from(&argv(&["original"])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
    }

    #[test]
    fn subcommand_usage_errors_name_the_sub_parser() {
        let info = FunctionInfo::builder("add")
            .param(Parameter::positional_only("x").annotation(TypeSpec::Int))
            .build()
            .unwrap();
        let app = Argonize::commands(vec![Command::sync(info, |_| Ok(()))])
            .prog("tool")
            .width(80);
        let err = app.try_run_from(&argv(&["add", "oops"])).unwrap_err();
        match err {
            RunError::Usage(err) => assert_eq!(err.prog, "tool add"),
            other => panic!("unexpected: {other}"),
        }
    }
}
