//! # Argonize Architecture
//!
//! Argonize synthesizes a **complete command-line surface from a declared
//! callable signature**: flags, coercion, colorized help, and dispatch all
//! derive from the parameters a handler says it takes. Nothing is declared
//! twice: the signature is the single source of truth.
//!
//! ## The Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatch Layer (dispatch.rs)                               │
//! │  - Commands: a FunctionInfo paired with a handler closure   │
//! │  - Single and sub-command modes, sync and async handlers    │
//! │  - Reassembles parsed values into call arguments            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Parser Layer (parser.rs, help.rs)                          │
//! │  - Tokenizer, argument registry, mutex groups, @file        │
//! │  - Colorized usage/help rendering on structured parts       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Derivation Layer (signature.rs, types.rs, flags.rs,        │
//! │  docs.rs)                                                   │
//! │  - Declared parameters -> candidate coercers, flags, help   │
//! │  - Collision-avoiding flag generation over a reserved set   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Text Layer (color.rs, wrap.rs, value.rs, error.rs)         │
//! │  - ANSI-aware width measurement and wrapping                │
//! │  - The dynamic Value type and the error taxonomy            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error discipline
//!
//! Setup problems ([`ConfigError`]) abort construction before any argv
//! token is read; user mistakes ([`UsageError`]) are reported with the
//! usage line and exit code 2 through the exiting entry points, or handed
//! back intact through the `try_` variants. Handler failures pass through
//! the dispatcher unmodified.
//!
//! ## Quick start
//!
//! ```no_run
//! use argonize::{argonize, Command, FunctionInfo, Parameter, TypeSpec};
//!
//! let info = FunctionInfo::builder("greet")
//!     .doc("Greets someone.\n\n:param name: who to greet")
//!     .param(Parameter::positional_only("name"))
//!     .param(Parameter::keyword_only("shout").annotation(TypeSpec::Bool))
//!     .build()
//!     .unwrap();
//!
//! argonize(Command::sync(info, |args| {
//!     let name = args.positional[0].as_str().unwrap_or_default();
//!     let shout = args.get("shout").and_then(|v| v.as_bool()).unwrap_or(false);
//!     let line = format!("Hello, {name}!");
//!     println!("{}", if shout { line.to_uppercase() } else { line });
//!     Ok(())
//! }))
//! .unwrap();
//! ```

pub mod color;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod flags;
pub mod help;
pub mod parser;
pub mod signature;
pub mod types;
pub mod value;
pub mod wrap;

pub use dispatch::{argonize, argonize_commands, Argonize, CallArgs, Command, Outcome, Run};
pub use error::{ConfigError, DynError, Result, RunError, UsageError, USAGE_EXIT_CODE};
pub use help::HelpColors;
pub use parser::{Namespace, Parsed, Parser};
pub use signature::{FunctionInfo, FunctionInfoBuilder, ParamKind, Parameter};
pub use types::{Coercer, ResolvedType, TypeSpec};
pub use value::Value;
