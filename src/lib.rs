//! A tiny interactive shell for constrained environments.
//!
//! This crate provides a minimal read-eval loop over a fixed table of
//! builtin commands. Each line read from standard input is split into
//! whitespace-separated tokens, the first token is resolved against the
//! command table, and the matching builtin runs either directly in the
//! shell process or in a forked child whose exit status is reaped and
//! reported back to the loop.
//!
//! The main entry point is [`Interpreter`], which owns the shell context
//! and drives the loop. The public modules [`command`] and [`env`] expose
//! the command table and the mutable shell environment.

mod builtin;
pub mod command;
pub mod env;
mod executor;
mod interpreter;
mod lexer;
mod line;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
