//! `console` object and the writers it prints through

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use core_types::Value;
use interpreter::{CallArgs, JsResult, Runtime};

use crate::symbol::symbol_descriptive_string;
use crate::{method_with_magic, namespace};

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

impl ConsoleLevel {
    const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Debug,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
    ];

    /// The `console` method name for this level.
    pub fn name(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Debug => "debug",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        }
    }

    /// Whether the line belongs on the host's error channel.
    pub fn is_error_channel(self) -> bool {
        matches!(self, ConsoleLevel::Warn | ConsoleLevel::Error)
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Console output writer trait
pub trait ConsoleWriter {
    /// Write one formatted line
    fn write(&self, level: ConsoleLevel, line: &str);
}

/// Prints `log`/`info`/`debug` to stdout and `warn`/`error` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl ConsoleWriter for StdoutWriter {
    fn write(&self, level: ConsoleLevel, line: &str) {
        if level.is_error_channel() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Writer that records every line; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct CaptureWriter {
    output: Rc<RefCell<Vec<(ConsoleLevel, String)>>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured lines, all levels, in order.
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().iter().map(|(_, l)| l.clone()).collect()
    }

    /// Captured lines with their levels.
    pub fn entries(&self) -> Vec<(ConsoleLevel, String)> {
        self.output.borrow().clone()
    }

    pub fn clear(&self) {
        self.output.borrow_mut().clear();
    }
}

impl ConsoleWriter for CaptureWriter {
    fn write(&self, level: ConsoleLevel, line: &str) {
        self.output.borrow_mut().push((level, line.to_string()));
    }
}

/// Host data behind the `console` natives.
struct ConsoleState {
    writer: Box<dyn ConsoleWriter>,
    timers: RefCell<HashMap<String, Instant>>,
}

const MAGIC_ASSERT: u32 = 100;
const MAGIC_TIME: u32 = 101;
const MAGIC_TIME_END: u32 = 102;

pub(crate) fn install(rt: &mut Runtime, writer: Box<dyn ConsoleWriter>) -> JsResult<()> {
    let console = namespace(rt, "console")?;
    for (magic, level) in ConsoleLevel::ALL.into_iter().enumerate() {
        method_with_magic(rt, console, level.name(), 0, console_print, magic as u32)?;
    }
    method_with_magic(rt, console, "assert", 0, console_print, MAGIC_ASSERT)?;
    method_with_magic(rt, console, "time", 0, console_timer, MAGIC_TIME)?;
    method_with_magic(rt, console, "timeEnd", 0, console_timer, MAGIC_TIME_END)?;
    rt.set_host_data(ConsoleState {
        writer,
        timers: RefCell::new(HashMap::new()),
    });
    Ok(())
}

/// Render arguments the way `console.log` joins them.
pub(crate) fn format_values(rt: &mut Runtime, values: &[Value]) -> JsResult<String> {
    let mut parts = Vec::with_capacity(values.len());
    for v in values {
        let part = match v {
            Value::Symbol(id) => symbol_descriptive_string(rt, *id),
            other => rt.to_string(other)?.to_string(),
        };
        parts.push(part);
    }
    Ok(parts.join(" "))
}

fn emit(rt: &Runtime, level: ConsoleLevel, line: &str) {
    if let Some(state) = rt.host_data::<ConsoleState>() {
        state.writer.write(level, line);
    }
}

fn console_print(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    if args.magic == MAGIC_ASSERT {
        if args.arg(0).is_truthy() {
            return Ok(Value::Undefined);
        }
        let rest = format_values(rt, args.args.get(1..).unwrap_or(&[]))?;
        let line = if rest.is_empty() {
            String::from("Assertion failed")
        } else {
            format!("Assertion failed: {}", rest)
        };
        emit(rt, ConsoleLevel::Error, &line);
        return Ok(Value::Undefined);
    }
    let level = ConsoleLevel::ALL
        .get(args.magic as usize)
        .copied()
        .unwrap_or(ConsoleLevel::Log);
    let line = format_values(rt, &args.args)?;
    emit(rt, level, &line);
    Ok(Value::Undefined)
}

fn console_timer(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let label = match args.arg(0) {
        Value::Undefined => String::from("default"),
        v => rt.to_string(&v)?.to_string(),
    };
    let Some(state) = rt.host_data::<ConsoleState>() else {
        return Ok(Value::Undefined);
    };
    if args.magic == MAGIC_TIME {
        state.timers.borrow_mut().insert(label, Instant::now());
        return Ok(Value::Undefined);
    }
    let started = state.timers.borrow_mut().remove(&label);
    let line = match started {
        Some(start) => format!("{}: {}ms", label, start.elapsed().as_millis()),
        None => format!("Timer '{}' does not exist", label),
    };
    let level = if started.is_some() {
        ConsoleLevel::Log
    } else {
        ConsoleLevel::Warn
    };
    state.writer.write(level, &line);
    Ok(Value::Undefined)
}
