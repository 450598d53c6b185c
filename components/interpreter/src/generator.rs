//! Generator objects as saved call frames.
//!
//! A generator owns the frame of its function while suspended. Resuming
//! pushes that frame back onto the interpreter stack and re-enters the
//! dispatch loop; `Yield` pops it off again and hands it back.

use core_types::{HeapRef, Value};

use crate::call_frame::CallFrame;
use crate::dispatch::Completion;
use crate::error::{malformed, JsResult, Throw};
use crate::object::ObjectClass;
use crate::runtime::Runtime;

/// Lifecycle of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Created, body not entered yet.
    SuspendedStart,
    /// Stopped at a `yield`.
    SuspendedYield,
    /// Body currently on the interpreter stack.
    Executing,
    /// Returned or threw; never runs again.
    Completed,
}

/// How a suspended generator is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    Next,
    Return,
    Throw,
}

/// Heap payload of a generator object.
#[derive(Debug)]
pub struct GeneratorData {
    pub state: GeneratorState,
    /// The suspended frame; `None` while executing or once completed.
    pub(crate) frame: Option<Box<CallFrame>>,
}

impl GeneratorData {
    pub(crate) fn new(frame: CallFrame) -> Self {
        Self {
            state: GeneratorState::SuspendedStart,
            frame: Some(Box::new(frame)),
        }
    }
}

impl Runtime {
    fn generator_data(&mut self, gen: HeapRef) -> JsResult<&mut GeneratorData> {
        if !matches!(self.object_mut(gen)?.class, ObjectClass::Generator(_)) {
            return self.throw_type_error("next method called on incompatible receiver");
        }
        match &mut self.object_mut(gen)?.class {
            ObjectClass::Generator(data) => Ok(data),
            _ => unreachable!("class checked above"),
        }
    }

    /// State of generator `gen`, or `None` if it is not a generator.
    pub fn generator_state(&self, gen: HeapRef) -> JsResult<Option<GeneratorState>> {
        Ok(match &self.object(gen)?.class {
            ObjectClass::Generator(data) => Some(data.state),
            _ => None,
        })
    }

    /// Resume `gen`, returning `(value, done)` like an iterator result.
    pub fn generator_resume(
        &mut self,
        gen: HeapRef,
        mode: ResumeMode,
        value: Value,
    ) -> JsResult<(Value, bool)> {
        let data = self.generator_data(gen)?;
        match data.state {
            GeneratorState::Executing => {
                return self.throw_type_error("Generator is already running");
            }
            GeneratorState::SuspendedStart if mode != ResumeMode::Next => {
                data.state = GeneratorState::Completed;
                data.frame = None;
            }
            _ => {}
        }
        if data.state == GeneratorState::Completed {
            return match mode {
                ResumeMode::Next => Ok((Value::Undefined, true)),
                ResumeMode::Return => Ok((value, true)),
                ResumeMode::Throw => Err(Throw::Value(value)),
            };
        }

        let Some(mut frame) = data.frame.take() else {
            return malformed("suspended generator without a frame");
        };
        if self.frames.len() >= self.config.max_frames {
            self.generator_data(gen)?.frame = Some(frame);
            return self.throw_range_error("Maximum call stack size exceeded");
        }
        self.generator_data(gen)?.state = GeneratorState::Executing;
        frame.resume = Some((mode, value));
        let entry_depth = self.frames.len();
        self.frames.push(*frame);

        let outcome = self.execute(entry_depth);
        let data = self.generator_data(gen)?;
        match outcome {
            Ok(Completion::Yield(v)) => {
                data.state = GeneratorState::SuspendedYield;
                Ok((v, false))
            }
            Ok(Completion::Return(v)) => {
                data.state = GeneratorState::Completed;
                data.frame = None;
                Ok((v, true))
            }
            Err(e) => {
                data.state = GeneratorState::Completed;
                data.frame = None;
                Err(e)
            }
        }
    }
}
