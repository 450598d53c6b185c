//! Integration test suite for Corten JavaScript Runtime
//!
//! Shared harness for the workspace-level tests: a runtime with the
//! standard library installed and captured console output, plus the
//! bytecode programs several tests run.

use builtins::CaptureWriter;
use bytecode_system::{BytecodeModule, FunctionBuilder, ModuleBuilder, Opcode};
use core_types::Value;
use interpreter::{EngineError, Runtime, RuntimeConfig};

/// Re-export components for test convenience
pub mod components {
    pub use builtins;
    pub use bytecode_system;
    pub use core_types;
    pub use interpreter;
    pub use js_cli;
    pub use memory_manager;
}

/// A runtime with builtins installed.
pub struct Harness {
    pub rt: Runtime,
    pub console: CaptureWriter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut rt = Runtime::new(config).expect("runtime");
        let console = CaptureWriter::new();
        builtins::install(&mut rt, Box::new(console.clone())).expect("builtins");
        Self { rt, console }
    }

    /// Load and run `module`.
    pub fn run(&mut self, module: BytecodeModule) -> Result<Value, EngineError> {
        let id = self.rt.load_module(module)?;
        self.rt.run_module(id)
    }

    /// `globalThis[name]`.
    pub fn global(&mut self, name: &str) -> Value {
        let global = Value::Object(self.rt.global_object());
        self.rt.get_by_name(&global, name).expect("global lookup")
    }

    /// `globalThis[ns][method](...args)`, panicking on a throw.
    pub fn call_static(&mut self, ns: &str, method: &str, args: Vec<Value>) -> Value {
        let target = self.global(ns);
        self.rt
            .invoke(&target, method, args)
            .unwrap_or_else(|_| panic!("{}.{} threw", ns, method))
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A module whose entry is `main`, assembled by `build`.
pub fn single_function(
    url: &str,
    build: impl FnOnce(&mut FunctionBuilder, &mut ModuleBuilder),
) -> BytecodeModule {
    let mut m = ModuleBuilder::new(url);
    let mut main = FunctionBuilder::new("main", 0);
    build(&mut main, &mut m);
    let entry = m.add_function(main.finish().expect("main"));
    m.set_entry(entry);
    m.finish().expect("module")
}

/// `function fib(n){ return n<2?n:fib(n-1)+fib(n-2); } fib(n)`
pub fn fib_module(n: i32) -> BytecodeModule {
    let mut m = ModuleBuilder::new("fib.js");
    let fib_name = m.string("fib");
    let fib = m.reserve_function();

    let mut f = FunctionBuilder::new("fib", 1);
    let n_reg = f.param(0);
    let (two, one, cond) = (f.reg(), f.reg(), f.reg());
    let (callee, this, arg, a, b) = (f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
    let recurse = f.new_label();
    f.emit(Opcode::LoadInt { dst: two, value: 2 });
    f.emit(Opcode::Less { dst: cond, lhs: n_reg, rhs: two });
    f.jmp_false(cond, recurse);
    f.emit(Opcode::Return { value: n_reg });
    f.bind(recurse);
    f.emit(Opcode::GetGlobal { dst: callee, name: fib_name });
    f.emit(Opcode::LoadUndefined { dst: this });
    f.emit(Opcode::LoadInt { dst: one, value: 1 });
    f.emit(Opcode::Sub { dst: arg, lhs: n_reg, rhs: one });
    f.emit(Opcode::Call { dst: a, callee, this, first_arg: arg, argc: 1 });
    f.emit(Opcode::Sub { dst: arg, lhs: n_reg, rhs: two });
    f.emit(Opcode::Call { dst: b, callee, this, first_arg: arg, argc: 1 });
    f.emit(Opcode::Add { dst: a, lhs: a, rhs: b });
    f.emit(Opcode::Return { value: a });
    m.define_function(fib, f.finish().expect("fib"));

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, closure, arg, result) = (main.reg(), main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::DeclareGlobal { name: fib_name });
    main.emit(Opcode::CreateClosure { dst: closure, env: undef, function: fib });
    main.emit(Opcode::PutGlobal { name: fib_name, value: closure });
    main.emit(Opcode::LoadInt { dst: arg, value: n });
    main.emit(Opcode::Call { dst: result, callee: closure, this: undef, first_arg: arg, argc: 1 });
    main.emit(Opcode::Return { value: result });
    let entry = m.add_function(main.finish().expect("main"));
    m.set_entry(entry);
    m.finish().expect("module")
}

/// ```js
/// function make() { let x = 0; return [() => x++, () => x]; }
/// const [inc, get] = make(); inc(); inc(); get()
/// ```
pub fn closure_pair_module() -> BytecodeModule {
    let mut m = ModuleBuilder::new("pair.js");

    let mut inc = FunctionBuilder::new("", 0).arrow();
    let (env, old, new) = (inc.reg(), inc.reg(), inc.reg());
    inc.emit(Opcode::GetEnvironment { dst: env, depth: 0 });
    inc.emit(Opcode::LoadFromEnvironment { dst: old, env, slot: 0 });
    inc.emit(Opcode::ToNumeric { dst: old, src: old });
    inc.emit(Opcode::Inc { dst: new, src: old });
    inc.emit(Opcode::StoreToEnvironment { env, slot: 0, value: new });
    inc.emit(Opcode::Return { value: old });
    let inc = m.add_function(inc.finish().expect("inc"));

    let mut get = FunctionBuilder::new("", 0).arrow();
    let (env, v) = (get.reg(), get.reg());
    get.emit(Opcode::GetEnvironment { dst: env, depth: 0 });
    get.emit(Opcode::LoadFromEnvironment { dst: v, env, slot: 0 });
    get.emit(Opcode::Return { value: v });
    let get = m.add_function(get.finish().expect("get"));

    let mut make = FunctionBuilder::new("make", 0);
    let (env, zero, pair) = (make.reg(), make.reg(), make.regs(2));
    make.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    make.emit(Opcode::LoadInt { dst: zero, value: 0 });
    make.emit(Opcode::StoreToEnvironment { env, slot: 0, value: zero });
    make.emit(Opcode::CreateClosure { dst: pair, env, function: inc });
    make.emit(Opcode::CreateClosure {
        dst: bytecode_system::RegisterId(pair.0 + 1),
        env,
        function: get,
    });
    make.emit(Opcode::NewArrayFrom { dst: zero, first: pair, count: 2 });
    make.emit(Opcode::Return { value: zero });
    let make = m.add_function(make.finish().expect("make"));

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, maker, arr, idx, inc_fn, get_fn, r) = (
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: maker, env: undef, function: make });
    main.emit(Opcode::Call { dst: arr, callee: maker, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::LoadInt { dst: idx, value: 0 });
    main.emit(Opcode::GetByVal { dst: inc_fn, obj: arr, key: idx });
    main.emit(Opcode::LoadInt { dst: idx, value: 1 });
    main.emit(Opcode::GetByVal { dst: get_fn, obj: arr, key: idx });
    for _ in 0..2 {
        main.emit(Opcode::Call { dst: r, callee: inc_fn, this: undef, first_arg: undef, argc: 0 });
    }
    main.emit(Opcode::Call { dst: r, callee: get_fn, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Return { value: r });
    let entry = m.add_function(main.finish().expect("main"));
    m.set_entry(entry);
    m.finish().expect("module")
}

/// `function f(){ try { return 1 } finally { return 2 } } f()`
///
/// The try block's return is compiled the way a front end lowers it: the
/// pending completion is parked in a register and control jumps to the
/// finally block, whose own `return` wins.
pub fn finally_override_module() -> BytecodeModule {
    let mut m = ModuleBuilder::new("finally.js");

    let mut f = FunctionBuilder::new("f", 0);
    let (pending, e, two) = (f.reg(), f.reg(), f.reg());
    let (start, end, handler, fin) = (f.new_label(), f.new_label(), f.new_label(), f.new_label());
    f.bind(start);
    f.emit(Opcode::LoadInt { dst: pending, value: 1 });
    f.jmp(fin);
    f.bind(end);
    f.bind(handler);
    f.emit(Opcode::Catch { dst: e });
    f.bind(fin);
    f.emit(Opcode::LoadInt { dst: two, value: 2 });
    f.emit(Opcode::Return { value: two });
    f.handler(start, end, handler);
    let f_index = m.add_function(f.finish().expect("f"));

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, closure, r) = (main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: closure, env: undef, function: f_index });
    main.emit(Opcode::Call { dst: r, callee: closure, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Return { value: r });
    let entry = m.add_function(main.finish().expect("main"));
    m.set_entry(entry);
    m.finish().expect("module")
}
