//! Statement-level interpreter with explicit suspension points.
//!
//! The evaluator calls [`StepHook::suspend`] before every statement it is
//! about to execute, before every `elif` test, and each time a loop header
//! runs again. The hook decides whether to block, stop, or carry on. The
//! evaluator itself knows nothing about threads or drivers.

use std::rc::Rc;

use gridbot_types::ast::*;
use gridbot_world::{Action, ActionValue, AllowedFunctions, World};

use crate::budget::Budget;
use crate::builtins::{call_method, iterate, Builtin};
use crate::config::EngineConfig;
use crate::env::Environment;
use crate::error::{FaultKind, Flow, Halt, RuntimeFault};
use crate::ops;
use crate::value::{compare_values, values_equal, Key, Range, Value};

/// Called at every suspension point with the line about to run.
pub trait StepHook {
    fn suspend(&mut self, line: u32, world: &World) -> Result<(), Halt>;
}

impl<F> StepHook for F
where
    F: FnMut(u32, &World) -> Result<(), Halt>,
{
    fn suspend(&mut self, line: u32, world: &World) -> Result<(), Halt> {
        self(line, world)
    }
}

type Exec = Result<(), Flow>;
type Eval = Result<Value, Flow>;

/// Items a `for` loop walks; ranges are produced lazily.
enum LoopItems {
    Range { range: Range, next: usize },
    Items(std::vec::IntoIter<Value>),
}

impl Iterator for LoopItems {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            LoopItems::Range { range, next } => {
                let value = range.get(*next)?;
                *next += 1;
                Some(Value::Int(value))
            }
            LoopItems::Items(items) => items.next(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Evaluator
// ══════════════════════════════════════════════════════════════════════════════

pub struct Evaluator<H> {
    world: World,
    env: Environment,
    allowed: AllowedFunctions,
    config: EngineConfig,
    budget: Budget,
    hook: H,
}

impl<H: StepHook> Evaluator<H> {
    pub fn new(world: World, allowed: AllowedFunctions, config: EngineConfig, hook: H) -> Self {
        Self {
            world,
            env: Environment::new(),
            allowed,
            budget: Budget::from_config(&config),
            config,
            hook,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    pub fn into_parts(self) -> (World, H) {
        (self.world, self.hook)
    }

    /// Run `program` to the end, or until a fault or the hook stops it.
    pub fn run(&mut self, program: &Program) -> Result<(), Halt> {
        match self.exec_block(&program.body) {
            Err(Flow::Halt(halt)) => Err(halt),
            // `break`, `continue` and `return` cannot reach the top level of
            // a parsed program.
            Ok(()) | Err(Flow::Break | Flow::Continue | Flow::Return(_)) => Ok(()),
        }
    }

    /// Suspend before `line`; the work allowance starts over afterwards.
    fn pause(&mut self, line: u32) -> Exec {
        self.hook.suspend(line, &self.world).map_err(Flow::Halt)?;
        self.budget.refill();
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_block(&mut self, body: &[Stmt]) -> Exec {
        for stmt in body {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Exec {
        self.pause(stmt.line())?;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                Ok(())
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value),
            StmtKind::If(if_stmt) => self.exec_if(if_stmt),
            StmtKind::While { condition, body } => self.exec_while(stmt.line(), condition, body),
            StmtKind::For {
                target,
                iterable,
                body,
            } => self.exec_for(stmt.line(), target, iterable, body),
            StmtKind::FunctionDef(def) => {
                self.env
                    .set(&def.name.name, Value::Function(Rc::new(def.clone())));
                Ok(())
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                Err(Flow::Return(value))
            }
            StmtKind::Global(names) => {
                for name in names {
                    self.env.declare_global(&name.name);
                }
                Ok(())
            }
            StmtKind::Break => Err(Flow::Break),
            StmtKind::Continue => Err(Flow::Continue),
            StmtKind::Pass => Ok(()),
            StmtKind::Import(import) => Err(RuntimeFault::new(
                FaultKind::NameError,
                format!("import of '{}' is not allowed", import.module),
            )
            .into()),
        }
    }

    fn exec_if(&mut self, node: &IfStmt) -> Exec {
        if self.eval(&node.condition)?.is_truthy() {
            return self.exec_block(&node.then_body);
        }
        match &node.else_branch {
            Some(ElseBranch::Elif(elif)) => {
                self.pause(elif.span.line)?;
                self.exec_if(elif)
            }
            Some(ElseBranch::Else(body)) => self.exec_block(body),
            None => Ok(()),
        }
    }

    /// Runs one loop body; `Ok(false)` means `break`.
    fn exec_loop_body(&mut self, body: &[Stmt]) -> Result<bool, Flow> {
        match self.exec_block(body) {
            Ok(()) | Err(Flow::Continue) => Ok(true),
            Err(Flow::Break) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn exec_while(&mut self, line: u32, condition: &Expr, body: &[Stmt]) -> Exec {
        let mut first = true;
        loop {
            if !first {
                self.pause(line)?;
            }
            first = false;
            if !self.eval(condition)?.is_truthy() || !self.exec_loop_body(body)? {
                return Ok(());
            }
        }
    }

    fn exec_for(&mut self, line: u32, target: &Ident, iterable: &Expr, body: &[Stmt]) -> Exec {
        let source = self.eval(iterable)?;
        let mut items = match source {
            Value::Range(range) => LoopItems::Range { range, next: 0 },
            other => LoopItems::Items(iterate(&other, &self.budget)?.into_iter()),
        };
        let mut first = true;
        loop {
            if !first {
                self.pause(line)?;
            }
            first = false;
            let Some(item) = items.next() else {
                return Ok(());
            };
            self.env.set(&target.name, item);
            if !self.exec_loop_body(body)? {
                return Ok(());
            }
        }
    }

    fn assign(&mut self, target: &Target, value: Value) -> Exec {
        match target {
            Target::Name(ident) => {
                self.env.set(&ident.name, value);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::store_subscript(&object, &index, value, &self.budget)?;
                Ok(())
            }
        }
    }

    fn exec_aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Exec {
        match target {
            Target::Name(ident) => {
                let current = self.lookup(&ident.name)?;
                let value = self.eval(value)?;
                let result = self.augmented(op, current, &value)?;
                self.env.set(&ident.name, result);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = ops::subscript(&object, &index)?;
                let value = self.eval(value)?;
                let result = self.augmented(op, current, &value)?;
                ops::store_subscript(&object, &index, result, &self.budget)?;
                Ok(())
            }
        }
    }

    /// `list += list` extends in place; everything else rebinds.
    fn augmented(&self, op: BinOp, current: Value, value: &Value) -> Result<Value, RuntimeFault> {
        if let (BinOp::Add, Value::List(items), Value::List(extra)) = (op, &current, value) {
            let extra = extra.borrow().clone();
            self.budget.check_len(items.borrow().len() + extra.len())?;
            self.budget.charge(extra.len())?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        ops::binary(op, &current, value, &self.budget)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Flow> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval(&mut self, expr: &Expr) -> Eval {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::None => Ok(Value::None),
            ExprKind::Name(name) => Ok(self.lookup(name)?),

            ExprKind::List(items) => {
                let items = self.eval_all(items)?;
                self.budget.alloc(items.len())?;
                Ok(Value::list(items))
            }
            ExprKind::Set(items) => {
                let mut set = std::collections::BTreeSet::new();
                for item in self.eval_all(items)? {
                    set.insert(Key::try_from(&item)?);
                }
                self.budget.alloc(set.len())?;
                Ok(Value::set(set))
            }
            ExprKind::Dict(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    pairs.push((key, value));
                }
                Ok(ops::build_dict(pairs, &self.budget)?)
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(ops::unary(*op, &operand)?)
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(ops::binary(*op, &left, &right, &self.budget)?)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            ExprKind::Compare { first, rest } => self.eval_compare(first, rest),

            ExprKind::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = self.eval_all(args)?;
                self.call(callee, args)
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => {
                let object = self.eval(object)?;
                let args = self.eval_all(args)?;
                Ok(call_method(&object, &method.name, args, &self.budget)?)
            }
            ExprKind::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(ops::subscript(&object, &index)?)
            }
        }
    }

    fn eval_compare(&mut self, first: &Expr, rest: &[(CmpOp, Expr)]) -> Eval {
        let mut left = self.eval(first)?;
        for (op, right) in rest {
            let right = self.eval(right)?;
            let budget = &self.budget;
            let holds = match op {
                CmpOp::Eq => values_equal(&left, &right, budget)?,
                CmpOp::NotEq => !values_equal(&left, &right, budget)?,
                CmpOp::Lt => compare_values(&left, &right, budget)?.is_lt(),
                CmpOp::Gt => compare_values(&left, &right, budget)?.is_gt(),
                CmpOp::LtE => compare_values(&left, &right, budget)?.is_le(),
                CmpOp::GtE => compare_values(&left, &right, budget)?.is_ge(),
                CmpOp::In => ops::contains(&right, &left, budget)?,
                CmpOp::NotIn => !ops::contains(&right, &left, budget)?,
            };
            if !holds {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }

    /// Variables first, then builtins, then the actions this level allows.
    fn lookup(&self, name: &str) -> Result<Value, RuntimeFault> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Value::Builtin(builtin));
        }
        match Action::from_name(name) {
            Some(action) if self.allowed.allows(action) => Ok(Value::Action(action)),
            _ => Err(RuntimeFault::name_error(name)),
        }
    }

    // ── Calls ──

    fn call(&mut self, callee: Value, args: Vec<Value>) -> Eval {
        match callee {
            Value::Function(def) => self.call_function(&def, args),
            Value::Builtin(builtin) => Ok(builtin.call(args, &self.budget)?),
            Value::Action(action) => Ok(self.call_action(action, &args)?),
            other => Err(RuntimeFault::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))
            .into()),
        }
    }

    fn call_action(&mut self, action: Action, args: &[Value]) -> Result<Value, RuntimeFault> {
        let context = format!("{action}()");
        let ints = args
            .iter()
            .map(|arg| arg.expect_int(&context))
            .collect::<Result<Vec<_>, _>>()?;
        let value = match self.world.perform(action, &ints)? {
            ActionValue::None => Value::None,
            ActionValue::Int(n) => Value::Int(n),
            ActionValue::Bool(b) => Value::Bool(b),
        };
        Ok(value)
    }

    fn call_function(&mut self, def: &FunctionDef, args: Vec<Value>) -> Eval {
        if def.params.len() != args.len() {
            return Err(RuntimeFault::type_error(format!(
                "{}() takes {} positional argument(s) but {} were given",
                def.name.name,
                def.params.len(),
                args.len()
            ))
            .into());
        }
        if self.env.depth() >= self.config.max_call_depth {
            return Err(RuntimeFault::new(
                FaultKind::RecursionError,
                "maximum recursion depth exceeded",
            )
            .into());
        }
        self.env.push_frame();
        for (param, arg) in def.params.iter().zip(args) {
            self.env.set(&param.name, arg);
        }
        let result = self.exec_block(&def.body);
        self.env.pop_frame();
        match result {
            Ok(()) | Err(Flow::Break | Flow::Continue) => Ok(Value::None),
            Err(Flow::Return(value)) => Ok(value),
            Err(halt) => Err(halt),
        }
    }
}
