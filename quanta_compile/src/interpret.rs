use std::{cmp::Ordering, rc::Rc};

use log::debug;
use quanta_syntax::{
    ast::{BinOp, Block, FuncDecl, Ident, Node, NodeKind, TypeName, UnaryOp},
    token::{Position, Span},
};

use crate::{
    config::Config,
    environment::Context,
    error::{runtime_error, ErrorMsg, RuntimeError},
    types::{Callable, Func, Type, Value},
    units::{Phys, Unit},
};

#[derive(Default, Debug)]
pub struct Interpreter {
    pub ctx: Context,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self {
            ctx: Context::new(&config),
        }
    }

    /// Runs a whole program and returns the value of its last statement.
    /// A top-level `return` ends the program early with its payload.
    pub fn interpret(&mut self, program: &Block) -> Result<Option<Value>, RuntimeError> {
        let result = self
            .interpret_block(program)
            .map_err(|e| e.with_traceback(self.ctx.traceback()))?;
        match result {
            Some(Value {
                ty: Type::Return(value),
                ..
            }) => Ok(value.map(|v| *v)),
            Some(value) if value.is_signal() => {
                Err(stray_signal(&value).with_traceback(self.ctx.traceback()))
            }
            other => Ok(other),
        }
    }

    /// Evaluates one node. Statements yield `None`, and `return`, `break`
    /// and `continue` yield signal values that enclosing blocks pass up.
    pub fn evaluate(&mut self, node: &Node) -> Result<Option<Value>, RuntimeError> {
        let span = node.span;
        let ty = match &node.kind {
            NodeKind::Int(n) => Type::Int(*n),
            NodeKind::Double(d) => Type::Double(*d),
            NodeKind::Str(s) => Type::Str(s.clone()),
            NodeKind::Bool(b) => Type::Bool(*b),
            NodeKind::Unit {
                nominator,
                denominator,
            } => Type::Unit(self.interpret_unit(nominator, denominator, span)?),
            NodeKind::Phys { magnitude, unit } => Type::Phys(self.interpret_phys(magnitude, unit)?),
            NodeKind::Unary { op, expr } => self.interpret_unary(*op, expr, span)?,
            NodeKind::Binary { lhs, op, rhs } => self.interpret_binary(lhs, *op, rhs)?,
            NodeKind::Var(ident) => {
                self.ctx
                    .get_variable(&ident.name)
                    .map_err(|e| e.at(Some(ident.span.start)))?
                    .ty
            }
            NodeKind::Assignment { ty, ident, value } => {
                self.interpret_assignment(*ty, ident, value)?;
                return Ok(None);
            }
            NodeKind::If { cases, else_block } => {
                return self.interpret_if_stmt(cases, else_block.as_ref())
            }
            NodeKind::While { condition, body } => {
                return self.interpret_while_stmt(condition, body)
            }
            NodeKind::Function(decl) => {
                self.interpret_function(decl);
                return Ok(None);
            }
            NodeKind::Call { ident, args } => return self.interpret_func_call(ident, args, span),
            NodeKind::Return(expr) => Type::Return(match expr {
                Some(expr) => Some(Box::new(self.interpret_value(expr)?)),
                None => None,
            }),
            NodeKind::Break => Type::Break,
            NodeKind::Continue => Type::Continue,
            NodeKind::Block(block) => return self.interpret_block(block),
        };
        Ok(Some(Value::new(ty, span)))
    }

    /// Evaluates an expression that has to produce a value.
    fn interpret_value(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        self.evaluate(node)?.ok_or_else(|| {
            runtime_error(ErrorMsg::MissingValue, "expected a value").at(Some(node.span.start))
        })
    }

    /// Runs statements in order until one of them produces a signal.
    fn interpret_block(&mut self, block: &Block) -> Result<Option<Value>, RuntimeError> {
        let mut result = None;
        for item in &block.items {
            result = self.evaluate(item)?;
            if result.as_ref().is_some_and(Value::is_signal) {
                break;
            }
        }
        Ok(result)
    }

    fn interpret_condition(&mut self, node: &Node) -> Result<bool, RuntimeError> {
        let value = self.interpret_value(node)?;
        value.ty.truthy().ok_or_else(|| {
            runtime_error(
                ErrorMsg::InvalidCondition,
                format!("found {}", value.ty.name()),
            )
            .at(value.pos())
        })
    }

    fn interpret_if_stmt(
        &mut self,
        cases: &[(Node, Block)],
        else_block: Option<&Block>,
    ) -> Result<Option<Value>, RuntimeError> {
        for (condition, block) in cases {
            if self.interpret_condition(condition)? {
                return self.interpret_block(block);
            }
        }
        match else_block {
            Some(block) => self.interpret_block(block),
            None => Ok(None),
        }
    }

    fn interpret_while_stmt(
        &mut self,
        condition: &Node,
        body: &Block,
    ) -> Result<Option<Value>, RuntimeError> {
        while self.interpret_condition(condition)? {
            let result = self.interpret_block(body)?;
            match result.as_ref().map(|v| &v.ty) {
                Some(Type::Break) => break,
                Some(Type::Return(_)) => return Ok(result),
                // `continue` and plain values both move on to the next iteration
                _ => (),
            }
        }
        Ok(None)
    }

    fn interpret_unit(
        &mut self,
        nominator: &[Ident],
        denominator: &[Ident],
        span: Span,
    ) -> Result<Unit, RuntimeError> {
        Unit::from_factors(
            nominator.iter().map(|i| i.name.as_str()),
            denominator.iter().map(|i| i.name.as_str()),
        )
        .map_err(|e| e.at(Some(span.start)))
    }

    fn interpret_phys(&mut self, magnitude: &Node, unit: &Node) -> Result<Phys, RuntimeError> {
        let magnitude = self.interpret_value(magnitude)?;
        let Some(n) = magnitude.ty.number() else {
            return Err(runtime_error(
                ErrorMsg::InvalidMagnitude,
                format!("found {}", magnitude.ty.name()),
            )
            .at(magnitude.pos()));
        };
        let unit = self.interpret_value(unit)?;
        let Type::Unit(u) = &unit.ty else {
            return Err(runtime_error(
                ErrorMsg::InvalidOperation,
                format!("`&` needs a unit, found {}", unit.ty.name()),
            )
            .at(unit.pos()));
        };
        Ok(Phys::new(n, u.clone()))
    }

    fn interpret_unary(
        &mut self,
        op: UnaryOp,
        expr: &Node,
        span: Span,
    ) -> Result<Type, RuntimeError> {
        let value = self.interpret_value(expr)?;
        match op {
            UnaryOp::Plus => value.ty.identity(),
            UnaryOp::Minus => value.ty.negate(),
            UnaryOp::Not => value.ty.not(),
        }
        .map_err(|e| e.at(Some(span.start)))
    }

    fn interpret_binary(&mut self, lhs: &Node, op: BinOp, rhs: &Node) -> Result<Type, RuntimeError> {
        let left = self.interpret_value(lhs)?;
        let right = self.interpret_value(rhs)?;
        left.ty.binary(op, &right.ty).map_err(|e| {
            let pos = match e.msg {
                ErrorMsg::DivisionByZero => right.pos(),
                _ => left.pos(),
            };
            e.at(pos)
        })
    }

    fn interpret_assignment(
        &mut self,
        ty: Option<TypeName>,
        ident: &Ident,
        value: &Node,
    ) -> Result<(), RuntimeError> {
        let value = self.interpret_value(value)?;
        self.ctx
            .add_variable(&ident.name, value, ty)
            .map_err(|e| e.at(Some(ident.span.start)))
    }

    fn interpret_function(&mut self, decl: &Rc<FuncDecl>) {
        let func = Func::new(Rc::clone(decl), self.ctx.capture());
        self.ctx.add_function(func);
    }

    fn interpret_func_call(
        &mut self,
        ident: &Ident,
        arg_exprs: &[Node],
        span: Span,
    ) -> Result<Option<Value>, RuntimeError> {
        let func = self
            .ctx
            .get_function(&ident.name)
            .map_err(|e| e.at(Some(ident.span.start)))?;
        let mut args = vec![];
        for arg in arg_exprs {
            args.push(self.interpret_value(arg)?);
        }
        // Ensure the number of arguments matches the function definition
        let msg = match func.arity().cmp(&args.len()) {
            Ordering::Greater => Some(ErrorMsg::TooFewArgs),
            Ordering::Less => Some(ErrorMsg::TooManyArgs),
            Ordering::Equal => None,
        };
        if let Some(msg) = msg {
            return Err(runtime_error(
                msg,
                format!(
                    "`{}` takes {} arguments, found {}",
                    func.name(),
                    func.arity(),
                    args.len()
                ),
            )
            .at(Some(span.start)));
        }
        let result = func.call(self, args, span.start)?;
        Ok(result.map(|value| value.at(span)))
    }

    /// Calls a user function with arguments evaluated by the caller.
    pub(crate) fn call_func(
        &mut self,
        func: &Func,
        args: Vec<Value>,
        call_site: Position,
    ) -> Result<Option<Value>, RuntimeError> {
        for (param, arg) in func.params().iter().zip(&args) {
            if !arg.ty.is(param.ty) {
                return Err(runtime_error(
                    ErrorMsg::ArgTypeMismatch,
                    format!(
                        "parameter `{}` of `{}` is {}, found {}",
                        param.ident,
                        func.name(),
                        param.ty,
                        arg.ty.name()
                    ),
                )
                .at(arg.pos()));
            }
        }

        self.ctx
            .switch_context_to(func, call_site)
            .map_err(|e| e.at(Some(call_site)))?;
        debug!("Call {func}");
        for (param, arg) in func.params().iter().zip(args) {
            self.ctx.bind(&param.ident.name, arg);
        }
        let res = self
            .interpret_block(func.body())
            .and_then(|result| check_return(func, result))
            .map_err(|e| e.at(Some(call_site)).with_traceback(self.ctx.traceback()));
        // Restore the caller's context whatever happened in the body
        self.ctx.switch_to_parent_context()?;
        res
    }
}

/// Unwraps the value a function body produced and checks it against the
/// declared return type.
fn check_return(func: &Func, result: Option<Value>) -> Result<Option<Value>, RuntimeError> {
    let value = match result {
        Some(Value {
            ty: Type::Return(value),
            ..
        }) => value.map(|v| *v),
        Some(value) if value.is_signal() => return Err(stray_signal(&value)),
        other => other,
    };
    let name = func.name();
    match (func.return_type(), value) {
        (TypeName::Void, None) => Ok(None),
        (ty, Some(value)) if value.ty.is(ty) => Ok(Some(value)),
        (ty, Some(value)) => Err(runtime_error(
            ErrorMsg::ReturnTypeMismatch,
            format!("`{name}` returns {ty}, found {}", value.ty.name()),
        )
        .at(value.pos())),
        (ty, None) => Err(runtime_error(
            ErrorMsg::ReturnTypeMismatch,
            format!("`{name}` returns {ty}, found no value"),
        )),
    }
}

fn stray_signal(value: &Value) -> RuntimeError {
    runtime_error(
        ErrorMsg::SignalOutsideLoop,
        format!("`{}` outside of a loop", value.ty),
    )
    .at(value.pos())
}
