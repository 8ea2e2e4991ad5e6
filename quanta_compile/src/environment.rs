use std::{collections::HashMap, rc::Rc};

use log::debug;
use quanta_syntax::{ast::TypeName, token::Position};

use crate::{
    config::Config,
    error::{runtime_error, ErrorMsg, Frame, RuntimeError},
    stdlib,
    types::{Callable, Func, NativeFunc, Type, Value},
};

/// Name of the outermost frame, the program itself.
pub const MAIN: &str = "<main>";

pub type Bindings = HashMap<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: Self = Self(0);
}

#[derive(Debug, Default)]
struct Scope {
    values: Bindings,
    parent: Option<ScopeId>,
}

impl Scope {
    fn set(&mut self, name: &str, value: Value) {
        debug!("Set {name} -> {value}");
        self.values.insert(name.to_string(), value);
    }
}

/// Owns every live scope and the matching call stack.
///
/// Scope `i` belongs to call frame `i`: index 0 is the global scope of
/// `<main>`, and each function call pushes one scope whose parent is the
/// global scope. Frames are pushed and popped strictly in call order.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
    call_stack: Vec<Frame>,
    max_call_depth: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Context {
    pub fn new(config: &Config) -> Self {
        let mut ctx = Self {
            scopes: vec![Scope::default()],
            call_stack: vec![Frame {
                name: MAIN.to_string(),
                call_site: Position::default(),
            }],
            max_call_depth: config.max_call_depth,
        };
        stdlib::init(&mut ctx);
        ctx
    }

    pub fn current(&self) -> ScopeId {
        ScopeId(self.scopes.len() - 1)
    }

    /// Number of function calls currently in progress.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    fn resolve(&self, name: &str) -> Option<ScopeId> {
        let mut id = Some(self.current());
        while let Some(ScopeId(i)) = id {
            let scope = &self.scopes[i];
            if scope.values.contains_key(name) {
                return Some(ScopeId(i));
            }
            id = scope.parent;
        }
        None
    }

    fn scope_mut(&mut self, ScopeId(i): ScopeId) -> &mut Scope {
        &mut self.scopes[i]
    }

    /// Returns a copy of the nearest visible binding of `name`.
    pub fn get_variable(&self, name: &str) -> Result<Value, RuntimeError> {
        debug!("Get {name}");
        self.resolve(name)
            .and_then(|ScopeId(i)| self.scopes[i].values.get(name))
            .cloned()
            .ok_or_else(|| runtime_error(ErrorMsg::UndefinedVar, format!("`{name}` not defined")))
    }

    /// Binds `name` to `value`.
    ///
    /// With a declared type, the value must have exactly that type and the
    /// binding is created in the current scope, shadowing any outer one.
    /// Without one, the name must already be visible with a value of the
    /// same type, and that binding is updated.
    pub fn add_variable(
        &mut self,
        name: &str,
        value: Value,
        declared: Option<TypeName>,
    ) -> Result<(), RuntimeError> {
        if let Some(ty) = declared {
            if !value.ty.is(ty) {
                return Err(runtime_error(
                    ErrorMsg::DeclaredTypeMismatch,
                    format!("`{name}` is declared {ty}, found {}", value.ty.name()),
                ));
            }
            let current = self.current();
            self.scope_mut(current).set(name, value);
            return Ok(());
        }

        let Some(id) = self.resolve(name) else {
            return Err(runtime_error(
                ErrorMsg::UndefinedVar,
                format!("`{name}` not defined, a first assignment needs a type"),
            ));
        };
        let scope = self.scope_mut(id);
        if let Some(existing) = scope.values.get(name) {
            if !existing.ty.same_kind(&value.ty) {
                return Err(runtime_error(
                    ErrorMsg::ReassignTypeMismatch,
                    format!(
                        "`{name}` is {}, found {}",
                        existing.ty.name(),
                        value.ty.name()
                    ),
                ));
            }
        }
        debug!("Assign {name} in {id:?}");
        scope.set(name, value);
        Ok(())
    }

    /// Binds a parameter in the current scope, whatever is visible outside.
    pub fn bind(&mut self, name: &str, value: Value) {
        let current = self.current();
        self.scope_mut(current).set(name, value);
    }

    pub fn add_function(&mut self, func: Func) {
        debug!("Define {func}");
        let name = func.name().to_string();
        self.scope_mut(ScopeId::GLOBAL)
            .set(&name, Value::from(Type::Func(func)));
    }

    pub fn add_native(&mut self, func: NativeFunc) {
        let name = func.name.clone();
        self.scope_mut(ScopeId::GLOBAL)
            .set(&name, Value::from(Type::NativeFunc(func)));
    }

    /// Looks `name` up in the global function table.
    pub fn get_function(&self, name: &str) -> Result<Box<dyn Callable>, RuntimeError> {
        debug!("Get function {name}");
        let Some(value) = self.scopes[ScopeId::GLOBAL.0].values.get(name) else {
            return Err(runtime_error(
                ErrorMsg::UndefinedFunc,
                format!("`{name}` not defined"),
            ));
        };
        match &value.ty {
            Type::Func(func) => Ok(Box::new(func.clone())),
            Type::NativeFunc(func) => Ok(Box::new(func.clone())),
            other => Err(runtime_error(
                ErrorMsg::NotCallable,
                format!("`{name}` is {}", other.name()),
            )),
        }
    }

    /// Bindings a function defined right now would carry into its calls.
    pub fn capture(&self) -> Rc<Bindings> {
        if self.depth() == 0 {
            return Rc::default();
        }
        Rc::new(self.scopes[self.current().0].values.clone())
    }

    /// Enters a call of `func`. The new scope starts from the function's
    /// captured bindings and sees the global scope, never the caller's.
    pub fn switch_context_to(
        &mut self,
        func: &Func,
        call_site: Position,
    ) -> Result<(), RuntimeError> {
        if self.depth() >= self.max_call_depth {
            return Err(runtime_error(
                ErrorMsg::RecursionLimit,
                format!(
                    "calling `{}` would nest more than {} calls",
                    func.name(),
                    self.max_call_depth
                ),
            ));
        }
        debug!("Switch context to {} called at {call_site}", func.name());
        self.scopes.push(Scope {
            values: func.closure.as_ref().clone(),
            parent: Some(ScopeId::GLOBAL),
        });
        self.call_stack.push(Frame {
            name: func.name().to_string(),
            call_site,
        });
        Ok(())
    }

    pub fn switch_to_parent_context(&mut self) -> Result<(), RuntimeError> {
        if self.depth() == 0 {
            return Err(runtime_error(
                ErrorMsg::StackUnderflow,
                format!("cannot leave {MAIN}"),
            ));
        }
        self.scopes.pop();
        if let Some(frame) = self.call_stack.pop() {
            debug!("Switch context back from {}", frame.name);
        }
        Ok(())
    }

    /// Active calls, innermost first.
    pub fn traceback(&self) -> Vec<Frame> {
        self.call_stack.iter().rev().cloned().collect()
    }
}
