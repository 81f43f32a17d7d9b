//! Runtime values.
//!
//! # Heap Enforcement
//!
//! Heap values go through factory methods on `Value`. The `Heap<T>` wrapper
//! has a crate-private constructor, so code outside this crate cannot build
//! heap variants directly:
//!
//! ```text
//! let s = Value::string("hello");             // OK
//! let a = Value::array(vec![Value::int(1)]);  // OK
//! let s = Value::Str(Heap::new(...));         // ERROR: Heap::new is pub(crate)
//! ```
//!
//! # Identity
//!
//! `nil`, `true` and `false` are immediates, so every read of them is the
//! same instance. Objects and modules compare by identity; strings, numbers
//! and arrays compare by content. `Value::same` is the identity test.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::module::{ModuleRef, RObject};

/// Reference-counted heap cell for value payloads.
///
/// `#[repr(transparent)]` keeps the layout identical to `Rc<T>`.
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Rc<T>);

impl<T> Heap<T> {
    /// Allocate a payload. Crate-private: use the `Value` factories.
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Rc::new(value))
    }
}

impl<T: ?Sized> Heap<T> {
    /// Whether two handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Heap<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// The nil singleton.
    #[default]
    Nil,
    /// `true` / `false` singletons.
    Bool(bool),
    /// Fixed-width integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Immutable string.
    Str(Heap<String>),
    /// Mutable array. Block invocation reads its length and first element.
    Array(Heap<RefCell<Vec<Value>>>),
    /// Plain object instance.
    Object(Heap<RObject>),
    /// Class or module object.
    Module(ModuleRef),
}

impl Value {
    /// Create a boolean value.
    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an integer value.
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    /// Create a float value.
    #[inline]
    pub fn float(x: f64) -> Self {
        Value::Float(x)
    }

    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    /// Create an array value.
    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Heap::new(RefCell::new(items)))
    }

    /// Create an empty array. Used as the default yield argument.
    #[inline]
    pub fn empty_array() -> Self {
        Value::array(Vec::new())
    }

    /// Create a fresh instance of `class`.
    pub fn object(class: &ModuleRef) -> Self {
        Value::Object(Heap::new(RObject::new(class.clone())))
    }

    /// Wrap a class or module object.
    #[inline]
    pub fn module(module: &ModuleRef) -> Self {
        Value::Module(module.clone())
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `nil` and `false` is truthy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Identity comparison.
    ///
    /// Immediates are identical when equal; heap values only when they share
    /// an allocation.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Heap::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Heap::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Heap::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Length when this is an array.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.borrow().len()),
            _ => None,
        }
    }

    /// Element `index` when this is an array holding that many elements.
    pub fn array_entry(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(items) => items.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// Append to an array in place. Returns `false` for non-arrays.
    pub fn array_push(&self, item: Value) -> bool {
        match self {
            Value::Array(items) => {
                items.borrow_mut().push(item);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of an array's elements.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    /// Spread into a positional argument list: an array contributes its
    /// elements, anything else becomes a single argument.
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.borrow().clone(),
            other => vec![other.clone()],
        }
    }

    /// Pack positional arguments back into one value: a single argument is
    /// passed through, anything else becomes an array.
    pub fn from_args(args: &[Value]) -> Value {
        match args {
            [single] => single.clone(),
            _ => Value::array(args.to_vec()),
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Module(_) => "module",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Heap::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Object(a), Value::Object(b)) => Heap::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::Array(items) => f.debug_tuple("Array").field(&*items.borrow()).finish(),
            Value::Object(obj) => write!(f, "Object(#<{}>)", obj.class().name()),
            Value::Module(m) => write!(f, "Module({})", m.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{}", s.as_str()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "#<{}>", obj.class().name()),
            Value::Module(m) => write!(f, "{}", m.name()),
        }
    }
}
