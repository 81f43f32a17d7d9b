//! Binding yielded values to block parameters.

use garnet_value::{wrong_arg_count, EvalError, Value};

use crate::block::ParamPattern;
use crate::runtime::Runtime;

/// Assigns a yielded value to a block's parameter pattern.
///
/// Called inside the block's activation, so writes land in the activation's
/// dynamic variables.
pub trait ParamBinder {
    fn bind(
        &self,
        rt: &mut Runtime,
        pattern: &ParamPattern,
        receiver: &Value,
        value: Value,
        check_arity: bool,
    ) -> Result<(), EvalError>;
}

/// Binds parameters as dynamic variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct DynVarBinder;

impl ParamBinder for DynVarBinder {
    fn bind(
        &self,
        rt: &mut Runtime,
        pattern: &ParamPattern,
        _receiver: &Value,
        value: Value,
        check_arity: bool,
    ) -> Result<(), EvalError> {
        match pattern {
            ParamPattern::Name(name) => rt.dyn_var_set(name, value),
            ParamPattern::Multiple { names, splat } => {
                let items = value.to_args();
                if check_arity {
                    let short = items.len() < names.len();
                    let long = splat.is_none() && items.len() > names.len();
                    if short || long {
                        return Err(wrong_arg_count(names.len(), items.len()));
                    }
                }
                for (i, name) in names.iter().enumerate() {
                    rt.dyn_var_set(name, items.get(i).cloned().unwrap_or_default());
                }
                if let Some(splat) = splat {
                    let rest = items.get(names.len()..).unwrap_or_default().to_vec();
                    rt.dyn_var_set(splat, Value::array(rest));
                }
            }
        }
        Ok(())
    }
}
