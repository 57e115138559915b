//! Runtime side of destructuring `let`.
//!
//! The target arrives as quoted data: a tuple headed by `:,` (iterable) or
//! `:=` (mapping), nested targets as nested tuples, and mapping keys already
//! evaluated. Values are produced in the same order the expander flattened
//! the target's names into the lambda parameter list.

use std::rc::Rc;

use super::eval::Interpreter;
use super::value::Value;
use super::Flow;

/// Pushes the values bound by `target` onto `out`.
pub fn unpack(
    interp: &Interpreter,
    target: &Value,
    value: Value,
    out: &mut Vec<Value>,
) -> Result<(), Flow> {
    match target {
        Value::Tuple(items) if !items.is_empty() => match items[0].as_str() {
            Some(":,") => unpack_iterable(interp, &items[1..], value, out),
            Some(":=") => unpack_mapping(interp, &items[1..], value, out),
            _ => Ok(()),
        },
        Value::Str(name) if &**name == "_" => Ok(()),
        _ => {
            out.push(value);
            Ok(())
        }
    }
}

fn unpack_iterable(
    interp: &Interpreter,
    targets: &[Value],
    value: Value,
    out: &mut Vec<Value>,
) -> Result<(), Flow> {
    let iter = interp.iterate(&value)?;
    let mut targets = targets.iter();
    while let Some(target) = targets.next() {
        match target.as_str() {
            Some(":list") => {
                let rest: Vec<Value> = iter.borrow_mut().by_ref().collect();
                unpack(interp, next_target(interp, &mut targets)?, Value::list(rest), out)?;
            }
            Some(":iter") => {
                let rest = Value::Iterator(Rc::clone(&iter));
                unpack(interp, next_target(interp, &mut targets)?, rest, out)?;
            }
            Some(":as") => {
                unpack(interp, next_target(interp, &mut targets)?, value.clone(), out)?;
            }
            _ => {
                let next = iter.borrow_mut().next();
                let Some(item) = next else {
                    return Err(interp.raise(
                        &interp.exceptions().value_error,
                        "not enough values to unpack",
                    ));
                };
                unpack(interp, target, item, out)?;
            }
        }
    }
    Ok(())
}

fn unpack_mapping(
    interp: &Interpreter,
    targets: &[Value],
    value: Value,
    out: &mut Vec<Value>,
) -> Result<(), Flow> {
    let defaults = defaults(targets);
    let default_for = |name: &Value, key: &Value| -> Result<Value, Flow> {
        name.as_str()
            .and_then(|n| defaults.iter().find(|(k, _)| k.as_str() == Some(n)))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| interp.key_error(key))
    };

    let mut targets = targets.iter();
    while let Some(target) = targets.next() {
        if target.as_str() == Some(":as") {
            targets.next();
            out.push(value.clone());
            continue;
        }
        if let Value::Tuple(items) = target {
            match items.first().and_then(Value::as_str) {
                Some(":strs") => {
                    for name in &items[1..] {
                        match lookup(interp, &value, name)? {
                            Some(found) => out.push(found),
                            None => out.push(default_for(name, name)?),
                        }
                    }
                    continue;
                }
                Some(":default") => continue,
                _ => {}
            }
        }
        let key = next_target(interp, &mut targets)?;
        match lookup(interp, &value, key)? {
            Some(found) => unpack(interp, target, found, out)?,
            // `_` binds nothing, but the key must still exist or have a default.
            None if target.as_str() == Some("_") => {
                default_for(target, key)?;
            }
            None => out.push(default_for(target, key)?),
        }
    }
    Ok(())
}

/// The `(:default name value ...)` pairs of a mapping target.
fn defaults(targets: &[Value]) -> Vec<(Value, Value)> {
    targets
        .iter()
        .find_map(|t| match t {
            Value::Tuple(items) if items.first().and_then(Value::as_str) == Some(":default") => {
                Some(
                    items[1..]
                        .chunks(2)
                        .filter(|pair| pair.len() == 2)
                        .map(|pair| (pair[0].clone(), pair[1].clone()))
                        .collect(),
                )
            }
            _ => None,
        })
        .unwrap_or_default()
}

/// `value[key]`, with `None` for a missing key or index.
fn lookup(interp: &Interpreter, value: &Value, key: &Value) -> Result<Option<Value>, Flow> {
    match interp.getitem(value, key) {
        Ok(found) => Ok(Some(found)),
        Err(Flow::Raise(raised))
            if interp.matches(
                &raised,
                &Value::ExceptionType(Rc::clone(&interp.exceptions().lookup_error)),
            ) =>
        {
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

fn next_target<'t>(
    interp: &Interpreter,
    targets: &mut impl Iterator<Item = &'t Value>,
) -> Result<&'t Value, Flow> {
    targets
        .next()
        .ok_or_else(|| interp.type_error("destructuring target ends after a keyword"))
}
