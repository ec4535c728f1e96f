//! Numeric functions

use std::cmp::Ordering;

use bigdecimal::{BigDecimal, RoundingMode};
use rhcl_runtime::{
    EvalError, EvalResult, Function, FunctionRegistry, Parameter, RegistryError, Scope, Type,
    Value,
};

use crate::args::get_number_arg;

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let unary = |name: &str, f: fn(&[Value], &Scope<'_>) -> EvalResult<Value>| {
        Function::new(name, f)
            .param(Parameter::new("num", Type::Number))
            .returns(Type::Number)
    };
    registry.register(unary("abs", abs))?;
    registry.register(unary("ceil", ceil))?;
    registry.register(unary("floor", floor))?;
    registry.register(unary("signum", signum))?;

    registry.register(
        Function::new("max", max)
            .variadic(Parameter::new("numbers", Type::Number))
            .min_args(1)
            .returns(Type::Number),
    )?;
    registry.register(
        Function::new("min", min)
            .variadic(Parameter::new("numbers", Type::Number))
            .min_args(1)
            .returns(Type::Number),
    )?;
    Ok(())
}

fn abs(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    Ok(Value::Number(get_number_arg(args, 0)?.abs()))
}

fn ceil(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let n = get_number_arg(args, 0)?;
    Ok(Value::Number(n.with_scale_round(0, RoundingMode::Ceiling)))
}

fn floor(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let n = get_number_arg(args, 0)?;
    Ok(Value::Number(n.with_scale_round(0, RoundingMode::Floor)))
}

fn signum(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let n = get_number_arg(args, 0)?;
    let sign = match n.cmp(&BigDecimal::from(0)) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    Ok(Value::int(sign))
}

fn max(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    extreme(args, Ordering::Greater)
}

fn min(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    extreme(args, Ordering::Less)
}

fn extreme(args: &[Value], keep: Ordering) -> EvalResult<Value> {
    let mut best: Option<&BigDecimal> = None;
    for idx in 0..args.len() {
        let n = get_number_arg(args, idx)?;
        if best.map_or(true, |b| n.cmp(b) == keep) {
            best = Some(n);
        }
    }
    best.map(|n| Value::Number(n.clone()))
        .ok_or_else(|| EvalError::invalid("must pass at least one number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhcl_runtime::NoData;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::number(BigDecimal::from_str(s).unwrap())
    }

    fn call(f: fn(&[Value], &Scope<'_>) -> EvalResult<Value>, args: &[Value]) -> EvalResult<Value> {
        let registry = FunctionRegistry::new();
        f(args, &Scope::new(&registry, &NoData))
    }

    #[test]
    fn rounding() {
        assert_eq!(call(ceil, &[num("1.2")]).unwrap(), Value::int(2));
        assert_eq!(call(ceil, &[num("-1.2")]).unwrap(), Value::int(-1));
        assert_eq!(call(floor, &[num("1.8")]).unwrap(), Value::int(1));
        assert_eq!(call(floor, &[num("-1.2")]).unwrap(), Value::int(-2));
        assert_eq!(call(abs, &[num("-0.5")]).unwrap(), num("0.5"));
    }

    #[test]
    fn extremes_and_sign() {
        let nums = [Value::int(3), num("7.5"), Value::int(-2)];
        assert_eq!(call(max, &nums).unwrap(), num("7.5"));
        assert_eq!(call(min, &nums).unwrap(), Value::int(-2));
        assert!(call(max, &[]).is_err());
        assert_eq!(call(signum, &[num("-0.1")]).unwrap(), Value::int(-1));
        assert_eq!(call(signum, &[Value::int(0)]).unwrap(), Value::int(0));
    }
}
