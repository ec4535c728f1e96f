//! CIDR prefix helpers
//!
//! Addresses of both families are handled as `u128` with a bit width of 32
//! or 128, so the arithmetic is shared.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rhcl_runtime::{
    EvalError, EvalResult, Function, FunctionRegistry, Parameter, RegistryError, Scope, Type,
    Value,
};

use crate::args::{get_int_arg, get_string_arg};

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(
        Function::new("cidrhost", cidrhost)
            .param(Parameter::new("prefix", Type::String))
            .param(Parameter::new("hostnum", Type::Number))
            .returns(Type::String),
    )?;
    registry.register(
        Function::new("cidrnetmask", cidrnetmask)
            .param(Parameter::new("prefix", Type::String))
            .returns(Type::String),
    )?;
    registry.register(
        Function::new("cidrsubnet", cidrsubnet)
            .param(Parameter::new("prefix", Type::String))
            .param(Parameter::new("newbits", Type::Number))
            .param(Parameter::new("netnum", Type::Number))
            .returns(Type::String),
    )?;
    Ok(())
}

/// A parsed `address/length` prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Prefix {
    bits: u32,
    addr: u128,
    len: u32,
}

impl Prefix {
    fn parse(s: &str) -> EvalResult<Self> {
        let invalid = || EvalError::argument(0, format!("invalid CIDR address: {}", s));
        let (addr, len) = s.split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let len: u32 = len.parse().map_err(|_| invalid())?;
        let (bits, addr) = match addr {
            IpAddr::V4(v4) => (32, u128::from(u32::from(v4))),
            IpAddr::V6(v6) => (128, u128::from(v6)),
        };
        if len > bits {
            return Err(invalid());
        }
        Ok(Self { bits, addr, len })
    }

    fn host_bits(&self) -> u32 {
        self.bits - self.len
    }

    /// Mask with the first `len` bits of the address width set
    fn mask(&self, len: u32) -> u128 {
        let width = low_bits(self.bits);
        width & !low_bits(self.bits - len)
    }

    fn network(&self) -> u128 {
        self.addr & self.mask(self.len)
    }

    fn format_addr(&self, addr: u128) -> String {
        if self.bits == 32 {
            // Only the low 32 bits are ever set for IPv4
            Ipv4Addr::from(addr as u32).to_string()
        } else {
            Ipv6Addr::from(addr).to_string()
        }
    }
}

/// A value with the low `n` bits set
fn low_bits(n: u32) -> u128 {
    if n >= 128 {
        u128::MAX
    } else {
        (1u128 << n) - 1
    }
}

fn cidrhost(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let prefix = Prefix::parse(get_string_arg(args, 0)?)?;
    let hostnum = get_int_arg(args, 1)?;

    let max = low_bits(prefix.host_bits());
    let magnitude = u128::from(hostnum.unsigned_abs());
    // Negative numbers count back from the end of the range
    let offset = match hostnum {
        n if n >= 0 && magnitude <= max => Some(magnitude),
        n if n < 0 && magnitude - 1 <= max => Some(max - (magnitude - 1)),
        _ => None,
    };
    let offset = offset.ok_or_else(|| {
        EvalError::argument(
            1,
            format!(
                "prefix of {} does not accommodate a host numbered {}",
                prefix.len, hostnum
            ),
        )
    })?;
    Ok(Value::string(prefix.format_addr(prefix.network() | offset)))
}

fn cidrnetmask(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let prefix = Prefix::parse(get_string_arg(args, 0)?)?;
    if prefix.bits != 32 {
        return Err(EvalError::argument(0, "only IPv4 networks have a netmask"));
    }
    Ok(Value::string(prefix.format_addr(prefix.mask(prefix.len))))
}

fn cidrsubnet(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let prefix = Prefix::parse(get_string_arg(args, 0)?)?;
    let newbits = get_int_arg(args, 1)?;
    let netnum = get_int_arg(args, 2)?;

    let newbits = u32::try_from(newbits)
        .map_err(|_| EvalError::argument(1, "must extend prefix by a non-negative number of bits"))?;
    let new_len = prefix
        .len
        .checked_add(newbits)
        .filter(|len| *len <= prefix.bits)
        .ok_or_else(|| {
            EvalError::argument(
                1,
                format!(
                    "insufficient address space to extend prefix of {} by {}",
                    prefix.len, newbits
                ),
            )
        })?;

    let netnum_fits = u128::try_from(netnum)
        .ok()
        .filter(|n| *n <= low_bits(newbits));
    let netnum = netnum_fits.ok_or_else(|| {
        EvalError::argument(
            2,
            format!(
                "prefix extension of {} does not accommodate a subnet numbered {}",
                newbits, netnum
            ),
        )
    })?;

    let shift = prefix.bits - new_len;
    let subnet = prefix.network() | netnum.checked_shl(shift).unwrap_or(0);
    Ok(Value::string(format!(
        "{}/{}",
        prefix.format_addr(subnet),
        new_len
    )))
}
