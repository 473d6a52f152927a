//! Recursive-descent parsing of the VM descriptor and signature grammars.

use crate::descriptor::{MethodDescriptor, PrimitiveType, TypeDescriptor};
use crate::error::{Result, TypeError};
use crate::signature::{
    ClassSignature, MethodSignature, TypeArgument, TypeParameter, TypeSignature,
};

/// Parse an erasure-level field/type descriptor (`[[Ljava/lang/String;`).
pub fn parse_type_descriptor(input: &str) -> Result<TypeDescriptor> {
    let mut cur = Cursor::new(input);
    let ty = field_descriptor(&mut cur)?;
    cur.finish()?;
    Ok(ty)
}

/// Parse a method descriptor (`(ILjava/lang/String;)[I`).
pub fn parse_method_descriptor(input: &str) -> Result<MethodDescriptor> {
    let mut cur = Cursor::new(input);
    cur.expect('(')?;
    let mut params = Vec::new();
    while cur.peek() != Some(')') {
        if cur.is_eof() {
            return Err(cur.fail("unterminated parameter list"));
        }
        let pos = cur.pos;
        let param = field_descriptor(&mut cur)?;
        if param.is_void() {
            return Err(cur.fail_at(pos, "void parameter type"));
        }
        params.push(param);
    }
    cur.expect(')')?;
    let return_type = field_descriptor(&mut cur)?;
    cur.finish()?;
    Ok(MethodDescriptor::new(params, return_type))
}

/// Parse a generic-level type signature (`Ljava/util/List<+TT;>;`).
pub fn parse_type_signature(input: &str) -> Result<TypeSignature> {
    let mut cur = Cursor::new(input);
    let sig = type_signature(&mut cur)?;
    cur.finish()?;
    Ok(sig)
}

/// Parse a generic method signature (`<U:Ljava/lang/Object;>(TU;)TU;^TE;`).
pub fn parse_method_signature(input: &str) -> Result<MethodSignature> {
    let mut cur = Cursor::new(input);
    let type_parameters = type_parameters_if_present(&mut cur)?;
    cur.expect('(')?;
    let mut parameters = Vec::new();
    while cur.peek() != Some(')') {
        if cur.is_eof() {
            return Err(cur.fail("unterminated parameter list"));
        }
        let pos = cur.pos;
        let param = type_signature(&mut cur)?;
        if param.is_void() {
            return Err(cur.fail_at(pos, "void parameter type"));
        }
        parameters.push(param);
    }
    cur.expect(')')?;
    let return_type = type_signature(&mut cur)?;
    let mut throws = Vec::new();
    while cur.peek() == Some('^') {
        cur.bump();
        let thrown = match cur.peek() {
            Some('T') => type_variable(&mut cur)?,
            Some('L') => class_type_signature(&mut cur)?,
            _ => return Err(cur.fail("expected thrown class or type variable")),
        };
        throws.push(thrown);
    }
    cur.finish()?;
    Ok(MethodSignature::new(
        type_parameters,
        parameters,
        return_type,
        throws,
    ))
}

/// Parse a generic class signature
/// (`<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<TT;>;`).
pub fn parse_class_signature(input: &str) -> Result<ClassSignature> {
    let mut cur = Cursor::new(input);
    let type_parameters = type_parameters_if_present(&mut cur)?;
    let super_class = class_type_signature(&mut cur)?;
    let mut interfaces = Vec::new();
    while !cur.is_eof() {
        interfaces.push(class_type_signature(&mut cur)?);
    }
    Ok(ClassSignature::new(type_parameters, super_class, interfaces))
}

fn field_descriptor(cur: &mut Cursor<'_>) -> Result<TypeDescriptor> {
    let dims = cur.array_dims()?;
    let ty = match cur.peek() {
        Some('L') => {
            cur.bump();
            let name = cur.class_name()?;
            // Descriptors are erased: `<` and `.` never appear here.
            cur.expect(';')?;
            TypeDescriptor::class(name)
        }
        Some(ch) => match PrimitiveType::from_code(ch) {
            Some(primitive) => {
                cur.bump();
                TypeDescriptor::primitive(primitive)
            }
            None => return Err(cur.fail("expected type descriptor")),
        },
        None => return Err(cur.fail("expected type descriptor, found end of input")),
    };
    if dims > 0 {
        if ty.is_void() {
            return Err(cur.fail("array of void"));
        }
        Ok(TypeDescriptor::array(dims, ty))
    } else {
        Ok(ty)
    }
}

fn type_signature(cur: &mut Cursor<'_>) -> Result<TypeSignature> {
    let dims = cur.array_dims()?;
    let ty = match cur.peek() {
        Some('T') => type_variable(cur)?,
        Some('L') => class_type_signature(cur)?,
        Some(ch) => match PrimitiveType::from_code(ch) {
            Some(primitive) => {
                cur.bump();
                TypeSignature::primitive(primitive)
            }
            None => return Err(cur.fail("expected type signature")),
        },
        None => return Err(cur.fail("expected type signature, found end of input")),
    };
    if dims > 0 {
        if ty.is_void() {
            return Err(cur.fail("array of void"));
        }
        Ok(TypeSignature::array(dims, ty))
    } else {
        Ok(ty)
    }
}

fn reference_type_signature(cur: &mut Cursor<'_>) -> Result<TypeSignature> {
    match cur.peek() {
        Some('L') | Some('T') | Some('[') => type_signature(cur),
        _ => Err(cur.fail("expected reference type signature")),
    }
}

fn type_variable(cur: &mut Cursor<'_>) -> Result<TypeSignature> {
    cur.expect('T')?;
    let name = cur.identifier_until(';')?;
    cur.expect(';')?;
    Ok(TypeSignature::variable(name))
}

fn class_type_signature(cur: &mut Cursor<'_>) -> Result<TypeSignature> {
    cur.expect('L')?;
    let name = cur.class_name()?;
    let type_arguments = type_arguments_if_present(cur)?;
    let mut sig = TypeSignature::class(None, name, type_arguments);
    // `.` re-enters a nested class whose owner is the signature so far.
    while cur.peek() == Some('.') {
        cur.bump();
        let name = cur.class_name()?;
        let type_arguments = type_arguments_if_present(cur)?;
        sig = TypeSignature::class(Some(sig), name, type_arguments);
    }
    cur.expect(';')?;
    Ok(sig)
}

fn type_arguments_if_present(cur: &mut Cursor<'_>) -> Result<Vec<TypeArgument>> {
    if cur.peek() != Some('<') {
        return Ok(Vec::new());
    }
    cur.bump();
    let mut args = Vec::new();
    while cur.peek() != Some('>') {
        if cur.is_eof() {
            return Err(cur.fail("unterminated type argument list"));
        }
        let arg = match cur.peek() {
            Some('*') => {
                cur.bump();
                TypeArgument::Wildcard
            }
            Some('+') => {
                cur.bump();
                TypeArgument::Extends(reference_type_signature(cur)?)
            }
            Some('-') => {
                cur.bump();
                TypeArgument::Super(reference_type_signature(cur)?)
            }
            _ => TypeArgument::Exact(reference_type_signature(cur)?),
        };
        args.push(arg);
    }
    cur.bump();
    if args.is_empty() {
        return Err(cur.fail("empty type argument list"));
    }
    Ok(args)
}

fn type_parameters_if_present(cur: &mut Cursor<'_>) -> Result<Vec<TypeParameter>> {
    if cur.peek() != Some('<') {
        return Ok(Vec::new());
    }
    cur.bump();
    let mut out = Vec::new();
    while cur.peek() != Some('>') {
        if cur.is_eof() {
            return Err(cur.fail("unterminated type parameter list"));
        }
        out.push(type_parameter(cur)?);
    }
    cur.bump();
    if out.is_empty() {
        return Err(cur.fail("empty type parameter list"));
    }
    Ok(out)
}

fn type_parameter(cur: &mut Cursor<'_>) -> Result<TypeParameter> {
    let name = cur.identifier_until(':')?;
    cur.expect(':')?;
    let class_bound = match cur.peek() {
        Some(':') => None,
        Some('L') | Some('T') | Some('[') => Some(reference_type_signature(cur)?),
        _ => return Err(cur.fail("expected class bound")),
    };
    let mut interface_bounds = Vec::new();
    while cur.peek() == Some(':') {
        cur.bump();
        interface_bounds.push(reference_type_signature(cur)?);
    }
    Ok(TypeParameter {
        name,
        class_bound,
        interface_bounds,
    })
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<char> {
        self.bytes.get(self.pos).copied().map(|b| b as char)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        match self.peek() {
            Some(found) if found == ch => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(self.fail(format!("expected `{ch}`, found `{found}`"))),
            None => Err(self.fail(format!("expected `{ch}`, found end of input"))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.fail("trailing input"))
        }
    }

    fn array_dims(&mut self) -> Result<u8> {
        let mut dims = 0usize;
        while self.peek() == Some('[') {
            self.pos += 1;
            dims += 1;
        }
        u8::try_from(dims).map_err(|_| self.fail("too many array dimensions"))
    }

    /// Scan a class name; stops at `<`, `;` or `.`.
    fn class_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, '<' | ';' | '.') {
                break;
            }
            if is_forbidden_in_identifier(ch) {
                return Err(self.fail(format!("`{ch}` is not allowed in a class name")));
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.fail("empty class name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn identifier_until(&mut self, delim: char) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == delim {
                break;
            }
            if matches!(ch, ';' | ':' | '<' | '>' | '.' | '/') || is_forbidden_in_identifier(ch) {
                return Err(self.fail(format!("`{ch}` is not allowed in an identifier")));
            }
            self.pos += 1;
        }
        if self.is_eof() {
            return Err(self.fail(format!("expected `{delim}`, found end of input")));
        }
        if self.pos == start {
            return Err(self.fail("empty identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn fail(&self, reason: impl Into<String>) -> TypeError {
        TypeError::parse(self.input, self.pos, reason)
    }

    fn fail_at(&self, pos: usize, reason: impl Into<String>) -> TypeError {
        TypeError::parse(self.input, pos, reason)
    }
}

fn is_forbidden_in_identifier(ch: char) -> bool {
    matches!(ch, '[' | '^' | '(' | ')' | '*' | '+' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::TypeRepresentable;

    #[track_caller]
    fn roundtrip_descriptor(input: &str) {
        let ty = parse_type_descriptor(input).unwrap();
        assert_eq!(ty.as_internal(), input);
        assert_eq!(parse_type_descriptor(ty.as_internal()).unwrap(), ty);
    }

    #[track_caller]
    fn roundtrip_signature(input: &str) {
        let sig = parse_type_signature(input).unwrap();
        assert_eq!(sig.as_internal(), input);
        assert_eq!(parse_type_signature(sig.as_internal()).unwrap(), sig);
    }

    #[test]
    fn descriptor_canonical_forms() {
        for input in ["I", "V", "Ljava/lang/String;", "[[[I", "[Ljava/util/Map$Entry;"] {
            roundtrip_descriptor(input);
        }
    }

    #[test]
    fn method_descriptor_canonical_forms() {
        for input in ["()V", "(ILjava/lang/String;)[I", "([[J)Ljava/lang/Object;"] {
            let desc = parse_method_descriptor(input).unwrap();
            assert_eq!(desc.as_internal(), input);
            assert_eq!(parse_method_descriptor(desc.as_internal()).unwrap(), desc);
        }
    }

    #[test]
    fn signature_canonical_forms() {
        for input in [
            "TT;",
            "Ljava/util/List<Ljava/lang/String;>;",
            "Ljava/util/Map<TK;+TV;>;",
            "Ljava/util/List<*>;",
            "[TT;",
            "Lpkg/Outer<TA;>.Inner<-TB;>;",
        ] {
            roundtrip_signature(input);
        }
    }

    #[test]
    fn method_signature_roundtrip() {
        let input = "<U:Ljava/lang/Object;>(TU;[I)TU;^Ljava/io/IOException;^TE;";
        let sig = parse_method_signature(input).unwrap();
        assert_eq!(sig.as_internal(), input);
        assert_eq!(sig.type_parameters().len(), 1);
        assert_eq!(sig.parameters().len(), 2);
        assert_eq!(sig.throws().len(), 2);
    }

    #[test]
    fn class_signature_roundtrip() {
        let input = "<T:Ljava/lang/Number;:Ljava/lang/Comparable;>Ljava/lang/Object;Ljava/lang/Iterable<TT;>;";
        let sig = parse_class_signature(input).unwrap();
        assert_eq!(sig.as_internal(), input);
        assert_eq!(sig.type_parameters()[0].interface_bounds.len(), 1);
        assert_eq!(sig.interfaces().len(), 1);
    }

    #[test]
    fn interface_only_bound_parses() {
        let sig = parse_class_signature("<T::Ljava/lang/Comparable;>Ljava/lang/Object;").unwrap();
        assert!(sig.type_parameters()[0].class_bound.is_none());
        assert_eq!(sig.type_parameters()[0].interface_bounds.len(), 1);
    }

    #[test]
    fn failures_carry_position() {
        match parse_type_descriptor("Ljava/lang/String") {
            Err(TypeError::Parse { pos, .. }) => assert_eq!(pos, 17),
            other => panic!("expected parse failure, got {other:?}"),
        }
        match parse_method_descriptor("(V)V") {
            Err(TypeError::Parse { pos, .. }) => assert_eq!(pos, 1),
            other => panic!("expected parse failure, got {other:?}"),
        }
        assert!(parse_type_signature("Ljava/util/List<>;").is_err());
        assert!(parse_type_descriptor("Q").is_err());
        assert!(parse_type_descriptor("II").is_err());
    }
}
