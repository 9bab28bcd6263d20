//! Parser for the textual form of a query chain.
//!
//! Frontends normally deliver call chains already structured (see
//! [`CallChain`]). This parser builds the same structure from text so chains can
//! be written by hand in fixtures, tests and the `query` command. Names are
//! taken as already qualified.
//!
//! ## Grammar
//!
//! ```text
//! <chain>     := <item> ("." <item>)*
//! <item>      := ident ["<" <type> ("," <type>)* ">"] ["(" [<arg> ("," <arg>)*] ")"]
//! <arg>       := qname "::" "class" | <text up to "," or ")">
//! <type>      := "(" [<type> ("," <type>)*] ")" "->" <type>
//!              | <simple> ["." "(" ... ")" "->" <type>]
//! <simple>    := ("#" digits | qname ["<" <typearg> ("," <typearg>)* ">"]) ["?"]
//! <typearg>   := "*" | ["in" | "out"] <type>
//! ```
//!
//! Leading items without parentheses or type arguments form the receiver
//! (`org.example.Reflect`); every item after the first call must be a call.
//! `#N` refers to the N-th type parameter of the function being described.
//!
//! ## Examples
//!
//! ```text
//! Reflect.objects().withSupertype<a.I>().withAnnotations<a.I>(a.Ann::class)
//! functions().withAnnotations<(kotlin.Int) -> kotlin.Unit>(a.Ann::class)
//! functions().withSignature<kotlin.String.(#0) -> #0?>().toList()
//! ```

use thiserror::Error;
use winnow::ascii::{digit1, multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use crate::model::{TypeArg, TypeRef, Variance};
use crate::tree::{CallArg, CallChain, CallSegment, TypeNode};
use crate::types::Location;

/// Error type for chain and type parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Invalid chain syntax.
    #[error("invalid call chain '{input}': {message}")]
    InvalidChain { input: String, message: String },

    /// Invalid type syntax.
    #[error("invalid type '{input}': {message}")]
    InvalidType { input: String, message: String },
}

/// Parse a call chain located at `location`.
///
/// # Examples
///
/// ```
/// use tugreflect_core::chain::parse_call_chain;
/// use tugreflect_core::types::Location;
///
/// let chain = parse_call_chain(
///     "Reflect.objects().withSupertype<a.I>()",
///     Location::new("Main.kt", 3, 5),
/// )
/// .unwrap();
/// assert_eq!(chain.receiver.as_deref(), Some("Reflect"));
/// assert_eq!(chain.segments.len(), 2);
/// ```
pub fn parse_call_chain(input: &str, location: Location) -> Result<CallChain, ChainError> {
    let input = input.trim();
    let invalid = |message: String| ChainError::InvalidChain {
        input: input.to_string(),
        message,
    };
    if input.is_empty() {
        return Err(invalid("empty chain".to_string()));
    }

    let items = parse_items
        .parse(input)
        .map_err(|e| invalid(format!("{:?}", e)))?;

    let first_call = items
        .iter()
        .position(|item| item.type_args.is_some() || item.args.is_some())
        .ok_or_else(|| invalid("chain contains no calls".to_string()))?;

    let mut items = items.into_iter();
    let receiver: Vec<String> = items.by_ref().take(first_call).map(|i| i.name).collect();

    let mut chain = CallChain::new(location);
    if !receiver.is_empty() {
        chain.receiver = Some(receiver.join("."));
    }
    for item in items {
        let Some(args) = item.args else {
            return Err(invalid(format!("`{}` is not a call", item.name)));
        };
        let mut segment = CallSegment::new(item.name);
        segment.type_args = item
            .type_args
            .unwrap_or_default()
            .into_iter()
            .map(TypeNode::Resolved)
            .collect();
        segment.args = args;
        chain.segments.push(segment);
    }
    Ok(chain)
}

/// Parse a single type.
pub fn parse_type(input: &str) -> Result<TypeRef, ChainError> {
    let input = input.trim();
    parse_type_ref
        .parse(input)
        .map_err(|e| ChainError::InvalidType {
            input: input.to_string(),
            message: format!("{:?}", e),
        })
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

/// One dotted item before classification into receiver or call.
struct Item {
    name: String,
    type_args: Option<Vec<TypeRef>>,
    args: Option<Vec<CallArg>>,
}

fn parse_items(input: &mut &str) -> ModalResult<Vec<Item>> {
    let first = parse_item(input)?;
    let rest: Vec<Item> =
        repeat(0.., preceded((multispace0, '.', multispace0), parse_item)).parse_next(input)?;

    let mut all = vec![first];
    all.extend(rest);
    Ok(all)
}

fn parse_item(input: &mut &str) -> ModalResult<Item> {
    let name = parse_ident(input)?;
    let type_args = opt(parse_type_arg_list).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let args = opt(parse_value_args).parse_next(input)?;
    Ok(Item {
        name: name.to_string(),
        type_args,
        args,
    })
}

fn parse_ident<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    let checkpoint = *input;
    let word: &str =
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)?;
    if word.starts_with(|c: char| c.is_ascii_digit()) {
        *input = checkpoint;
        return Err(ErrMode::from_input(input));
    }
    Ok(word)
}

fn parse_qualified_name(input: &mut &str) -> ModalResult<String> {
    let first = parse_ident(input)?;
    let rest: Vec<&str> = repeat(0.., preceded('.', parse_ident)).parse_next(input)?;

    let mut name = first.to_string();
    for part in rest {
        name.push('.');
        name.push_str(part);
    }
    Ok(name)
}

/// `<A, B>` on a call.
fn parse_type_arg_list(input: &mut &str) -> ModalResult<Vec<TypeRef>> {
    delimited(
        (multispace0, '<', multispace0),
        separated(1.., parse_type_ref, (multispace0, ',', multispace0)),
        (multispace0, '>'),
    )
    .parse_next(input)
}

/// `(x, A::class)` on a call.
fn parse_value_args(input: &mut &str) -> ModalResult<Vec<CallArg>> {
    delimited(
        ('(', multispace0),
        separated(0.., parse_value_arg, (multispace0, ',', multispace0)),
        (multispace0, ')'),
    )
    .parse_next(input)
}

fn parse_value_arg(input: &mut &str) -> ModalResult<CallArg> {
    alt((parse_class_literal, parse_expr_arg)).parse_next(input)
}

fn parse_class_literal(input: &mut &str) -> ModalResult<CallArg> {
    let name = parse_qualified_name(input)?;
    let _ = (multispace0, "::", multispace0, "class").parse_next(input)?;
    Ok(CallArg::class_literal(TypeRef::named(name)))
}

fn parse_expr_arg(input: &mut &str) -> ModalResult<CallArg> {
    take_till(1.., |c: char| c == ',' || c == ')')
        .map(|s: &str| CallArg::expr(s.trim()))
        .parse_next(input)
}

/// Parse a type (function type or simple type).
fn parse_type_ref(input: &mut &str) -> ModalResult<TypeRef> {
    let _ = multispace0.parse_next(input)?;
    alt((parse_plain_function_type, parse_simple_or_receiver_function)).parse_next(input)
}

/// `(A, B) -> C`
fn parse_plain_function_type(input: &mut &str) -> ModalResult<TypeRef> {
    let (params, returns) = parse_function_tail(input)?;
    Ok(TypeRef::function(None, params, returns))
}

/// `A`, `A?`, `#0`, or `A.(B) -> C`.
fn parse_simple_or_receiver_function(input: &mut &str) -> ModalResult<TypeRef> {
    let base = parse_simple_type(input)?;
    match opt(preceded('.', parse_function_tail)).parse_next(input)? {
        Some((params, returns)) => Ok(TypeRef::function(Some(base), params, returns)),
        None => Ok(base),
    }
}

fn parse_function_tail(input: &mut &str) -> ModalResult<(Vec<TypeRef>, TypeRef)> {
    let params: Vec<TypeRef> = delimited(
        ('(', multispace0),
        separated(0.., parse_type_ref, (multispace0, ',', multispace0)),
        (multispace0, ')'),
    )
    .parse_next(input)?;
    let _ = (multispace0, "->", multispace0).parse_next(input)?;
    let returns = parse_type_ref(input)?;
    Ok((params, returns))
}

fn parse_simple_type(input: &mut &str) -> ModalResult<TypeRef> {
    let ty = alt((parse_type_param, parse_named_type)).parse_next(input)?;
    let nullable = opt('?').parse_next(input)?.is_some();
    Ok(if nullable { ty.nullable() } else { ty })
}

fn parse_type_param(input: &mut &str) -> ModalResult<TypeRef> {
    preceded('#', digit1)
        .try_map(|digits: &str| digits.parse::<u32>())
        .map(TypeRef::param)
        .parse_next(input)
}

fn parse_named_type(input: &mut &str) -> ModalResult<TypeRef> {
    let name = parse_qualified_name(input)?;
    let args: Option<Vec<TypeArg>> = opt(delimited(
        (multispace0, '<', multispace0),
        separated(1.., parse_type_arg, (multispace0, ',', multispace0)),
        (multispace0, '>'),
    ))
    .parse_next(input)?;
    Ok(TypeRef::Named {
        name,
        args: args.unwrap_or_default(),
        nullable: false,
    })
}

fn parse_type_arg(input: &mut &str) -> ModalResult<TypeArg> {
    let _ = multispace0.parse_next(input)?;
    alt((
        '*'.value(TypeArg::Star),
        (opt(parse_variance), parse_type_ref).map(|(variance, ty)| TypeArg::Type {
            variance: variance.unwrap_or_default(),
            ty,
        }),
    ))
    .parse_next(input)
}

fn parse_variance(input: &mut &str) -> ModalResult<Variance> {
    alt((
        terminated("out", multispace1).value(Variance::Out),
        terminated("in", multispace1).value(Variance::In),
    ))
    .parse_next(input)
}
