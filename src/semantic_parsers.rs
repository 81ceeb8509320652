//! # Semantic Literal Parsers
//!
//! nom recognizers for the numeric literals of the DS9 region language:
//! plain integers and reals, unit-suffixed numbers (`10d`, `2r`, `30'`,
//! `4"`, `100p`, `12i`) and the three sexagesimal spellings
//! (`12:30:45`, `12h30m45s`, `-5d15m36s`).
//!
//! The lexer uses [`literal`] to classify a numeric lexeme. The parser
//! evaluates the sexagesimal lexemes later with [`parse_sex_str`],
//! [`parse_hms_str`] and [`parse_dms_str`], because their scaling depends
//! on the sky frame in effect.

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char as nom_char, digit0, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::{context, VerboseError},
    sequence::{pair, preceded, tuple},
    Finish, IResult,
};
use std::str::FromStr;

pub(crate) type Input<'a> = &'a str;
pub(crate) type ParserResult<'a, O> = IResult<Input<'a>, O, VerboseError<Input<'a>>>;

// --- Literal Classification ---

/// Unit attached to a number by its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericUnit {
    Degree,
    Radian,
    ArcMinute,
    ArcSecond,
    Physical,
    Image,
}

/// What a numeric lexeme turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Unit(f64, NumericUnit),
    Sexagesimal,
    Hms,
    Dms,
}

// --- Helper Parsers for Numbers ---

/// Parses an optional sign (+ or -)
fn parse_optional_sign<'a>(input: Input<'a>) -> ParserResult<'a, Option<char>> {
    opt(one_of("+-"))(input)
}

/// Digits with an optional fraction ("12", "12.", "12.5", ".5"). No sign, no exponent.
fn recognize_unsigned_decimal<'a>(input: Input<'a>) -> ParserResult<'a, &'a str> {
    alt((
        recognize(pair(digit1, opt(pair(nom_char('.'), digit0)))),
        recognize(pair(nom_char('.'), digit1)),
    ))(input)
}

fn parse_unsigned_f64<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    map_res(recognize_unsigned_decimal, f64::from_str)(input)
}

/// A signed decimal number with an optional exponent, returned as its source text.
fn recognize_number<'a>(input: Input<'a>) -> ParserResult<'a, &'a str> {
    context(
        "number",
        recognize(tuple((
            parse_optional_sign,
            recognize_unsigned_decimal,
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
    )(input)
}

/// Integers stay integers unless they overflow `i64`; anything with a
/// fraction or exponent is a real.
fn parse_plain_number<'a>(input: Input<'a>) -> ParserResult<'a, Literal> {
    map_res(recognize_number, |text: &str| {
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(v) = i64::from_str(text) {
                return Ok(Literal::Int(v));
            }
        }
        f64::from_str(text).map(Literal::Real)
    })(input)
}

fn parse_unit_suffix<'a>(input: Input<'a>) -> ParserResult<'a, NumericUnit> {
    map(one_of("dDrRpPiI'\""), |c| match c.to_ascii_lowercase() {
        'd' => NumericUnit::Degree,
        'r' => NumericUnit::Radian,
        'p' => NumericUnit::Physical,
        'i' => NumericUnit::Image,
        '\'' => NumericUnit::ArcMinute,
        _ => NumericUnit::ArcSecond,
    })(input)
}

fn parse_unit_number<'a>(input: Input<'a>) -> ParserResult<'a, Literal> {
    context(
        "number with unit",
        map_res(pair(recognize_number, parse_unit_suffix), |(text, unit)| {
            f64::from_str(text).map(|v| Literal::Unit(v, unit))
        }),
    )(input)
}

// --- Parsers for Sexagesimal Formats ---

/// Parses `DDuMMmSSs` with `u` the primary unit letter (`h` or `d`).
/// Returns `sign * (v1 + v2/60 + v3/3600) * scale`.
fn parse_sexagesimal_units_format<'a>(
    primary_unit_static_tag: &'static str,
    scale: f64,
    ctx_label: &'static str,
) -> impl FnMut(Input<'a>) -> ParserResult<'a, f64> {
    move |i: Input<'a>| {
        context(
            ctx_label,
            map(
                tuple((
                    parse_optional_sign,
                    parse_unsigned_f64,
                    tag_no_case(primary_unit_static_tag),
                    parse_unsigned_f64,
                    tag_no_case("m"),
                    parse_unsigned_f64,
                    tag_no_case("s"),
                )),
                |(sign_opt, v1, _, v2, _, v3, _)| {
                    let total_value = v1 + v2 / 60.0 + v3 / 3600.0;
                    let signed = if sign_opt == Some('-') { -total_value } else { total_value };
                    signed * scale
                },
            ),
        )(i)
    }
}

/// Parses V1:V2[:V3] (colon-separated sexagesimal), unscaled.
fn parse_colon_sexagesimal_format<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    context(
        "colon sexagesimal",
        map(
            tuple((
                parse_optional_sign,
                parse_unsigned_f64,
                preceded(nom_char(':'), parse_unsigned_f64),
                opt(preceded(nom_char(':'), parse_unsigned_f64)),
            )),
            |(sign_opt, v1, v2, v3_opt)| {
                let total_value = v1 + v2 / 60.0 + v3_opt.unwrap_or(0.0) / 3600.0;
                if sign_opt == Some('-') { -total_value } else { total_value }
            },
        ),
    )(input)
}

fn parse_hms<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    parse_sexagesimal_units_format("h", 15.0, "HMS format (e.g., 10h20m30s)")(input)
}

fn parse_dms<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    parse_sexagesimal_units_format("d", 1.0, "DMS format (e.g., +10d20m30s)")(input)
}

// --- Public Entry Points ---

/// Classifies the numeric literal at the start of `input`. Longer
/// spellings are tried first so that `10d20m30s` is not read as `10d`.
pub fn literal<'a>(input: Input<'a>) -> ParserResult<'a, Literal> {
    alt((
        map(recognize(parse_hms), |_| Literal::Hms),
        map(recognize(parse_dms), |_| Literal::Dms),
        map(recognize(parse_colon_sexagesimal_format), |_| Literal::Sexagesimal),
        parse_unit_number,
        parse_plain_number,
    ))(input)
}

fn evaluate<'a>(
    parser: impl FnMut(Input<'a>) -> ParserResult<'a, f64>,
    text: Input<'a>,
) -> Option<f64> {
    all_consuming(parser)(text).finish().ok().map(|(_, v)| v)
}

/// Value of a colon sexagesimal lexeme, in its own units (hours or degrees).
pub fn parse_sex_str(text: &str) -> Option<f64> {
    evaluate(parse_colon_sexagesimal_format, text)
}

/// Value of an `h m s` lexeme, converted to degrees.
pub fn parse_hms_str(text: &str) -> Option<f64> {
    evaluate(parse_hms, text)
}

/// Value of a `d m s` lexeme in degrees.
pub fn parse_dms_str(text: &str) -> Option<f64> {
    evaluate(parse_dms, text)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    // For parsers that return just a value
    macro_rules! assert_parser_ok {
        ($parser:expr, $input:expr, $expected_output:expr, $expected_remaining:expr) => {
            match $parser($input) {
                Ok((remaining, value)) => {
                    assert_eq!(remaining, $expected_remaining, "Remaining input mismatch for '{}'", $input);
                    assert!((value - $expected_output).abs() < 1e-9, "Parsed value mismatch for '{}': got {}, expected {}", $input, value, $expected_output);
                }
                Err(e) => {
                    let e_str = match e {
                        nom::Err::Error(ve) | nom::Err::Failure(ve) => nom::error::convert_error($input, ve),
                        nom::Err::Incomplete(_) => "Incomplete".to_string(),
                    };
                    panic!("Parser failed for '{}': {}", $input, e_str);
                }
            }
        };
    }

    macro_rules! assert_literal {
        ($input:expr, $expected:pat, $expected_remaining:expr) => {
            match literal($input) {
                Ok((remaining, lit)) => {
                    assert_eq!(remaining, $expected_remaining, "Remaining input mismatch for '{}'", $input);
                    assert!(matches!(lit, $expected), "Literal mismatch for '{}': got {:?}", $input, lit);
                }
                Err(e) => panic!("literal() failed for '{}': {:?}", $input, e),
            }
        };
    }

    macro_rules! assert_parser_err {
        ($parser:expr, $input:expr) => {
            assert!($parser($input).is_err(), "Parser should have failed for input '{}'", $input);
        };
    }

    #[test]
    fn test_parse_sexagesimal_units_format_hms_scaled() {
        let mut parser = parse_sexagesimal_units_format("h", 15.0, "HMS scaled test");
        assert_parser_ok!(parser, "1h0m0s", 15.0, "");
        assert_parser_ok!(parser, "-2h30m0s", -(2.0 + 30.0 / 60.0) * 15.0, "");
        assert_parser_ok!(parser, "+1h0m36s", (1.0 + 36.0 / 3600.0) * 15.0, "");
    }

    #[test]
    fn test_parse_sexagesimal_units_format_requires_all_fields() {
        let mut parser = parse_sexagesimal_units_format("d", 1.0, "DMS test");
        assert_parser_ok!(parser, "-10d30m0s", -(10.0 + 30.0 / 60.0), "");
        assert_parser_err!(parser, "150d");
        assert_parser_err!(parser, "10d30m");
    }

    #[test]
    fn test_parse_colon_sexagesimal_format() {
        assert_parser_ok!(parse_colon_sexagesimal_format, "10:30", 10.5, "");
        assert_parser_ok!(parse_colon_sexagesimal_format, "-5:15:36", -(5.0 + 15.0 / 60.0 + 36.0 / 3600.0), "");
        assert_parser_ok!(parse_colon_sexagesimal_format, "-00:30:00,", -0.5, ",");
    }

    #[test]
    fn test_literal_plain_numbers() {
        assert_literal!("123", Literal::Int(123), "");
        assert_literal!("-10)", Literal::Int(-10), ")");
        assert_literal!("12.5", Literal::Real(_), "");
        assert_literal!(".5,", Literal::Real(_), ",");
        assert_literal!("1e3", Literal::Real(_), "");
        assert_literal!("00ff00", Literal::Int(0), "ff00");
    }

    #[test]
    fn test_literal_units() {
        assert_literal!("10d", Literal::Unit(_, NumericUnit::Degree), "");
        assert_literal!("1.5r", Literal::Unit(_, NumericUnit::Radian), "");
        assert_literal!("20.5'", Literal::Unit(_, NumericUnit::ArcMinute), "");
        assert_literal!("30\"", Literal::Unit(_, NumericUnit::ArcSecond), "");
        assert_literal!("100p", Literal::Unit(_, NumericUnit::Physical), "");
        assert_literal!("12I", Literal::Unit(_, NumericUnit::Image), "");
    }

    #[test]
    fn test_literal_sexagesimal_spellings() {
        assert_literal!("12:30:45.5", Literal::Sexagesimal, "");
        assert_literal!("12h30m45s", Literal::Hms, "");
        assert_literal!("-10d20m30s", Literal::Dms, "");
        // a bare degree value is not a DMS string
        assert_literal!("10d20", Literal::Unit(_, NumericUnit::Degree), "20");
    }

    #[test]
    fn test_evaluate_sexagesimal_strings() {
        assert_eq!(parse_sex_str("1:30:00"), Some(1.5));
        assert_eq!(parse_hms_str("1h30m0s"), Some(22.5));
        assert_eq!(parse_dms_str("-1d30m0s"), Some(-1.5));
        assert_eq!(parse_sex_str("1:30:00x"), None);
    }
}
