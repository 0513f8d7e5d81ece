//! printf-style number formats
//!
//! A `NumberFormat` holds literal text around at most one value directive,
//! e.g. `"%d"`, `"%.2f"`, or `"Score: %05d pts"`. Integer directives
//! (`d i u o x X`) truncate the value toward zero before formatting; float
//! directives (`f F e E g G`) format it as-is.
//!
//! Formats are validated once when parsed, so rendering can only fail for
//! values that have no integer representation (NaN, infinities).

use crate::error::{Result, TallyError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Format used by a label that was never configured
pub const DEFAULT_FORMAT: &str = "%d";

const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Largest width or precision a directive may ask for
pub const MAX_FIELD_WIDTH: usize = 1024;

fn parse_field(format: &str, field: &str, digits: &str) -> Result<usize> {
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_FIELD_WIDTH => Ok(n),
        _ => Err(TallyError::invalid_format(
            format,
            format!("{field} {digits} exceeds {MAX_FIELD_WIDTH}"),
        )),
    }
}

fn directive_regex() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(
            r"%(?P<flags>[-+ 0#]*)(?P<width>\*|\d+)?(?:\.(?P<precision>\*|\d*))?(?P<length>hh|h|ll|l|L|q|z|j|t)?(?P<conv>(?s:.))?",
        )
        .expect("directive regex is valid")
    })
}

/// Conversion character of a value directive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Conversion {
    /// `%d` / `%i`
    Decimal,
    /// `%u`
    Unsigned,
    /// `%o`
    Octal,
    /// `%x` / `%X`
    Hex { upper: bool },
    /// `%f` / `%F`
    Fixed { upper: bool },
    /// `%e` / `%E`
    Exponent { upper: bool },
    /// `%g` / `%G`
    General { upper: bool },
}

impl Conversion {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'd' | 'i' => Conversion::Decimal,
            'u' => Conversion::Unsigned,
            'o' => Conversion::Octal,
            'x' => Conversion::Hex { upper: false },
            'X' => Conversion::Hex { upper: true },
            'f' => Conversion::Fixed { upper: false },
            'F' => Conversion::Fixed { upper: true },
            'e' => Conversion::Exponent { upper: false },
            'E' => Conversion::Exponent { upper: true },
            'g' => Conversion::General { upper: false },
            'G' => Conversion::General { upper: true },
            _ => return None,
        })
    }

    /// Whether the value is truncated to an integer before formatting
    fn is_integer(&self) -> bool {
        matches!(
            self,
            Conversion::Decimal | Conversion::Unsigned | Conversion::Octal | Conversion::Hex { .. }
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alternate: bool,
}

impl Flags {
    fn parse(flags: &str) -> Self {
        let mut parsed = Flags::default();
        for c in flags.chars() {
            match c {
                '-' => parsed.left = true,
                '0' => parsed.zero = true,
                '+' => parsed.plus = true,
                ' ' => parsed.space = true,
                '#' => parsed.alternate = true,
                _ => {}
            }
        }
        parsed
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }
}

/// A single value directive such as `%08.3f`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Directive {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

impl Directive {
    fn render(&self, value: f64) -> Result<String> {
        if self.conversion.is_integer() {
            self.render_integer(value)
        } else {
            Ok(self.render_float(value))
        }
    }

    fn render_integer(&self, value: f64) -> Result<String> {
        if !value.is_finite() {
            return Err(TallyError::Unrenderable {
                value,
                reason: "integer directive needs a finite value".to_string(),
            });
        }
        let n = value.trunc() as i64;

        let (negative, mut digits, prefix) = match self.conversion {
            Conversion::Decimal => (n < 0, n.unsigned_abs().to_string(), ""),
            Conversion::Unsigned => (false, (n as u64).to_string(), ""),
            Conversion::Octal => {
                let prefix = if self.flags.alternate && n != 0 { "0" } else { "" };
                (false, format!("{:o}", n as u64), prefix)
            }
            Conversion::Hex { upper } => {
                let digits = if upper {
                    format!("{:X}", n as u64)
                } else {
                    format!("{:x}", n as u64)
                };
                let prefix = match (self.flags.alternate && n != 0, upper) {
                    (true, true) => "0X",
                    (true, false) => "0x",
                    _ => "",
                };
                (false, digits, prefix)
            }
            _ => unreachable!("float conversion routed to integer renderer"),
        };

        // Precision on integers is a minimum digit count
        if let Some(precision) = self.precision {
            if digits.len() < precision {
                digits = format!("{}{}", "0".repeat(precision - digits.len()), digits);
            }
        }

        let sign = self.flags.sign(negative);
        let zero_pad = self.flags.zero && self.precision.is_none();
        Ok(self.pad(sign, prefix, &digits, zero_pad))
    }

    fn render_float(&self, value: f64) -> String {
        let upper = matches!(
            self.conversion,
            Conversion::Fixed { upper: true }
                | Conversion::Exponent { upper: true }
                | Conversion::General { upper: true }
        );

        if value.is_nan() {
            let text = if upper { "NAN" } else { "nan" };
            return self.pad(self.flags.sign(false), "", text, false);
        }

        let negative = value.is_sign_negative();
        let sign = self.flags.sign(negative);

        if value.is_infinite() {
            let text = if upper { "INF" } else { "inf" };
            return self.pad(sign, "", text, false);
        }

        let magnitude = value.abs();
        let precision = self.precision.unwrap_or(DEFAULT_FLOAT_PRECISION);
        let body = match self.conversion {
            Conversion::Fixed { .. } => fixed(magnitude, precision, self.flags.alternate),
            Conversion::Exponent { .. } => {
                exponent(magnitude, precision, self.flags.alternate, upper)
            }
            Conversion::General { .. } => general(magnitude, precision, self.flags.alternate, upper),
            _ => unreachable!("integer conversion routed to float renderer"),
        };

        self.pad(sign, "", &body, self.flags.zero)
    }

    fn pad(&self, sign: &str, prefix: &str, digits: &str, zero_pad: bool) -> String {
        let len = sign.len() + prefix.len() + digits.len();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{sign}{prefix}{digits}");
        }

        let fill = width - len;
        if self.flags.left {
            format!("{sign}{prefix}{digits}{}", " ".repeat(fill))
        } else if zero_pad {
            format!("{sign}{prefix}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{sign}{prefix}{digits}", " ".repeat(fill))
        }
    }
}

fn fixed(magnitude: f64, precision: usize, alternate: bool) -> String {
    let mut body = format!("{:.*}", precision, magnitude);
    if alternate && precision == 0 {
        body.push('.');
    }
    body
}

/// Split Rust's `1.5e2` exponent form into mantissa and exponent
fn split_exponent(magnitude: f64, precision: usize) -> (String, i32) {
    let formatted = format!("{:.*e}", precision, magnitude);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (formatted, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32, upper: bool) -> String {
    let marker = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{marker}{sign}{:02}", exp.unsigned_abs())
}

fn exponent(magnitude: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let (mut mantissa, exp) = split_exponent(magnitude, precision);
    if alternate && precision == 0 {
        mantissa.push('.');
    }
    join_exponent(&mantissa, exp, upper)
}

fn general(magnitude: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let significant = precision.max(1);
    let (_, exp) = split_exponent(magnitude, significant - 1);

    if exp >= -4 && (exp as i64) < significant as i64 {
        let decimals = (significant as i64 - 1 - exp as i64) as usize;
        let body = format!("{:.*}", decimals, magnitude);
        if alternate {
            body
        } else {
            strip_trailing_zeros(&body)
        }
    } else {
        let (mantissa, exp) = split_exponent(magnitude, significant - 1);
        let mantissa = if alternate {
            mantissa
        } else {
            strip_trailing_zeros(&mantissa)
        };
        join_exponent(&mantissa, exp, upper)
    }
}

fn strip_trailing_zeros(body: &str) -> String {
    if body.contains('.') {
        body.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        body.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Value(Directive),
}

/// A parsed printf-style format holding at most one value directive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberFormat {
    source: String,
    pieces: Vec<Piece>,
}

impl NumberFormat {
    /// Parse a format string
    ///
    /// Fails for dangling `%`, `*` widths, widths or precisions above
    /// [`MAX_FIELD_WIDTH`], conversions other than `d i u o x X f F e E g G`,
    /// and formats with more than one value directive.
    pub fn parse(format: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut has_value = false;
        let mut cursor = 0;

        for caps in directive_regex().captures_iter(format) {
            let Some(whole) = caps.get(0) else { continue };
            literal.push_str(&format[cursor..whole.start()]);
            cursor = whole.end();

            let Some(conv) = caps.name("conv").and_then(|m| m.as_str().chars().next()) else {
                return Err(TallyError::invalid_format(format, "dangling '%' at end of format"));
            };

            if conv == '%' && whole.as_str() == "%%" {
                literal.push('%');
                continue;
            }

            let conversion = Conversion::from_char(conv).ok_or_else(|| {
                TallyError::invalid_format(format, format!("unsupported conversion '%{conv}'"))
            })?;

            let width = caps.name("width").map(|m| m.as_str());
            let precision = caps.name("precision").map(|m| m.as_str());
            if width == Some("*") || precision == Some("*") {
                return Err(TallyError::invalid_format(
                    format,
                    "'*' width and precision are not supported",
                ));
            }

            let width = width.map(|w| parse_field(format, "width", w)).transpose()?;
            // A bare "." means precision zero
            let precision = precision
                .map(|p| match p {
                    "" => Ok(0),
                    digits => parse_field(format, "precision", digits),
                })
                .transpose()?;

            if has_value {
                return Err(TallyError::invalid_format(
                    format,
                    "only one value directive is allowed",
                ));
            }
            has_value = true;

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Value(Directive {
                flags: Flags::parse(caps.name("flags").map_or("", |m| m.as_str())),
                width,
                precision,
                conversion,
            }));
        }

        literal.push_str(&format[cursor..]);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: format.to_string(),
            pieces,
        })
    }

    /// The format string this was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The value directive, if the format has one
    fn directive(&self) -> Option<&Directive> {
        self.pieces.iter().find_map(|piece| match piece {
            Piece::Value(directive) => Some(directive),
            Piece::Literal(_) => None,
        })
    }

    /// Whether the value is truncated to an integer before formatting
    pub fn is_integer(&self) -> bool {
        self.directive()
            .is_some_and(|d| d.conversion.is_integer())
    }

    /// Format a value
    pub fn render(&self, value: f64) -> Result<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Value(directive) => out.push_str(&directive.render(value)?),
            }
        }
        Ok(out)
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            source: DEFAULT_FORMAT.to_string(),
            pieces: vec![Piece::Value(Directive {
                flags: Flags::default(),
                width: None,
                precision: None,
                conversion: Conversion::Decimal,
            })],
        }
    }
}

impl FromStr for NumberFormat {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
