//! StringFormat factor: template substitution over string distributions.
//!
//! The template is literal text with brace-delimited `{k}` placeholders.
//! The forward message is the concatenation of literal point-mass
//! automata with the argument automata; when every argument is a point
//! mass, plain text substitution replaces automaton construction. The
//! backward message to an argument projects the string belief onto the
//! placeholder's section, which for literal surroundings is the
//! `between` intersection; the point-mass fast path is raw text search.

use ff_common::{OpResult, OperatorError};
use ff_dist::StringAutomaton;

/// One parsed template piece.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(usize),
}

fn parse_template(format: &str, arg_count: usize) -> OpResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut digits = String::new();
                let mut closed = false;
                for d in chars.by_ref() {
                    if d == '}' {
                        closed = true;
                        break;
                    }
                    digits.push(d);
                }
                if !closed {
                    return Err(OperatorError::DomainMismatch {
                        argument: "format",
                        message: "unterminated placeholder".to_string(),
                    });
                }
                let index: usize = digits.parse().map_err(|_| OperatorError::DomainMismatch {
                    argument: "format",
                    message: format!("malformed placeholder '{{{digits}'"),
                })?;
                if index >= arg_count {
                    return Err(OperatorError::DomainMismatch {
                        argument: "format",
                        message: format!("placeholder {{{index}}} exceeds {arg_count} arguments"),
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(index));
            }
            '}' => {
                return Err(OperatorError::DomainMismatch {
                    argument: "format",
                    message: "unmatched '}' in template".to_string(),
                });
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// EP message to the formatted string.
pub fn str_average_conditional(
    format: &str,
    args: &[StringAutomaton],
) -> OpResult<StringAutomaton> {
    let segments = parse_template(format, args.len())?;
    let points: Option<Vec<String>> = args.iter().map(|a| a.try_point()).collect();
    if let Some(points) = points {
        // Point-mass fast path: plain substitution
        let mut out = String::new();
        for seg in &segments {
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(k) => out.push_str(&points[*k]),
            }
        }
        return Ok(StringAutomaton::point_mass(&out));
    }
    let mut result = StringAutomaton::point_mass("");
    for seg in &segments {
        let piece = match seg {
            Segment::Literal(text) => StringAutomaton::point_mass(text),
            Segment::Placeholder(k) => args[*k].clone(),
        };
        result = result.concat(&piece);
    }
    Ok(result)
}

/// Literal text surrounding one placeholder, with every other argument
/// substituted at its point value.
fn surrounding_text(
    segments: &[Segment],
    args: &[StringAutomaton],
    arg_index: usize,
) -> OpResult<(String, String)> {
    let occurrences = segments
        .iter()
        .filter(|s| **s == Segment::Placeholder(arg_index))
        .count();
    if occurrences != 1 {
        return Err(OperatorError::NotSupported {
            reason: "argument extraction requires exactly one placeholder occurrence",
        });
    }
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut seen = false;
    for seg in segments {
        match seg {
            Segment::Placeholder(k) if *k == arg_index => {
                seen = true;
            }
            Segment::Literal(text) => {
                if seen {
                    suffix.push_str(text);
                } else {
                    prefix.push_str(text);
                }
            }
            Segment::Placeholder(k) => {
                let point = args[*k].try_point().ok_or(OperatorError::NotSupported {
                    reason: "argument extraction requires the other arguments to be point masses",
                })?;
                if seen {
                    suffix.push_str(&point);
                } else {
                    prefix.push_str(&point);
                }
            }
        }
    }
    Ok((prefix, suffix))
}

/// EP message to argument `arg_index`.
///
/// The string belief is projected onto the placeholder's section. An
/// observed string that does not match the surrounding text yields the
/// zero distribution (zero likelihood), never a failure.
pub fn arg_average_conditional(
    str_msg: &StringAutomaton,
    format: &str,
    args: &[StringAutomaton],
    arg_index: usize,
) -> OpResult<StringAutomaton> {
    let segments = parse_template(format, args.len())?;
    let (prefix, suffix) = surrounding_text(&segments, args, arg_index)?;
    if let Some(observed) = str_msg.try_point() {
        // Raw text search instead of automaton construction
        if observed.len() >= prefix.len() + suffix.len()
            && observed.starts_with(&prefix)
            && observed.ends_with(&suffix)
        {
            let middle = &observed[prefix.len()..observed.len() - suffix.len()];
            return Ok(StringAutomaton::point_mass(middle));
        }
        return Ok(StringAutomaton::zero());
    }
    Ok(str_msg.between(&prefix, &suffix))
}

/// Evidence: log-weight the forward belief assigns to the observed string.
pub fn log_average_factor(
    observed: &str,
    format: &str,
    args: &[StringAutomaton],
) -> OpResult<f64> {
    let forward = str_average_conditional(format, args)?;
    Ok(forward.log_weight_of(observed))
}

/// Derived output: no evidence contribution when the string is uncertain.
pub fn log_evidence_ratio(
    str_msg: &StringAutomaton,
    format: &str,
    args: &[StringAutomaton],
) -> OpResult<f64> {
    match str_msg.try_point() {
        Some(observed) => log_average_factor(&observed, format, args),
        None => Ok(0.0),
    }
}
