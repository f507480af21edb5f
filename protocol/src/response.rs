//! Parsing of the ASCII lines returned by `READ?` and friends.

use crate::error::ProtocolError;

/// Terminator appended to every command we send.
pub const COMMAND_TERMINATOR: u8 = b'\n';

/// Byte which ends a response line. Instruments send `\r\n`, the `\r` is removed by
/// [`strip_terminator`].
pub const RESPONSE_TERMINATOR: u8 = b'\n';

#[derive(Debug, PartialEq, Clone)]
pub enum Response {
    Scalar(f64),
    Vector(Vec<f64>),
}

/// Remove the line terminator and any trailing control bytes.
pub fn strip_terminator(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| c.is_ascii_control())
}

fn parse_number(x: &str) -> Option<f64> {
    x.trim().parse::<f64>().ok()
}

pub fn parse(raw: &str) -> Result<Response, ProtocolError> {
    let line = strip_terminator(raw);
    if line.contains(',') {
        parse_vector(raw).map(Response::Vector)
    } else {
        parse_scalar(raw).map(Response::Scalar)
    }
}

pub fn parse_scalar(raw: &str) -> Result<f64, ProtocolError> {
    let line = strip_terminator(raw);
    parse_number(line).ok_or_else(|| ProtocolError::Parse(line.to_string()))
}

/// Parse a comma separated list of numbers. Fails unless every segment is a number.
pub fn parse_vector(raw: &str) -> Result<Vec<f64>, ProtocolError> {
    let line = strip_terminator(raw);
    line.split(',')
        .map(parse_number)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ProtocolError::Parse(line.to_string()))
}

/// Parse each comma separated segment on its own. Segments which are not numbers are
/// returned as `Err` carrying the segment text.
pub fn parse_segments(raw: &str) -> Vec<Result<f64, String>> {
    strip_terminator(raw)
        .split(',')
        .map(|segment| parse_number(segment).ok_or_else(|| segment.trim().to_string()))
        .collect()
}
