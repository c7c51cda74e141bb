//! Quoted-comma textual parser (spec §6), in scope unlike the host/FFI
//! handle registry. Turns a Python `set`/`frozenset` literal's source text
//! into the list of raw element byte-strings it names, so callers that
//! only have a textual representation (not an already-split list of
//! elements) can still build a binary set.
//!
//! Grounded on `python_set_as_string` in
//! `examples/original_source/src/settrie/settrie.cpp`: operates on raw
//! bytes rather than `char*`, since a quoted comma is remapped to the
//! sentinel byte `0x82`, which is not valid standalone UTF-8.

/// Sentinel byte a comma is remapped to while inside a quoted run, so the
/// subsequent comma-split does not treat it as a delimiter. Mirrors the
/// original's `0x82` — it is not unescaped back to `,` afterward, so an
/// element produced from a quoted comma literally carries this byte.
pub const QUOTED_COMMA_SENTINEL: u8 = 0x82;

/// Parses a full set-literal (`set()`, `frozenset({...})`, or `{...}`)
/// into its elements, splitting on top-level commas.
pub fn parse_python_set_literal(input: &[u8]) -> Vec<Vec<u8>> {
    split_on_separator(&normalize(input), b',')
}

/// Strips the set/frozenset wrapper and, for brace-wrapped input, removes
/// one space following each top-level comma and protects commas that
/// appear inside a quoted run. Input that is not fully brace-wrapped is
/// returned unchanged (matching the reference, which only special-cases
/// the bracketed form).
fn normalize(input: &[u8]) -> Vec<u8> {
    if input == b"set()" {
        return Vec::new();
    }

    let mut data = input;

    // "frozenset({ . . . })" — once the prefix is recognized, a malformed
    // paren wrapper is a hard reject, not a fall-through to pass-through.
    if data.len() > 10 && &data[0..4] == b"froz" {
        if data[9] != b'(' || data[data.len() - 1] != b')' {
            return Vec::new();
        }
        let inner = &data[10..data.len() - 1];
        if inner.len() < 3 {
            return Vec::new();
        }
        data = inner;
    }

    if data.is_empty() || data[0] != b'{' || data[data.len() - 1] != b'}' {
        return data.to_vec();
    }

    let inner = &data[1..data.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut quote_lev: u8 = 0;
    let mut trailing_space_run = false;

    for &byte in inner {
        match byte {
            b'\'' => {
                quote_lev = match quote_lev {
                    0 => 1,
                    1 => 0,
                    other => other,
                };
                out.push(byte);
                trailing_space_run = false;
            }
            b'"' => {
                quote_lev = match quote_lev {
                    0 => 2,
                    2 => 0,
                    other => other,
                };
                out.push(byte);
                trailing_space_run = false;
            }
            b' ' => {
                if !trailing_space_run {
                    out.push(b' ');
                }
            }
            b',' => {
                if quote_lev == 0 {
                    out.push(b',');
                    trailing_space_run = true;
                } else {
                    out.push(QUOTED_COMMA_SENTINEL);
                }
            }
            other => {
                out.push(other);
                trailing_space_run = false;
            }
        }
    }

    out
}

/// Splits on `sep`, mirroring `std::getline` over a `std::stringstream`:
/// an empty input produces zero elements (not one empty element), and a
/// trailing separator does not produce a final empty element.
fn split_on_separator(data: &[u8], sep: u8) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<Vec<u8>> = data.split(|&b| b == sep).map(|part| part.to_vec()).collect();
    if data.last() == Some(&sep) {
        parts.pop();
    }
    parts
}
