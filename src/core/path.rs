//! Path resolution over JSON values.
//!
//! A path is a leading bare key followed by any mix of `.key` and `[index]`
//! tokens, e.g. `result.value[0].pubkey`. The empty path addresses the value
//! itself. Resolution never fails loudly: anything that cannot be followed
//! yields `None` and the caller decides whether that is fatal.

use serde_json::Value;

/// Default depth bound for [`enumerate`].
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Key(&'a str),
    Index(usize),
}

fn tokenize(path: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let bytes = path.as_bytes();
    let mut pos = 0;
    let mut first = true;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                let close = path[pos..].find(']')? + pos;
                let index = path[pos + 1..close].trim().parse::<usize>().ok()?;
                tokens.push(Token::Index(index));
                pos = close + 1;
            }
            b'.' if !first => {
                let start = pos + 1;
                let end = key_end(path, start);
                if end == start {
                    return None;
                }
                tokens.push(Token::Key(&path[start..end]));
                pos = end;
            }
            b'.' | b']' => return None,
            _ if first => {
                let end = key_end(path, pos);
                tokens.push(Token::Key(&path[pos..end]));
                pos = end;
            }
            _ => return None,
        }
        first = false;
    }

    Some(tokens)
}

fn key_end(path: &str, start: usize) -> usize {
    path[start..]
        .find(['.', '[', ']'])
        .map(|offset| start + offset)
        .unwrap_or(path.len())
}

/// Look up the value at `path`, or `None` when nothing is there.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let tokens = tokenize(path)?;
    let mut current = value;
    for token in tokens {
        current = match (token, current) {
            (Token::Key(key), Value::Object(map)) => map.get(key)?,
            (Token::Index(idx), Value::Array(items)) => items.get(idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Every addressable path of `value` in pre-order, down to `max_depth` tokens.
///
/// Keys that the path grammar cannot express are not listed.
pub fn enumerate(value: &Value, max_depth: usize) -> Vec<String> {
    let mut paths = Vec::new();
    walk(value, "", 0, max_depth, &mut paths);
    paths
}

fn walk(value: &Value, prefix: &str, depth: usize, max_depth: usize, out: &mut Vec<String>) {
    if depth >= max_depth {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if !is_addressable_key(key) {
                    continue;
                }
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                out.push(path.clone());
                walk(child, &path, depth + 1, max_depth, out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                let path = format!("{}[{}]", prefix, idx);
                out.push(path.clone());
                walk(child, &path, depth + 1, max_depth, out);
            }
        }
        _ => {}
    }
}

fn is_addressable_key(key: &str) -> bool {
    !key.is_empty() && key.trim() == key && !key.contains(['.', '[', ']'])
}
