//! `%define`/`%if`/`%endif` preprocessing (SPEC_FULL.md §2.1 — the front
//! end's preprocessor subset is deliberately small: object-like `%define`
//! and `%if` on constant integer conditions only, never `%macro`/`%rep`).

use std::collections::HashMap;

pub fn preprocess(input: &str) -> Result<String, String> {
    let mut defines: HashMap<String, String> = HashMap::new();
    let mut active_stack: Vec<bool> = Vec::new();
    let mut out = String::with_capacity(input.len());

    for raw_line in input.lines() {
        let trimmed = raw_line.trim_start();
        let active = active_stack.iter().all(|a| *a);

        if let Some(rest) = trimmed.strip_prefix("%define") {
            if active {
                define(rest.trim(), &mut defines)?;
            }
        } else if let Some(rest) = trimmed.strip_prefix("%if") {
            let cond_text = expand(rest.trim(), &defines);
            let truthy = active && eval_constant_condition(&cond_text)?;
            active_stack.push(truthy);
        } else if trimmed.starts_with("%else") {
            match active_stack.last_mut() {
                Some(top) => *top = !*top,
                None => return Err("%else without matching %if".to_owned()),
            }
        } else if trimmed.starts_with("%endif") {
            if active_stack.pop().is_none() {
                return Err("%endif without matching %if".to_owned());
            }
        } else if active {
            out.push_str(&expand(raw_line, &defines));
        }
        out.push('\n');
    }

    if !active_stack.is_empty() {
        return Err("unterminated %if".to_owned());
    }

    Ok(out)
}

fn define(rest: &str, defines: &mut HashMap<String, String>) -> Result<(), String> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_owned();
    if name.is_empty() {
        return Err("%define requires a name".to_owned());
    }
    let value = parts.next().unwrap_or("").trim().to_owned();
    defines.insert(name, value);
    Ok(())
}

fn expand(line: &str, defines: &HashMap<String, String>) -> String {
    if defines.is_empty() {
        return line.to_owned();
    }
    let chars: Vec<char> = line.chars().collect();
    let mut result = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if is_ident_start(chars[i]) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match defines.get(&word) {
                Some(value) => result.push_str(value),
                None => result.push_str(&word),
            }
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }
    result
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn eval_constant_condition(text: &str) -> Result<bool, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("%if requires a condition".to_owned());
    }
    let (body, radix) = if let Some(rest) = text.strip_prefix("0x") {
        (rest, 16)
    } else {
        (text, 10)
    };
    let value = i64::from_str_radix(body, radix)
        .map_err(|_| format!("%if condition \"{}\" is not a constant integer", text))?;
    Ok(value != 0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn define_is_substituted() {
        let out = preprocess("%define WIDTH 4\nmov ax, WIDTH\n").unwrap();
        assert_eq!(out.trim(), "\nmov ax, 4");
    }

    #[test]
    fn if_false_drops_body() {
        let out = preprocess("%if 0\nmov ax, 1\n%endif\nmov bx, 2\n").unwrap();
        assert!(!out.contains("mov ax, 1"));
        assert!(out.contains("mov bx, 2"));
    }

    #[test]
    fn if_true_keeps_body() {
        let out = preprocess("%if 1\nmov ax, 1\n%endif\n").unwrap();
        assert!(out.contains("mov ax, 1"));
    }
}
