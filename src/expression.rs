//! Sed expression parsing for the command-line front end
//!
//! Turns the classic one-command notations into [`Operation`]s:
//! `s/pattern/replacement/flags`, `/pattern/d`, `/pattern/p`, `Nd`, `Np`
//! and the reserved `i\`, `a\`, `c\` forms.

use anyhow::{anyhow, bail, Result};

use crate::operation::{Operation, OperationKind};

const DELIMITERS: [char; 4] = ['/', '#', ':', '|'];

/// Parse several expressions, one operation each.
pub fn parse_expressions<S: AsRef<str>>(exprs: &[S]) -> Result<Vec<Operation>> {
    exprs
        .iter()
        .map(|expr| parse_expression(expr.as_ref()))
        .collect()
}

pub fn parse_expression(expr: &str) -> Result<Operation> {
    let cmd = expr.trim();
    if cmd.is_empty() {
        bail!("Empty sed expression");
    }

    if let Some(rest) = cmd.strip_prefix('s') {
        if rest.starts_with(DELIMITERS) {
            return parse_substitution(rest);
        }
    }

    if cmd.starts_with('/') {
        return parse_pattern_command(cmd);
    }

    parse_addressed_command(cmd)
}

/// `rest` starts right after the `s`.
fn parse_substitution(rest: &str) -> Result<Operation> {
    let mut chars = rest.chars();
    let delimiter = chars
        .next()
        .ok_or_else(|| anyhow!("Missing delimiter"))?;

    let parts = split_on_delimiter(chars.as_str(), delimiter);
    if parts.len() < 3 {
        bail!("Invalid substitution syntax. Expected: s/pattern/replacement/flags");
    }
    if parts.len() > 3 {
        bail!(
            "Unexpected '{}' after substitution flags. Escape it as '\\{}'",
            delimiter,
            delimiter
        );
    }

    let flags = parts[2].trim();
    if let Some(bad) = flags.chars().find(|c| !matches!(c, 'g' | 'i' | 'm' | 's')) {
        bail!("Unknown substitution flag '{}'", bad);
    }

    Ok(Operation::builder(OperationKind::Substitute)
        .pattern(parts[0].clone())
        .replacement(convert_sed_backreferences(&parts[1]))
        .flags(flags)
        .build()?)
}

/// `/pattern/[flags]d` or `/pattern/[flags]p`
fn parse_pattern_command(cmd: &str) -> Result<Operation> {
    let parts = split_on_delimiter(&cmd[1..], '/');
    if parts.len() != 2 {
        bail!("Invalid pattern command: {}. Expected: /pattern/d or /pattern/p", cmd);
    }

    let tail: String = parts[1].chars().filter(|c| !c.is_whitespace()).collect();
    let Some(letter) = tail.chars().last() else {
        bail!("Missing command after pattern in: {}", cmd);
    };
    let flags = &tail[..tail.len() - letter.len_utf8()];

    let kind = match letter {
        'd' => OperationKind::Delete,
        'p' => OperationKind::Print,
        other => bail!("Unsupported command '{}' after pattern; expected d or p", other),
    };

    Ok(Operation::builder(kind)
        .pattern(parts[0].clone())
        .flags(flags.to_ascii_lowercase())
        .build()?)
}

/// `[address]d`, `[address]p`, `[address]i\text`, `[address]a\text`, `[address]c\text`
fn parse_addressed_command(cmd: &str) -> Result<Operation> {
    let address_len = cmd
        .find(|c: char| !(c.is_ascii_digit() || c == '$' || c == ','))
        .unwrap_or(cmd.len());
    let (address, rest) = cmd.split_at(address_len);

    let mut chars = rest.chars();
    let letter = chars
        .next()
        .ok_or_else(|| anyhow!("Missing command in expression: {}", cmd))?;
    let kind: OperationKind = letter.to_string().parse()?;
    let rest = chars.as_str();

    let mut builder = Operation::builder(kind);
    if !address.is_empty() {
        builder = builder.address(address);
    }

    match kind {
        OperationKind::Insert | OperationKind::Append | OperationKind::Change => {
            let text = rest.strip_prefix('\\').unwrap_or(rest).trim_start();
            Ok(builder.text(text).build()?)
        }
        OperationKind::Delete | OperationKind::Print if rest.trim().is_empty() => {
            if address.is_empty() {
                bail!(
                    "'{}' needs a pattern: use /pattern/{}",
                    letter,
                    letter
                );
            }
            Ok(builder.build()?)
        }
        _ => bail!("Invalid sed expression: {}", cmd),
    }
}

/// Split on unescaped `delimiter`; `\<delimiter>` becomes a literal delimiter.
fn split_on_delimiter(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == delimiter => {
                    chars.next();
                    push_char(&mut parts, delimiter);
                }
                Some(&next) => {
                    chars.next();
                    push_char(&mut parts, '\\');
                    push_char(&mut parts, next);
                }
                None => push_char(&mut parts, '\\'),
            }
        } else if c == delimiter {
            parts.push(String::new());
        } else {
            push_char(&mut parts, c);
        }
    }

    parts
}

fn push_char(parts: &mut [String], c: char) {
    if let Some(last) = parts.last_mut() {
        last.push(c);
    }
}

/// Convert sed replacement syntax to regex-crate syntax:
/// `\1` -> `${1}`, `&` -> `${0}`, `\&` -> `&`, `\n` -> newline, `$` -> `$$`.
fn convert_sed_backreferences(replacement: &str) -> String {
    let mut result = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(digit) if digit.is_ascii_digit() => {
                    result.push_str("${");
                    result.push(digit);
                    result.push('}');
                }
                Some('&') => result.push('&'),
                Some('\\') => result.push('\\'),
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            '&' => result.push_str("${0}"),
            '$' => result.push_str("$$"),
            _ => result.push(c),
        }
    }

    result
}
