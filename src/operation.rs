//! Operation model
//!
//! An [`Operation`] is the only input to the engine. Each variant carries
//! exactly the payload its kind needs, so a substitute without a replacement
//! or an insert without text cannot be represented.

use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// The six recognised sed actions. Only the first three are executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Substitute,
    Delete,
    Print,
    Insert,
    Append,
    Change,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Substitute,
        OperationKind::Delete,
        OperationKind::Print,
        OperationKind::Insert,
        OperationKind::Append,
        OperationKind::Change,
    ];

    /// The single-letter sed command for this kind.
    pub fn command(self) -> &'static str {
        match self {
            OperationKind::Substitute => "s",
            OperationKind::Delete => "d",
            OperationKind::Print => "p",
            OperationKind::Insert => "i",
            OperationKind::Append => "a",
            OperationKind::Change => "c",
        }
    }

    pub fn is_executable(self) -> bool {
        matches!(
            self,
            OperationKind::Substitute | OperationKind::Delete | OperationKind::Print
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Substitute => "Substitute",
            OperationKind::Delete => "Delete",
            OperationKind::Print => "Print",
            OperationKind::Insert => "Insert",
            OperationKind::Append => "Append",
            OperationKind::Change => "Change",
        };
        f.write_str(name)
    }
}

impl FromStr for OperationKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.command() == s)
            .ok_or_else(|| BuildError::UnknownCommand(s.to_string()))
    }
}

/// Regex modifiers. `g` controls match scope, the rest map to regex options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    /// g - replace every match instead of the first
    pub global: bool,

    /// i - case-insensitive matching
    pub case_insensitive: bool,

    /// m - `^` and `$` match at line boundaries
    pub multi_line: bool,

    /// s - `.` matches `\n`
    pub dot_matches_new_line: bool,
}

impl Flags {
    /// Parse a flag string. Unrecognised letters are ignored.
    pub fn parse(flags: &str) -> Self {
        let mut parsed = Flags::default();
        for c in flags.chars() {
            match c {
                'g' => parsed.global = true,
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                _ => {}
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        *self == Flags::default()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, letter) in [
            (self.global, 'g'),
            (self.case_insensitive, 'i'),
            (self.multi_line, 'm'),
            (self.dot_matches_new_line, 's'),
        ] {
            if set {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl From<&str> for Flags {
    fn from(flags: &str) -> Self {
        Flags::parse(flags)
    }
}

/// How a delete/print operation selects its lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Lines where the regex matches anywhere
    Pattern(String),

    /// Reserved line address (e.g. `5`, `$`). Not executable.
    Address(String),
}

/// A validated description of one editing operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// s/pattern/replacement/flags
    Substitute {
        pattern: String,
        replacement: String,
        flags: Flags,
    },

    /// /pattern/d
    Delete { selector: Selector, flags: Flags },

    /// /pattern/p (filter semantics)
    Print { selector: Selector, flags: Flags },

    /// i\text (reserved)
    Insert { text: String, address: Option<String> },

    /// a\text (reserved)
    Append { text: String, address: Option<String> },

    /// c\text (reserved)
    Change { text: String, address: Option<String> },
}

impl Operation {
    pub fn builder(kind: OperationKind) -> OperationBuilder {
        OperationBuilder::new(kind)
    }

    pub fn substitute(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        flags: impl Into<Flags>,
    ) -> Self {
        Operation::Substitute {
            pattern: pattern.into(),
            replacement: replacement.into(),
            flags: flags.into(),
        }
    }

    pub fn delete(pattern: impl Into<String>, flags: impl Into<Flags>) -> Self {
        Operation::Delete {
            selector: Selector::Pattern(pattern.into()),
            flags: flags.into(),
        }
    }

    pub fn print(pattern: impl Into<String>, flags: impl Into<Flags>) -> Self {
        Operation::Print {
            selector: Selector::Pattern(pattern.into()),
            flags: flags.into(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Substitute { .. } => OperationKind::Substitute,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Print { .. } => OperationKind::Print,
            Operation::Insert { .. } => OperationKind::Insert,
            Operation::Append { .. } => OperationKind::Append,
            Operation::Change { .. } => OperationKind::Change,
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match self {
            Operation::Substitute { pattern, .. } => Some(pattern),
            Operation::Delete { selector, .. } | Operation::Print { selector, .. } => {
                match selector {
                    Selector::Pattern(pattern) => Some(pattern),
                    Selector::Address(_) => None,
                }
            }
            _ => None,
        }
    }

    pub fn replacement(&self) -> Option<&str> {
        match self {
            Operation::Substitute { replacement, .. } => Some(replacement),
            _ => None,
        }
    }

    /// Flags of the operation; the reserved kinds carry none.
    pub fn flags(&self) -> Flags {
        match self {
            Operation::Substitute { flags, .. }
            | Operation::Delete { flags, .. }
            | Operation::Print { flags, .. } => *flags,
            _ => Flags::default(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Operation::Insert { text, .. }
            | Operation::Append { text, .. }
            | Operation::Change { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Operation::Delete { selector, .. } | Operation::Print { selector, .. } => {
                match selector {
                    Selector::Address(address) => Some(address),
                    Selector::Pattern(_) => None,
                }
            }
            Operation::Insert { address, .. }
            | Operation::Append { address, .. }
            | Operation::Change { address, .. } => address.as_deref(),
            Operation::Substitute { .. } => None,
        }
    }
}

/// Flat, field-by-field construction of an [`Operation`].
///
/// Used by adapters that receive loosely typed requests. `build` checks the
/// fields the kind requires and fails naming the first one missing.
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    kind: OperationKind,
    pattern: Option<String>,
    replacement: Option<String>,
    flags: String,
    text: Option<String>,
    address: Option<String>,
}

impl OperationBuilder {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            pattern: None,
            replacement: None,
            flags: String::new(),
            text: None,
            address: None,
        }
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn build(self) -> Result<Operation, BuildError> {
        let kind = self.kind;
        let flags = Flags::parse(&self.flags);

        match kind {
            OperationKind::Substitute => {
                let pattern = self.pattern.ok_or(BuildError::MissingField {
                    kind,
                    field: "pattern",
                })?;
                let replacement = self.replacement.ok_or(BuildError::MissingField {
                    kind,
                    field: "replacement",
                })?;
                Ok(Operation::Substitute {
                    pattern,
                    replacement,
                    flags,
                })
            }
            OperationKind::Delete | OperationKind::Print => {
                let selector = match (self.pattern, self.address) {
                    (Some(_), Some(_)) => return Err(BuildError::ConflictingSelector(kind)),
                    (Some(pattern), None) if pattern.trim().is_empty() => {
                        return Err(BuildError::MissingField {
                            kind,
                            field: "pattern",
                        });
                    }
                    (Some(pattern), None) => Selector::Pattern(pattern),
                    (None, Some(address)) => Selector::Address(address),
                    (None, None) => {
                        return Err(BuildError::MissingField {
                            kind,
                            field: "pattern or address",
                        });
                    }
                };
                if kind == OperationKind::Delete {
                    Ok(Operation::Delete { selector, flags })
                } else {
                    Ok(Operation::Print { selector, flags })
                }
            }
            OperationKind::Insert | OperationKind::Append | OperationKind::Change => {
                let text = self.text.ok_or(BuildError::MissingField {
                    kind,
                    field: "text",
                })?;
                let address = self.address;
                Ok(match kind {
                    OperationKind::Insert => Operation::Insert { text, address },
                    OperationKind::Append => Operation::Append { text, address },
                    _ => Operation::Change { text, address },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_command_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.command().parse::<OperationKind>().unwrap(), kind);
        }
        assert!("x".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_only_three_kinds_executable() {
        let executable: Vec<_> = OperationKind::ALL
            .into_iter()
            .filter(|k| k.is_executable())
            .collect();
        assert_eq!(
            executable,
            vec![
                OperationKind::Substitute,
                OperationKind::Delete,
                OperationKind::Print
            ]
        );
    }

    #[test]
    fn test_flags_parse() {
        let flags = Flags::parse("gim");
        assert!(flags.global);
        assert!(flags.case_insensitive);
        assert!(flags.multi_line);
        assert!(!flags.dot_matches_new_line);
        assert_eq!(flags.to_string(), "gim");
    }

    #[test]
    fn test_flags_order_and_unknown_letters_ignored() {
        assert_eq!(Flags::parse("sg"), Flags::parse("gs"));
        assert_eq!(Flags::parse("xyz"), Flags::default());
        assert!(Flags::parse("").is_empty());
    }

    #[test]
    fn test_builder_substitute_requires_replacement() {
        let err = Operation::builder(OperationKind::Substitute)
            .pattern("foo")
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Substitute"));
        assert!(msg.contains("replacement"));
    }

    #[test]
    fn test_builder_substitute_accepts_empty_replacement() {
        let op = Operation::builder(OperationKind::Substitute)
            .pattern("foo")
            .replacement("")
            .flags("g")
            .build()
            .unwrap();
        assert_eq!(op, Operation::substitute("foo", "", "g"));
        assert_eq!(op.replacement(), Some(""));
    }

    #[test]
    fn test_builder_substitute_requires_pattern() {
        let err = Operation::builder(OperationKind::Substitute)
            .replacement("bar")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn test_builder_delete_with_address_only() {
        let op = Operation::builder(OperationKind::Delete)
            .address("5")
            .build()
            .unwrap();
        assert_eq!(op.kind(), OperationKind::Delete);
        assert_eq!(op.pattern(), None);
        assert_eq!(op.address(), Some("5"));
    }

    #[test]
    fn test_builder_print_requires_selector() {
        let err = Operation::builder(OperationKind::Print).build().unwrap_err();
        assert!(err.to_string().contains("Print"));
    }

    #[test]
    fn test_builder_delete_and_print_reject_blank_pattern() {
        for kind in [OperationKind::Delete, OperationKind::Print] {
            for blank in ["", "   ", "\t"] {
                let err = Operation::builder(kind).pattern(blank).build().unwrap_err();
                assert_eq!(
                    err,
                    BuildError::MissingField {
                        kind,
                        field: "pattern"
                    }
                );
            }
        }
    }

    #[test]
    fn test_builder_rejects_pattern_with_address() {
        let err = Operation::builder(OperationKind::Delete)
            .pattern("foo")
            .address("3")
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::ConflictingSelector(OperationKind::Delete));
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_builder_reserved_kinds_require_text() {
        for kind in [
            OperationKind::Insert,
            OperationKind::Append,
            OperationKind::Change,
        ] {
            let err = Operation::builder(kind).build().unwrap_err();
            assert!(err.to_string().contains("text"));

            let op = Operation::builder(kind).text("hello").build().unwrap();
            assert_eq!(op.kind(), kind);
            assert_eq!(op.text(), Some("hello"));
        }
    }

    #[test]
    fn test_structural_equality_and_hash() {
        use std::collections::HashSet;

        let a = Operation::substitute("a", "b", "gi");
        let b = Operation::substitute("a", "b", "ig");
        let c = Operation::substitute("a", "b", "g");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
