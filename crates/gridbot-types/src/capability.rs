//! Per-level syntax capability flags.
//!
//! A level enables or disables whole language constructs. The flags are
//! stored in the level file under `allowed_keywords`, keyed by the keyword
//! or bracket character the learner would type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language construct a level can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Construct {
    For,
    Def,
    /// The `set` constructor name.
    Set,
    /// The `list` constructor name.
    List,
    /// The `dict` constructor name.
    Dict,
    If,
    /// Read from level files and written back, but not enforced.
    Else,
    While,
    Not,
    And,
    Or,
    Break,
    Continue,
    /// Subscripts and list literals.
    Bracket,
    /// Dict and set literals.
    Brace,
}

impl Construct {
    pub const ALL: [Construct; 15] = [
        Construct::For,
        Construct::Def,
        Construct::Set,
        Construct::List,
        Construct::Dict,
        Construct::If,
        Construct::Else,
        Construct::While,
        Construct::Not,
        Construct::And,
        Construct::Or,
        Construct::Break,
        Construct::Continue,
        Construct::Bracket,
        Construct::Brace,
    ];

    /// The key used for this construct in a level file.
    pub fn key(self) -> &'static str {
        match self {
            Construct::For => "for",
            Construct::Def => "def",
            Construct::Set => "set",
            Construct::List => "list",
            Construct::Dict => "dict",
            Construct::If => "if",
            Construct::Else => "else",
            Construct::While => "while",
            Construct::Not => "not",
            Construct::And => "and",
            Construct::Or => "or",
            Construct::Break => "break",
            Construct::Continue => "continue",
            Construct::Bracket => "[",
            Construct::Brace => "{",
        }
    }

    pub fn from_key(key: &str) -> Option<Construct> {
        Construct::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Bracket => f.write_str("brackets [ ]"),
            Construct::Brace => f.write_str("braces { }"),
            other => f.write_str(other.key()),
        }
    }
}

/// Which constructs a level permits. Missing keys default to allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedConstructs {
    #[serde(rename = "for")]
    pub for_loop: bool,
    #[serde(rename = "def")]
    pub def: bool,
    #[serde(rename = "set")]
    pub set_name: bool,
    #[serde(rename = "list")]
    pub list_name: bool,
    #[serde(rename = "dict")]
    pub dict_name: bool,
    #[serde(rename = "if")]
    pub if_stmt: bool,
    #[serde(rename = "else")]
    pub else_branch: bool,
    #[serde(rename = "while")]
    pub while_loop: bool,
    #[serde(rename = "not")]
    pub not: bool,
    #[serde(rename = "and")]
    pub and: bool,
    #[serde(rename = "or")]
    pub or: bool,
    #[serde(rename = "break")]
    pub break_stmt: bool,
    #[serde(rename = "continue")]
    pub continue_stmt: bool,
    #[serde(rename = "[")]
    pub bracket: bool,
    #[serde(rename = "{")]
    pub brace: bool,
}

impl AllowedConstructs {
    /// Every construct enabled.
    pub fn all() -> Self {
        Self::filled(true)
    }

    /// Every construct disabled: only plain calls, assignments and expressions remain.
    pub fn none() -> Self {
        Self::filled(false)
    }

    fn filled(value: bool) -> Self {
        Self {
            for_loop: value,
            def: value,
            set_name: value,
            list_name: value,
            dict_name: value,
            if_stmt: value,
            else_branch: value,
            while_loop: value,
            not: value,
            and: value,
            or: value,
            break_stmt: value,
            continue_stmt: value,
            bracket: value,
            brace: value,
        }
    }

    fn slot(&mut self, construct: Construct) -> &mut bool {
        match construct {
            Construct::For => &mut self.for_loop,
            Construct::Def => &mut self.def,
            Construct::Set => &mut self.set_name,
            Construct::List => &mut self.list_name,
            Construct::Dict => &mut self.dict_name,
            Construct::If => &mut self.if_stmt,
            Construct::Else => &mut self.else_branch,
            Construct::While => &mut self.while_loop,
            Construct::Not => &mut self.not,
            Construct::And => &mut self.and,
            Construct::Or => &mut self.or,
            Construct::Break => &mut self.break_stmt,
            Construct::Continue => &mut self.continue_stmt,
            Construct::Bracket => &mut self.bracket,
            Construct::Brace => &mut self.brace,
        }
    }

    pub fn allows(&self, construct: Construct) -> bool {
        match construct {
            Construct::For => self.for_loop,
            Construct::Def => self.def,
            Construct::Set => self.set_name,
            Construct::List => self.list_name,
            Construct::Dict => self.dict_name,
            Construct::If => self.if_stmt,
            Construct::Else => self.else_branch,
            Construct::While => self.while_loop,
            Construct::Not => self.not,
            Construct::And => self.and,
            Construct::Or => self.or,
            Construct::Break => self.break_stmt,
            Construct::Continue => self.continue_stmt,
            Construct::Bracket => self.bracket,
            Construct::Brace => self.brace,
        }
    }

    pub fn set(&mut self, construct: Construct, allowed: bool) {
        *self.slot(construct) = allowed;
    }

    /// Builder form of [`AllowedConstructs::set`].
    pub fn with(mut self, construct: Construct, allowed: bool) -> Self {
        self.set(construct, allowed);
        self
    }
}

impl Default for AllowedConstructs {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_key() {
        for construct in Construct::ALL {
            assert_eq!(Construct::from_key(construct.key()), Some(construct));
        }
        assert_eq!(Construct::from_key("elif"), None);
    }

    #[test]
    fn set_and_allows_touch_only_one_flag() {
        for construct in Construct::ALL {
            let flags = AllowedConstructs::all().with(construct, false);
            for other in Construct::ALL {
                assert_eq!(flags.allows(other), other != construct, "{other:?}");
            }
        }
    }

    #[test]
    fn level_file_keys_deserialize_and_missing_keys_default_to_allowed() {
        let json = r#"{ "for": false, "[": false, "{": true, "unknown": false }"#;
        let flags: AllowedConstructs = serde_json::from_str(json).unwrap();
        assert!(!flags.allows(Construct::For));
        assert!(!flags.allows(Construct::Bracket));
        assert!(flags.allows(Construct::Brace));
        assert!(flags.allows(Construct::While));
    }

    #[test]
    fn serializes_with_level_file_keys() {
        let json = serde_json::to_value(AllowedConstructs::none()).unwrap();
        for construct in Construct::ALL {
            assert_eq!(json[construct.key()], serde_json::Value::Bool(false));
        }
    }

    #[test]
    fn display_names_brackets_like_the_editor() {
        assert_eq!(Construct::Bracket.to_string(), "brackets [ ]");
        assert_eq!(Construct::Brace.to_string(), "braces { }");
        assert_eq!(Construct::While.to_string(), "while");
    }
}
