//! Collision-avoiding flag generation.
//!
//! Every parameter claims one long flag and, in dashed mode, optionally
//! one short flag. A reserved-flags set is threaded through the whole
//! build so flags stay pairwise distinct across a parser (and across a
//! sub-command tree sharing one set). `--help`/`-h` are always reserved.

use std::collections::HashSet;

use crate::error::ConfigError;

/// A fresh reserved set with the built-in help flags claimed.
pub fn reserved_defaults() -> HashSet<String> {
    HashSet::from(["--help".to_string(), "-h".to_string()])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagMode {
    /// `--long` / `-s` option flags.
    Dashed,
    /// Bare names, used for positional slots.
    Bare,
}

/// Lowercase hyphen/underscore-separated rendering of a name:
/// camel humps split, punctuation replaced, separator runs collapsed.
pub fn normalize_snake_case(name: &str, sep: char) -> String {
    let replaced: Vec<char> = name
        .chars()
        .map(|c| if c.is_ascii_punctuation() { sep } else { c })
        .collect();
    let mut out = String::with_capacity(replaced.len());
    let mut i = 0;
    while i < replaced.len() {
        let c = replaced[i];
        if c.is_whitespace() || c == sep {
            while i + 1 < replaced.len() && (replaced[i + 1].is_whitespace() || replaced[i + 1] == sep)
            {
                i += 1;
            }
            out.push(sep);
        } else {
            out.push(c.to_ascii_lowercase());
            if c.is_ascii_alphabetic()
                && replaced.get(i + 1).map(|n| n.is_ascii_uppercase()).unwrap_or(false)
            {
                out.push(sep);
            }
        }
        i += 1;
    }
    out
}

/// Separator rendering that preserves the original case: punctuation is
/// replaced and whitespace/separator runs collapse, nothing else changes.
pub fn normalize(name: &str, sep: char) -> String {
    let replaced: Vec<char> = name
        .chars()
        .map(|c| {
            if c.is_ascii_punctuation() || c.is_whitespace() {
                sep
            } else {
                c
            }
        })
        .collect();
    let mut out = String::with_capacity(replaced.len());
    let mut i = 0;
    while i < replaced.len() {
        let c = replaced[i];
        if c == sep {
            while i + 1 < replaced.len() && replaced[i + 1] == sep {
                i += 1;
            }
            out.push(sep);
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

fn capitalized(snake: &str) -> String {
    let mut chars = snake.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn initials(name: &str) -> String {
    normalize_snake_case(name, '_')
        .split('_')
        .filter_map(|part| part.chars().next())
        .collect()
}

/// Generates flags for `name`, mutating `reserved` on success.
///
/// Long-flag candidates are tried in order: snake case, case-preserving,
/// the raw name, capitalized, upper-cased. Short-flag candidates (dashed
/// mode only): first letter lower, first letter upper, word initials,
/// initials capitalized, initials upper-cased. The long flag comes first
/// in the returned list.
///
/// Fails when bare mode exhausts every long candidate, or when neither a
/// long nor a short flag could be produced.
pub fn generate_flags(
    name: &str,
    mode: FlagMode,
    reserved: &mut HashSet<String>,
) -> Result<Vec<String>, ConfigError> {
    let base = match mode {
        FlagMode::Dashed => "--",
        FlagMode::Bare => "",
    };
    let mut flags: Vec<String> = Vec::new();

    let snake = normalize_snake_case(name, '-');
    let long_candidates = [
        format!("{base}{snake}"),
        format!("{base}{}", normalize(name, '-')),
        format!("{base}{name}"),
        format!("{base}{}", capitalized(&snake)),
        format!("{base}{}", normalize(name, '-').to_uppercase()),
    ];
    match long_candidates.iter().find(|c| !reserved.contains(*c)) {
        Some(flag) => flags.push(flag.clone()),
        None => {
            if mode == FlagMode::Bare {
                return Err(ConfigError::FlagGeneration(name.to_string()));
            }
        }
    }

    if mode == FlagMode::Dashed {
        let first = name.chars().next().unwrap_or('_');
        let inits = initials(name);
        let inits_cap = capitalized(&inits);
        let short_candidates = [
            format!("-{}", first.to_ascii_lowercase()),
            format!("-{}", first.to_ascii_uppercase()),
            format!("-{inits}"),
            format!("-{inits_cap}"),
            format!("-{}", inits.to_uppercase()),
        ];
        if let Some(flag) = short_candidates.iter().find(|c| !reserved.contains(*c)) {
            flags.push(flag.clone());
        }
    }

    if flags.is_empty() {
        return Err(ConfigError::FlagGeneration(name.to_string()));
    }
    for flag in &flags {
        reserved.insert(flag.clone());
    }
    tracing::debug!(name, ?flags, "generated flags");
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_normalization() {
        assert_eq!(normalize_snake_case("main", '_'), "main");
        assert_eq!(normalize_snake_case("MyClassName", '_'), "my_class_name");
        assert_eq!(normalize_snake_case("HelloWorld", '_'), "hello_world");
        assert_eq!(normalize_snake_case("myVar", '_'), "my_var");
        assert_eq!(normalize_snake_case("It's cool", '_'), "it_s_cool");
        assert_eq!(normalize_snake_case("test-name", '_'), "test_name");
    }

    #[test]
    fn case_preserving_normalization() {
        assert_eq!(normalize("MyFunction", '_'), "MyFunction");
        assert_eq!(normalize("It's cool", '_'), "It_s_cool");
        assert_eq!(normalize("test-name", '_'), "test_name");
    }

    #[test]
    fn plain_name_yields_long_and_short() {
        let mut reserved = reserved_defaults();
        let flags = generate_flags("verbose", FlagMode::Dashed, &mut reserved).unwrap();
        assert_eq!(flags, vec!["--verbose".to_string(), "-v".to_string()]);
        assert!(reserved.contains("--verbose"));
        assert!(reserved.contains("-v"));
    }

    #[test]
    fn help_flags_are_pre_reserved() {
        let mut reserved = reserved_defaults();
        let flags = generate_flags("host", FlagMode::Dashed, &mut reserved).unwrap();
        // "-h" is taken by help, so the short flag escalates.
        assert_eq!(flags, vec!["--host".to_string(), "-H".to_string()]);
    }

    #[test]
    fn collisions_escalate_through_candidates() {
        let mut reserved = reserved_defaults();
        let a = generate_flags("dry_run", FlagMode::Dashed, &mut reserved).unwrap();
        let b = generate_flags("dryRun", FlagMode::Dashed, &mut reserved).unwrap();
        assert_eq!(a[0], "--dry-run");
        // Second name snake-cases to the same flag and falls through to the
        // case-preserving candidate.
        assert_eq!(b[0], "--dryRun");
        assert_ne!(a[1], b[1]);
    }

    #[test]
    fn generation_is_deterministic_and_disjoint() {
        let names = ["alpha", "beta", "gamma", "alphaBeta", "alpha_beta2"];
        let run = || {
            let mut reserved = reserved_defaults();
            names
                .iter()
                .map(|n| generate_flags(n, FlagMode::Dashed, &mut reserved).unwrap())
                .collect::<Vec<_>>()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);

        let mut seen = std::collections::HashSet::new();
        for flags in &first {
            for flag in flags {
                assert!(seen.insert(flag.clone()), "duplicate flag {flag}");
            }
        }
    }

    #[test]
    fn bare_mode_failure_when_exhausted() {
        let mut reserved = reserved_defaults();
        for taken in ["value", "Value", "VALUE"] {
            reserved.insert(taken.to_string());
        }
        let err = generate_flags("value", FlagMode::Bare, &mut reserved);
        assert!(matches!(err, Err(ConfigError::FlagGeneration(_))));
    }

    #[test]
    fn short_flag_omission_is_not_an_error() {
        let mut reserved = reserved_defaults();
        for flag in ["-x", "-X"] {
            reserved.insert(flag.to_string());
        }
        // "x" has one segment, so the initials candidates repeat "-x"/"-X".
        let flags = generate_flags("x", FlagMode::Dashed, &mut reserved).unwrap();
        assert_eq!(flags, vec!["--x".to_string()]);
    }
}
