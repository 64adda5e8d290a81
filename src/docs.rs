//! Best-effort documentation parsing.
//!
//! A command's free-form doc string is split into a short description and
//! per-parameter help entries. Parameters missing from the doc simply get
//! no help text; parameters documented but not declared are ignored.
//!
//! The recognized parameter syntax is the field-list form:
//!
//! ```text
//! Adds two numbers.
//!
//! :param a: the first operand
//! :param b: the second operand,
//!     folded over continuation lines
//! ```

#[derive(Debug, Clone, Default)]
pub struct DocInfo {
    pub short_description: Option<String>,
    /// Parameter help in source order.
    pub params: Vec<(String, String)>,
}

impl DocInfo {
    pub fn param_help(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_str())
    }
}

/// Parses a raw doc string. Never fails: anything unrecognized is skipped.
pub fn parse(raw: &str) -> DocInfo {
    let mut info = DocInfo::default();
    let mut short: Vec<&str> = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut in_short = true;

    for line in raw.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix(":param ") {
            flush(&mut current, &mut info);
            in_short = false;
            if let Some((name, desc)) = rest.split_once(':') {
                current = Some((name.trim().to_string(), desc.trim().to_string()));
            }
            continue;
        }

        if trimmed.starts_with(':') {
            // Another field (":returns:", ":raises:", ...) ends any open
            // parameter entry.
            flush(&mut current, &mut info);
            in_short = false;
            continue;
        }

        if let Some((_, desc)) = current.as_mut() {
            if trimmed.is_empty() {
                flush(&mut current, &mut info);
            } else {
                if !desc.is_empty() {
                    desc.push(' ');
                }
                desc.push_str(trimmed);
            }
            continue;
        }

        if in_short {
            if trimmed.is_empty() {
                if !short.is_empty() {
                    in_short = false;
                }
            } else {
                short.push(trimmed);
            }
        }
    }
    flush(&mut current, &mut info);

    if !short.is_empty() {
        info.short_description = Some(short.join(" "));
    }
    info
}

fn flush(current: &mut Option<(String, String)>, info: &mut DocInfo) {
    if let Some((name, desc)) = current.take() {
        if !name.is_empty() {
            info.params.push((name, desc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_description_is_first_paragraph() {
        let doc = "Adds two numbers\ntogether.\n\nLonger prose here.";
        let info = parse(doc);
        assert_eq!(
            info.short_description.as_deref(),
            Some("Adds two numbers together.")
        );
    }

    #[test]
    fn params_are_extracted_in_order() {
        let doc = "Greets.\n\n:param name: who to greet\n:param times: how often";
        let info = parse(doc);
        assert_eq!(info.params.len(), 2);
        assert_eq!(info.param_help("name"), Some("who to greet"));
        assert_eq!(info.param_help("times"), Some("how often"));
    }

    #[test]
    fn continuation_lines_fold() {
        let doc = ":param path: the input\n    file to read";
        let info = parse(doc);
        assert_eq!(info.param_help("path"), Some("the input file to read"));
    }

    #[test]
    fn other_fields_are_ignored() {
        let doc = "Does a thing.\n\n:param x: an x\n:returns: nothing";
        let info = parse(doc);
        assert_eq!(info.params.len(), 1);
    }

    #[test]
    fn empty_doc_yields_nothing() {
        let info = parse("");
        assert!(info.short_description.is_none());
        assert!(info.params.is_empty());
    }
}
