//! Colorized usage and help rendering.
//!
//! Rendering works on structured parts, not on a flat string: every
//! argument contributes one usage part and one help row, groups fold
//! their members into a single `(a | b)` part, and wrapping decisions
//! are made per part using visible widths so escape sequences never
//! distort the layout.
//!
//! The usage line keeps the program name on the first line and aligns
//! continuation lines under the first argument, unless the program name
//! eats more than 75% of the width, in which case the arguments start on
//! their own line.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::color::{code, visible_width, RESET};
use crate::parser::{ArgSpec, Nargs, Parser};
use crate::wrap::AnsiWrapper;

/// Color names for each element of the rendered help. Any name the color
/// table does not know renders as no color.
#[derive(Debug, Clone)]
pub struct HelpColors {
    pub usage: String,
    pub brackets: String,
    pub switches: String,
    pub values: String,
    pub colons: String,
    pub commas: String,
    pub section_headers: String,
    pub help: String,
    pub choices: String,
}

static DEFAULT_PALETTE: Lazy<HelpColors> = Lazy::new(|| HelpColors {
    usage: "cyan".into(),
    brackets: "light-red".into(),
    switches: "light-cyan".into(),
    values: "green".into(),
    colons: "light-red".into(),
    commas: "light-red".into(),
    section_headers: "light-green".into(),
    help: "light-white".into(),
    choices: "light-green".into(),
});

impl Default for HelpColors {
    fn default() -> Self {
        DEFAULT_PALETTE.clone()
    }
}

/// Minimum column width left for help text next to the invocation column.
const MIN_HELP_WIDTH: usize = 11;
/// Help text never starts further right than this column.
const MAX_HELP_POSITION: usize = 24;

impl Parser {
    /// The rendered `usage:` block, ending with a newline.
    pub fn render_usage(&self) -> String {
        let prefix = "usage: ";
        let text_width = self.total_width();
        let (opt_parts, pos_parts) = self.usage_parts();

        let all: Vec<String> = opt_parts.iter().chain(&pos_parts).cloned().collect();
        let one_line = if all.is_empty() {
            self.prog.clone()
        } else {
            format!("{} {}", self.prog, all.join(" "))
        };

        let body = if prefix.len() + visible_width(&one_line) <= text_width {
            one_line
        } else {
            usage_lines(&self.prog, &opt_parts, &pos_parts, prefix.len(), text_width).join("\n")
        };
        format!("{}{prefix}{body}{RESET}\n", code(&self.colors.usage))
    }

    /// The full help text: usage, description, argument sections, and
    /// epilog.
    pub fn render_help(&self) -> String {
        let width = self.total_width();
        let mut out = self.render_usage();
        out.push('\n');

        if let Some(desc) = &self.description {
            out.push_str(&AnsiWrapper::new(width).fill(desc));
            out.push_str("\n\n");
        }

        let positionals: Vec<(String, Option<String>)> = self
            .specs
            .iter()
            .filter(|s| s.is_positional() && !s.hidden)
            .map(|s| (self.format_invocation(s), s.help.clone()))
            .collect();

        let commands: Vec<(String, Option<String>)> = self
            .subs
            .iter()
            .map(|s| {
                (
                    format!("{}{}", code(&self.colors.switches), s.name),
                    s.help.clone(),
                )
            })
            .collect();

        let mut options: Vec<(String, Option<String>)> = vec![(
            format!(
                "{sw}--help{cm}, {sw}-h",
                sw = code(&self.colors.switches),
                cm = code(&self.colors.commas)
            ),
            Some("show this help message and exit".to_string()),
        )];
        options.extend(
            self.specs
                .iter()
                .filter(|s| !s.is_positional() && !s.hidden)
                .map(|s| (self.format_invocation(s), s.help.clone())),
        );

        // All sections share one help column so rows line up across them.
        let max_inv = positionals
            .iter()
            .chain(&commands)
            .chain(&options)
            .map(|(inv, _)| visible_width(inv))
            .max()
            .unwrap_or(0);
        let help_position = (max_inv + 4).min(MAX_HELP_POSITION);

        out.push_str(&self.render_section("positional arguments", &positionals, width, help_position));
        out.push_str(&self.render_section("commands", &commands, width, help_position));
        out.push_str(&self.render_section("options", &options, width, help_position));

        if let Some(epilog) = &self.epilog {
            out.push_str(&AnsiWrapper::new(width).fill(epilog));
            out.push('\n');
        }

        while out.ends_with('\n') {
            out.pop();
        }
        out.push_str(RESET);
        out.push('\n');
        out
    }

    fn total_width(&self) -> usize {
        self.width
            .unwrap_or_else(|| {
                let (_, cols) = console::Term::stdout().size();
                cols.saturating_sub(2) as usize
            })
            .max(20)
    }

    /// Usage parts for options and positionals, in registration order.
    /// Mutually exclusive groups whose visible members sit next to each
    /// other fold into one `(a | b)` / `[a | b]` part.
    fn usage_parts(&self) -> (Vec<String>, Vec<String>) {
        let c = &self.colors;
        let opt_indices: Vec<usize> = (0..self.specs.len())
            .filter(|&i| !self.specs[i].is_positional() && !self.specs[i].hidden)
            .collect();

        let mut covered: HashSet<usize> = HashSet::new();
        let mut group_at: HashMap<usize, (Vec<usize>, bool)> = HashMap::new();
        for group in &self.groups {
            let positions: Option<Vec<usize>> = group
                .members
                .iter()
                .map(|m| opt_indices.iter().position(|i| i == m))
                .collect();
            let Some(mut positions) = positions else {
                continue;
            };
            positions.sort_unstable();
            if positions.len() < 2 {
                continue;
            }
            let consecutive = positions.windows(2).all(|w| w[1] == w[0] + 1);
            if !consecutive {
                continue;
            }
            let members: Vec<usize> = positions.iter().map(|&p| opt_indices[p]).collect();
            for &m in &members {
                covered.insert(m);
            }
            group_at.insert(members[0], (members, group.required));
        }

        let mut opt_parts: Vec<String> = Vec::new();
        for &idx in &opt_indices {
            if let Some((members, required)) = group_at.get(&idx) {
                let inner: Vec<String> = members
                    .iter()
                    .map(|&m| self.option_core(&self.specs[m]))
                    .collect();
                let (open, close) = if *required { ("(", ")") } else { ("[", "]") };
                let sep = format!(" {}| ", code(&c.brackets));
                opt_parts.push(format!(
                    "{eb}{open}{body}{eb}{close}",
                    eb = code(&c.brackets),
                    body = inner.join(&sep),
                ));
                continue;
            }
            if covered.contains(&idx) {
                continue;
            }
            let spec = &self.specs[idx];
            let core = self.option_core(spec);
            if spec.required {
                opt_parts.push(core);
            } else {
                opt_parts.push(format!(
                    "{eb}[{core}{eb}]",
                    eb = code(&c.brackets)
                ));
            }
        }

        let mut pos_parts: Vec<String> = Vec::new();
        for spec in self.specs.iter().filter(|s| s.is_positional() && !s.hidden) {
            let mv = format!("{}{}", code(&c.usage), self.metavar(spec, false));
            let part = match (spec.nargs, spec.required) {
                (Nargs::ZeroOrMore, _) => format!(
                    "{eb}[{mv} ...{eb}]{eu}",
                    eb = code(&c.brackets),
                    eu = code(&c.usage)
                ),
                (_, false) => format!(
                    "{eb}[{mv}{eb}]{eu}",
                    eb = code(&c.brackets),
                    eu = code(&c.usage)
                ),
                _ => mv,
            };
            pos_parts.push(part);
        }
        if !self.subs.is_empty() {
            let names: Vec<&str> = self.subs.iter().map(|s| s.name.as_str()).collect();
            pos_parts.push(format!(
                "{eb}{{{ec}{names}{eb}}}{eu} ...",
                eb = code(&c.brackets),
                ec = code(&c.choices),
                eu = code(&c.usage),
                names = names.join(","),
            ));
        }

        (opt_parts, pos_parts)
    }

    /// One option as it appears in usage, without surrounding brackets:
    /// the first (long) flag plus its value placeholder.
    fn option_core(&self, spec: &ArgSpec) -> String {
        let c = &self.colors;
        let flag = format!("{}{}", code(&c.switches), spec.flags[0]);
        match spec.nargs {
            Nargs::Zero => flag,
            Nargs::One => format!("{flag} {}{}", code(&c.values), self.metavar(spec, false)),
            Nargs::ZeroOrMore => format!(
                "{flag} {eb}[{ev}{mv} ...{eb}]",
                eb = code(&c.brackets),
                ev = code(&c.values),
                mv = self.metavar(spec, false),
            ),
        }
    }

    /// The invocation column of one help row: every flag with its value
    /// placeholder, or the bare metavar for a positional.
    fn format_invocation(&self, spec: &ArgSpec) -> String {
        let c = &self.colors;
        if spec.is_positional() {
            return format!("{}{}", code(&c.values), self.metavar(spec, true));
        }
        let mv = match spec.nargs {
            Nargs::Zero => String::new(),
            Nargs::One => format!(" {}{}", code(&c.values), self.metavar(spec, true)),
            Nargs::ZeroOrMore => format!(
                " {eb}[{ev}{mv} ...{eb}]",
                eb = code(&c.brackets),
                ev = code(&c.values),
                mv = self.metavar(spec, true),
            ),
        };
        let parts: Vec<String> = spec
            .flags
            .iter()
            .map(|f| format!("{}{f}{mv}", code(&c.switches)))
            .collect();
        parts.join(&format!("{}, ", code(&c.commas)))
    }

    /// Value placeholder: the choice set when one exists, the metavar
    /// otherwise. Help rows get the spaced form, usage the compact one.
    fn metavar(&self, spec: &ArgSpec, spaced: bool) -> String {
        let c = &self.colors;
        let Some(choices) = &spec.resolved.choices else {
            return spec.metavar.clone();
        };
        let sep = if spaced { ", " } else { "," };
        let body: Vec<String> = choices
            .iter()
            .map(|ch| format!("{}{ch}", code(&c.choices)))
            .collect();
        let joined = body.join(&format!("{}{sep}", code(&c.commas)));
        if spaced {
            format!("{eb}{{ {joined} {eb}}}", eb = code(&c.brackets))
        } else {
            format!("{eb}{{{joined}{eb}}}", eb = code(&c.brackets))
        }
    }

    /// One two-column section: heading, then per-item invocation and
    /// wrapped help text. The help column position adapts to the widest
    /// invocation, capped so narrow terminals keep room for text.
    fn render_section(
        &self,
        heading: &str,
        items: &[(String, Option<String>)],
        width: usize,
        help_position: usize,
    ) -> String {
        if items.is_empty() {
            return String::new();
        }
        let c = &self.colors;
        let help_width = width.saturating_sub(help_position).max(MIN_HELP_WIDTH);
        let action_width = help_position.saturating_sub(4);

        let mut out = format!(
            "{eh}{heading}{ec}:{RESET}\n",
            eh = code(&c.section_headers),
            ec = code(&c.colons),
        );
        for (inv, help) in items {
            let help = help.as_deref().filter(|h| !h.is_empty());
            let Some(help) = help else {
                out.push_str(&format!("  {inv}{RESET}\n"));
                continue;
            };
            let colored = format!("{}{help}", code(&c.help));
            let wrapped = AnsiWrapper::new(help_width).wrap(&colored);
            let inv_w = visible_width(inv);
            let mut lines = wrapped.iter();
            if inv_w <= action_width {
                let pad = " ".repeat(help_position - 2 - inv_w);
                let first = lines.next().cloned().unwrap_or_default();
                out.push_str(&format!("  {inv}{pad}{first}\n"));
            } else {
                out.push_str(&format!("  {inv}\n"));
            }
            for line in lines {
                out.push_str(&" ".repeat(help_position));
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }
}

/// Wrapped usage layout. Parts stay atomic; a part never breaks across
/// lines.
fn usage_lines(
    prog: &str,
    opt: &[String],
    pos: &[String],
    prefix_len: usize,
    text_width: usize,
) -> Vec<String> {
    let prog_w = visible_width(prog);
    if prefix_len + prog_w <= (text_width * 3) / 4 {
        // Continuation lines align under the first argument.
        let indent = " ".repeat(prefix_len + prog_w + 1);
        if !opt.is_empty() {
            let mut first: Vec<String> = vec![prog.to_string()];
            first.extend(opt.iter().cloned());
            let mut lines = get_lines(&first, &indent, Some(prefix_len), text_width);
            lines.extend(get_lines(pos, &indent, None, text_width));
            lines
        } else if !pos.is_empty() {
            let mut first: Vec<String> = vec![prog.to_string()];
            first.extend(pos.iter().cloned());
            get_lines(&first, &indent, Some(prefix_len), text_width)
        } else {
            vec![prog.to_string()]
        }
    } else {
        // The program name is too wide; arguments start on their own line.
        let indent = " ".repeat(prefix_len);
        let all: Vec<String> = opt.iter().chain(pos).cloned().collect();
        let mut lines = get_lines(&all, &indent, None, text_width);
        if lines.len() > 1 {
            lines = get_lines(opt, &indent, None, text_width);
            lines.extend(get_lines(pos, &indent, None, text_width));
        }
        let mut out = vec![prog.to_string()];
        out.extend(lines);
        out
    }
}

fn get_lines(
    parts: &[String],
    indent: &str,
    prefix_len: Option<usize>,
    text_width: usize,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut line: Vec<String> = Vec::new();
    let mut line_len = prefix_len.unwrap_or(indent.len()).saturating_sub(1);
    for part in parts {
        let part_w = visible_width(part);
        if line_len + 1 + part_w > text_width && !line.is_empty() {
            lines.push(format!("{indent}{}", line.join(" ")));
            line.clear();
            line_len = indent.len().saturating_sub(1);
        }
        line_len += 1 + part_w;
        line.push(part.clone());
    }
    if !line.is_empty() {
        lines.push(format!("{indent}{}", line.join(" ")));
    }
    // With a prefix the first line continues the "usage: " line itself.
    if prefix_len.is_some() {
        if let Some(first) = lines.first_mut() {
            *first = first[indent.len()..].to_string();
        }
    }
    lines
}
