//! Preamble preservation.
//!
//! The leading lines of a file that must stay first (shebang, encoding cookie,
//! module docstring, the `__future__` import) are split off so the
//! compatibility import can go right after them.

use ft_ast::ErrorPolicy;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::charset::{decode_bytes, DecodeError};
use crate::registry::normalize_encoding;

/// The host's encoding-declaration pattern; group 1 is the encoding name.
pub static COOKIE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").unwrap());

/// Replacement for a cookie that names this codec.
const NEUTRAL_COOKIE: &str = "# -*- coding: utf-8";

/// A file split into its preserved head and the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preamble {
    pub preserved: Vec<Vec<u8>>,
    pub remaining: Vec<Vec<u8>>,
}

impl Preamble {
    /// Insert `line` as the first line of the remaining body.
    pub fn inject_import(&mut self, line: &str) {
        if let Some(last) = self.preserved.last_mut() {
            if !last.ends_with(b"\n") {
                last.push(b'\n');
            }
        }
        self.remaining.insert(0, line.as_bytes().to_vec());
    }

    /// Concatenate preserved and remaining lines.
    pub fn into_buffer(self) -> Vec<u8> {
        self.preserved
            .into_iter()
            .chain(self.remaining)
            .flatten()
            .collect()
    }
}

/// Split `content` after each `\n`, keeping terminators.
pub fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    content
        .split_inclusive(|&b| b == b'\n')
        .map(<[u8]>::to_vec)
        .collect()
}

/// Whether `line` is an encoding declaration.
pub fn is_encoding_cookie(line: &str) -> bool {
    COOKIE_RE.is_match(line)
}

/// Separate the preamble from the body.
///
/// Cookies on the first two lines that name `codec_name` are neutralized
/// first, so the output does not route back through this codec when read
/// again.
pub fn split_preamble(
    mut lines: Vec<Vec<u8>>,
    errors: ErrorPolicy,
    codec_name: &str,
) -> Result<Preamble, DecodeError> {
    neutralize_self_reference(&mut lines, errors, codec_name)?;

    let mut scan = PreambleScan::default();
    let mut preserved = 0;
    for line in &lines {
        let decoded = decode_bytes(line, errors)?;
        if !scan.accepts(&decoded) {
            break;
        }
        preserved += 1;
    }

    let remaining = lines.split_off(preserved);
    Ok(Preamble {
        preserved: lines,
        remaining,
    })
}

fn neutralize_self_reference(
    lines: &mut [Vec<u8>],
    errors: ErrorPolicy,
    codec_name: &str,
) -> Result<(), DecodeError> {
    let wanted = normalize_encoding(codec_name);
    for line in lines.iter_mut().take(2) {
        let decoded = decode_bytes(line, errors)?;
        let names_codec = COOKIE_RE
            .captures(&decoded)
            .is_some_and(|caps| normalize_encoding(&caps[1]) == wanted);
        if names_codec {
            let replaced = COOKIE_RE.replace(&decoded, NEUTRAL_COOKIE).into_owned();
            tracing::debug!(from = %decoded.trim_end(), to = %replaced.trim_end(), "neutralized cookie");
            *line = replaced.into_bytes();
        }
    }
    Ok(())
}

/// Line-by-line preamble state, rebuilt for every file.
#[derive(Debug, Default)]
struct PreambleScan {
    /// Closing delimiter of the module docstring while it is open.
    docstring: Option<&'static str>,
    future_import_found: bool,
    /// Unclosed `(` of the `__future__` import.
    future_parens: i32,
    /// The `__future__` import continues on the next line.
    future_open: bool,
}

impl PreambleScan {
    fn accepts(&mut self, line: &str) -> bool {
        let stripped = line.trim();

        if let Some(delim) = self.docstring {
            if stripped.contains(delim) {
                self.docstring = None;
            }
            return true;
        }

        if self.future_open {
            self.future_open = self.future_continues(line);
            return true;
        }

        if line == "\n" || line == "\r\n" || line.starts_with("#!") || is_encoding_cookie(line) {
            return true;
        }

        if let Some((delim, body)) = docstring_start(stripped) {
            // `"""Doc."""  # noqa` opens and closes on one line.
            if !body[delim.len()..].contains(delim) {
                self.docstring = Some(delim);
            }
            return true;
        }

        if stripped.starts_with("from __future__") && !self.future_import_found {
            self.future_import_found = true;
            self.future_open = self.future_continues(line);
            return true;
        }

        false
    }

    /// Track parentheses and `\` continuations of the `__future__` import.
    fn future_continues(&mut self, line: &str) -> bool {
        let code = line.split('#').next().unwrap_or_default();
        for c in code.chars() {
            match c {
                '(' => self.future_parens += 1,
                ')' => self.future_parens -= 1,
                _ => {}
            }
        }
        self.future_parens > 0 || code.trim_end().ends_with('\\')
    }
}

/// The triple-quote delimiter and the text from it onwards, if `stripped`
/// opens a docstring.
fn docstring_start(stripped: &str) -> Option<(&'static str, &str)> {
    let body = stripped
        .strip_prefix(['r', 'R', 'u', 'U'])
        .filter(|rest| rest.starts_with(['"', '\'']))
        .unwrap_or(stripped);
    ["\"\"\"", "'''"]
        .into_iter()
        .find(|delim| body.starts_with(delim))
        .map(|delim| (delim, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(source: &str) -> (String, String) {
        let preamble = split_preamble(
            split_lines(source.as_bytes()),
            ErrorPolicy::Strict,
            "future_typing",
        )
        .unwrap();
        let join = |lines: Vec<Vec<u8>>| String::from_utf8(lines.concat()).unwrap();
        (join(preamble.preserved), join(preamble.remaining))
    }

    #[test]
    fn keeps_shebang_cookie_docstring_and_future_import() {
        let source = "#!/usr/bin/env python\n# coding: utf-8\n\"\"\"Module.\n\nMore.\n\"\"\"\nfrom __future__ import annotations\n\nimport os\n";
        let (preserved, remaining) = split(source);
        assert_eq!(
            preserved,
            "#!/usr/bin/env python\n# coding: utf-8\n\"\"\"Module.\n\nMore.\n\"\"\"\nfrom __future__ import annotations\n\n"
        );
        assert_eq!(remaining, "import os\n");
    }

    #[test]
    fn closing_docstring_line_is_preserved() {
        let (preserved, remaining) = split("'''Doc\nends here'''\nx = 1\n");
        assert_eq!(preserved, "'''Doc\nends here'''\n");
        assert_eq!(remaining, "x = 1\n");
    }

    #[test]
    fn single_line_docstring_does_not_open() {
        let (preserved, remaining) = split("r\"\"\"Doc.\"\"\"\nx = 1\n");
        assert_eq!(preserved, "r\"\"\"Doc.\"\"\"\n");
        assert_eq!(remaining, "x = 1\n");
    }

    #[test]
    fn only_first_future_import_is_preserved() {
        let (preserved, remaining) = split(
            "from __future__ import annotations\nfrom __future__ import division\nx = 1\n",
        );
        assert_eq!(preserved, "from __future__ import annotations\n");
        assert_eq!(remaining, "from __future__ import division\nx = 1\n");
    }

    #[test]
    fn docstring_with_trailing_comment_closes() {
        let (preserved, remaining) = split(
            "\"\"\"Doc.\"\"\"  # noqa: D400\nimport os\n\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1\n",
        );
        assert_eq!(preserved, "\"\"\"Doc.\"\"\"  # noqa: D400\n");
        assert!(remaining.starts_with("import os\n"));

        let (preserved, remaining) = split("'''Doc\nends here'''  # noqa\nx = 1\n");
        assert_eq!(preserved, "'''Doc\nends here'''  # noqa\n");
        assert_eq!(remaining, "x = 1\n");
    }

    #[test]
    fn multiline_future_import_is_kept_whole() {
        let (preserved, remaining) = split(
            "from __future__ import (absolute_import,\n                        division)\nx = 1\n",
        );
        assert_eq!(
            preserved,
            "from __future__ import (absolute_import,\n                        division)\n"
        );
        assert_eq!(remaining, "x = 1\n");

        let (preserved, remaining) = split(
            "from __future__ import annotations, \\\n    division\nx = 1\n",
        );
        assert_eq!(
            preserved,
            "from __future__ import annotations, \\\n    division\n"
        );
        assert_eq!(remaining, "x = 1\n");
    }

    #[test]
    fn stopping_line_stays_in_body() {
        let (preserved, remaining) = split("# license\nx = 1\n");
        assert_eq!(preserved, "");
        assert_eq!(remaining, "# license\nx = 1\n");
    }

    #[test]
    fn neutralizes_own_cookie() {
        let (preserved, _) = split("#!/usr/bin/env python\n# -*- coding: future-typing -*-\nx = 1\n");
        assert_eq!(
            preserved,
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n"
        );

        // Cookies naming other encodings are left alone.
        let (preserved, _) = split("# vim: set fileencoding=latin-1 :\nx = 1\n");
        assert_eq!(preserved, "# vim: set fileencoding=latin-1 :\n");
    }

    #[test]
    fn neutralization_is_idempotent() {
        let once = split("# -*- coding: future_typing -*-\nx = 1\n");
        let again = split(&format!("{}{}", once.0, once.1));
        assert_eq!(once, again);
    }

    #[test]
    fn import_goes_first_in_body() {
        let mut preamble = Preamble {
            preserved: vec![b"\"\"\"Doc.\"\"\"".to_vec()],
            remaining: vec![],
        };
        preamble.inject_import("import typing as typing___\n");
        assert_eq!(
            String::from_utf8(preamble.into_buffer()).unwrap(),
            "\"\"\"Doc.\"\"\"\nimport typing as typing___\n"
        );
    }

    #[test]
    fn cookie_pattern() {
        assert!(is_encoding_cookie("# -*- coding: future_typing -*-\n"));
        assert!(is_encoding_cookie("  # vim: fileencoding=utf-8\n"));
        assert!(!is_encoding_cookie("x = 1  # coding: utf-8\n"));
    }
}
