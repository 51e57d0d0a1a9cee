//! The `info.txt` result record.
//!
//! One line per result directory:
//!
//! ```text
//! "before_rgb.png" "after_rgb.png" 97.4213
//! ```
//!
//! Names are double-quoted with `"` and `\` escaped by a backslash. The
//! score is printed with six significant digits and trailing zeros removed.
//! This line is the contract between `png-compare` and `aggregate`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the record inside a result directory.
pub const RECORD_FILE: &str = "info.txt";

/// Score and renamed source files of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// File name of the first source copy (e.g. `before_rgb.png`).
    pub name1: String,
    /// File name of the second source copy.
    pub name2: String,
    /// Mean SSIM scaled to 0-100.
    pub score: f64,
}

impl ResultRecord {
    /// Create a record.
    #[must_use]
    pub fn new(name1: impl Into<String>, name2: impl Into<String>, score: f64) -> Self {
        Self {
            name1: name1.into(),
            name2: name2.into(),
            score,
        }
    }

    /// Read and parse a record file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        parse_record(&text).map_err(|reason| Error::Record {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Write the record (with trailing newline).
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, format!("{self}\n"))?;
        Ok(())
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            quote(&self.name1),
            quote(&self.name2),
            format_score(self.score)
        )
    }
}

impl FromStr for ResultRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_record(s).map_err(|reason| Error::Record {
            path: Default::default(),
            reason,
        })
    }
}

/// Wrap a string in double quotes, escaping `"` and `\`.
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Format a score with six significant digits, `%g` style.
#[must_use]
pub fn format_score(score: f64) -> String {
    const PRECISION: i32 = 6;

    if score == 0.0 || !score.is_finite() {
        return score.to_string();
    }

    let exponent = score.abs().log10().floor() as i32;
    if !(-5..PRECISION).contains(&exponent) {
        let formatted = format!("{:.*e}", (PRECISION - 1) as usize, score);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_zeros(mantissa), exp),
            None => formatted,
        };
    }

    let decimals = (PRECISION - 1 - exponent).max(0) as usize;
    trim_zeros(&format!("{score:.decimals$}")).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Cursor over one record line.
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Next token, unquoting it if it starts with `"`.
    fn next_name(&mut self) -> std::result::Result<String, String> {
        self.skip_ws();
        let Some(body) = self.rest.strip_prefix('"') else {
            return self.next_bare().map(str::to_string);
        };

        let mut out = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                '"' => {
                    self.rest = &body[i + 1..];
                    return Ok(out);
                }
                other => out.push(other),
            }
        }
        Err("unterminated quoted name".to_string())
    }

    fn next_bare(&mut self) -> std::result::Result<&'a str, String> {
        self.skip_ws();
        if self.rest.is_empty() {
            return Err("unexpected end of record".to_string());
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(token)
    }
}

fn parse_record(text: &str) -> std::result::Result<ResultRecord, String> {
    let mut fields = Fields { rest: text };
    let name1 = fields.next_name()?;
    let name2 = fields.next_name()?;
    let token = fields.next_bare()?;
    let score = token
        .parse::<f64>()
        .map_err(|e| format!("invalid score '{token}': {e}"))?;
    Ok(ResultRecord {
        name1,
        name2,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(100.0), "100");
        assert_eq!(format_score(99.98765432), "99.9877");
        assert_eq!(format_score(50.0), "50");
        assert_eq!(format_score(0.0100023456), "0.0100023");
        assert_eq!(format_score(-12.5), "-12.5");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(99.999999), "100");
        assert_eq!(format_score(0.0000012345), "1.2345e-6");
    }

    #[test]
    fn test_display() {
        let record = ResultRecord::new("a_rgb.png", "b_rgb.png", 87.25);
        assert_eq!(record.to_string(), r#""a_rgb.png" "b_rgb.png" 87.25"#);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"we"ird\name"#), r#""we\"ird\\name""#);
        let record = ResultRecord::new(r#"we"ird\name_rgb.png"#, "b c_rgb.png", 1.0);
        let parsed: ResultRecord = record.to_string().parse().unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parse_bare_names() {
        let parsed: ResultRecord = "a.png b.png 12.5\n".parse().unwrap();
        assert_eq!(parsed, ResultRecord::new("a.png", "b.png", 12.5));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "\"a.png\"", "\"a.png\" \"b.png\"", "\"a.png\" \"b.png\" high", "\"a.png"] {
            assert!(
                matches!(bad.parse::<ResultRecord>(), Err(Error::Record { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_read_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(RECORD_FILE);
        let record = ResultRecord::new("x_rgb.png", "y_rgb.png", 42.125);
        record.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "\"x_rgb.png\" \"y_rgb.png\" 42.125\n");
        assert_eq!(ResultRecord::read(&path).unwrap(), record);
    }
}
