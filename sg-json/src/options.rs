//! The `--json=` option grammar
//!
//! A string of single character toggles. `-`, `~` and `!` negate the
//! character that follows. The environment variable [`JSON_OPTS_ENV`] uses
//! the same grammar and is applied before the command line argument.

use crate::serialize::{SerializeMode, SerializeOptions};

pub const JSON_OPTS_ENV: &str = "SG3_UTILS_JSON_OPTS";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("bad json option character '{first_bad_char}'")]
pub struct JsonOptionsError {
    pub first_bad_char: char,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonOptions {
    /// `e`: append `exit_status` to the document
    pub exit_status: bool,
    /// `h`: show hex alongside decimal values
    pub hex: bool,
    /// `l`: lead-in with format version and invocation info
    pub leadin: bool,
    /// `n`: show name-extra annotations
    pub name_ex: bool,
    /// `o`: mirror human readable output into the document
    pub out_hr: bool,
    /// `k`: packed output (only used without `p`)
    pub packed: bool,
    /// `p`: pretty print
    pub pretty: bool,
    /// `s`: show string ("meaning") fields
    pub string: bool,
    /// `0|2`, `3`, `4`, `8`
    pub indent_size: usize,
    /// `v`, repeatable
    pub verbose: u32,
    /// `g` or `y`
    pub format: Option<char>,
    /// `q`, for the application's own use
    pub q_counter: u32,
    /// `z`, for the application's own use
    pub z_counter: u32,
    pub first_bad_char: Option<char>,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            exit_status: true,
            hex: false,
            leadin: true,
            name_ex: false,
            out_hr: false,
            packed: false,
            pretty: true,
            string: true,
            indent_size: 4,
            verbose: 0,
            format: None,
            q_counter: 0,
            z_counter: 0,
            first_bad_char: None,
        }
    }
}

impl JsonOptions {
    /// Apply an option string on top of the current settings.
    ///
    /// All valid characters are applied even if a bad one is found; the
    /// first bad character is remembered and returned as error.
    pub fn apply(&mut self, optarg: &str) -> Result<(), JsonOptionsError> {
        let mut bad_char = None;
        let mut prev_negate = false;

        for (pos, c) in optarg.trim_start().chars().enumerate() {
            let mut negate = false;
            let value = !prev_negate;

            match c {
                '=' if pos == 0 => {} // "--json=..." leftovers
                '!' | '~' | '-' => negate = true,
                '0' | '2' => self.indent_size = 2,
                '3' => self.indent_size = 3,
                '4' => self.indent_size = 4,
                '8' => self.indent_size = 8,
                'e' => self.exit_status = value,
                'g' => self.format = Some('g'),
                'h' => self.hex = value,
                'k' => self.packed = value,
                'l' => self.leadin = value,
                'n' => self.name_ex = value,
                'o' => self.out_hr = value,
                'p' => self.pretty = value,
                'q' => self.q_counter += 1,
                's' => self.string = value,
                'v' => self.verbose += 1,
                'y' => self.format = Some('y'),
                'z' => self.z_counter += 1,
                other => {
                    if bad_char.is_none() {
                        bad_char = Some(other);
                    }
                }
            }

            prev_negate = if negate { !prev_negate } else { false };
        }

        match bad_char {
            Some(first_bad_char) => {
                if self.first_bad_char.is_none() {
                    self.first_bad_char = Some(first_bad_char);
                }
                Err(JsonOptionsError { first_bad_char })
            }
            None => Ok(()),
        }
    }

    /// Parse a single option string on top of the defaults
    pub fn parse(optarg: &str) -> Result<Self, JsonOptionsError> {
        let mut opts = Self::default();
        opts.apply(optarg)?;
        Ok(opts)
    }

    /// Defaults, then the environment variable value, then the argument.
    ///
    /// A bad environment value is ignored (with a warning) and the
    /// defaults are restored before the argument is applied.
    pub fn from_sources(env: Option<&str>, optarg: Option<&str>) -> Result<Self, JsonOptionsError> {
        let mut opts = Self::default();

        if let Some(env) = env {
            if let Err(err) = opts.apply(env) {
                log::warn!("error parsing {JSON_OPTS_ENV} environment variable, ignored - {err}");
                opts = Self::default();
            }
        }

        if let Some(optarg) = optarg {
            opts.apply(optarg)?;
        }

        Ok(opts)
    }

    /// Like [`from_sources`](Self::from_sources), reading [`JSON_OPTS_ENV`]
    pub fn from_env_and_arg(optarg: Option<&str>) -> Result<Self, JsonOptionsError> {
        let env = std::env::var(JSON_OPTS_ENV).ok();
        Self::from_sources(env.as_deref(), optarg)
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        let mode = if self.pretty {
            SerializeMode::Multiline
        } else if self.packed {
            SerializeMode::Packed
        } else {
            SerializeMode::SingleLine
        };
        SerializeOptions {
            mode,
            indent_size: self.indent_size,
        }
    }

    /// Compact description of the active settings
    pub fn summary(&self) -> String {
        let flag = |value: bool, c: char| if value { c.to_string() } else { format!("-{c}") };
        let mut text = String::new();
        text.push_str(&self.indent_size.to_string());
        text.push_str(&flag(self.exit_status, 'e'));
        text.push_str(&flag(self.hex, 'h'));
        text.push_str(&flag(self.packed, 'k'));
        text.push_str(&flag(self.leadin, 'l'));
        text.push_str(&flag(self.name_ex, 'n'));
        text.push_str(&flag(self.out_hr, 'o'));
        text.push_str(&flag(self.pretty, 'p'));
        text.push_str(&flag(self.string, 's'));
        for _ in 0..self.verbose {
            text.push('v');
        }
        text
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let opts = JsonOptions::default();
        assert!(opts.pretty && opts.leadin && opts.exit_status && opts.string);
        assert!(!opts.hex && !opts.packed && !opts.out_hr && !opts.name_ex);
        assert_eq!(opts.indent_size, 4);
        assert_eq!(opts.serialize_options().mode, SerializeMode::Multiline);
    }

    #[test]
    fn toggles_and_negation() -> Result<(), JsonOptionsError> {
        let opts = JsonOptions::parse("=-p~lkh2vv")?;
        assert!(!opts.pretty);
        assert!(!opts.leadin);
        assert!(opts.packed);
        assert!(opts.hex);
        assert_eq!(opts.indent_size, 2);
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.serialize_options().mode, SerializeMode::Packed);

        // double negation
        let opts = JsonOptions::parse("--h")?;
        assert!(opts.hex);

        // negation only applies to the next character
        let opts = JsonOptions::parse("!eo")?;
        assert!(!opts.exit_status);
        assert!(opts.out_hr);

        let opts = JsonOptions::parse("  8qqzgy")?;
        assert_eq!(opts.indent_size, 8);
        assert_eq!((opts.q_counter, opts.z_counter), (2, 1));
        assert_eq!(opts.format, Some('y'));
        Ok(())
    }

    #[test]
    fn single_line_without_pretty_or_packed() -> Result<(), JsonOptionsError> {
        let opts = JsonOptions::parse("-p")?;
        assert_eq!(opts.serialize_options().mode, SerializeMode::SingleLine);
        Ok(())
    }

    #[test]
    fn bad_characters() {
        let mut opts = JsonOptions::default();
        assert_eq!(
            opts.apply("hx?"),
            Err(JsonOptionsError { first_bad_char: 'x' })
        );
        assert!(opts.hex);
        assert_eq!(opts.first_bad_char, Some('x'));

        assert_eq!(
            JsonOptions::parse("p=").unwrap_err().first_bad_char,
            '='
        );
        assert_eq!(JsonOptions::parse("?").unwrap_err().first_bad_char, '?');
    }

    #[test]
    fn environment_then_argument() -> Result<(), JsonOptionsError> {
        let opts = JsonOptions::from_sources(Some("hk"), Some("-h"))?;
        assert!(!opts.hex);
        assert!(opts.packed);

        // bad environment value is dropped completely
        let opts = JsonOptions::from_sources(Some("hX"), Some("n"))?;
        assert!(!opts.hex);
        assert!(opts.name_ex);
        assert_eq!(opts.first_bad_char, None);

        assert!(JsonOptions::from_sources(None, Some("b")).is_err());
        Ok(())
    }
}
