//! # Config Files
//!
//! Line-oriented `key = value` files with `[profile]` sections:
//!
//! ```text
//! # comment
//! vo = xv:port=42
//! [fast]
//! profile-desc = "skip the overlay"
//! mirror = yes
//! [default]
//! include = extra.conf
//! ```
//!
//! A bad line is logged and skipped. Once [`MAX_ERRORS`] lines have failed
//! the next line aborts the whole file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const MAX_RECURSION_DEPTH: u32 = 8;
pub const MAX_LINE_LEN: usize = 10000;
pub const MAX_OPT_LEN: usize = 1000;
pub const MAX_PARAM_LEN: usize = 1500;
pub const MAX_ERRORS: usize = 16;

const INCLUDE_OPTION: &str = "include";
const PROFILE_DESC_OPTION: &str = "profile-desc";
const DEFAULT_PROFILE: &str = "default";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config file {0} not found")]
    NotFound(PathBuf),
    #[error("{path}: too deep 'include' (depth {depth})")]
    TooDeep { path: PathBuf, depth: u32 },
    #[error("{origin}:{line}: too many errors")]
    TooManyErrors { origin: String, line: usize },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("too long {0}")]
    TooLong(&'static str),
    #[error("parse error")]
    Parse,
    #[error("option {0} needs a parameter")]
    MissingParameter(String),
    #[error("option {0} has an unterminated quote")]
    UnterminatedQuote(String),
    #[error("extra characters: {0}")]
    TrailingCharacters(String),
    #[error("include {path}: {reason}")]
    Include { path: String, reason: String },
}

/// A line that failed, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub origin: String,
    pub line: usize,
    pub error: LineError,
}

// ============================================================================
// Parsed Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigOption {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub desc: Option<String>,
    pub options: Vec<ConfigOption>,
}

impl Profile {
    pub fn get(&self, key: &str) -> Option<&str> {
        last_value(&self.options, key)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigFile {
    /// Options outside any profile, in file order
    pub options: Vec<ConfigOption>,
    pub profiles: Vec<Profile>,
    /// Counted errors, in file order
    #[serde(skip)]
    pub errors: Vec<LineDiagnostic>,
    /// Reported problems that did not reject the line
    #[serde(skip)]
    pub warnings: Vec<LineDiagnostic>,
}

fn last_value<'a>(options: &'a [ConfigOption], key: &str) -> Option<&'a str> {
    options
        .iter()
        .rev()
        .find(|o| o.key == key)
        .map(|o| o.value.as_str())
}

impl ConfigFile {
    /// Last top-level value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        last_value(&self.options, key)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Value of `key` with `profile` applied over the top level.
    pub fn value_of(&self, key: &str, profile: Option<&str>) -> Option<&str> {
        profile
            .and_then(|name| self.profile(name))
            .and_then(|p| p.get(key))
            .or_else(|| self.get(key))
    }

    fn profile_mut(&mut self, name: &str) -> &mut Profile {
        if let Some(index) = self.profiles.iter().position(|p| p.name == name) {
            return &mut self.profiles[index];
        }
        self.profiles.push(Profile {
            name: name.to_string(),
            ..Default::default()
        });
        let last = self.profiles.len() - 1;
        &mut self.profiles[last]
    }

    fn options_mut(&mut self, profile: Option<&str>) -> &mut Vec<ConfigOption> {
        match profile {
            Some(name) => &mut self.profile_mut(name).options,
            None => &mut self.options,
        }
    }

    /// Merge an included file into the scope `profile`.
    fn merge(&mut self, other: ConfigFile, profile: Option<&str>) {
        self.options_mut(profile).extend(other.options);
        for included in other.profiles {
            let target = self.profile_mut(&included.name);
            if included.desc.is_some() {
                target.desc = included.desc;
            }
            target.options.extend(included.options);
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Read and parse `path`; `depth` counts the includes leading here.
pub fn parse_file(path: &Path, depth: u32) -> Result<ConfigFile, ConfigFileError> {
    if depth > MAX_RECURSION_DEPTH {
        tracing::error!("{}: too deep 'include', check your config files", path.display());
        return Err(ConfigFileError::TooDeep {
            path: path.to_path_buf(),
            depth,
        });
    }
    tracing::debug!("reading config file {}", path.display());
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("{}: {}", path.display(), e);
            return Err(ConfigFileError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_text(&text, &path.display().to_string(), base, depth)
}

/// Parse config text; `origin` names it in diagnostics. Includes resolve
/// against the current directory.
pub fn parse_str(text: &str, origin: &str) -> Result<ConfigFile, ConfigFileError> {
    parse_text(text, origin, Path::new("."), 0)
}

enum Line {
    Blank,
    Profile(String),
    Option {
        key: String,
        value: String,
        trailing: Option<String>,
    },
}

fn parse_text(
    text: &str,
    origin: &str,
    base: &Path,
    depth: u32,
) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();
    let mut profile: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_num = index + 1;
        if config.errors.len() >= MAX_ERRORS {
            tracing::error!("{}:{}: too many errors", origin, line_num);
            return Err(ConfigFileError::TooManyErrors {
                origin: origin.to_string(),
                line: line_num,
            });
        }

        let report = |error: LineError| {
            tracing::error!("{}:{}: {}", origin, line_num, error);
            LineDiagnostic {
                origin: origin.to_string(),
                line: line_num,
                error,
            }
        };

        let parsed = match parse_line(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                config.errors.push(report(e));
                continue;
            }
        };

        match parsed {
            Line::Blank => {}
            Line::Profile(name) => {
                if name == DEFAULT_PROFILE {
                    profile = None;
                } else {
                    config.profile_mut(&name);
                    profile = Some(name);
                }
            }
            Line::Option { key, value, trailing } => {
                if let Some(extra) = trailing {
                    config.warnings.push(report(LineError::TrailingCharacters(extra)));
                }
                if key == INCLUDE_OPTION {
                    let path = base.join(&value);
                    match parse_file(&path, depth + 1) {
                        Ok(included) => config.merge(included, profile.as_deref()),
                        Err(e @ ConfigFileError::TooManyErrors { .. }) => return Err(e),
                        Err(e) => config.errors.push(report(LineError::Include {
                            path: value,
                            reason: e.to_string(),
                        })),
                    }
                    continue;
                }
                match profile.as_deref() {
                    Some(name) if key == PROFILE_DESC_OPTION => {
                        config.profile_mut(name).desc = Some(value);
                    }
                    scope => config.options_mut(scope).push(ConfigOption { key, value }),
                }
            }
        }
    }
    Ok(config)
}

fn is_option_char(c: char) -> bool {
    c.is_ascii_graphic() && c != '#' && c != '='
}

fn is_param_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && c != '#'
}

fn parse_line(raw: &str) -> Result<Line, LineError> {
    if raw.chars().count() > MAX_LINE_LEN {
        return Err(LineError::TooLong("line"));
    }
    let line = raw.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Line::Blank);
    }

    let key_len = line.find(|c: char| !is_option_char(c)).unwrap_or(line.len());
    let key = &line[..key_len];
    if key.len() >= MAX_OPT_LEN {
        return Err(LineError::TooLong("option"));
    }
    if key.is_empty() {
        return Err(LineError::Parse);
    }
    if key.len() > 2 && key.starts_with('[') && key.ends_with(']') {
        return Ok(Line::Profile(key[1..key.len() - 1].to_string()));
    }

    let rest = line[key_len..].trim_start();
    let Some(rest) = rest.strip_prefix('=') else {
        return Err(LineError::MissingParameter(key.to_string()));
    };
    let rest = rest.trim_start();

    let (value, rest) = match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &rest[1..];
            let end = body
                .find(quote)
                .ok_or_else(|| LineError::UnterminatedQuote(key.to_string()))?;
            (&body[..end], &body[end + 1..])
        }
        _ => {
            let end = rest.find(|c: char| !is_param_char(c)).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        }
    };
    if value.chars().count() >= MAX_PARAM_LEN {
        return Err(LineError::TooLong("parameter"));
    }
    if value.is_empty() {
        return Err(LineError::MissingParameter(key.to_string()));
    }

    let rest = rest.trim_start();
    let trailing = if rest.is_empty() || rest.starts_with('#') {
        None
    } else {
        Some(rest.to_string())
    };

    Ok(Line::Option {
        key: key.to_string(),
        value: value.to_string(),
        trailing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(key: &str, value: &str) -> ConfigOption {
        ConfigOption {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_single_profile() {
        let cfg = parse_str("[profile1]\nfoo = bar\n", "test").unwrap();
        assert!(cfg.options.is_empty());
        assert_eq!(cfg.profiles.len(), 1);
        assert_eq!(cfg.profiles[0].name, "profile1");
        assert_eq!(cfg.profiles[0].options, vec![opt("foo", "bar")]);
    }

    #[test]
    fn test_quoted_values() {
        let cfg = parse_str(
            "key = \"value with space\"\nother='single # quoted'   # comment\n",
            "test",
        )
        .unwrap();
        assert_eq!(cfg.get("key"), Some("value with space"));
        assert_eq!(cfg.get("other"), Some("single # quoted"));
        assert!(cfg.errors.is_empty());
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn test_comments_blanks_and_default_section() {
        let text = "# header\n\n   \t\nvo=xv # trailing comment\n[fast]\nprofile-desc = \"no frills\"\nmirror = yes\n[default]\nframes = 10\n";
        let cfg = parse_str(text, "test").unwrap();
        assert_eq!(cfg.options, vec![opt("vo", "xv"), opt("frames", "10")]);
        let fast = cfg.profile("fast").unwrap();
        assert_eq!(fast.desc.as_deref(), Some("no frills"));
        assert_eq!(fast.options, vec![opt("mirror", "yes")]);
        assert_eq!(cfg.value_of("mirror", Some("fast")), Some("yes"));
        assert_eq!(cfg.value_of("frames", Some("fast")), Some("10"));
        assert_eq!(cfg.value_of("mirror", None), None);
    }

    #[test]
    fn test_bad_lines_are_counted_and_skipped() {
        let text = "noparam\nempty =\n= value\nunterminated = \"abc\ngood = 1\n";
        let cfg = parse_str(text, "test").unwrap();
        let errors: Vec<_> = cfg.errors.iter().map(|d| (d.line, d.error.clone())).collect();
        assert_eq!(
            errors,
            vec![
                (1, LineError::MissingParameter("noparam".into())),
                (2, LineError::MissingParameter("empty".into())),
                (3, LineError::Parse),
                (4, LineError::UnterminatedQuote("unterminated".into())),
            ]
        );
        assert_eq!(cfg.get("good"), Some("1"));
    }

    #[test]
    fn test_trailing_characters_keep_option() {
        let cfg = parse_str("width = 640 480\n", "test").unwrap();
        assert_eq!(cfg.get("width"), Some("640"));
        assert!(cfg.errors.is_empty());
        assert_eq!(cfg.warnings[0].error, LineError::TrailingCharacters("480".into()));
    }

    #[test]
    fn test_seventeen_bad_lines_abort() {
        let mut text = "bad\n".repeat(17);
        text.push_str("good = yes\n");
        match parse_str(&text, "test") {
            Err(ConfigFileError::TooManyErrors { line, .. }) => assert_eq!(line, 17),
            other => panic!("expected abort, got {:?}", other),
        }

        let mut text = "bad\n".repeat(15);
        text.push_str("good = yes\n");
        let cfg = parse_str(&text, "test").unwrap();
        assert_eq!(cfg.errors.len(), 15);
        assert_eq!(cfg.get("good"), Some("yes"));
    }

    #[test]
    fn test_length_limits() {
        let long_key = format!("{} = 1\n", "k".repeat(MAX_OPT_LEN));
        let long_value = format!("k = {}\n", "v".repeat(MAX_PARAM_LEN));
        let long_line = format!("k = 1 #{}\n", "x".repeat(MAX_LINE_LEN));
        let ok_value = format!("k = {}\n", "v".repeat(MAX_PARAM_LEN - 1));
        let text = [long_key, long_value, long_line, ok_value].concat();
        let cfg = parse_str(&text, "test").unwrap();
        let errors: Vec<_> = cfg.errors.iter().map(|d| d.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                LineError::TooLong("option"),
                LineError::TooLong("parameter"),
                LineError::TooLong("line"),
            ]
        );
        assert_eq!(cfg.get("k").map(str::len), Some(MAX_PARAM_LEN - 1));
    }

    #[test]
    fn test_missing_file_and_depth() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.conf");
        assert!(matches!(parse_file(&missing, 0), Err(ConfigFileError::NotFound(_))));

        let path = dir.path().join("ok.conf");
        fs::write(&path, "a = 1\n").unwrap();
        assert!(matches!(
            parse_file(&path, MAX_RECURSION_DEPTH + 1),
            Err(ConfigFileError::TooDeep { .. })
        ));
        assert_eq!(parse_file(&path, MAX_RECURSION_DEPTH).unwrap().get("a"), Some("1"));
    }

    #[test]
    fn test_includes_merge_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("extra.conf"),
            "format = uyvy\n[slow]\nframes = 100\n",
        )
        .unwrap();
        let main = dir.path().join("main.conf");
        fs::write(&main, "width = 320\ninclude = extra.conf\n[slow]\nmirror = no\n").unwrap();

        let cfg = parse_file(&main, 0).unwrap();
        assert_eq!(cfg.options, vec![opt("width", "320"), opt("format", "uyvy")]);
        let slow = cfg.profile("slow").unwrap();
        assert_eq!(slow.options, vec![opt("frames", "100"), opt("mirror", "no")]);
    }

    #[test]
    fn test_include_loops_stop_at_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.conf");
        fs::write(&path, "include = loop.conf\nvalue = 1\n").unwrap();

        let cfg = parse_file(&path, 0).unwrap();
        assert_eq!(cfg.errors.len(), 1);
        assert!(matches!(cfg.errors[0].error, LineError::Include { .. }));
        assert_eq!(cfg.options.len(), MAX_RECURSION_DEPTH as usize + 1);
    }

    #[test]
    fn test_serializes_options_and_profiles() {
        let cfg = parse_str("vo = xv\n[p]\nx = 1\n", "test").unwrap();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["options"][0]["key"], "vo");
        assert_eq!(json["profiles"][0]["name"], "p");
        assert!(json.get("errors").is_none());
    }
}
