//! Parsing of `aapt d badging` output.
//!
//! Every line before the first blank one is `key:payload`. The payload is either a single quoted
//! value (`application-label:'Maps'`) or a run of `name='value'` attributes
//! (`application: label='Maps' icon='res/mipmap/ic_launcher.png'`). Lines are tokenized into a
//! [`BadgingLine`] first and only then folded into an [`AppName`].

use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::AppName;

const LABEL_KEY: &str = "application-label";
const APPLICATION_KEY: &str = "application";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgingLine<'a> {
    Value { key: &'a str, value: &'a str },
    Attributes { key: &'a str, attrs: Vec<(&'a str, &'a str)> },
}

impl<'a> BadgingLine<'a> {
    pub fn key(&self) -> &'a str {
        match self {
            BadgingLine::Value { key, .. } | BadgingLine::Attributes { key, .. } => *key,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match self {
            BadgingLine::Attributes { attrs, .. } => attrs
                .iter()
                .find(|(attr_name, _)| *attr_name == name)
                .map(|(_, value)| *value),
            BadgingLine::Value { .. } => None,
        }
    }
}

fn attr_regex() -> &'static Regex {
    static ATTR_RE: OnceLock<Regex> = OnceLock::new();
    ATTR_RE.get_or_init(|| Regex::new(r"(\w+)='([^']*)'").expect("attribute regex"))
}

/// Strips at most one quote from each end.
fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('\'').unwrap_or(value);
    value.strip_suffix('\'').unwrap_or(value)
}

/// `None` when the line has no `:` at all.
pub fn tokenize_line(line: &str) -> Option<BadgingLine<'_>> {
    let (key, payload) = line.split_once(':')?;
    if payload.starts_with('\'') {
        return Some(BadgingLine::Value {
            key,
            value: unquote(payload),
        });
    }
    let attrs = attr_regex()
        .captures_iter(payload)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str();
            Some((name, value))
        })
        .collect();
    Some(BadgingLine::Attributes { key, attrs })
}

fn has_non_ascii(value: &str) -> bool {
    value.chars().any(|ch| ch as u32 >= 128)
}

/// Folds tokenized lines into an [`AppName`] for `locale` (e.g. `zh-CN`).
#[derive(Debug, Default)]
pub struct AppNameBuilder {
    locale_key: String,
    name: AppName,
}

impl AppNameBuilder {
    pub fn new(locale: &str) -> Self {
        Self {
            locale_key: format!("{LABEL_KEY}-{locale}"),
            name: AppName::default(),
        }
    }

    pub fn apply(&mut self, line: &BadgingLine<'_>) {
        let key = line.key();
        match line {
            BadgingLine::Value { value, .. } if key == LABEL_KEY => {
                self.name.default_name = value.to_string();
            }
            BadgingLine::Value { value, .. } if key == self.locale_key => {
                self.name.local_name = value.to_string();
            }
            BadgingLine::Attributes { .. } if key == APPLICATION_KEY => {
                let Some(label) = line.attr("label") else {
                    return;
                };
                if self.name.default_name.is_empty() {
                    self.name.default_name = label.to_string();
                }
                if self.name.local_name.is_empty() && has_non_ascii(label) {
                    self.name.local_name = label.to_string();
                }
            }
            _ => {}
        }
    }

    pub fn finish(self) -> AppName {
        self.name
    }
}

/// `None` means the tool produced no output at all; a run that printed nothing useful yields an
/// empty [`AppName`] instead.
pub fn parse_badging<S: AsRef<str>>(lines: &[S], locale: &str) -> Option<AppName> {
    if lines.is_empty() {
        return None;
    }
    let mut builder = AppNameBuilder::new(locale);
    for line in lines
        .iter()
        .skip(1)
        .map(|line| line.as_ref())
        .take_while(|line| !line.is_empty())
    {
        if let Some(token) = tokenize_line(line) {
            builder.apply(&token);
        }
    }
    Some(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_quoted_value() {
        assert_eq!(
            tokenize_line("application-label:'Maps'"),
            Some(BadgingLine::Value {
                key: "application-label",
                value: "Maps",
            })
        );
        assert_eq!(
            tokenize_line("sdkVersion:''28'"),
            Some(BadgingLine::Value {
                key: "sdkVersion",
                value: "'28",
            })
        );
    }

    #[test]
    fn tokenizes_attribute_list() {
        let token = tokenize_line("application: label='My App' icon='res/a b.png' banner=''")
            .expect("token");
        assert_eq!(token.key(), "application");
        assert_eq!(token.attr("label"), Some("My App"));
        assert_eq!(token.attr("icon"), Some("res/a b.png"));
        assert_eq!(token.attr("banner"), Some(""));
        assert_eq!(token.attr("missing"), None);
    }

    #[test]
    fn line_without_colon_is_not_a_token() {
        assert_eq!(tokenize_line("supports-any-density 'true'"), None);
    }

    #[test]
    fn picks_default_and_locale_labels() {
        let lines = [
            "package: name='com.example' versionCode='1'",
            "application-label:'Foo'",
            "application-label-zh-CN:'\u{798f}'",
            "application-label-ja:'Fuku'",
            "application: label='Foo' icon='res/icon.png'",
        ];
        let name = parse_badging(&lines, "zh-CN").expect("name");
        assert_eq!(name, AppName::new("Foo", "福"));
    }

    #[test]
    fn locale_selects_matching_label_only() {
        let lines = [
            "package: name='com.example'",
            "application-label:'Foo'",
            "application-label-zh-CN:'\u{798f}'",
            "application-label-ja:'Fuku'",
        ];
        assert_eq!(parse_badging(&lines, "ja"), Some(AppName::new("Foo", "Fuku")));
        assert_eq!(parse_badging(&lines, "ko"), Some(AppName::new("Foo", "")));
    }

    #[test]
    fn falls_back_to_application_label_attribute() {
        let lines = ["banner", "application: label='Bar' icon='res/icon.png'"];
        assert_eq!(parse_badging(&lines, "zh-CN"), Some(AppName::new("Bar", "")));
    }

    #[test]
    fn non_ascii_application_label_becomes_local_name() {
        let lines = ["banner", "application: label='\u{5730}\u{56fe}' icon='x.png'"];
        assert_eq!(
            parse_badging(&lines, "zh-CN"),
            Some(AppName::new("地图", "地图"))
        );
    }

    #[test]
    fn explicit_labels_beat_application_attribute() {
        let lines = [
            "banner",
            "application-label:'Foo'",
            "application-label-zh-CN:'Local'",
            "application: label='\u{5730}\u{56fe}'",
        ];
        assert_eq!(parse_badging(&lines, "zh-CN"), Some(AppName::new("Foo", "Local")));
    }

    #[test]
    fn stops_at_first_blank_line_and_skips_banner() {
        let lines = [
            "application-label:'Banner'",
            "application-label:'Real'",
            "",
            "application-label:'Ignored'",
        ];
        assert_eq!(parse_badging(&lines, "zh-CN"), Some(AppName::new("Real", "")));
    }

    #[test]
    fn empty_output_is_none_but_useless_output_is_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_badging(&empty, "zh-CN"), None);
        let useless = ["ERROR: dump failed because no AndroidManifest.xml found"];
        assert_eq!(parse_badging(&useless, "zh-CN"), Some(AppName::default()));
    }
}
