use std::collections::HashSet;

use crate::app::models::PackagePath;

const PACKAGE_PREFIX: &str = "package:";

/// Data rows of a bridge listing: the header row is dropped and the rows end at the first blank
/// line.
fn data_rows<'a, S: AsRef<str>>(lines: &'a [S]) -> impl Iterator<Item = &'a str> + 'a {
    lines
        .iter()
        .skip(1)
        .map(|line| line.as_ref())
        .take_while(|line| !line.is_empty())
}

/// `<serial>\t<state>` rows; rows without a tab are skipped.
pub fn parse_device_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    data_rows(lines)
        .filter_map(|line| line.split_once('\t').map(|(serial, _)| serial.to_string()))
        .collect()
}

/// `package:<name>` rows; rows without a colon are skipped.
pub fn parse_package_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    data_rows(lines)
        .filter_map(|line| line.split_once(':').map(|(_, name)| name.to_string()))
        .collect()
}

/// `package:<path>=<name>` rows. The name follows the last `=` so that paths keep any `=` they
/// contain.
pub fn parse_package_paths<S: AsRef<str>>(lines: &[S]) -> Vec<PackagePath> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for line in data_rows(lines) {
        let payload = line.strip_prefix(PACKAGE_PREFIX).unwrap_or(line);
        let Some((apk_path, package_name)) = payload.rsplit_once('=') else {
            continue;
        };
        if package_name.is_empty() {
            continue;
        }
        if !seen.insert(package_name) {
            continue;
        }
        entries.push(PackagePath {
            package_name: package_name.to_string(),
            apk_path: apk_path.to_string(),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_rows_until_blank() {
        let lines = [
            "List of devices attached",
            "0123456789ABCDEF\tdevice",
            "emulator-5554\tunauthorized",
            "",
            "trailing\tdevice",
        ];
        assert_eq!(
            parse_device_list(&lines),
            vec!["0123456789ABCDEF".to_string(), "emulator-5554".to_string()]
        );
    }

    #[test]
    fn device_rows_without_tab_are_skipped() {
        let lines = ["List of devices attached", "garbage", "abc\tdevice"];
        assert_eq!(parse_device_list(&lines), vec!["abc".to_string()]);
    }

    #[test]
    fn empty_or_header_only_output_lists_nothing() {
        let empty: [&str; 0] = [];
        assert!(parse_device_list(&empty).is_empty());
        assert!(parse_package_list(&["header"]).is_empty());
        assert!(parse_package_list(&["header", "", "package:com.a"]).is_empty());
    }

    #[test]
    fn parses_package_rows() {
        let lines = ["", "package:com.android.settings", "package:com.example.app", ""];
        assert_eq!(
            parse_package_list(&lines),
            vec!["com.android.settings".to_string(), "com.example.app".to_string()]
        );
    }

    #[test]
    fn parses_package_paths_on_last_equals() {
        let lines = [
            "",
            "package:/data/app/com.example-1/base.apk=com.example",
            "package:/data/app/~~a1b2==/com.weird-x==/base.apk=com.weird",
            "package:/system/app/Broken.apk",
        ];
        let entries = parse_package_paths(&lines);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].package_name, "com.example");
        assert_eq!(entries[0].apk_path, "/data/app/com.example-1/base.apk");
        assert_eq!(entries[1].package_name, "com.weird");
        assert_eq!(entries[1].apk_path, "/data/app/~~a1b2==/com.weird-x==/base.apk");
    }

    #[test]
    fn package_path_round_trips_through_listing_format() {
        let path = "/data/app/org.fdroid.fdroid-2/base.apk";
        let name = "org.fdroid.fdroid";
        let lines = vec!["header".to_string(), format!("package:{path}={name}")];
        let entries = parse_package_paths(&lines);
        assert_eq!(
            entries,
            vec![PackagePath {
                package_name: name.to_string(),
                apk_path: path.to_string(),
            }]
        );
    }
}
