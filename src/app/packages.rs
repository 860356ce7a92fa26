use crate::app::models::{AppName, PackageListing};
use crate::app::name_cache::NameCache;

pub const DISPLAY_SEPARATOR: char = '=';

/// `package[=local][=default]`; the default name is left out when it repeats the local one.
pub fn display_name(package_name: &str, app_name: Option<&AppName>) -> String {
    let mut display = package_name.to_string();
    if let Some(app_name) = app_name {
        if !app_name.local_name.is_empty() {
            display.push(DISPLAY_SEPARATOR);
            display.push_str(&app_name.local_name);
        }
        if !app_name.default_name.is_empty() && app_name.default_name != app_name.local_name {
            display.push(DISPLAY_SEPARATOR);
            display.push_str(&app_name.default_name);
        }
    }
    display
}

pub fn package_from_display(display: &str) -> &str {
    display
        .split_once(DISPLAY_SEPARATOR)
        .map(|(package_name, _)| package_name)
        .unwrap_or(display)
}

fn matches_filter(package_name: &str, app_name: Option<&AppName>, filter: &str) -> bool {
    package_name.contains(filter)
        || app_name.is_some_and(|name| {
            name.default_name.contains(filter) || name.local_name.contains(filter)
        })
}

/// Keeps the packages whose id or cached names contain `filter`, in listing order.
pub fn filter_packages(
    packages: &[String],
    cache: &NameCache,
    filter: &str,
) -> Vec<PackageListing> {
    packages
        .iter()
        .filter_map(|package_name| {
            let app_name = cache.get(package_name);
            if !matches_filter(package_name, app_name, filter) {
                return None;
            }
            Some(PackageListing {
                package_name: package_name.clone(),
                display_name: display_name(package_name, app_name),
                app_name: app_name.cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> NameCache {
        let mut cache = NameCache::new("unused.tab");
        cache.set("com.android.settings", AppName::new("Settings", "设置"));
        cache.set("com.tencent.mm", AppName::new("微信", "微信"));
        cache.set("com.example.blank", AppName::default());
        cache
    }

    #[test]
    fn display_name_joins_local_then_default() {
        let cache = cache();
        assert_eq!(
            display_name("com.android.settings", cache.get("com.android.settings")),
            "com.android.settings=设置=Settings"
        );
        assert_eq!(
            display_name("com.tencent.mm", cache.get("com.tencent.mm")),
            "com.tencent.mm=微信"
        );
        assert_eq!(
            display_name("com.example.blank", cache.get("com.example.blank")),
            "com.example.blank"
        );
        assert_eq!(display_name("com.unknown", None), "com.unknown");
        assert_eq!(
            display_name("com.d", Some(&AppName::new("Default", ""))),
            "com.d=Default"
        );
    }

    #[test]
    fn recovers_package_from_display_text() {
        assert_eq!(
            package_from_display("com.android.settings=设置=Settings"),
            "com.android.settings"
        );
        assert_eq!(package_from_display("com.unknown"), "com.unknown");
    }

    #[test]
    fn filters_on_package_and_names() {
        let cache = cache();
        let packages: Vec<String> = [
            "com.android.settings",
            "com.tencent.mm",
            "com.example.blank",
            "org.other",
        ]
        .iter()
        .map(|value| value.to_string())
        .collect();

        let all = filter_packages(&packages, &cache, "");
        assert_eq!(all.len(), 4);

        let by_name = filter_packages(&packages, &cache, "设置");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].package_name, "com.android.settings");

        let by_default = filter_packages(&packages, &cache, "Sett");
        assert_eq!(by_default.len(), 1);

        let by_package: Vec<String> = filter_packages(&packages, &cache, "com.")
            .into_iter()
            .map(|listing| listing.package_name)
            .collect();
        assert_eq!(by_package, vec!["com.android.settings", "com.tencent.mm", "com.example.blank"]);

        assert!(filter_packages(&packages, &cache, "nothing").is_empty());
    }
}
