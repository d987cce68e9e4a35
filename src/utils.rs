// Utility functions
use crate::model::Platform;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Converts a string to kebab-case.
pub fn to_kebab_case(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Kebab-case limited to `[a-z0-9-]`, safe as a single file name component.
pub fn file_stem(text: &str) -> String {
    to_kebab_case(text)
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' { c } else { '-' })
        .collect()
}

/// Keeps a copy of a page we could not use, for selector debugging.
pub fn save_debug_body(folder: &Path, platform: Platform, query: &str, body: &str) {
    if let Err(e) = fs::create_dir_all(folder) {
        warn!("Failed to create debug folder: {}", e);
        return;
    }
    let filename = folder.join(format!(
        "debug-{}-{}.html",
        platform.name().to_lowercase(),
        file_stem(query)
    ));
    if let Err(e) = fs::write(&filename, body) {
        warn!("Failed to write debug body: {}", e);
    } else {
        info!("Saved debug body: {}", filename.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_collapses_spaces() {
        assert_eq!(to_kebab_case("  iPhone 16   128 GB "), "iphone-16-128-gb");
    }

    #[test]
    fn file_stem_cannot_escape_the_folder() {
        assert_eq!(file_stem("iPhone 16 (128GB)"), "iphone-16--128gb-");
        assert_eq!(file_stem("../../etc/passwd"), "------etc-passwd");
        assert_eq!(file_stem("Galaxy S24 Ultra ₹"), "galaxy-s24-ultra--");
    }

    #[test]
    fn debug_body_lands_inside_the_folder() {
        let folder = std::env::temp_dir().join(format!("price-aggregator-debug-{}", std::process::id()));
        let _ = fs::remove_dir_all(&folder);

        save_debug_body(&folder, Platform::Croma, "../iPhone 16/128 GB", "<html></html>");

        let names: Vec<String> = fs::read_dir(&folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["debug-croma----iphone-16-128-gb.html".to_string()]);

        fs::remove_dir_all(&folder).unwrap();
    }
}
