// Output naming policy shared by downloads and split tracks
//
// Every rendered name embeds the stable item id as " [ID]", so re-running on
// the same item lands on the same identifier even when the title changed.
// Layout:
//   [<playlist title> - ][<NN> - ]<title> [<id>].<ext>
//   [<playlist title> - ][<NN> - ]<title> [<id>] - <TT> - <track title>.<ext>

use regex::Regex;

use super::models::ItemMetadata;

lazy_static::lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]+"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    // Bracketed id followed by a track suffix or the extension
    static ref IDENTIFIER_RE: Regex = Regex::new(
        r" \[(?P<id>[A-Za-z0-9_-]{8,})\](?: - \d{2,} - |\.[A-Za-z0-9]+$)"
    ).unwrap();
}

/// Make a label safe for file names; empty input becomes "part"
pub fn safe_label(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return "part".to_string();
    }
    let replaced = UNSAFE_CHARS.replace_all(trimmed, "_");
    WHITESPACE.replace_all(&replaced, " ").into_owned()
}

/// File stem without extension
pub fn render_stem(item: &ItemMetadata) -> String {
    let mut stem = String::new();

    if let Some(playlist) = item.playlist_title.as_deref().filter(|t| !t.trim().is_empty()) {
        stem.push_str(&safe_label(playlist));
        stem.push_str(" - ");
    }
    if let Some(index) = item.playlist_index {
        stem.push_str(&format!("{:02} - ", index));
    }

    let title = if item.title.trim().is_empty() {
        "untitled"
    } else {
        item.title.as_str()
    };
    stem.push_str(&safe_label(title));
    stem.push_str(&format!(" [{}]", safe_label(&item.id)));
    stem
}

pub fn render_name(item: &ItemMetadata, ext: &str) -> String {
    format!("{}.{}", render_stem(item), ext.trim_start_matches('.'))
}

/// Name of split track `track` (1-based) of `item`
pub fn render_track_name(item: &ItemMetadata, track: u32, title: &str, ext: &str) -> String {
    format!(
        "{} - {:02} - {}.{}",
        render_stem(item),
        track,
        safe_label(title),
        ext.trim_start_matches('.')
    )
}

/// Recover the embedded item id from a rendered file name.
///
/// The id is the last bracket that ends the stem, so titles that contain
/// their own "[...] - NN - " fragment do not shadow it.
pub fn extract_identifier(file_name: &str) -> Option<String> {
    IDENTIFIER_RE
        .captures_iter(file_name)
        .last()
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> ItemMetadata {
        ItemMetadata {
            id: "dQw4w9WgXcQ".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_name_embeds_id() {
        assert_eq!(
            render_name(&item("Never Gonna Give You Up"), "mkv"),
            "Never Gonna Give You Up [dQw4w9WgXcQ].mkv"
        );
    }

    #[test]
    fn test_playlist_fields_only_when_present() {
        let mut it = item("Song");
        it.playlist_title = Some("Mix: Best/Of".to_string());
        it.playlist_index = Some(3);
        assert_eq!(render_name(&it, "m4a"), "Mix_ Best_Of - 03 - Song [dQw4w9WgXcQ].m4a");

        it.playlist_title = Some(String::new());
        it.playlist_index = None;
        assert_eq!(render_name(&it, "m4a"), "Song [dQw4w9WgXcQ].m4a");
    }

    #[test]
    fn test_title_change_keeps_identifier() {
        let before = render_name(&item("Original title"), "mkv");
        let after = render_name(&item("Renamed: title?"), "mkv");
        assert_ne!(before, after);
        assert_eq!(extract_identifier(&before), extract_identifier(&after));
        assert_eq!(extract_identifier(&after).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_track_name_and_identifier() {
        let name = render_track_name(&item("Album [Remastered]"), 2, "Verse / Chorus", "m4a");
        assert_eq!(name, "Album [Remastered] [dQw4w9WgXcQ] - 02 - Verse _ Chorus.m4a");
        assert_eq!(extract_identifier(&name).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_title_fragment_does_not_shadow_identifier() {
        let plain = render_name(&item("Mix [aaaaaaaaaaa] - 01 - Live"), "m4a");
        assert_eq!(plain, "Mix [aaaaaaaaaaa] - 01 - Live [dQw4w9WgXcQ].m4a");
        assert_eq!(extract_identifier(&plain).as_deref(), Some("dQw4w9WgXcQ"));

        let track = render_track_name(&item("Mix [aaaaaaaaaaa] - 01 - Live"), 3, "Outro", "m4a");
        assert_eq!(extract_identifier(&track).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_identifier_absent_for_foreign_names() {
        assert_eq!(extract_identifier("holiday.mp4"), None);
        assert_eq!(extract_identifier("Song [short].m4a"), None);
    }

    #[test]
    fn test_safe_label() {
        assert_eq!(safe_label("  a:b  "), "a_b");
        assert_eq!(safe_label(""), "part");
    }
}
