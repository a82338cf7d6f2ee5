//! Display titles from the `name.Title_words.ext` filename convention.
//!
//! A media file may carry its caption in its name: everything between the
//! first and the last dot is the title, with underscores read as spaces.
//!
//! - `IMG_0042.Sunset_over_the_bay.jpg` → "Sunset over the bay" (titled)
//! - `test.SEOS.FR.jpg` → "SEOS.FR" (titled, inner dots kept)
//! - `IMG_0042.jpg` → "IMG_0042.jpg" (untitled, the file name is shown)
//! - `.hidden.jpg` → ".hidden.jpg" (untitled, a leading dot is not a separator)

/// Result of parsing a media file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Caption to display.
    pub title: String,
    /// Whether `title` came from the name rather than being the name itself.
    pub has_title: bool,
}

/// Parse a file name following the `name.Title_words.ext` convention.
pub fn parse_media_name(file_name: &str) -> ParsedName {
    match (file_name.find('.'), file_name.rfind('.')) {
        (Some(first), Some(last)) if first > 0 && first != last => ParsedName {
            title: file_name[first + 1..last].replace('_', " "),
            has_title: true,
        },
        _ => ParsedName {
            title: file_name.to_string(),
            has_title: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> ParsedName {
        ParsedName {
            title: title.to_string(),
            has_title: true,
        }
    }

    fn untitled(title: &str) -> ParsedName {
        ParsedName {
            title: title.to_string(),
            has_title: false,
        }
    }

    #[test]
    fn plain_name_is_untitled() {
        assert_eq!(parse_media_name("test.jpg"), untitled("test.jpg"));
    }

    #[test]
    fn title_between_dots() {
        assert_eq!(parse_media_name("test.Title.jpg"), titled("Title"));
    }

    #[test]
    fn underscores_become_spaces() {
        assert_eq!(
            parse_media_name("test.Title_with_spaces.jpg"),
            titled("Title with spaces")
        );
    }

    #[test]
    fn inner_dots_are_kept() {
        assert_eq!(parse_media_name("test.SEOS.FR.jpg"), titled("SEOS.FR"));
    }

    #[test]
    fn leading_dot_is_not_a_separator() {
        assert_eq!(parse_media_name(".thumbnail.jpg"), untitled(".thumbnail.jpg"));
    }

    #[test]
    fn no_extension_is_untitled() {
        assert_eq!(parse_media_name("README"), untitled("README"));
    }

    #[test]
    fn empty_title_between_adjacent_dots() {
        assert_eq!(parse_media_name("a..jpg"), titled(""));
    }
}
