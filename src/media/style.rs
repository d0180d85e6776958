use crate::error::{Result, SubgenError};

/// Optional overrides for the burned-in subtitle look. Unset fields fall
/// back to the muxing tool's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleStyle {
    pub font_name: Option<String>,
    /// ASS colour, `&HAABBGGRR`
    pub primary_color: Option<String>,
    pub background_box: bool,
}

impl SubtitleStyle {
    /// Build a style from user-facing values (`#RRGGBB` colour). Blank
    /// values leave that field to the tool default.
    pub fn from_user(
        font_name: Option<&str>,
        hex_color: Option<&str>,
        background_box: bool,
    ) -> Result<Self> {
        let font_name = font_name
            .map(sanitize_font_name)
            .filter(|name| !name.is_empty());
        let primary_color = hex_color
            .map(str::trim)
            .filter(|color| !color.is_empty())
            .map(hex_to_ass)
            .transpose()?;

        Ok(Self {
            font_name,
            primary_color,
            background_box,
        })
    }

    /// The `force_style` value for ffmpeg's subtitles filter, or `None` when
    /// nothing overrides the defaults.
    pub fn force_style(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let Some(font) = &self.font_name {
            parts.push(format!("FontName={}", sanitize_font_name(font)));
        }
        if let Some(color) = &self.primary_color {
            parts.push(format!("PrimaryColour={}", color));
        }
        if self.background_box {
            parts.push("BorderStyle=3".to_string());
            parts.push("BackColour=&H80000000".to_string());
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

/// Quotes and backslashes would break out of the filter argument.
pub fn sanitize_font_name(name: &str) -> String {
    name.chars().filter(|c| *c != '\'' && *c != '\\').collect::<String>().trim().to_string()
}

/// Convert `#RRGGBB` to the ASS `&H00BBGGRR` form used by ffmpeg.
pub fn hex_to_ass(hex: &str) -> Result<String> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SubgenError::Config(format!(
            "Invalid colour '{}': expected #RRGGBB",
            hex
        )));
    }

    let (r, g, b) = (&digits[0..2], &digits[2..4], &digits[4..6]);
    Ok(format!("&H00{}{}{}", b, g, r).to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_ass() {
        assert_eq!(hex_to_ass("#FFFFFF").unwrap(), "&H00FFFFFF");
        assert_eq!(hex_to_ass("#ff8000").unwrap(), "&H000080FF");
        assert_eq!(hex_to_ass("12ab34").unwrap(), "&H0034AB12");
        assert!(hex_to_ass("#FFF").is_err());
        assert!(hex_to_ass("#GGGGGG").is_err());
    }

    #[test]
    fn test_default_style_has_no_overrides() {
        assert_eq!(SubtitleStyle::default().force_style(), None);
    }

    #[test]
    fn test_full_force_style() {
        let style = SubtitleStyle::from_user(Some("O'Brien\\Sans"), Some("#00FF00"), true).unwrap();
        assert_eq!(
            style.force_style().unwrap(),
            "FontName=OBrienSans,PrimaryColour=&H0000FF00,BorderStyle=3,BackColour=&H80000000"
        );
    }

    #[test]
    fn test_blank_font_is_ignored() {
        let style = SubtitleStyle::from_user(Some("  "), None, false).unwrap();
        assert_eq!(style.font_name, None);
    }

    #[test]
    fn test_blank_values_mean_tool_default() {
        let style = SubtitleStyle::from_user(Some(""), Some(" "), false).unwrap();
        assert_eq!(style, SubtitleStyle::default());
        assert_eq!(style.force_style(), None);

        let style = SubtitleStyle::from_user(None, Some(" #ff0000 "), false).unwrap();
        assert_eq!(style.primary_color.as_deref(), Some("&H000000FF"));
    }
}
