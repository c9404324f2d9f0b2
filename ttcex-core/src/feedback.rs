use serde::{Deserialize, Serialize};

/// Text colours available to the feedback canvas. Unknown names fall back to black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackColor {
    #[default]
    Black,
    Blue,
    Clear,
    Cyan,
    Gray,
    Green,
    Magenta,
    Red,
    White,
    Yellow,
}

impl FeedbackColor {
    pub fn rgba(&self) -> [u8; 4] {
        match self {
            FeedbackColor::Black => [0, 0, 0, 255],
            FeedbackColor::Blue => [0, 0, 255, 255],
            FeedbackColor::Clear => [0, 0, 0, 0],
            FeedbackColor::Cyan => [0, 255, 255, 255],
            FeedbackColor::Gray => [127, 127, 127, 255],
            FeedbackColor::Green => [0, 255, 0, 255],
            FeedbackColor::Magenta => [255, 0, 255, 255],
            FeedbackColor::Red => [255, 0, 0, 255],
            FeedbackColor::White => [255, 255, 255, 255],
            FeedbackColor::Yellow => [255, 235, 4, 255],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeedbackColor::Black => "black",
            FeedbackColor::Blue => "blue",
            FeedbackColor::Clear => "clear",
            FeedbackColor::Cyan => "cyan",
            FeedbackColor::Gray => "gray",
            FeedbackColor::Green => "green",
            FeedbackColor::Magenta => "magenta",
            FeedbackColor::Red => "red",
            FeedbackColor::White => "white",
            FeedbackColor::Yellow => "yellow",
        }
    }
}

impl From<&str> for FeedbackColor {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => FeedbackColor::Blue,
            "clear" => FeedbackColor::Clear,
            "cyan" => FeedbackColor::Cyan,
            "gray" | "grey" => FeedbackColor::Gray,
            "green" => FeedbackColor::Green,
            "magenta" => FeedbackColor::Magenta,
            "red" => FeedbackColor::Red,
            "white" => FeedbackColor::White,
            "yellow" => FeedbackColor::Yellow,
            _ => FeedbackColor::Black,
        }
    }
}

impl From<String> for FeedbackColor {
    fn from(s: String) -> Self {
        FeedbackColor::from(s.as_str())
    }
}

impl From<FeedbackColor> for String {
    fn from(c: FeedbackColor) -> Self {
        c.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_map_with_black_fallback() {
        assert_eq!(FeedbackColor::from("grey"), FeedbackColor::Gray);
        assert_eq!(FeedbackColor::from("Red"), FeedbackColor::Red);
        assert_eq!(FeedbackColor::from("chartreuse"), FeedbackColor::Black);
        let c: FeedbackColor = serde_json::from_str("\"cyan\"").unwrap();
        assert_eq!(c.rgba(), [0, 255, 255, 255]);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"cyan\"");
    }
}
