use crate::error::ShellError;

pub const DEFAULT_BACKGROUND: &str = "#000";
pub const DEFAULT_FOREGROUND: &str = "#FFF";

/// The sixteen console colors, indexed by hex digit.
pub const PALETTE: [(char, &str); 16] = [
    ('0', "#000000"),
    ('1', "#0000AA"),
    ('2', "#00AA00"),
    ('3', "#00AAAA"),
    ('4', "#AA0000"),
    ('5', "#AA00AA"),
    ('6', "#AAAA00"),
    ('7', "#AAAAAA"),
    ('8', "#555555"),
    ('9', "#5555FF"),
    ('A', "#55FF55"),
    ('B', "#55FFFF"),
    ('C', "#FF5555"),
    ('D', "#FF55FF"),
    ('E', "#FFFF55"),
    ('F', "#FFFFFF"),
];

pub fn palette_color(digit: char) -> Option<&'static str> {
    PALETTE
        .iter()
        .find(|(d, _)| *d == digit)
        .map(|(_, color)| *color)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub background: String,
    pub foreground: String,
    pub wallpaper: Option<String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: DEFAULT_BACKGROUND.into(),
            foreground: DEFAULT_FOREGROUND.into(),
            wallpaper: None,
        }
    }
}

/// Result of parsing a `color` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorChoice {
    Reset,
    Pair {
        code: String,
        background: &'static str,
        foreground: &'static str,
    },
}

/// Parse a two-digit `BGFG` code. Anything that is not exactly two
/// characters means "back to defaults".
pub fn parse_color(arg: &str) -> Result<ColorChoice, ShellError> {
    let code = arg.to_uppercase();
    let digits: Vec<char> = code.chars().collect();
    let [bg, fg] = digits[..] else {
        return Ok(ColorChoice::Reset);
    };
    if bg == fg {
        return Err(ShellError::InvalidArgument(
            "Error: Background and foreground colors cannot be the same.".into(),
        ));
    }
    match (palette_color(bg), palette_color(fg)) {
        (Some(background), Some(foreground)) => Ok(ColorChoice::Pair {
            code,
            background,
            foreground,
        }),
        _ => Err(ShellError::InvalidArgument("Invalid color code.".into())),
    }
}
