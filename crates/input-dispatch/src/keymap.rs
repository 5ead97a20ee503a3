//! Static character-to-keycode table for the ANSI layout.
//!
//! Covers letters, digits, ASCII punctuation, and the common shifted
//! symbols. Characters outside the table go through the dispatcher's
//! Unicode path instead.

/// Well-known virtual keycodes used directly by the action layer.
pub mod keycode {
    pub const RETURN: u16 = 36;
    pub const TAB: u16 = 48;
    pub const SPACE: u16 = 49;
    pub const DELETE: u16 = 51;
    pub const ESCAPE: u16 = 53;
}

/// A virtual keycode plus whether the shift modifier is required.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyStroke {
    pub keycode: u16,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(keycode: u16) -> Self {
        Self {
            keycode,
            shift: false,
        }
    }

    const fn shifted(keycode: u16) -> Self {
        Self {
            keycode,
            shift: true,
        }
    }
}

/// Look up the keystroke for a character, if the table covers it.
pub fn lookup_key(ch: char) -> Option<KeyStroke> {
    let stroke = match ch {
        'a' => KeyStroke::plain(0),
        's' => KeyStroke::plain(1),
        'd' => KeyStroke::plain(2),
        'f' => KeyStroke::plain(3),
        'h' => KeyStroke::plain(4),
        'g' => KeyStroke::plain(5),
        'z' => KeyStroke::plain(6),
        'x' => KeyStroke::plain(7),
        'c' => KeyStroke::plain(8),
        'v' => KeyStroke::plain(9),
        'b' => KeyStroke::plain(11),
        'q' => KeyStroke::plain(12),
        'w' => KeyStroke::plain(13),
        'e' => KeyStroke::plain(14),
        'r' => KeyStroke::plain(15),
        'y' => KeyStroke::plain(16),
        't' => KeyStroke::plain(17),
        'o' => KeyStroke::plain(31),
        'u' => KeyStroke::plain(32),
        'i' => KeyStroke::plain(34),
        'p' => KeyStroke::plain(35),
        'l' => KeyStroke::plain(37),
        'j' => KeyStroke::plain(38),
        'k' => KeyStroke::plain(40),
        'n' => KeyStroke::plain(45),
        'm' => KeyStroke::plain(46),

        '1' => KeyStroke::plain(18),
        '2' => KeyStroke::plain(19),
        '3' => KeyStroke::plain(20),
        '4' => KeyStroke::plain(21),
        '6' => KeyStroke::plain(22),
        '5' => KeyStroke::plain(23),
        '9' => KeyStroke::plain(25),
        '7' => KeyStroke::plain(26),
        '8' => KeyStroke::plain(28),
        '0' => KeyStroke::plain(29),

        '=' => KeyStroke::plain(24),
        '-' => KeyStroke::plain(27),
        ']' => KeyStroke::plain(30),
        '[' => KeyStroke::plain(33),
        '\'' => KeyStroke::plain(39),
        ';' => KeyStroke::plain(41),
        '\\' => KeyStroke::plain(42),
        ',' => KeyStroke::plain(43),
        '/' => KeyStroke::plain(44),
        '.' => KeyStroke::plain(47),
        '`' => KeyStroke::plain(50),
        ' ' => KeyStroke::plain(keycode::SPACE),
        '\t' => KeyStroke::plain(keycode::TAB),
        '\n' => KeyStroke::plain(keycode::RETURN),

        '!' => KeyStroke::shifted(18),
        '@' => KeyStroke::shifted(19),
        '#' => KeyStroke::shifted(20),
        '$' => KeyStroke::shifted(21),
        '%' => KeyStroke::shifted(23),
        '^' => KeyStroke::shifted(22),
        '&' => KeyStroke::shifted(26),
        '*' => KeyStroke::shifted(28),
        '(' => KeyStroke::shifted(25),
        ')' => KeyStroke::shifted(29),
        '_' => KeyStroke::shifted(27),
        '+' => KeyStroke::shifted(24),
        '{' => KeyStroke::shifted(33),
        '}' => KeyStroke::shifted(30),
        '|' => KeyStroke::shifted(42),
        ':' => KeyStroke::shifted(41),
        '"' => KeyStroke::shifted(39),
        '<' => KeyStroke::shifted(43),
        '>' => KeyStroke::shifted(47),
        '?' => KeyStroke::shifted(44),
        '~' => KeyStroke::shifted(50),

        upper if upper.is_ascii_uppercase() => {
            let base = lookup_key(upper.to_ascii_lowercase())?;
            KeyStroke::shifted(base.keycode)
        }
        _ => return None,
    };
    Some(stroke)
}
