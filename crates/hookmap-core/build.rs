use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Hardware key codes reported by the keyboard driver, as (name, code).
///
/// Every name becomes an associated constant on `KeyCode` and an entry in the
/// name table used for `Display`/`FromStr`.
const KEY_CODES: &[(&str, u32)] = &[
    ("A", 0x00),
    ("S", 0x01),
    ("D", 0x02),
    ("F", 0x03),
    ("H", 0x04),
    ("G", 0x05),
    ("Z", 0x06),
    ("X", 0x07),
    ("C", 0x08),
    ("V", 0x09),
    ("B", 0x0b),
    ("Q", 0x0c),
    ("W", 0x0d),
    ("E", 0x0e),
    ("R", 0x0f),
    ("Y", 0x10),
    ("T", 0x11),
    ("KEY_1", 0x12),
    ("KEY_2", 0x13),
    ("KEY_3", 0x14),
    ("KEY_4", 0x15),
    ("KEY_6", 0x16),
    ("KEY_5", 0x17),
    ("EQUAL", 0x18),
    ("KEY_9", 0x19),
    ("KEY_7", 0x1a),
    ("MINUS", 0x1b),
    ("KEY_8", 0x1c),
    ("KEY_0", 0x1d),
    ("BRACKET_RIGHT", 0x1e),
    ("O", 0x1f),
    ("U", 0x20),
    ("BRACKET_LEFT", 0x21),
    ("I", 0x22),
    ("P", 0x23),
    ("RETURN", 0x24),
    ("L", 0x25),
    ("J", 0x26),
    ("QUOTE", 0x27),
    ("K", 0x28),
    ("SEMICOLON", 0x29),
    ("BACKSLASH", 0x2a),
    ("COMMA", 0x2b),
    ("SLASH", 0x2c),
    ("N", 0x2d),
    ("M", 0x2e),
    ("DOT", 0x2f),
    ("TAB", 0x30),
    ("SPACE", 0x31),
    ("BACKQUOTE", 0x32),
    ("DELETE", 0x33),
    ("ESCAPE", 0x35),
    ("COMMAND_R", 0x36),
    ("COMMAND_L", 0x37),
    ("SHIFT_L", 0x38),
    ("CAPSLOCK", 0x39),
    ("OPTION_L", 0x3a),
    ("CONTROL_L", 0x3b),
    ("SHIFT_R", 0x3c),
    ("OPTION_R", 0x3d),
    ("CONTROL_R", 0x3e),
    ("FN", 0x3f),
    ("KEYPAD_DOT", 0x41),
    ("KEYPAD_MULTIPLY", 0x43),
    ("KEYPAD_PLUS", 0x45),
    ("KEYPAD_CLEAR", 0x47),
    ("KEYPAD_SLASH", 0x4b),
    ("ENTER", 0x4c),
    ("KEYPAD_MINUS", 0x4e),
    ("KEYPAD_EQUAL", 0x51),
    ("KEYPAD_0", 0x52),
    ("KEYPAD_1", 0x53),
    ("KEYPAD_2", 0x54),
    ("KEYPAD_3", 0x55),
    ("KEYPAD_4", 0x56),
    ("KEYPAD_5", 0x57),
    ("KEYPAD_6", 0x58),
    ("KEYPAD_7", 0x59),
    ("KEYPAD_8", 0x5b),
    ("KEYPAD_9", 0x5c),
    ("F5", 0x60),
    ("F6", 0x61),
    ("F7", 0x62),
    ("F3", 0x63),
    ("F8", 0x64),
    ("F9", 0x65),
    ("F11", 0x67),
    ("F13", 0x69),
    ("F14", 0x6b),
    ("F10", 0x6d),
    ("F12", 0x6f),
    ("F15", 0x71),
    ("HELP", 0x72),
    ("HOME", 0x73),
    ("PAGEUP", 0x74),
    ("FORWARD_DELETE", 0x75),
    ("F4", 0x76),
    ("END", 0x77),
    ("F2", 0x78),
    ("PAGEDOWN", 0x79),
    ("F1", 0x7a),
    ("CURSOR_LEFT", 0x7b),
    ("CURSOR_RIGHT", 0x7c),
    ("CURSOR_DOWN", 0x7d),
    ("CURSOR_UP", 0x7e),
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).unwrap();

    // Generate the KeyCode newtype wrapper
    writeln!(
        f,
        r#"
/// Represents a single hardware key code as reported by the keyboard driver.
///
/// Codes at or above [`KeyCode::VK_BEGIN`] are reserved for virtual keys and
/// are never valid on the driver path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct KeyCode(pub u32);

impl From<u32> for KeyCode {{
    fn from(code: u32) -> Self {{
        KeyCode(code)
    }}
}}

impl From<KeyCode> for u32 {{
    fn from(key: KeyCode) -> Self {{
        key.0
    }}
}}

impl fmt::Display for KeyCode {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        match key_name(self.0) {{
            Some(name) => write!(f, "{{}}", name),
            None => write!(f, "0x{{:x}}", self.0),
        }}
    }}
}}

impl FromStr for KeyCode {{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {{
        key_from_name(s).ok_or_else(|| format!("Unknown key: {{}}", s))
    }}
}}
"#
    )
    .unwrap();

    writeln!(f, "impl KeyCode {{").unwrap();
    for (name, code) in KEY_CODES {
        writeln!(f, "    pub const {}: KeyCode = KeyCode(0x{:02x});", name, code).unwrap();
    }
    writeln!(f, "}}").unwrap();

    writeln!(f, "\n/// Name table generated from the driver key code list").unwrap();
    writeln!(f, "pub(crate) const KEY_NAMES: &[(&str, u32)] = &[").unwrap();
    for (name, code) in KEY_CODES {
        writeln!(f, "    (\"{}\", 0x{:02x}),", name, code).unwrap();
    }
    writeln!(f, "];").unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
