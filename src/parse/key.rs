use crossterm::event::{KeyCode, KeyModifiers};

use crate::model::plugin::KeyBinding;

/// Parse a human key spec such as `Ctrl-R`, `F3`, `Alt-M`, `Shift-Tab` or `/`.
///
/// Modifier prefixes may be separated with `-` or `+`. A single printable
/// character with no Ctrl/Alt modifier becomes a rune binding.
pub fn parse_key(spec: &str) -> Result<KeyBinding, String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err("empty key".to_string());
    }
    // A lone separator character is a key in its own right
    if spec.chars().count() == 1 {
        let c = spec.chars().next().unwrap_or(' ');
        return Ok(KeyBinding::rune(c));
    }

    let mut modifiers = KeyModifiers::NONE;
    let mut rest = spec;
    loop {
        let Some((head, tail)) = split_modifier(rest) else {
            break;
        };
        match head.to_lowercase().as_str() {
            "ctrl" | "control" | "c" => modifiers |= KeyModifiers::CONTROL,
            "alt" | "meta" | "m" => modifiers |= KeyModifiers::ALT,
            "shift" | "s" => modifiers |= KeyModifiers::SHIFT,
            _ => break,
        }
        rest = tail;
    }

    let code = match rest.to_lowercase().as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" if modifiers.contains(KeyModifiers::SHIFT) => {
            modifiers.remove(KeyModifiers::SHIFT);
            KeyCode::BackTab
        }
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pgup" | "pageup" => KeyCode::PageUp,
        "pgdn" | "pagedown" => KeyCode::PageDown,
        lower => {
            if let Some(n) = lower.strip_prefix('f')
                && let Ok(n) = n.parse::<u8>()
                && (1..=24).contains(&n)
            {
                KeyCode::F(n)
            } else if rest.chars().count() == 1 {
                let c = rest.chars().next().unwrap_or(' ');
                if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    KeyCode::Char(c.to_ascii_lowercase())
                } else {
                    // Shift-x is just the rune X
                    return Ok(KeyBinding::rune(if modifiers.contains(KeyModifiers::SHIFT) {
                        c.to_ascii_uppercase()
                    } else {
                        c
                    }));
                }
            } else {
                return Err(format!("unknown key '{}'", spec));
            }
        }
    };

    Ok(KeyBinding::key(code, modifiers))
}

/// Split `Ctrl-R` into (`Ctrl`, `R`); `None` when there is no separator
/// with something on both sides
fn split_modifier(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(['-', '+'])?;
    if idx == 0 || idx + 1 >= s.len() {
        return None;
    }
    Some((&s[..idx], &s[idx + 1..]))
}
