use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::Action;

// poll for a key, resolve it to a semantic action for the app to handle
pub fn poll_input(timeout: Duration) -> anyhow::Result<Option<Action>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        return Ok(resolve_key(key.code));
    }
    Ok(None)
}

fn resolve_key(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char(' ') => Action::TogglePlayMix,
        KeyCode::Char('p' | 'P') => Action::TogglePlayTrack,
        KeyCode::Char('r' | 'R') => Action::ToggleRecord,
        KeyCode::Char('s' | 'S') => Action::Export,

        KeyCode::Char('t' | 'T') => Action::AddTrack,
        KeyCode::Delete | KeyCode::Backspace => Action::DeleteTrack,
        KeyCode::Up => Action::SelectPrev,
        KeyCode::Down => Action::SelectNext,
        KeyCode::Left => Action::TempoDown,
        KeyCode::Right => Action::TempoUp,

        KeyCode::Char('m' | 'M') => Action::ToggleMute,
        KeyCode::Char('l' | 'L') => Action::ToggleLoop,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('+' | '=') => Action::VolumeUp,

        // palette slots: 1-9, 0, then q/w for the last two
        KeyCode::Char(c @ '1'..='9') => Action::PlaceSample(c as usize - '1' as usize),
        KeyCode::Char('0') => Action::PlaceSample(9),
        KeyCode::Char('q' | 'Q') => Action::PlaceSample(10),
        KeyCode::Char('w' | 'W') => Action::PlaceSample(11),
        KeyCode::Char('[') => Action::CursorLeft,
        KeyCode::Char(']') => Action::CursorRight,
        KeyCode::Char('x' | 'X') => Action::RemoveAtCursor,
        KeyCode::Char(',') => Action::NudgeLeft,
        KeyCode::Char('.') => Action::NudgeRight,
        KeyCode::Char('<') => Action::EventVolumeDown,
        KeyCode::Char('>') => Action::EventVolumeUp,

        KeyCode::Char('c' | 'C') => Action::ClearAll,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_keys_resolve() {
        assert_eq!(resolve_key(KeyCode::Char(' ')), Some(Action::TogglePlayMix));
        assert_eq!(resolve_key(KeyCode::Char('p')), Some(Action::TogglePlayTrack));
        assert_eq!(resolve_key(KeyCode::Char('r')), Some(Action::ToggleRecord));
        assert_eq!(resolve_key(KeyCode::Char('s')), Some(Action::Export));
        assert_eq!(resolve_key(KeyCode::Esc), Some(Action::Quit));
    }

    #[test]
    fn every_palette_slot_has_a_key() {
        assert_eq!(resolve_key(KeyCode::Char('1')), Some(Action::PlaceSample(0)));
        assert_eq!(resolve_key(KeyCode::Char('9')), Some(Action::PlaceSample(8)));
        assert_eq!(resolve_key(KeyCode::Char('0')), Some(Action::PlaceSample(9)));
        assert_eq!(resolve_key(KeyCode::Char('q')), Some(Action::PlaceSample(10)));
        assert_eq!(resolve_key(KeyCode::Char('w')), Some(Action::PlaceSample(11)));
        // the whole palette is reachable
        assert_eq!(crate::provider::PALETTE.len(), 12);
    }

    #[test]
    fn unbound_keys_resolve_to_nothing() {
        assert_eq!(resolve_key(KeyCode::Char('z')), None);
        assert_eq!(resolve_key(KeyCode::Tab), None);
    }
}
