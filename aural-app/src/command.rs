//! Line commands read from stdin

use std::path::PathBuf;

use aural_player::RepeatMode;

/// One parsed command line. Playlist positions are 1-based as shown by `list`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Transport
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Seek(f64),

    // EQ
    SetBand(usize, f32),
    Preset(String),

    // Effects
    Volume(f32),
    Gain(f32),
    Reverb(f32),
    Delay(f32),

    // Policy
    ToggleShuffle,
    Repeat(RepeatMode),

    // Playlist
    Add(PathBuf),
    Remove(usize),
    Move(usize, usize),
    Jump(usize),
    List,

    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | toggle | next | prev | seek <secs>
  eq <band 1-10> <db> | preset <name>
  vol <0..1> | gain <db> | reverb <0..1> | delay <0..1>
  shuffle | repeat off|one|all
  add <path> | rm <pos> | mv <from> <to> | goto <pos> | list
  status | help | quit";

/// Parse a command line. Returns `None` for anything unrecognized.
pub fn parse_command(line: &str) -> Option<Command> {
    let input = line.trim();

    // Paths may contain spaces; take the rest of the line
    if let Some(path) = input.strip_prefix("add ") {
        let path = strip_quotes(path.trim());
        if path.is_empty() {
            return None;
        }
        return Some(Command::Add(path.into()));
    }

    // Preset names contain spaces ("Bass Boost")
    if let Some(name) = input.strip_prefix("preset ") {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        return Some(Command::Preset(name.to_string()));
    }

    let parts: Vec<&str> = input.split_whitespace().collect();
    let command = match parts.as_slice() {
        ["play"] => Command::Play,
        ["pause"] => Command::Pause,
        ["toggle"] | ["p"] => Command::Toggle,
        ["next"] | ["n"] => Command::Next,
        ["prev"] => Command::Previous,
        ["seek", secs] => Command::Seek(secs.parse().ok()?),
        ["eq", band, db] => {
            let band: usize = band.parse().ok()?;
            Command::SetBand(band.checked_sub(1)?, db.parse().ok()?)
        }
        ["vol", v] => Command::Volume(v.parse().ok()?),
        ["gain", db] => Command::Gain(db.parse().ok()?),
        ["reverb", x] => Command::Reverb(x.parse().ok()?),
        ["delay", x] => Command::Delay(x.parse().ok()?),
        ["shuffle"] => Command::ToggleShuffle,
        ["repeat", mode] => Command::Repeat(mode.parse().ok()?),
        ["rm", pos] => Command::Remove(position(pos)?),
        ["mv", from, to] => Command::Move(position(from)?, position(to)?),
        ["goto", pos] => Command::Jump(position(pos)?),
        ["list"] | ["ls"] => Command::List,
        ["status"] | ["s"] => Command::Status,
        ["help"] | ["?"] => Command::Help,
        ["quit"] | ["q"] => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// 1-based position to index
fn position(s: &str) -> Option<usize> {
    s.parse::<usize>().ok()?.checked_sub(1)
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("play"), Some(Command::Play));
        assert_eq!(parse_command("  toggle "), Some(Command::Toggle));
        assert_eq!(parse_command("prev"), Some(Command::Previous));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_numeric_arguments() {
        assert_eq!(parse_command("seek 42.5"), Some(Command::Seek(42.5)));
        assert_eq!(parse_command("eq 1 -3"), Some(Command::SetBand(0, -3.0)));
        assert_eq!(parse_command("eq 0 3"), None);
        assert_eq!(parse_command("vol 0.5"), Some(Command::Volume(0.5)));
        assert_eq!(parse_command("seek soon"), None);
    }

    #[test]
    fn test_positions_are_one_based() {
        assert_eq!(parse_command("rm 1"), Some(Command::Remove(0)));
        assert_eq!(parse_command("mv 1 3"), Some(Command::Move(0, 2)));
        assert_eq!(parse_command("rm 0"), None);
        assert_eq!(parse_command("goto 2"), Some(Command::Jump(1)));
    }

    #[test]
    fn test_repeat_and_preset() {
        assert_eq!(parse_command("repeat ALL"), Some(Command::Repeat(RepeatMode::All)));
        assert_eq!(parse_command("repeat twice"), None);
        assert_eq!(
            parse_command("preset Bass Boost"),
            Some(Command::Preset("Bass Boost".to_string()))
        );
    }

    #[test]
    fn test_add_strips_quotes() {
        assert_eq!(
            parse_command("add \"/music/My Album\""),
            Some(Command::Add(PathBuf::from("/music/My Album")))
        );
        assert_eq!(parse_command("add /tmp/a.mp3"), Some(Command::Add(PathBuf::from("/tmp/a.mp3"))));
        assert_eq!(parse_command("add \"\""), None);
    }
}
