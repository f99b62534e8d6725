//! Console command table.
//!
//! The grammar, the `help` command and front-end banners all read the same
//! table so keywords and usage strings cannot drift apart.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Toggle,
    Start,
    Stop,
    Collide,
    Frame,
    Status,
    Help,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

impl CommandSpec {
    /// Returns `true` when `word` names this command, ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, word: &str) -> bool {
        self.name.eq_ignore_ascii_case(word)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(word))
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "toggle",
        aliases: &[],
        tag: CommandTag::Toggle,
        usage: "toggle",
        summary: "start the session when idle, stop it when armed",
    },
    CommandSpec {
        name: "start",
        aliases: &[],
        tag: CommandTag::Start,
        usage: "start",
        summary: "arm collision detection and light the robot",
    },
    CommandSpec {
        name: "stop",
        aliases: &[],
        tag: CommandTag::Stop,
        usage: "stop",
        summary: "stop rolling, disable collision detection and turn the light off",
    },
    CommandSpec {
        name: "collide",
        aliases: &["bump"],
        tag: CommandTag::Collide,
        usage: "collide accel=<x>,<y> power=<x>,<y>",
        summary: "inject a collision report from the robot",
    },
    CommandSpec {
        name: "frame",
        aliases: &[],
        tag: CommandTag::Frame,
        usage: "frame <code>",
        summary: "inject a payload-less async frame (decimal or 0x-prefixed code)",
    },
    CommandSpec {
        name: "status",
        aliases: &[],
        tag: CommandTag::Status,
        usage: "status",
        summary: "show session and robot state",
    },
    CommandSpec {
        name: "help",
        aliases: &["?"],
        tag: CommandTag::Help,
        usage: "help [topic]",
        summary: "list commands or describe one",
    },
    CommandSpec {
        name: "exit",
        aliases: &["quit"],
        tag: CommandTag::Exit,
        usage: "exit",
        summary: "tear the session down and leave",
    },
];

/// Looks up a command by name or alias.
#[must_use]
pub fn find(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_honours_aliases() {
        assert_eq!(find("TOGGLE").map(|spec| spec.tag), Some(CommandTag::Toggle));
        assert_eq!(find("quit").map(|spec| spec.tag), Some(CommandTag::Exit));
        assert_eq!(find("?").map(|spec| spec.tag), Some(CommandTag::Help));
        assert!(find("reboot").is_none());
    }

    #[test]
    fn names_are_unique() {
        for (index, spec) in COMMANDS.iter().enumerate() {
            assert!(
                COMMANDS[index + 1..]
                    .iter()
                    .all(|other| !other.matches(spec.name)),
                "{} listed twice",
                spec.name
            );
        }
    }
}
