//! Prefix text commands.
//!
//! ```text
//! !jira <query>
//! !feed [list]
//! !feed add <name> <url> [recency]
//! !feed remove <name>
//! !feed update [name...]
//! !feed reset
//! ```

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Jira { query: String },
    Feed(FeedCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedCommand {
    List,
    Add {
        name: String,
        url: String,
        recency: Option<u64>,
    },
    Remove {
        name: String,
    },
    /// Empty `names` means every feed of the channel.
    Update {
        names: Vec<String>,
    },
    Reset,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("missing argument <{argument}> for `{command}`")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("unknown subcommand `{0}` for `feed`")]
    UnknownSubcommand(String),

    #[error("invalid recency `{0}`, expected seconds")]
    InvalidRecency(String),
}

impl Command {
    /// Parse `content` as a command.
    ///
    /// `Ok(None)` means the message is not a command at all (no prefix or
    /// unknown name); `Err` means a known command with bad arguments.
    pub fn parse(prefix: &str, content: &str) -> Result<Option<Command>, CommandError> {
        let Some(body) = content.trim().strip_prefix(prefix) else {
            return Ok(None);
        };
        if prefix.is_empty() {
            return Ok(None);
        }

        let body = body.trim_start();
        let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let rest = rest.trim();

        match name.to_lowercase().as_str() {
            "jira" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "jira",
                        argument: "query",
                    });
                }
                Ok(Some(Command::Jira {
                    query: rest.to_string(),
                }))
            }
            "feed" => FeedCommand::parse(rest).map(|c| Some(Command::Feed(c))),
            _ => Ok(None),
        }
    }

    /// Whether only managers may run this command.
    pub fn requires_manager(&self) -> bool {
        matches!(self, Command::Feed(_))
    }
}

impl FeedCommand {
    fn parse(args: &str) -> Result<FeedCommand, CommandError> {
        let mut words = args.split_whitespace();
        let Some(sub) = words.next() else {
            return Ok(FeedCommand::List);
        };

        let mut required = |argument: &'static str| {
            words
                .next()
                .map(String::from)
                .ok_or(CommandError::MissingArgument {
                    command: "feed",
                    argument,
                })
        };

        match sub {
            "list" => Ok(FeedCommand::List),
            "add" => {
                let name = required("name")?;
                let url = required("url")?;
                let recency = match words.next() {
                    Some(r) => Some(
                        r.parse::<u64>()
                            .map_err(|_| CommandError::InvalidRecency(r.to_string()))?,
                    ),
                    None => None,
                };
                Ok(FeedCommand::Add { name, url, recency })
            }
            "remove" => Ok(FeedCommand::Remove {
                name: required("name")?,
            }),
            "update" => Ok(FeedCommand::Update {
                names: words.map(String::from).collect(),
            }),
            "reset" => Ok(FeedCommand::Reset),
            other => Err(CommandError::UnknownSubcommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(Command::parse("!", "hello there"), Ok(None));
        assert_eq!(Command::parse("!", "!dance"), Ok(None));
        assert_eq!(Command::parse("", "jira 4"), Ok(None));
    }

    #[test]
    fn test_jira() {
        assert_eq!(
            Command::parse("!", "!jira  MC-4 "),
            Ok(Some(Command::Jira { query: "MC-4".into() }))
        );
        assert_eq!(
            Command::parse("!", "!JIRA item drops"),
            Ok(Some(Command::Jira {
                query: "item drops".into()
            }))
        );
        assert_eq!(
            Command::parse("!", "!jira"),
            Err(CommandError::MissingArgument {
                command: "jira",
                argument: "query"
            })
        );
    }

    #[test]
    fn test_feed_list() {
        assert_eq!(
            Command::parse("!", "!feed"),
            Ok(Some(Command::Feed(FeedCommand::List)))
        );
        assert_eq!(
            Command::parse("?", "?feed list"),
            Ok(Some(Command::Feed(FeedCommand::List)))
        );
    }

    #[test]
    fn test_feed_add() {
        assert_eq!(
            Command::parse("!", "!feed add news https://example.com/feed 3600"),
            Ok(Some(Command::Feed(FeedCommand::Add {
                name: "news".into(),
                url: "https://example.com/feed".into(),
                recency: Some(3600),
            })))
        );
        assert_eq!(
            Command::parse("!", "!feed add news"),
            Err(CommandError::MissingArgument {
                command: "feed",
                argument: "url"
            })
        );
        assert_eq!(
            Command::parse("!", "!feed add news https://x soon"),
            Err(CommandError::InvalidRecency("soon".into()))
        );
    }

    #[test]
    fn test_feed_other_subcommands() {
        assert_eq!(
            Command::parse("!", "!feed remove news"),
            Ok(Some(Command::Feed(FeedCommand::Remove { name: "news".into() })))
        );
        assert_eq!(
            Command::parse("!", "!feed update a b"),
            Ok(Some(Command::Feed(FeedCommand::Update {
                names: vec!["a".into(), "b".into()]
            })))
        );
        assert_eq!(
            Command::parse("!", "!feed reset"),
            Ok(Some(Command::Feed(FeedCommand::Reset)))
        );
        assert_eq!(
            Command::parse("!", "!feed explode"),
            Err(CommandError::UnknownSubcommand("explode".into()))
        );
    }

    #[test]
    fn test_requires_manager() {
        assert!(Command::Feed(FeedCommand::List).requires_manager());
        assert!(!Command::Jira { query: "1".into() }.requires_manager());
    }
}
