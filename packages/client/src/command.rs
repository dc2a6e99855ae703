//! Parsing of what the user types at the prompt.

use thiserror::Error;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/connect <user_id>`
    Connect(i64),
    /// `/disconnect <user_id>`
    Disconnect(i64),
    /// `/status <user_id>`
    Status(i64),
    /// `/connections`
    Connections,
    /// `/chats`
    Chats,
    /// `/open <conversation_id>`: show history and follow the conversation live
    Open(i64),
    /// `/close`
    Close,
    /// `/history`: re-fetch the open conversation
    History,
    /// `/clear`: delete every message of the open conversation
    Clear,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything that is not a command is sent to the open conversation
    Say(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("/{0} needs a numeric id")]
    MissingId(String),
}

pub const HELP: &str = "\
/connect <user_id>      connect with a user
/disconnect <user_id>   remove a connection (deletes the conversation)
/status <user_id>       are we connected?
/connections            list connections
/chats                  list conversations, newest first
/open <conversation_id> open a conversation
/close                  close the open conversation
/history                reload the open conversation
/clear                  delete every message of the open conversation
/quit                   exit
<text>                  send to the open conversation";

fn parse_id(name: &str, argument: Option<&str>) -> Result<i64, CommandError> {
    argument
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| CommandError::MissingId(name.to_string()))
}

/// Parse one trimmed, non-empty input line
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let argument = parts.next();
    match name {
        "connect" => Ok(Command::Connect(parse_id(name, argument)?)),
        "disconnect" => Ok(Command::Disconnect(parse_id(name, argument)?)),
        "status" => Ok(Command::Status(parse_id(name, argument)?)),
        "connections" => Ok(Command::Connections),
        "chats" => Ok(Command::Chats),
        "open" => Ok(Command::Open(parse_id(name, argument)?)),
        "close" => Ok(Command::Close),
        "history" => Ok(Command::History),
        "clear" => Ok(Command::Clear),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        // テスト項目: スラッシュで始まらない入力はメッセージとして扱われる
        // given (前提条件):
        let line = "hello, see you at the reunion";

        // when (操作):
        let command = parse_command(line);

        // then (期待する結果):
        assert_eq!(command, Ok(Command::Say(line.to_string())));
    }

    #[test]
    fn test_commands_with_ids() {
        // テスト項目: ID を取るコマンドが数値を読み取る
        // given (前提条件):
        let lines = ["/connect 2", "/disconnect 3", "/open 10", "/status  4"];

        // when (操作):
        let commands: Vec<_> = lines.iter().map(|line| parse_command(line)).collect();

        // then (期待する結果):
        assert_eq!(
            commands,
            vec![
                Ok(Command::Connect(2)),
                Ok(Command::Disconnect(3)),
                Ok(Command::Open(10)),
                Ok(Command::Status(4)),
            ]
        );
    }

    #[test]
    fn test_missing_or_invalid_id() {
        // テスト項目: ID が無い、または数値でない場合はエラー
        // given (前提条件):
        let missing = "/connect";
        let invalid = "/open bob";

        // when (操作):
        let missing_result = parse_command(missing);
        let invalid_result = parse_command(invalid);

        // then (期待する結果):
        assert_eq!(
            missing_result,
            Err(CommandError::MissingId("connect".to_string()))
        );
        assert_eq!(
            invalid_result,
            Err(CommandError::MissingId("open".to_string()))
        );
    }

    #[test]
    fn test_unknown_command() {
        // テスト項目: 未知のコマンドはエラー
        // given (前提条件):
        let line = "/follow 2";

        // when (操作):
        let result = parse_command(line);

        // then (期待する結果):
        assert_eq!(result, Err(CommandError::Unknown("follow".to_string())));
    }
}
