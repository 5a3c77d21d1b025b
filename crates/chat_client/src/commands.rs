#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Reset,
    Index,
    Sources,
    Upload(String),
    Delete(String),
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or(trimmed);
    let argument = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

    let parsed = match (command, argument) {
        ("/help", _) => SlashCommand::Help,
        ("/reset", _) => SlashCommand::Reset,
        ("/index", _) => SlashCommand::Index,
        ("/sources", _) => SlashCommand::Sources,
        ("/upload", Some(path)) => SlashCommand::Upload(path.to_string()),
        ("/delete", Some(name)) => SlashCommand::Delete(name.to_string()),
        ("/quit", _) => SlashCommand::Quit,
        (other, _) => SlashCommand::Unknown(other.to_string()),
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::{parse_slash_command, SlashCommand};

    #[test]
    fn plain_messages_are_not_commands() {
        assert_eq!(parse_slash_command("hello there"), None);
        assert_eq!(parse_slash_command("  what is 2/3?  "), None);
    }

    #[test]
    fn known_commands_parse() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/reset"), Some(SlashCommand::Reset));
        assert_eq!(parse_slash_command("/index"), Some(SlashCommand::Index));
        assert_eq!(parse_slash_command("/sources"), Some(SlashCommand::Sources));
        assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Quit));
    }

    #[test]
    fn upload_and_delete_take_an_argument() {
        assert_eq!(
            parse_slash_command("/upload docs/report v2.pdf"),
            Some(SlashCommand::Upload("docs/report v2.pdf".to_string()))
        );
        assert_eq!(
            parse_slash_command("/delete report.pdf"),
            Some(SlashCommand::Delete("report.pdf".to_string()))
        );
    }

    #[test]
    fn upload_and_delete_without_argument_are_unknown() {
        assert_eq!(
            parse_slash_command("/upload"),
            Some(SlashCommand::Unknown("/upload".to_string()))
        );
        assert_eq!(
            parse_slash_command("/delete   "),
            Some(SlashCommand::Unknown("/delete".to_string()))
        );
    }

    #[test]
    fn unknown_commands_are_reported_verbatim() {
        assert_eq!(
            parse_slash_command("/teleport"),
            Some(SlashCommand::Unknown("/teleport".to_string()))
        );
    }
}
