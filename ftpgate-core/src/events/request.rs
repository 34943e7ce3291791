use super::FtpCommand;

/// A single command as received on the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpRequest {
    line: String,
    command: FtpCommand,
    argument: Option<String>,
}

impl FtpRequest {
    pub fn new(command: &str, argument: Option<&str>) -> Self {
        let command = FtpCommand::parse(command);
        let argument = argument.map(str::to_owned);
        let line = match &argument {
            Some(argument) => format!("{command} {argument}"),
            None => command.to_string(),
        };
        Self {
            line,
            command,
            argument,
        }
    }

    /// Splits a raw control-connection line into verb and argument.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, argument) = match line.trim_start().split_once(' ') {
            Some((verb, argument)) => (verb, Some(argument.trim()).filter(|a| !a.is_empty())),
            None => (line.trim(), None),
        };
        Self {
            line: line.to_owned(),
            command: FtpCommand::parse(verb),
            argument: argument.map(str::to_owned),
        }
    }

    pub fn command(&self) -> &FtpCommand {
        &self.command
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}
