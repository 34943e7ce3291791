use std::fmt::Display;
use std::str::FromStr;

/// Reserved event name whose listeners run before every dispatch.
pub const ALL_EVENTS: &str = "all";

/// FTP verbs that map to a public event. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FtpCommand {
    Dele,
    Stor,
    Retr,
    Rmd,
    Mkd,
    Appe,
    Stou,
    Rnto,
    Site,
    Pass,
    Other(String),
}

impl FtpCommand {
    pub fn parse(verb: &str) -> Self {
        let verb = verb.trim().to_ascii_uppercase();
        match verb.as_str() {
            "DELE" => Self::Dele,
            "STOR" => Self::Stor,
            "RETR" => Self::Retr,
            "RMD" => Self::Rmd,
            "MKD" => Self::Mkd,
            "APPE" => Self::Appe,
            "STOU" => Self::Stou,
            "RNTO" => Self::Rnto,
            "SITE" => Self::Site,
            "PASS" => Self::Pass,
            _ => Self::Other(verb),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Dele => "DELE",
            Self::Stor => "STOR",
            Self::Retr => "RETR",
            Self::Rmd => "RMD",
            Self::Mkd => "MKD",
            Self::Appe => "APPE",
            Self::Stou => "STOU",
            Self::Rnto => "RNTO",
            Self::Site => "SITE",
            Self::Pass => "PASS",
            Self::Other(verb) => verb,
        }
    }

    /// Event fired before the server executes this command.
    pub fn before_event(&self) -> Option<FtpEvent> {
        Some(match self {
            Self::Dele => FtpEvent::BeforeDelete,
            Self::Stor => FtpEvent::BeforeUpload,
            Self::Retr => FtpEvent::BeforeDownload,
            Self::Rmd => FtpEvent::BeforeRemoveDir,
            Self::Mkd => FtpEvent::BeforeMakeDir,
            Self::Appe => FtpEvent::BeforeAppend,
            Self::Stou => FtpEvent::BeforeUploadUnique,
            Self::Rnto => FtpEvent::BeforeRename,
            Self::Site => FtpEvent::Site,
            Self::Pass | Self::Other(_) => return None,
        })
    }

    /// Event fired after the server has executed this command.
    pub fn after_event(&self) -> Option<FtpEvent> {
        Some(match self {
            Self::Pass => FtpEvent::Login,
            Self::Dele => FtpEvent::Delete,
            Self::Stor => FtpEvent::Upload,
            Self::Retr => FtpEvent::Download,
            Self::Rmd => FtpEvent::RemoveDir,
            Self::Mkd => FtpEvent::MakeDir,
            Self::Appe => FtpEvent::Append,
            Self::Stou => FtpEvent::UploadUnique,
            Self::Rnto => FtpEvent::Rename,
            Self::Site | Self::Other(_) => return None,
        })
    }
}

impl Display for FtpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Before,
    After,
}

impl CommandPhase {
    pub fn event_for(&self, command: &FtpCommand) -> Option<FtpEvent> {
        match self {
            Self::Before => command.before_event(),
            Self::After => command.after_event(),
        }
    }
}

/// Public event names listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FtpEvent {
    All,
    BeforeDelete,
    BeforeUpload,
    BeforeDownload,
    BeforeRemoveDir,
    BeforeMakeDir,
    BeforeAppend,
    BeforeUploadUnique,
    BeforeRename,
    Site,
    Login,
    Delete,
    Upload,
    Download,
    RemoveDir,
    MakeDir,
    Append,
    UploadUnique,
    Rename,
}

impl FtpEvent {
    pub const VALUES: [FtpEvent; 19] = [
        Self::All,
        Self::BeforeDelete,
        Self::BeforeUpload,
        Self::BeforeDownload,
        Self::BeforeRemoveDir,
        Self::BeforeMakeDir,
        Self::BeforeAppend,
        Self::BeforeUploadUnique,
        Self::BeforeRename,
        Self::Site,
        Self::Login,
        Self::Delete,
        Self::Upload,
        Self::Download,
        Self::RemoveDir,
        Self::MakeDir,
        Self::Append,
        Self::UploadUnique,
        Self::Rename,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => ALL_EVENTS,
            Self::BeforeDelete => "beforedelete",
            Self::BeforeUpload => "beforeupload",
            Self::BeforeDownload => "beforedownload",
            Self::BeforeRemoveDir => "beforeremovedir",
            Self::BeforeMakeDir => "beforemakedir",
            Self::BeforeAppend => "beforeappend",
            Self::BeforeUploadUnique => "beforeuploadunique",
            Self::BeforeRename => "beforerename",
            Self::Site => "site",
            Self::Login => "login",
            Self::Delete => "delete",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::RemoveDir => "removedir",
            Self::MakeDir => "makedir",
            Self::Append => "append",
            Self::UploadUnique => "uploadunique",
            Self::Rename => "rename",
        }
    }
}

impl AsRef<str> for FtpEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for FtpEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEvent(pub String);

impl Display for UnknownEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event: {}", self.0)
    }
}

impl std::error::Error for UnknownEvent {}

impl FromStr for FtpEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lowercase();
        Self::VALUES
            .into_iter()
            .find(|event| event.as_str() == name)
            .ok_or(UnknownEvent(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(FtpCommand::parse("stor"), FtpCommand::Stor);
        assert_eq!(FtpCommand::parse("Rnto"), FtpCommand::Rnto);
        assert_eq!(
            FtpCommand::parse("noop"),
            FtpCommand::Other("NOOP".to_string())
        );
    }

    #[test]
    fn test_before_table() {
        let table = [
            ("DELE", FtpEvent::BeforeDelete),
            ("STOR", FtpEvent::BeforeUpload),
            ("RETR", FtpEvent::BeforeDownload),
            ("RMD", FtpEvent::BeforeRemoveDir),
            ("MKD", FtpEvent::BeforeMakeDir),
            ("APPE", FtpEvent::BeforeAppend),
            ("STOU", FtpEvent::BeforeUploadUnique),
            ("RNTO", FtpEvent::BeforeRename),
            ("SITE", FtpEvent::Site),
        ];
        for (verb, event) in table {
            assert_eq!(FtpCommand::parse(verb).before_event(), Some(event), "{verb}");
        }
        assert_eq!(FtpCommand::Pass.before_event(), None);
        assert_eq!(FtpCommand::parse("LIST").before_event(), None);
    }

    #[test]
    fn test_after_table() {
        let table = [
            ("PASS", FtpEvent::Login),
            ("DELE", FtpEvent::Delete),
            ("STOR", FtpEvent::Upload),
            ("RETR", FtpEvent::Download),
            ("RMD", FtpEvent::RemoveDir),
            ("MKD", FtpEvent::MakeDir),
            ("APPE", FtpEvent::Append),
            ("STOU", FtpEvent::UploadUnique),
            ("RNTO", FtpEvent::Rename),
        ];
        for (verb, event) in table {
            assert_eq!(FtpCommand::parse(verb).after_event(), Some(event), "{verb}");
        }
        assert_eq!(FtpCommand::Site.after_event(), None);
        assert_eq!(FtpCommand::parse("RNFR").after_event(), None);
    }

    #[test]
    fn test_event_names_round_trip() {
        for event in FtpEvent::VALUES {
            assert_eq!(event.as_str().parse::<FtpEvent>(), Ok(event));
        }
        assert_eq!("BeforeUpload".parse::<FtpEvent>(), Ok(FtpEvent::BeforeUpload));
        assert!("connect".parse::<FtpEvent>().is_err());
    }
}
