/// One parsed control line: upper-cased verb plus the untouched argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub argument: Option<String>,
}

impl Command {
    /// Splits `line` on the first run of whitespace. Only the line
    /// terminator is stripped from the argument.
    pub fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(['\r', '\n']).trim_start();
        match line.find(char::is_whitespace) {
            Some(split) => {
                let argument = line[split..].trim_start();
                Command {
                    verb: line[..split].to_ascii_uppercase(),
                    argument: (!argument.is_empty()).then(|| argument.to_string()),
                }
            }
            None => Command {
                verb: line.to_ascii_uppercase(),
                argument: None,
            },
        }
    }
}

#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    QUIT,
    PWD,
    CWD,
    CDUP,
    LIST,
    NLST,
    PASV,
    EPSV,
    PORT,
    EPRT,
    TYPE,
    MODE,
    STRU,
    NOOP,
    SYST,
    FEAT,
    HELP,
    STAT,
}

impl FtpCommand {
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "QUIT" => Some(FtpCommand::QUIT),
            "PWD" | "XPWD" => Some(FtpCommand::PWD),
            "CWD" | "XCWD" => Some(FtpCommand::CWD),
            "CDUP" | "XCUP" => Some(FtpCommand::CDUP),
            "LIST" => Some(FtpCommand::LIST),
            "NLST" => Some(FtpCommand::NLST),
            "PASV" => Some(FtpCommand::PASV),
            "EPSV" => Some(FtpCommand::EPSV),
            "PORT" => Some(FtpCommand::PORT),
            "EPRT" => Some(FtpCommand::EPRT),
            "TYPE" => Some(FtpCommand::TYPE),
            "MODE" => Some(FtpCommand::MODE),
            "STRU" => Some(FtpCommand::STRU),
            "NOOP" => Some(FtpCommand::NOOP),
            "SYST" => Some(FtpCommand::SYST),
            "FEAT" => Some(FtpCommand::FEAT),
            "HELP" => Some(FtpCommand::HELP),
            "STAT" => Some(FtpCommand::STAT),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FtpCommand::USER => "USER",
            FtpCommand::PASS => "PASS",
            FtpCommand::QUIT => "QUIT",
            FtpCommand::PWD => "PWD",
            FtpCommand::CWD => "CWD",
            FtpCommand::CDUP => "CDUP",
            FtpCommand::LIST => "LIST",
            FtpCommand::NLST => "NLST",
            FtpCommand::PASV => "PASV",
            FtpCommand::EPSV => "EPSV",
            FtpCommand::PORT => "PORT",
            FtpCommand::EPRT => "EPRT",
            FtpCommand::TYPE => "TYPE",
            FtpCommand::MODE => "MODE",
            FtpCommand::STRU => "STRU",
            FtpCommand::NOOP => "NOOP",
            FtpCommand::SYST => "SYST",
            FtpCommand::FEAT => "FEAT",
            FtpCommand::HELP => "HELP",
            FtpCommand::STAT => "STAT",
        }
    }

    /// USER, PASS and QUIT are the only commands allowed before login.
    pub fn requires_login(self) -> bool {
        !matches!(self, FtpCommand::USER | FtpCommand::PASS | FtpCommand::QUIT)
    }

    pub fn all() -> &'static [FtpCommand] {
        &[
            FtpCommand::USER,
            FtpCommand::PASS,
            FtpCommand::QUIT,
            FtpCommand::PWD,
            FtpCommand::CWD,
            FtpCommand::CDUP,
            FtpCommand::LIST,
            FtpCommand::NLST,
            FtpCommand::PASV,
            FtpCommand::EPSV,
            FtpCommand::PORT,
            FtpCommand::EPRT,
            FtpCommand::TYPE,
            FtpCommand::MODE,
            FtpCommand::STRU,
            FtpCommand::NOOP,
            FtpCommand::SYST,
            FtpCommand::FEAT,
            FtpCommand::HELP,
            FtpCommand::STAT,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verb_and_argument() {
        let cmd = Command::parse("USER jt\r\n");
        assert_eq!(cmd.verb, "USER");
        assert_eq!(cmd.argument.as_deref(), Some("jt"));
    }

    #[test]
    fn test_verb_is_case_insensitive_argument_is_not() {
        let cmd = Command::parse("cwd /Pub/Docs\r\n");
        assert_eq!(cmd.verb, "CWD");
        assert_eq!(cmd.argument.as_deref(), Some("/Pub/Docs"));
    }

    #[test]
    fn test_argument_keeps_inner_and_trailing_spaces() {
        let cmd = Command::parse("CWD   my  dir \r\n");
        assert_eq!(cmd.verb, "CWD");
        assert_eq!(cmd.argument.as_deref(), Some("my  dir "));
    }

    #[test]
    fn test_no_argument() {
        let cmd = Command::parse("PWD\r\n");
        assert_eq!(cmd.verb, "PWD");
        assert_eq!(cmd.argument, None);

        let cmd = Command::parse("NOOP   \n");
        assert_eq!(cmd.verb, "NOOP");
        assert_eq!(cmd.argument, None);
    }

    #[test]
    fn test_blank_line_has_empty_verb() {
        assert_eq!(Command::parse("\r\n").verb, "");
        assert_eq!(Command::parse("   \r\n").verb, "");
    }

    #[test]
    fn test_lookup_and_aliases() {
        assert_eq!(FtpCommand::from_str("pwd"), Some(FtpCommand::PWD));
        assert_eq!(FtpCommand::from_str("XPWD"), Some(FtpCommand::PWD));
        assert_eq!(FtpCommand::from_str("XCUP"), Some(FtpCommand::CDUP));
        assert_eq!(FtpCommand::from_str("RETR"), None);
        assert_eq!(FtpCommand::from_str(""), None);
        for cmd in FtpCommand::all() {
            assert_eq!(FtpCommand::from_str(cmd.as_str()), Some(*cmd));
        }
    }

    #[test]
    fn test_login_gate() {
        assert!(!FtpCommand::USER.requires_login());
        assert!(!FtpCommand::PASS.requires_login());
        assert!(!FtpCommand::QUIT.requires_login());
        for cmd in FtpCommand::all() {
            if !matches!(cmd, FtpCommand::USER | FtpCommand::PASS | FtpCommand::QUIT) {
                assert!(cmd.requires_login(), "{:?} should require login", cmd);
            }
        }
    }
}
