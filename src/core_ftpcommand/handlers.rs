use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::reply::SharedWriter;
use crate::server::ServerState;
use crate::session::Session;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

// PASV/EPSV and PORT/EPRT live with the data connection code
use crate::core_network::pasv;
use crate::core_network::port;

use crate::core_ftpcommand::{
    cdup, cwd, feat, help, list, noop, pass, pwd, quit, stat, syst, type_, user,
};

pub type CommandFuture = Pin<Box<dyn Future<Output = Result<(), std::io::Error>> + Send>>;

pub type CommandHandler = Box<
    dyn Fn(
            SharedWriter,
            Arc<ServerState>,
            Arc<TokioMutex<Session>>,
            String, // Argument, empty when none was given
        ) -> CommandFuture
        + Send
        + Sync,
>;

pub type CommandHandlers = HashMap<FtpCommand, Arc<CommandHandler>>;

macro_rules! handler {
    ($path:path) => {
        Arc::new(Box::new(
            |writer: SharedWriter,
             state: Arc<ServerState>,
             session: Arc<TokioMutex<Session>>,
             arg: String| {
                Box::pin($path(writer, state, session, arg)) as CommandFuture
            },
        ) as CommandHandler)
    };
}

pub fn initialize_command_handlers() -> CommandHandlers {
    let mut handlers: CommandHandlers = HashMap::new();

    handlers.insert(FtpCommand::USER, handler!(user::handle_user_command));
    handlers.insert(FtpCommand::PASS, handler!(pass::handle_pass_command));
    handlers.insert(FtpCommand::QUIT, handler!(quit::handle_quit_command));

    handlers.insert(FtpCommand::PWD, handler!(pwd::handle_pwd_command));
    handlers.insert(FtpCommand::CWD, handler!(cwd::handle_cwd_command));
    handlers.insert(FtpCommand::CDUP, handler!(cdup::handle_cdup_command));
    handlers.insert(FtpCommand::LIST, handler!(list::handle_list_command));
    handlers.insert(FtpCommand::NLST, handler!(list::handle_nlst_command));
    handlers.insert(FtpCommand::STAT, handler!(stat::handle_stat_command));

    handlers.insert(FtpCommand::PASV, handler!(pasv::handle_pasv_command));
    handlers.insert(FtpCommand::EPSV, handler!(pasv::handle_epsv_command));
    handlers.insert(FtpCommand::PORT, handler!(port::handle_port_command));
    handlers.insert(FtpCommand::EPRT, handler!(port::handle_eprt_command));

    handlers.insert(FtpCommand::TYPE, handler!(type_::handle_type_command));
    handlers.insert(FtpCommand::MODE, handler!(type_::handle_mode_command));
    handlers.insert(FtpCommand::STRU, handler!(type_::handle_stru_command));

    handlers.insert(FtpCommand::NOOP, handler!(noop::handle_noop_command));
    handlers.insert(FtpCommand::SYST, handler!(syst::handle_syst_command));
    handlers.insert(FtpCommand::FEAT, handler!(feat::handle_feat_command));
    handlers.insert(FtpCommand::HELP, handler!(help::handle_help_command));

    handlers
}
