// The parser, the reply encoder and the command table
pub mod ftpcommand;
pub mod handlers;
pub mod reply;

// Here's the list of the FTP commands implemented
pub mod cdup;
pub mod cwd;
pub mod feat;
pub mod help;
pub mod list;
pub mod noop;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod stat;
pub mod syst;
pub mod type_;
pub mod user;
