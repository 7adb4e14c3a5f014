pub mod init;
pub mod upload;
