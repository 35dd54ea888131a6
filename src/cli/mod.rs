pub mod example;
pub mod init;
pub mod query;
pub mod scan;
pub mod serve;
