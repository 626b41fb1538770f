pub mod credentials;
pub mod logs;
pub mod scan;
pub mod token;
pub mod visitors;
