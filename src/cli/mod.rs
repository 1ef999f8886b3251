pub mod command;
pub mod decode;
pub mod encode;
pub mod info;
pub mod scan;
