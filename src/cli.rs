pub mod command;
pub mod convert;
pub mod process;
pub mod verify;
