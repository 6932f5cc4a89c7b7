pub mod batch_verify;
pub mod verify;
