pub mod block_device;
pub mod file_disk;
pub mod init;
pub mod types;

pub use block_device::BlockDevice;
pub use file_disk::FileDisk;
pub use init::{perform_disk_initialization, FormatProgress};
pub use types::{Block, BLOCK_SIZE, END_OF_CHAIN, MEGABYTE, PAYLOAD_SIZE, POINTER_SIZE};
