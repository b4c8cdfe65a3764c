//! 在单个宿主文件里模拟的扁平命名空间文件系统。
//!
//! 镜像布局：头部、块位图、inode 位图、inode 表，然后是按链表串起来的数据块。

pub mod disk;
pub mod fs;
mod utils;

pub use disk::{BlockDevice, FileDisk};
pub use fs::{
    check_volume, copy_into_volume, copy_out_of_volume, delete_from_volume,
    directory::DirEntry,
    error::{FileSystemError, Result},
    format_volume, fsck::CheckReport,
    inode_table::Inode,
    list_files, occupied_blocks,
    super_block::Layout,
    volume_info, FileSystem, VolumeInfo,
};
