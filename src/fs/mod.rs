use std::{
    ffi::OsStr,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::{debug, info, warn};

use crate::{
    disk::{
        perform_disk_initialization, Block, BlockDevice, FileDisk, FormatProgress, BLOCK_SIZE,
        PAYLOAD_SIZE,
    },
    fs::{
        allocator::allocate,
        config::MAX_FILES,
        data_area::{DataArea, DataBlock},
        data_block_bitmap::DataBlockBitmap,
        directory::{DirEntry, Directory},
        error::{FileSystemError, Result},
        inode_bitmap::InodeBitmap,
        inode_table::{blocks_for_size, validate_name, Inode, InodeSlot, InodeTable},
        super_block::{Layout, SuperBlock},
    },
    utils::format_volume_id,
};

pub mod allocator;
pub mod config;
pub mod data_area;
pub mod data_block_bitmap;
pub mod directory;
pub mod error;
pub mod fsck;
pub mod inode_bitmap;
pub mod inode_table;
pub mod super_block;

/// 清零数据区时每写这么多块报告一次进度
const ZERO_FILL_REPORT_INTERVAL: u64 = 64;

/// 磁盘记录的序列化方式：定长整数，主机字节序
pub(crate) fn codec() -> impl bincode::Options {
    use bincode::Options;

    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_native_endian()
        .allow_trailing_bytes()
}

/// 卷的汇总信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub volume_id: String,
    pub created_at: u64,
    pub disk_size_mb: u32,
    pub block_size: u16,
    pub num_blocks: u32,
    pub used_blocks: u64,
    pub free_blocks: u64,
    pub data_offset: u64,
    pub num_files: u16,
    pub max_files: u16,
    pub free_inodes: u64,
}

/// 挂载在某个设备上的文件系统。
///
/// 只常驻头部；位图和 inode 表每次操作时重新读入，改完后整体写回。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    pub disk: D,                  // 底层磁盘抽象层
    pub super_block: SuperBlock,  // 文件系统总体信息
    pub layout: Layout,           // 各区域偏移
    pub data_area: DataArea,      // 数据块读写
}

fn reject(e: FileSystemError) -> FileSystemError {
    warn!("{}", e);
    e
}

// 尽量读满 buf，遇到 EOF 提前返回
fn read_chunk(source: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<D: BlockDevice> FileSystem<D> {
    fn from_parts(disk: D, super_block: SuperBlock) -> Self {
        let layout = Layout::from_header(&super_block);
        let data_area = DataArea::new(layout.data_offset, layout.num_blocks);
        Self {
            disk,
            super_block,
            layout,
            data_area,
        }
    }

    /// 在设备上写入一个空文件系统，写完后设备长度正好是磁盘大小
    pub fn format(
        disk: D,
        layout: Layout,
        mut progress: impl FnMut(FormatProgress),
    ) -> Result<Self> {
        let super_block = SuperBlock::new(&layout);

        progress(FormatProgress::Step("⚙️  Writing metadata..."));
        super_block.sync(&disk)?;
        DataBlockBitmap::new(layout.num_blocks, layout.block_bitmap_offset).sync(&disk)?;
        InodeBitmap::new(MAX_FILES, layout.inode_bitmap_offset).sync(&disk)?;
        InodeTable::new(layout.inode_table_offset).sync(&disk)?;

        progress(FormatProgress::Step("🪶 Zero-filling data region..."));
        let zero: Block = [0; BLOCK_SIZE];
        let total = layout.num_blocks;
        for i in 0..total {
            disk.write_at(layout.data_offset + i * BLOCK_SIZE as u64, &zero)?;
            if (i + 1) % ZERO_FILL_REPORT_INTERVAL == 0 || i + 1 == total {
                progress(FormatProgress::Zeroing {
                    written: i + 1,
                    total,
                });
            }
        }

        // 数据区之后不足一块的尾部也补 0
        let end = layout.data_offset + total * BLOCK_SIZE as u64;
        if layout.disk_size_bytes > end {
            disk.write_at(end, &vec![0u8; (layout.disk_size_bytes - end) as usize])?;
        }

        Ok(Self::from_parts(disk, super_block))
    }

    /// 读取并校验头部
    pub fn mount(disk: D) -> Result<Self> {
        let super_block = SuperBlock::load(&disk)?;
        debug!(
            "mounted volume {} with {} blocks, {} files",
            format_volume_id(&super_block.volume_id),
            super_block.num_blocks,
            super_block.num_files
        );
        Ok(Self::from_parts(disk, super_block))
    }

    pub fn load_block_bitmap(&self) -> Result<DataBlockBitmap> {
        DataBlockBitmap::load(
            &self.disk,
            self.layout.block_bitmap_offset,
            self.layout.num_blocks,
        )
    }

    pub fn load_inode_bitmap(&self) -> Result<InodeBitmap> {
        InodeBitmap::load(&self.disk, self.layout.inode_bitmap_offset, MAX_FILES)
    }

    pub fn load_inode_table(&self) -> Result<InodeTable> {
        InodeTable::load(&self.disk, self.layout.inode_table_offset)
    }

    /// 把 `size` 字节的内容写入卷，成为名为 `name` 的文件。
    ///
    /// 所有前置检查都在写入之前完成，失败时卷保持不变。
    /// 不检查重名：同名文件会占用新的 inode 和数据块。
    pub fn create_file(&mut self, name: &str, size: u64, source: &mut impl Read) -> Result<Inode> {
        validate_name(name).map_err(reject)?;
        let size = u32::try_from(size).map_err(|_| reject(FileSystemError::FileTooLarge(size)))?;
        if self.super_block.is_directory_full() {
            return Err(reject(FileSystemError::DirectoryFull));
        }

        let mut block_bitmap = self.load_block_bitmap()?;
        let mut inode_bitmap = self.load_inode_bitmap()?;

        let blocks_needed = blocks_for_size(size as u64) as usize;
        let allocation = allocate(&inode_bitmap, &block_bitmap, blocks_needed)
            .map_err(|e| reject(e.into()))?;
        let inode = Inode::new(name, size, allocation.blocks.first().copied())?;

        let mut buf = [0u8; PAYLOAD_SIZE];
        let mut remaining = size as usize;
        for (i, &index) in allocation.blocks.iter().enumerate() {
            let want = remaining.min(PAYLOAD_SIZE);
            let got = read_chunk(source, &mut buf[..want])?;
            let next = allocation.blocks.get(i + 1).copied();

            block_bitmap.set(index);
            self.data_area
                .write_block(&self.disk, index, &DataBlock::new(&buf[..got], next))?;
            remaining -= want;
        }
        debug!("'{}' written to blocks {:?}", name, allocation.blocks);

        inode_bitmap.set(allocation.inode_index);
        block_bitmap.sync(&self.disk)?;
        inode_bitmap.sync(&self.disk)?;
        InodeTable::write_slot(
            &self.disk,
            self.layout.inode_table_offset,
            allocation.inode_index,
            &InodeSlot::Occupied(inode.clone()),
        )?;
        self.super_block.num_files += 1;
        self.super_block.sync(&self.disk)?;

        info!(
            "copied '{}' ({} bytes, {} blocks) into inode {}",
            name, size, blocks_needed, allocation.inode_index
        );
        Ok(inode)
    }

    /// 按名字查找文件，同名时取编号最小的 inode
    pub fn find_file(&self, name: &str) -> Result<(usize, Inode)> {
        let inode_bitmap = self.load_inode_bitmap()?;
        let table = self.load_inode_table()?;

        table
            .find(&inode_bitmap, name)
            .and_then(|i| table.get_inode(i).map(|inode| (i, inode.clone())))
            .ok_or_else(|| reject(FileSystemError::NotFound(name.to_string())))
    }

    /// 沿链表把文件内容写到 `sink`，返回写出的字节数。
    ///
    /// 链在读满 `size` 字节之前就结束时返回 `Corrupted`，已经写进 `sink` 的部分保留不动。
    pub fn read_file(&self, inode: &Inode, sink: &mut impl Write) -> Result<u64> {
        let mut remaining = inode.size as u64;
        let mut current = inode.head();
        let mut steps = 0u64;

        while remaining > 0 {
            let Some(index) = current else { break };
            if steps >= self.layout.num_blocks {
                return Err(FileSystemError::Corrupted(format!(
                    "block chain of '{}' does not terminate",
                    inode.name
                )));
            }
            steps += 1;

            let block = self.data_area.read_block(&self.disk, index)?;
            let n = remaining.min(PAYLOAD_SIZE as u64) as usize;
            sink.write_all(&block.payload[..n])?;
            remaining -= n as u64;
            current = block.next;
        }

        if remaining > 0 {
            return Err(FileSystemError::Corrupted(format!(
                "block chain of '{}' ends {} bytes short",
                inode.name, remaining
            )));
        }
        Ok(inode.size as u64)
    }

    /// 把卷上的文件复制到宿主文件 `dest`；找不到文件时不会创建 `dest`
    pub fn copy_out(&self, name: &str, dest: &Path) -> Result<u64> {
        let (_, inode) = self.find_file(name)?;

        let file = File::create(dest).map_err(|e| reject(FileSystemError::host(dest)(e)))?;
        let mut writer = BufWriter::new(file);
        let written = self.read_file(&inode, &mut writer)?;
        writer.flush().map_err(FileSystemError::host(dest))?;

        info!("copied '{}' ({} bytes) to {}", name, written, dest.display());
        Ok(written)
    }

    /// 读出整个文件
    pub fn read_to_vec(&self, name: &str) -> Result<Vec<u8>> {
        let (_, inode) = self.find_file(name)?;
        let mut data = Vec::with_capacity(inode.size as usize);
        self.read_file(&inode, &mut data)?;
        Ok(data)
    }

    /// 删除文件：释放链上所有块和 inode，数据块内容不清零
    pub fn remove_file(&mut self, name: &str) -> Result<Inode> {
        let mut block_bitmap = self.load_block_bitmap()?;
        let mut inode_bitmap = self.load_inode_bitmap()?;
        let mut table = self.load_inode_table()?;

        let (index, inode) = table
            .find(&inode_bitmap, name)
            .and_then(|i| table.get_inode(i).map(|inode| (i, inode.clone())))
            .ok_or_else(|| reject(FileSystemError::NotFound(name.to_string())))?;

        // 先走完整条链，链损坏时什么都不写
        let chain = self
            .data_area
            .chain(&self.disk, inode.head())
            .collect::<Result<Vec<u32>>>()?;
        for &block in &chain {
            block_bitmap.free(block);
        }
        debug!("'{}' released blocks {:?}", name, chain);

        inode_bitmap.free(index);
        table.set_slot(index, InodeSlot::Empty);
        self.super_block.num_files = self.super_block.num_files.saturating_sub(1);

        self.super_block.sync(&self.disk)?;
        block_bitmap.sync(&self.disk)?;
        inode_bitmap.sync(&self.disk)?;
        table.sync(&self.disk)?;

        info!("removed '{}' from inode {} ({} blocks)", name, index, chain.len());
        Ok(inode)
    }

    /// 所有已占用数据块的编号，升序
    pub fn occupied_blocks(&self) -> Result<Vec<u32>> {
        Ok(self.load_block_bitmap()?.used_indices().collect())
    }

    pub fn list_dir(&self, show_hidden: bool) -> Result<Vec<DirEntry>> {
        let inode_bitmap = self.load_inode_bitmap()?;
        let table = self.load_inode_table()?;
        Ok(Directory::from_table(&table, &inode_bitmap).list(show_hidden))
    }

    pub fn info(&self) -> Result<VolumeInfo> {
        let block_bitmap = self.load_block_bitmap()?;
        let inode_bitmap = self.load_inode_bitmap()?;
        let sb = &self.super_block;

        Ok(VolumeInfo {
            volume_id: format_volume_id(&sb.volume_id),
            created_at: sb.created_at,
            disk_size_mb: sb.disk_size_mb,
            block_size: sb.block_size,
            num_blocks: sb.num_blocks,
            used_blocks: block_bitmap.total_blocks() - block_bitmap.free_blocks,
            free_blocks: block_bitmap.free_blocks,
            data_offset: sb.data_offset,
            num_files: sb.num_files,
            max_files: sb.max_files,
            free_inodes: inode_bitmap.free_inodes,
        })
    }
}

// 以下是按路径操作卷的入口，每次调用都重新打开镜像，返回前关闭

/// 创建一个 `disk_size_mb` MB 的新卷，已有文件会被覆盖
pub fn format_volume(volume: impl AsRef<Path>, disk_size_mb: u32) -> Result<Layout> {
    perform_disk_initialization(volume, disk_size_mb, None)
}

/// 卷上使用的文件名：宿主路径的最后一段
pub fn host_file_name(host_file: &Path) -> Result<String> {
    let name = host_file
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| FileSystemError::InvalidName(host_file.display().to_string()))?;
    validate_name(name)?;
    Ok(name.to_string())
}

/// 把宿主文件复制进卷
pub fn copy_into_volume(volume: impl AsRef<Path>, host_file: impl AsRef<Path>) -> Result<Inode> {
    let host_file = host_file.as_ref();
    let name = host_file_name(host_file).map_err(reject)?;

    let mut fs = FileSystem::mount(FileDisk::open(volume)?)?;
    let source = File::open(host_file).map_err(|e| reject(FileSystemError::host(host_file)(e)))?;
    let size = source
        .metadata()
        .map_err(FileSystemError::host(host_file))?
        .len();
    fs.create_file(&name, size, &mut BufReader::new(source))
}

/// 把卷上的文件复制出来，`dest` 缺省时写到当前目录下的同名文件
pub fn copy_out_of_volume(
    volume: impl AsRef<Path>,
    name: &str,
    dest: Option<&Path>,
) -> Result<u64> {
    let fs = FileSystem::mount(FileDisk::open_read_only(volume)?)?;
    fs.copy_out(name, dest.unwrap_or_else(|| Path::new(name)))
}

pub fn delete_from_volume(volume: impl AsRef<Path>, name: &str) -> Result<Inode> {
    let mut fs = FileSystem::mount(FileDisk::open(volume)?)?;
    fs.remove_file(name)
}

pub fn occupied_blocks(volume: impl AsRef<Path>) -> Result<Vec<u32>> {
    FileSystem::mount(FileDisk::open_read_only(volume)?)?.occupied_blocks()
}

pub fn list_files(volume: impl AsRef<Path>, show_hidden: bool) -> Result<Vec<DirEntry>> {
    FileSystem::mount(FileDisk::open_read_only(volume)?)?.list_dir(show_hidden)
}

pub fn volume_info(volume: impl AsRef<Path>) -> Result<VolumeInfo> {
    FileSystem::mount(FileDisk::open_read_only(volume)?)?.info()
}

pub fn check_volume(volume: impl AsRef<Path>) -> Result<fsck::CheckReport> {
    FileSystem::mount(FileDisk::open_read_only(volume)?)?.check()
}
