mod common;

use common::*;
use flatfs::{
    copy_into_volume, copy_out_of_volume, delete_from_volume, disk::MEGABYTE, format_volume,
    list_files, occupied_blocks, volume_info, FileSystemError,
};

#[test]
fn one_megabyte_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    let host = tempfile::tempdir().unwrap();
    let data = pattern(2000);
    let source = write_host_file(host.path(), "a.txt", &data);

    let layout = format_volume(&volume, 1).unwrap();
    assert_eq!(std::fs::metadata(&volume).unwrap().len(), MEGABYTE);
    assert_eq!(volume_info(&volume).unwrap().num_blocks as u64, layout.num_blocks);

    let inode = copy_into_volume(&volume, &source).unwrap();
    assert_eq!(inode.name, "a.txt");
    assert_eq!(occupied_blocks(&volume).unwrap(), vec![0, 1]);
    assert_eq!(volume_info(&volume).unwrap().num_files, 1);

    let out = dir.path().join("a.out");
    assert_eq!(copy_out_of_volume(&volume, "a.txt", Some(&out)).unwrap(), 2000);
    assert_eq!(std::fs::read(&out).unwrap(), data);

    delete_from_volume(&volume, "a.txt").unwrap();
    let info = volume_info(&volume).unwrap();
    assert_eq!(info.num_files, 0);
    assert_eq!(info.used_blocks, 0);
    assert!(occupied_blocks(&volume).unwrap().is_empty());

    let missing = dir.path().join("missing.out");
    assert!(matches!(
        copy_out_of_volume(&volume, "a.txt", Some(&missing)),
        Err(FileSystemError::NotFound(_))
    ));
    assert!(!missing.exists());
}

#[test]
fn ingest_uses_final_path_component() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 1).unwrap();

    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    let source = write_host_file(&nested, ".config", b"hidden=1");

    copy_into_volume(&volume, &source).unwrap();
    assert!(list_files(&volume, false).unwrap().is_empty());

    let all = list_files(&volume, true).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, ".config");
    assert!(all[0].hidden);
    assert_eq!(all[0].size, 8);
    assert_eq!(all[0].first_block, Some(0));
}

#[test]
fn long_host_name_is_rejected_before_touching_volume() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 1).unwrap();
    let before = std::fs::read(&volume).unwrap();

    let source = write_host_file(dir.path(), &"x".repeat(64), b"data");
    assert!(matches!(
        copy_into_volume(&volume, &source),
        Err(FileSystemError::NameTooLong(_))
    ));
    assert_eq!(std::fs::read(&volume).unwrap(), before);
}

#[test]
fn deleting_unknown_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 1).unwrap();
    copy_into_volume(&volume, write_host_file(dir.path(), "b.bin", &pattern(4000))).unwrap();
    let before = std::fs::read(&volume).unwrap();

    let err = delete_from_volume(&volume, "nope").unwrap_err();
    assert!(matches!(err, FileSystemError::NotFound(_)));
    assert!(!err.is_fatal());
    assert_eq!(std::fs::read(&volume).unwrap(), before);
}

#[test]
fn opening_missing_volume_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = occupied_blocks(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, FileSystemError::Io(_)));
    assert!(err.is_fatal());
}

#[test]
fn missing_source_file_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 1).unwrap();
    let before = std::fs::read(&volume).unwrap();

    let source = dir.path().join("missing.txt");
    let err = copy_into_volume(&volume, &source).unwrap_err();
    assert!(matches!(&err, FileSystemError::HostIo { path, .. } if *path == source));
    assert!(!err.is_fatal());
    assert_eq!(std::fs::read(&volume).unwrap(), before);
}

#[test]
fn uncreatable_destination_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 1).unwrap();
    copy_into_volume(&volume, write_host_file(dir.path(), "a.txt", b"hello")).unwrap();

    let dest = dir.path().join("no/such/dir/out");
    let err = copy_out_of_volume(&volume, "a.txt", Some(&dest)).unwrap_err();
    assert!(matches!(&err, FileSystemError::HostIo { path, .. } if *path == dest));
    assert!(!err.is_fatal());
    assert!(!dest.exists());
}

#[test]
fn format_overwrites_existing_volume() {
    let dir = tempfile::tempdir().unwrap();
    let volume = dir.path().join("vd.bin");
    format_volume(&volume, 2).unwrap();
    copy_into_volume(&volume, write_host_file(dir.path(), "c", b"c")).unwrap();

    format_volume(&volume, 1).unwrap();
    assert_eq!(std::fs::metadata(&volume).unwrap().len(), MEGABYTE);
    let info = volume_info(&volume).unwrap();
    assert_eq!(info.disk_size_mb, 1);
    assert_eq!(info.num_files, 0);
    assert!(flatfs::check_volume(&volume).unwrap().is_clean());
}
