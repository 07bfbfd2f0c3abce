//! The cache over a real file.

mod common;

use common::pattern;
use pagebuf_cache::{PageBuffer, SharedPageBuffer};
use pagebuf_common::CacheConfig;
use pagebuf_store::{FileStore, OpenOptions, PageStore};
use tempfile::tempdir;

#[test]
fn test_persist_and_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.dat");
    let data = pattern(30_000, 5);

    {
        let store = FileStore::create(&path).unwrap();
        let mut cache = PageBuffer::open(store, CacheConfig::new(4096, 4)).unwrap();
        cache.write(1000, &data).unwrap();
        cache.set_eoa(31_000).unwrap();
        cache.close().unwrap();
    }

    let store = FileStore::open(&path, OpenOptions::for_read()).unwrap();
    let mut cache = PageBuffer::open(store, CacheConfig::new(4096, 2)).unwrap();
    let mut buf = vec![0u8; data.len()];
    cache.read(1000, &mut buf).unwrap();
    assert_eq!(buf, data);

    // Reads past the end of the file come back as zeros.
    let mut tail = vec![0xFFu8; 5000];
    cache.read(40_000, &mut tail).unwrap();
    assert!(tail.iter().all(|&b| b == 0));

    assert!(cache.get_eof().unwrap() >= 31_000);
    cache.close().unwrap();
}

#[test]
fn test_only_aligned_io_reaches_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("aligned.dat");
    let ps = pagebuf_common::PageSize::new(1024).unwrap();

    let store = FileStore::create(&path).unwrap().with_alignment(ps);
    let mut cache = PageBuffer::open(store, CacheConfig::new(1024, 3)).unwrap();
    for i in 0..50u64 {
        cache.write(i * 333, &pattern(500, i as u8)).unwrap();
    }
    cache.close().unwrap();

    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len % 1024, 0);
}

#[test]
fn test_config_from_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("cache.toml");
    std::fs::write(
        &config_path,
        "page_size = 2048\nmax_num_pages = 3\nreplacement_policy = \"lru\"\n",
    )
    .unwrap();

    let config = CacheConfig::from_file(&config_path).unwrap();
    let store = FileStore::create(dir.path().join("data.dat")).unwrap();
    let mut cache = PageBuffer::open(store, config).unwrap();
    assert_eq!(cache.page_size().bytes(), 2048);
    assert_eq!(cache.capacity(), 3);

    cache.write(0, b"configured").unwrap();
    cache.close().unwrap();
}

#[test]
fn test_shared_cache_over_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.dat");

    let cache =
        SharedPageBuffer::open(FileStore::create(&path).unwrap(), CacheConfig::new(4096, 8)).unwrap();
    let writers: Vec<_> = (0..4u8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                cache.write(u64::from(t) * 10_000, &[t + 1; 10_000]).unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    cache.close().unwrap();

    let mut store = FileStore::open(&path, OpenOptions::for_read()).unwrap();
    let mut buf = vec![0u8; 40_960];
    store.read(0, &mut buf).unwrap();
    for t in 0..4usize {
        assert!(buf[t * 10_000..(t + 1) * 10_000].iter().all(|&b| b == t as u8 + 1));
    }
}
