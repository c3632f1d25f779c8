//! # Memory-Mapped Block Storage
//!
//! This module implements `BlockStorage`, the low-level building block for
//! RowDB file access. It maps the whole backing file and hands out
//! bounds-checked byte slices addressed by file offset.
//!
//! ## Design Philosophy
//!
//! Slot addresses in RowDB are byte offsets, recorded on disk as 64-bit
//! integers. Rather than copy slots through an intermediate buffer, the
//! file is mapped once and every read or write is a slice of the mapping.
//! The OS page cache does the caching; RowDB keeps no cache of its own.
//!
//! ## Safety Considerations
//!
//! A mapped region becomes invalid when the file is grown and remapped.
//! The typical solutions involve runtime overhead (guards, epochs,
//! reference counting). `BlockStorage` instead leverages the borrow
//! checker:
//!
//! ```text
//! slice(&self, ...) -> &[u8]          // Immutable borrow of self
//! slice_mut(&mut self, ...) -> &mut [u8]
//! append(&mut self, ...)              // Mutable borrow (exclusive)
//! ```
//!
//! Since `append` requires `&mut self`, the compiler ensures no slice
//! reference exists when the file is remapped. Zero runtime cost.
//!
//! ## Growth
//!
//! `append` extends the file by exactly one slot worth of bytes and
//! returns the former end of file, which becomes the new slot's address.
//! Files therefore grow in slot-size steps: `header + k * slot_size` at
//! all times.
//!
//! ## Scalar Access
//!
//! The free list and the header mirrors read and write single big-endian
//! integers at known offsets; `get_i64`/`put_i64` and the 32-bit variants
//! cover those without the caller slicing by hand.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

#[derive(Debug)]
pub struct BlockStorage {
    file: File,
    mmap: MmapMut,
}

impl BlockStorage {
    /// Creates a fresh backing file of `initial_len` bytes, deleting any
    /// existing file at the path first. The caller writes the header into
    /// the zeroed prefix afterwards.
    pub fn create<P: AsRef<Path>>(path: P, initial_len: u64) -> Result<Self> {
        let path = path.as_ref();

        ensure!(initial_len > 0, "initial file length must be at least 1");

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("failed to delete existing file '{}'", path.display()))
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create file '{}'", path.display()))?;

        file.set_len(initial_len)
            .wrap_err_with(|| format!("failed to set file size to {} bytes", initial_len))?;

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files can
        // be modified externally, leading to undefined behavior. This is safe
        // because:
        // 1. We just created this file with exclusive access (truncate=true)
        // 2. RowDB files are not meant to be modified by external processes
        // 3. The mmap lifetime is tied to BlockStorage, preventing use-after-unmap
        // 4. All access goes through slice()/slice_mut() which bounds-check offsets
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self { file, mmap })
    }

    /// Opens and maps an existing backing file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?;

        ensure!(
            metadata.len() > 0,
            "cannot open empty file '{}'",
            path.display()
        );

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files can
        // be modified externally. This is safe because:
        // 1. The file is opened with exclusive write access (read+write mode)
        // 2. RowDB files are not meant to be modified by external processes
        // 3. The mmap lifetime is tied to BlockStorage, preventing use-after-unmap
        // 4. All access goes through slice()/slice_mut() which bounds-check offsets
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self { file, mmap })
    }

    pub fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let end = (offset as usize).checked_add(len);
        ensure!(
            end.is_some_and(|end| end <= self.mmap.len()),
            "slice [{}, +{}) out of bounds (file length {})",
            offset,
            len,
            self.mmap.len()
        );

        Ok(&self.mmap[offset as usize..offset as usize + len])
    }

    pub fn slice_mut(&mut self, offset: u64, len: usize) -> Result<&mut [u8]> {
        let end = (offset as usize).checked_add(len);
        ensure!(
            end.is_some_and(|end| end <= self.mmap.len()),
            "slice [{}, +{}) out of bounds (file length {})",
            offset,
            len,
            self.mmap.len()
        );

        Ok(&mut self.mmap[offset as usize..offset as usize + len])
    }

    /// Extends the file by `len` bytes and returns the former end of file,
    /// the address of the newly appended slot.
    pub fn append(&mut self, len: usize) -> Result<u64> {
        let old_len = self.mmap.len() as u64;
        let new_len = old_len + len as u64;

        self.mmap
            .flush_async()
            .wrap_err("failed to flush mmap before growing")?;

        self.file
            .set_len(new_len)
            .wrap_err_with(|| format!("failed to extend file to {} bytes", new_len))?;

        // SAFETY: MmapMut::map_mut is unsafe because the old mmap becomes
        // invalid. This is safe because:
        // 1. append() requires &mut self, so no slice references can exist
        // 2. We flushed the old mmap above, ensuring data is written to disk
        // 3. The file was extended to new_len before remapping
        // 4. The old mmap is dropped when we assign the new one
        self.mmap =
            unsafe { MmapMut::map_mut(&self.file).wrap_err("failed to remap file after grow")? };

        Ok(old_len)
    }

    pub fn get_i64(&self, offset: u64) -> Result<i64> {
        let bytes = self.slice(offset, 8)?;
        Ok(i64::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn put_i64(&mut self, offset: u64, val: i64) -> Result<()> {
        self.slice_mut(offset, 8)?.copy_from_slice(&val.to_be_bytes());
        Ok(())
    }

    pub fn get_i32(&self, offset: u64) -> Result<i32> {
        let bytes = self.slice(offset, 4)?;
        Ok(i32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn put_i32(&mut self, offset: u64, val: i32) -> Result<()> {
        self.slice_mut(offset, 4)?.copy_from_slice(&val.to_be_bytes());
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn sync(&self) -> Result<()> {
        self.mmap.flush().wrap_err("failed to sync mmap to disk")
    }

    /// Hints the kernel that the given region will be read soon. Used ahead
    /// of sibling-chain walks during range scans.
    #[cfg(unix)]
    pub fn advise_willneed(&self, offset: u64, len: usize) {
        if offset as usize >= self.mmap.len() {
            return;
        }

        let start = offset as usize;
        let len = len.min(self.mmap.len() - start);

        // SAFETY: madvise with MADV_WILLNEED is a hint to the kernel and
        // does not cause undefined behavior even if ignored. This is safe
        // because:
        // 1. start was bounds-checked above (start >= len returns early)
        // 2. len is clamped so start + len never exceeds the mmap bounds
        // 3. The mmap is valid for the entire file size
        unsafe {
            libc::madvise(
                self.mmap.as_ptr().add(start) as *mut libc::c_void,
                len,
                libc::MADV_WILLNEED,
            );
        }
    }

    #[cfg(not(unix))]
    pub fn advise_willneed(&self, _offset: u64, _len: usize) {}
}
