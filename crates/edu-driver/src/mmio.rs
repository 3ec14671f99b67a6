//! Memory-mapped register BAR
//!
//! Maps a PCI resource file (normally `/sys/bus/pci/devices/{addr}/resource0`)
//! into the process with `rustix` and exposes it as a [`RegisterFile`].
//!
//! The mapping is an injected resource: whoever opens it owns it and must keep
//! it alive for as long as a controller uses it. The controller never maps or
//! unmaps anything itself.

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]

use crate::error::{EduError, Result};
use crate::regfile::{check_access, RegisterFile};
use edu_chip::{bar, pcie};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

/// Mapped register region
///
/// Bounds-checked volatile access to device registers. Unsafe operations are
/// confined to this type.
#[derive(Debug)]
pub struct MappedRegion {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
    path: PathBuf,
}

impl MappedRegion {
    /// Map BAR0 of the edu device at a PCI address (e.g. `0000:00:04.0`)
    ///
    /// Verifies the sysfs vendor/device IDs before mapping.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The device directory does not exist
    /// - The function is not an edu device
    /// - The resource file cannot be opened or mapped
    pub fn for_device(pcie_address: &str) -> Result<Self> {
        let dir = PathBuf::from(format!("/sys/bus/pci/devices/{pcie_address}"));
        if !dir.exists() {
            return Err(EduError::device_not_found(dir));
        }

        let vendor = read_sysfs_id(&dir.join("vendor"))?;
        let device = read_sysfs_id(&dir.join("device"))?;
        if !pcie::is_edu(vendor, device) {
            return Err(EduError::UnexpectedDevice { vendor, device });
        }

        Self::open(dir.join(format!("resource{}", bar::bar0::INDEX)))
    }

    /// Map an arbitrary resource file in full
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file does not exist or cannot be opened read/write
    /// - The file is too small to hold the register file
    /// - mmap fails
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EduError::device_not_found(path));
        }

        tracing::debug!("Mapping register BAR: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| EduError::map_failed(format!("Cannot open {}: {e}", path.display())))?;

        // BAR sizes fit in usize on every supported target
        let size = file.metadata()?.len() as usize;

        if !bar::covers_registers(size) {
            return Err(EduError::map_failed(format!(
                "{} is {size} bytes, too small for the register file",
                path.display()
            )));
        }

        // SAFETY: mmap preconditions hold:
        // - file is open read/write and stays open for the mapping's lifetime
        //   (stored in the struct)
        // - size is non-zero and equals the file length
        // - offset 0, MAP_SHARED so stores reach the device (or backing file)
        // - the result is unmapped exactly once, in Drop
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
        }
        .map_err(|e| EduError::map_failed(format!("mmap failed: {e}")))?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| EduError::map_failed("mmap returned a null pointer"))?;

        tracing::info!("Mapped {} ({size:#x} bytes at {ptr:p})", path.display());

        Ok(Self {
            ptr,
            size,
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Get region size
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Get the resource file backing this mapping
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegisterFile for MappedRegion {
    fn read32(&self, offset: usize) -> u32 {
        check_access(offset, 4, self.size);
        // SAFETY: read_volatile necessary for MMIO - hardware can change value.
        // Invariants: ptr from mmap valid for self.size; offset+4 <= size;
        // offset is 4-byte aligned (checked) and the mapping is page aligned.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        value
    }

    fn write32(&self, offset: usize, value: u32) {
        check_access(offset, 4, self.size);
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        // SAFETY: write_volatile necessary for MMIO - triggers hardware side effects.
        // Invariants: ptr from mmap; offset+4 <= size; 4-byte aligned.
        unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value) }
    }

    fn read64(&self, offset: usize) -> u64 {
        check_access(offset, 8, self.size);
        // SAFETY: as read32; offset+8 <= size and 8-byte aligned.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u64>().read_volatile() };
        tracing::trace!("Read u64 @ {offset:#x} = {value:#x}");
        value
    }

    fn write64(&self, offset: usize, value: u64) {
        check_access(offset, 8, self.size);
        tracing::trace!("Write u64 @ {offset:#x} = {value:#x}");
        // SAFETY: as write32; offset+8 <= size and 8-byte aligned.
        unsafe { self.ptr.as_ptr().add(offset).cast::<u64>().write_volatile(value) }
    }

    fn barrier(&self) {
        // Volatile accesses are not reordered against each other by the
        // compiler; the fence keeps the CPU from doing so and drains stores
        // to the uncached BAR before any later access.
        fence(Ordering::SeqCst);
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        tracing::debug!("Unmapping {} ({:#x} bytes)", self.path.display(), self.size);

        // SAFETY: ptr and size are exactly what mmap returned in open(); Drop
        // runs once and no accessor can outlive &self.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: Send - MappedRegion owns its mapping exclusively; moving it between
// threads does not invalidate mmap'd memory.
unsafe impl Send for MappedRegion {}

// SAFETY: Sync - every access is a bounds-checked volatile load or store of a
// naturally aligned word. The device tolerates concurrent register access;
// protocol-level exclusion is the controller's job.
unsafe impl Sync for MappedRegion {}

/// Parse a sysfs hex ID file such as `0x1234\n`
fn read_sysfs_id(path: &Path) -> Result<u16> {
    let raw = std::fs::read_to_string(path)?;
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u16::from_str_radix(digits, 16)
        .map_err(|e| EduError::map_failed(format!("Bad ID in {}: {trimmed:?} ({e})", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_chip::regs;
    use std::io::Write;

    /// A plain file stands in for the BAR; MAP_SHARED makes stores land in it.
    fn backing_file(name: &str, len: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("edu-mmio-{}-{name}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn registers_round_trip_through_the_mapping() {
        let path = backing_file("rw", 4096);
        {
            let region = MappedRegion::open(&path).unwrap();
            assert_eq!(region.size(), 4096);

            region.write32(regs::LIVENESS, 0xdead_beef);
            region.barrier();
            assert_eq!(region.read32(regs::LIVENESS), 0xdead_beef);

            region.write64(regs::DMA_COUNT, 0x0123_4567_89ab_cdef);
            assert_eq!(region.read64(regs::DMA_COUNT), 0x0123_4567_89ab_cdef);
        }

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[regs::LIVENESS..regs::LIVENESS + 4], &0xdead_beef_u32.to_ne_bytes());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn too_small_file_is_rejected() {
        let path = backing_file("small", 16);
        let err = MappedRegion::open(&path).unwrap_err();
        assert!(matches!(err, EduError::MapFailed { .. }), "{err}");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = MappedRegion::open("/nonexistent/edu/resource0").unwrap_err();
        assert!(matches!(err, EduError::DeviceNotFound { .. }));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn access_past_the_mapping_panics() {
        let path = backing_file("oob", 4096);
        let region = MappedRegion::open(&path).unwrap();
        let _ = region.read32(4096);
    }

    #[test]
    fn sysfs_ids_parse_with_and_without_prefix() {
        let path = std::env::temp_dir().join(format!("edu-mmio-{}-vendor", std::process::id()));
        std::fs::write(&path, "0x1234\n").unwrap();
        assert_eq!(read_sysfs_id(&path).unwrap(), 0x1234);
        std::fs::write(&path, "11e8").unwrap();
        assert_eq!(read_sysfs_id(&path).unwrap(), 0x11e8);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    #[ignore] // Requires hardware (QEMU with -device edu)
    fn test_map_edu_bar() {
        let pcie_address = std::env::var("EDU_PCIE_ADDRESS").unwrap_or_else(|_| "0000:00:04.0".into());
        match MappedRegion::for_device(&pcie_address) {
            Ok(region) => {
                let version = edu_chip::Version::from_ident(region.read32(regs::IDENT));
                println!("edu {version} at {pcie_address}");
            }
            Err(e) => println!("edu BAR unavailable (expected without hardware): {e}"),
        }
    }
}
